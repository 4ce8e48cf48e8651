mod application;
mod domain;
mod infrastructure;
mod logging;

use crate::application::orchestrator::CaptureOrchestrator;
use crate::application::recovery::{RecoveryPolicy, RecoveryState};
use crate::domain::config::AppConfig;
use crate::domain::{CaptureError, Region, RegionConfig};
use crate::infrastructure::bmp::write_bmp;
use crate::logging::init_logging;
use std::path::PathBuf;

fn main() {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => config,
        Err(_) => AppConfig::default(),
    };

    // ログシステムの初期化
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）
    let log_dir = config.logging.dir.as_ref().map(PathBuf::from);
    let _guard = init_logging(&config.logging.level, config.logging.json, log_dir);

    tracing::info!("deskgrab starting...");

    match run(config) {
        Ok(_) => {
            tracing::info!("deskgrab terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
fn run(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Capture: layout={:?}, max_reinit={}, max_blank_retries={}, teardown_on_idle={}",
        config.capture.layout,
        config.capture.max_reinit_attempts,
        config.capture.max_blank_retries,
        config.capture.teardown_on_idle
    );
    tracing::info!(
        "Region: follow_foreground={}, fixed=({},{})-({},{})",
        config.region.follow_foreground,
        config.region.left,
        config.region.top,
        config.region.right,
        config.region.bottom
    );
    tracing::info!(
        "Output: bmp_path={}, tick={}ms",
        config.output.bmp_path,
        config.output.tick_interval_ms
    );

    // キャプチャソースの構築（セッションは初回capture()で確立される）
    #[cfg(windows)]
    let source = crate::infrastructure::dxgi::DxgiDuplicationSource::new();
    #[cfg(not(windows))]
    let source = {
        tracing::warn!("DXGI is unavailable on this platform; using mock capture source");
        crate::infrastructure::mock_source::MockDuplicationSource::single_output()
    };

    let recovery = RecoveryState::new(RecoveryPolicy::from(&config.capture));
    let mut orchestrator = CaptureOrchestrator::new(source, config.capture.layout, recovery);

    let tick = config.output.tick_interval();

    // ポーリングループ: 毎Tickで対象矩形を解決してキャプチャし、BMPを上書きする
    loop {
        let mut region = resolve_region(&config.region);
        // クランプ前のワーストケースで確保
        let mut pixels = vec![0u8; region.byte_len()];

        match orchestrator.capture(&mut region, &mut pixels) {
            Ok(len) => {
                // regionはクランプ済みなので書き込んだ寸法と一致する
                if let Err(e) = write_bmp(
                    &config.output.bmp_path,
                    &pixels[..len],
                    region.width() as u32,
                    region.height() as u32,
                ) {
                    tracing::warn!("failed to write {}: {}", config.output.bmp_path, e);
                }
            }
            Err(CaptureError::RegionOutOfBounds) => {
                // ウィンドウが画面外にある間は取得できない。次Tickで再解決する
                tracing::debug!("target region is outside the canvas; skipping tick");
            }
            Err(e) => {
                tracing::warn!("capture failed: {}", e);
            }
        }

        std::thread::sleep(tick);
    }
}

/// このTickのキャプチャ対象矩形を決定
///
/// Windowsかつ追従モードではフォアグラウンドウィンドウの矩形を使い、
/// 取得できない場合は設定の固定矩形へフォールバックする。
fn resolve_region(config: &RegionConfig) -> Region {
    #[cfg(windows)]
    if config.follow_foreground {
        if let Some(region) = crate::infrastructure::window::foreground_window_region() {
            return region;
        }
    }

    Region::from(config)
}
