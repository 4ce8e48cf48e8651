//! キャプチャ制御モジュール
//!
//! セッションのライフサイクルと失敗回復の状態機械を実装します。
//! 取得 → 合成 → 抽出のパイプラインを1呼び出しとして実行し、
//! 失敗種別ごとに「セッション再構築」「そのまま再取得」「即時失敗」を
//! 使い分けます。元実装の無制限な自己再帰はRecoveryStateの予算付き
//! ループに置き換えています。

use std::time::Instant;

use tracing::{debug, warn};

use crate::application::{
    extractor::{extract, ExtractStatus},
    recovery::RecoveryState,
    stats::StatsCollector,
    stitcher::stitch,
};
use crate::domain::{
    AcquireError, CaptureError, CaptureResult, DuplicationSource, Region, StitchLayout,
};

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// セッション未確立（次回呼び出しで初期化される）
    Uninitialized,
    /// セッション確立済み
    Ready,
    /// 再初期化予算が尽きた（次回呼び出しで再び初期化を試みる）
    Failed,
}

/// キャプチャオーケストレーター
///
/// DuplicationSource（= CaptureSession相当）を排他的に所有する。
/// 単一の論理キャプチャループから呼ばれる前提で、内部に並行性はない。
pub struct CaptureOrchestrator<S: DuplicationSource> {
    source: S,
    layout: StitchLayout,
    recovery: RecoveryState,
    stats: StatsCollector,
    state: SessionState,
}

impl<S: DuplicationSource> CaptureOrchestrator<S> {
    /// 統計出力間隔のデフォルト（秒）
    const DEFAULT_STATS_INTERVAL_SECS: u64 = 10;

    /// 新しいCaptureOrchestratorを作成
    ///
    /// セッションは確立しない。初回のcapture()呼び出しで初期化される。
    pub fn new(source: S, layout: StitchLayout, recovery: RecoveryState) -> Self {
        Self {
            source,
            layout,
            recovery,
            stats: StatsCollector::new(std::time::Duration::from_secs(
                Self::DEFAULT_STATS_INTERVAL_SECS,
            )),
            state: SessionState::Uninitialized,
        }
    }

    /// 現在のセッション状態
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 統計コレクターへの参照
    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// 指定矩形のピクセルデータをキャプチャ
    ///
    /// regionはキャンバス範囲へインプレースでクランプされ、outには
    /// クランプ後の矩形分のB8G8R8A8データが書き込まれる。outは
    /// `region.byte_len()`（クランプ前のワーストケース）以上を確保すること。
    ///
    /// # Returns
    /// - `Ok(len)`: 書き込んだバイト数（常に > 0）
    /// - `Err(RegionOutOfBounds)`: 矩形がキャンバス外（リトライ不能）
    /// - `Err(BlankFrame)`: 再取得しても空フレームのまま
    /// - `Err(_)`: 再初期化予算が尽きた
    pub fn capture(&mut self, region: &mut Region, out: &mut [u8]) -> CaptureResult<usize> {
        let started = Instant::now();
        self.recovery.begin_call();

        let mut needs_init = self.state != SessionState::Ready;
        let mut last_failure: Option<CaptureError> = None;

        loop {
            if needs_init {
                // 部分状態を残さないため、常に全破棄してから作り直す
                self.source.teardown();
                self.state = SessionState::Uninitialized;

                let delay = match self.recovery.try_begin_reinit() {
                    Some(delay) => delay,
                    None => {
                        self.state = SessionState::Failed;
                        self.stats.record_failure();
                        return Err(last_failure.take().unwrap_or_else(|| {
                            CaptureError::Acquisition(
                                "reinitialization budget exhausted".to_string(),
                            )
                        }));
                    }
                };
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }

                self.stats.record_reinitialization();
                match self.source.initialize() {
                    Ok(()) => {
                        debug!("capture session established");
                        self.state = SessionState::Ready;
                        needs_init = false;
                    }
                    Err(e) => {
                        warn!("session initialization failed: {}", e);
                        last_failure = Some(e);
                        continue;
                    }
                }
            }

            let buffers = match self.source.acquire_all() {
                Ok(buffers) => buffers,
                Err(AcquireError::NoNewFrame) if !self.recovery.policy().teardown_on_idle => {
                    // アイドル出力をセッション破棄の理由にしないポリシー。
                    // ブランクリトライの予算を消費して再取得する。
                    if !self.recovery.try_begin_blank_retry() {
                        self.stats.record_failure();
                        return Err(CaptureError::Acquisition(
                            "outputs reported no new frame".to_string(),
                        ));
                    }
                    self.stats.record_blank_retry();
                    continue;
                }
                Err(e) => {
                    // 元実装互換: タイムアウトも含め全てセッション再構築
                    warn!("frame acquisition failed: {}; rebuilding session", e);
                    self.source.teardown();
                    self.state = SessionState::Uninitialized;
                    last_failure = Some(CaptureError::Acquisition(e.to_string()));
                    needs_init = true;
                    continue;
                }
            };

            // bufferとcanvasはサイクル限定の所有データで、
            // どの脱出経路でもこのスコープで解放される
            let canvas = stitch(&buffers, self.layout);
            drop(buffers);

            match extract(&canvas, region, out) {
                ExtractStatus::Copied(len) => {
                    self.state = SessionState::Ready;
                    self.recovery.record_success();
                    self.stats.record_success(started.elapsed());
                    if self.stats.should_report() {
                        self.stats.report_and_reset();
                    }
                    return Ok(len);
                }
                ExtractStatus::Blank => {
                    // セッションは健全な可能性が高いので維持して再取得
                    if !self.recovery.try_begin_blank_retry() {
                        self.stats.record_failure();
                        return Err(CaptureError::BlankFrame(self.recovery.blank_retries()));
                    }
                    debug!("blank frame extracted; retrying without reinitialization");
                    self.stats.record_blank_retry();
                    continue;
                }
                ExtractStatus::OutOfBounds => {
                    // 同じ矩形でリトライしても成功しないため即時失敗
                    self.source.teardown();
                    self.state = SessionState::Uninitialized;
                    self.stats.record_failure();
                    return Err(CaptureError::RegionOutOfBounds);
                }
                ExtractStatus::BufferTooSmall => {
                    // 呼び出し側のバッファ確保ミス。セッションは無傷なので維持
                    self.stats.record_failure();
                    return Err(CaptureError::Configuration(
                        "output buffer is smaller than the clamped region".to_string(),
                    ));
                }
            }
        }
    }
}

impl<S: DuplicationSource> Drop for CaptureOrchestrator<S> {
    fn drop(&mut self) {
        self.source.teardown();
    }
}
