//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{CaptureError, CaptureResult, Region};

/// キャンバス合成レイアウト
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchLayout {
    /// 列挙順に左から右へ連結（元実装互換、デフォルト）
    ///
    /// 実際の画面配置は無視される。矩形座標の意味はこのレイアウトに
    /// 依存するため、互換性のためこちらが既定。
    #[default]
    Concat,
    /// DXGIが報告するデスクトップ座標で配置（マルチモニタ正確版）
    Desktop,
}

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// キャプチャ設定
    pub capture: CaptureConfig,
    /// 抽出矩形設定
    pub region: RegionConfig,
    /// 出力設定
    pub output: OutputConfig,
    /// ログ設定
    pub logging: LoggingConfig,
}

/// キャプチャ設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// キャンバス合成レイアウト
    ///
    /// 選択肢: "concat"（列挙順連結）, "desktop"（実座標配置）
    /// デフォルト: "concat"
    #[serde(default)]
    pub layout: StitchLayout,

    /// 連続再初期化の許容回数
    ///
    /// この回数を超えたらキャプチャ呼び出しをエラーで返す
    /// デフォルト: 3回
    pub max_reinit_attempts: u32,

    /// ブランクフレーム（全ゼロ）時の再取得許容回数
    ///
    /// セッションを維持したまま再取得する上限
    /// デフォルト: 5回
    pub max_blank_retries: u32,

    /// 再初期化時の初期待機時間（ミリ秒）
    ///
    /// デフォルト: 100ms
    pub reinit_initial_delay_ms: u64,

    /// 再初期化時の最大待機時間（ミリ秒、指数バックオフの上限）
    ///
    /// デフォルト: 2000ms
    pub reinit_max_delay_ms: u64,

    /// アイドル出力（新規フレームなし）をエラー扱いするか
    ///
    /// true: 元実装互換。フレーム更新のない出力があったらセッションを
    /// 破棄して再初期化する。
    /// false: セッションを維持したまま再取得する（ブランクリトライの
    /// 予算を消費）。
    /// デフォルト: true
    #[serde(default = "default_teardown_on_idle")]
    pub teardown_on_idle: bool,
}

fn default_teardown_on_idle() -> bool {
    true
}

impl CaptureConfig {
    /// デフォルトの連続再初期化上限
    pub const DEFAULT_MAX_REINIT_ATTEMPTS: u32 = 3;
    /// デフォルトのブランクリトライ上限
    pub const DEFAULT_MAX_BLANK_RETRIES: u32 = 5;
    /// デフォルトの再初期化初期遅延（ミリ秒）
    pub const DEFAULT_REINIT_INITIAL_DELAY_MS: u64 = 100;
    /// デフォルトの再初期化最大遅延（ミリ秒）
    pub const DEFAULT_REINIT_MAX_DELAY_MS: u64 = 2000;

    pub fn reinit_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_initial_delay_ms)
    }

    pub fn reinit_max_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_max_delay_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            layout: StitchLayout::default(),
            max_reinit_attempts: Self::DEFAULT_MAX_REINIT_ATTEMPTS,
            max_blank_retries: Self::DEFAULT_MAX_BLANK_RETRIES,
            reinit_initial_delay_ms: Self::DEFAULT_REINIT_INITIAL_DELAY_MS,
            reinit_max_delay_ms: Self::DEFAULT_REINIT_MAX_DELAY_MS,
            teardown_on_idle: true,
        }
    }
}

/// 抽出矩形設定
///
/// Windowsではフォアグラウンドウィンドウの矩形を毎Tick取得できる。
/// follow_foreground = false または矩形取得に失敗した場合は
/// ここで指定した固定矩形を使用する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// フォアグラウンドウィンドウの矩形に追従するか（Windowsのみ有効）
    ///
    /// デフォルト: true
    pub follow_foreground: bool,

    /// 固定矩形: 左端（キャンバス座標、負値可）
    pub left: i32,
    /// 固定矩形: 上端
    pub top: i32,
    /// 固定矩形: 右端
    pub right: i32,
    /// 固定矩形: 下端
    pub bottom: i32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            follow_foreground: true,
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1080,
        }
    }
}

impl From<&RegionConfig> for Region {
    fn from(config: &RegionConfig) -> Self {
        Region::new(config.left, config.top, config.right, config.bottom)
    }
}

/// 出力設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// BMPファイルの出力パス
    ///
    /// 毎Tick上書きされる
    pub bmp_path: String,

    /// ポーリング間隔（ミリ秒）
    ///
    /// デフォルト: 1ms（元実装のSleep(1)相当）
    pub tick_interval_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bmp_path: "capture.bmp".to_string(),
            tick_interval_ms: 1,
        }
    }
}

impl OutputConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// ログ設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// ログレベル（"info", "debug", "trace"等）
    pub level: String,

    /// JSON形式で出力するか
    pub json: bool,

    /// ログファイル出力先ディレクトリ（省略時は標準出力）
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> CaptureResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| CaptureError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> CaptureResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            CaptureError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| CaptureError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> CaptureResult<()> {
        // リトライ予算の検証
        if self.capture.max_reinit_attempts == 0 {
            return Err(CaptureError::Configuration(
                "max_reinit_attempts must be greater than 0".to_string(),
            ));
        }
        if self.capture.max_blank_retries == 0 {
            return Err(CaptureError::Configuration(
                "max_blank_retries must be greater than 0".to_string(),
            ));
        }
        if self.capture.reinit_initial_delay_ms > self.capture.reinit_max_delay_ms {
            return Err(CaptureError::Configuration(
                "reinit_initial_delay_ms must not exceed reinit_max_delay_ms".to_string(),
            ));
        }

        // 固定矩形の検証（追従モードでもフォールバックに使われる）
        let region = Region::from(&self.region);
        if region.width() == 0 || region.height() == 0 {
            return Err(CaptureError::Configuration(
                "Fixed region must have positive width and height".to_string(),
            ));
        }

        // 出力先の検証
        if self.output.bmp_path.is_empty() {
            return Err(CaptureError::Configuration(
                "bmp_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let mut config = AppConfig::default();
        config.capture.max_reinit_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.capture.max_blank_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_region() {
        let mut config = AppConfig::default();
        config.region.left = 100;
        config.region.right = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let mut config = AppConfig::default();
        config.capture.reinit_initial_delay_ms = 5000;
        config.capture.reinit_max_delay_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [capture]
            max_reinit_attempts = 4
            max_blank_retries = 2
            reinit_initial_delay_ms = 50
            reinit_max_delay_ms = 1000
            layout = "desktop"

            [region]
            follow_foreground = false
            left = -10
            top = 0
            right = 800
            bottom = 600

            [output]
            bmp_path = "out.bmp"
            tick_interval_ms = 16

            [logging]
            level = "debug"
            json = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).expect("valid TOML");
        assert_eq!(config.capture.layout, StitchLayout::Desktop);
        assert_eq!(config.capture.max_reinit_attempts, 4);
        assert!(config.capture.teardown_on_idle); // serde default
        assert_eq!(config.region.left, -10);
        assert_eq!(config.output.tick_interval(), Duration::from_millis(16));
        assert!(config.logging.json);
    }

    #[test]
    fn test_roundtrip_default() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.capture.max_reinit_attempts, config.capture.max_reinit_attempts);
        assert_eq!(parsed.capture.layout, config.capture.layout);
    }
}
