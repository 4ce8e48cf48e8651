/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - Result型でエラー伝播を明示化
/// - 回復可能性をエラー型で表現（BlankFrame vs RegionOutOfBounds）

use thiserror::Error;

/// Domain層の統一エラー型
#[derive(Error, Debug)]
pub enum CaptureError {
    /// 初期化エラー（デバイス作成失敗等）
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// 接続されたディスプレイ出力が1つも見つからない
    #[error("No display outputs found on adapter")]
    NoOutputs,

    /// デバイスからDXGIアダプタを取得できない
    #[error("Adapter query failed: {0}")]
    AdapterQuery(String),

    /// Duplicationハンドルの取得失敗
    ///
    /// 保護されたコンテンツ表示中やセッションロック中に発生する。
    #[error("Output duplication unavailable: {0}")]
    DuplicationUnavailable(String),

    /// フレーム取得エラー（再初期化リトライが尽きた場合に表面化）
    #[error("Frame acquisition failed: {0}")]
    Acquisition(String),

    /// 要求された矩形がキャンバスと重ならない（リトライ不能）
    ///
    /// 同じ矩形でリトライしても成功しないため、呼び出し側へ即座に返す。
    #[error("Requested region does not overlap the desktop canvas")]
    RegionOutOfBounds,

    /// 抽出結果が全ゼロのまま収束しなかった
    ///
    /// セッション自体は健全な可能性があるため、再初期化なしリトライの
    /// 上限到達後にのみ表面化する。
    #[error("Extracted region stayed blank after {0} retries")]
    BlankFrame(u32),

    /// 設定関連のエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ファイル入出力エラー（BMP書き出し等）
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Domain層の統一Result型
pub type CaptureResult<T> = Result<T, CaptureError>;
