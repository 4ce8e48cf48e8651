/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。

use crate::domain::{CaptureResult, StagingBuffer};

/// フレーム取得の失敗種別
///
/// 元実装は「新規フレームなし」のタイムアウトを本物のハードウェア
/// エラーと同一視してセッションを全破棄していた。ここでは区別して
/// 報告し、どう回復するかはRecoveryPolicyの判断に委ねる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// ゼロ待機ポーリングで新規フレームがなかった（出力がアイドル）
    NoNewFrame,
    /// フレーム取得または転送の失敗（AccessLost等）
    Failed(String),
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNewFrame => write!(f, "no new frame available"),
            Self::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Duplicationポート: 全出力のフレーム取得を抽象化
///
/// 1実装がCaptureSession相当（デバイス・コンテキスト・出力ごとの
/// Duplicationハンドル一覧）を排他的に所有する。Orchestratorは
/// このポート越しにセッションのライフサイクルを制御する。
pub trait DuplicationSource {
    /// デバイス・コンテキストを作成し、アダプタの全出力に対して
    /// Duplicationハンドルを確立する
    ///
    /// 途中で失敗した場合は部分的に構築された状態を破棄してから
    /// エラーを返す（半端なハンドルリストは残らない）。
    fn initialize(&mut self) -> CaptureResult<()>;

    /// 全出力から次フレームをゼロ待機で取得し、CPU可読コピーを返す
    ///
    /// 列挙順のStagingBufferリストを返す。どれか1出力でも失敗したら
    /// サイクル全体を中断する（部分フレームのキャンバスは作らない）。
    ///
    /// # Returns
    /// - `Ok(buffers)`: 全出力分の取得成功
    /// - `Err(AcquireError::NoNewFrame)`: いずれかの出力で更新なし
    /// - `Err(AcquireError::Failed)`: 取得・転送エラー
    fn acquire_all(&mut self) -> Result<Vec<StagingBuffer>, AcquireError>;

    /// デバイス・コンテキスト・全Duplicationハンドルを解放
    ///
    /// 未初期化状態で呼んでも安全。
    fn teardown(&mut self);

    /// セッションが確立済みか
    fn is_initialized(&self) -> bool;
}
