//! 再初期化ロジックモジュール
//!
//! キャプチャ失敗時のリトライ予算と指数バックオフを管理します。
//! 元実装の自己再帰リトライは深さ無制限だったため、ここでは
//! 呼び出し1回あたりの明示的な予算に置き換えています。

use std::time::Duration;

use crate::domain::CaptureConfig;

/// 再初期化戦略
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// 呼び出し1回あたりの連続再初期化上限
    pub max_reinit_attempts: u32,
    /// 呼び出し1回あたりのブランクフレーム再取得上限
    pub max_blank_retries: u32,
    /// 初期バックオフ時間
    pub initial_backoff: Duration,
    /// 最大バックオフ時間
    pub max_backoff: Duration,
    /// アイドル出力（新規フレームなし）でセッションを破棄するか
    ///
    /// true が元実装互換。false ではセッションを維持したまま
    /// ブランクリトライ予算で再取得する。
    pub teardown_on_idle: bool,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_reinit_attempts: CaptureConfig::DEFAULT_MAX_REINIT_ATTEMPTS,
            max_blank_retries: CaptureConfig::DEFAULT_MAX_BLANK_RETRIES,
            initial_backoff: Duration::from_millis(CaptureConfig::DEFAULT_REINIT_INITIAL_DELAY_MS),
            max_backoff: Duration::from_millis(CaptureConfig::DEFAULT_REINIT_MAX_DELAY_MS),
            teardown_on_idle: true,
        }
    }
}

impl From<&CaptureConfig> for RecoveryPolicy {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            max_reinit_attempts: config.max_reinit_attempts,
            max_blank_retries: config.max_blank_retries,
            initial_backoff: config.reinit_initial_delay(),
            max_backoff: config.reinit_max_delay(),
            teardown_on_idle: config.teardown_on_idle,
        }
    }
}

/// 再初期化状態管理
///
/// 予算カウンターは呼び出しごとにリセットされ、バックオフと
/// 総再初期化回数はセッションをまたいで保持される。
#[derive(Debug)]
pub struct RecoveryState {
    policy: RecoveryPolicy,
    reinit_attempts: u32,
    blank_retries: u32,
    current_backoff: Duration,
    total_reinitializations: u64,
}

impl RecoveryState {
    /// 新しいRecoveryStateを作成
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            current_backoff: policy.initial_backoff,
            policy,
            reinit_attempts: 0,
            blank_retries: 0,
            total_reinitializations: 0,
        }
    }

    /// デフォルト戦略でRecoveryStateを作成
    pub fn with_default_policy() -> Self {
        Self::new(RecoveryPolicy::default())
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// キャプチャ呼び出し開始時に予算カウンターをリセット
    pub fn begin_call(&mut self) {
        self.reinit_attempts = 0;
        self.blank_retries = 0;
    }

    /// 再初期化を1回試行する許可を得る
    ///
    /// # Returns
    /// - `Some(delay)`: 試行許可。delayだけ待機してから初期化すること
    ///   （同一呼び出し内の初回試行はゼロ待機）
    /// - `None`: 予算切れ
    pub fn try_begin_reinit(&mut self) -> Option<Duration> {
        if self.reinit_attempts >= self.policy.max_reinit_attempts {
            return None;
        }
        self.reinit_attempts += 1;
        self.total_reinitializations += 1;

        if self.reinit_attempts == 1 {
            return Some(Duration::ZERO);
        }

        // 指数バックオフ: 次回のバックオフ時間を2倍にする
        let delay = self.current_backoff;
        self.current_backoff = (self.current_backoff * 2).min(self.policy.max_backoff);
        Some(delay)
    }

    /// ブランクフレーム再取得を1回試行する許可を得る
    ///
    /// # Returns
    /// 予算が残っていれば true
    pub fn try_begin_blank_retry(&mut self) -> bool {
        if self.blank_retries >= self.policy.max_blank_retries {
            return false;
        }
        self.blank_retries += 1;
        true
    }

    /// 成功を記録（バックオフをリセット）
    pub fn record_success(&mut self) {
        self.current_backoff = self.policy.initial_backoff;
    }

    /// 現在の呼び出しでのブランクリトライ回数
    pub fn blank_retries(&self) -> u32 {
        self.blank_retries
    }

    /// 総再初期化回数を取得
    pub fn total_reinitializations(&self) -> u64 {
        self.total_reinitializations
    }
}
