//! 統計情報管理モジュール
//!
//! キャプチャ回数、レイテンシ、リトライ・再初期化回数の統計を収集・出力します。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

/// パーセンタイル統計値
#[derive(Debug, Clone)]
pub struct PercentileStats {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub count: usize,
}

/// 統計情報コレクター
#[derive(Debug)]
pub struct StatsCollector {
    /// キャプチャ呼び出しの所要時間（最大1000サンプル保持）
    durations: VecDeque<Duration>,
    /// 成功したキャプチャ回数
    success_count: u64,
    /// 失敗したキャプチャ回数
    failure_count: u64,
    /// ブランクフレームによる再取得回数
    blank_retry_count: u64,
    /// 再初期化回数
    reinit_count: u64,
    /// 最後の統計出力時刻
    last_report: Instant,
    /// 統計出力間隔
    report_interval: Duration,
}

impl StatsCollector {
    /// 最大サンプル保持数（パーセンタイル計算用）
    const MAX_DURATION_SAMPLES: usize = 1000;

    /// 新しいStatsCollectorを作成
    ///
    /// # Arguments
    /// * `report_interval` - 統計出力間隔（例: 10秒）
    pub fn new(report_interval: Duration) -> Self {
        Self {
            durations: VecDeque::new(),
            success_count: 0,
            failure_count: 0,
            blank_retry_count: 0,
            reinit_count: 0,
            last_report: Instant::now(),
            report_interval,
        }
    }

    /// 成功したキャプチャを記録
    pub fn record_success(&mut self, duration: Duration) {
        self.success_count += 1;
        self.durations.push_back(duration);

        // 最大サンプル数を超えたら古いデータを破棄
        if self.durations.len() > Self::MAX_DURATION_SAMPLES {
            self.durations.pop_front();
        }
    }

    /// 失敗したキャプチャを記録
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// ブランクフレーム再取得をカウント
    pub fn record_blank_retry(&mut self) {
        self.blank_retry_count += 1;
    }

    /// 再初期化をカウント
    pub fn record_reinitialization(&mut self) {
        self.reinit_count += 1;
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn reinit_count(&self) -> u64 {
        self.reinit_count
    }

    /// パーセンタイル統計を計算
    ///
    /// # Returns
    /// パーセンタイル統計値。データがない場合は None
    pub fn percentile_stats(&self) -> Option<PercentileStats> {
        if self.durations.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = self.durations.iter().copied().collect();
        sorted.sort();

        let count = sorted.len();
        Some(PercentileStats {
            p50: sorted[count * 50 / 100],
            p95: sorted[count * 95 / 100],
            p99: sorted[(count * 99 / 100).min(count - 1)],
            count,
        })
    }

    /// 統計レポートを出力すべきか判定
    pub fn should_report(&self) -> bool {
        self.last_report.elapsed() >= self.report_interval
    }

    /// 統計レポートを出力してタイマーをリセット
    pub fn report_and_reset(&mut self) {
        info!("=== Capture Statistics ===");
        info!(
            "Captures: {} ok / {} failed",
            self.success_count, self.failure_count
        );
        if let Some(stats) = self.percentile_stats() {
            info!(
                "Latency: p50={:.2}ms, p95={:.2}ms, p99={:.2}ms (n={})",
                stats.p50.as_secs_f64() * 1000.0,
                stats.p95.as_secs_f64() * 1000.0,
                stats.p99.as_secs_f64() * 1000.0,
                stats.count
            );
        }
        info!("Blank-frame retries: {}", self.blank_retry_count);
        info!("Reinitializations: {}", self.reinit_count);
        info!("==========================");

        self.last_report = Instant::now();
    }
}
