//! 进度聚合与剩余时间估算
//!
//! 只保留每个工作线程的最新快照，不保留历史。线程间独立均匀采样，
//! 所以速度可以直接相加。

use std::collections::HashMap;

use crate::worker::ProgressSnapshot;

/// 聚合状态，协调器是唯一写入方
#[derive(Debug)]
pub struct ProgressAggregator {
    latest: HashMap<usize, ProgressSnapshot>,
    expected_tries: f64,
    requested: usize,
}

impl ProgressAggregator {
    pub fn new(expected_tries: f64, requested: usize) -> Self {
        Self {
            latest: HashMap::new(),
            expected_tries,
            requested,
        }
    }

    /// 记录某线程的最新快照，覆盖旧值
    ///
    /// 乱序或迟到的快照也照常覆盖: 它就是该线程当前已知的最新值，
    /// 直到被下一条取代。
    pub fn update(&mut self, snapshot: ProgressSnapshot) {
        self.latest.insert(snapshot.worker_id, snapshot);
    }

    /// 所有已汇报线程的尝试数之和
    pub fn total_tries(&self) -> u64 {
        self.latest.values().map(|s| s.tries).sum()
    }

    /// 所有已汇报线程的速度之和 (次/秒)
    pub fn total_rate(&self) -> f64 {
        self.latest.values().map(|s| s.rate).sum()
    }

    /// 至少命中一次的累计概率: 1 - exp(-尝试数/期望尝试数)
    pub fn hit_probability(&self) -> f64 {
        1.0 - (-(self.total_tries() as f64) / self.expected_tries).exp()
    }

    /// 剩余时间估算 (秒)
    ///
    /// 策略: `期望尝试数 * 剩余目标数 / 总速度`，全程统一使用。
    /// 速度为零时无法估算，返回 None。
    pub fn eta_secs(&self, found: usize) -> Option<f64> {
        let rate = self.total_rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.requested.saturating_sub(found);
        Some(self.expected_tries * remaining as f64 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(worker_id: usize, tries: u64, rate: f64) -> ProgressSnapshot {
        ProgressSnapshot {
            worker_id,
            tries,
            elapsed_secs: 1.0,
            rate,
        }
    }

    #[test]
    fn test_latest_snapshot_wins() {
        let mut agg = ProgressAggregator::new(16.0, 1);
        agg.update(snapshot(1, 100, 10.0));
        agg.update(snapshot(1, 150, 12.0));
        agg.update(snapshot(2, 80, 8.0));

        // 按线程取最新值求和，而不是跨更新累加
        assert_eq!(agg.total_tries(), 230);
        assert_eq!(agg.total_rate(), 20.0);
    }

    #[test]
    fn test_stale_looking_snapshot_still_replaces() {
        let mut agg = ProgressAggregator::new(16.0, 1);
        agg.update(snapshot(1, 500, 50.0));
        agg.update(snapshot(1, 100, 10.0));
        assert_eq!(agg.total_tries(), 100);
    }

    #[test]
    fn test_eta_uses_remaining_targets() {
        let mut agg = ProgressAggregator::new(1000.0, 3);
        agg.update(snapshot(1, 0, 100.0));

        assert_eq!(agg.eta_secs(0), Some(30.0));
        assert_eq!(agg.eta_secs(1), Some(20.0));
        assert_eq!(agg.eta_secs(3), Some(0.0));
    }

    #[test]
    fn test_eta_undefined_without_rate() {
        let agg = ProgressAggregator::new(1000.0, 1);
        assert_eq!(agg.eta_secs(0), None);
    }

    #[test]
    fn test_hit_probability_grows() {
        let mut agg = ProgressAggregator::new(100.0, 1);
        assert_eq!(agg.hit_probability(), 0.0);

        agg.update(snapshot(1, 100, 10.0));
        let p = agg.hit_probability();
        assert!(p > 0.6 && p < 0.7); // 1 - 1/e
    }
}
