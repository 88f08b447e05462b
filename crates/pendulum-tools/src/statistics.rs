//! # 统计工具
//!
//! 节拍耗时统计（可选模块）
//!
//! 需要启用 `statistics` feature：
//! ```toml
//! pendulum-tools = { workspace = true, features = ["statistics"] }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 节拍执行时间统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStatistics {
    /// 平均执行时间（微秒）
    pub avg_us: f64,

    /// 最小执行时间（微秒）
    pub min_us: u64,

    /// 最大执行时间（微秒）
    pub max_us: u64,

    /// 标准差（微秒）
    pub std_dev_us: f64,

    /// 超过节拍周期的次数
    pub overruns: u64,

    /// 样本数量
    pub sample_count: u64,
}

impl TimingStatistics {
    /// 由每节拍执行时间计算统计
    pub fn calculate(durations: &[Duration], period: Duration) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let micros: Vec<u64> = durations.iter().map(|d| d.as_micros() as u64).collect();
        let sum: u64 = micros.iter().sum();
        let avg = sum as f64 / micros.len() as f64;

        let min = *micros.iter().min().unwrap_or(&0);
        let max = *micros.iter().max().unwrap_or(&0);

        let variance = micros
            .iter()
            .map(|&x| {
                let diff = x as f64 - avg;
                diff * diff
            })
            .sum::<f64>()
            / micros.len() as f64;

        Self {
            avg_us: avg,
            min_us: min,
            max_us: max,
            std_dev_us: variance.sqrt(),
            overruns: durations.iter().filter(|&&d| d > period).count() as u64,
            sample_count: micros.len() as u64,
        }
    }

    /// 超时比例（%）
    pub fn overrun_rate(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.overruns as f64 / self.sample_count as f64 * 100.0
    }
}
