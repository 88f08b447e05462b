//! 轨迹日志
//!
//! 时间、状态、控制三列按节拍对齐，只追加。

use pendulum_model::{Control, State};
use serde::{Deserialize, Serialize};

/// 轨迹日志
///
/// 每次 [`push`](TrajectoryLog::push) 同时追加三列，任意时刻三列长度相等。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryLog {
    t: Vec<f64>,
    x: Vec<State>,
    u: Vec<Control>,
}

impl TrajectoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预分配 `capacity` 个节拍
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            t: Vec::with_capacity(capacity),
            x: Vec::with_capacity(capacity),
            u: Vec::with_capacity(capacity),
        }
    }

    /// 追加一个节拍
    pub fn push(&mut self, t: f64, x: State, u: Control) {
        self.t.push(t);
        self.x.push(x);
        self.u.push(u);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.t
    }

    pub fn states(&self) -> &[State] {
        &self.x
    }

    pub fn controls(&self) -> &[Control] {
        &self.u
    }

    /// 最后一个记录的状态
    pub fn last_state(&self) -> Option<&State> {
        self.x.last()
    }

    /// 记录的时间跨度
    pub fn duration(&self) -> Option<f64> {
        Some(self.t.last()? - self.t.first()?)
    }

    /// 逐节拍迭代 `(t, x, u)`
    pub fn iter(&self) -> impl Iterator<Item = (f64, &State, &Control)> {
        self.t.iter().zip(&self.x).zip(&self.u).map(|((t, x), u)| (*t, x, u))
    }
}
