//! 运行结果
//!
//! 数值故障和时序故障不会以 `Err` 返回：循环终止后仍然交回
//! 已完成节拍的日志，并附带故障描述。

use crate::TrajectoryLog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 导致运行提前终止的故障
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunFault {
    /// 某个量出现 NaN/Inf
    NonFinite { tick: usize, quantity: String },
    /// 硬件节拍连续超时
    DeadlineOverrun { tick: usize, consecutive: u32 },
    /// 总线读写失败
    Bus { tick: usize, message: String },
}

impl RunFault {
    /// 故障发生的节拍序号
    pub fn tick(&self) -> usize {
        match self {
            RunFault::NonFinite { tick, .. }
            | RunFault::DeadlineOverrun { tick, .. }
            | RunFault::Bus { tick, .. } => *tick,
        }
    }
}

impl fmt::Display for RunFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFault::NonFinite { tick, quantity } => {
                write!(f, "non-finite {quantity} at tick {tick}")
            },
            RunFault::DeadlineOverrun { tick, consecutive } => {
                write!(f, "{consecutive} consecutive deadline overruns at tick {tick}")
            },
            RunFault::Bus { tick, message } => write!(f, "bus error at tick {tick}: {message}"),
        }
    }
}

/// 运行终止原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// 跑满全部节拍
    Completed,
    /// 外部停止请求，`tick` 为已完成的节拍数
    Stopped { tick: usize },
    /// 故障终止
    Fault(RunFault),
}

/// 一次运行的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// 真实状态轨迹（硬件模式下为测量值）
    pub log: TrajectoryLog,
    /// 控制器实际看到的测量状态（与 `log` 逐节拍对齐）
    pub measured: Vec<pendulum_model::State>,
    pub termination: Termination,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.termination == Termination::Completed
    }

    pub fn fault(&self) -> Option<&RunFault> {
        match &self.termination {
            Termination::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}
