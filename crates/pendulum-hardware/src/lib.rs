//! # Pendulum Hardware
//!
//! 电机总线抽象与实时控制循环。
//!
//! ## 模块
//!
//! - `bus` - `MotorBus` trait 和总线错误
//! - `control_loop` - 带截止时间统计的实时循环
//! - `mock` - Mock 总线（`mock` feature）
//!
//! ## Feature Flags
//!
//! - `mock` - 启用 [`MockBus`]（默认启用）

pub mod bus;
pub mod control_loop;
#[cfg(feature = "mock")]
pub mod mock;

use pendulum_control::ControlError;
use pendulum_tools::ConfigError;
use thiserror::Error;

// 重新导出常用类型
pub use bus::{BusError, MotorBus};
pub use control_loop::{ExperimentResult, HardwareConfig, run_experiment};
#[cfg(feature = "mock")]
pub use mock::MockBus;

/// 硬件层错误类型（循环开始之前）
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Invalid hardware configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Controller initialization failed: {0}")]
    Control(#[from] ControlError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
