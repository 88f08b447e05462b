//! 电机总线抽象
//!
//! 控制循环只依赖 [`MotorBus`]；具体的电机协议（CAN、串口等）由实现方负责。

use pendulum_model::{Control, State};
use thiserror::Error;

/// 总线错误类型
#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Motors not enabled")]
    NotEnabled,
    #[error("Device Error: {0}")]
    Device(String),
}

/// 电机总线
///
/// `read_state` 返回 `[q1, q2, q̇1, q̇2]`（关节侧、弧度），
/// `write_torque` 写入两个关节的期望力矩（Nm）。
pub trait MotorBus {
    fn enable(&mut self) -> Result<(), BusError>;

    fn disable(&mut self) -> Result<(), BusError>;

    fn read_state(&mut self) -> Result<State, BusError>;

    fn write_torque(&mut self, u: &Control) -> Result<(), BusError>;
}

impl<B: MotorBus + ?Sized> MotorBus for Box<B> {
    fn enable(&mut self) -> Result<(), BusError> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), BusError> {
        (**self).disable()
    }

    fn read_state(&mut self) -> Result<State, BusError> {
        (**self).read_state()
    }

    fn write_torque(&mut self, u: &Control) -> Result<(), BusError> {
        (**self).write_torque(u)
    }
}
