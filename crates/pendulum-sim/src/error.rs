//! 仿真层错误类型
//!
//! 只有循环开始之前的错误以 `Err` 返回；运行期间的数值故障
//! 写入 [`RunReport`](pendulum_tools::RunReport) 的终止原因。

use pendulum_control::ControlError;
use pendulum_model::ModelError;
use pendulum_tools::ConfigError;
use thiserror::Error;

/// 仿真层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// 运行配置非法
    #[error("Invalid run configuration: {0}")]
    Config(#[from] ConfigError),

    /// 控制器初始化失败
    #[error("Controller initialization failed: {0}")]
    Control(#[from] ControlError),

    /// 被控对象模型非法
    #[error("Invalid plant model: {0}")]
    Model(#[from] ModelError),
}
