//! 控制层错误类型
//!
//! 这里只有配置类错误：它们在 `init()` 时暴露，循环开始前终止。
//! 运行期间的数值问题不在此处报告，由循环检测。

use pendulum_model::ModelError;
use pendulum_tools::ConfigError;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// 策略文件路径为空
    #[error("Policy model path is empty")]
    EmptyModelPath,

    /// S 矩阵不对称或不正定
    #[error("Region-of-attraction matrix S is not symmetric positive definite")]
    NotPositiveDefinite,

    /// ρ 不是正数
    #[error("Region-of-attraction threshold rho must be > 0, got {0}")]
    InvalidRho(f64),

    /// 代价矩阵非法
    #[error("Invalid cost matrix {name}: {reason}")]
    InvalidCost {
        name: &'static str,
        reason: &'static str,
    },

    /// Riccati 方程无镇定解
    #[error("Riccati equation has no stabilizing solution (residual {residual:e})")]
    RiccatiFailed { residual: f64 },

    /// 力矩限制为负或非有限
    #[error("Invalid torque limit for joint {joint}: {value}")]
    InvalidTorqueLimit { joint: usize, value: f64 },

    /// 参考轨迹非法
    #[error("Invalid reference trajectory: {0}")]
    InvalidTrajectory(String),

    /// 组合控制器中某个子控制器初始化失败
    #[error("Controller {index} failed to initialise: {source}")]
    SubController {
        index: u8,
        source: Box<ControlError>,
    },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
