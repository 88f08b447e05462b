//! # Pendulum Control
//!
//! 控制器、测量滤波和组合控制器（Supervisor）。
//!
//! ## 模块
//!
//! - `controller` - `Controller` trait 通用接口
//! - `roa` - 吸引域二次型判定
//! - `riccati` - 连续时间代数 Riccati 方程
//! - `lqr` - LQR 控制器（带代价截断和失败值）
//! - `policy` - 学习策略控制器（观测编码、动作缩放）
//! - `trajectory` - 参考轨迹与轨迹跟踪 PID
//! - `filter` - 测量滤波（低通、卡尔曼、无迹卡尔曼、速度截断）
//! - `friction` - 摩擦补偿
//! - `combined` - 组合控制器状态机
//!
//! ## 错误处理
//!
//! 配置类错误在 `init()` 返回 [`ControlError`]；`compute()` 不返回错误，
//! 子控制器失效时输出各自的失败值，数值故障由外层循环检测。

pub mod combined;
pub mod controller;
mod error;
pub mod filter;
pub mod friction;
pub mod lqr;
pub mod policy;
pub mod riccati;
pub mod roa;
pub mod trajectory;

// 重新导出常用类型
pub use combined::{ActiveController, CombinedController, Condition, SwitchEvent, conditions};
pub use controller::{ConstantController, Controller, check_torque_limit};
pub use error::ControlError;
pub use filter::{
    IdentityFilter, KalmanFilter, LowPassFilter, MeasurementFilter, UnscentedKalmanFilter,
    VelocityCut, build_filter,
};
pub use friction::FrictionCompensation;
pub use lqr::LqrController;
pub use policy::{ActionScaling, Policy, PolicyController, StateEncoding};
pub use riccati::solve_continuous_are;
pub use roa::{RegionOfAttraction, check_if_state_in_roa};
pub use trajectory::{ReferenceTrajectory, TrajectoryPidController};
