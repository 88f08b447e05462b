//! # Pendulum Model
//!
//! 双摆（pendubot / acrobot）的数据层定义（无控制器、无硬件依赖）
//!
//! ## 模块
//!
//! - `state`: 状态/控制向量、wrap-to-top 角度规范化
//! - `params`: 模型参数（质量、杆长、摩擦、力矩限制）
//! - `plant`: `Dynamics` trait 与闭式双摆动力学
//! - `integrator`: 固定步长积分器（Euler / Runge-Kutta）
//!
//! ## 约定
//!
//! 状态顺序为 `[q1, q2, q̇1, q̇2]`，`q1 = 0` 表示自然下垂，
//! 倒立平衡点为 `[π, 0, 0, 0]`。

pub mod integrator;
pub mod params;
pub mod plant;
pub mod state;

// 重新导出常用类型
pub use integrator::Integrator;
pub use params::{ModelParameters, Robot};
pub use plant::{DoublePendulumPlant, Dynamics};
pub use state::*;

use thiserror::Error;

/// 模型层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid model parameter {field}: {value}")]
    InvalidParameter { field: &'static str, value: f64 },
}
