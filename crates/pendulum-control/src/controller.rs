//! Controller trait - 控制器通用接口
//!
//! # 设计理念
//!
//! - **Tick 模式**: 循环驱动控制器，控制器只负责计算
//! - **时间感知**: 显式传入 `t`，便于单元测试
//! - **失败值**: `compute` 不返回错误，子控制器在失效时输出自己文档化的失败值
//!
//! # 生命周期
//!
//! - **初始化**: `init()` 在循环开始前调用一次，校验配置并完成离线计算（如 LQR 增益）
//! - **运行**: 每个节拍调用一次 `compute()`
//! - **重置**: `reset()` 清除内部记忆（积分项、滤波器状态等）
//!
//! # 示例
//!
//! ```rust
//! use pendulum_control::{ControlError, Controller};
//! use pendulum_model::{Control, State};
//!
//! struct Damper {
//!     gain: f64,
//! }
//!
//! impl Controller for Damper {
//!     fn compute(&mut self, _t: f64, x: &State) -> Control {
//!         Control::new(-self.gain * x[2], -self.gain * x[3])
//!     }
//! }
//!
//! let mut c = Damper { gain: 0.5 };
//! c.init().unwrap();
//! assert_eq!(c.compute(0.0, &State::new(0.0, 0.0, 2.0, 0.0))[0], -1.0);
//! ```

use crate::ControlError;
use pendulum_model::{Control, State};

/// 控制器通用接口
///
/// `Controller` 本身不要求 `Send` 或 `Sync`，循环在单线程内同步执行。
pub trait Controller {
    /// 循环开始前调用一次
    ///
    /// 默认实现不做任何事。
    fn init(&mut self) -> Result<(), ControlError> {
        Ok(())
    }

    /// 计算一个节拍的控制输出
    ///
    /// 对任意有限输入都不应 panic。
    fn compute(&mut self, t: f64, x: &State) -> Control;

    /// 清除内部记忆
    fn reset(&mut self) {}

    /// 最近一个节拍使用的状态估计
    ///
    /// 带测量滤波的控制器返回滤波值，循环据此检测估计值的数值故障。
    /// 默认返回 `None`（无滤波）。
    fn state_estimate(&self) -> Option<State> {
        None
    }
}

/// 检查力矩限制：每个关节都必须是非负有限值
pub fn check_torque_limit(limit: &Control) -> Result<(), ControlError> {
    for (joint, &value) in limit.iter().enumerate() {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ControlError::InvalidTorqueLimit { joint, value });
        }
    }
    Ok(())
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn init(&mut self) -> Result<(), ControlError> {
        (**self).init()
    }

    fn compute(&mut self, t: f64, x: &State) -> Control {
        (**self).compute(t, x)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn state_estimate(&self) -> Option<State> {
        (**self).state_estimate()
    }
}

/// 输出恒定力矩的控制器
///
/// 用作组合控制器中的占位控制器，或测试中的桩。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantController {
    output: Control,
}

impl ConstantController {
    pub fn new(output: Control) -> Self {
        Self { output }
    }

    /// 零力矩
    pub fn zero() -> Self {
        Self::new(Control::zeros())
    }
}

impl Controller for ConstantController {
    fn compute(&mut self, _t: f64, _x: &State) -> Control {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_controller_delegates() {
        let mut boxed: Box<dyn Controller> = Box::new(ConstantController::new(Control::new(1.0, -1.0)));
        assert!(boxed.init().is_ok());
        assert_eq!(boxed.compute(0.0, &State::zeros()), Control::new(1.0, -1.0));
        boxed.reset();
        assert_eq!(ConstantController::zero().compute(3.0, &State::zeros()), Control::zeros());
    }
}
