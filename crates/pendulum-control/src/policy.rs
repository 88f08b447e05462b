//! 学习策略控制器
//!
//! 策略本身是黑盒（训练和模型文件格式不在本 crate 范围内）。
//! 这里只负责训练时约定的观测编码和动作缩放。

use crate::ControlError;
use crate::controller::{Controller, check_torque_limit};
use pendulum_model::{Control, Robot, State, saturate};
use std::f64::consts::{PI, TAU};
use std::path::PathBuf;
use tracing::warn;

/// 黑盒决策函数
///
/// 输入编码后的观测，输出动作（每个主动关节一个分量）。
pub trait Policy {
    fn act(&mut self, observation: &[f64]) -> Vec<f64>;
}

impl<F> Policy for F
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    fn act(&mut self, observation: &[f64]) -> Vec<f64> {
        self(observation)
    }
}

/// 观测编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateEncoding {
    /// `[(q1 mod 2π − π)/π, (q2 mod 2π − π)/π, v1/v_max, v2/v_max]`
    #[default]
    Normalized,
    /// `[cos q1, sin q1, cos q2, sin q2, v1/v_max, v2/v_max]`
    SinCos,
}

impl StateEncoding {
    /// 编码状态，速度先截断到 `±max_velocity`
    pub fn encode(self, x: &State, max_velocity: f64) -> Vec<f64> {
        let v1 = x[2].clamp(-max_velocity, max_velocity) / max_velocity;
        let v2 = x[3].clamp(-max_velocity, max_velocity) / max_velocity;
        match self {
            StateEncoding::Normalized => vec![
                (x[0].rem_euclid(TAU) - PI) / PI,
                (x[1].rem_euclid(TAU) - PI) / PI,
                v1,
                v2,
            ],
            StateEncoding::SinCos => vec![
                x[0].cos(),
                x[0].sin(),
                x[1].cos(),
                x[1].sin(),
                v1,
                v2,
            ],
        }
    }
}

/// 动作缩放约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionScaling {
    /// 动作在 `[-1, 1]`，乘以主动关节的力矩限制
    #[default]
    Normalized,
    /// 动作即力矩（Nm）
    Absolute,
}

/// 学习策略控制器
///
/// 策略失效（动作维度不对）时输出零力矩。
pub struct PolicyController {
    model_path: PathBuf,
    policy: Box<dyn Policy>,
    robot: Robot,
    torque_limit: Control,
    encoding: StateEncoding,
    scaling: ActionScaling,
    max_velocity: f64,
}

impl PolicyController {
    /// 创建策略控制器
    ///
    /// # 默认参数
    ///
    /// - 编码：`Normalized`，缩放：`Normalized`
    /// - 速度归一化上限 20 rad/s
    /// - 力矩限制取构型默认值
    pub fn new(model_path: impl Into<PathBuf>, policy: impl Policy + 'static, robot: Robot) -> Self {
        Self {
            model_path: model_path.into(),
            policy: Box::new(policy),
            robot,
            torque_limit: robot.default_torque_limit(),
            encoding: StateEncoding::default(),
            scaling: ActionScaling::default(),
            max_velocity: 20.0,
        }
    }

    pub fn with_torque_limit(mut self, torque_limit: Control) -> Self {
        self.torque_limit = torque_limit;
        self
    }

    pub fn with_encoding(mut self, encoding: StateEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_scaling(mut self, scaling: ActionScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// 动作 → 关节力矩
    fn decode(&self, action: &[f64]) -> Option<Control> {
        let active = self.robot.active_joints();
        let expected = active.iter().filter(|a| **a).count();
        if action.len() != expected {
            return None;
        }

        let mut u = Control::zeros();
        let mut actions = action.iter();
        for joint in 0..2 {
            if !active[joint] {
                continue;
            }
            let a = *actions.next()?;
            u[joint] = match self.scaling {
                ActionScaling::Normalized => a.clamp(-1.0, 1.0) * self.torque_limit[joint],
                ActionScaling::Absolute => a,
            };
        }
        Some(saturate(&u, &self.torque_limit))
    }
}

impl Controller for PolicyController {
    fn init(&mut self) -> Result<(), ControlError> {
        if self.model_path.as_os_str().is_empty() {
            return Err(ControlError::EmptyModelPath);
        }
        check_torque_limit(&self.torque_limit)
    }

    fn compute(&mut self, _t: f64, x: &State) -> Control {
        let observation = self.encoding.encode(x, self.max_velocity);
        let action = self.policy.act(&observation);
        match self.decode(&action) {
            Some(u) => u,
            None => {
                warn!("Policy returned {} actions for {:?}, using zero torque", action.len(), self.robot);
                Control::zeros()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_init_rejects_empty_path() {
        let mut c = PolicyController::new("", |_: &[f64]| vec![0.0], Robot::Pendubot);
        assert_eq!(c.init(), Err(ControlError::EmptyModelPath));

        let mut c = PolicyController::new("policy.zip", |_: &[f64]| vec![0.0], Robot::Pendubot);
        assert!(c.init().is_ok());
    }

    #[test]
    fn test_normalized_encoding() {
        let obs = StateEncoding::Normalized.encode(&State::new(PI, 0.0, 40.0, -10.0), 20.0);
        assert_relative_eq!(obs[0], 0.0);
        assert_relative_eq!(obs[1], -1.0);
        assert_relative_eq!(obs[2], 1.0);
        assert_relative_eq!(obs[3], -0.5);
    }

    #[test]
    fn test_sincos_encoding() {
        let obs = StateEncoding::SinCos.encode(&State::new(PI / 2.0, 0.0, 0.0, 0.0), 20.0);
        assert_eq!(obs.len(), 6);
        assert_relative_eq!(obs[1], 1.0);
        assert_relative_eq!(obs[2], 1.0);
    }

    #[test]
    fn test_pendubot_action_scaled_to_shoulder() {
        let mut c = PolicyController::new("p", |_: &[f64]| vec![0.5], Robot::Pendubot);
        assert_eq!(c.compute(0.0, &State::zeros()), Control::new(2.5, 0.0));
    }

    #[test]
    fn test_acrobot_action_clipped() {
        let mut c = PolicyController::new("p", |_: &[f64]| vec![-3.0], Robot::Acrobot);
        assert_eq!(c.compute(0.0, &State::zeros()), Control::new(0.0, -5.0));
    }

    #[test]
    fn test_absolute_scaling() {
        let mut c = PolicyController::new("p", |_: &[f64]| vec![1.0, -0.2], Robot::DoublePendulum)
            .with_scaling(ActionScaling::Absolute);
        assert_eq!(c.compute(0.0, &State::zeros()), Control::new(1.0, -0.2));
    }

    #[test]
    fn test_wrong_action_length_gives_zero() {
        let mut c = PolicyController::new("p", |_: &[f64]| vec![1.0, 1.0], Robot::Pendubot);
        assert_eq!(c.compute(0.0, &State::zeros()), Control::zeros());
    }

    #[test]
    fn test_policy_sees_encoded_observation() {
        let policy = |obs: &[f64]| {
            assert_eq!(obs.len(), 6);
            vec![0.0]
        };
        let mut c = PolicyController::new("p", policy, Robot::Pendubot).with_encoding(StateEncoding::SinCos);
        c.compute(0.0, &State::zeros());
    }
}
