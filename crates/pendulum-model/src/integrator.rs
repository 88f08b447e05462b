//! 固定步长积分器
//!
//! 仿真与 UKF 传播必须使用同一种积分格式，否则两者的预测不一致。

use crate::{Control, Dynamics, State};
use serde::{Deserialize, Serialize};

/// 积分格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// 显式欧拉
    Euler,
    /// 经典四阶 Runge-Kutta
    #[default]
    RungeKutta,
}

impl Integrator {
    /// 推进一步：`x_{k+1} = x_k + dt · Φ(x_k, u_k)`
    ///
    /// 控制量在步内保持不变（零阶保持）。
    pub fn step<D: Dynamics + ?Sized>(self, plant: &D, x: &State, u: &Control, dt: f64) -> State {
        x + dt * self.increment(plant, x, u, dt)
    }

    /// 单步平均斜率 `Φ`
    pub fn increment<D: Dynamics + ?Sized>(
        self,
        plant: &D,
        x: &State,
        u: &Control,
        dt: f64,
    ) -> State {
        match self {
            Integrator::Euler => plant.forward_dynamics(x, u),
            Integrator::RungeKutta => {
                let k1 = plant.forward_dynamics(x, u);
                let k2 = plant.forward_dynamics(&(x + 0.5 * dt * k1), u);
                let k3 = plant.forward_dynamics(&(x + 0.5 * dt * k2), u);
                let k4 = plant.forward_dynamics(&(x + dt * k3), u);
                (k1 + 2.0 * (k2 + k3) + k4) / 6.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// ẋ = -x 的线性测试系统
    struct Decay;

    impl Dynamics for Decay {
        fn forward_dynamics(&self, x: &State, _u: &Control) -> State {
            -x
        }

        fn torque_limit(&self) -> Control {
            Control::zeros()
        }
    }

    #[test]
    fn test_euler_step() {
        let x = State::repeat(1.0);
        let next = Integrator::Euler.step(&Decay, &x, &Control::zeros(), 0.1);
        assert_relative_eq!(next, State::repeat(0.9), epsilon = 1e-12);
    }

    #[test]
    fn test_runge_kutta_matches_exponential() {
        let mut x = State::repeat(1.0);
        let dt = 0.01;
        for _ in 0..100 {
            x = Integrator::RungeKutta.step(&Decay, &x, &Control::zeros(), dt);
        }
        assert_relative_eq!(x[0], (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_serde_names() {
        let i: Integrator = serde_json::from_str("\"runge_kutta\"").unwrap();
        assert_eq!(i, Integrator::RungeKutta);
    }
}
