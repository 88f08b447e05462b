//! 被控对象动力学
//!
//! 动力学方程的推导不在本 crate 范围内；这里只实现现成的
//! 机械臂方程 `M(q)q̈ + C(q,q̇)q̇ = τ_g(q) + τ − F(q̇)`。

use crate::{Control, ModelError, ModelParameters, State};
use nalgebra::{Matrix2, Matrix4, Matrix4x2, Vector2};
use std::sync::Arc;

/// 连续时间动力学接口
///
/// 积分器、LQR 线性化、UKF 传播和仿真循环都只依赖此 trait。
pub trait Dynamics: Send + Sync {
    /// 状态导数 `ẋ = f(x, u)`
    fn forward_dynamics(&self, x: &State, u: &Control) -> State;

    /// 执行器力矩限制
    fn torque_limit(&self) -> Control;

    /// 在 `(x0, u0)` 处线性化，返回 `(A, B)`
    ///
    /// 默认实现使用中心差分。
    fn linear_matrices(&self, x0: &State, u0: &Control) -> (Matrix4<f64>, Matrix4x2<f64>) {
        const EPS: f64 = 1e-6;
        let mut a = Matrix4::zeros();
        let mut b = Matrix4x2::zeros();

        for i in 0..4 {
            let mut dx = State::zeros();
            dx[i] = EPS;
            let col = (self.forward_dynamics(&(x0 + dx), u0)
                - self.forward_dynamics(&(x0 - dx), u0))
                / (2.0 * EPS);
            a.set_column(i, &col);
        }
        for i in 0..2 {
            let mut du = Control::zeros();
            du[i] = EPS;
            let col = (self.forward_dynamics(x0, &(u0 + du))
                - self.forward_dynamics(x0, &(u0 - du)))
                / (2.0 * EPS);
            b.set_column(i, &col);
        }

        (a, b)
    }
}

impl<D: Dynamics + ?Sized> Dynamics for Arc<D> {
    fn forward_dynamics(&self, x: &State, u: &Control) -> State {
        (**self).forward_dynamics(x, u)
    }

    fn torque_limit(&self) -> Control {
        (**self).torque_limit()
    }

    fn linear_matrices(&self, x0: &State, u0: &Control) -> (Matrix4<f64>, Matrix4x2<f64>) {
        (**self).linear_matrices(x0, u0)
    }
}

/// 平滑库仑摩擦的斜率（`cf · atan(k·q̇)`）
const COULOMB_SMOOTHING: f64 = 100.0;

/// 闭式双摆模型
#[derive(Debug, Clone)]
pub struct DoublePendulumPlant {
    params: ModelParameters,
}

impl DoublePendulumPlant {
    /// 由模型参数创建（参数先校验）
    pub fn new(params: ModelParameters) -> Result<Self, ModelError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// 模型参数（只读）
    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// 质量矩阵 `M(q)`
    pub fn mass_matrix(&self, x: &State) -> Matrix2<f64> {
        let p = &self.params;
        let (m2, l1, r2) = (p.mass[1], p.length[0], p.com[1]);
        let (i1, i2) = (p.inertia[0], p.inertia[1]);
        let (gr, ir) = (p.gear_ratio, p.motor_inertia);
        let c2 = x[1].cos();

        let m11 = i1 + i2 + m2 * l1 * l1 + 2.0 * m2 * l1 * r2 * c2 + gr * gr * ir + ir;
        let m12 = i2 + m2 * l1 * r2 * c2 - gr * ir;
        let m22 = i2 + gr * gr * ir;
        Matrix2::new(m11, m12, m12, m22)
    }

    /// 科氏力/离心力项 `C(q, q̇)q̇`
    fn coriolis(&self, x: &State) -> Vector2<f64> {
        let p = &self.params;
        let h = p.mass[1] * p.length[0] * p.com[1] * x[1].sin();
        let (qd1, qd2) = (x[2], x[3]);
        Vector2::new(-2.0 * h * qd1 * qd2 - h * qd2 * qd2, h * qd1 * qd1)
    }

    /// 重力力矩 `τ_g(q)`
    fn gravity_torque(&self, x: &State) -> Vector2<f64> {
        let p = &self.params;
        let (m1, m2) = (p.mass[0], p.mass[1]);
        let (l1, r1, r2) = (p.length[0], p.com[0], p.com[1]);
        let g = p.gravity;
        let s1 = x[0].sin();
        let s12 = (x[0] + x[1]).sin();

        Vector2::new(
            -g * m1 * r1 * s1 - g * m2 * (l1 * s1 + r2 * s12),
            -g * m2 * r2 * s12,
        )
    }

    /// 摩擦力矩 `F(q̇)`
    fn friction_torque(&self, x: &State) -> Vector2<f64> {
        let p = &self.params;
        Vector2::new(
            p.damping[0] * x[2] + p.coulomb_fric[0] * (COULOMB_SMOOTHING * x[2]).atan(),
            p.damping[1] * x[3] + p.coulomb_fric[1] * (COULOMB_SMOOTHING * x[3]).atan(),
        )
    }
}

impl Dynamics for DoublePendulumPlant {
    fn forward_dynamics(&self, x: &State, u: &Control) -> State {
        let rhs = u - self.coriolis(x) + self.gravity_torque(x) - self.friction_torque(x);
        let qdd = match self.mass_matrix(x).try_inverse() {
            Some(m_inv) => m_inv * rhs,
            // 质量矩阵奇异：以 NaN 传播，由上层循环报告数值故障
            None => Vector2::repeat(f64::NAN),
        };
        State::new(x[2], x[3], qdd[0], qdd[1])
    }

    fn torque_limit(&self) -> Control {
        self.params.torque_limit()
    }
}
