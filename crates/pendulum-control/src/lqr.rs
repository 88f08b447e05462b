//! LQR Controller - 线性二次型调节器
//!
//! 在目标点线性化被控对象，求解 CARE 得到增益 `K` 和代价矩阵 `S`：
//!
//! ```text
//! u = −K (wrap(x) − goal)
//! V(x) = (wrap(x) − goal)ᵀ S (wrap(x) − goal)
//! ```
//!
//! 当 `V(x) > cost_to_go_cut` 时线性化已不可信，输出 `failure_value`
//! 并置位饱和标志，由上层（组合控制器）决定如何应对。
//!
//! # 示例
//!
//! ```rust
//! use pendulum_control::{Controller, LqrController};
//! use pendulum_model::{DoublePendulumPlant, ModelParameters, State, upright_goal};
//! use nalgebra::{Matrix2, Matrix4};
//! use std::sync::Arc;
//!
//! let plant = Arc::new(DoublePendulumPlant::new(ModelParameters::default()).unwrap());
//! let mut lqr = LqrController::new(plant)
//!     .with_cost_matrices(Matrix4::from_diagonal(&State::new(1.92, 1.92, 0.3, 0.3)), Matrix2::identity() * 0.82)
//!     .with_parameters(0.0, 15.0);
//! lqr.init().unwrap();
//!
//! let u = lqr.compute(0.0, &upright_goal());
//! assert!(u.norm() < 1e-9);
//! ```

use crate::controller::{Controller, check_torque_limit};
use crate::riccati::solve_continuous_are;
use crate::ControlError;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2};
use pendulum_model::{Control, Dynamics, State, saturate, upright_goal, wrap_angles_top};
use pendulum_tools::config::LqrConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// LQR 控制器
pub struct LqrController {
    plant: Arc<dyn Dynamics>,
    goal: State,
    q: Matrix4<f64>,
    r: Matrix2<f64>,
    k: Matrix2x4<f64>,
    s: Matrix4<f64>,
    failure_value: f64,
    cost_to_go_cut: f64,
    torque_limit: Control,
    initialized: bool,
    saturated: bool,
}

impl LqrController {
    /// 创建 LQR 控制器
    ///
    /// # 默认参数
    ///
    /// - 目标：倒立平衡点
    /// - Q = I，R = I
    /// - failure_value = 0.0，cost_to_go_cut = 15.0
    /// - 力矩限制取自被控对象模型
    pub fn new(plant: Arc<dyn Dynamics>) -> Self {
        let torque_limit = plant.torque_limit();
        Self {
            plant,
            goal: upright_goal(),
            q: Matrix4::identity(),
            r: Matrix2::identity(),
            k: Matrix2x4::zeros(),
            s: Matrix4::zeros(),
            failure_value: 0.0,
            cost_to_go_cut: 15.0,
            torque_limit,
            initialized: false,
            saturated: false,
        }
    }

    /// 由配置创建（对角代价矩阵）
    pub fn from_config(plant: Arc<dyn Dynamics>, config: &LqrConfig) -> Self {
        Self::new(plant)
            .with_cost_matrices(
                Matrix4::from_diagonal(&State::from(config.q_diag)),
                Matrix2::from_diagonal(&Vector2::from(config.r_diag)),
            )
            .with_parameters(config.failure_value, config.cost_to_go_cut)
    }

    /// 设置目标状态（内部以 wrap-to-top 形式保存）
    pub fn with_goal(mut self, goal: State) -> Self {
        self.goal = wrap_angles_top(&goal);
        self
    }

    pub fn with_cost_matrices(mut self, q: Matrix4<f64>, r: Matrix2<f64>) -> Self {
        self.q = q;
        self.r = r;
        self
    }

    /// 设置失败输出值和代价截断
    pub fn with_parameters(mut self, failure_value: f64, cost_to_go_cut: f64) -> Self {
        self.failure_value = failure_value;
        self.cost_to_go_cut = cost_to_go_cut;
        self
    }

    pub fn with_torque_limit(mut self, torque_limit: Control) -> Self {
        self.torque_limit = torque_limit;
        self
    }

    /// 反馈增益 `K`（`init` 之前为零）
    pub fn gain(&self) -> &Matrix2x4<f64> {
        &self.k
    }

    /// Riccati 解 `S`（`init` 之前为零）
    pub fn riccati_solution(&self) -> &Matrix4<f64> {
        &self.s
    }

    pub fn goal(&self) -> &State {
        &self.goal
    }

    /// 代价 `V(x)`，`x` 在内部先 wrap
    pub fn cost_to_go(&self, x: &State) -> f64 {
        let diff = wrap_angles_top(x) - self.goal;
        diff.dot(&(self.s * diff))
    }

    /// 上一个节拍是否输出了失败值
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    fn set_saturated(&mut self, saturated: bool, cost: f64) {
        if saturated != self.saturated {
            if saturated {
                debug!("LQR cost-to-go {cost:.3} exceeds cut {}, using failure value", self.cost_to_go_cut);
            } else {
                debug!("LQR cost-to-go back below cut ({cost:.3})");
            }
        }
        self.saturated = saturated;
    }
}

impl Controller for LqrController {
    fn init(&mut self) -> Result<(), ControlError> {
        check_torque_limit(&self.torque_limit)?;
        let (a, b) = self.plant.linear_matrices(&self.goal, &Control::zeros());
        let (k, s) = solve_continuous_are(&a, &b, &self.q, &self.r)?;
        self.k = k;
        self.s = s;
        self.initialized = true;
        self.saturated = false;
        debug!("LQR gain computed: K = {:?}", self.k.as_slice());
        Ok(())
    }

    fn compute(&mut self, _t: f64, x: &State) -> Control {
        if !self.initialized {
            warn!("LQR controller used before init, returning failure value");
            self.saturated = true;
            return Control::repeat(self.failure_value);
        }

        let diff = wrap_angles_top(x) - self.goal;
        let cost = diff.dot(&(self.s * diff));
        let u = if cost > self.cost_to_go_cut {
            self.set_saturated(true, cost);
            Control::repeat(self.failure_value)
        } else {
            self.set_saturated(false, cost);
            -(self.k * diff)
        };
        saturate(&u, &self.torque_limit)
    }

    fn reset(&mut self) {
        self.saturated = false;
    }
}
