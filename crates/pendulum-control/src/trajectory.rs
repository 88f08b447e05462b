//! Trajectory PID Controller - 轨迹跟踪 PID 控制器
//!
//! # 算法
//!
//! ```text
//! e  = wrap(q_des − q)
//! u  = Kp * e + Ki * ∫e dt + Kd * (q̇_des − q̇) [+ u_des]
//! ```
//!
//! 每个节拍在参考轨迹中从上次的索引起向前搜索 `num_break` 个采样点，
//! 取时间最近的一个。参考轨迹可以比控制频率稀疏。
//!
//! # 示例
//!
//! ```rust
//! use pendulum_control::{Controller, ReferenceTrajectory, TrajectoryPidController};
//! use pendulum_model::{Control, State};
//!
//! // 5 秒内两个关节从 0 匀速转到 -π/2
//! let reference = ReferenceTrajectory::linear_ramp(5.0, 0.002, [0.0, 0.0], [-1.57, -1.57]).unwrap();
//! let mut pid = TrajectoryPidController::new(reference)
//!     .with_gains(200.0, 0.0, 2.0)
//!     .with_torque_limit(Control::new(8.0, 8.0))
//!     .with_num_break(40);
//! pid.init().unwrap();
//! let u = pid.compute(0.0, &State::zeros());
//! assert!(u.norm() < 1e-9);
//! ```

use crate::ControlError;
use crate::controller::{Controller, check_torque_limit};
use nalgebra::Vector2;
use pendulum_model::{Control, State, saturate, wrap_angle_diff};

/// 参考轨迹 `(T, X, U?)`
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTrajectory {
    t: Vec<f64>,
    x: Vec<State>,
    u: Option<Vec<Control>>,
}

/// 三次多项式系数 `p(s) = a0 + a1*s + a2*s² + a3*s³`，`s ∈ [0, 1]`
#[derive(Debug, Clone, Copy)]
struct CubicCoeffs {
    a0: f64,
    a1: f64,
    a2: f64,
    a3: f64,
}

impl CubicCoeffs {
    /// 起止速度为 0
    fn rest_to_rest(start: f64, end: f64) -> Self {
        let d = end - start;
        Self {
            a0: start,
            a1: 0.0,
            a2: 3.0 * d,
            a3: -2.0 * d,
        }
    }

    fn position(&self, s: f64) -> f64 {
        self.a0 + self.a1 * s + self.a2 * s * s + self.a3 * s * s * s
    }

    /// 对归一化时间的导数
    fn velocity(&self, s: f64) -> f64 {
        self.a1 + 2.0 * self.a2 * s + 3.0 * self.a3 * s * s
    }
}

fn sample_count(duration: f64, dt: f64) -> Result<usize, ControlError> {
    if !(duration.is_finite() && duration > 0.0 && dt.is_finite() && dt > 0.0) {
        return Err(ControlError::InvalidTrajectory(format!(
            "duration {duration} and dt {dt} must be > 0"
        )));
    }
    Ok((duration / dt).round() as usize)
}

impl ReferenceTrajectory {
    /// 创建参考轨迹
    ///
    /// # 错误
    ///
    /// 长度不一致、为空、或时间不严格递增时返回 [`ControlError::InvalidTrajectory`]。
    pub fn new(t: Vec<f64>, x: Vec<State>, u: Option<Vec<Control>>) -> Result<Self, ControlError> {
        if t.is_empty() {
            return Err(ControlError::InvalidTrajectory("empty trajectory".to_string()));
        }
        if x.len() != t.len() || u.as_ref().is_some_and(|u| u.len() != t.len()) {
            return Err(ControlError::InvalidTrajectory(format!(
                "length mismatch: t={}, x={}, u={:?}",
                t.len(),
                x.len(),
                u.as_ref().map(Vec::len)
            )));
        }
        if t.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ControlError::InvalidTrajectory(
                "time samples must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { t, x, u })
    }

    /// 关节空间直线轨迹
    ///
    /// `N = duration/dt` 段，速度为位置的前向差分（最后一点为 0）。
    pub fn linear_ramp(
        duration: f64,
        dt: f64,
        start: [f64; 2],
        end: [f64; 2],
    ) -> Result<Self, ControlError> {
        let n = sample_count(duration, dt)?;
        let t: Vec<f64> = (0..=n).map(|i| duration * i as f64 / n as f64).collect();
        let p: Vec<Vector2<f64>> = (0..=n)
            .map(|i| {
                let s = i as f64 / n as f64;
                Vector2::new(start[0] + s * (end[0] - start[0]), start[1] + s * (end[1] - start[1]))
            })
            .collect();
        let x = (0..=n)
            .map(|i| {
                let v = if i < n { (p[i + 1] - p[i]) / dt } else { Vector2::zeros() };
                State::new(p[i][0], p[i][1], v[0], v[1])
            })
            .collect();
        Self::new(t, x, None)
    }

    /// 起止速度为 0 的三次多项式轨迹
    pub fn cubic(duration: f64, dt: f64, start: [f64; 2], end: [f64; 2]) -> Result<Self, ControlError> {
        let n = sample_count(duration, dt)?;
        let coeffs = [
            CubicCoeffs::rest_to_rest(start[0], end[0]),
            CubicCoeffs::rest_to_rest(start[1], end[1]),
        ];
        let t: Vec<f64> = (0..=n).map(|i| duration * i as f64 / n as f64).collect();
        let x = (0..=n)
            .map(|i| {
                let s = i as f64 / n as f64;
                State::new(
                    coeffs[0].position(s),
                    coeffs[1].position(s),
                    coeffs[0].velocity(s) / duration,
                    coeffs[1].velocity(s) / duration,
                )
            })
            .collect();
        Self::new(t, x, None)
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.t
    }

    pub fn states(&self) -> &[State] {
        &self.x
    }

    pub fn controls(&self) -> Option<&[Control]> {
        self.u.as_deref()
    }
}

/// 轨迹跟踪 PID 控制器
#[derive(Debug, Clone)]
pub struct TrajectoryPidController {
    reference: ReferenceTrajectory,

    /// 比例增益 (Kp)
    kp: f64,

    /// 积分增益 (Ki)
    ki: f64,

    /// 微分增益 (Kd)
    kd: f64,

    /// 前向搜索窗口
    num_break: usize,

    use_feed_forward: bool,

    torque_limit: Control,

    /// 积分项累积值
    integral: Vector2<f64>,

    /// 上次匹配到的参考索引
    counter: usize,

    last_t: Option<f64>,
}

impl TrajectoryPidController {
    /// 创建控制器
    ///
    /// # 默认参数
    ///
    /// - Kp = Ki = Kd = 0（需要手动设置）
    /// - `num_break` = 40
    /// - 不使用前馈力矩
    /// - 力矩限制 = 5 Nm
    pub fn new(reference: ReferenceTrajectory) -> Self {
        Self {
            reference,
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            num_break: 40,
            use_feed_forward: false,
            torque_limit: Control::repeat(5.0),
            integral: Vector2::zeros(),
            counter: 0,
            last_t: None,
        }
    }

    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// 设置前向搜索窗口（至少为 1）
    pub fn with_num_break(mut self, num_break: usize) -> Self {
        self.num_break = num_break.max(1);
        self
    }

    /// 叠加参考控制作为前馈（参考轨迹需带 `U`）
    pub fn with_feed_forward(mut self, enabled: bool) -> Self {
        self.use_feed_forward = enabled;
        self
    }

    pub fn with_torque_limit(mut self, torque_limit: Control) -> Self {
        self.torque_limit = torque_limit;
        self
    }

    /// 获取当前积分项
    pub fn integral(&self) -> Vector2<f64> {
        self.integral
    }

    /// 当前匹配的参考索引
    pub fn reference_index(&self) -> usize {
        self.counter
    }

    fn nearest_index(&self, t: f64) -> usize {
        let times = self.reference.times();
        let end = (self.counter + self.num_break).min(times.len());
        let mut best = self.counter;
        let mut best_dist = f64::INFINITY;
        for (i, &ti) in times.iter().enumerate().take(end).skip(self.counter) {
            let dist = (ti - t).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }
        best
    }
}

impl Controller for TrajectoryPidController {
    fn init(&mut self) -> Result<(), ControlError> {
        check_torque_limit(&self.torque_limit)?;
        if self.use_feed_forward && self.reference.controls().is_none() {
            return Err(ControlError::InvalidTrajectory(
                "feed-forward requested but reference has no controls".to_string(),
            ));
        }
        self.reset();
        Ok(())
    }

    fn compute(&mut self, t: f64, x: &State) -> Control {
        let index = self.nearest_index(t);
        self.counter = index;
        let x_des = self.reference.states()[index];

        let e = Vector2::new(wrap_angle_diff(x_des[0] - x[0]), wrap_angle_diff(x_des[1] - x[1]));
        let ed = Vector2::new(x_des[2] - x[2], x_des[3] - x[3]);

        let dt = self.last_t.map_or(0.0, |last| (t - last).max(0.0));
        self.last_t = Some(t);
        self.integral += e * dt;

        let mut u = self.kp * e + self.ki * self.integral + self.kd * ed;
        if self.use_feed_forward
            && let Some(controls) = self.reference.controls()
        {
            u += controls[index];
        }
        saturate(&u, &self.torque_limit)
    }

    fn reset(&mut self) {
        self.integral = Vector2::zeros();
        self.counter = 0;
        self.last_t = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> ReferenceTrajectory {
        ReferenceTrajectory::linear_ramp(1.0, 0.01, [0.0, 0.0], [-1.0, -0.5]).unwrap()
    }

    #[test]
    fn test_linear_ramp_shape() {
        let r = ramp();
        assert_eq!(r.len(), 101);
        assert_relative_eq!(r.times()[100], 1.0);
        assert_relative_eq!(r.states()[100][0], -1.0);
        assert_relative_eq!(r.states()[50][2], -1.0, epsilon = 1e-9);
        assert_relative_eq!(r.states()[50][3], -0.5, epsilon = 1e-9);
        assert_eq!(r.states()[100][2], 0.0);
    }

    #[test]
    fn test_cubic_rest_to_rest() {
        let r = ReferenceTrajectory::cubic(2.0, 0.01, [0.0, 1.0], [1.0, 1.0]).unwrap();
        let first = r.states()[0];
        let last = r.states()[r.len() - 1];
        assert_relative_eq!(first[2], 0.0);
        assert_relative_eq!(last[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(last[2], 0.0, epsilon = 1e-12);
        // 中点速度最大：1.5 * d / T
        assert_relative_eq!(r.states()[100][2], 0.75, epsilon = 1e-12);
        assert_relative_eq!(r.states()[100][1], 1.0);
    }

    #[test]
    fn test_rejects_invalid_reference() {
        assert!(ReferenceTrajectory::new(vec![], vec![], None).is_err());
        assert!(ReferenceTrajectory::new(vec![0.0, 0.0], vec![State::zeros(); 2], None).is_err());
        assert!(ReferenceTrajectory::new(vec![0.0], vec![State::zeros(); 2], None).is_err());
        assert!(ReferenceTrajectory::linear_ramp(0.0, 0.01, [0.0; 2], [1.0; 2]).is_err());
    }

    #[test]
    fn test_proportional_term() {
        let mut pid = TrajectoryPidController::new(ramp()).with_gains(10.0, 0.0, 0.0);
        pid.init().unwrap();
        let u = pid.compute(0.0, &State::new(0.1, -0.1, 0.0, 0.0));
        assert_relative_eq!(u[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(u[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_search_window_limits_jump() {
        let mut pid = TrajectoryPidController::new(ramp()).with_num_break(5);
        pid.compute(0.0, &State::zeros());
        // 时间跳到末尾，但一次只能前进窗口大小
        pid.compute(1.0, &State::zeros());
        assert_eq!(pid.reference_index(), 4);
        pid.compute(1.0, &State::zeros());
        assert_eq!(pid.reference_index(), 8);
    }

    #[test]
    fn test_integral_accumulates_and_resets() {
        let mut pid = TrajectoryPidController::new(ramp()).with_gains(0.0, 1.0, 0.0);
        let x = State::new(0.2, 0.0, 0.0, 0.0);
        pid.compute(0.0, &x);
        pid.compute(0.01, &x);
        // 第二个节拍参考为 -0.01，误差 -0.21
        assert_relative_eq!(pid.integral()[0], -0.21 * 0.01, epsilon = 1e-12);

        pid.reset();
        assert_eq!(pid.integral(), Vector2::zeros());
        assert_eq!(pid.reference_index(), 0);
    }

    #[test]
    fn test_feed_forward_requires_controls() {
        let mut pid = TrajectoryPidController::new(ramp()).with_feed_forward(true);
        assert!(pid.init().is_err());

        let reference = ReferenceTrajectory::new(
            vec![0.0, 1.0],
            vec![State::zeros(); 2],
            Some(vec![Control::new(0.3, -0.3); 2]),
        )
        .unwrap();
        let mut pid = TrajectoryPidController::new(reference).with_feed_forward(true);
        pid.init().unwrap();
        assert_eq!(pid.compute(0.0, &State::zeros()), Control::new(0.3, -0.3));
    }

    #[test]
    fn test_output_clipped() {
        let mut pid = TrajectoryPidController::new(ramp())
            .with_gains(1000.0, 0.0, 0.0)
            .with_torque_limit(Control::new(8.0, 0.5));
        let u = pid.compute(0.0, &State::new(1.0, 1.0, 0.0, 0.0));
        assert_eq!(u, Control::new(-8.0, -0.5));
    }
}
