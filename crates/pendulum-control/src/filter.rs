//! # 测量滤波
//!
//! 每个节拍调用一次 [`MeasurementFilter::update`]，由观测（可能带噪声和延迟）
//! 得到状态估计。滤波器在构造时由 [`FilterConfig`] 选定：
//!
//! | 种类 | 内部状态 |
//! |------|----------|
//! | `None` | 上一次观测 |
//! | `Lowpass` | 上一次平滑值 |
//! | `Kalman` | 均值 + 协方差（在线性化点展开） |
//! | `UnscentedKalman` | 均值 + 协方差（sigma 点经积分器传播） |
//!
//! 所有滤波器对 NaN/Inf 观测都原样传播，不做钳位，由循环检测并报告。

use nalgebra::{Matrix4, Matrix4x2};
use pendulum_model::{Control, Dynamics, Integrator, State};
use pendulum_tools::{FilterConfig, FilterKind};
use std::sync::Arc;

/// 测量滤波器接口
pub trait MeasurementFilter {
    /// 输入一个观测，返回新的估计
    ///
    /// `last_control` 是上一个节拍实际输出的控制量（卡尔曼预测用）。
    fn update(&mut self, observation: &State, last_control: &Control, dt: f64) -> State;

    /// 当前估计
    fn estimate(&self) -> State;

    /// 恢复到初始状态
    fn reset(&mut self);
}

impl<F: MeasurementFilter + ?Sized> MeasurementFilter for Box<F> {
    fn update(&mut self, observation: &State, last_control: &Control, dt: f64) -> State {
        (**self).update(observation, last_control, dt)
    }

    fn estimate(&self) -> State {
        (**self).estimate()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

fn variances(sigmas: &[f64; 4]) -> [f64; 4] {
    sigmas.map(|s| s * s)
}

/// 不滤波
#[derive(Debug, Clone)]
pub struct IdentityFilter {
    x0: State,
    estimate: State,
}

impl IdentityFilter {
    pub fn new(x0: State) -> Self {
        Self { x0, estimate: x0 }
    }
}

impl MeasurementFilter for IdentityFilter {
    fn update(&mut self, observation: &State, _last_control: &Control, _dt: f64) -> State {
        self.estimate = *observation;
        self.estimate
    }

    fn estimate(&self) -> State {
        self.estimate
    }

    fn reset(&mut self) {
        self.estimate = self.x0;
    }
}

/// 一阶低通（指数平滑）
///
/// `est_i = α_i · obs_i + (1 − α_i) · est_i`，初值为参考状态 `x0`。
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: State,
    x0: State,
    estimate: State,
}

impl LowPassFilter {
    pub fn new(alpha: [f64; 4], x0: State) -> Self {
        Self {
            alpha: State::from(alpha),
            x0,
            estimate: x0,
        }
    }
}

impl MeasurementFilter for LowPassFilter {
    fn update(&mut self, observation: &State, _last_control: &Control, _dt: f64) -> State {
        self.estimate = self.alpha.component_mul(observation)
            + (State::repeat(1.0) - self.alpha).component_mul(&self.estimate);
        self.estimate
    }

    fn estimate(&self) -> State {
        self.estimate
    }

    fn reset(&mut self) {
        self.estimate = self.x0;
    }
}

/// 预测协方差的对角下限，防止协方差塌缩后增益失去数值意义
const VARIANCE_FLOOR: f64 = 1e-12;

/// 观测更新（观测矩阵为单位阵，观测噪声为对角阵）
///
/// 逐通道做标量更新，与批量更新等价。噪声为零的通道更新后与观测一致。
fn sequential_update(x: &mut State, p: &mut Matrix4<f64>, observation: &State, r: &[f64; 4]) {
    for i in 0..4 {
        let s = p[(i, i)] + r[i];
        if !(s > 0.0) {
            continue;
        }
        let k: State = p.column(i) / s;
        let row = p.row(i).into_owned();
        let innovation = observation[i] - x[i];
        *x += k * innovation;
        *p -= k * row;
    }
    *p = 0.5 * (*p + p.transpose());
}

/// 线性卡尔曼滤波
///
/// 在 `(x_lin, u_lin)` 处线性化：`A_d = I + A·dt`，`B_d = B·dt`，
/// 在偏差坐标下做标准的预测/更新。
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    a: Matrix4<f64>,
    b: Matrix4x2<f64>,
    x_lin: State,
    u_lin: Control,
    q: Matrix4<f64>,
    r: [f64; 4],
    x0: State,
    x_hat: State,
    p: Matrix4<f64>,
}

impl KalmanFilter {
    pub fn new(
        plant: &dyn Dynamics,
        x_lin: State,
        u_lin: Control,
        process_noise_sigmas: [f64; 4],
        meas_noise_sigmas: [f64; 4],
        x0: State,
    ) -> Self {
        let (a, b) = plant.linear_matrices(&x_lin, &u_lin);
        Self {
            a,
            b,
            x_lin,
            u_lin,
            q: Matrix4::from_diagonal(&State::from(variances(&process_noise_sigmas))),
            r: variances(&meas_noise_sigmas),
            x0,
            x_hat: x0,
            p: Matrix4::identity(),
        }
    }

    /// 当前协方差
    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.p
    }
}

impl MeasurementFilter for KalmanFilter {
    fn update(&mut self, observation: &State, last_control: &Control, dt: f64) -> State {
        let ad = Matrix4::identity() + self.a * dt;
        let bd = self.b * dt;

        // 预测
        self.x_hat = self.x_lin + ad * (self.x_hat - self.x_lin) + bd * (last_control - self.u_lin);
        self.p = ad * self.p * ad.transpose() + self.q + Matrix4::identity() * VARIANCE_FLOOR;

        // 更新
        sequential_update(&mut self.x_hat, &mut self.p, observation, &self.r);
        self.x_hat
    }

    fn estimate(&self) -> State {
        self.x_hat
    }

    fn reset(&mut self) {
        self.x_hat = self.x0;
        self.p = Matrix4::identity();
    }
}

/// Merwe 缩放 sigma 点参数
const UKF_ALPHA: f64 = 1.0;
const UKF_BETA: f64 = 2.0;
const UKF_KAPPA: f64 = 0.0;
const UKF_N: usize = 4;

/// 无迹卡尔曼滤波
///
/// sigma 点通过与仿真相同的积分器传播。
pub struct UnscentedKalmanFilter {
    plant: Arc<dyn Dynamics>,
    integrator: Integrator,
    q: Matrix4<f64>,
    r: [f64; 4],
    x0: State,
    x_hat: State,
    p: Matrix4<f64>,
    wm: [f64; 2 * UKF_N + 1],
    wc: [f64; 2 * UKF_N + 1],
    lambda: f64,
}

impl UnscentedKalmanFilter {
    pub fn new(
        plant: Arc<dyn Dynamics>,
        integrator: Integrator,
        process_noise_sigmas: [f64; 4],
        meas_noise_sigmas: [f64; 4],
        x0: State,
    ) -> Self {
        let n = UKF_N as f64;
        let lambda = UKF_ALPHA * UKF_ALPHA * (n + UKF_KAPPA) - n;
        let w = 1.0 / (2.0 * (n + lambda));
        let mut wm = [w; 2 * UKF_N + 1];
        let mut wc = [w; 2 * UKF_N + 1];
        wm[0] = lambda / (n + lambda);
        wc[0] = wm[0] + (1.0 - UKF_ALPHA * UKF_ALPHA + UKF_BETA);

        Self {
            plant,
            integrator,
            q: Matrix4::from_diagonal(&State::from(variances(&process_noise_sigmas))),
            r: variances(&meas_noise_sigmas),
            x0,
            x_hat: x0,
            p: Matrix4::identity(),
            wm,
            wc,
            lambda,
        }
    }

    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.p
    }

    fn sigma_points(&self) -> Option<[State; 2 * UKF_N + 1]> {
        let scaled = (UKF_N as f64 + self.lambda) * self.p;
        let scaled = 0.5 * (scaled + scaled.transpose());
        let l = scaled
            .cholesky()
            .or_else(|| (scaled + Matrix4::identity() * 1e-12).cholesky())?
            .l();

        let mut points = [self.x_hat; 2 * UKF_N + 1];
        for i in 0..UKF_N {
            let col = l.column(i);
            points[1 + i] = self.x_hat + col;
            points[1 + UKF_N + i] = self.x_hat - col;
        }
        Some(points)
    }
}

impl MeasurementFilter for UnscentedKalmanFilter {
    fn update(&mut self, observation: &State, last_control: &Control, dt: f64) -> State {
        let (x_pred, p_pred) = match self.sigma_points() {
            Some(points) => {
                let propagated =
                    points.map(|x| self.integrator.step(&*self.plant, &x, last_control, dt));
                let mean = propagated
                    .iter()
                    .zip(&self.wm)
                    .fold(State::zeros(), |acc, (x, w)| acc + *w * x);
                let cov = propagated.iter().zip(&self.wc).fold(self.q, |acc, (x, w)| {
                    let d = x - mean;
                    acc + *w * d * d.transpose()
                });
                (mean, cov)
            },
            // 协方差失去正定性：只传播均值
            None => (
                self.integrator.step(&*self.plant, &self.x_hat, last_control, dt),
                self.p + self.q,
            ),
        };

        self.x_hat = x_pred;
        self.p = p_pred + Matrix4::identity() * VARIANCE_FLOOR;
        sequential_update(&mut self.x_hat, &mut self.p, observation, &self.r);
        self.x_hat
    }

    fn estimate(&self) -> State {
        self.x_hat
    }

    fn reset(&mut self) {
        self.x_hat = self.x0;
        self.p = Matrix4::identity();
    }
}

/// 速度截断：滤波后 `|v| < cut` 的速度置零
pub struct VelocityCut<F> {
    inner: F,
    cut: f64,
    estimate: State,
}

impl<F: MeasurementFilter> VelocityCut<F> {
    pub fn new(inner: F, cut: f64) -> Self {
        let estimate = inner.estimate();
        Self { inner, cut, estimate }
    }
}

impl<F: MeasurementFilter> MeasurementFilter for VelocityCut<F> {
    fn update(&mut self, observation: &State, last_control: &Control, dt: f64) -> State {
        let mut x = self.inner.update(observation, last_control, dt);
        for v in x.iter_mut().skip(2) {
            if v.abs() < self.cut {
                *v = 0.0;
            }
        }
        self.estimate = x;
        x
    }

    fn estimate(&self) -> State {
        self.estimate
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.estimate = self.inner.estimate();
    }
}

/// 按配置构造滤波器
///
/// `plant` 是控制器侧的模型（卡尔曼线性化和 UKF 传播使用），
/// `x0` 是滤波初值。
pub fn build_filter(
    config: &FilterConfig,
    plant: Arc<dyn Dynamics>,
    x0: State,
) -> Box<dyn MeasurementFilter> {
    let filter: Box<dyn MeasurementFilter> = match config.kind {
        FilterKind::None => Box::new(IdentityFilter::new(x0)),
        FilterKind::Lowpass => Box::new(LowPassFilter::new(config.lowpass_alpha, x0)),
        FilterKind::Kalman => Box::new(KalmanFilter::new(
            &*plant,
            State::from(config.kalman_xlin),
            Control::from(config.kalman_ulin),
            config.kalman_process_noise_sigmas,
            config.kalman_meas_noise_sigmas,
            x0,
        )),
        FilterKind::UnscentedKalman => Box::new(UnscentedKalmanFilter::new(
            plant,
            config.ukalman_integrator,
            config.ukalman_process_noise_sigmas,
            config.ukalman_meas_noise_sigmas,
            x0,
        )),
    };

    if config.velocity_cut > 0.0 {
        Box::new(VelocityCut::new(filter, config.velocity_cut))
    } else {
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pendulum_model::{DoublePendulumPlant, ModelParameters, upright_goal};

    fn plant() -> Arc<dyn Dynamics> {
        Arc::new(DoublePendulumPlant::new(ModelParameters::default()).unwrap())
    }

    #[test]
    fn test_lowpass_alpha_one_passes_observation() {
        let mut f = LowPassFilter::new([1.0; 4], State::zeros());
        let obs = State::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(f.update(&obs, &Control::zeros(), 0.01), obs);
    }

    #[test]
    fn test_lowpass_alpha_zero_holds_x0() {
        let x0 = upright_goal();
        let mut f = LowPassFilter::new([0.0; 4], x0);
        for k in 0..10 {
            let obs = State::repeat(k as f64);
            assert_eq!(f.update(&obs, &Control::zeros(), 0.01), x0);
        }
    }

    #[test]
    fn test_lowpass_smoothing_and_reset() {
        let mut f = LowPassFilter::new([1.0, 1.0, 0.2, 0.2], State::zeros());
        let est = f.update(&State::new(0.5, 0.5, 1.0, 1.0), &Control::zeros(), 0.01);
        assert_relative_eq!(est, State::new(0.5, 0.5, 0.2, 0.2), epsilon = 1e-12);
        let est = f.update(&State::new(0.5, 0.5, 1.0, 1.0), &Control::zeros(), 0.01);
        assert_relative_eq!(est[2], 0.36, epsilon = 1e-12);

        f.reset();
        assert_eq!(f.estimate(), State::zeros());
    }

    #[test]
    fn test_lowpass_propagates_nan() {
        let mut f = LowPassFilter::new([0.5; 4], State::zeros());
        let est = f.update(&State::new(f64::NAN, 0.0, 0.0, 0.0), &Control::zeros(), 0.01);
        assert!(est[0].is_nan());
    }

    #[test]
    fn test_kalman_exact_measurements() {
        let goal = upright_goal();
        let mut f = KalmanFilter::new(&*plant(), goal, Control::zeros(), [0.0; 4], [0.0; 4], goal);
        for k in 0..5 {
            let obs = goal + State::new(0.01 * k as f64, 0.0, 0.1, 0.0);
            let est = f.update(&obs, &Control::zeros(), 0.01);
            assert_relative_eq!(est, obs, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_kalman_blends_noisy_measurement() {
        let goal = upright_goal();
        let mut f = KalmanFilter::new(&*plant(), goal, Control::zeros(), [0.0; 4], [1.0; 4], goal);
        let est = f.update(&(goal + State::new(0.0, 0.0, 1.0, 0.0)), &Control::zeros(), 0.001);
        assert!(est[2] > 0.0 && est[2] < 1.0);
        assert!(f.covariance().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_ukf_exact_measurements() {
        let goal = upright_goal();
        let mut f = UnscentedKalmanFilter::new(plant(), Integrator::RungeKutta, [0.0; 4], [0.0; 4], goal);
        let obs = goal + State::new(0.02, -0.01, 0.1, 0.0);
        let est = f.update(&obs, &Control::zeros(), 0.005);
        assert_relative_eq!(est, obs, epsilon = 1e-9);
    }

    #[test]
    fn test_ukf_covariance_stays_finite() {
        let goal = upright_goal();
        let mut f =
            UnscentedKalmanFilter::new(plant(), Integrator::Euler, [0.01; 4], [0.1; 4], goal);
        for k in 0..50 {
            let obs = goal + State::new(0.001 * k as f64, 0.0, 0.0, 0.0);
            f.update(&obs, &Control::zeros(), 0.005);
        }
        assert!(f.covariance().iter().all(|c| c.is_finite()));
        assert!((f.estimate() - goal).norm() < 0.5);
        f.reset();
        assert_eq!(f.estimate(), goal);
    }

    #[test]
    fn test_velocity_cut() {
        let mut f = VelocityCut::new(IdentityFilter::new(State::zeros()), 0.1);
        let est = f.update(&State::new(0.05, 0.05, 0.05, -0.5), &Control::zeros(), 0.01);
        assert_eq!(est, State::new(0.05, 0.05, 0.0, -0.5));
    }

    #[test]
    fn test_build_filter_from_config() {
        let config = FilterConfig::lowpass([1.0, 1.0, 0.0, 0.0]).with_velocity_cut(0.1);
        let mut f = build_filter(&config, plant(), State::zeros());
        let est = f.update(&State::new(1.0, 1.0, 5.0, 5.0), &Control::zeros(), 0.01);
        assert_eq!(est, State::new(1.0, 1.0, 0.0, 0.0));

        let config = FilterConfig {
            kind: FilterKind::UnscentedKalman,
            ..FilterConfig::default()
        };
        let mut f = build_filter(&config, plant(), upright_goal());
        let est = f.update(&upright_goal(), &Control::zeros(), 0.01);
        assert_relative_eq!(est, upright_goal(), epsilon = 1e-9);
    }
}
