//! 噪声、测量延迟和执行器模型
//!
//! 三个模型共享同一个随机数发生器，配置了 `seed` 时整次运行可复现。

use nalgebra::SVector;
use pendulum_model::{Control, State};
use pendulum_tools::{DelayMode, NoiseConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// 高斯噪声源
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    /// `seed` 为 `None` 时从系统熵源初始化
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// 逐通道采样 `N(0, σᵢ²)`，`σᵢ = 0` 的通道不消耗随机数
    pub fn gaussian<const N: usize>(&mut self, sigmas: &[f64; N]) -> SVector<f64, N> {
        SVector::from_fn(|i, _| {
            let sigma = sigmas[i];
            if sigma == 0.0 {
                0.0
            } else {
                let z: f64 = self.rng.sample(StandardNormal);
                sigma * z
            }
        })
    }
}

/// 测量模型：从真实状态历史取延迟样本，再叠加测量噪声
#[derive(Debug, Clone)]
pub struct MeasurementModel {
    sigmas: [f64; 4],
    delay_mode: DelayMode,
    delay_ticks: usize,
    history: Vec<State>,
}

impl MeasurementModel {
    /// 延迟节拍数 `n = ⌊delay/dt⌋ + 1`（`n = 1` 即当前状态）
    pub fn new(config: &NoiseConfig, dt: f64) -> Self {
        let delay_ticks = match config.delay_mode {
            DelayMode::None => 1,
            _ => (config.delay / dt).floor() as usize + 1,
        };
        Self {
            sigmas: config.meas_noise_sigmas,
            delay_mode: config.delay_mode,
            delay_ticks,
            history: Vec::new(),
        }
    }

    pub fn delay_ticks(&self) -> usize {
        self.delay_ticks
    }

    /// 记录当前真实状态并返回本节拍的测量值
    ///
    /// 历史不足 `n` 个样本时使用最早的样本。
    pub fn measure(&mut self, x: &State, noise: &mut NoiseSource) -> State {
        self.history.push(*x);
        let delayed = self.history[self.history.len().saturating_sub(self.delay_ticks)];

        let mut x_meas = *x;
        match self.delay_mode {
            DelayMode::None => {},
            DelayMode::PosVel => x_meas = delayed,
            DelayMode::Vel => {
                x_meas[2] = delayed[2];
                x_meas[3] = delayed[3];
            },
        }
        x_meas + noise.gaussian(&self.sigmas)
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// 执行器模型：力矩噪声 + 一阶响应
///
/// `u_applied = u_last + r · (u_noisy − u_last)`，`r = 1` 时立即响应。
#[derive(Debug, Clone)]
pub struct ActuatorModel {
    sigmas: [f64; 2],
    responsiveness: f64,
    last_u: Control,
}

impl ActuatorModel {
    pub fn new(config: &NoiseConfig) -> Self {
        Self {
            sigmas: config.u_noise_sigmas,
            responsiveness: config.u_responsiveness,
            last_u: Control::zeros(),
        }
    }

    /// 由控制器输出得到执行器实际输出
    pub fn apply(&mut self, u: &Control, noise: &mut NoiseSource) -> Control {
        let u_noisy = u + noise.gaussian(&self.sigmas);
        let u_applied = self.last_u + self.responsiveness * (u_noisy - self.last_u);
        self.last_u = u_applied;
        u_applied
    }

    pub fn reset(&mut self) {
        self.last_u = Control::zeros();
    }
}
