//! # 运行配置
//!
//! 一次仿真/实验运行的全部只读参数。配置在循环开始前构造并校验，
//! 运行期间不可修改，仿真与硬件部署共用同一结构。
//!
//! ```toml
//! robot = "pendubot"
//! dt = 0.0025
//! t_final = 10.0
//!
//! [noise]
//! meas_noise_sigmas = [0.0, 0.0, 0.5, 0.5]
//! u_responsiveness = 0.95
//!
//! [filter]
//! kind = "lowpass"
//! lowpass_alpha = [1.0, 1.0, 0.2, 0.2]
//! ```

use anyhow::{Context, Result};
use pendulum_model::{Control, Integrator, ModelParameters, Robot, State};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config value {field} = {value}: {reason}")]
    InvalidValue {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid model parameters: {0}")]
    Model(#[from] pendulum_model::ModelError),
}

fn check(field: &str, value: f64, ok: bool, reason: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason,
        })
    }
}

fn check_sigmas(field: &str, sigmas: &[f64]) -> Result<(), ConfigError> {
    for (i, &s) in sigmas.iter().enumerate() {
        check(
            &format!("{field}[{i}]"),
            s,
            s.is_finite() && s >= 0.0,
            "standard deviation must be finite and >= 0",
        )?;
    }
    Ok(())
}

/// 测量延迟模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMode {
    /// 无延迟
    #[default]
    None,
    /// 位置和速度都延迟
    #[serde(alias = "posvel")]
    PosVel,
    /// 仅速度延迟
    Vel,
}

/// 噪声/延迟/执行器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// 过程噪声标准差（每个状态分量）
    pub process_noise_sigmas: [f64; 4],
    /// 测量噪声标准差（每个状态分量）
    pub meas_noise_sigmas: [f64; 4],
    /// 执行器力矩噪声标准差
    pub u_noise_sigmas: [f64; 2],
    /// 测量延迟（秒）
    pub delay: f64,
    /// 延迟模式
    pub delay_mode: DelayMode,
    /// 执行器响应系数 ∈ [0, 1]（一阶滞后，1 表示理想执行器）
    pub u_responsiveness: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            process_noise_sigmas: [0.0; 4],
            meas_noise_sigmas: [0.0; 4],
            u_noise_sigmas: [0.0; 2],
            delay: 0.0,
            delay_mode: DelayMode::None,
            u_responsiveness: 1.0,
        }
    }
}

impl NoiseConfig {
    /// 无噪声、无延迟的理想配置
    pub fn noiseless() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sigmas("noise.process_noise_sigmas", &self.process_noise_sigmas)?;
        check_sigmas("noise.meas_noise_sigmas", &self.meas_noise_sigmas)?;
        check_sigmas("noise.u_noise_sigmas", &self.u_noise_sigmas)?;
        check(
            "noise.delay",
            self.delay,
            self.delay.is_finite() && self.delay >= 0.0,
            "delay must be finite and >= 0",
        )?;
        check(
            "noise.u_responsiveness",
            self.u_responsiveness,
            (0.0..=1.0).contains(&self.u_responsiveness),
            "responsiveness must be within [0, 1]",
        )
    }
}

/// 滤波器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// 不滤波（仍可应用速度截断）
    #[default]
    None,
    /// 一阶低通（指数平滑）
    Lowpass,
    /// 线性卡尔曼滤波
    Kalman,
    /// 无迹卡尔曼滤波
    UnscentedKalman,
}

/// 测量滤波配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// |v| 小于此值的速度置零；<= 0 表示关闭
    pub velocity_cut: f64,
    /// 低通平滑系数（每个状态分量）
    pub lowpass_alpha: [f64; 4],
    /// 卡尔曼线性化状态
    pub kalman_xlin: [f64; 4],
    /// 卡尔曼线性化控制
    pub kalman_ulin: [f64; 2],
    pub kalman_process_noise_sigmas: [f64; 4],
    pub kalman_meas_noise_sigmas: [f64; 4],
    /// UKF 传播所用积分器（应与仿真一致）
    pub ukalman_integrator: Integrator,
    pub ukalman_process_noise_sigmas: [f64; 4],
    pub ukalman_meas_noise_sigmas: [f64; 4],
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::None,
            velocity_cut: -1.0,
            lowpass_alpha: [1.0, 1.0, 0.3, 0.3],
            kalman_xlin: [PI, 0.0, 0.0, 0.0],
            kalman_ulin: [0.0, 0.0],
            kalman_process_noise_sigmas: [0.0; 4],
            kalman_meas_noise_sigmas: [0.0; 4],
            ukalman_integrator: Integrator::RungeKutta,
            ukalman_process_noise_sigmas: [0.0; 4],
            ukalman_meas_noise_sigmas: [0.0; 4],
        }
    }
}

impl FilterConfig {
    /// 低通滤波配置
    pub fn lowpass(alpha: [f64; 4]) -> Self {
        Self {
            kind: FilterKind::Lowpass,
            lowpass_alpha: alpha,
            ..Self::default()
        }
    }

    /// 设置速度截断
    pub fn with_velocity_cut(mut self, velocity_cut: f64) -> Self {
        self.velocity_cut = velocity_cut;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, &a) in self.lowpass_alpha.iter().enumerate() {
            check(
                &format!("filter.lowpass_alpha[{i}]"),
                a,
                (0.0..=1.0).contains(&a),
                "smoothing coefficient must be within [0, 1]",
            )?;
        }
        check_sigmas("filter.kalman_process_noise_sigmas", &self.kalman_process_noise_sigmas)?;
        check_sigmas("filter.kalman_meas_noise_sigmas", &self.kalman_meas_noise_sigmas)?;
        check_sigmas("filter.ukalman_process_noise_sigmas", &self.ukalman_process_noise_sigmas)?;
        check_sigmas("filter.ukalman_meas_noise_sigmas", &self.ukalman_meas_noise_sigmas)?;
        check(
            "filter.velocity_cut",
            self.velocity_cut,
            !self.velocity_cut.is_nan(),
            "velocity cut must not be NaN",
        )
    }
}

/// 摩擦补偿参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionConfig {
    pub damping: [f64; 2],
    pub coulomb_fric: [f64; 2],
}

impl FrictionConfig {
    /// 使用模型参数中的辨识值
    pub fn from_model(params: &ModelParameters) -> Self {
        Self {
            damping: params.damping,
            coulomb_fric: params.coulomb_fric,
        }
    }
}

/// 外部扰动事件：在 `time` 时刻附加力矩 `tau`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub time: f64,
    pub tau: [f64; 2],
}

/// LQR 参数（对角代价矩阵）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LqrConfig {
    pub q_diag: [f64; 4],
    pub r_diag: [f64; 2],
    pub failure_value: f64,
    pub cost_to_go_cut: f64,
}

impl Default for LqrConfig {
    fn default() -> Self {
        Self {
            q_diag: [1.92, 1.92, 0.3, 0.3],
            r_diag: [0.82, 0.82],
            failure_value: 0.0,
            cost_to_go_cut: 15.0,
        }
    }
}

/// 吸引域参数
///
/// `s` 缺省时使用 LQR 求得的 Riccati 解。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoaConfig {
    pub rho: f64,
    #[serde(default)]
    pub s: Option<[[f64; 4]; 4]>,
}

/// 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub robot: Robot,
    pub integrator: Integrator,
    /// 控制周期 / 积分步长（秒）
    pub dt: f64,
    pub t0: f64,
    pub t_final: f64,
    pub x0: [f64; 4],
    pub goal: [f64; 4],
    pub torque_limit: [f64; 2],
    /// 随机数种子（None 表示使用熵源）
    pub seed: Option<u64>,
    /// 硬件模式：连续超时多少次后终止
    pub max_consecutive_overruns: u32,
    pub model: ModelParameters,
    pub noise: NoiseConfig,
    pub filter: FilterConfig,
    pub friction_compensation: Option<FrictionConfig>,
    pub perturbations: Vec<Perturbation>,
    pub lqr: LqrConfig,
    pub roa: Option<RoaConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let robot = Robot::Pendubot;
        let limit = robot.default_torque_limit();
        Self {
            robot,
            integrator: Integrator::RungeKutta,
            dt: 0.0025,
            t0: 0.0,
            t_final: 10.0,
            x0: [0.0; 4],
            goal: [PI, 0.0, 0.0, 0.0],
            torque_limit: [limit[0], limit[1]],
            seed: None,
            max_consecutive_overruns: 5,
            model: ModelParameters::default(),
            noise: NoiseConfig::default(),
            filter: FilterConfig::default(),
            friction_compensation: None,
            perturbations: Vec::new(),
            lqr: LqrConfig::default(),
            roa: None,
        }
    }
}

impl RunConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content).context("解析运行配置失败")?;
        Ok(config)
    }

    /// 从文件加载配置（并校验）
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("读取运行配置文件失败")?;
        let config = Self::from_toml_str(&content)?;
        config.validate().context("运行配置校验失败")?;
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化运行配置失败")
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.to_toml_string()?).context("写入运行配置文件失败")
    }

    pub fn initial_state(&self) -> State {
        State::from(self.x0)
    }

    pub fn goal_state(&self) -> State {
        State::from(self.goal)
    }

    pub fn torque_limit(&self) -> Control {
        Control::from(self.torque_limit)
    }

    /// 总节拍数（按 `dt` 取整，避免浮点累积误差）
    pub fn num_ticks(&self) -> usize {
        ((self.t_final - self.t0) / self.dt).round().max(0.0) as usize
    }

    /// 控制器使用的模型参数
    ///
    /// 启用摩擦补偿时去掉摩擦项，并使用运行配置的力矩限制。
    pub fn controller_model(&self) -> ModelParameters {
        let params = if self.friction_compensation.is_some() {
            self.model.without_friction()
        } else {
            self.model.clone()
        };
        params.with_torque_limit(self.torque_limit)
    }

    /// 全量校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("dt", self.dt, self.dt.is_finite() && self.dt > 0.0, "dt must be > 0")?;
        check(
            "t_final",
            self.t_final,
            self.t_final.is_finite() && self.t_final >= self.t0,
            "t_final must be >= t0",
        )?;
        for (i, &v) in self.x0.iter().chain(self.goal.iter()).enumerate() {
            check(&format!("x0/goal[{i}]"), v, v.is_finite(), "state must be finite")?;
        }
        for (i, &l) in self.torque_limit.iter().enumerate() {
            check(
                &format!("torque_limit[{i}]"),
                l,
                l.is_finite() && l >= 0.0,
                "torque limit must be finite and >= 0",
            )?;
        }
        for p in &self.perturbations {
            check("perturbations.time", p.time, p.time.is_finite(), "time must be finite")?;
            for (i, &tau) in p.tau.iter().enumerate() {
                check(
                    &format!("perturbations.tau[{i}]"),
                    tau,
                    tau.is_finite(),
                    "torque must be finite",
                )?;
            }
        }
        if let Some(roa) = &self.roa {
            check("roa.rho", roa.rho, roa.rho.is_finite() && roa.rho > 0.0, "rho must be > 0")?;
        }
        self.model.validate()?;
        self.noise.validate()?;
        self.filter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendulum_model::upright_goal;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_ticks(), 4000);
        assert_eq!(config.goal_state(), upright_goal());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = RunConfig::from_toml_str(
            r#"
            robot = "acrobot"
            dt = 0.002
            torque_limit = [0.5, 5.0]

            [noise]
            meas_noise_sigmas = [0.0, 0.0, 0.5, 0.5]
            delay_mode = "posvel"
            delay = 0.015

            [filter]
            kind = "lowpass"
            lowpass_alpha = [1.0, 1.0, 0.2, 0.2]

            [[perturbations]]
            time = 2.0
            tau = [0.5, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.robot, Robot::Acrobot);
        assert_eq!(config.dt, 0.002);
        assert_eq!(config.noise.delay_mode, DelayMode::PosVel);
        assert_eq!(config.noise.u_responsiveness, 1.0);
        assert_eq!(config.filter.kind, FilterKind::Lowpass);
        assert_eq!(config.perturbations.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RunConfig::default();
        config.seed = Some(7);
        config.friction_compensation = Some(FrictionConfig::from_model(&config.model));
        let text = config.to_toml_string().unwrap();
        assert_eq!(RunConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_negative_sigma() {
        let mut config = RunConfig::default();
        config.noise.meas_noise_sigmas[2] = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("noise.meas_noise_sigmas[2]"));
    }

    #[test]
    fn test_rejects_responsiveness_out_of_range() {
        let mut config = RunConfig::default();
        config.noise.u_responsiveness = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_perturbation_torque() {
        let mut config = RunConfig::default();
        config.perturbations.push(Perturbation { time: 1.0, tau: [0.0, f64::NAN] });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("perturbations.tau[1]"));

        config.perturbations[0].tau = [f64::INFINITY, 0.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_rho() {
        let mut config = RunConfig::default();
        config.roa = Some(RoaConfig { rho: 0.0, s: None });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_controller_model_drops_friction() {
        let mut config = RunConfig::default();
        assert_eq!(config.controller_model().damping, config.model.damping);

        config.friction_compensation = Some(FrictionConfig::from_model(&config.model));
        let params = config.controller_model();
        assert_eq!(params.damping, [0.0, 0.0]);
        assert_eq!(params.coulomb_fric, [0.0, 0.0]);
        assert_eq!(params.torque_limit, config.torque_limit);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        RunConfig::default().save_to_file(&path).unwrap();
        let loaded = RunConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, RunConfig::default());
    }
}
