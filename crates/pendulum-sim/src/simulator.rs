//! 固定步长闭环仿真
//!
//! 每个节拍的顺序：
//!
//! ```text
//! x ──▶ 测量（延迟 + 噪声）──▶ 控制器 ──▶ 执行器（噪声 + 一阶响应）
//!   ──▶ 叠加扰动 ──▶ 按对象力矩限制裁剪 ──▶ 积分 ──▶ 过程噪声 ──▶ x'
//! ```
//!
//! 仿真没有墙钟，节拍时间为 `t0 + k·dt`（不累加浮点误差）。

use crate::SimulationError;
use crate::noise::{ActuatorModel, MeasurementModel, NoiseSource};
use pendulum_control::Controller;
use pendulum_model::{DoublePendulumPlant, Dynamics, State, all_finite, saturate};
use pendulum_tools::{
    PerturbationSchedule, RunConfig, RunFault, RunReport, StopSignal, Termination, TrajectoryLog,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 仿真器
///
/// 持有被控对象和只读运行配置；每次 [`simulate`](Self::simulate)
/// 都重新创建噪声源和测量/执行器模型，同一 `seed` 的两次运行结果一致。
///
/// # 示例
///
/// ```rust
/// use pendulum_control::ConstantController;
/// use pendulum_sim::Simulator;
/// use pendulum_tools::{RunConfig, StopSignal};
///
/// let config = RunConfig { t_final: 0.1, ..RunConfig::default() };
/// let sim = Simulator::from_config(config).unwrap();
/// let report = sim.simulate(&mut ConstantController::zero(), &StopSignal::new()).unwrap();
/// assert!(report.is_completed());
/// assert_eq!(report.log.len(), 40);
/// ```
pub struct Simulator {
    plant: Arc<dyn Dynamics>,
    config: RunConfig,
}

impl Simulator {
    /// 创建仿真器（配置先校验）
    pub fn new(plant: Arc<dyn Dynamics>, config: RunConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { plant, config })
    }

    /// 使用配置中的模型参数构建闭式双摆对象
    pub fn from_config(config: RunConfig) -> Result<Self, SimulationError> {
        let plant = DoublePendulumPlant::new(config.model.clone())?;
        Self::new(Arc::new(plant), config)
    }

    /// 被控对象（可与控制器共享）
    pub fn plant(&self) -> Arc<dyn Dynamics> {
        Arc::clone(&self.plant)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 运行一次闭环仿真
    ///
    /// 控制器在循环开始前 `init()`，初始化失败以 `Err` 返回。
    /// 数值故障和停止请求都正常返回 [`RunReport`]，日志只包含已完成的节拍。
    pub fn simulate<C: Controller + ?Sized>(
        &self,
        controller: &mut C,
        stop: &StopSignal,
    ) -> Result<RunReport, SimulationError> {
        controller.init()?;

        let config = &self.config;
        let dt = config.dt;
        let num_ticks = config.num_ticks();
        let limit = self.plant.torque_limit();

        let mut noise = NoiseSource::new(config.seed);
        let mut measurement = MeasurementModel::new(&config.noise, dt);
        let mut actuator = ActuatorModel::new(&config.noise);
        let mut perturbations = PerturbationSchedule::new(&config.perturbations);

        let mut log = TrajectoryLog::with_capacity(num_ticks);
        let mut measured = Vec::with_capacity(num_ticks);
        let mut x = config.initial_state();

        info!(
            "Simulation started: {num_ticks} ticks, dt = {dt}, integrator = {:?}, measurement delay = {} ticks",
            config.integrator,
            measurement.delay_ticks()
        );

        let mut termination = Termination::Completed;
        for tick in 0..num_ticks {
            if stop.is_stop_requested() {
                info!("Stop requested, simulation ends at tick {tick}");
                termination = Termination::Stopped { tick };
                break;
            }

            let t = config.t0 + tick as f64 * dt;
            if !all_finite(&x) {
                termination = non_finite(tick, "state");
                break;
            }

            let x_meas = measurement.measure(&x, &mut noise);
            if !all_finite(&x_meas) {
                termination = non_finite(tick, "measurement");
                break;
            }

            let u = controller.compute(t, &x_meas);
            if let Some(x_est) = controller.state_estimate()
                && !all_finite(&x_est)
            {
                termination = non_finite(tick, "filter estimate");
                break;
            }
            if !all_finite(&u) {
                termination = non_finite(tick, "control");
                break;
            }

            let u_actuated = actuator.apply(&u, &mut noise) + perturbations.torque_at(t, dt);
            let u_applied = saturate(&u_actuated, &limit);

            log.push(t, x, u_applied);
            measured.push(x_meas);

            x = config.integrator.step(self.plant.as_ref(), &x, &u_applied, dt)
                + noise.gaussian(&config.noise.process_noise_sigmas);
        }

        if termination == Termination::Completed && !all_finite(&x) {
            termination = non_finite(num_ticks, "state");
        }

        match &termination {
            Termination::Completed => info!(
                "Simulation completed: {} ticks, {}/{} perturbations applied",
                log.len(),
                perturbations.applied_count(),
                perturbations.len()
            ),
            other => debug!("Simulation terminated early: {other:?}"),
        }

        Ok(RunReport {
            log,
            measured,
            termination,
        })
    }
}

fn non_finite(tick: usize, quantity: &str) -> Termination {
    let fault = RunFault::NonFinite {
        tick,
        quantity: quantity.to_string(),
    };
    error!("Simulation aborted: {fault}");
    Termination::Fault(fault)
}
