//! 实时控制循环
//!
//! 每个节拍：读取状态 → 控制器 → 叠加扰动 → 裁剪 → 写入力矩 → 睡眠到下一个锚点。
//!
//! 扰动按墙钟时间 `t` 调度，规则与仿真相同（`|t − time| < dt` 的第一个节拍，只施加一次）。
//!
//! # 定时
//!
//! 锚点按 `period` 累加（不受单个节拍耗时影响），用 `spin_sleep`
//! 睡眠到锚点。某个节拍超过锚点即为超时：不睡眠，锚点重置为当前时间。
//! 连续超时次数超过阈值时以 [`RunFault::DeadlineOverrun`] 终止。
//!
//! # 收尾
//!
//! 无论循环如何结束（完成、停止、故障），都会写入零力矩并失能电机。

use crate::HardwareError;
use crate::bus::MotorBus;
use pendulum_control::Controller;
use pendulum_model::{Control, all_finite, saturate};
use pendulum_tools::{
    ConfigError, Perturbation, PerturbationSchedule, RunConfig, RunFault, RunReport, StopSignal,
    Termination, TimingStatistics, TrajectoryLog,
};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 硬件循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareConfig {
    /// 控制周期（秒）
    pub dt: f64,
    pub t0: f64,
    pub t_final: f64,
    /// 软件侧力矩限制
    pub torque_limit: Control,
    /// 允许的最大连续超时次数
    pub max_consecutive_overruns: u32,
    /// 叠加到控制输出上的外部扰动
    pub perturbations: Vec<Perturbation>,
}

impl HardwareConfig {
    pub fn from_run_config(config: &RunConfig) -> Self {
        Self {
            dt: config.dt,
            t0: config.t0,
            t_final: config.t_final,
            torque_limit: config.torque_limit(),
            max_consecutive_overruns: config.max_consecutive_overruns,
            perturbations: config.perturbations.clone(),
        }
    }

    pub fn num_ticks(&self) -> usize {
        ((self.t_final - self.t0) / self.dt).round().max(0.0) as usize
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.dt)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "dt".to_string(),
                value: self.dt,
                reason: "dt must be > 0",
            });
        }
        if !(self.t_final.is_finite() && self.t_final >= self.t0) {
            return Err(ConfigError::InvalidValue {
                field: "t_final".to_string(),
                value: self.t_final,
                reason: "t_final must be >= t0",
            });
        }
        for (i, &l) in self.torque_limit.iter().enumerate() {
            if !(l.is_finite() && l >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("torque_limit[{i}]"),
                    value: l,
                    reason: "torque limit must be finite and >= 0",
                });
            }
        }
        for p in &self.perturbations {
            let values = [
                ("perturbations.time", p.time),
                ("perturbations.tau", p.tau[0]),
                ("perturbations.tau", p.tau[1]),
            ];
            for (field, value) in values {
                if !value.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        value,
                        reason: "perturbation must be finite",
                    });
                }
            }
        }
        Ok(())
    }
}

/// 硬件实验结果
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    /// 日志中的状态为测量值
    pub report: RunReport,
    /// 每节拍执行时间（不含睡眠）
    pub timing: TimingStatistics,
}

/// 运行一次硬件实验（阻塞）
///
/// 控制器初始化和电机使能在循环开始之前完成，失败以 `Err` 返回。
/// 循环开始之后的总线错误、数值故障、连续超时和停止请求都正常返回
/// [`ExperimentResult`]，日志只包含已完成的节拍。
pub fn run_experiment<B, C>(
    bus: &mut B,
    controller: &mut C,
    config: &HardwareConfig,
    stop: &StopSignal,
) -> Result<ExperimentResult, HardwareError>
where
    B: MotorBus + ?Sized,
    C: Controller + ?Sized,
{
    config.validate()?;
    controller.init()?;
    bus.enable()?;

    let num_ticks = config.num_ticks();
    let period = config.period();
    let mut log = TrajectoryLog::with_capacity(num_ticks);
    let mut measured = Vec::with_capacity(num_ticks);
    let mut exec_times = Vec::with_capacity(num_ticks);
    let mut consecutive_overruns = 0u32;
    let mut perturbations = PerturbationSchedule::new(&config.perturbations);

    info!(
        "Hardware experiment started: {num_ticks} ticks at {:.1} Hz",
        1.0 / config.dt
    );

    let start = Instant::now();
    let mut next_tick = start;
    let mut termination = Termination::Completed;

    for tick in 0..num_ticks {
        if stop.is_stop_requested() {
            info!("Stop requested, experiment ends at tick {tick}");
            termination = Termination::Stopped { tick };
            break;
        }

        let tick_start = Instant::now();
        let t = config.t0 + tick_start.duration_since(start).as_secs_f64();

        let x = match bus.read_state() {
            Ok(x) => x,
            Err(e) => {
                termination = bus_fault(tick, &e.to_string());
                break;
            },
        };
        if !all_finite(&x) {
            termination = non_finite(tick, "measurement");
            break;
        }

        let u = controller.compute(t, &x);
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
        let u = saturate(&(u + perturbations.torque_at(t, config.dt)), &config.torque_limit);

        if let Err(e) = bus.write_torque(&u) {
            termination = bus_fault(tick, &e.to_string());
            break;
        }

        log.push(t, x, u);
        measured.push(x);
        exec_times.push(tick_start.elapsed());

        // 睡眠到下一个锚点（自动扣除本节拍耗时）
        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
            consecutive_overruns = 0;
        } else {
            consecutive_overruns += 1;
            warn!(
                "Control loop overrun at tick {tick}: {:?} behind schedule ({consecutive_overruns} consecutive)",
                now.duration_since(next_tick)
            );
            next_tick = now;
            if consecutive_overruns > config.max_consecutive_overruns {
                let fault = RunFault::DeadlineOverrun {
                    tick,
                    consecutive: consecutive_overruns,
                };
                error!("Experiment aborted: {fault}");
                termination = Termination::Fault(fault);
                break;
            }
        }
    }

    shutdown(bus);

    let timing = TimingStatistics::calculate(&exec_times, period);
    info!(
        "Hardware experiment finished after {} ticks ({:?}): avg {:.1} us, max {} us, {} overruns, {}/{} perturbations applied",
        log.len(),
        termination,
        timing.avg_us,
        timing.max_us,
        timing.overruns,
        perturbations.applied_count(),
        perturbations.len()
    );

    Ok(ExperimentResult {
        report: RunReport {
            log,
            measured,
            termination,
        },
        timing,
    })
}

/// 写入零力矩并失能；这里的错误只记录，不覆盖循环的终止原因
fn shutdown<B: MotorBus + ?Sized>(bus: &mut B) {
    if let Err(e) = bus.write_torque(&Control::zeros()) {
        error!("Failed to write zero torque during shutdown: {e}");
    }
    if let Err(e) = bus.disable() {
        error!("Failed to disable motors: {e}");
    }
}

fn bus_fault(tick: usize, message: &str) -> Termination {
    let fault = RunFault::Bus {
        tick,
        message: message.to_string(),
    };
    error!("Experiment aborted: {fault}");
    Termination::Fault(fault)
}

fn non_finite(tick: usize, quantity: &str) -> Termination {
    let fault = RunFault::NonFinite {
        tick,
        quantity: quantity.to_string(),
    };
    error!("Experiment aborted: {fault}");
    Termination::Fault(fault)
}
