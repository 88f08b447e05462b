//! 由运行配置组装控制器

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use nalgebra::Matrix4;
use pendulum_sdk::control::Condition;
use pendulum_sdk::prelude::*;
use std::sync::Arc;
use tracing::info;

/// 组合控制器（子控制器在运行时选定）
pub type Supervisor = CombinedController<Box<dyn Controller>, Box<dyn Controller>>;

/// 控制器组合方式
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControllerKind {
    /// 只用 LQR
    #[default]
    Lqr,
    /// 关节空间直线轨迹 PID，进入吸引域（或到达切换时刻）后切到 LQR
    RampPid,
}

/// 控制器相关的命令行参数
#[derive(Args, Debug, Clone)]
pub struct ControllerArgs {
    /// 控制器组合方式（学习策略控制器没有命令行入口，需通过库 API 的 PolicyController 使用）
    #[arg(long, value_enum, default_value_t = ControllerKind::Lqr)]
    pub controller: ControllerKind,

    /// ramp-pid：轨迹时长（秒）
    #[arg(long, default_value_t = 3.0)]
    pub ramp_duration: f64,

    /// ramp-pid：在此时刻之后切到 LQR（省略时按吸引域切换）
    #[arg(long)]
    pub switch_time: Option<f64>,

    /// ramp-pid：比例增益
    #[arg(long, default_value_t = 200.0)]
    pub kp: f64,

    /// ramp-pid：积分增益
    #[arg(long, default_value_t = 0.0)]
    pub ki: f64,

    /// ramp-pid：微分增益
    #[arg(long, default_value_t = 2.0)]
    pub kd: f64,
}

/// 控制器侧的对象模型
pub fn controller_plant(config: &RunConfig) -> Result<Arc<dyn Dynamics>> {
    let plant = DoublePendulumPlant::new(config.controller_model())
        .context("invalid controller model parameters")?;
    Ok(Arc::new(plant))
}

/// 组装组合控制器（滤波、摩擦补偿、力矩限制都取自配置）
pub fn build_supervisor(config: &RunConfig, args: &ControllerArgs) -> Result<Supervisor> {
    let plant = controller_plant(config)?;
    let mut lqr = LqrController::from_config(Arc::clone(&plant), &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit());

    let (controller1, controller2, condition2): (Box<dyn Controller>, Box<dyn Controller>, Condition) =
        match args.controller {
            ControllerKind::Lqr => (
                Box::new(lqr),
                Box::new(ConstantController::zero()),
                Box::new(conditions::never()),
            ),
            ControllerKind::RampPid => {
                let x0 = config.initial_state();
                let goal = config.goal_state();
                let reference = ReferenceTrajectory::linear_ramp(
                    args.ramp_duration,
                    config.dt,
                    [x0[0], x0[1]],
                    [goal[0], goal[1]],
                )?;
                let pid = TrajectoryPidController::new(reference)
                    .with_gains(args.kp, args.ki, args.kd)
                    .with_torque_limit(config.torque_limit());

                let condition2: Condition = match args.switch_time {
                    Some(t_switch) => Box::new(conditions::after_time(t_switch)),
                    None => Box::new(conditions::in_region(region_of_attraction(config, &mut lqr)?)),
                };
                (Box::new(pid), Box::new(lqr), condition2)
            },
        };

    let filter = build_filter(&config.filter, plant, config.initial_state());
    let mut supervisor = CombinedController::new(
        controller1,
        controller2,
        conditions::never(),
        condition2,
        false,
    )
    .with_filter(filter, config.dt)
    .with_torque_limit(config.torque_limit());

    if let Some(friction) = &config.friction_compensation {
        supervisor = supervisor.with_friction_compensation(FrictionCompensation::from(friction));
    }

    info!(
        "Controller: {:?}, filter: {:?}, friction compensation: {}",
        args.controller,
        config.filter.kind,
        config.friction_compensation.is_some()
    );
    Ok(supervisor)
}

/// 吸引域：`S` 缺省时使用 LQR 的 Riccati 解
fn region_of_attraction(config: &RunConfig, lqr: &mut LqrController) -> Result<RegionOfAttraction> {
    let Some(roa) = &config.roa else {
        bail!("ramp-pid without --switch-time needs a [roa] section in the run configuration");
    };
    let s = match roa.s {
        Some(s) => Matrix4::from_fn(|i, j| s[i][j]),
        None => {
            lqr.init().context("LQR initialization failed")?;
            *lqr.riccati_solution()
        },
    };
    Ok(RegionOfAttraction::new(config.goal_state(), s, roa.rho)?)
}
