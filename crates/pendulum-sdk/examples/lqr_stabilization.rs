//! LQR 镇定演示
//!
//! 从倒立点附近出发，只用 LQR 控制，带测量噪声和低通滤波。
//!
//! ```bash
//! cargo run -p pendulum-sdk --example lqr_stabilization
//! ```

use pendulum_sdk::control::filter::LowPassFilter;
use pendulum_sdk::prelude::*;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    pendulum_sdk::init_logging()?;

    let goal = upright_goal();
    let mut config = RunConfig {
        x0: [goal[0] + 0.05, -0.05, 0.0, 0.0],
        t_final: 5.0,
        seed: Some(0),
        ..RunConfig::default()
    };
    config.noise.meas_noise_sigmas = [0.0, 0.0, 0.05, 0.05];

    let controller_plant: Arc<dyn Dynamics> =
        Arc::new(DoublePendulumPlant::new(config.controller_model())?);
    let lqr = LqrController::from_config(controller_plant, &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit());

    // 单控制器也走组合控制器，以复用滤波和裁剪
    let mut controller = CombinedController::new(
        lqr,
        ConstantController::zero(),
        conditions::never(),
        conditions::never(),
        false,
    )
    .with_filter(
        Box::new(LowPassFilter::new([1.0, 1.0, 0.3, 0.3], config.initial_state())),
        config.dt,
    )
    .with_torque_limit(config.torque_limit());

    let sim = Simulator::from_config(config)?;
    let report = sim.simulate(&mut controller, &StopSignal::new())?;

    let last = report.log.last_state().copied().unwrap_or_else(State::zeros);
    println!("termination: {:?}", report.termination);
    println!("final state: {:?}", last.as_slice());
    println!("distance to goal: {:.2e}", (wrap_angles_top(&last) - goal).norm());
    println!("LQR cost-to-go cut exceeded at end: {}", controller.controller1().is_saturated());
    println!("saturated ticks: {}", controller.saturation_count());
    Ok(())
}
