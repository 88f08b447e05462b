//! 混合控制演示：学习策略摆起 + LQR 接管
//!
//! 策略在这里用一个手写的能量泵送函数代替（训练好的模型不在本仓库中），
//! 进入吸引域后切换到 LQR。
//!
//! ```bash
//! cargo run -p pendulum-sdk --example hybrid_swingup
//! ```

use nalgebra::Matrix4;
use pendulum_sdk::prelude::*;
use std::sync::Arc;

/// 按第一关节速度方向施加力矩（观测为 Normalized 编码）
fn energy_pumping(observation: &[f64]) -> Vec<f64> {
    let v1 = observation[2];
    let pos1 = observation[0];
    // 接近倒立时不再泵送
    if pos1.abs() < 0.15 {
        vec![0.0]
    } else {
        vec![v1.signum() * 0.6]
    }
}

fn main() -> anyhow::Result<()> {
    pendulum_sdk::init_logging()?;

    let config = RunConfig {
        x0: [0.1, 0.0, 0.0, 0.0],
        t_final: 10.0,
        ..RunConfig::default()
    };
    let controller_plant: Arc<dyn Dynamics> =
        Arc::new(DoublePendulumPlant::new(config.controller_model())?);

    let policy = PolicyController::new("models/pendubot_sac.zip", energy_pumping, config.robot)
        .with_torque_limit(config.torque_limit());
    let lqr = LqrController::from_config(Arc::clone(&controller_plant), &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit());

    let roa = match &config.roa {
        Some(roa) => RegionOfAttraction::new(
            config.goal_state(),
            roa.s.map(|s| Matrix4::from_fn(|i, j| s[i][j])).unwrap_or_else(Matrix4::identity),
            roa.rho,
        )?,
        None => RegionOfAttraction::new(config.goal_state(), Matrix4::identity(), 0.5)?,
    };

    let mut controller = CombinedController::new(
        policy,
        lqr,
        conditions::never(),
        conditions::in_region(roa),
        true,
    )
    .with_torque_limit(config.torque_limit());

    let sim = Simulator::from_config(config)?;
    let report = sim.simulate(&mut controller, &StopSignal::new())?;

    println!("termination: {:?}", report.termination);
    println!("ticks: {}", report.log.len());
    match controller.switches().first() {
        Some(event) => println!("switched to {:?} at t = {:.3} s", event.to, event.t),
        None => println!("never entered the region of attraction"),
    }
    println!("final active controller: {:?}", controller.active());
    Ok(())
}
