//! 录制演示：带噪声和卡尔曼滤波的仿真，保存为录制文件并读回
//!
//! ```bash
//! cargo run -p pendulum-sdk --example record_run -- /tmp/run.bin
//! ```

use anyhow::Context;
use pendulum_sdk::prelude::*;
use pendulum_sdk::tools::{FilterConfig, FilterKind, NoiseConfig};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    pendulum_sdk::init_logging()?;

    let path = std::env::args().nth(1).unwrap_or_else(|| "run.bin".to_string());

    let goal = upright_goal();
    let config = RunConfig {
        x0: [goal[0] + 0.02, 0.0, 0.0, 0.0],
        t_final: 3.0,
        seed: Some(7),
        noise: NoiseConfig {
            meas_noise_sigmas: [0.0, 0.0, 0.05, 0.05],
            u_noise_sigmas: [0.01, 0.01],
            ..NoiseConfig::default()
        },
        filter: FilterConfig {
            kind: FilterKind::Kalman,
            ..FilterConfig::default()
        },
        ..RunConfig::default()
    };

    let controller_plant: Arc<dyn Dynamics> =
        Arc::new(DoublePendulumPlant::new(config.controller_model())?);
    let filter = build_filter(&config.filter, Arc::clone(&controller_plant), config.initial_state());
    let lqr = LqrController::from_config(controller_plant, &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit());
    let mut controller = CombinedController::new(
        lqr,
        ConstantController::zero(),
        conditions::never(),
        conditions::never(),
        false,
    )
    .with_filter(filter, config.dt)
    .with_torque_limit(config.torque_limit());

    let sim = Simulator::from_config(config.clone())?;
    let report = sim.simulate(&mut controller, &StopSignal::new())?;

    let metadata = RecordingMetadata::new(config.robot, config.dt, false)
        .with_notes("LQR + Kalman filter, measurement noise on velocities");
    let recording = RunRecording::from_report(metadata, report).with_controller_history(
        controller.x_filt_hist().to_vec(),
        controller.u_hist().to_vec(),
        controller.u_fric_hist().to_vec(),
    );
    recording.save(&path).with_context(|| format!("saving {path}"))?;

    let loaded = RunRecording::load(&path)?;
    println!("saved {} ticks to {path}", loaded.tick_count());
    println!("termination: {:?}", loaded.termination);
    Ok(())
}
