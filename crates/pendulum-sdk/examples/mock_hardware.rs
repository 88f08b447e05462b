//! Mock 硬件演示：实时循环 + Ctrl-C 停止
//!
//! ```bash
//! cargo run -p pendulum-sdk --example mock_hardware
//! ```

use pendulum_sdk::hardware::MockBus;
use pendulum_sdk::prelude::*;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    pendulum_sdk::init_logging()?;

    let config = RunConfig {
        x0: [std::f64::consts::PI + 0.05, 0.0, 0.0, 0.0],
        t_final: 5.0,
        dt: 0.005,
        ..RunConfig::default()
    };

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request_stop())?;

    let plant: Arc<dyn Dynamics> = Arc::new(DoublePendulumPlant::new(config.model.clone())?);
    let mut bus = MockBus::new(Arc::clone(&plant), config.initial_state(), config.dt);

    let controller_plant: Arc<dyn Dynamics> =
        Arc::new(DoublePendulumPlant::new(config.controller_model())?);
    let mut lqr = LqrController::from_config(controller_plant, &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit());

    let hw = HardwareConfig::from_run_config(&config);
    let result = run_experiment(&mut bus, &mut lqr, &hw, &stop)?;

    println!("termination: {:?}", result.report.termination);
    println!(
        "tick time: avg {:.1} us, max {} us, std {:.1} us, overrun rate {:.2}%",
        result.timing.avg_us,
        result.timing.max_us,
        result.timing.std_dev_us,
        result.timing.overrun_rate()
    );
    Ok(())
}
