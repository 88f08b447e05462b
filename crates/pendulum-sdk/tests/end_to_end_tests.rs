//! 端到端测试：TOML 配置 → 仿真 → 录制文件

use pendulum_sdk::prelude::*;
use std::sync::Arc;

const CONFIG: &str = r#"
robot = "pendubot"
dt = 0.005
t_final = 2.0
x0 = [3.16, 0.0, 0.0, 0.0]
seed = 11

[noise]
meas_noise_sigmas = [0.0, 0.0, 0.01, 0.01]

[filter]
kind = "lowpass"

[friction_compensation]
damping = [0.001, 0.001]
coulomb_fric = [0.093, 0.078]
"#;

fn build_controller(config: &RunConfig) -> CombinedController<LqrController, ConstantController> {
    let controller_plant: Arc<dyn Dynamics> =
        Arc::new(DoublePendulumPlant::new(config.controller_model()).unwrap());
    let filter = build_filter(&config.filter, Arc::clone(&controller_plant), config.initial_state());
    let friction = config
        .friction_compensation
        .as_ref()
        .map(FrictionCompensation::from)
        .unwrap_or_else(|| FrictionCompensation::new([0.0; 2], [0.0; 2]));

    CombinedController::new(
        LqrController::from_config(controller_plant, &config.lqr)
            .with_goal(config.goal_state())
            .with_torque_limit(config.torque_limit()),
        ConstantController::zero(),
        conditions::never(),
        conditions::never(),
        false,
    )
    .with_filter(filter, config.dt)
    .with_friction_compensation(friction)
    .with_torque_limit(config.torque_limit())
}

#[test]
fn toml_config_drives_a_recorded_run() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    config.validate().unwrap();
    assert_eq!(config.num_ticks(), 400);

    let mut controller = build_controller(&config);
    let sim = Simulator::from_config(config.clone()).unwrap();
    let report = sim.simulate(&mut controller, &StopSignal::new()).unwrap();

    assert!(report.is_completed());
    assert_eq!(controller.x_filt_hist().len(), report.log.len());
    assert_eq!(controller.u_fric_hist().len(), report.log.len());

    let limit = config.torque_limit();
    for u in report.log.controls() {
        assert!(u[0].abs() <= limit[0] && u[1].abs() <= limit[1]);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.bin");
    let recording = RunRecording::from_report(
        RecordingMetadata::new(config.robot, config.dt, false),
        report.clone(),
    )
    .with_controller_history(
        controller.x_filt_hist().to_vec(),
        controller.u_hist().to_vec(),
        controller.u_fric_hist().to_vec(),
    );
    recording.save(&path).unwrap();

    let loaded = RunRecording::load(&path).unwrap();
    assert_eq!(loaded, recording);
    assert_eq!(loaded.log, report.log);
    assert_eq!(loaded.auxiliary.x_meas, report.measured);
}

#[test]
fn same_seed_same_trajectory() {
    let config = RunConfig::from_toml_str(CONFIG).unwrap();
    let sim = Simulator::from_config(config.clone()).unwrap();

    let a = sim.simulate(&mut build_controller(&config), &StopSignal::new()).unwrap();
    let b = sim.simulate(&mut build_controller(&config), &StopSignal::new()).unwrap();
    assert_eq!(a.log, b.log);
}
