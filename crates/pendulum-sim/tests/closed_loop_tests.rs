//! 闭环仿真集成测试

use nalgebra::Matrix4;
use pendulum_control::{
    ActiveController, CombinedController, ConstantController, ControlError, Controller,
    LqrController, MeasurementFilter, RegionOfAttraction, conditions,
};
use pendulum_model::{Control, DoublePendulumPlant, Dynamics, State, upright_goal};
use pendulum_sim::{SimulationError, Simulator};
use pendulum_tools::{
    DelayMode, NoiseConfig, Perturbation, RunConfig, RunFault, StopSignal, Termination,
};
use std::sync::Arc;

fn controller_plant(config: &RunConfig) -> Arc<dyn Dynamics> {
    Arc::new(DoublePendulumPlant::new(config.controller_model()).unwrap())
}

fn lqr(config: &RunConfig) -> LqrController {
    LqrController::from_config(controller_plant(config), &config.lqr)
        .with_goal(config.goal_state())
        .with_torque_limit(config.torque_limit())
}

/// 输出固定值，第 `nan_at` 次调用时输出 NaN
struct NanAt {
    calls: usize,
    nan_at: usize,
}

impl Controller for NanAt {
    fn compute(&mut self, _t: f64, _x: &State) -> Control {
        self.calls += 1;
        if self.calls > self.nan_at {
            Control::repeat(f64::NAN)
        } else {
            Control::zeros()
        }
    }
}

/// 第 `stop_at` 次调用时请求停止
struct StopAt {
    calls: usize,
    stop_at: usize,
    signal: StopSignal,
}

impl Controller for StopAt {
    fn compute(&mut self, _t: f64, _x: &State) -> Control {
        if self.calls == self.stop_at {
            self.signal.request_stop();
        }
        self.calls += 1;
        Control::zeros()
    }
}

/// 第 `nan_at` 次更新起估计值为 NaN
struct DivergingFilter {
    updates: usize,
    nan_at: usize,
    x: State,
}

impl MeasurementFilter for DivergingFilter {
    fn update(&mut self, observation: &State, _last_control: &Control, _dt: f64) -> State {
        self.updates += 1;
        self.x = if self.updates > self.nan_at {
            State::repeat(f64::NAN)
        } else {
            *observation
        };
        self.x
    }

    fn estimate(&self) -> State {
        self.x
    }

    fn reset(&mut self) {
        self.updates = 0;
        self.x = State::zeros();
    }
}

struct FailingInit;

impl Controller for FailingInit {
    fn init(&mut self) -> Result<(), ControlError> {
        Err(ControlError::EmptyModelPath)
    }

    fn compute(&mut self, _t: f64, _x: &State) -> Control {
        Control::zeros()
    }
}

#[test]
fn lqr_holds_the_goal_without_noise() {
    let goal = upright_goal();
    let config = RunConfig {
        x0: [goal[0], goal[1], goal[2], goal[3]],
        dt: 0.0025,
        t_final: 10.0,
        noise: NoiseConfig::noiseless(),
        ..RunConfig::default()
    };
    let sim = Simulator::from_config(config.clone()).unwrap();
    let mut controller = lqr(&config);

    let report = sim.simulate(&mut controller, &StopSignal::new()).unwrap();
    assert!(report.is_completed());
    assert_eq!(report.log.len(), 4000);

    for u in report.log.controls() {
        assert!(u.norm() < 1e-6, "control {u:?} should stay at zero");
    }
    let last = report.log.last_state().unwrap();
    assert!((last - goal).norm() < 1e-6);
}

#[test]
fn supervisor_hands_over_to_lqr_inside_region() {
    let goal = upright_goal();
    let config = RunConfig {
        x0: [goal[0] + 0.01, 0.0, 0.0, 0.0],
        t_final: 5.0,
        noise: NoiseConfig::noiseless(),
        ..RunConfig::default()
    };
    let roa = RegionOfAttraction::new(goal, Matrix4::identity(), 0.1).unwrap();
    let mut controller = CombinedController::new(
        ConstantController::zero(),
        lqr(&config),
        conditions::never(),
        conditions::in_region(roa),
        false,
    )
    .with_torque_limit(config.torque_limit());

    let sim = Simulator::from_config(config).unwrap();
    let report = sim.simulate(&mut controller, &StopSignal::new()).unwrap();

    assert!(report.is_completed());
    assert_eq!(controller.active(), ActiveController::Controller2);
    assert_eq!(controller.switches().len(), 1);
    assert_eq!(controller.switches()[0].tick, 0);
    assert_eq!(controller.u_hist().len(), report.log.len());

    let last = report.log.last_state().unwrap();
    assert!((last - goal).norm() < 1e-2);
}

#[test]
fn stop_before_start_returns_empty_log() {
    let sim = Simulator::from_config(RunConfig::default()).unwrap();
    let stop = StopSignal::new();
    stop.request_stop();

    let report = sim.simulate(&mut ConstantController::zero(), &stop).unwrap();
    assert_eq!(report.termination, Termination::Stopped { tick: 0 });
    assert!(report.log.is_empty());
}

#[test]
fn stop_is_honoured_at_tick_boundary() {
    let sim = Simulator::from_config(RunConfig::default()).unwrap();
    let stop = StopSignal::new();
    let mut controller = StopAt {
        calls: 0,
        stop_at: 20,
        signal: stop.clone(),
    };

    let report = sim.simulate(&mut controller, &stop).unwrap();
    // 请求发生在第 20 个节拍内部，该节拍仍然完整记录
    assert_eq!(report.termination, Termination::Stopped { tick: 21 });
    assert_eq!(report.log.len(), 21);
    assert_eq!(report.measured.len(), 21);
}

#[test]
fn non_finite_control_stops_with_partial_log() {
    let sim = Simulator::from_config(RunConfig::default()).unwrap();
    let mut controller = NanAt { calls: 0, nan_at: 10 };

    let report = sim.simulate(&mut controller, &StopSignal::new()).unwrap();
    assert_eq!(
        report.fault(),
        Some(&RunFault::NonFinite {
            tick: 10,
            quantity: "control".to_string(),
        })
    );
    assert_eq!(report.log.len(), 10);
}

#[test]
fn non_finite_filter_estimate_is_reported() {
    let sim = Simulator::from_config(RunConfig::default()).unwrap();
    let filter = DivergingFilter {
        updates: 0,
        nan_at: 5,
        x: State::zeros(),
    };
    // 常量控制器不读状态，控制量保持有限，只有估计值出错
    let mut controller = CombinedController::new(
        ConstantController::zero(),
        ConstantController::zero(),
        conditions::never(),
        conditions::never(),
        false,
    )
    .with_filter(Box::new(filter), 0.0025);

    let report = sim.simulate(&mut controller, &StopSignal::new()).unwrap();
    assert_eq!(
        report.fault(),
        Some(&RunFault::NonFinite {
            tick: 5,
            quantity: "filter estimate".to_string(),
        })
    );
    assert_eq!(report.log.len(), 5);
}

#[test]
fn controller_init_failure_is_an_error() {
    let sim = Simulator::from_config(RunConfig::default()).unwrap();
    let result = sim.simulate(&mut FailingInit, &StopSignal::new());
    assert_eq!(
        result.err(),
        Some(SimulationError::Control(ControlError::EmptyModelPath))
    );
}

#[test]
fn perturbation_is_applied_once() {
    let config = RunConfig {
        dt: 0.01,
        t_final: 0.5,
        perturbations: vec![Perturbation {
            time: 0.255,
            tau: [0.5, 0.0],
        }],
        ..RunConfig::default()
    };
    let sim = Simulator::from_config(config).unwrap();
    let report = sim
        .simulate(&mut ConstantController::zero(), &StopSignal::new())
        .unwrap();

    let controls = report.log.controls();
    for (k, u) in controls.iter().enumerate() {
        if k == 25 {
            assert_eq!(*u, Control::new(0.5, 0.0));
        } else {
            assert_eq!(*u, Control::zeros());
        }
    }
    let states = report.log.states();
    assert_eq!(states[25], State::zeros());
    assert!(states[26][2] > 0.0);
}

#[test]
fn measurement_delay_reads_state_history() {
    // ⌊0.0625 / 0.015625⌋ + 1 = 5 个节拍
    let config = RunConfig {
        x0: [0.5, 0.0, 0.0, 0.0],
        dt: 0.015625,
        t_final: 1.0,
        noise: NoiseConfig {
            delay: 0.0625,
            delay_mode: DelayMode::PosVel,
            ..NoiseConfig::noiseless()
        },
        ..RunConfig::default()
    };
    let sim = Simulator::from_config(config).unwrap();
    let report = sim
        .simulate(&mut ConstantController::zero(), &StopSignal::new())
        .unwrap();

    let states = report.log.states();
    for (k, x_meas) in report.measured.iter().enumerate() {
        let expected = states[k.saturating_sub(4)];
        assert_eq!(*x_meas, expected, "tick {k}");
    }
}

#[test]
fn seeded_noisy_runs_are_reproducible() {
    let config = RunConfig {
        t_final: 0.5,
        seed: Some(3),
        noise: NoiseConfig {
            process_noise_sigmas: [1e-4; 4],
            meas_noise_sigmas: [1e-3; 4],
            u_noise_sigmas: [0.01; 2],
            ..NoiseConfig::noiseless()
        },
        ..RunConfig::default()
    };
    let run = |config: RunConfig| {
        let sim = Simulator::from_config(config).unwrap();
        sim.simulate(&mut ConstantController::zero(), &StopSignal::new())
            .unwrap()
    };

    let a = run(config.clone());
    let b = run(config.clone());
    assert_eq!(a, b);

    let c = run(RunConfig {
        seed: Some(4),
        ..config
    });
    assert_ne!(a.log, c.log);
}
