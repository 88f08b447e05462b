//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use pendulum_sdk::prelude::*;
//! ```

// 模型层
pub use pendulum_model::{
    Control, DoublePendulumPlant, Dynamics, Integrator, ModelParameters, Robot, State, saturate,
    upright_goal, wrap_angles_top,
};

// 控制层
pub use pendulum_control::{
    ActiveController, CombinedController, ConstantController, Controller, FrictionCompensation,
    LqrController, MeasurementFilter, Policy, PolicyController, ReferenceTrajectory,
    RegionOfAttraction, TrajectoryPidController, build_filter, conditions,
};

// 运行配置与结果
pub use pendulum_tools::{
    RecordingMetadata, RunConfig, RunFault, RunRecording, RunReport, StopSignal, Termination,
    TrajectoryLog,
};

// 运行引擎
pub use pendulum_hardware::{HardwareConfig, MotorBus, run_experiment};
pub use pendulum_sim::Simulator;

// 错误类型
pub use pendulum_control::ControlError;
pub use pendulum_hardware::{BusError, HardwareError};
pub use pendulum_model::ModelError;
pub use pendulum_sim::SimulationError;
