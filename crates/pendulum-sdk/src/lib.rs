//! Pendulum SDK - 双摆混合控制器与闭环运行引擎
//!
//! 把长时域策略（学习策略、轨迹跟踪）和局部 LQR 镇定器组合起来，
//! 按吸引域/安全条件在运行时切换，并在仿真或硬件循环中运行。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **模型层** (`model`): 状态/控制向量、wrap-to-top、动力学、积分器
//! - **工具层** (`tools`): 运行配置、轨迹日志、运行结果、录制格式
//! - **控制层** (`control`): 控制器、测量滤波、组合控制器
//! - **仿真层** (`sim`): 噪声/延迟/执行器模型与仿真循环
//! - **硬件层** (`hardware`): 电机总线抽象与实时循环
//!
//! # 快速开始
//!
//! ```rust
//! use pendulum_sdk::prelude::*;
//!
//! let config = RunConfig { t_final: 0.1, ..RunConfig::default() };
//! let sim = Simulator::from_config(config).unwrap();
//! let report = sim.simulate(&mut ConstantController::zero(), &StopSignal::new()).unwrap();
//! assert!(report.is_completed());
//! ```

pub use pendulum_control as control;
pub use pendulum_hardware as hardware;
pub use pendulum_model as model;
pub use pendulum_sim as sim;
pub use pendulum_tools as tools;

mod logging;
pub mod prelude;

pub use logging::{LoggingError, init_logging, init_logging_with_default};

// 常用类型
pub use pendulum_control::{CombinedController, ControlError, Controller, LqrController};
pub use pendulum_hardware::{HardwareError, MotorBus, run_experiment};
pub use pendulum_model::{Control, Dynamics, ModelError, State};
pub use pendulum_sim::{SimulationError, Simulator};
pub use pendulum_tools::{RunConfig, RunReport, StopSignal};
