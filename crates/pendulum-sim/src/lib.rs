//! # Pendulum Sim
//!
//! 双摆闭环仿真：被控对象积分、测量延迟与噪声、执行器响应、外部扰动。
//!
//! ## 模块
//!
//! - `noise` - 噪声源、测量模型、执行器模型
//! - `simulator` - 固定步长仿真循环
//!
//! ## 错误处理
//!
//! 配置和控制器初始化错误以 [`SimulationError`] 返回；
//! 运行期间的数值故障写入 [`RunReport`](pendulum_tools::RunReport)。

mod error;
pub mod noise;
pub mod simulator;

// 重新导出常用类型
pub use error::SimulationError;
pub use noise::{ActuatorModel, MeasurementModel, NoiseSource};
pub use simulator::Simulator;
