//! # Pendulum Tools - 共享数据结构
//!
//! **依赖原则**: 只依赖 `pendulum-model`，不依赖控制器、仿真或硬件层
//!
//! ## 包含模块
//!
//! - `config` - 运行配置（TOML，只读结构）
//! - `log` - 轨迹日志（时间/状态/控制三列对齐）
//! - `perturbation` - 外部扰动调度（仿真与硬件共用）
//! - `report` - 运行结果与故障描述
//! - `stop` - 跨线程停止信号
//! - `recording` - 录制文件格式（bincode）
//! - `statistics` - 节拍耗时统计（可选）
//!
//! ## Feature Flags
//!
//! - `default` - 无默认 features
//! - `full` - 启用所有功能（包含 statistics）
//! - `statistics` - 启用统计模块

pub mod config;
pub mod log;
pub mod perturbation;
pub mod recording;
pub mod report;
pub mod stop;

#[cfg(feature = "statistics")]
pub mod statistics;

// 重新导出常用类型
pub use config::{
    ConfigError, DelayMode, FilterConfig, FilterKind, FrictionConfig, LqrConfig, NoiseConfig,
    Perturbation, RoaConfig, RunConfig,
};
pub use log::TrajectoryLog;
pub use perturbation::PerturbationSchedule;
pub use recording::{AuxiliaryHistory, RecordingMetadata, RunRecording};
#[cfg(feature = "statistics")]
pub use statistics::TimingStatistics;
pub use report::{RunFault, RunReport, Termination};
pub use stop::StopSignal;
