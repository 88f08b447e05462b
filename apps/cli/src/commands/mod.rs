//! 命令定义和实现

pub mod config;
pub mod hardware;
pub mod inspect;
pub mod simulate;

pub use config::ConfigCommand;
pub use hardware::HardwareCommand;
pub use inspect::InspectCommand;
pub use simulate::SimulateCommand;
