//! # Pendulum CLI
//!
//! 双摆仿真与硬件运行的命令行入口。
//!
//! ```bash
//! # 导出默认配置，修改后运行仿真
//! pendulum-cli config > run.toml
//! pendulum-cli simulate --config run.toml --record run.bin
//!
//! # 查看录制文件
//! pendulum-cli inspect run.bin
//!
//! # 在 Mock 总线上跑实时循环
//! pendulum-cli hardware --config run.toml
//! ```
//!
//! Ctrl-C 在节拍边界停止运行，已完成的节拍照常保存。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod setup;

use commands::{ConfigCommand, HardwareCommand, InspectCommand, SimulateCommand};

/// Pendulum CLI - 双摆混合控制命令行工具
#[derive(Parser, Debug)]
#[command(name = "pendulum-cli")]
#[command(about = "Command-line interface for double pendulum simulation and hardware runs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 输出运行配置（默认配置或校验后的配置文件）
    Config {
        #[command(flatten)]
        args: ConfigCommand,
    },

    /// 运行闭环仿真
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 在 Mock 总线上运行实时控制循环
    Hardware {
        #[command(flatten)]
        args: HardwareCommand,
    },

    /// 查看录制文件
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（日志输出到 stderr，stdout 留给命令输出）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { args } => args.execute(),
        Commands::Simulate { args } => args.execute(),
        Commands::Hardware { args } => args.execute(),
        Commands::Inspect { args } => args.execute(),
    }
}
