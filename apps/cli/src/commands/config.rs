//! config 命令
//!
//! 输出 TOML 运行配置，可作为 `simulate --config` 的起点

use anyhow::Result;
use clap::Args;
use pendulum_sdk::RunConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// 读取并校验配置文件（省略时输出默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)?,
            None => RunConfig::default(),
        };
        print!("{}", config.to_toml_string()?);
        Ok(())
    }
}
