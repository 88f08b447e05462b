//! hardware 命令
//!
//! 在 Mock 总线上运行实时控制循环（对象模型代替电机）

use crate::setup::{ControllerArgs, build_supervisor};
use anyhow::Result;
use clap::Args;
use pendulum_sdk::hardware::MockBus;
use pendulum_sdk::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct HardwareCommand {
    /// 运行配置文件（TOML，省略时使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 录制文件输出路径
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    #[command(flatten)]
    pub controller: ControllerArgs,
}

impl HardwareCommand {
    pub fn execute(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)?,
            None => RunConfig::default(),
        };

        let plant: Arc<dyn Dynamics> = Arc::new(DoublePendulumPlant::new(config.model.clone())?);
        let mut bus = MockBus::new(plant, config.initial_state(), config.dt);
        let mut supervisor = build_supervisor(&config, &self.controller)?;

        let stop = StopSignal::new();
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || handler_stop.request_stop())?;

        let hw = HardwareConfig::from_run_config(&config);
        let result = run_experiment(&mut bus, &mut supervisor, &hw, &stop)?;
        let timing = &result.timing;

        println!("ticks:        {}", result.report.log.len());
        println!("termination:  {:?}", result.report.termination);
        println!(
            "tick time:    avg {:.1} us, min {} us, max {} us, std {:.1} us",
            timing.avg_us, timing.min_us, timing.max_us, timing.std_dev_us
        );
        println!(
            "overruns:     {} ({:.2}%)",
            timing.overruns,
            timing.overrun_rate()
        );

        if let Some(path) = &self.record {
            let metadata = RecordingMetadata::new(config.robot, config.dt, true)
                .with_notes("mock bus");
            let recording = RunRecording::from_report(metadata, result.report)
                .with_controller_history(
                    supervisor.x_filt_hist().to_vec(),
                    supervisor.u_hist().to_vec(),
                    supervisor.u_fric_hist().to_vec(),
                );
            recording.save(path)?;
            println!("recording:    {}", path.display());
        }
        Ok(())
    }
}
