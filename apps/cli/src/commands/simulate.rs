//! simulate 命令
//!
//! 按运行配置跑一次闭环仿真，可选保存录制文件

use crate::setup::{ControllerArgs, build_supervisor};
use anyhow::Result;
use clap::Args;
use pendulum_sdk::prelude::*;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 运行配置文件（TOML，省略时使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 录制文件输出路径
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    /// 覆盖配置中的结束时间（秒）
    #[arg(long)]
    pub t_final: Option<f64>,

    /// 覆盖配置中的随机数种子
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub controller: ControllerArgs,
}

impl SimulateCommand {
    pub fn execute(&self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(t_final) = self.t_final {
            config.t_final = t_final;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        let mut supervisor = build_supervisor(&config, &self.controller)?;
        let sim = Simulator::from_config(config.clone())?;

        let stop = StopSignal::new();
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || handler_stop.request_stop())?;

        let report = sim.simulate(&mut supervisor, &stop)?;

        println!("ticks:        {}", report.log.len());
        println!("termination:  {:?}", report.termination);
        for event in supervisor.switches() {
            println!("switch:       tick {} (t = {:.4} s) -> {:?}", event.tick, event.t, event.to);
        }
        println!("saturations:  {}", supervisor.saturation_count());
        if let Some(last) = report.log.last_state() {
            let err = (wrap_angles_top(last) - config.goal_state()).norm();
            println!("final state:  {:?} (|x - goal| = {err:.3e})", last.as_slice());
        }

        if let Some(path) = &self.record {
            let metadata = RecordingMetadata::new(config.robot, config.dt, false)
                .with_notes(format!("{:?} controller", self.controller.controller));
            let recording = RunRecording::from_report(metadata, report).with_controller_history(
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
