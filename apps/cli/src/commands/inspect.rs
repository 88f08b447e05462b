//! inspect 命令
//!
//! 打印录制文件的元数据和轨迹摘要

use anyhow::Result;
use clap::Args;
use pendulum_sdk::model::{upright_goal, wrap_angles_top};
use pendulum_sdk::tools::RunRecording;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// 录制文件路径
    pub input: PathBuf,
}

impl InspectCommand {
    pub fn execute(&self) -> Result<()> {
        let recording = RunRecording::load(&self.input)?;
        let meta = &recording.metadata;

        println!("file:        {}", self.input.display());
        println!("robot:       {:?}", meta.robot);
        println!("mode:        {}", if meta.hardware { "hardware" } else { "simulation" });
        println!("dt:          {} s", meta.dt);
        println!("platform:    {}", meta.platform);
        if !meta.notes.is_empty() {
            println!("notes:       {}", meta.notes);
        }
        println!("ticks:       {}", recording.tick_count());
        if let Some(duration) = recording.log.duration() {
            println!("duration:    {duration:.3} s");
        }
        println!("termination: {:?}", recording.termination);

        if let Some(last) = recording.log.last_state() {
            let err = (wrap_angles_top(last) - upright_goal()).norm();
            println!("final state: {:?} (|x - goal| = {err:.3e})", last.as_slice());
        }
        let peak = recording
            .log
            .controls()
            .iter()
            .fold([0.0f64; 2], |acc, u| [acc[0].max(u[0].abs()), acc[1].max(u[1].abs())]);
        println!("peak torque: [{:.3}, {:.3}] Nm", peak[0], peak[1]);

        let aux = &recording.auxiliary;
        println!(
            "auxiliary:   x_meas {}, x_filt {}, u_con {}, u_fric {}",
            aux.x_meas.len(),
            aux.x_filt.len(),
            aux.u_con.len(),
            aux.u_fric.len()
        );
        Ok(())
    }
}
