//! # 录制格式定义
//!
//! 一次运行的轨迹和辅助历史，供外部绘图/分析工具离线读取。

use crate::{RunReport, Termination, TrajectoryLog};
use anyhow::{Context, Result};
use pendulum_model::{Control, Robot, State};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 当前格式版本
const FORMAT_VERSION: u8 = 1;

/// 双摆运行录制 v1
///
/// ```text
/// [MAGIC: 8 bytes]
/// [Version: 1 byte]
/// [Data: bincode serialized RunRecording]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecording {
    /// 格式版本
    pub version: u8,

    /// 元数据
    pub metadata: RecordingMetadata,

    /// 轨迹
    pub log: TrajectoryLog,

    /// 控制器侧的辅助历史
    pub auxiliary: AuxiliaryHistory,

    /// 终止原因
    pub termination: Termination,
}

impl RunRecording {
    /// 由运行结果创建录制
    pub fn from_report(metadata: RecordingMetadata, report: RunReport) -> Self {
        let auxiliary = AuxiliaryHistory {
            x_meas: report.measured,
            ..AuxiliaryHistory::default()
        };
        Self {
            version: FORMAT_VERSION,
            metadata,
            log: report.log,
            auxiliary,
            termination: report.termination,
        }
    }

    /// 附加控制器历史（滤波状态、补偿前控制、摩擦补偿项）
    pub fn with_controller_history(
        mut self,
        x_filt: Vec<State>,
        u_con: Vec<Control>,
        u_fric: Vec<Control>,
    ) -> Self {
        self.auxiliary.x_filt = x_filt;
        self.auxiliary.u_con = u_con;
        self.auxiliary.u_fric = u_fric;
        self
    }

    /// 记录的节拍数
    pub fn tick_count(&self) -> usize {
        self.log.len()
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).context("创建录制文件失败")?;

        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC).context("写入魔数失败")?;
        writer.write_all(&[self.version]).context("写入版本失败")?;

        let data = bincode::serialize(self).context("序列化录制失败")?;
        writer.write_all(&data).context("写入录制数据失败")?;

        writer.flush().context("刷新缓冲区失败")?;

        Ok(())
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).context("打开录制文件失败")?;

        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).context("读取魔数失败")?;

        if &magic != MAGIC {
            anyhow::bail!("无效的录制文件格式（魔数不匹配）");
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version).context("读取版本失败")?;

        if version[0] != FORMAT_VERSION {
            anyhow::bail!("不支持的录制文件版本: {}", version[0]);
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).context("读取录制数据失败")?;

        let recording: RunRecording = bincode::deserialize(&data).context("反序列化录制失败")?;

        Ok(recording)
    }
}

/// 录制元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// 录制开始时间（Unix 时间戳，秒）
    pub start_time: u64,

    pub robot: Robot,

    /// 控制周期（秒）
    pub dt: f64,

    /// 是否为硬件运行
    pub hardware: bool,

    /// 平台信息
    pub platform: String,

    /// 备注
    pub notes: String,
}

impl RecordingMetadata {
    /// 创建新的元数据
    pub fn new(robot: Robot, dt: f64, hardware: bool) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        Self {
            start_time: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
            robot,
            dt,
            hardware,
            platform: std::env::consts::OS.to_string(),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// 辅助历史（均按节拍对齐，可能为空）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryHistory {
    /// 控制器看到的测量状态
    pub x_meas: Vec<State>,
    /// 滤波后状态
    pub x_filt: Vec<State>,
    /// 摩擦补偿前的控制
    pub u_con: Vec<Control>,
    /// 摩擦补偿项
    pub u_fric: Vec<Control>,
}

/// 录制文件魔数
pub const MAGIC: &[u8; 8] = b"PENDV1\0\0";
