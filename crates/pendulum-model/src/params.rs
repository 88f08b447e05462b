//! 模型参数
//!
//! 物理参数由外部辨识得到（参数文件的加载不在本 crate 范围内），
//! 这里只提供只读结构、校验和 builder 风格的修改方法。

use crate::{Control, ModelError};
use serde::{Deserialize, Serialize};

/// 机器人构型
///
/// 决定哪个关节是主动关节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Robot {
    /// 肩关节驱动，肘关节被动
    #[default]
    Pendubot,
    /// 肘关节驱动，肩关节被动
    Acrobot,
    /// 两个关节都驱动
    DoublePendulum,
}

impl Robot {
    /// 每个关节是否为主动关节
    pub fn active_joints(self) -> [bool; 2] {
        match self {
            Robot::Pendubot => [true, false],
            Robot::Acrobot => [false, true],
            Robot::DoublePendulum => [true, true],
        }
    }

    /// 该构型常用的力矩限制（Nm）
    ///
    /// 被动关节保留一个小的非零限制，用于摩擦补偿。
    pub fn default_torque_limit(self) -> Control {
        match self {
            Robot::Pendubot => Control::new(5.0, 0.5),
            Robot::Acrobot => Control::new(0.5, 5.0),
            Robot::DoublePendulum => Control::new(5.0, 5.0),
        }
    }
}

/// 双摆模型参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    /// 连杆质量（kg）
    pub mass: [f64; 2],
    /// 连杆长度（m）
    pub length: [f64; 2],
    /// 质心到关节轴距离（m）
    pub com: [f64; 2],
    /// 绕关节轴的转动惯量（kg·m²）
    pub inertia: [f64; 2],
    /// 粘滞摩擦系数（Nm·s/rad）
    pub damping: [f64; 2],
    /// 库仑摩擦（Nm）
    pub coulomb_fric: [f64; 2],
    /// 重力加速度（m/s²）
    pub gravity: f64,
    /// 减速比
    pub gear_ratio: f64,
    /// 电机转子惯量（kg·m²）
    pub motor_inertia: f64,
    /// 力矩限制（Nm）
    pub torque_limit: [f64; 2],
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            mass: [0.6, 0.6],
            length: [0.3, 0.2],
            com: [0.3, 0.2],
            inertia: [0.054, 0.024],
            damping: [0.001, 0.001],
            coulomb_fric: [0.093, 0.078],
            gravity: 9.81,
            gear_ratio: 6.0,
            motor_inertia: 0.0,
            torque_limit: [5.0, 0.5],
        }
    }
}

impl ModelParameters {
    /// 设置粘滞摩擦
    pub fn with_damping(mut self, damping: [f64; 2]) -> Self {
        self.damping = damping;
        self
    }

    /// 设置库仑摩擦
    pub fn with_coulomb_friction(mut self, coulomb_fric: [f64; 2]) -> Self {
        self.coulomb_fric = coulomb_fric;
        self
    }

    /// 设置力矩限制
    pub fn with_torque_limit(mut self, torque_limit: [f64; 2]) -> Self {
        self.torque_limit = torque_limit;
        self
    }

    /// 设置电机转子惯量
    pub fn with_motor_inertia(mut self, motor_inertia: f64) -> Self {
        self.motor_inertia = motor_inertia;
        self
    }

    /// 去掉摩擦项的副本
    ///
    /// 启用摩擦补偿时，控制器使用的模型不应再包含摩擦。
    pub fn without_friction(&self) -> Self {
        self.clone().with_damping([0.0, 0.0]).with_coulomb_friction([0.0, 0.0])
    }

    /// 力矩限制向量
    pub fn torque_limit(&self) -> Control {
        Control::new(self.torque_limit[0], self.torque_limit[1])
    }

    /// 参数校验
    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("mass[0]", self.mass[0]),
            ("mass[1]", self.mass[1]),
            ("length[0]", self.length[0]),
            ("length[1]", self.length[1]),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidParameter { field, value });
            }
        }

        let non_negative = [
            ("com[0]", self.com[0]),
            ("com[1]", self.com[1]),
            ("inertia[0]", self.inertia[0]),
            ("inertia[1]", self.inertia[1]),
            ("damping[0]", self.damping[0]),
            ("damping[1]", self.damping[1]),
            ("coulomb_fric[0]", self.coulomb_fric[0]),
            ("coulomb_fric[1]", self.coulomb_fric[1]),
            ("motor_inertia", self.motor_inertia),
            ("torque_limit[0]", self.torque_limit[0]),
            ("torque_limit[1]", self.torque_limit[1]),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::InvalidParameter { field, value });
            }
        }

        if !self.gravity.is_finite() {
            return Err(ModelError::InvalidParameter {
                field: "gravity",
                value: self.gravity,
            });
        }
        if !(self.gear_ratio.is_finite() && self.gear_ratio > 0.0) {
            return Err(ModelError::InvalidParameter {
                field: "gear_ratio",
                value: self.gear_ratio,
            });
        }

        Ok(())
    }
}
