//! 摩擦补偿
//!
//! `u_comp = damping ⊙ q̇ + coulomb ⊙ sign(q̇)`，逐关节计算，`sign(0) = 0`。

use pendulum_model::{Control, State, sign};
use pendulum_tools::FrictionConfig;

/// 摩擦补偿项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionCompensation {
    damping: Control,
    coulomb_fric: Control,
}

impl FrictionCompensation {
    pub fn new(damping: [f64; 2], coulomb_fric: [f64; 2]) -> Self {
        Self {
            damping: Control::from(damping),
            coulomb_fric: Control::from(coulomb_fric),
        }
    }

    /// 补偿力矩，`x` 为规范化后的（滤波）状态
    pub fn compensation(&self, x: &State) -> Control {
        Control::new(
            self.damping[0] * x[2] + self.coulomb_fric[0] * sign(x[2]),
            self.damping[1] * x[3] + self.coulomb_fric[1] * sign(x[3]),
        )
    }
}

impl From<&FrictionConfig> for FrictionCompensation {
    fn from(config: &FrictionConfig) -> Self {
        Self::new(config.damping, config.coulomb_fric)
    }
}
