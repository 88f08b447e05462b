//! 外部扰动调度
//!
//! 仿真和硬件循环共用。每个扰动只施加一次：第一个满足 `|t − time| < dt` 的节拍。

use crate::config::Perturbation;
use pendulum_model::Control;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PerturbationSchedule {
    events: Vec<Perturbation>,
    applied: Vec<bool>,
}

impl PerturbationSchedule {
    pub fn new(events: &[Perturbation]) -> Self {
        Self {
            events: events.to_vec(),
            applied: vec![false; events.len()],
        }
    }

    /// 本节拍需要叠加的扰动力矩之和
    pub fn torque_at(&mut self, t: f64, dt: f64) -> Control {
        let mut tau = Control::zeros();
        for (event, applied) in self.events.iter().zip(self.applied.iter_mut()) {
            if !*applied && (t - event.time).abs() < dt {
                *applied = true;
                tau += Control::from(event.tau);
                info!("Perturbation {:?} applied at t = {t:.4}", event.tau);
            }
        }
        tau
    }

    /// 已施加的扰动数量
    pub fn applied_count(&self) -> usize {
        self.applied.iter().filter(|a| **a).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
