//! Mock 总线
//!
//! 用对象模型代替真实电机：每次 `write_torque` 把模型推进一个节拍。
//! 可以注入读取失败和读取耗时，用于测试循环的故障处理。

use crate::bus::{BusError, MotorBus};
use pendulum_model::{Control, Dynamics, Integrator, State};
use std::sync::Arc;
use std::time::Duration;

pub struct MockBus {
    plant: Arc<dyn Dynamics>,
    integrator: Integrator,
    dt: f64,
    x: State,
    enabled: bool,
    reads: usize,
    fail_read_at: Option<usize>,
    read_latency: Duration,
    torque_writes: Vec<Control>,
    enable_count: usize,
    disable_count: usize,
}

impl MockBus {
    /// `dt` 为每次写入力矩后模型推进的时间
    pub fn new(plant: Arc<dyn Dynamics>, x0: State, dt: f64) -> Self {
        Self {
            plant,
            integrator: Integrator::RungeKutta,
            dt,
            x: x0,
            enabled: false,
            reads: 0,
            fail_read_at: None,
            read_latency: Duration::ZERO,
            torque_writes: Vec::new(),
            enable_count: 0,
            disable_count: 0,
        }
    }

    /// 第 `n` 次读取（从 0 计）返回超时错误
    pub fn with_read_failure_at(mut self, n: usize) -> Self {
        self.fail_read_at = Some(n);
        self
    }

    /// 每次读取阻塞的时间
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    pub fn state(&self) -> &State {
        &self.x
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 所有写入过的力矩（包括收尾时的零力矩）
    pub fn torque_writes(&self) -> &[Control] {
        &self.torque_writes
    }

    pub fn enable_count(&self) -> usize {
        self.enable_count
    }

    pub fn disable_count(&self) -> usize {
        self.disable_count
    }
}

impl MotorBus for MockBus {
    fn enable(&mut self) -> Result<(), BusError> {
        self.enabled = true;
        self.enable_count += 1;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), BusError> {
        self.enabled = false;
        self.disable_count += 1;
        Ok(())
    }

    fn read_state(&mut self) -> Result<State, BusError> {
        let n = self.reads;
        self.reads += 1;
        if !self.read_latency.is_zero() {
            spin_sleep::sleep(self.read_latency);
        }
        if self.fail_read_at == Some(n) {
            return Err(BusError::Timeout);
        }
        Ok(self.x)
    }

    fn write_torque(&mut self, u: &Control) -> Result<(), BusError> {
        if !self.enabled {
            return Err(BusError::NotEnabled);
        }
        self.torque_writes.push(*u);
        self.x = self.integrator.step(self.plant.as_ref(), &self.x, u, self.dt);
        Ok(())
    }
}
