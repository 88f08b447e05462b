//! 组合控制器（Supervisor）
//!
//! 持有两个子控制器，每个节拍按切换条件选择其一：
//!
//! ```text
//! condition1(t, x) → UsingController1   （优先）
//! condition2(t, x) → UsingController2
//! 否则            → 保持当前状态        （粘滞）
//! ```
//!
//! 初始状态为 `UsingController1`。粘滞语义意味着一次性的进入事件
//! （例如首次进入吸引域）足以让切换在剩余运行中保持，直到 `reset()`。
//!
//! # 节拍流水线
//!
//! 1. 滤波：若配置了滤波器，用估计值替换观测（条件和子控制器都看到估计值）
//! 2. 条件判定与控制器选择
//! 3. 子控制器输出（`compute_both` 时两个都计算）
//! 4. 摩擦补偿：由 wrap 后的滤波状态计算并叠加
//! 5. 饱和到力矩限制
//!
//! # 示例
//!
//! ```rust
//! use pendulum_control::{CombinedController, ConstantController, Controller, conditions};
//! use pendulum_model::{Control, State};
//!
//! let mut controller = CombinedController::new(
//!     ConstantController::new(Control::new(1.0, 0.0)),
//!     ConstantController::new(Control::new(2.0, 0.0)),
//!     conditions::never(),
//!     conditions::after_time(5.0),
//!     false,
//! );
//! controller.init().unwrap();
//!
//! assert_eq!(controller.compute(4.999, &State::zeros())[0], 1.0);
//! assert_eq!(controller.compute(5.001, &State::zeros())[0], 2.0);
//! ```

use crate::ControlError;
use crate::controller::{Controller, check_torque_limit};
use crate::filter::MeasurementFilter;
use crate::friction::FrictionCompensation;
use pendulum_model::{Control, State, saturate, wrap_angles_top};
use tracing::info;

/// 切换条件 `(t, x) -> bool`
pub type Condition = Box<dyn FnMut(f64, &State) -> bool>;

/// 当前使用的子控制器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActiveController {
    Controller1,
    Controller2,
}

/// 切换事件
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchEvent {
    /// 节拍序号（从 0 开始）
    pub tick: usize,
    pub t: f64,
    pub to: ActiveController,
}

/// 组合控制器
pub struct CombinedController<C1, C2> {
    controller1: C1,
    controller2: C2,
    condition1: Condition,
    condition2: Condition,
    compute_both: bool,

    filter: Option<Box<dyn MeasurementFilter>>,
    filter_dt: f64,
    friction: Option<FrictionCompensation>,
    torque_limit: Option<Control>,

    active: ActiveController,
    tick: usize,
    last_u: Control,
    saturation_count: usize,

    x_filt_hist: Vec<State>,
    u_hist: Vec<Control>,
    u_fric_hist: Vec<Control>,
    u_inactive_hist: Vec<Control>,
    switches: Vec<SwitchEvent>,
}

impl<C1: Controller, C2: Controller> CombinedController<C1, C2> {
    /// 创建组合控制器
    ///
    /// # 参数
    ///
    /// - `condition1`: 为真时切到 controller1（优先判定）
    /// - `condition2`: 为真时切到 controller2
    /// - `compute_both`: 每个节拍两个控制器都计算（便于记录）
    pub fn new(
        controller1: C1,
        controller2: C2,
        condition1: impl FnMut(f64, &State) -> bool + 'static,
        condition2: impl FnMut(f64, &State) -> bool + 'static,
        compute_both: bool,
    ) -> Self {
        Self {
            controller1,
            controller2,
            condition1: Box::new(condition1),
            condition2: Box::new(condition2),
            compute_both,
            filter: None,
            filter_dt: 0.0,
            friction: None,
            torque_limit: None,
            active: ActiveController::Controller1,
            tick: 0,
            last_u: Control::zeros(),
            saturation_count: 0,
            x_filt_hist: Vec::new(),
            u_hist: Vec::new(),
            u_fric_hist: Vec::new(),
            u_inactive_hist: Vec::new(),
            switches: Vec::new(),
        }
    }

    /// 设置测量滤波器，`dt` 为控制周期
    pub fn with_filter(mut self, filter: Box<dyn MeasurementFilter>, dt: f64) -> Self {
        self.filter = Some(filter);
        self.filter_dt = dt;
        self
    }

    /// 启用摩擦补偿
    pub fn with_friction_compensation(mut self, friction: FrictionCompensation) -> Self {
        self.friction = Some(friction);
        self
    }

    /// 设置输出力矩限制
    pub fn with_torque_limit(mut self, torque_limit: Control) -> Self {
        self.torque_limit = Some(torque_limit);
        self
    }

    pub fn active(&self) -> ActiveController {
        self.active
    }

    pub fn controller1(&self) -> &C1 {
        &self.controller1
    }

    pub fn controller2(&self) -> &C2 {
        &self.controller2
    }

    /// 滤波后状态历史
    pub fn x_filt_hist(&self) -> &[State] {
        &self.x_filt_hist
    }

    /// 摩擦补偿前的控制历史
    pub fn u_hist(&self) -> &[Control] {
        &self.u_hist
    }

    /// 摩擦补偿项历史
    pub fn u_fric_hist(&self) -> &[Control] {
        &self.u_fric_hist
    }

    /// 未选中控制器的输出历史（仅 `compute_both`）
    pub fn u_inactive_hist(&self) -> &[Control] {
        &self.u_inactive_hist
    }

    pub fn switches(&self) -> &[SwitchEvent] {
        &self.switches
    }

    /// 输出被饱和截断的节拍数
    pub fn saturation_count(&self) -> usize {
        self.saturation_count
    }

    fn select(&mut self, t: f64, x: &State) {
        let next = if (self.condition1)(t, x) {
            ActiveController::Controller1
        } else if (self.condition2)(t, x) {
            ActiveController::Controller2
        } else {
            self.active
        };

        if next != self.active {
            info!("Switching to {:?} at t = {:.4} (tick {})", next, t, self.tick);
            self.switches.push(SwitchEvent { tick: self.tick, t, to: next });
            self.active = next;
        }
    }
}

impl<C1: Controller, C2: Controller> Controller for CombinedController<C1, C2> {
    fn init(&mut self) -> Result<(), ControlError> {
        if let Some(limit) = &self.torque_limit {
            check_torque_limit(limit)?;
        }
        self.controller1.init().map_err(|e| ControlError::SubController {
            index: 1,
            source: Box::new(e),
        })?;
        self.controller2.init().map_err(|e| ControlError::SubController {
            index: 2,
            source: Box::new(e),
        })?;
        self.reset_supervisor();
        Ok(())
    }

    fn compute(&mut self, t: f64, x: &State) -> Control {
        let x_filt = match self.filter.as_mut() {
            Some(filter) => filter.update(x, &self.last_u, self.filter_dt),
            None => *x,
        };
        self.x_filt_hist.push(x_filt);

        self.select(t, &x_filt);

        let u_raw = if self.compute_both {
            let u1 = self.controller1.compute(t, &x_filt);
            let u2 = self.controller2.compute(t, &x_filt);
            let (selected, inactive) = match self.active {
                ActiveController::Controller1 => (u1, u2),
                ActiveController::Controller2 => (u2, u1),
            };
            self.u_inactive_hist.push(inactive);
            selected
        } else {
            match self.active {
                ActiveController::Controller1 => self.controller1.compute(t, &x_filt),
                ActiveController::Controller2 => self.controller2.compute(t, &x_filt),
            }
        };
        self.u_hist.push(u_raw);

        let u_fric = self
            .friction
            .map_or_else(Control::zeros, |f| f.compensation(&wrap_angles_top(&x_filt)));
        self.u_fric_hist.push(u_fric);

        let mut u = u_raw + u_fric;
        if let Some(limit) = &self.torque_limit {
            let clipped = saturate(&u, limit);
            if clipped != u {
                self.saturation_count += 1;
            }
            u = clipped;
        }

        self.last_u = u;
        self.tick += 1;
        u
    }

    fn reset(&mut self) {
        self.controller1.reset();
        self.controller2.reset();
        self.reset_supervisor();
    }

    fn state_estimate(&self) -> Option<State> {
        self.filter.as_ref().and(self.x_filt_hist.last().copied())
    }
}

impl<C1, C2> CombinedController<C1, C2> {
    fn reset_supervisor(&mut self) {
        if let Some(filter) = self.filter.as_mut() {
            filter.reset();
        }
        self.active = ActiveController::Controller1;
        self.tick = 0;
        self.last_u = Control::zeros();
        self.saturation_count = 0;
        self.x_filt_hist.clear();
        self.u_hist.clear();
        self.u_fric_hist.clear();
        self.u_inactive_hist.clear();
        self.switches.clear();
    }
}

/// 常用切换条件
pub mod conditions {
    use crate::roa::RegionOfAttraction;
    use pendulum_model::State;
    use tracing::debug;

    /// 永不触发
    pub fn never() -> impl FnMut(f64, &State) -> bool + 'static {
        |_, _| false
    }

    /// `t > t_switch` 时触发（严格大于）
    pub fn after_time(t_switch: f64) -> impl FnMut(f64, &State) -> bool + 'static {
        move |t, _| t > t_switch
    }

    /// 状态（wrap-to-top 后）进入吸引域时触发
    pub fn in_region(roa: RegionOfAttraction) -> impl FnMut(f64, &State) -> bool + 'static {
        move |t, x| {
            let (inside, rad) = roa.check_wrapped(x);
            if inside {
                debug!("State inside region of attraction at t = {t:.4} (rad {rad:.4} < rho {})", roa.rho());
            }
            inside
        }
    }
}
