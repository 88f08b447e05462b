//! 状态与控制向量
//!
//! 原始状态与 wrap 后的状态是同一物理量的两种视图，类型相同但语义不同：
//! Lyapunov / ROA 相关计算之前必须先调用 [`wrap_angles_top`]。

use nalgebra::{Vector2, Vector4};
use std::f64::consts::{PI, TAU};

/// 系统状态 `[q1, q2, q̇1, q̇2]`
pub type State = Vector4<f64>;

/// 关节力矩 `[τ1, τ2]`
pub type Control = Vector2<f64>;

/// 倒立（竖直向上）平衡点
pub fn upright_goal() -> State {
    State::new(PI, 0.0, 0.0, 0.0)
}

/// 把角度映射到 `[lower, lower + 2π)`
///
/// 已在区间内的值原样返回，保证幂等（`wrap(wrap(a)) == wrap(a)`）。
#[inline]
fn wrap_into(angle: f64, lower: f64) -> f64 {
    let upper = lower + TAU;
    if (lower..upper).contains(&angle) {
        return angle;
    }
    let wrapped = (angle - lower).rem_euclid(TAU) + lower;
    // rem_euclid 可能因舍入返回 2π
    if wrapped >= upper || wrapped < lower {
        lower
    } else {
        wrapped
    }
}

/// Wrap-to-top：以倒立平衡点为中心规范化关节角
///
/// - `q1` → `[0, 2π)`（与目标 `π` 的差位于 `[-π, π)`）
/// - `q2` → `[-π, π)`
/// - 速度分量保持不变
///
/// 非有限值（NaN/Inf）原样传播，不做钳位。
///
/// ```rust
/// use pendulum_model::{State, wrap_angles_top};
/// use std::f64::consts::PI;
///
/// let x = State::new(3.0 * PI, 2.0 * PI, 0.1, -0.2);
/// let y = wrap_angles_top(&x);
/// assert!((y[0] - PI).abs() < 1e-12);
/// assert!(y[1].abs() < 1e-12);
/// assert_eq!(wrap_angles_top(&y), y);
/// ```
pub fn wrap_angles_top(x: &State) -> State {
    let mut y = *x;
    if x[0].is_finite() {
        y[0] = wrap_into(x[0], 0.0);
    }
    if x[1].is_finite() {
        y[1] = wrap_into(x[1], -PI);
    }
    y
}

/// 单个角度差规范化到 `[-π, π)`
pub fn wrap_angle_diff(angle: f64) -> f64 {
    if angle.is_finite() {
        wrap_into(angle, -PI)
    } else {
        angle
    }
}

/// 符号函数（`sign(0) = 0`，与 `f64::signum` 不同）
#[inline]
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// 每通道饱和到 `±|limit|`
///
/// NaN 控制量原样传播（留给循环做有限性检测），NaN 限制不做饱和。
/// 限制的合法性由控制器 `init()` 检查，这里不会 panic。
#[inline]
pub fn saturate(u: &Control, limit: &Control) -> Control {
    Control::new(clip(u[0], limit[0]), clip(u[1], limit[1]))
}

#[inline]
fn clip(v: f64, limit: f64) -> f64 {
    let limit = limit.abs();
    if v.is_nan() || limit.is_nan() {
        return v;
    }
    v.clamp(-limit, limit)
}

/// 检查向量所有分量是否有限
#[inline]
pub fn all_finite<const N: usize>(v: &nalgebra::SVector<f64, N>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturate_never_panics_on_bad_limits() {
        let u = Control::new(7.0, -1.0);
        assert_eq!(saturate(&u, &Control::new(-5.0, 0.5)), Control::new(5.0, -0.5));
        assert_eq!(saturate(&u, &Control::new(f64::NAN, 0.5)), Control::new(7.0, -0.5));
        assert_eq!(saturate(&u, &Control::repeat(f64::INFINITY)), u);
        assert!(saturate(&Control::new(f64::NAN, 0.0), &Control::repeat(1.0))[0].is_nan());
    }

    #[test]
    fn test_wrap_upright_is_fixed_point() {
        let goal = upright_goal();
        assert_eq!(wrap_angles_top(&goal), goal);
    }

    #[test]
    fn test_wrap_negative_angles() {
        let x = State::new(-PI, -3.0 * PI / 2.0, 1.0, 2.0);
        let y = wrap_angles_top(&x);
        assert!((y[0] - PI).abs() < 1e-12);
        assert!((y[1] - PI / 2.0).abs() < 1e-12);
        assert_eq!(y[2], 1.0);
        assert_eq!(y[3], 2.0);
    }

    #[test]
    fn test_wrap_q2_upper_bound_excluded() {
        let y = wrap_angles_top(&State::new(0.0, PI, 0.0, 0.0));
        assert_eq!(y[1], -PI);
    }

    #[test]
    fn test_wrap_tiny_negative_stays_in_range() {
        let y = wrap_angles_top(&State::new(-1e-18, 0.0, 0.0, 0.0));
        assert!(y[0] >= 0.0 && y[0] < TAU);
    }

    #[test]
    fn test_wrap_propagates_nan() {
        let y = wrap_angles_top(&State::new(f64::NAN, 0.0, 0.0, 0.0));
        assert!(y[0].is_nan());
    }

    #[test]
    fn test_sign_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-1e-9), -1.0);
    }

    #[test]
    fn test_saturate_signed_limit() {
        let u = saturate(&Control::new(7.0, -1.0), &Control::new(5.0, 0.5));
        assert_eq!(u, Control::new(5.0, -0.5));
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&upright_goal()));
        assert!(!all_finite(&Control::new(f64::INFINITY, 0.0)));
    }
}
