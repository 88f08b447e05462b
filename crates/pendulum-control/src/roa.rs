//! 吸引域（ROA）判定
//!
//! 区域 `{x : (x−g)ᵀS(x−g) < ρ}`。判定本身不做角度规范化，
//! 调用方负责先 [`wrap_angles_top`]，因此同一函数也可用于非角度状态空间。

use crate::ControlError;
use pendulum_model::{State, wrap_angles_top};
use nalgebra::Matrix4;

/// 二次型区域判定
///
/// 返回 `(rad < rho, rad)`，`rad = (x−goal)ᵀ S (x−goal)`。
/// 比较使用严格小于：恰好在边界上的状态判为区域外。
///
/// ```rust
/// use nalgebra::Matrix4;
/// use pendulum_control::check_if_state_in_roa;
/// use pendulum_model::upright_goal;
///
/// let goal = upright_goal();
/// let (inside, rad) = check_if_state_in_roa(&goal, &Matrix4::identity(), 1.0, &goal);
/// assert!(inside);
/// assert_eq!(rad, 0.0);
/// ```
pub fn check_if_state_in_roa(goal: &State, s: &Matrix4<f64>, rho: f64, x: &State) -> (bool, f64) {
    let diff = x - goal;
    let rad = diff.dot(&(s * diff));
    (rad < rho, rad)
}

/// 吸引域描述（构造后不可变）
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOfAttraction {
    goal: State,
    s: Matrix4<f64>,
    rho: f64,
}

/// 对称性容差（相对）
const SYMMETRY_TOL: f64 = 1e-9;

impl RegionOfAttraction {
    /// 创建吸引域
    ///
    /// # 错误
    ///
    /// - `ρ` 非正或非有限 → [`ControlError::InvalidRho`]
    /// - `S` 不对称或不正定 → [`ControlError::NotPositiveDefinite`]
    pub fn new(goal: State, s: Matrix4<f64>, rho: f64) -> Result<Self, ControlError> {
        if !(rho.is_finite() && rho > 0.0) {
            return Err(ControlError::InvalidRho(rho));
        }
        let scale = s.amax().max(1.0);
        if (s - s.transpose()).amax() > SYMMETRY_TOL * scale || s.cholesky().is_none() {
            return Err(ControlError::NotPositiveDefinite);
        }
        Ok(Self { goal, s, rho })
    }

    pub fn goal(&self) -> &State {
        &self.goal
    }

    pub fn s(&self) -> &Matrix4<f64> {
        &self.s
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// 对已规范化的状态判定
    pub fn check(&self, x: &State) -> (bool, f64) {
        check_if_state_in_roa(&self.goal, &self.s, self.rho, x)
    }

    /// 先 wrap-to-top 再判定
    pub fn check_wrapped(&self, x: &State) -> (bool, f64) {
        self.check(&wrap_angles_top(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendulum_model::upright_goal;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_goal_is_inside() {
        let roa = RegionOfAttraction::new(upright_goal(), Matrix4::identity(), 1.0).unwrap();
        assert_eq!(roa.check(&upright_goal()), (true, 0.0));
    }

    #[test]
    fn test_boundary_is_outside() {
        let roa = RegionOfAttraction::new(upright_goal(), Matrix4::identity(), 1.0).unwrap();
        // rad == 1.0 exactly
        let x = State::new(PI, 0.0, 1.0, 0.0);
        let (inside, rad) = roa.check(&x);
        assert_eq!(rad, 1.0);
        assert!(!inside);
    }

    #[test]
    fn test_unwrapped_state_needs_wrapping() {
        let roa = RegionOfAttraction::new(upright_goal(), Matrix4::identity(), 0.5).unwrap();
        let x = State::new(PI + TAU, 0.0, 0.0, 0.0);
        assert!(!roa.check(&x).0);
        assert!(roa.check_wrapped(&x).0);
    }

    #[test]
    fn test_rejects_invalid_rho() {
        let err = RegionOfAttraction::new(upright_goal(), Matrix4::identity(), 0.0).unwrap_err();
        assert_eq!(err, ControlError::InvalidRho(0.0));
        assert!(RegionOfAttraction::new(upright_goal(), Matrix4::identity(), f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_indefinite_matrix() {
        let mut s = Matrix4::identity();
        s[(3, 3)] = -1.0;
        assert_eq!(
            RegionOfAttraction::new(upright_goal(), s, 1.0).unwrap_err(),
            ControlError::NotPositiveDefinite
        );
    }

    #[test]
    fn test_rejects_asymmetric_matrix() {
        let mut s = Matrix4::identity();
        s[(0, 1)] = 0.5;
        assert!(RegionOfAttraction::new(upright_goal(), s, 1.0).is_err());
    }
}
