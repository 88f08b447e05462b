//! 连续时间代数 Riccati 方程（CARE）
//!
//! `AᵀS + SA − SBR⁻¹BᵀS + Q = 0`
//!
//! 使用 Hamilton 矩阵的矩阵符号函数迭代求稳定不变子空间：
//!
//! ```text
//! H = [ A   −BR⁻¹Bᵀ ]      Z₀ = H
//!     [ −Q  −Aᵀ     ]      Zₖ₊₁ = ½ (Zₖ / c + c Zₖ⁻¹),  c = |det Zₖ|^(1/8)
//! ```
//!
//! 收敛后 `W = sign(H)`，由 `[W₁₂; W₂₂ + I] S = −[W₁₁ + I; W₂₁]` 最小二乘解出 `S`。

use crate::ControlError;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, SMatrix};

type Matrix8 = SMatrix<f64, 8, 8>;
type Matrix8x4 = SMatrix<f64, 8, 4>;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_TOL: f64 = 1e-12;
/// CARE 残差容差（相对于 Q 的量级）
const RESIDUAL_TOL: f64 = 1e-6;

/// 求解 CARE，返回 `(K, S)`，`K = R⁻¹BᵀS`
///
/// # 错误
///
/// - `R` 不正定 → [`ControlError::InvalidCost`]
/// - 迭代不收敛或残差过大（系统不可镇定）→ [`ControlError::RiccatiFailed`]
pub fn solve_continuous_are(
    a: &Matrix4<f64>,
    b: &Matrix4x2<f64>,
    q: &Matrix4<f64>,
    r: &Matrix2<f64>,
) -> Result<(Matrix2x4<f64>, Matrix4<f64>), ControlError> {
    if (q - q.transpose()).amax() > 1e-12 * q.amax().max(1.0) {
        return Err(ControlError::InvalidCost {
            name: "Q",
            reason: "matrix must be symmetric",
        });
    }
    let r_inv = r
        .cholesky()
        .map(|c| c.inverse())
        .ok_or(ControlError::InvalidCost {
            name: "R",
            reason: "matrix must be positive definite",
        })?;
    let g = b * r_inv * b.transpose();

    let mut z = Matrix8::zeros();
    z.fixed_view_mut::<4, 4>(0, 0).copy_from(a);
    z.fixed_view_mut::<4, 4>(0, 4).copy_from(&(-g));
    z.fixed_view_mut::<4, 4>(4, 0).copy_from(&(-q));
    z.fixed_view_mut::<4, 4>(4, 4).copy_from(&(-a.transpose()));

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let Some(z_inv) = z.try_inverse() else {
            // H 在虚轴上有特征值
            return Err(ControlError::RiccatiFailed { residual: f64::INFINITY });
        };
        let det = z.determinant().abs();
        let c = if det.is_finite() && det > 0.0 { det.powf(1.0 / 8.0) } else { 1.0 };
        let next = 0.5 * (z / c + z_inv * c);
        let delta = (next - z).norm();
        let scale = z.norm();
        z = next;
        if delta <= CONVERGENCE_TOL * scale {
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!("Riccati sign iteration did not reach tolerance");
    }

    let identity = Matrix4::<f64>::identity();
    let w11 = z.fixed_view::<4, 4>(0, 0).into_owned();
    let w12 = z.fixed_view::<4, 4>(0, 4).into_owned();
    let w21 = z.fixed_view::<4, 4>(4, 0).into_owned();
    let w22 = z.fixed_view::<4, 4>(4, 4).into_owned();

    let mut lhs = Matrix8x4::zeros();
    lhs.fixed_view_mut::<4, 4>(0, 0).copy_from(&w12);
    lhs.fixed_view_mut::<4, 4>(4, 0).copy_from(&(w22 + identity));
    let mut rhs = Matrix8x4::zeros();
    rhs.fixed_view_mut::<4, 4>(0, 0).copy_from(&(-(w11 + identity)));
    rhs.fixed_view_mut::<4, 4>(4, 0).copy_from(&(-w21));

    // 正规方程
    let normal = lhs.transpose() * lhs;
    let s = normal
        .lu()
        .solve(&(lhs.transpose() * rhs))
        .ok_or(ControlError::RiccatiFailed { residual: f64::INFINITY })?;
    let s = 0.5 * (s + s.transpose());

    let residual = (a.transpose() * s + s * a - s * g * s + q).amax();
    let tol = RESIDUAL_TOL * q.amax().max(1.0) * s.amax().max(1.0);
    if !residual.is_finite() || residual > tol {
        return Err(ControlError::RiccatiFailed { residual });
    }

    let k = r_inv * b.transpose() * s;
    Ok((k, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 两个解耦的双积分器 `[p1, p2, v1, v2]`
    fn double_integrators() -> (Matrix4<f64>, Matrix4x2<f64>) {
        let mut a = Matrix4::zeros();
        a[(0, 2)] = 1.0;
        a[(1, 3)] = 1.0;
        let mut b = Matrix4x2::zeros();
        b[(2, 0)] = 1.0;
        b[(3, 1)] = 1.0;
        (a, b)
    }

    #[test]
    fn test_double_integrator_closed_form() {
        let (a, b) = double_integrators();
        let (k, s) = solve_continuous_are(&a, &b, &Matrix4::identity(), &Matrix2::identity()).unwrap();

        // 闭式解：K = [1, √3]，S = [[√3, 1], [1, √3]]
        let sqrt3 = 3.0f64.sqrt();
        assert_relative_eq!(k[(0, 0)], 1.0, epsilon = 1e-8);
        assert_relative_eq!(k[(0, 2)], sqrt3, epsilon = 1e-8);
        assert_relative_eq!(k[(1, 1)], 1.0, epsilon = 1e-8);
        assert_relative_eq!(k[(1, 3)], sqrt3, epsilon = 1e-8);
        assert_relative_eq!(k[(0, 1)], 0.0, epsilon = 1e-8);
        assert_relative_eq!(s[(0, 0)], sqrt3, epsilon = 1e-8);
        assert_relative_eq!(s[(0, 2)], 1.0, epsilon = 1e-8);
        assert_eq!(s, s.transpose());
    }

    #[test]
    fn test_closed_loop_is_stable() {
        let (mut a, b) = double_integrators();
        // 加入不稳定的位置反馈
        a[(2, 0)] = 4.0;
        a[(3, 1)] = 9.0;
        let (k, _) = solve_continuous_are(&a, &b, &Matrix4::identity(), &Matrix2::identity()).unwrap();
        let eig = (a - b * k).complex_eigenvalues();
        assert!(eig.iter().all(|e| e.re < 0.0));
    }

    #[test]
    fn test_rejects_singular_r() {
        let (a, b) = double_integrators();
        let err = solve_continuous_are(&a, &b, &Matrix4::identity(), &Matrix2::zeros()).unwrap_err();
        assert!(matches!(err, ControlError::InvalidCost { name: "R", .. }));
    }

    #[test]
    fn test_unstabilizable_system_fails() {
        // 第一个状态不稳定且不受控
        let mut a = Matrix4::zeros();
        a[(0, 0)] = 1.0;
        let mut b = Matrix4x2::zeros();
        b[(2, 0)] = 1.0;
        b[(3, 1)] = 1.0;
        assert!(solve_continuous_are(&a, &b, &Matrix4::identity(), &Matrix2::identity()).is_err());
    }
}
