//! Scalar special-function approximations used by the gain estimators.
//!
//! Polynomial/rational approximations from Abramowitz & Stegun, "Handbook of
//! Mathematical Functions" (1964), as sampled in Zhang & Jin, "Computation of
//! Special Functions" (1996). Pure, stateless, `f64` throughout.

/// Modified Bessel function of the first kind, order 0.
pub fn bess_i0(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let x = x.abs();
    if x <= 3.75 {
        let p = (x / 3.75).powi(2);
        ((((((0.0045813 * p + 0.0360768) * p + 0.2659732) * p + 1.2067492) * p + 3.0899424) * p
            + 3.5156229)
            * p)
            + 1.0
    } else {
        let p = 3.75 / x;
        x.exp() / x.sqrt()
            * (((((((0.00392377 * p - 0.01647633) * p + 0.02635537) * p - 0.02057706) * p
                + 0.00916281)
                * p
                - 0.00157565)
                * p
                + 0.00225319)
                * p
                + 0.01328592)
                * p
                + 0.39894228
    }
}

/// Modified Bessel function of the first kind, order 1.
pub fn bess_i1(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let sign = x.signum();
    let x = x.abs();
    let res = if x <= 3.75 {
        let p = (x / 3.75).powi(2);
        x * ((((((0.00032411 * p + 0.00301532) * p + 0.02658733) * p + 0.15084934) * p
            + 0.51498869)
            * p
            + 0.87890594)
            * p
            + 0.5)
    } else {
        let p = 3.75 / x;
        x.exp() / x.sqrt()
            * (((((((-0.00420059 * p + 0.01787654) * p - 0.02895312) * p + 0.02282967) * p
                - 0.01031555)
                * p
                + 0.00163801)
                * p
                - 0.00362018)
                * p
                - 0.03988024)
                * p
                + 0.39894228
    };
    sign * res
}

/// Exponential integral E1(x), for x > 0.
pub fn e1xb(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0e300;
    }
    if x <= 1.0 {
        let mut e1 = 1.0;
        let mut r = 1.0;
        for k in 1..=25 {
            let kf = k as f64;
            r = -r * kf * x / ((kf + 1.0) * (kf + 1.0));
            e1 += r;
            if r.abs() <= e1.abs() * 1.0e-15 {
                break;
            }
        }
        const EULER_GAMMA: f64 = 0.5772156649015328;
        -EULER_GAMMA - x.ln() + x * e1
    } else {
        let m = 20 + (80.0 / x) as i64;
        let mut t0 = 0.0;
        for k in (1..=m).rev() {
            t0 = k as f64 / (1.0 + k as f64 / (x + t0));
        }
        let t = 1.0 / (x + t0);
        (-x).exp() * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bess_i0_at_zero_is_one() {
        assert_eq!(bess_i0(0.0), 1.0);
    }

    #[test]
    fn bess_i1_at_zero_is_zero() {
        assert_eq!(bess_i1(0.0), 0.0);
    }

    #[test]
    fn bess_i0_matches_known_values() {
        // Reference values from standard tables.
        assert_relative_eq!(bess_i0(1.0), 1.266_065_88, epsilon = 1e-6);
        assert_relative_eq!(bess_i0(5.0), 27.239_871_8, epsilon = 1e-4);
    }

    #[test]
    fn bess_i1_matches_known_values() {
        assert_relative_eq!(bess_i1(1.0), 0.565_159_10, epsilon = 1e-6);
        assert_relative_eq!(bess_i1(5.0), 24.335_642_4, epsilon = 1e-4);
    }

    #[test]
    fn bess_i1_is_odd() {
        assert_relative_eq!(bess_i1(-2.0), -bess_i1(2.0), epsilon = 1e-12);
    }

    #[test]
    fn e1xb_matches_known_values() {
        // E1(1) ~ 0.2193839...
        assert_relative_eq!(e1xb(1.0), 0.219_383_9, epsilon = 1e-6);
        // E1(0.5) ~ 0.5597736...
        assert_relative_eq!(e1xb(0.5), 0.559_773_6, epsilon = 1e-6);
    }

    #[test]
    fn e1xb_decays_for_large_x() {
        assert!(e1xb(20.0) < 1e-9);
        assert!(e1xb(20.0) > 0.0);
    }
}
