/// Assert that two `f32` values differ by at most `eps`, which defaults to
/// `f32::EPSILON`.
#[cfg(test)]
macro_rules! assert_f32_eq {
    ($a:expr, $b:expr, $eps:expr) => {{
        let (a, b, eps): (f32, f32, f32) = ($a, $b, $eps);
        let error = (a - b).abs();
        assert!(
            error <= eps,
            "Assertion failed: |{} - {}| = {:e} > {:e}",
            a,
            b,
            error,
            eps
        );
    }};
    ($a:expr, $b:expr) => {
        $crate::macros::assert_f32_eq!($a, $b, f32::EPSILON)
    };
}

/// Assert that every component of two glam vectors differs by at most `eps`,
/// which defaults to `1e-5`.
#[cfg(test)]
macro_rules! assert_vec_eq {
    ($a:expr, $b:expr, $eps:expr) => {{
        let (a, b) = ($a, $b);
        assert!(
            a.abs_diff_eq(b, $eps),
            "Assertion failed: {:?} != {:?} within {:e}",
            a,
            b,
            $eps
        );
    }};
    ($a:expr, $b:expr) => {
        $crate::macros::assert_vec_eq!($a, $b, 1e-5)
    };
}

#[cfg(test)]
pub(crate) use assert_f32_eq;
#[cfg(test)]
pub(crate) use assert_vec_eq;
