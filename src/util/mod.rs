//! Basic shared types and errors.

pub mod error;

pub use error::{Error, FormatError, Result};

/// Clamp a float to 4 significant figures.
///
/// Matches the precision used for unit magnitudes and time step sizes in
/// trajectory-info JSON.
pub fn clamp_precision(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    format!("{:.3e}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_precision() {
        assert_eq!(clamp_precision(0.0), 0.0);
        assert_eq!(clamp_precision(1.0), 1.0);
        assert_eq!(clamp_precision(0.123456), 0.1235);
        assert_eq!(clamp_precision(123456.0), 123500.0);
        assert_eq!(clamp_precision(-0.00123456), -0.001235);
    }
}
