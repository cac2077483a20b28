use thiserror::Error;

/// The smallest grid that still leaves one interior cell for the stencils.
pub const MIN_GRID_POINTS: usize = 3;

/// Invalid run configuration, rejected before any kernel step runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid needs at least 3 points per axis, got {nx} x {ny}")]
    GridTooSmall { nx: usize, ny: usize },

    #[error("{name} must be strictly positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },
}

/// Reject non-finite values, then anything `<= 0`.
pub fn require_positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    require_finite(name, value)?;
    if value <= 0. {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(value)
}

/// Reject non-finite values, then anything `< 0`.
pub fn require_non_negative(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    require_finite(name, value)?;
    if value < 0. {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(value)
}

pub fn require_finite(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { name, value });
    }
    Ok(value)
}

pub fn require_count(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCount { name });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_checks() {
        assert_eq!(require_positive("dt", 0.5), Ok(0.5));
        assert_eq!(
            require_positive("dt", 0.),
            Err(ConfigError::NonPositive { name: "dt", value: 0. })
        );
        assert!(matches!(
            require_positive("dt", f64::NAN),
            Err(ConfigError::NonFinite { name: "dt", .. })
        ));
        assert_eq!(require_non_negative("nu", 0.), Ok(0.));
        assert!(require_non_negative("nu", -1e-3).is_err());
        assert!(require_count("max_it", 0).is_err());
    }
}
