use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors raised synchronously during setup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Multi-array configuration has inconsistent list lengths ({found} vs {expected})")]
    InconsistentLengths { found: usize, expected: usize },

    #[error("Multi-array configuration contains an empty list; provide at least one value")]
    EmptyList,

    #[error("Value {value} for '{field}' is below minimum {min}")]
    BelowMinimum {
        field: &'static str,
        value: f64,
        min: f64,
    },

    #[error("Value {value} for '{field}' is above maximum {max}")]
    AboveMaximum {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Horizon file validation errors, each with a message a user can act on
#[derive(Debug, Error)]
pub enum HorizonFileError {
    #[error(
        "Invalid horizon file: '{path}' could not be opened ({source}). \
         Specify a path like e.g. '/config/www/horizon.txt'"
    )]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Invalid horizon file: the shape is ({rows}, {cols}), which is invalid. \
         It has to be at least two rows and exactly two columns (N>1, 2). \
         Please check (two columns, tab delimiter, decimal points)"
    )]
    Shape { rows: usize, cols: usize },

    #[error(
        "Invalid horizon file: the data seems to contain non-float values \
         around row {row}. Please check (two columns, tab delimiter, decimal points)"
    )]
    NonNumeric { row: usize },

    #[error(
        "Invalid horizon file: azimuth values ({first}\u{b0} to {last}\u{b0}) do not \
         cover 0\u{b0} and/or 360\u{b0}, so the full range of applicable azimuths \
         may not be covered. Please check"
    )]
    Coverage { first: f64, last: f64 },

    #[error("Invalid horizon file: azimuth values are not ascending around value of {azimuth}\u{b0}. Please check")]
    NotAscending { azimuth: f64 },
}

/// Umbrella error for coordinator setup; any variant aborts initialization
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Horizon(#[from] HorizonFileError),
}

/// A failed refresh tick, surfaced to the host as an unavailable/stale state.
///
/// Each variant carries the underlying forecaster error in its message.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Error communicating with forecast API: {0}")]
    Upstream(anyhow::Error),

    #[error("No successful forecast update timestamp available (forecaster error: {0})")]
    NoBaseline(anyhow::Error),

    #[error(
        "Retained forecast exceeded max age ({age_minutes} min > {max_minutes} min), \
         forecaster error: {cause}"
    )]
    StaleRetention {
        age_minutes: i64,
        max_minutes: i64,
        cause: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InconsistentLengths {
            found: 3,
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "Multi-array configuration has inconsistent list lengths (3 vs 2)"
        );

        let err = ConfigError::BelowMinimum {
            field: "modules_power",
            value: 0.0,
            min: 1.0,
        };
        assert!(err.to_string().contains("modules_power"));
    }

    #[test]
    fn test_horizon_error_messages() {
        let err = HorizonFileError::Coverage {
            first: 10.0,
            last: 350.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("350"));

        let err = HorizonFileError::NotAscending { azimuth: 100.0 };
        assert!(err.to_string().contains("not ascending"));
    }

    #[test]
    fn test_refresh_error_stale_message() {
        let err = RefreshError::StaleRetention {
            age_minutes: 90,
            max_minutes: 60,
            cause: anyhow::anyhow!("connection refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("90 min > 60 min"));
        assert!(msg.contains("connection refused"));
    }
}
