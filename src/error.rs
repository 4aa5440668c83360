use thiserror::Error;

/// Hard failures surfaced by the engine and the `triax` binary.
///
/// Numerical edge cases (empty search windows, loops that never intersect,
/// degenerate regressions) are *not* errors; they come back as
/// [`crate::domain::Outcome::Undefined`] inside the result records.
#[derive(Debug, Error)]
pub enum TriaxError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cut window [{left}, {right}) rejected: {reason}")]
    InvalidCutWindow {
        left: usize,
        right: usize,
        reason: String,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid circle geometry: {0}")]
    InvalidCircleGeometry(String),

    #[error("noise injection gave up after {attempts} attempts (best objective {best_objective:.3})")]
    NoiseInjectionExhausted { attempts: usize, best_objective: f64 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TriaxError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Process exit code used by the `triax` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            TriaxError::Io { .. } | TriaxError::Json { .. } => 2,
            TriaxError::InvalidInput(_) | TriaxError::InvalidCutWindow { .. } => 3,
            TriaxError::InsufficientData(_) => 4,
            TriaxError::InvalidCircleGeometry(_) | TriaxError::NoiseInjectionExhausted { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_family() {
        assert_eq!(TriaxError::invalid_input("x").exit_code(), 3);
        assert_eq!(
            TriaxError::NoiseInjectionExhausted {
                attempts: 100,
                best_objective: 7.5
            }
            .exit_code(),
            5
        );
        let msg = TriaxError::InvalidCutWindow {
            left: 10,
            right: 20,
            reason: "too short".into(),
        }
        .to_string();
        assert!(msg.contains("[10, 20)"), "{msg}");
    }
}
