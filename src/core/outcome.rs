//! Soft-fail results — degraded values that still carry their reason.
//!
//! Lookups, template substitution and dice evaluation never fail outright:
//! a missing key yields the fallback, a bad template yields the raw text,
//! an unknown dice expression yields zero. `Soft` keeps the reason next to
//! the degraded value so instrumentation can still see it.

use thiserror::Error;

/// Why a value was degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftFailure {
    #[error("configuration is not initialized")]
    Uninitialized,
    #[error("key not found: {key}")]
    MissingKey { key: String },
    #[error("type mismatch at '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("template '{key}' left unsubstituted: {detail}")]
    TemplateSubstitution { key: String, detail: String },
    #[error("unrecognized dice expression: '{expression}'")]
    UnrecognizedDice { expression: String },
}

/// A value that is either clean or degraded with a reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Soft<T> {
    Clean(T),
    Degraded { value: T, reason: SoftFailure },
}

impl<T> Soft<T> {
    pub fn degraded(value: T, reason: SoftFailure) -> Self {
        tracing::debug!(%reason, "degraded result");
        Self::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Clean(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Clean(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&SoftFailure> {
        match self {
            Self::Clean(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Soft<U> {
        match self {
            Self::Clean(value) => Soft::Clean(f(value)),
            Self::Degraded { value, reason } => Soft::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
