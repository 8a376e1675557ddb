use thiserror::Error;

use crate::types::ZoneType;

/// Rejected runtime operations. None of these are fatal: the engine state is
/// left unchanged and the caller may retry on a later tick.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WeatherError {
    #[error("storm capacity reached ({max} active)")]
    StormCapacity { max: usize },
    #[error("weather event capacity reached ({max} active)")]
    EventCapacity { max: usize },
    #[error("climate zone {0} is already registered")]
    DuplicateZone(ZoneType),
    #[error("weather pattern {0:?} is already registered")]
    DuplicatePattern(String),
    #[error("unknown weather pattern {0:?}")]
    UnknownPattern(String),
    #[error("weather pattern {name:?} has {weather} steps but {durations} durations")]
    MalformedPattern {
        name: String,
        weather: usize,
        durations: usize,
    },
    #[error("unknown storm id {0}")]
    UnknownStorm(u64),
    #[error("unknown weather event id {0}")]
    UnknownEvent(u64),
    #[error("a weather transition is already in progress")]
    TransitionInProgress,
}

/// Semantic problems found while validating a loaded configuration.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f32 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} has min {min} above max {max}")]
    InvertedSpan { field: &'static str, min: f32, max: f32 },
    #[error("climate zone {0} appears more than once")]
    DuplicateZone(ZoneType),
    #[error("weather pattern {0:?} appears more than once")]
    DuplicatePattern(String),
    #[error("weather pattern {name:?} has {weather} steps but {durations} durations")]
    MalformedPattern {
        name: String,
        weather: usize,
        durations: usize,
    },
}
