use std::path::PathBuf;

use thiserror::Error;

use crate::input::TouchButton;

/// Startup-time configuration failures. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum GearboxError {
    #[error("gear table needs at least one gear")]
    NoGears,

    #[error("top speed must be positive and finite, got {0}")]
    InvalidTopSpeed(f32),
}

#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("no audio service available")]
    NoService,

    #[error("clip '{0}' is not in the audio catalog")]
    UnknownClip(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("touch controls enabled but buttons not wired: {0:?}")]
    TouchNotWired(Vec<TouchButton>),
}
