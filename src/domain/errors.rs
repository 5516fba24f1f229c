//! # Domain Errors
//!
//! Error taxonomy shared by the dialog, the review fan-out and the transport.

use thiserror::Error;

/// Time-commitment input that could not be accepted. Recovered by re-prompting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("{value} is outside (0, {max}]")]
    OutOfRange { value: f64, max: f64 },
}

/// A single outbound send or edit failed. Logged, never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeliveryError {
    #[error("room {0} is unknown to the client")]
    UnknownRoom(String),
    #[error("send to {room} failed: {reason}")]
    Send { room: String, reason: String },
    #[error("edit of {event} failed: {reason}")]
    Edit { event: String, reason: String },
}

/// Pump-level failure, handled by the supervisor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// Another instance holds the connection.
    #[error("connection conflict: {0}")]
    Conflict(String),
    #[error("transport failure: {0}")]
    Failed(String),
}
