use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    ServiceError = 1,
    HostError = 2,
}

pub const ERR_MUTEX_LOCK: &str = "Failed to get lock on Mutex";

/// Error code attached to responses
/// when the power service cannot be reached or read.
pub const DBUS_ERROR: &str = "D-BUS Error";

/// The single failure kind of the device adapter:
/// the bus connection could not be established or used.
///
/// The message is surfaced to the host verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<zbus::Error> for ServiceError {
    fn from(err: zbus::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("event channel is closed")]
    Closed,

    #[error("event channel is full")]
    Full,
}
