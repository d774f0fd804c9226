use core::fmt;

use crate::transport::TransportError;

pub type ArpResult<T> = Result<T, ArpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum ArpError {
    /// Malformed call parameters
    InvalidArgument,
    /// Operation on an instance that has not been configured
    NotConfigured,
    /// Collides with an existing entry, or the target is on the deny list
    AccessDenied,
    /// No matching entries or waiters
    NotFound,
    /// Entry or waiter limit reached
    OutOfResources,
    /// Resolution has started, completion is signalled later
    NotReady,
}

impl fmt::Display for ArpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidArgument => "invalid argument",
            Self::NotConfigured => "instance not configured",
            Self::AccessDenied => "access denied",
            Self::NotFound => "not found",
            Self::OutOfResources => "out of resources",
            Self::NotReady => "not ready",
        };
        f.write_str(text)
    }
}

impl core::convert::From<TransportError> for ArpError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::NoMedia => Self::NotReady,
            TransportError::QueueFull => Self::OutOfResources,
            TransportError::Unsupported => Self::InvalidArgument,
        }
    }
}
