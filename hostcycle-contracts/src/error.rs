use std::any::Any;

use thiserror::Error;

/// Failure raised by one of the host's callback hooks.
#[derive(Error, Debug)]
pub enum HostError {
    /// The business objects could not be retrieved (network, storage, ...).
    #[error("business objects unavailable: {message}")]
    BusinessObjectUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// A presentation hook could not bring the display objects up to date.
    #[error("display objects error: {0}")]
    Display(String),

    /// The hook panicked; the payload message is preserved when it is a string.
    #[error("hook panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HostError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        HostError::BusinessObjectUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn unavailable_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HostError::BusinessObjectUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn display(message: impl Into<String>) -> Self {
        HostError::Display(message.into())
    }

    /// Converts a payload captured by `std::panic::catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HostError::Panicked(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, HostError::Panicked(_))
    }
}

pub type HostResult<T = ()> = std::result::Result<T, HostError>;
