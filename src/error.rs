//! Error taxonomy for explanation operations

/// Custom error type for marginalia operations
/// Implements Clone so callers can keep it alongside a reply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error
{   /// Inbound payload is missing, mistyped or oversized
    #[error("{0}")]
    Validation(String)
  , /// The completion dependency failed or gave nothing usable
    #[error("{operation} failed: {message}")]
    Completion
    {   operation: crate::Operation
      , message: String
    }
  , /// Required configuration is absent at startup
    #[error("Invalid configuration: {0}")]
    Configuration(String)
}

impl Error
{   /// Shorthand for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self
    {   Error::Validation(reason.into())
    }

    /// Shorthand for a completion failure inside `operation`
    pub fn completion(
      operation: crate::Operation
    , message: impl Into<String>
    ) -> Self
    {   Error::Completion
        {   operation
          , message: message.into()
        }
    }

    /// Status a transport adapter should report for this error.
    /// Validation problems are the caller's to fix, the rest are ours.
    pub fn status_code(&self) -> u16
    {   match self
        {   Error::Validation(_) => 400
          , Error::Completion { .. }
          | Error::Configuration(_) => 500
        }
    }

    pub fn is_validation(&self) -> bool
    {   matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
