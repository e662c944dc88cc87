//! Configuration for the completion api and the explanation service

use serde::{Deserialize, Serialize};
use log::{debug, error};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Sampling temperature for every call. Not caller-configurable.
pub const TEMPERATURE: f32 = 0.5;

/// Completion api configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig
{   /// Bearer credential for the api
    pub api_key: String
  , /// API base URL, without the trailing /chat/completions
    pub api_base: String
  , /// Model identifier sent with each request
    pub model: String
  , /// Sampling temperature
    pub temperature: f32
}

impl CompletionConfig
{   pub fn new(api_key: impl Into<String>) -> Self
    {   CompletionConfig
        {   api_key: api_key.into()
          , api_base: DEFAULT_API_BASE.to_string()
          , model: DEFAULT_MODEL.to_string()
          , temperature: TEMPERATURE
        }
    }

    /// Point the client at a different OpenAI compatible endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self
    {   self.model = model.into();
        self
    }
}

/// Explanation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig
{   /// Request timeout in seconds, `None` waits forever
    pub timeout_secs: Option<u64>
}

impl Default for ServiceConfig
{   fn default() -> Self
    {   ServiceConfig
        {   timeout_secs: Some(30)
        }
    }
}

impl ServiceConfig
{   pub fn timeout(&self) -> Option<Duration>
    {   self.timeout_secs.map(Duration::from_secs)
    }
}

/// Marginalia configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig
{   pub completion: CompletionConfig
  , pub service: ServiceConfig
}

impl AssistantConfig
{   /// Read configuration from the process environment.
    ///
    /// `OPENAI_API_KEY` is required. `OPENAI_API_BASE`, `OPENAI_MODEL`
    /// and `MARGINALIA_TIMEOUT_SECS` are optional; a timeout of `0`
    /// disables it.
    pub fn from_env() -> crate::Result<Self>
    {   let api_key = env::var("OPENAI_API_KEY")
          .ok()
          .filter(|k| !k.trim().is_empty())
          .ok_or_else(|| {
            error!("OPENAI_API_KEY environment variable is not set");
            crate::Error::Configuration(
              "OPENAI_API_KEY is required".to_string()
            )
          })?;

        let mut completion = CompletionConfig::new(api_key);
        if let Ok(base) = env::var("OPENAI_API_BASE")
        {   completion.api_base = base;
        }
        if let Ok(model) = env::var("OPENAI_MODEL")
        {   completion.model = model;
        }

        let mut service = ServiceConfig::default();
        if let Ok(raw) = env::var("MARGINALIA_TIMEOUT_SECS")
        {   let secs: u64 = raw.trim().parse().map_err(|_| {
              error!("Bad MARGINALIA_TIMEOUT_SECS: {}", raw);
              crate::Error::Configuration(format!(
                "MARGINALIA_TIMEOUT_SECS must be a whole number, got {:?}",
                raw
              ))
            })?;
            service.timeout_secs = (secs > 0).then_some(secs);
        }

        debug!(
          "Loaded config: model={}, base={}, timeout={:?}",
          completion.model, completion.api_base, service.timeout_secs
        );
        Ok(AssistantConfig
        {   completion
          , service
        })
    }
}
