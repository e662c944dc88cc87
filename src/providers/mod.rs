//! Completion api clients

use async_trait::async_trait;

use crate::request::ConversationTurn;

pub mod openai;

// Re-export for convenience
pub use openai::OpenAiClient;

/// Everything one completion call needs, independent of the api
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest
{   /// Operation the call serves, used to label failures
    pub operation: crate::Operation
  , pub system_instruction: String
  , /// First user message
    pub user_prompt: String
  , /// Earlier turns sent after `user_prompt`, oldest first
    pub prior_turns: Vec<ConversationTurn>
  , /// Final user message after the prior turns, if any
    pub trailing_prompt: Option<String>
  , /// Output ceiling in tokens
    pub max_tokens: usize
}

impl CompletionRequest
{   pub fn new(
      operation: crate::Operation
    , system_instruction: impl Into<String>
    , user_prompt: impl Into<String>
    , max_tokens: usize
    ) -> Self
    {   CompletionRequest
        {   operation
          , system_instruction: system_instruction.into()
          , user_prompt: user_prompt.into()
          , prior_turns: vec![]
          , trailing_prompt: None
          , max_tokens
        }
    }

    pub fn with_prior_turns(mut self, turns: Vec<ConversationTurn>) -> Self
    {   self.prior_turns = turns;
        self
    }

    pub fn with_trailing_prompt(mut self, prompt: impl Into<String>) -> Self
    {   self.trailing_prompt = Some(prompt.into());
        self
    }
}

/// A single prompt-in, text-out call against a completion api.
///
/// Implementations send exactly one request and never retry. Every
/// failure comes back as `Error::Completion` tagged with the request's
/// operation.
#[async_trait]
pub trait CompletionClient: Send + Sync
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> crate::Result<String>;
}
