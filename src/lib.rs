pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod prompts;
pub mod references;
pub mod validator;
pub mod service;
pub mod session;

use serde::{Deserialize, Serialize};
use std::fmt;

/*

marginalia is the backend core of a reading assistant: the user
highlights text on a page, the browser side sends it here together
with the surrounding document, and we ask a completion api for an
explanation. the user can then refine that explanation or ask
follow-up questions about it.

the server keeps no session. whoever calls us holds the current
explanation and the conversation, and sends all of it on every call.

marginalia/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Shared enums and re-exports
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Completion api configuration
│   ├── request.rs      # Request, result and envelope types
│   ├── validator.rs    # Boundary checks on raw json payloads
│   ├── prompts.rs      # Prompt, persona and budget per operation
│   ├── references.rs   # Bibliography and citation marker parsing
│   ├── service.rs      # generate / refine / followup orchestration
│   ├── session.rs      # Caller-held explanation session
│   └── providers/      # Completion api clients
│       ├── mod.rs      # CompletionClient seam
│       └── openai.rs   # OpenAI compatible chat completions
└── tests/

*/

pub use error::{Error, Result};
pub use config::{AssistantConfig, CompletionConfig};
pub use providers::{CompletionClient, CompletionRequest};
pub use providers::openai::OpenAiClient;
pub use request::{
  ConversationTurn, Explanation, ExplanationRequest, FollowupRequest,
  RefinementRequest, Reply,
};
pub use references::{CitationMarkers, Reference, TextType};
pub use service::ExplanationService;
pub use session::{ExplanationSession, SessionState};

/// MARGINALIA STRUCTURES:

/// One call-response unit exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation
{   /// First explanation of a selection
    Generate
  , /// Rewrite of the current explanation
    Refine
  , /// Question about the current explanation
    Followup
  , /// Bibliography extraction from a whole document
    ExtractReferences
}

impl Operation
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Operation::Generate => "generate"
          , Operation::Refine => "refine"
          , Operation::Followup => "followup"
          , Operation::ExtractReferences => "extractReferences"
        }
    }
}

impl fmt::Display for Operation
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Flavour of a first explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationType
{   /// Anything we could not classify
    #[default]
    General
  , /// A term or short phrase
    Definition
  , /// A sentence-sized idea
    Concept
  , /// A whole passage, possibly with citations
    Paragraph
}

impl ExplanationType
{   /// Unknown names fall back to `General`.
    pub fn parse(name: &str) -> Self
    {   match name
        {   "definition" => ExplanationType::Definition
          , "concept" => ExplanationType::Concept
          , "paragraph" => ExplanationType::Paragraph
          , _ => ExplanationType::General
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   ExplanationType::General => "general"
          , ExplanationType::Definition => "definition"
          , ExplanationType::Concept => "concept"
          , ExplanationType::Paragraph => "paragraph"
        }
    }
}

impl fmt::Display for ExplanationType
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// How to rewrite an existing explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefinementType
{   #[default]
    Simpler
  , Detailed
  , Summarize
}

impl RefinementType
{   /// Unknown names fall back to `Simpler`.
    pub fn parse(name: &str) -> Self
    {   match name
        {   "detailed" => RefinementType::Detailed
          , "summarize" => RefinementType::Summarize
          , _ => RefinementType::Simpler
        }
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   RefinementType::Simpler => "simpler"
          , RefinementType::Detailed => "detailed"
          , RefinementType::Summarize => "summarize"
        }
    }
}

impl fmt::Display for RefinementType
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// Speaker of a conversation turn.
/// The sidebar labels model turns "explanation"; we accept that on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   User
  , #[serde(alias = "explanation")]
    Assistant
}

impl Role
{   /// Parse a wire label, `None` when it is not a known speaker
    pub fn parse(label: &str) -> Option<Self>
    {   match label
        {   "user" => Some(Role::User)
          , "assistant" | "explanation" => Some(Role::Assistant)
          , _ => None
        }
    }

    /// Role name the chat completion api expects
    pub fn api_role(&self) -> &'static str
    {   match self
        {   Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}
