//! Request, result and envelope types for explanation operations

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Validated input for a first explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest
{   /// The highlighted text
    pub selected_text: String
  , /// Surrounding document text
    pub document_context: String
  , /// Reference texts the selection cites, in citation order
    #[serde(default)]
    pub citation_texts: Vec<String>
  , #[serde(default)]
    pub explanation_type: crate::ExplanationType
}

impl ExplanationRequest
{   /// Build a request for a selection from the whole page text.
    ///
    /// The context is a window around the selection, the type is
    /// guessed from its length and the citation texts are the document's
    /// references that the selection's markers point at.
    pub fn from_document(document_text: &str, selected_text: &str) -> Self
    {   use crate::references::{
          detect_text_type, extract_citation_numbers, extract_references,
          extract_surrounding_context, find_matching_references,
          DEFAULT_CONTEXT_SIZE,
        };

        let references: Vec<String> = extract_references(document_text)
          .into_iter()
          .map(|r| r.raw_text)
          .collect();
        let markers = extract_citation_numbers(selected_text);

        ExplanationRequest
        {   selected_text: selected_text.to_string()
          , document_context: extract_surrounding_context(
              document_text,
              selected_text,
              DEFAULT_CONTEXT_SIZE
            )
          , citation_texts: find_matching_references(&markers, &references)
          , explanation_type: detect_text_type(selected_text).into()
        }
    }
}

/// Validated input for rewriting the current explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementRequest
{   pub selected_text: String
  , /// Most recent explanation the caller holds for `selected_text`
    pub current_explanation: String
  , #[serde(default)]
    pub refinement_type: crate::RefinementType
  , #[serde(default)]
    pub document_context: String
  , #[serde(default)]
    pub citation_texts: Vec<String>
}

/// One prior message in a follow-up conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn
{   pub role: crate::Role
  , pub content: String
}

impl ConversationTurn
{   pub fn user(content: impl Into<String>) -> Self
    {   ConversationTurn
        {   role: crate::Role::User
          , content: content.into()
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   ConversationTurn
        {   role: crate::Role::Assistant
          , content: content.into()
        }
    }
}

/// Validated input for a follow-up question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupRequest
{   /// The selection the conversation is about
    pub original_text: String
  , pub question: String
  , /// Prior turns, oldest first. Never trimmed here.
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>
  , #[serde(default)]
    pub document_context: String
  , #[serde(default)]
    pub citation_texts: Vec<String>
}

/// Which operation produced an explanation, and with which variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplanationKind
{   Explanation(crate::ExplanationType)
  , Refinement(crate::RefinementType)
}

/// Result of generate or refine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation
{   pub text: String
  , pub kind: ExplanationKind
  , /// Citation texts that were rendered into the prompt
    pub citations_used: Vec<String>
}

/// Transport-independent reply: a status hint plus the json body.
///
/// Bodies are `{"success": true, ...}` or
/// `{"success": false, "error": "<message>"}`, never a mix.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply
{   pub status: u16
  , pub body: Value
}

impl Reply
{   pub fn explained(explanation: &Explanation) -> Self
    {   let body = match explanation.kind
        {   ExplanationKind::Explanation(kind) => json!({
              "success": true,
              "explanation": explanation.text,
              "explanationType": kind,
            })
          , ExplanationKind::Refinement(kind) => json!({
              "success": true,
              "explanation": explanation.text,
              "refinementType": kind,
            })
        };
        Reply { status: 200, body }
    }

    pub fn answered(response: &str) -> Self
    {   Reply
        {   status: 200
          , body: json!({ "success": true, "response": response })
        }
    }

    pub fn references(references: &[String]) -> Self
    {   Reply
        {   status: 200
          , body: json!({ "success": true, "references": references })
        }
    }

    pub fn failure(err: &crate::Error) -> Self
    {   Reply
        {   status: err.status_code()
          , body: json!({ "success": false, "error": err.to_string() })
        }
    }

    pub fn is_success(&self) -> bool
    {   self.body
          .get("success")
          .and_then(Value::as_bool)
          .unwrap_or(false)
    }
}
