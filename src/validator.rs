//! Boundary checks for inbound operation payloads
//!
//! Payloads arrive as untyped json so that presence and type can be
//! checked before anything is built from them. Every operation goes
//! through the same gate; the first violation is reported as a single
//! sentence and nothing downstream runs.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::request::{
  ConversationTurn, ExplanationRequest, FollowupRequest, RefinementRequest,
};
use crate::{Error, ExplanationType, RefinementType, Result, Role};

pub const MAX_SELECTED_TEXT_CHARS: usize = 5000;
pub const MAX_DOCUMENT_CONTEXT_CHARS: usize = 50000;
pub const MAX_QUESTION_CHARS: usize = 5000;

fn reject<T>(reason: &str) -> Result<T>
{   warn!("Validation failed: {}", reason);
    Err(Error::validation(reason))
}

fn body(payload: &Value) -> Result<&Map<String, Value>>
{   match payload.as_object()
    {   Some(map) if !map.is_empty() => Ok(map)
      , _ => reject("Request body is empty")
    }
}

fn char_len(text: &str) -> usize
{   text.chars().count()
}

fn describe_size(value: Option<&Value>) -> String
{   match value
    {   Some(Value::String(s)) => char_len(s).to_string()
      , Some(Value::Array(a)) => a.len().to_string()
      , Some(_) => "not a string".to_string()
      , None => "missing".to_string()
    }
}

/// Required, non-blank text no longer than `max` characters
fn subject_text(
  map: &Map<String, Value>
, field: &str
, label: &str
, max: usize
) -> Result<String>
{   let text = match map.get(field)
    {   None | Some(Value::Null) => {
          return reject(&format!("{label} is required"));
        }
      , Some(Value::String(s)) if s.is_empty() => {
          return reject(&format!("{label} is required"));
        }
      , Some(Value::String(s)) => s
      , Some(_) => return reject(&format!("{label} must be a string"))
    };

    check_text(text, label, max)?;
    Ok(text.clone())
}

fn check_text(text: &str, label: &str, max: usize) -> Result<()>
{   if text.trim().is_empty()
    {   return reject(&format!("{label} cannot be empty"));
    }
    if char_len(text) > max
    {   return reject(&format!("{label} is too long (max {max} characters)"));
    }
    Ok(())
}

fn check_context(context: &str) -> Result<()>
{   if char_len(context) > MAX_DOCUMENT_CONTEXT_CHARS
    {   return reject("Document context is too long (max 50000 characters)");
    }
    Ok(())
}

fn document_context(map: &Map<String, Value>, required: bool) -> Result<String>
{   let context = match map.get("documentContext")
    {   None | Some(Value::Null) if required => {
          return reject("Document context is required");
        }
      , None | Some(Value::Null) => String::new()
      , Some(Value::String(s)) => s.clone()
      , Some(_) => return reject("Document context must be a string")
    };

    check_context(&context)?;
    Ok(context)
}

fn citation_texts(map: &Map<String, Value>) -> Result<Vec<String>>
{   match map.get("citationTexts")
    {   None | Some(Value::Null) => Ok(vec![])
      , Some(Value::Array(items)) => {
          items
            .iter()
            .map(|item| match item
            {   Value::String(s) => Ok(s.clone())
              , _ => reject("All citation texts must be strings")
            })
            .collect()
        }
      , Some(_) => reject("Citation texts must be an array")
    }
}

/// Optional string field; any other json type is rejected
fn optional_name<'a>(
  map: &'a Map<String, Value>
, fields: &[&str]
, label: &str
) -> Result<Option<&'a str>>
{   for field in fields
    {   match map.get(*field)
        {   None | Some(Value::Null) => continue
          , Some(Value::String(s)) => return Ok(Some(s.as_str()))
          , Some(_) => return reject(&format!("{label} must be a string"))
        }
    }
    Ok(None)
}

fn conversation_history(map: &Map<String, Value>) -> Result<Vec<ConversationTurn>>
{   let items = match map.get("conversationHistory")
    {   None | Some(Value::Null) => return Ok(vec![])
      , Some(Value::Array(items)) => items
      , Some(_) => return reject("Conversation history must be an array")
    };

    items
      .iter()
      .map(|item| {
        let role = item
          .get("role")
          .and_then(Value::as_str)
          .and_then(Role::parse);
        let content = item.get("content").and_then(Value::as_str);
        match (role, content)
        {   (Some(role), Some(content)) => Ok(ConversationTurn
            {   role
              , content: content.to_string()
            })
          , (None, _) => reject(
              "Each conversation turn needs a role of user or assistant"
            )
          , (_, None) => reject(
              "Each conversation turn needs string content"
            )
        }
      })
      .collect()
}

/// Gate for `generate`
pub fn validate_generate(payload: &Value) -> Result<ExplanationRequest>
{   let map = body(payload)?;
    debug!(
      "generate payload sizes: selectedText={}, documentContext={}, citationTexts={}",
      describe_size(map.get("selectedText")),
      describe_size(map.get("documentContext")),
      describe_size(map.get("citationTexts"))
    );

    let selected_text = subject_text(
      map, "selectedText", "Selected text", MAX_SELECTED_TEXT_CHARS
    )?;
    let document_context = document_context(map, true)?;
    let citation_texts = citation_texts(map)?;
    let explanation_type = optional_name(
        map, &["explanationType", "type"], "Explanation type"
      )?
      .map(ExplanationType::parse)
      .unwrap_or_default();

    debug!("generate request validated");
    Ok(ExplanationRequest
    {   selected_text
      , document_context
      , citation_texts
      , explanation_type
    })
}

/// Gate for `refine`
pub fn validate_refine(payload: &Value) -> Result<RefinementRequest>
{   let map = body(payload)?;
    debug!(
      "refine payload sizes: selectedText={}, currentExplanation={}, documentContext={}",
      describe_size(map.get("selectedText")),
      describe_size(map.get("currentExplanation")),
      describe_size(map.get("documentContext"))
    );

    let selected_text = subject_text(
      map, "selectedText", "Selected text", MAX_SELECTED_TEXT_CHARS
    )?;
    let current_explanation = subject_text(
      map, "currentExplanation", "Current explanation", usize::MAX
    )?;
    let document_context = document_context(map, false)?;
    let citation_texts = citation_texts(map)?;
    let refinement_type = optional_name(
        map, &["refinementType"], "Refinement type"
      )?
      .map(RefinementType::parse)
      .unwrap_or_default();

    debug!("refine request validated");
    Ok(RefinementRequest
    {   selected_text
      , current_explanation
      , refinement_type
      , document_context
      , citation_texts
    })
}

/// Gate for `followup`
pub fn validate_followup(payload: &Value) -> Result<FollowupRequest>
{   let map = body(payload)?;
    debug!(
      "followup payload sizes: originalText={}, question={}, conversationHistory={}",
      describe_size(map.get("originalText")),
      describe_size(map.get("question")),
      describe_size(map.get("conversationHistory"))
    );

    let original_text = subject_text(
      map, "originalText", "Original text", MAX_SELECTED_TEXT_CHARS
    )?;
    let question = subject_text(
      map, "question", "Question", MAX_QUESTION_CHARS
    )?;
    let conversation_history = conversation_history(map)?;
    let document_context = document_context(map, false)?;
    let citation_texts = citation_texts(map)?;

    debug!("followup request validated");
    Ok(FollowupRequest
    {   original_text
      , question
      , conversation_history
      , document_context
      , citation_texts
    })
}

// ===== typed requests =====
//
// Requests built in code rather than parsed from json still pass the
// same bounds before any prompt is built.

pub fn check_explanation(request: &ExplanationRequest) -> Result<()>
{   check_text(&request.selected_text, "Selected text", MAX_SELECTED_TEXT_CHARS)?;
    check_context(&request.document_context)
}

pub fn check_refinement(request: &RefinementRequest) -> Result<()>
{   check_text(&request.selected_text, "Selected text", MAX_SELECTED_TEXT_CHARS)?;
    check_text(&request.current_explanation, "Current explanation", usize::MAX)?;
    check_context(&request.document_context)
}

pub fn check_followup(request: &FollowupRequest) -> Result<()>
{   check_text(&request.original_text, "Original text", MAX_SELECTED_TEXT_CHARS)?;
    check_text(&request.question, "Question", MAX_QUESTION_CHARS)?;
    check_context(&request.document_context)
}
