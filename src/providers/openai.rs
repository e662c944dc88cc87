use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

use super::{CompletionClient, CompletionRequest};
use crate::config::CompletionConfig;

// ===== Message Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

impl ChatMessage
{   fn new(role: &str, content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: role.to_string()
          , content: content.into()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: usize
  , pub temperature: f32
  , pub stream: bool
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

/// Message list in wire order: system, framing prompt, prior turns
/// oldest first, then the trailing prompt.
pub fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage>
{   let mut messages = Vec::with_capacity(request.prior_turns.len() + 3);
    messages.push(ChatMessage::new("system", request.system_instruction.clone()));
    messages.push(ChatMessage::new("user", request.user_prompt.clone()));
    for turn in &request.prior_turns
    {   messages.push(ChatMessage::new(turn.role.api_role(), turn.content.clone()));
    }
    if let Some(trailing) = &request.trailing_prompt
    {   messages.push(ChatMessage::new("user", trailing.clone()));
    }
    messages
}

/// Pull `error.message` out of an api error body, else the trimmed body
fn api_error_message(body: &str) -> String
{   let trimmed = body.trim();
    if trimmed.is_empty()
    {   return "<empty body>".to_string();
    }

    serde_json::from_str::<serde_json::Value>(trimmed)
      .ok()
      .and_then(|json| {
        json.pointer("/error/message")
          .and_then(|m| m.as_str())
          .map(str::to_string)
      })
      .unwrap_or_else(|| trimmed.to_string())
}

// ===== OpenAI Client =====

/// Client for an OpenAI compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_key: String
  , api_base: String
  , model: String
  , temperature: f32
  , http_client: reqwest::Client
}

impl OpenAiClient
{   /// Build a client. A blank api key is a configuration error.
    pub fn new(config: &CompletionConfig) -> crate::Result<Self>
    {   debug!("Creating OpenAiClient for model: {}", config.model);
        if config.api_key.trim().is_empty()
        {   error!("OpenAI api key is missing");
            return Err(crate::Error::Configuration(
              "OpenAI api key is required".to_string()
            ));
        }

        Ok(OpenAiClient
        {   api_key: config.api_key.clone()
          , api_base: config.api_base.trim_end_matches('/').to_string()
          , model: config.model.clone()
          , temperature: config.temperature
          , http_client: reqwest::Client::new()
        })
    }

    pub fn model(&self) -> &str
    {   &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> crate::Result<String>
    {   let operation = request.operation;
        debug!(
          "Sending {} request to {} ({} prior turns)",
          operation, self.model, request.prior_turns.len()
        );

        let body = ChatRequest
        {   model: self.model.clone()
          , messages: build_messages(request)
          , max_tokens: request.max_tokens
          , temperature: self.temperature
          , stream: false
        };

        trace!("Chat request: {:?}", body);

        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .json(&body)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error during {}: {}", operation, e);
            crate::Error::completion(operation, format!("HTTP error: {}", e))
          })?;

        let status = response.status();
        trace!("Chat response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            let message = api_error_message(&error_text);
            error!("Completion api error ({}): {}", status, message);
            return Err(crate::Error::completion(
              operation,
              format!("API error ({}): {}", status.as_u16(), message)
            ));
        }

        let chat_response: ChatResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::Error::completion(operation, format!("Parse error: {}", e))
          })?;

        let choice = chat_response.choices.into_iter().next()
          .ok_or_else(|| {
            error!("No choices in response");
            crate::Error::completion(
              operation,
              "API response contained no choices"
            )
          })?;

        trace!("Finish reason: {:?}", choice.finish_reason);

        choice.message.content
          .filter(|text| !text.trim().is_empty())
          .ok_or_else(|| {
            error!("Empty completion for {}", operation);
            crate::Error::completion(
              operation,
              "API response contained no text"
            )
          })
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::ConversationTurn;
    use crate::Operation;

    #[test]
    fn messages_relabel_roles_and_keep_order()
    {   let request = CompletionRequest::new(
          Operation::Followup, "persona", "framing", 100
        )
        .with_prior_turns(vec![
          ConversationTurn::user("q1")
        , ConversationTurn::assistant("a1")
        ])
        .with_trailing_prompt("q2");

        let messages = build_messages(&request);
        let pairs: Vec<(&str, &str)> = messages
          .iter()
          .map(|m| (m.role.as_str(), m.content.as_str()))
          .collect();
        assert_eq!(pairs, vec![
          ("system", "persona")
        , ("user", "framing")
        , ("user", "q1")
        , ("assistant", "a1")
        , ("user", "q2")
        ]);
    }

    #[test]
    fn explanation_role_from_the_sidebar_becomes_assistant()
    {   let turn: ConversationTurn = serde_json::from_str(
          r#"{"role":"explanation","content":"An answer."}"#
        ).unwrap();
        let request = CompletionRequest::new(Operation::Followup, "s", "u", 10)
          .with_prior_turns(vec![turn]);
        assert_eq!(build_messages(&request)[2].role, "assistant");
    }

    #[test]
    fn api_error_message_prefers_json_message()
    {   assert_eq!(
          api_error_message(r#"{"error":{"message":"quota exceeded"}}"#),
          "quota exceeded"
        );
        assert_eq!(api_error_message("  bad gateway "), "bad gateway");
        assert_eq!(api_error_message(""), "<empty body>");
    }

    #[test]
    fn blank_key_is_a_configuration_error()
    {   let err = OpenAiClient::new(&CompletionConfig::new("  ")).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }
}
