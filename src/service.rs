use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, trace};
use serde_json::Value;

use crate::prompts;
use crate::providers::{CompletionClient, CompletionRequest};
use crate::references;
use crate::request::{
  Explanation, ExplanationKind, ExplanationRequest, FollowupRequest,
  RefinementRequest, Reply,
};
use crate::validator;
use crate::{Error, Operation, Result};

/// Runs generate / refine / followup against one completion client.
///
/// Holds no per-session state: every call carries everything it needs,
/// so one service can be cloned and shared across concurrent callers.
#[derive(Clone)]
pub struct ExplanationService
{   client: Arc<dyn CompletionClient>
  , timeout: Option<Duration>
}

impl ExplanationService
{   /// Create a service with no timeout
    pub fn new(client: Arc<dyn CompletionClient>) -> Self
    {   debug!("Creating ExplanationService");
        ExplanationService
        {   client
          , timeout: None
        }
    }

    /// Build the service from loaded configuration
    pub fn from_config(
      client: Arc<dyn CompletionClient>
    , config: &crate::config::ServiceConfig
    ) -> Self
    {   let service = ExplanationService::new(client);
        match config.timeout()
        {   Some(limit) => service.with_timeout(limit)
          , None => service
        }
    }

    /// Give up on a completion call after `limit`
    pub fn with_timeout(mut self, limit: Duration) -> Self
    {   self.timeout = Some(limit);
        self
    }

    /// First explanation of a selection
    pub async fn generate(
      &self
    , request: &ExplanationRequest
    ) -> Result<Explanation>
    {   validator::check_explanation(request)?;
        info!(
          "generate/{}: {} chars selected, {} citations",
          request.explanation_type,
          request.selected_text.chars().count(),
          request.citation_texts.len()
        );

        let plan = prompts::explanation_plan(request);
        let text = self.complete(&plan.completion).await?;

        debug!("Generated explanation: {} characters", text.len());
        Ok(Explanation
        {   text
          , kind: ExplanationKind::Explanation(request.explanation_type)
          , citations_used: plan.citations_used
        })
    }

    /// Rewrite the caller's current explanation
    pub async fn refine(
      &self
    , request: &RefinementRequest
    ) -> Result<Explanation>
    {   validator::check_refinement(request)?;
        info!(
          "refine/{}: current explanation {} chars",
          request.refinement_type,
          request.current_explanation.chars().count()
        );

        let plan = prompts::refinement_plan(request);
        let text = self.complete(&plan.completion).await?;

        debug!("Refined explanation: {} characters", text.len());
        Ok(Explanation
        {   text
          , kind: ExplanationKind::Refinement(request.refinement_type)
          , citations_used: plan.citations_used
        })
    }

    /// Answer a question about the current explanation
    pub async fn followup(
      &self
    , request: &FollowupRequest
    ) -> Result<String>
    {   validator::check_followup(request)?;
        info!(
          "followup: {} prior turns",
          request.conversation_history.len()
        );

        let plan = prompts::followup_plan(request);
        let response = self.complete(&plan.completion).await?;

        debug!("Follow-up response: {} characters", response.len());
        Ok(response)
    }

    /// Reference texts of a document, empty when none are found
    pub fn extract_references(&self, document_text: &str) -> Vec<String>
    {   references::extract_references(document_text)
          .into_iter()
          .map(|r| r.raw_text)
          .collect()
    }

    /// Validate a raw payload, run the operation and wrap the outcome.
    ///
    /// Validation failures come back with status 400, everything else
    /// that fails with 500. The body never mixes success and error.
    pub async fn dispatch(
      &self
    , operation: Operation
    , payload: &Value
    ) -> Reply
    {   trace!("dispatch {}", operation);
        let reply = match operation
        {   Operation::Generate => {
              match validator::validate_generate(payload)
              {   Ok(request) => self.generate(&request).await
                    .map(|e| Reply::explained(&e))
                , Err(e) => Err(e)
              }
            }
          , Operation::Refine => {
              match validator::validate_refine(payload)
              {   Ok(request) => self.refine(&request).await
                    .map(|e| Reply::explained(&e))
                , Err(e) => Err(e)
              }
            }
          , Operation::Followup => {
              match validator::validate_followup(payload)
              {   Ok(request) => self.followup(&request).await
                    .map(|r| Reply::answered(&r))
                , Err(e) => Err(e)
              }
            }
          , Operation::ExtractReferences => {
              let document_text = payload
                .get("documentText")
                .and_then(Value::as_str)
                .unwrap_or_else(|| {
                  debug!("No usable documentText, no references");
                  ""
                });
              Ok(Reply::references(&self.extract_references(document_text)))
            }
        };

        reply.unwrap_or_else(|e| {
          error!("Error during {}: {}", operation, e);
          Reply::failure(&e)
        })
    }

    /// One awaited call to the client, bounded by the timeout if set.
    /// Whatever goes wrong comes back as a completion error.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>
    {   let operation = request.operation;
        let call = self.client.complete(request);

        let result = match self.timeout
        {   Some(limit) => match tokio::time::timeout(limit, call).await
            {   Ok(result) => result
              , Err(_) => {
                  error!("{} timed out after {:?}", operation, limit);
                  return Err(Error::completion(
                    operation,
                    format!("request timed out after {:?}", limit)
                  ));
                }
            }
          , None => call.await
        };

        result.map_err(|e| match e
        {   Error::Completion { .. } => e
          , other => Error::completion(operation, other.to_string())
        })
    }
}
