use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use marginalia::providers::{CompletionClient, CompletionRequest};
use marginalia::request::ExplanationKind;
use marginalia::{
  CompletionConfig, Error, ExplanationRequest, ExplanationService,
  ExplanationSession, ExplanationType, OpenAiClient, Operation,
  RefinementType,
};

fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}

/// Answers with the length of the prompt it was given and keeps every
/// request it saw
#[derive(Default)]
struct EchoClient
{   calls: Mutex<Vec<CompletionRequest>>
}

impl EchoClient
{   fn calls(&self) -> Vec<CompletionRequest>
    {   self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for EchoClient
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> marginalia::Result<String>
    {   self.calls.lock().unwrap().push(request.clone());
        Ok(format!("prompt length {}", request.user_prompt.len()))
    }
}

/// Fails like a dropped connection
struct TransportFailure;

#[async_trait]
impl CompletionClient for TransportFailure
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> marginalia::Result<String>
    {   Err(Error::completion(request.operation, "HTTP error: connection reset"))
    }
}

/// Never answers in time
struct Hanging;

#[async_trait]
impl CompletionClient for Hanging
{   async fn complete(
      &self
    , _request: &CompletionRequest
    ) -> marginalia::Result<String>
    {   tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

/// Reports a failure outside the completion taxonomy
struct Misconfigured;

#[async_trait]
impl CompletionClient for Misconfigured
{   async fn complete(
      &self
    , _request: &CompletionRequest
    ) -> marginalia::Result<String>
    {   Err(Error::Configuration("no key".to_string()))
    }
}

fn thermodynamics_text() -> String
{   "The second law of thermodynamics states that the entropy of an \
isolated system never decreases. "
      .repeat(25)
      .chars()
      .take(2000)
      .collect()
}

fn definition_request() -> ExplanationRequest
{   ExplanationRequest
    {   selected_text: "entropy".to_string()
      , document_context: thermodynamics_text()
      , citation_texts: vec![]
      , explanation_type: ExplanationType::Definition
    }
}

#[tokio::test]
async fn test_generate_definition_against_echo_stub()
{   init_logging();
    let client = Arc::new(EchoClient::default());
    let service = ExplanationService::new(client.clone());

    let explanation = assert_ok!(service.generate(&definition_request()).await);
    assert!(explanation.text.starts_with("prompt length "));
    assert_eq!(
      explanation.kind,
      ExplanationKind::Explanation(ExplanationType::Definition)
    );

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, Operation::Generate);
    assert_eq!(calls[0].max_tokens, 150);
    assert!(calls[0].user_prompt.contains("entropy"));
    assert!(!calls[0].user_prompt.contains("Source 1:"));
}

#[tokio::test]
async fn test_generate_transport_failure_names_generate()
{   init_logging();
    let service = ExplanationService::new(Arc::new(TransportFailure));

    let err = assert_err!(service.generate(&definition_request()).await);
    assert!(matches!(
      err,
      Error::Completion { operation: Operation::Generate, .. }
    ));
    assert!(err.to_string().contains("generate"));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_whitespace_selection_never_reaches_the_client()
{   init_logging();
    let client = Arc::new(EchoClient::default());
    let service = ExplanationService::new(client.clone());

    let reply = service
      .dispatch(
        Operation::Generate,
        &json!({ "selectedText": "   ", "documentContext": "x" })
      )
      .await;
    assert_eq!(reply.status, 400);
    assert_eq!(
      reply.body,
      json!({ "success": false, "error": "Selected text cannot be empty" })
    );

    let mut typed = definition_request();
    typed.selected_text = "   ".to_string();
    let err = assert_err!(service.generate(&typed).await);
    assert!(err.is_validation());

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_refine_and_followup_are_validated_too()
{   init_logging();
    let client = Arc::new(EchoClient::default());
    let service = ExplanationService::new(client.clone());

    let reply = service
      .dispatch(Operation::Refine, &json!({ "selectedText": "entropy" }))
      .await;
    assert_eq!(reply.status, 400);
    assert!(!reply.is_success());

    let reply = service
      .dispatch(
        Operation::Followup,
        &json!({ "originalText": "entropy", "question": "  " })
      )
      .await;
    assert_eq!(reply.status, 400);

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_refinement_uses_simpler_template()
{   init_logging();
    let client = Arc::new(EchoClient::default());
    let service = ExplanationService::new(client.clone());

    let payload = |kind: &str| json!({
      "selectedText": "entropy",
      "currentExplanation": "A measure of disorder.",
      "refinementType": kind,
      "documentContext": thermodynamics_text()
    });

    let unknown = service.dispatch(Operation::Refine, &payload("unknown-value")).await;
    let simpler = service.dispatch(Operation::Refine, &payload("simpler")).await;
    assert_eq!(unknown.body["refinementType"], "simpler");
    assert_eq!(unknown, simpler);

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(calls[0].max_tokens, 300);
}

#[tokio::test]
async fn test_dispatch_envelopes()
{   init_logging();
    let service = ExplanationService::new(Arc::new(EchoClient::default()));

    let reply = service
      .dispatch(
        Operation::Generate,
        &json!({
          "selectedText": "Prior work [1] shows this.",
          "documentContext": "ctx",
          "citationTexts": ["Smith, J. (2020). A Title. Journal."],
          "explanationType": "paragraph"
        })
      )
      .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["explanationType"], "paragraph");
    assert!(reply.body["explanation"].is_string());
    assert!(reply.body.get("error").is_none());

    let reply = service
      .dispatch(
        Operation::Followup,
        &json!({
          "originalText": "entropy",
          "question": "Why does it increase?",
          "conversationHistory": [{ "role": "explanation", "content": "Disorder." }]
        })
      )
      .await;
    assert_eq!(reply.status, 200);
    assert!(reply.body["response"].is_string());

    let failing = ExplanationService::new(Arc::new(TransportFailure));
    let reply = failing
      .dispatch(
        Operation::Followup,
        &json!({ "originalText": "entropy", "question": "Why?" })
      )
      .await;
    assert_eq!(reply.status, 500);
    assert_eq!(
      reply.body,
      json!({
        "success": false,
        "error": "followup failed: HTTP error: connection reset"
      })
    );
}

#[tokio::test]
async fn test_extract_references_envelope()
{   init_logging();
    let service = ExplanationService::new(Arc::new(EchoClient::default()));

    let document = "Body text.\nReferences\n\
[1] Smith, J. (2020). A Title. Journal.\n\
[2] Doe, A. (2019). Another Title. Journal.";
    let reply = service
      .dispatch(Operation::ExtractReferences, &json!({ "documentText": document }))
      .await;
    assert_eq!(reply.status, 200);
    assert_eq!(
      reply.body["references"],
      json!([
        "Smith, J. (2020). A Title. Journal.",
        "Doe, A. (2019). Another Title. Journal."
      ])
    );

    let reply = service
      .dispatch(Operation::ExtractReferences, &json!({ "documentText": 42 }))
      .await;
    assert_eq!(reply.body, json!({ "success": true, "references": [] }));
}

#[tokio::test]
async fn test_timeout_becomes_completion_error()
{   init_logging();
    let service = ExplanationService::new(Arc::new(Hanging))
      .with_timeout(Duration::from_millis(20));

    let err = assert_err!(service.generate(&definition_request()).await);
    match err
    {   Error::Completion { operation, message } => {
          assert_eq!(operation, Operation::Generate);
          assert!(message.contains("timed out"));
        }
      , other => panic!("unexpected error: {other:?}")
    }
}

#[tokio::test]
async fn test_foreign_client_errors_are_normalized()
{   init_logging();
    let service = ExplanationService::new(Arc::new(Misconfigured));
    let mut session = ExplanationSession::new("entropy", "ctx", vec![]);
    session.record_explanation(marginalia::Explanation
    {   text: "Disorder.".to_string()
      , kind: ExplanationKind::Explanation(ExplanationType::General)
      , citations_used: vec![]
    });

    let request = session.followup_request("Why?").unwrap();
    let err = assert_err!(service.followup(&request).await);
    assert!(matches!(
      err,
      Error::Completion { operation: Operation::Followup, .. }
    ));
}

#[tokio::test]
async fn test_session_walkthrough()
{   init_logging();
    let client = Arc::new(EchoClient::default());
    let service = ExplanationService::new(client.clone());

    let document = format!(
      "{} The entropy term [1] matters.\nReferences\n\
[1] Clausius, R. (1865). On the moving force of heat.",
      thermodynamics_text()
    );
    let request = ExplanationRequest::from_document(
      &document,
      "The entropy term [1] matters."
    );
    assert_eq!(request.explanation_type, ExplanationType::Concept);
    assert_eq!(
      request.citation_texts,
      vec!["Clausius, R. (1865). On the moving force of heat."]
    );

    let mut session = ExplanationSession::from_request(&request);
    let explanation = service.generate(&request).await.unwrap();
    session.record_explanation(explanation);

    let refine = session.refinement_request(RefinementType::Detailed).unwrap();
    let refined = service.refine(&refine).await.unwrap();
    assert_eq!(refined.citations_used.len(), 1);
    session.record_refinement(refined.clone()).unwrap();
    assert_eq!(session.current_explanation(), Some(refined.text.as_str()));

    let followup = session.followup_request("Who introduced it?").unwrap();
    let answer = service.followup(&followup).await.unwrap();
    session.record_followup("Who introduced it?", answer).unwrap();
    assert_eq!(session.current_explanation(), Some(refined.text.as_str()));

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    let last = &calls[2];
    assert_eq!(last.prior_turns.len(), 1);
    assert_eq!(last.trailing_prompt.as_deref(), Some("Who introduced it?"));
}

#[tokio::test]
async fn test_openai_client_connection_refused()
{   init_logging();
    let config = CompletionConfig::new("sk-test")
      .with_api_base("http://127.0.0.1:9/v1");
    let client = OpenAiClient::new(&config).unwrap();
    let service = ExplanationService::new(Arc::new(client))
      .with_timeout(Duration::from_secs(10));

    let err = assert_err!(service.generate(&definition_request()).await);
    assert!(matches!(
      err,
      Error::Completion { operation: Operation::Generate, .. }
    ));
}

#[tokio::test]
#[ignore]
async fn test_openai_generate_live()
{   init_logging();
    let config = match marginalia::AssistantConfig::from_env()
    {   Ok(config) => config
      , Err(e) => {
          println!("Skipping: {}", e);
          return;
        }
    };

    let client = OpenAiClient::new(&config.completion).unwrap();
    let service = ExplanationService::from_config(
      Arc::new(client),
      &config.service
    );

    match service.generate(&definition_request()).await
    {   Ok(explanation) => {
          println!("Explanation: {}", explanation.text);
          assert!(!explanation.text.is_empty());
        }
      , Err(e) => {
          println!("API Error: {}", e);
        }
    }
}
