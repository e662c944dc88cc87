//! Caller-held explanation session
//!
//! The service never stores sessions. A caller that wants to track one
//! selection through its explanation, refinements and follow-ups keeps
//! an `ExplanationSession` and builds each request from it.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::request::{
  ConversationTurn, Explanation, ExplanationRequest, FollowupRequest,
  RefinementRequest,
};
use crate::{Error, ExplanationType, RefinementType, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState
{   /// Nothing explained yet
    Initial
  , /// Holds the latest explanation or refinement
    Explained
    {   current: Explanation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationSession
{   selected_text: String
  , document_context: String
  , citation_texts: Vec<String>
  , state: SessionState
  , /// Follow-up questions and answers, oldest first
    followups: Vec<ConversationTurn>
}

impl ExplanationSession
{   pub fn new(
      selected_text: impl Into<String>
    , document_context: impl Into<String>
    , citation_texts: Vec<String>
    ) -> Self
    {   ExplanationSession
        {   selected_text: selected_text.into()
          , document_context: document_context.into()
          , citation_texts
          , state: SessionState::Initial
          , followups: vec![]
        }
    }

    /// Start a session from a prepared request
    pub fn from_request(request: &ExplanationRequest) -> Self
    {   ExplanationSession::new(
          request.selected_text.clone(),
          request.document_context.clone(),
          request.citation_texts.clone()
        )
    }

    pub fn state(&self) -> &SessionState
    {   &self.state
    }

    pub fn selected_text(&self) -> &str
    {   &self.selected_text
    }

    pub fn current_explanation(&self) -> Option<&str>
    {   match &self.state
        {   SessionState::Initial => None
          , SessionState::Explained { current } => Some(&current.text)
        }
    }

    pub fn followups(&self) -> &[ConversationTurn]
    {   &self.followups
    }

    pub fn explanation_request(&self, kind: ExplanationType) -> ExplanationRequest
    {   ExplanationRequest
        {   selected_text: self.selected_text.clone()
          , document_context: self.document_context.clone()
          , citation_texts: self.citation_texts.clone()
          , explanation_type: kind
        }
    }

    /// Initial or Explained -> Explained. A fresh explanation starts a
    /// fresh conversation.
    pub fn record_explanation(&mut self, explanation: Explanation)
    {   debug!("Session explained ({} chars)", explanation.text.len());
        self.followups.clear();
        self.state = SessionState::Explained { current: explanation };
    }

    pub fn refinement_request(&self, kind: RefinementType) -> Result<RefinementRequest>
    {   let current = self.require_explained("refine")?;
        Ok(RefinementRequest
        {   selected_text: self.selected_text.clone()
          , current_explanation: current.text.clone()
          , refinement_type: kind
          , document_context: self.document_context.clone()
          , citation_texts: self.citation_texts.clone()
        })
    }

    /// Explained -> Explained with the refined text as current
    pub fn record_refinement(&mut self, refined: Explanation) -> Result<()>
    {   self.require_explained("refine")?;
        debug!("Session refined ({} chars)", refined.text.len());
        self.state = SessionState::Explained { current: refined };
        Ok(())
    }

    /// The conversation sent along starts with the current explanation
    /// as the assistant's first turn, then the recorded follow-ups.
    pub fn followup_request(&self, question: impl Into<String>) -> Result<FollowupRequest>
    {   let current = self.require_explained("ask a follow-up")?;
        let mut history = Vec::with_capacity(self.followups.len() + 1);
        history.push(ConversationTurn::assistant(current.text.clone()));
        history.extend(self.followups.iter().cloned());

        Ok(FollowupRequest
        {   original_text: self.selected_text.clone()
          , question: question.into()
          , conversation_history: history
          , document_context: self.document_context.clone()
          , citation_texts: self.citation_texts.clone()
        })
    }

    /// Explained -> Explained; the current explanation is untouched
    pub fn record_followup(
      &mut self
    , question: impl Into<String>
    , answer: impl Into<String>
    ) -> Result<()>
    {   self.require_explained("ask a follow-up")?;
        self.followups.push(ConversationTurn::user(question));
        self.followups.push(ConversationTurn::assistant(answer));
        Ok(())
    }

    fn require_explained(&self, action: &str) -> Result<&Explanation>
    {   match &self.state
        {   SessionState::Explained { current } => Ok(current)
          , SessionState::Initial => Err(Error::validation(format!(
              "Cannot {action} before the selection has been explained"
            )))
        }
    }
}
