//! Prompt construction for every (operation, variant) pair
//!
//! Everything here is pure. Each builder picks a user prompt, a system
//! persona and an output budget; the selection is an exhaustive match, so
//! every variant maps to exactly one triple.

use log::trace;

use crate::providers::CompletionRequest;
use crate::request::{ExplanationRequest, FollowupRequest, RefinementRequest};
use crate::{ExplanationType, Operation, RefinementType};

/// Persona for first explanations
pub const GENERATE_SYSTEM_PROMPT: &str = "You are a helpful research assistant \
specialized in explaining complex academic concepts. Use academic language but \
prioritize brevity and clarity. Keep explanations concise, direct, and \
to-the-point. Avoid unnecessary elaboration and focus on the most essential \
information. When citations are provided, incorporate them efficiently.";

/// Persona for rewriting an explanation the reader already has
pub const REFINE_SYSTEM_PROMPT: &str = "You are a helpful research assistant \
revising an explanation you gave a reader of an academic paper. Rewrite it as \
asked while staying faithful to the original text and its context. Do not \
introduce claims the paper does not support.";

/// Persona for conversational follow-up
pub const FOLLOWUP_SYSTEM_PROMPT: &str = "You are a helpful research assistant \
in a conversation with a reader about a passage from an academic paper. Answer \
their follow-up questions directly and concisely, building on what has already \
been said. If the paper does not answer the question, say so.";

pub const FOLLOWUP_CONTEXT_CEILING: usize = 1000;
pub const FOLLOWUP_MAX_TOKENS: usize = 400;

/// Context ceiling in characters and output budget in tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget
{   pub context_ceiling: usize
  , pub max_tokens: usize
}

pub fn explanation_budget(kind: ExplanationType) -> Budget
{   let (context_ceiling, max_tokens) = match kind
    {   ExplanationType::General => (1500, 350)
      , ExplanationType::Definition => (1000, 150)
      , ExplanationType::Paragraph => (1000, 400)
      , ExplanationType::Concept => (1500, 250)
    };
    Budget { context_ceiling, max_tokens }
}

pub fn refinement_budget(kind: RefinementType) -> Budget
{   let (context_ceiling, max_tokens) = match kind
    {   RefinementType::Simpler => (800, 300)
      , RefinementType::Detailed => (1000, 500)
      , RefinementType::Summarize => (600, 200)
    };
    Budget { context_ceiling, max_tokens }
}

/// A completion request ready to send, plus what went into it
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan
{   pub completion: CompletionRequest
  , /// Citation texts rendered into the prompt, in order
    pub citations_used: Vec<String>
}

/// First `ceiling` characters of `text`. Never splits a character.
pub fn truncate_chars(text: &str, ceiling: usize) -> &str
{   match text.char_indices().nth(ceiling)
    {   Some((end, _)) => &text[..end]
      , None => text
    }
}

/// Numbered `Source n: ...` lines in the given order
pub fn citation_block(citations: &[String]) -> String
{   citations
      .iter()
      .enumerate()
      .map(|(i, text)| format!("Source {}: {}", i + 1, text))
      .collect::<Vec<_>>()
      .join("\n")
}

// ===== generate =====

pub fn explanation_plan(request: &ExplanationRequest) -> PromptPlan
{   let budget = explanation_budget(request.explanation_type);
    let context = truncate_chars(
      &request.document_context,
      budget.context_ceiling
    );
    let text = &request.selected_text;

    let (user_prompt, citations_used) = match request.explanation_type
    {   ExplanationType::General => (general_prompt(text, context), vec![])
      , ExplanationType::Definition => (definition_prompt(text, context), vec![])
      , ExplanationType::Concept => (concept_prompt(text, context), vec![])
      , ExplanationType::Paragraph => (
          paragraph_prompt(text, context, &request.citation_texts)
        , request.citation_texts.clone()
        )
    };

    trace!(
      "generate/{} prompt: {} chars, {} citations",
      request.explanation_type, user_prompt.len(), citations_used.len()
    );
    PromptPlan
    {   completion: CompletionRequest::new(
          Operation::Generate,
          GENERATE_SYSTEM_PROMPT,
          user_prompt,
          budget.max_tokens
        )
      , citations_used
    }
}

fn general_prompt(text: &str, context: &str) -> String
{   format!(
      "Please provide a concise explanation of the following selected text \
from a research paper:\n\"{text}\"\n\n\
Here is some context from the paper to help you understand the topic:\n\
{context}\n\n\
Keep your response brief and focused."
    )
}

fn definition_prompt(term: &str, context: &str) -> String
{   format!(
      "Define the term or phrase: \"{term}\"\n\n\
Based on this context from the research paper:\n{context}\n\n\
Provide a VERY BRIEF definition of this term as used in this context. \
Keep your explanation under 50 words total. Focus only on what the term \
means in this specific research context."
    )
}

fn concept_prompt(concept: &str, context: &str) -> String
{   format!(
      "Explain this concept from a research paper:\n\"{concept}\"\n\n\
Context from the paper:\n{context}\n\n\
Please provide a concise explanation of:\n\
1. What this concept means in the context of this research\n\
2. How it's used in the paper\n\n\
Keep your explanation under 100 words."
    )
}

fn paragraph_prompt(
  paragraph: &str
, context: &str
, citations: &[String]
) -> String
{   let guidance = if citations.is_empty()
    {   "Please provide a clear and concise explanation of what this \
paragraph is communicating."
          .to_string()
    } else
    {   format!(
          "Referenced sources in this paragraph:\n{}\n\n\
Please include:\n\
1. A clear explanation of what this paragraph is communicating\n\
2. How the cited works support or relate to the paragraph's claims",
          citation_block(citations)
        )
    };

    format!(
      "Explain this paragraph from a research paper:\n\"{paragraph}\"\n\n\
Additional context from the paper:\n{context}\n\n\
{guidance}\n\n\
Keep your explanation concise and use simpler language than the paper does."
    )
}

// ===== refine =====

pub fn refinement_plan(request: &RefinementRequest) -> PromptPlan
{   let budget = refinement_budget(request.refinement_type);
    let context = truncate_chars(
      &request.document_context,
      budget.context_ceiling
    );
    let text = &request.selected_text;
    let current = &request.current_explanation;

    let (user_prompt, citations_used) = match request.refinement_type
    {   RefinementType::Simpler => (simpler_prompt(text, current, context), vec![])
      , RefinementType::Summarize => (summarize_prompt(text, current, context), vec![])
      , RefinementType::Detailed => (
          detailed_prompt(text, current, context, &request.citation_texts)
        , request.citation_texts.clone()
        )
    };

    trace!(
      "refine/{} prompt: {} chars",
      request.refinement_type, user_prompt.len()
    );
    PromptPlan
    {   completion: CompletionRequest::new(
          Operation::Refine,
          REFINE_SYSTEM_PROMPT,
          user_prompt,
          budget.max_tokens
        )
      , citations_used
    }
}

fn simpler_prompt(text: &str, current: &str, context: &str) -> String
{   format!(
      "A reader selected this text from a research paper:\n\"{text}\"\n\n\
They received this explanation:\n{current}\n\n\
Context from the paper:\n{context}\n\n\
Rewrite the explanation in simpler terms. Use everyday vocabulary and \
shorter sentences, and avoid jargon unless you define it."
    )
}

fn detailed_prompt(
  text: &str
, current: &str
, context: &str
, citations: &[String]
) -> String
{   let sources = if citations.is_empty()
    {   String::new()
    } else
    {   format!(
          "Referenced sources:\n{}\n\n",
          citation_block(citations)
        )
    };

    format!(
      "A reader selected this text from a research paper:\n\"{text}\"\n\n\
They received this explanation:\n{current}\n\n\
Context from the paper:\n{context}\n\n\
{sources}\
Expand the explanation with more detail. Develop the underlying concepts, \
their implications for the research, and how they connect to the rest of \
the paper."
    )
}

fn summarize_prompt(text: &str, current: &str, context: &str) -> String
{   format!(
      "A reader selected this text from a research paper:\n\"{text}\"\n\n\
They received this explanation:\n{current}\n\n\
Context from the paper:\n{context}\n\n\
Summarize the explanation into its 2-3 key points. Use no more than 4 \
sentences in total."
    )
}

// ===== followup =====

/// The framing message carries the selection and context once; the
/// caller's turns follow it and the new question closes the list.
pub fn followup_plan(request: &FollowupRequest) -> PromptPlan
{   let context = truncate_chars(
      &request.document_context,
      FOLLOWUP_CONTEXT_CEILING
    );
    let framing = format!(
      "We are discussing this text from a research paper:\n\"{}\"\n\n\
Context from the paper:\n{}",
      request.original_text, context
    );

    trace!(
      "followup prompt: {} prior turns",
      request.conversation_history.len()
    );
    PromptPlan
    {   completion: CompletionRequest::new(
          Operation::Followup,
          FOLLOWUP_SYSTEM_PROMPT,
          framing,
          FOLLOWUP_MAX_TOKENS
        )
        .with_prior_turns(request.conversation_history.clone())
        .with_trailing_prompt(request.question.clone())
      , citations_used: vec![]
    }
}
