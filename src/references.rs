//! Bibliography extraction and citation marker matching
//!
//! All of this is best-effort text heuristics over whatever the page gave
//! us. Nothing here fails: a document without a recognisable reference
//! section simply yields no references.

use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Section headers, in the order they are tried
pub const SECTION_HEADERS: [&str; 7] = [
  "References", "REFERENCES", "Bibliography", "BIBLIOGRAPHY",
  "Works Cited", "WORKS CITED", "Literature Cited",
];

/// Fragments this short are headers or noise
pub const MIN_REFERENCE_CHARS: usize = 30;
pub const MAX_REFERENCES: usize = 30;
pub const DEFAULT_CONTEXT_SIZE: usize = 2000;

/// One bibliography entry. Its 1-based position in the extracted
/// sequence is the number a `[n]` marker refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference
{   pub raw_text: String
}

/// Citation markers found in a paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationMarkers
{   /// Numbers from bracket groups, `[1, 3-4]` gives "1", "3", "4"
    pub numbers: Vec<String>
  , /// Parenthetical groups holding a year, e.g. "Smith, 2020"
    pub author_citations: Vec<String>
}

impl CitationMarkers
{   pub fn is_empty(&self) -> bool
    {   self.numbers.is_empty() && self.author_citations.is_empty()
    }
}

/// Rough shape of a selection, by word count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType
{   Definition
  , Concept
  , Paragraph
}

impl From<TextType> for crate::ExplanationType
{   fn from(kind: TextType) -> Self
    {   match kind
        {   TextType::Definition => crate::ExplanationType::Definition
          , TextType::Concept => crate::ExplanationType::Concept
          , TextType::Paragraph => crate::ExplanationType::Paragraph
        }
    }
}

fn marker_split_regex() -> &'static Regex
{   static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
      Regex::new(r"\[\d+\]|\d+\.\s").expect("reference marker regex")
    })
}

fn bracket_regex() -> &'static Regex
{   static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
      Regex::new(r"\[(\d+(?:[-,\s]*\d+)*)\]").expect("bracket citation regex")
    })
}

fn bracket_separator_regex() -> &'static Regex
{   static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
      Regex::new(r"[-,\s]+").expect("bracket separator regex")
    })
}

fn author_year_regex() -> &'static Regex
{   static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
      Regex::new(r"\(([^)]+(?:\d{4})[^)]*)\)").expect("author-year regex")
    })
}

fn author_year_parts_regex() -> &'static Regex
{   static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
      Regex::new(r"([^,]+),\s*(\d{4})").expect("author-year parts regex")
    })
}

/// Pull the reference list out of raw document text.
///
/// The section starts at the first header from `SECTION_HEADERS` found
/// (earlier headers win) and runs to the end of the document. It is
/// split on `[n]` and `n. ` markers; whatever precedes the first marker
/// is dropped, as are fragments of `MIN_REFERENCE_CHARS` or less.
pub fn extract_references(document_text: &str) -> Vec<Reference>
{   let section = SECTION_HEADERS
      .iter()
      .find_map(|header| {
        document_text.find(header).map(|at| (*header, &document_text[at..]))
      });

    let Some((header, section)) = section
    else
    {   debug!("No reference section header found");
        return vec![];
    };
    trace!("Reference section starts at header {:?}", header);

    let references: Vec<Reference> = marker_split_regex()
      .split(section)
      .skip(1)
      .map(str::trim)
      .filter(|fragment| fragment.chars().count() > MIN_REFERENCE_CHARS)
      .take(MAX_REFERENCES)
      .map(|fragment| Reference { raw_text: fragment.to_string() })
      .collect();

    debug!("Extracted {} references", references.len());
    references
}

/// Find `[1]`, `[1,2]`, `[1-3]` groups and `(Author, 2020)` groups.
pub fn extract_citation_numbers(text: &str) -> CitationMarkers
{   let numbers = bracket_regex()
      .captures_iter(text)
      .flat_map(|caps| {
        bracket_separator_regex()
          .split(caps.get(1).map_or("", |m| m.as_str()))
          .map(str::trim)
          .filter(|n| !n.is_empty())
          .map(str::to_string)
          .collect::<Vec<_>>()
      })
      .collect();

    let author_citations = author_year_regex()
      .captures_iter(text)
      .filter_map(|caps| caps.get(1))
      .map(|m| m.as_str().trim().to_string())
      .collect();

    CitationMarkers { numbers, author_citations }
}

/// Map markers to reference texts.
///
/// Numbers index the list 1-based; out of range or non-numeric markers
/// are dropped. An author-year marker matches every reference that
/// contains both the author and the year as substrings, so it can
/// over-match.
pub fn find_matching_references(
  markers: &CitationMarkers
, references: &[String]
) -> Vec<String>
{   if markers.is_empty() || references.is_empty()
    {   return vec![];
    }

    let mut matching = Vec::new();

    for number in &markers.numbers
    {   match number.parse::<usize>()
        {   Ok(n) if n >= 1 && n <= references.len() => {
              matching.push(references[n - 1].clone());
            }
          , _ => trace!("Dropping citation marker {:?}", number)
        }
    }

    for citation in &markers.author_citations
    {   let Some(caps) = author_year_parts_regex().captures(citation)
        else
        {   continue;
        };
        let (author, year) = (&caps[1], &caps[2]);
        matching.extend(
          references
            .iter()
            .filter(|r| r.contains(author) && r.contains(year))
            .cloned()
        );
    }

    matching
}

/// Window of `context_size / 2` characters either side of the first
/// occurrence of `selected_text`.
///
/// Empty when either input is empty; the selection alone when it does
/// not occur in `full_text`.
pub fn extract_surrounding_context(
  full_text: &str
, selected_text: &str
, context_size: usize
) -> String
{   if full_text.is_empty() || selected_text.is_empty()
    {   return String::new();
    }

    let Some(start) = full_text.find(selected_text)
    else
    {   return selected_text.to_string();
    };
    let end = start + selected_text.len();
    let half = context_size / 2;

    let before = &full_text[..start];
    let from = if half == 0
    {   start
    } else
    {   before
          .char_indices()
          .rev()
          .nth(half - 1)
          .map_or(0, |(i, _)| i)
    };

    let after = &full_text[end..];
    let to = end + after
      .char_indices()
      .nth(half)
      .map_or(after.len(), |(i, _)| i);

    full_text[from..to].to_string()
}

/// Up to 3 words is a definition, up to 20 a concept, else a paragraph
pub fn detect_text_type(text: &str) -> TextType
{   match text.split_whitespace().count()
    {   0..=3 => TextType::Definition
      , 4..=20 => TextType::Concept
      , _ => TextType::Paragraph
    }
}
