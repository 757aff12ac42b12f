// crates/callgate-core/src/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Uniform wire response shape for all tool-call outcomes.
// Purpose: Normalize success and failure into one content-block reply.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every tool call, whatever its outcome and whichever transport carried it,
//! is answered with the same envelope: a list of content blocks plus an
//! `isError` flag. Validation failures, executor failures, and successes
//! differ only in the flag and the block text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// One block of envelope content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text payload.
    Text {
        /// Text content.
        text: String,
    },
}

/// Uniform wire response for a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Whether the call failed.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ResponseEnvelope {
    /// Builds a success envelope around one text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Builds a failure envelope around one text block.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: text.into(),
            }],
            is_error: true,
        }
    }

    /// Returns the concatenated text of all blocks.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text {
                    text,
                } => text.as_str(),
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
