//! Text-tier extractor: OCR transcript + hints go to a text-only model.
//!
//! This tier runs only when the vision tier was unavailable or came back
//! with nothing beyond a batch correction.

use rxscan_core::{CandidateRecord, HintBundle};
use tracing::{info, warn};

use crate::client::{ChatClient, Content, Message};
use crate::parse::parse_candidate;
use crate::schema::{BATCH_SHAPE_NOTE, LABEL_SCHEMA_PROMPT};

/// Fallback extractor reading the OCR transcript.
#[derive(Debug, Clone)]
pub struct TextModelExtractor {
    client: ChatClient,
}

impl TextModelExtractor {
    /// Wrap a chat client.
    #[must_use = "extractor is created but not used"]
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Extract a candidate record from OCR text, biased by keyword hints.
    ///
    /// Same tolerant contract as the vision tier: any failure is `None`.
    pub async fn extract(&self, ocr_text: &str, hints: &HintBundle) -> Option<CandidateRecord> {
        let hint_block = hints.prompt_block();
        let prompt = format!(
            "{LABEL_SCHEMA_PROMPT}\n{BATCH_SHAPE_NOTE}\n\n\
             The text below is a noisy OCR transcript of a medicine package.\n\
             Keyword-anchored hint lines (most reliable evidence first):\n\
             {hint_block}\nFULL TRANSCRIPT:\n{ocr_text}\n\n\
             Return the JSON record."
        );

        let messages = vec![Message {
            role: "user".to_string(),
            content: vec![Content::text(prompt)],
        }];

        let config = self.client.config().clone();
        let response = match self
            .client
            .complete(&config.text_model, messages, config.text_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(model = %config.text_model, error = %e, "text tier unavailable");
                return None;
            }
        };

        let candidate = parse_candidate(&response);
        match &candidate {
            Some(record) => info!(
                populated = record.populated_fields(),
                "text tier returned a candidate"
            ),
            None => warn!("text tier response did not parse"),
        }
        candidate
    }
}
