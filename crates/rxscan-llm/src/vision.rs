//! Vision-tier extractor: all photos go to a vision-capable model at once.

use rxscan_core::CandidateRecord;
use tracing::{info, warn};

use crate::client::{ChatClient, Content, Message};
use crate::parse::parse_candidate;
use crate::schema::LABEL_SCHEMA_PROMPT;

/// First-attempt extractor reading the photographs directly.
#[derive(Debug, Clone)]
pub struct VisionExtractor {
    client: ChatClient,
}

impl VisionExtractor {
    /// Wrap a chat client.
    #[must_use = "extractor is created but not used"]
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Extract a candidate record from prepared data-URL images.
    ///
    /// Returns `None` on any network, timeout, or parse failure - the
    /// pipeline treats that as "vision unavailable" and falls through to
    /// the OCR path.
    pub async fn extract(&self, image_data_urls: &[String]) -> Option<CandidateRecord> {
        let mut content = vec![Content::text(format!(
            "{LABEL_SCHEMA_PROMPT}\n\nRead the medicine package shown in the {n} image(s) and return the JSON record.",
            n = image_data_urls.len()
        ))];
        content.extend(image_data_urls.iter().map(Content::image));

        let messages = vec![Message {
            role: "user".to_string(),
            content,
        }];

        let config = self.client.config().clone();
        let response = match self
            .client
            .complete(&config.vision_model, messages, config.vision_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(model = %config.vision_model, error = %e, "vision tier unavailable");
                return None;
            }
        };

        let candidate = parse_candidate(&response);
        match &candidate {
            Some(record) => info!(
                populated = record.populated_fields(),
                "vision tier returned a candidate"
            ),
            None => warn!("vision tier response did not parse"),
        }
        candidate
    }
}
