pub mod error;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use error::{classify_upstream_error, ExtractError, UpstreamErrorKind};
pub use llm::{CompletionApi, OpenAiClient};
pub use schema::{ApiResponse, CompanyData, ExtractRequest, ExtractedInfo, ResponseEnvelope};

use fields::Model;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server side of an extraction: validate the envelope, call the completion
/// API with the resolved prompt and normalize its reply.
pub struct Extractor {
    llm: Arc<dyn CompletionApi>,
    default_model: Model,
}

impl Extractor {
    pub fn new(llm: Arc<dyn CompletionApi>, default_model: Model) -> Self {
        Self { llm, default_model }
    }

    pub async fn handle(&self, request: ExtractRequest) -> Result<CompanyData, ExtractError> {
        let website = request.website.trim();
        if website.is_empty() || request.fields.is_empty() {
            return Err(ExtractError::Validation(
                "Missing required parameters: website or fields".to_string(),
            ));
        }

        let prompt = prompt::resolve_prompt(request.custom_prompt.as_deref(), website, &request.fields);
        let model = self.pick_model(request.model.as_deref());

        info!(website, model = %model, fields = request.fields.len(), "Extracting company info");

        let content = self
            .llm
            .complete(model.as_str(), prompt::SYSTEM_PROMPT, &prompt)
            .await?;

        let reply = normalizer::parse_completion(&content);
        let info = normalizer::extract_results(reply)?;

        debug!(website, rows = info.len(), "Completion normalized");

        Ok(CompanyData::new(website, info))
    }

    fn pick_model(&self, requested: Option<&str>) -> Model {
        match requested {
            Some(name) => name.parse().unwrap_or_else(|_| {
                warn!(requested = name, fallback = %self.default_model, "Unknown model requested");
                self.default_model
            }),
            None => self.default_model,
        }
    }
}
