use extract::normalizer::extract_results;
use extract::prompt::resolve_prompt;
use extract::schema::UNKNOWN_ERROR;
use extract::{ApiResponse, CompanyData, ExtractRequest};
use fields::{ExtractField, Model};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::boundary::ExtractionBoundary;
use crate::error::ClientError;
use crate::website::normalize_website;

pub struct ExtractionClient {
    boundary: Arc<dyn ExtractionBoundary>,
    model: Option<Model>,
}

/// One website that failed during a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub website: String,
    pub error: ClientError,
}

/// Successes and failures of a bulk run, each in input order.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub results: Vec<CompanyData>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// All failures as `<website>: <error>`, joined by `"; "`.
    pub fn aggregate_error(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }

        Some(
            self.failures
                .iter()
                .map(|f| format!("{}: {}", f.website, f.error))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl ExtractionClient {
    pub fn new(boundary: Arc<dyn ExtractionBoundary>) -> Self {
        Self {
            boundary,
            model: None,
        }
    }

    /// Ask the handler for a specific model instead of its default.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub async fn extract(
        &self,
        website: &str,
        fields: &[ExtractField],
        custom_prompt: Option<&str>,
    ) -> ApiResponse {
        match self.try_extract(website, fields, custom_prompt).await {
            Ok(data) => ApiResponse::Success(data),
            Err(e) => {
                error!(website, error = %e, "Extraction failed");
                ApiResponse::Failure(e.to_string())
            }
        }
    }

    /// One request per website, all in flight at once. A failure only
    /// affects its own website.
    pub async fn extract_bulk(
        &self,
        websites: &[String],
        fields: &[ExtractField],
        custom_prompt: Option<&str>,
    ) -> BulkOutcome {
        let calls = websites
            .iter()
            .map(|website| self.try_extract(website, fields, custom_prompt));
        let outcomes = join_all(calls).await;

        let mut bulk = BulkOutcome::default();
        for (website, outcome) in websites.iter().zip(outcomes) {
            match outcome {
                Ok(data) => bulk.results.push(data),
                Err(error) => {
                    error!(website = %website, error = %error, "Bulk extraction failed for website");
                    bulk.failures.push(BulkFailure {
                        website: website.trim().to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = bulk.results.len(),
            failed = bulk.failures.len(),
            "Bulk extraction finished"
        );

        bulk
    }

    pub async fn try_extract(
        &self,
        website: &str,
        fields: &[ExtractField],
        custom_prompt: Option<&str>,
    ) -> Result<CompanyData, ClientError> {
        let website = normalize_website(website)?;
        if fields.is_empty() {
            return Err(ClientError::Validation(
                "Please select at least one field to extract".to_string(),
            ));
        }

        let request = ExtractRequest {
            custom_prompt: Some(resolve_prompt(custom_prompt, &website, fields)),
            website: website.clone(),
            fields: fields.to_vec(),
            model: self.model.map(|m| m.as_str().to_string()),
        };

        let envelope = self.boundary.invoke(&request).await?;
        if !envelope.success {
            return Err(ClientError::Service(
                envelope.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            ));
        }

        let data = envelope
            .data
            .ok_or_else(|| ClientError::MalformedResponse("missing data".to_string()))?;

        company_from_data(&website, data)
    }
}

/// Accepts either a full `CompanyData` or the model's raw `{"results": [...]}`.
fn company_from_data(website: &str, data: Value) -> Result<CompanyData, ClientError> {
    if data.get("info").is_some() {
        return serde_json::from_value(data).map_err(|e| ClientError::MalformedResponse(e.to_string()));
    }

    if data.get("results").is_some() {
        let info = extract_results(data).map_err(|_| {
            ClientError::MalformedResponse("`results` is not a list".to_string())
        })?;
        return Ok(CompanyData::new(website, info));
    }

    Err(ClientError::MalformedResponse(
        "expected `info` or `results` in data".to_string(),
    ))
}
