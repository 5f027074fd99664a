use fields::ExtractField;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One extracted value. `value` is `None` when the model didn't know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyData {
    pub website: String,
    pub info: Vec<ExtractedInfo>,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CompanyData {
    pub fn new(website: impl Into<String>, info: Vec<ExtractedInfo>) -> Self {
        Self {
            website: website.into(),
            info,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Look up a value by field name. Model output order is not trusted, so
    /// this never goes by position.
    pub fn value_for(&self, name: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|i| same_name(&i.name, name))
            .and_then(|i| i.value.as_deref())
    }

    /// One row per requested field, in request order, matched by name.
    /// Rows the model returned for names nobody asked for go last.
    pub fn align(&self, fields: &[ExtractField]) -> Vec<ExtractedInfo> {
        let mut used = vec![false; self.info.len()];
        let mut rows = Vec::with_capacity(fields.len());

        for field in fields {
            let hit = self
                .info
                .iter()
                .enumerate()
                .find(|(idx, info)| !used[*idx] && same_name(&info.name, &field.name));

            let value = match hit {
                Some((idx, info)) => {
                    used[idx] = true;
                    info.value.clone()
                }
                None => None,
            };

            rows.push(ExtractedInfo {
                name: field.name.clone(),
                value,
            });
        }

        for (idx, info) in self.info.iter().enumerate() {
            if !used[idx] {
                rows.push(info.clone());
            }
        }

        rows
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Request envelope sent to the extraction handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub fields: Vec<ExtractField>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Success/error envelope returned by the extraction handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResponseEnvelope<CompanyData>", try_from = "ResponseEnvelope<CompanyData>")]
pub enum ApiResponse {
    Success(CompanyData),
    Failure(String),
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn data(&self) -> Option<&CompanyData> {
        match self {
            ApiResponse::Success(data) => Some(data),
            ApiResponse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Failure(error) => Some(error),
        }
    }
}

pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Raw wire shape of the envelope. The client reads `data` as an untyped
/// value first because the handler's payload is not trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ApiResponse> for ResponseEnvelope<CompanyData> {
    fn from(response: ApiResponse) -> Self {
        match response {
            ApiResponse::Success(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            ApiResponse::Failure(error) => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ResponseEnvelope<CompanyData>> for ApiResponse {
    type Error = String;

    fn try_from(envelope: ResponseEnvelope<CompanyData>) -> Result<Self, Self::Error> {
        match (envelope.success, envelope.data) {
            (true, Some(data)) => Ok(ApiResponse::Success(data)),
            (true, None) => Err("success envelope without data".to_string()),
            (false, _) => Ok(ApiResponse::Failure(
                envelope.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(name: &str, value: Option<&str>) -> ExtractedInfo {
        ExtractedInfo {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = ExtractRequest {
            website: "https://example.com".to_string(),
            fields: vec![ExtractField::new("country", "Primary country of residence")],
            custom_prompt: Some("hi".to_string()),
            model: None,
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["customPrompt"], "hi");
        assert_eq!(value["fields"][0]["id"], "country");
        assert!(value.get("model").is_none());
    }

    #[test]
    fn test_request_accepts_missing_members() {
        let request: ExtractRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.website.is_empty());
        assert!(request.fields.is_empty());
        assert_eq!(request.custom_prompt, None);
    }

    #[test]
    fn test_api_response_wire_shape() {
        let failure = serde_json::to_value(ApiResponse::Failure("Rate limit reached".into())).unwrap();
        assert_eq!(failure, json!({"success": false, "error": "Rate limit reached"}));

        let data = CompanyData {
            website: "https://example.com".into(),
            info: vec![info("Primary language spoken", None)],
            timestamp: 42,
        };
        let success = serde_json::to_value(ApiResponse::Success(data.clone())).unwrap();
        assert_eq!(success["success"], true);
        assert_eq!(success["data"]["info"][0]["value"], Value::Null);
        assert!(success.get("error").is_none());

        let parsed: ApiResponse = serde_json::from_value(success).unwrap();
        assert_eq!(parsed, ApiResponse::Success(data));
    }

    #[test]
    fn test_failure_without_message_gets_fallback() {
        let parsed: ApiResponse = serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(parsed.error(), Some(UNKNOWN_ERROR));
    }

    #[test]
    fn test_success_without_data_is_rejected() {
        let parsed = serde_json::from_value::<ApiResponse>(json!({"success": true}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_align_matches_by_name_not_position() {
        let data = CompanyData {
            website: "https://example.com".into(),
            info: vec![
                info("primary industry (msci gics)", Some("Software")),
                info("Founded", Some("1999")),
                info("Primary country of residence", Some("USA")),
            ],
            timestamp: 0,
        };
        let fields = vec![
            ExtractField::new("country", "Primary country of residence"),
            ExtractField::new("industry", "Primary industry (MSCI GICS)"),
            ExtractField::new("language", "Primary language spoken"),
        ];

        let rows = data.align(&fields);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], info("Primary country of residence", Some("USA")));
        assert_eq!(rows[1], info("Primary industry (MSCI GICS)", Some("Software")));
        assert_eq!(rows[2], info("Primary language spoken", None));
        assert_eq!(rows[3], info("Founded", Some("1999")));

        assert_eq!(data.value_for("Primary Country of Residence "), Some("USA"));
        assert_eq!(data.value_for("Primary language spoken"), None);
    }
}
