use crate::domain::llm_config::BackendKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

pub const DEFAULT_COMPONENT: &str = "Web Application";
pub const DEFAULT_RELEASE: &str = "1.0";
pub const DEFAULT_TEST_TYPE: &str = "Functional";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Other(value) => value.as_str(),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Priority {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        Priority::from(value.as_str())
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for Priority {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Priority::from(s))
    }
}

/// Caller-supplied description of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    #[validate(length(min = 1, message = "ticket id is required"))]
    pub ticket_id: String,
    pub priority: Priority,
    #[validate(length(min = 1, message = "acceptance criteria are required"))]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub test_type: String,
}

impl GenerationRequest {
    pub fn new(
        ticket_id: impl Into<String>,
        priority: Priority,
        acceptance_criteria: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into().trim().to_string(),
            priority,
            acceptance_criteria: acceptance_criteria.into().trim().to_string(),
            component: DEFAULT_COMPONENT.to_string(),
            release: DEFAULT_RELEASE.to_string(),
            test_type: DEFAULT_TEST_TYPE.to_string(),
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn with_test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_type = test_type.into();
        self
    }

    pub fn component_or_default(&self) -> &str {
        non_empty_or(&self.component, DEFAULT_COMPONENT)
    }

    pub fn release_or_default(&self) -> &str {
        non_empty_or(&self.release, DEFAULT_RELEASE)
    }

    pub fn test_type_or_default(&self) -> &str {
        non_empty_or(&self.test_type, DEFAULT_TEST_TYPE)
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

/// Backend-neutral test case candidate, before column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub title: String,
    pub preconditions: String,
    pub steps: String,
    pub test_data: String,
    pub expected_results: String,
    pub tags: String,
}

impl DraftRecord {
    /// The record emitted when a backend cannot produce anything usable.
    pub fn fallback(request: &GenerationRequest) -> Self {
        Self {
            title: format!("Verify {} acceptance criteria", request.ticket_id),
            preconditions: "Application is accessible and user is logged in".to_string(),
            steps: "1. Navigate to the feature\n2. Perform the required action\n3. Verify the result"
                .to_string(),
            test_data: "Valid test data".to_string(),
            expected_results: "Feature works as per acceptance criteria".to_string(),
            tags: "smoke, regression".to_string(),
        }
    }
}

/// Why an adapter substituted the fallback record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    Transport(String),
    HttpStatus { status: u16, body: String },
    InvalidEnvelope(String),
    NoJsonArray,
    Decode(String),
    NoRecords,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Transport(msg) => write!(f, "request failed: {}", msg),
            FallbackReason::HttpStatus { status, body } => {
                write!(f, "backend returned HTTP {}: {}", status, body)
            }
            FallbackReason::InvalidEnvelope(msg) => {
                write!(f, "unexpected response envelope: {}", msg)
            }
            FallbackReason::NoJsonArray => write!(f, "no JSON array found in response"),
            FallbackReason::Decode(msg) => write!(f, "JSON array could not be decoded: {}", msg),
            FallbackReason::NoRecords => write!(f, "JSON array contained no test case objects"),
        }
    }
}

/// Output of one backend call: the drafts plus, when they are synthetic, the cause.
#[derive(Debug, Clone, Serialize)]
pub struct DraftBatch {
    pub backend: BackendKind,
    pub drafts: Vec<DraftRecord>,
    pub fallback: Option<FallbackReason>,
}

impl DraftBatch {
    pub fn parsed(backend: BackendKind, drafts: Vec<DraftRecord>) -> Self {
        Self {
            backend,
            drafts,
            fallback: None,
        }
    }

    pub fn fallback(backend: BackendKind, request: &GenerationRequest, reason: FallbackReason) -> Self {
        Self {
            backend,
            drafts: vec![DraftRecord::fallback(request)],
            fallback: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing_is_case_insensitive() {
        assert_eq!(Priority::from("high"), Priority::High);
        assert_eq!(Priority::from(" MEDIUM "), Priority::Medium);
        assert_eq!(Priority::from("Low"), Priority::Low);
        assert_eq!(
            Priority::from("Blocker"),
            Priority::Other("Blocker".to_string())
        );
        assert_eq!(Priority::Other("Blocker".to_string()).to_string(), "Blocker");
    }

    #[test]
    fn test_priority_serializes_as_plain_string() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"High\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_request_defaults_for_optional_fields() {
        let request = GenerationRequest::new("AUTH-101", Priority::High, "User can log in")
            .with_component("")
            .with_release("  ");
        assert_eq!(request.component_or_default(), DEFAULT_COMPONENT);
        assert_eq!(request.release_or_default(), DEFAULT_RELEASE);
        assert_eq!(request.test_type_or_default(), DEFAULT_TEST_TYPE);
    }

    #[test]
    fn test_request_validation_rejects_empty_required_fields() {
        let request = GenerationRequest::new("", Priority::Low, "");
        let err = request.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("ticket_id"));
        assert!(fields.contains_key("acceptance_criteria"));

        let ok = GenerationRequest::new("T-1", Priority::Low, "criteria");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_fallback_record_is_derived_from_request() {
        let request = GenerationRequest::new("BULK-001", Priority::High, "Upload works");
        let draft = DraftRecord::fallback(&request);
        assert_eq!(draft.title, "Verify BULK-001 acceptance criteria");
        assert_eq!(draft.tags, "smoke, regression");
        assert!(draft.steps.starts_with("1. Navigate to the feature"));
    }
}
