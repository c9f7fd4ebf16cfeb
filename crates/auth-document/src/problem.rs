//! RFC 7807 problem documents.

use serde::Deserialize;

use crate::error::ParseResult;

/// Problem type the circulation server uses for rejected credentials.
pub const TYPE_CREDENTIALS_INVALID: &str =
    "http://librarysimplified.org/terms/problem/credentials-invalid";

/// An RFC 7807 problem document returned on request failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProblemDocument {
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
}

impl ProblemDocument {
    pub fn parse(bytes: &[u8]) -> ParseResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Whether this problem signals that stored credentials are no longer
    /// accepted and a reauthentication flow should begin.
    pub fn indicates_authentication_needs_refresh(&self) -> bool {
        self.problem_type.as_deref() == Some(TYPE_CREDENTIALS_INVALID)
            || self.status == Some(401)
    }

    /// A user-displayable message assembled from title and detail.
    pub fn user_message(&self) -> Option<String> {
        match (self.title.as_deref(), self.detail.as_deref()) {
            (Some(title), Some(detail)) => Some(format!("{title}: {detail}")),
            (Some(title), None) => Some(title.to_string()),
            (None, Some(detail)) => Some(detail.to_string()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_invalid_type_triggers_refresh() {
        let doc = ProblemDocument {
            problem_type: Some(TYPE_CREDENTIALS_INVALID.to_string()),
            status: Some(400),
            ..Default::default()
        };
        assert!(doc.indicates_authentication_needs_refresh());
    }

    #[test]
    fn test_401_triggers_refresh() {
        let doc = ProblemDocument {
            problem_type: Some("http://example.com/other".to_string()),
            status: Some(401),
            ..Default::default()
        };
        assert!(doc.indicates_authentication_needs_refresh());
    }

    #[test]
    fn test_unrelated_problem_does_not_trigger_refresh() {
        let doc = ProblemDocument {
            problem_type: Some("http://example.com/loan-limit-reached".to_string()),
            status: Some(403),
            ..Default::default()
        };
        assert!(!doc.indicates_authentication_needs_refresh());
    }

    #[test]
    fn test_parse_and_user_message() {
        let json = r#"{
            "type": "http://librarysimplified.org/terms/problem/credentials-invalid",
            "title": "Invalid credentials",
            "status": 401,
            "detail": "Barcode or PIN is incorrect."
        }"#;
        let doc = ProblemDocument::parse(json.as_bytes()).unwrap();
        assert!(doc.indicates_authentication_needs_refresh());
        assert_eq!(
            doc.user_message().as_deref(),
            Some("Invalid credentials: Barcode or PIN is incorrect.")
        );
    }

    #[test]
    fn test_user_message_title_only() {
        let doc = ProblemDocument {
            title: Some("Something went wrong".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.user_message().as_deref(), Some("Something went wrong"));
    }
}
