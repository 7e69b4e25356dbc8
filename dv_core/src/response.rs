//! Issue-list schema returned by model backends.
//!
//! Models are asked for `{"issues": [...]}` but frequently wrap the JSON in a
//! Markdown code fence, so the payload is located before it is decoded.

use crate::types::{Issue, Severity};
use serde::Deserialize;
use std::str::FromStr;

/// An issue as reported by a model, before a check claims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub issue_type: String,
    pub severity: Severity,
    pub location: String,
    pub current: String,
    pub suggestion: String,
    pub explanation: String
}

impl IssueDraft {
    #[must_use]
    pub fn into_issue(self, category: &str) -> Issue {
        Issue {
            category: category.to_string(),
            issue_type: self.issue_type,
            severity: self.severity,
            location: self.location,
            current: self.current,
            suggestion: self.suggestion,
            explanation: self.explanation
        }
    }
}

#[derive(Deserialize)]
struct WireIssueList {
    #[serde(default)]
    issues: Vec<WireIssue>
}

#[derive(Deserialize)]
struct WireIssue {
    #[serde(rename = "type")]
    issue_type: String,
    severity: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    current: String,
    #[serde(default)]
    suggestion: String,
    #[serde(default)]
    explanation: String
}

/// Strips a surrounding Markdown code fence, if any.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some((_, rest)) = trimmed.split_once("```json") {
        rest
    } else if let Some((_, rest)) = trimmed.split_once("```") {
        rest
    } else {
        return trimmed;
    };
    body.split_once("```").map_or(body, |(inner, _)| inner).trim()
}

/// Decodes a model response into issue drafts.
///
/// Any schema violation, including an unknown severity, rejects the whole
/// response.
pub fn parse_issue_list(text: &str) -> Result<Vec<IssueDraft>, String> {
    let payload = extract_json(text);
    let list: WireIssueList = serde_json::from_str(payload).map_err(|e| e.to_string())?;

    list.issues
        .into_iter()
        .map(|wire| {
            let severity = Severity::from_str(wire.severity.trim())
                .map_err(|_| format!("unknown severity: {}", wire.severity))?;
            Ok(IssueDraft {
                issue_type: wire.issue_type,
                severity,
                location: wire.location,
                current: wire.current,
                suggestion: wire.suggestion,
                explanation: wire.explanation
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"issues": [{"type": "spelling", "severity": "LOW", "location": "History", "current": "pateint", "suggestion": "patient", "explanation": "typo"}]}"#;

    #[test]
    fn test_parse_plain_json() {
        let drafts = parse_issue_list(PLAIN).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].issue_type, "spelling");
        assert_eq!(drafts[0].severity, Severity::Low);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("Here is the review:\n```json\n{PLAIN}\n```\nThanks");
        assert_eq!(parse_issue_list(&fenced).unwrap().len(), 1);

        let bare_fence = format!("```\n{PLAIN}\n```");
        assert_eq!(parse_issue_list(&bare_fence).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_empty_issue_list() {
        assert!(parse_issue_list(r#"{"issues": []}"#).unwrap().is_empty());
        assert!(parse_issue_list("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_lowercase_severity() {
        let text = r#"{"issues": [{"type": "drug_dose", "severity": "high"}]}"#;
        let drafts = parse_issue_list(text).unwrap();
        assert_eq!(drafts[0].severity, Severity::High);
        assert_eq!(drafts[0].location, "");
    }

    #[test]
    fn test_parse_rejects_unknown_severity() {
        let text = r#"{"issues": [{"type": "x", "severity": "CRITICAL"}]}"#;
        let err = parse_issue_list(text).unwrap_err();
        assert!(err.contains("CRITICAL"));
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_issue_list("I could not find any issues.").is_err());
    }

    #[test]
    fn test_into_issue_sets_category() {
        let draft = parse_issue_list(PLAIN).unwrap().remove(0);
        let issue = draft.into_issue("linguistic");
        assert_eq!(issue.category, "linguistic");
        assert_eq!(issue.current, "pateint");
    }
}
