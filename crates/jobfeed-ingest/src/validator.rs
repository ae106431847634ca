//! Candidate record validation

use crate::error::{IngestError, Result};
use crate::sources::CandidateRecord;

/// True when title, company and url are non-blank and url starts with `http`
pub fn is_valid(record: &CandidateRecord) -> bool {
    validate(record).is_ok()
}

/// Like [`is_valid`] but names the first failing field
pub fn validate(record: &CandidateRecord) -> Result<()> {
    let reason = if record.title.trim().is_empty() {
        "blank title"
    } else if record.company.trim().is_empty() {
        "blank company"
    } else if record.url.trim().is_empty() {
        "blank url"
    } else if !record.url.starts_with("http") {
        "url is not http(s)"
    } else {
        return Ok(());
    };

    Err(IngestError::ValidationRejected {
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, company: &str, url: &str) -> CandidateRecord {
        CandidateRecord {
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
            source: "RemoteOK".to_string(),
        }
    }

    #[test]
    fn test_complete_record_is_valid() {
        assert!(is_valid(&record("Engineer", "Acme", "https://acme.io/jobs/1")));
        assert!(is_valid(&record("Engineer", "Acme", "http://acme.io/jobs/1")));
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        assert!(!is_valid(&record("   ", "Acme", "https://acme.io/1")));
        assert!(!is_valid(&record("Engineer", "", "https://acme.io/1")));
        assert!(!is_valid(&record("Engineer", "Acme", " ")));
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        assert!(!is_valid(&record("Engineer", "Acme", "/jobs/1")));
        assert!(!is_valid(&record("Engineer", "Acme", "ftp://acme.io/1")));
    }

    #[test]
    fn test_reason_names_first_failure() {
        match validate(&record("", "", "")) {
            Err(IngestError::ValidationRejected { reason }) => assert_eq!(reason, "blank title"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
