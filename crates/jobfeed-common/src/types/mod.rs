//! Job posting types shared between ingestion and downstream readers

use serde::{Deserialize, Serialize};

/// Employment type recorded on every ingested posting
pub const REMOTE_JOB_TYPE: &str = "Remote";

/// A job posting as persisted in the store
///
/// `url` is the deduplication key: at most one posting exists per URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Identifier assigned by the store
    pub id: i64,
    pub title: String,
    pub company: String,
    pub url: String,
    /// Name of the source the posting was ingested from
    pub source: String,
    #[serde(rename = "type")]
    pub job_type: String,
}

/// A posting that has passed validation but has no id yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobPosting {
    pub title: String,
    pub company: String,
    pub url: String,
    pub source: String,
    #[serde(rename = "type")]
    pub job_type: String,
}

impl NewJobPosting {
    /// Build a posting with the fixed remote job type
    pub fn remote(
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            url: url.into(),
            source: source.into(),
            job_type: REMOTE_JOB_TYPE.to_string(),
        }
    }

    /// Attach a store-assigned id
    pub fn with_id(self, id: i64) -> JobPosting {
        JobPosting {
            id,
            title: self.title,
            company: self.company,
            url: self.url,
            source: self.source,
            job_type: self.job_type,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_posting_has_fixed_type() {
        let posting = NewJobPosting::remote("Dev", "Acme", "https://acme.io/1", "RemoteOK");
        assert_eq!(posting.job_type, "Remote");

        let stored = posting.with_id(7);
        assert_eq!(stored.id, 7);
        assert_eq!(stored.url, "https://acme.io/1");
    }

    #[test]
    fn test_job_type_serializes_as_type() {
        let posting = NewJobPosting::remote("Dev", "Acme", "https://acme.io/1", "Remotive");
        let json = serde_json::to_value(&posting).unwrap();
        assert_eq!(json["type"], "Remote");
        assert!(json.get("job_type").is_none());
    }
}
