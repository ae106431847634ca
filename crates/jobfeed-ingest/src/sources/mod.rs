//! Job posting sources
//!
//! Every source is described by a [`SourceConfig`] and served by a
//! [`SourceAdapter`] that fetches the raw payload and turns it into
//! [`CandidateRecord`]s. Three wire formats are supported:
//!
//! - **rss**: syndication feed with `<item>` elements
//! - **prefixed_array**: JSON array whose first element is metadata
//! - **wrapped_object**: JSON object holding the jobs under one key
//!
//! Adding a source means adding a configuration entry; only a new wire
//! format needs a new adapter.

pub mod http;
pub mod json;
pub mod rss;

use async_trait::async_trait;
use jobfeed_common::NewJobPosting;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use self::http::{Accept, HttpFetcher, HttpSettings};
pub use self::json::{PrefixedArrayAdapter, WrappedObjectAdapter};
pub use self::rss::RssAdapter;

/// Key holding the job list in wrapped-object payloads unless configured otherwise
pub const DEFAULT_WRAPPED_KEY: &str = "jobs";

/// Payload layout served by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireFormat {
    /// RSS 2.0 feed
    Rss,
    /// JSON array, element 0 is metadata
    PrefixedArray,
    /// JSON object with the jobs array under `key`
    WrappedObject {
        #[serde(default = "default_wrapped_key")]
        key: String,
    },
}

fn default_wrapped_key() -> String {
    DEFAULT_WRAPPED_KEY.to_string()
}

impl WireFormat {
    pub fn label(&self) -> &'static str {
        match self {
            WireFormat::Rss => "rss",
            WireFormat::PrefixedArray => "prefixed_array",
            WireFormat::WrappedObject { .. } => "wrapped_object",
        }
    }

    /// Field names used when a source does not configure its own
    pub fn default_fields(&self) -> FieldMapping {
        match self {
            WireFormat::Rss => FieldMapping::new("title", "dc:creator", "link"),
            WireFormat::PrefixedArray => FieldMapping::new("position", "company", "url"),
            WireFormat::WrappedObject { .. } => FieldMapping::new("title", "company_name", "url"),
        }
    }
}

/// Names of the payload fields holding title, company and URL
///
/// For RSS these are qualified element names as written in the feed, e.g. `dc:creator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub title: String,
    pub company: String,
    pub url: String,
}

impl FieldMapping {
    pub fn new(title: &str, company: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
        }
    }
}

/// Static description of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name recorded on every posting from this source
    pub name: String,
    /// URL fetched on each attempt
    pub endpoint: String,
    pub format: WireFormat,
    /// Field names; defaults depend on the wire format
    #[serde(default)]
    pub fields: Option<FieldMapping>,
    /// Prefix for relative posting links
    pub base_url: String,
}

impl SourceConfig {
    pub fn new(name: &str, endpoint: &str, format: WireFormat, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            format,
            fields: None,
            base_url: base_url.to_string(),
        }
    }

    pub fn with_fields(mut self, fields: FieldMapping) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Effective field mapping
    pub fn fields(&self) -> FieldMapping {
        self.fields
            .clone()
            .unwrap_or_else(|| self.format.default_fields())
    }
}

/// The production sources, in run order
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "We Work Remotely",
            "https://weworkremotely.com/remote-jobs.rss",
            WireFormat::Rss,
            "https://weworkremotely.com",
        ),
        SourceConfig::new(
            "RemoteOK",
            "https://remoteok.com/api",
            WireFormat::PrefixedArray,
            "https://remoteok.com",
        ),
        SourceConfig::new(
            "Remotive",
            "https://remotive.com/api/remote-jobs",
            WireFormat::WrappedObject {
                key: DEFAULT_WRAPPED_KEY.to_string(),
            },
            "https://remotive.com",
        ),
    ]
}

/// A parsed posting that has not been validated yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub company: String,
    pub url: String,
    pub source: String,
}

impl CandidateRecord {
    pub fn into_posting(self) -> NewJobPosting {
        NewJobPosting::remote(self.title, self.company, self.url, self.source)
    }
}

/// Output of one fetch-and-parse call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    /// Candidates in payload order
    pub records: Vec<CandidateRecord>,
    /// Items skipped because they could not be parsed
    pub malformed: usize,
}

impl ParsedBatch {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One source of job postings
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn config(&self) -> &SourceConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    /// Fetch the payload and parse it into candidate records
    ///
    /// Fails only on transport or envelope problems; malformed items are
    /// skipped and counted in [`ParsedBatch::malformed`].
    async fn fetch_and_parse(&self) -> Result<ParsedBatch>;
}

/// Build the adapter matching the configured wire format
pub fn build_adapter(config: SourceConfig, fetcher: HttpFetcher) -> Box<dyn SourceAdapter> {
    match config.format {
        WireFormat::Rss => Box::new(RssAdapter::new(config, fetcher)),
        WireFormat::PrefixedArray => Box::new(PrefixedArrayAdapter::new(config, fetcher)),
        WireFormat::WrappedObject { .. } => Box::new(WrappedObjectAdapter::new(config, fetcher)),
    }
}

/// Trim a raw field value
pub(crate) fn clean_text(text: &str) -> String {
    text.trim().to_string()
}

/// Prefix a relative link with the source base URL
///
/// Blank links and links already starting with `http` are returned unchanged.
pub fn absolutize(link: &str, base_url: &str) -> String {
    if link.is_empty() || link.starts_with("http") {
        link.to_string()
    } else {
        format!("{base_url}{link}")
    }
}
