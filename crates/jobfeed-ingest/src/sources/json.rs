//! JSON API sources
//!
//! Two envelope layouts are handled:
//! - [`PrefixedArrayAdapter`]: `[ {metadata}, {job}, {job}, ... ]`
//! - [`WrappedObjectAdapter`]: `{ "jobs": [ {job}, ... ], ... }`
//!
//! Both map each job object through the source's [`FieldMapping`] and make
//! relative links absolute against the source base URL.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{
    absolutize, clean_text, Accept, CandidateRecord, FieldMapping, HttpFetcher, ParsedBatch,
    SourceAdapter, SourceConfig, WireFormat, DEFAULT_WRAPPED_KEY,
};
use crate::error::{IngestError, Result};

const FORMAT: &str = "json";

/// Adapter for JSON arrays whose first element is metadata
pub struct PrefixedArrayAdapter {
    config: SourceConfig,
    fields: FieldMapping,
    fetcher: HttpFetcher,
}

impl PrefixedArrayAdapter {
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        let fields = config.fields();
        Self {
            config,
            fields,
            fetcher,
        }
    }

    /// Parse a response body; element 0 is always skipped
    pub fn parse(&self, body: &str) -> Result<ParsedBatch> {
        let source = self.config.name.as_str();
        let Some(root) = parse_root(body, source)? else {
            return Ok(ParsedBatch::empty());
        };

        let elements = match root {
            Value::Array(elements) => elements,
            other => {
                return Err(IngestError::envelope(
                    source,
                    FORMAT,
                    format!("expected an array, found {}", kind(&other)),
                ))
            },
        };

        if elements.len() <= 1 {
            warn!(source, "API returned no job data");
            return Ok(ParsedBatch::empty());
        }

        Ok(map_elements(
            elements.iter().enumerate().skip(1),
            &self.config,
            &self.fields,
        ))
    }
}

#[async_trait]
impl SourceAdapter for PrefixedArrayAdapter {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_and_parse(&self) -> Result<ParsedBatch> {
        info!(source = %self.config.name, url = %self.config.endpoint, "Fetching jobs from API");
        let body = self.fetcher.fetch(&self.config.endpoint, Accept::Json).await?;
        self.parse(&body)
    }
}

/// Adapter for JSON objects carrying the job list under one key
pub struct WrappedObjectAdapter {
    config: SourceConfig,
    fields: FieldMapping,
    key: String,
    fetcher: HttpFetcher,
}

impl WrappedObjectAdapter {
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        let fields = config.fields();
        let key = match &config.format {
            WireFormat::WrappedObject { key } => key.clone(),
            _ => DEFAULT_WRAPPED_KEY.to_string(),
        };
        Self {
            config,
            fields,
            key,
            fetcher,
        }
    }

    /// Parse a response body; a missing key means no jobs
    pub fn parse(&self, body: &str) -> Result<ParsedBatch> {
        let source = self.config.name.as_str();
        let Some(root) = parse_root(body, source)? else {
            return Ok(ParsedBatch::empty());
        };

        let mut object = match root {
            Value::Object(object) => object,
            other => {
                return Err(IngestError::envelope(
                    source,
                    FORMAT,
                    format!("expected an object, found {}", kind(&other)),
                ))
            },
        };

        let Some(jobs) = object.remove(&self.key) else {
            warn!(source, key = %self.key, "API response missing jobs key");
            return Ok(ParsedBatch::empty());
        };

        let elements = match jobs {
            Value::Array(elements) => elements,
            other => {
                return Err(IngestError::envelope(
                    source,
                    FORMAT,
                    format!("'{}' is {}, expected an array", self.key, kind(&other)),
                ))
            },
        };

        info!(source, count = elements.len(), "API returned jobs");
        Ok(map_elements(
            elements.iter().enumerate(),
            &self.config,
            &self.fields,
        ))
    }
}

#[async_trait]
impl SourceAdapter for WrappedObjectAdapter {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_and_parse(&self) -> Result<ParsedBatch> {
        info!(source = %self.config.name, url = %self.config.endpoint, "Fetching jobs from API");
        let body = self.fetcher.fetch(&self.config.endpoint, Accept::Json).await?;
        self.parse(&body)
    }
}

/// Decode the body; `None` for a blank body
fn parse_root(body: &str, source: &str) -> Result<Option<Value>> {
    let body = body.trim();
    if body.is_empty() {
        warn!(source, "API returned empty response");
        return Ok(None);
    }

    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| IngestError::envelope(source, FORMAT, e))
}

fn map_elements<'a>(
    elements: impl Iterator<Item = (usize, &'a Value)>,
    config: &SourceConfig,
    fields: &FieldMapping,
) -> ParsedBatch {
    let mut batch = ParsedBatch::empty();

    for (index, element) in elements {
        match to_candidate(index, element, config, fields) {
            Ok(candidate) => batch.records.push(candidate),
            Err(e) => {
                warn!(source = %config.name, index, error = %e, "Skipping malformed job");
                batch.malformed += 1;
            },
        }
    }

    batch
}

fn to_candidate(
    index: usize,
    element: &Value,
    config: &SourceConfig,
    fields: &FieldMapping,
) -> Result<CandidateRecord> {
    let object = element.as_object().ok_or_else(|| {
        IngestError::item(index, format!("expected an object, found {}", kind(element)))
    })?;

    let link = text_field(object, &fields.url);

    Ok(CandidateRecord {
        title: text_field(object, &fields.title),
        company: text_field(object, &fields.company),
        url: absolutize(&link, &config.base_url),
        source: config.name.clone(),
    })
}

/// Read a field as trimmed text; missing and null read as ""
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => clean_text(s),
        Some(other) => clean_text(&other.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sources::HttpSettings;
    use serde_json::json;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&HttpSettings::default()).unwrap()
    }

    fn remoteok() -> PrefixedArrayAdapter {
        let config = SourceConfig::new(
            "RemoteOK",
            "https://remoteok.com/api",
            WireFormat::PrefixedArray,
            "https://remoteok.com",
        );
        PrefixedArrayAdapter::new(config, fetcher())
    }

    fn remotive() -> WrappedObjectAdapter {
        let config = SourceConfig::new(
            "Remotive",
            "https://remotive.com/api/remote-jobs",
            WireFormat::WrappedObject {
                key: "jobs".to_string(),
            },
            "https://remotive.com",
        );
        WrappedObjectAdapter::new(config, fetcher())
    }

    #[test]
    fn test_first_element_is_skipped_even_if_it_looks_like_a_job() {
        let body = json!([
            { "position": "Decoy", "company": "Meta Data", "url": "https://remoteok.com/decoy" },
            { "position": "Rust Engineer", "company": "Ferrous", "url": "/remote-jobs/42" }
        ])
        .to_string();

        let batch = remoteok().parse(&body).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].title, "Rust Engineer");
        assert_eq!(batch.records[0].url, "https://remoteok.com/remote-jobs/42");
    }

    #[test]
    fn test_metadata_only_array_yields_nothing() {
        let body = json!([{ "legal": "terms" }]).to_string();
        assert_eq!(remoteok().parse(&body).unwrap(), ParsedBatch::empty());
        assert_eq!(remoteok().parse("[]").unwrap(), ParsedBatch::empty());
    }

    #[test]
    fn test_non_object_elements_are_counted_as_malformed() {
        let body = json!([
            { "legal": "terms" },
            "not a job",
            { "position": " Data Engineer ", "company": "Hooli", "url": "https://remoteok.com/j/7" }
        ])
        .to_string();

        let batch = remoteok().parse(&body).unwrap();
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.records[0].title, "Data Engineer");
    }

    #[test]
    fn test_wrong_root_type_is_envelope_error() {
        let err = remoteok().parse(r#"{"jobs": []}"#).unwrap_err();
        assert!(matches!(err, IngestError::EnvelopeParse { .. }));

        let err = remotive().parse("[1, 2]").unwrap_err();
        assert!(matches!(err, IngestError::EnvelopeParse { .. }));
    }

    #[test]
    fn test_truncated_json_is_envelope_error() {
        let err = remoteok().parse(r#"[{"legal": "terms"}, {"position": "#).unwrap_err();
        assert!(err.escalates());
    }

    #[test]
    fn test_blank_body_is_empty_not_error() {
        assert_eq!(remoteok().parse("  \n").unwrap(), ParsedBatch::empty());
        assert_eq!(remotive().parse("").unwrap(), ParsedBatch::empty());
    }

    #[test]
    fn test_wrapped_object_maps_fields() {
        let body = json!({
            "job-count": 2,
            "jobs": [
                { "title": "Support Lead", "company_name": "Acme", "url": "https://remotive.com/remote-jobs/1" },
                { "title": "PM", "company_name": null, "url": "/remote-jobs/2" }
            ]
        })
        .to_string();

        let batch = remotive().parse(&body).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].company, "Acme");
        assert_eq!(batch.records[1].company, "");
        assert_eq!(batch.records[1].url, "https://remotive.com/remote-jobs/2");
    }

    #[test]
    fn test_missing_key_yields_nothing() {
        let body = json!({ "0-legal-notice": "see terms" }).to_string();
        let batch = remotive().parse(&body).unwrap();
        assert!(batch.records.is_empty());
    }

    #[test]
    fn test_non_array_key_is_envelope_error() {
        let err = remotive().parse(r#"{"jobs": "soon"}"#).unwrap_err();
        assert!(matches!(err, IngestError::EnvelopeParse { .. }));
    }

    #[test]
    fn test_numeric_fields_render_as_text() {
        let body = json!({ "jobs": [ { "title": 404, "company_name": "Acme", "url": "https://a.io" } ] })
            .to_string();
        let batch = remotive().parse(&body).unwrap();
        assert_eq!(batch.records[0].title, "404");
    }
}
