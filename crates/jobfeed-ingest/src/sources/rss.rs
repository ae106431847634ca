//! RSS feed source
//!
//! Reads `<item>` elements from an RSS 2.0 document. Only direct children of
//! an item are mapped, by qualified name (`dc:creator` but not `media:title`
//! for a `title` mapping); text of nested markup inside a mapped field is kept.
//! When an item has no creator, the title is split on its first colon
//! ("Acme Corp: Backend Engineer") to recover the company.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{info, warn};

use super::{
    clean_text, Accept, CandidateRecord, FieldMapping, HttpFetcher, ParsedBatch, SourceAdapter,
    SourceConfig,
};
use crate::error::{IngestError, Result};

const FORMAT: &str = "rss";

/// Adapter for RSS feeds
pub struct RssAdapter {
    config: SourceConfig,
    fields: FieldMapping,
    fetcher: HttpFetcher,
}

impl RssAdapter {
    pub fn new(config: SourceConfig, fetcher: HttpFetcher) -> Self {
        let fields = config.fields();
        Self {
            config,
            fields,
            fetcher,
        }
    }

    /// Parse a feed document into candidate records
    pub fn parse(&self, body: &str) -> Result<ParsedBatch> {
        let source = self.config.name.as_str();
        let items = read_items(body, &self.fields)
            .map_err(|message| IngestError::envelope(source, FORMAT, message))?;

        if items.is_empty() {
            warn!(source, "No job items found in feed");
            return Ok(ParsedBatch::empty());
        }

        let mut batch = ParsedBatch::empty();
        for (index, item) in items.into_iter().enumerate() {
            match item.into_candidate(index, source) {
                Ok(candidate) => batch.records.push(candidate),
                Err(e) => {
                    warn!(source, index, error = %e, "Skipping malformed feed item");
                    batch.malformed += 1;
                },
            }
        }

        Ok(batch)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_and_parse(&self) -> Result<ParsedBatch> {
        info!(source = %self.config.name, url = %self.config.endpoint, "Fetching feed");
        let body = self.fetcher.fetch(&self.config.endpoint, Accept::Any).await?;
        self.parse(&body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Creator,
}

#[derive(Debug, Default)]
struct FeedItem {
    title: String,
    link: String,
    creator: String,
    error: Option<String>,
}

impl FeedItem {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Creator => &mut self.creator,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(text);
    }

    fn into_candidate(self, index: usize, source: &str) -> Result<CandidateRecord> {
        if let Some(message) = self.error {
            return Err(IngestError::item(index, message));
        }

        let mut title = clean_text(&self.title);
        let mut company = clean_text(&self.creator);
        let url = clean_text(&self.link);

        if company.is_empty() {
            if let Some((left, right)) = title.split_once(':') {
                company = left.trim().to_string();
                title = right.trim().to_string();
            }
        }

        Ok(CandidateRecord {
            title,
            company,
            url,
            source: source.to_string(),
        })
    }
}

fn field_for(name: &[u8], fields: &FieldMapping) -> Option<Field> {
    if name == fields.title.as_bytes() {
        Some(Field::Title)
    } else if name == fields.url.as_bytes() {
        Some(Field::Link)
    } else if name == fields.company.as_bytes() {
        Some(Field::Creator)
    } else {
        None
    }
}

/// Collect the raw items; `Err` means the document itself is not well-formed
fn read_items(body: &str, fields: &FieldMapping) -> std::result::Result<Vec<FeedItem>, String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    // open elements below the current <item>
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if current.is_some() {
                    depth += 1;
                    if depth == 1 {
                        field = field_for(e.name().as_ref(), fields);
                    }
                } else if e.local_name().as_ref() == b"item" {
                    current = Some(FeedItem::default());
                    field = None;
                    depth = 0;
                }
            },
            Ok(Event::End(_)) => {
                if current.is_some() {
                    if depth == 0 {
                        if let Some(item) = current.take() {
                            items.push(item);
                        }
                    } else {
                        depth -= 1;
                    }
                    if depth == 0 {
                        field = None;
                    }
                }
            },
            Ok(Event::Text(text)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    match text.unescape() {
                        Ok(value) => item.push(f, &value),
                        Err(e) => item.error = Some(e.to_string()),
                    }
                }
            },
            Ok(Event::CData(data)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.push(f, &String::from_utf8_lossy(&data));
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("at byte {}: {}", reader.buffer_position(), e));
            },
            Ok(_) => {},
        }
    }

    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sources::{HttpSettings, WireFormat};

    fn adapter() -> RssAdapter {
        let config = SourceConfig::new(
            "We Work Remotely",
            "https://weworkremotely.com/remote-jobs.rss",
            WireFormat::Rss,
            "https://weworkremotely.com",
        );
        RssAdapter::new(config, HttpFetcher::new(&HttpSettings::default()).unwrap())
    }

    fn feed(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:media="http://search.yahoo.com/mrss/" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>We Work Remotely: Remote jobs</title>
    <link>https://weworkremotely.com</link>
    {items}
  </channel>
</rss>"#
        )
    }

    #[test]
    fn test_title_split_when_creator_blank() {
        let body = feed(
            r#"<item>
                <title>Acme Corp: Backend Engineer</title>
                <link>https://weworkremotely.com/jobs/1</link>
            </item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].company, "Acme Corp");
        assert_eq!(batch.records[0].title, "Backend Engineer");
        assert_eq!(batch.records[0].source, "We Work Remotely");
    }

    #[test]
    fn test_creator_wins_over_title_split() {
        let body = feed(
            r#"<item>
                <title>Ops: Site Reliability</title>
                <dc:creator><![CDATA[ Initech ]]></dc:creator>
                <link>https://weworkremotely.com/jobs/2</link>
            </item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        let record = &batch.records[0];
        assert_eq!(record.company, "Initech");
        assert_eq!(record.title, "Ops: Site Reliability");
    }

    #[test]
    fn test_channel_level_fields_are_ignored() {
        let batch = adapter().parse(&feed("")).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.malformed, 0);
    }

    #[test]
    fn test_entities_and_order_preserved() {
        let body = feed(
            r#"<item><title>Smith &amp; Co: Designer</title><link>https://a.io/1</link></item>
               <item><title>Globex: QA</title><link>https://a.io/2</link></item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        let urls: Vec<_> = batch.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://a.io/1", "https://a.io/2"]);
        assert_eq!(batch.records[0].company, "Smith & Co");
    }

    #[test]
    fn test_bad_entity_skips_only_that_item() {
        let body = feed(
            r#"<item><title>Broken &bogus; title</title><link>https://a.io/1</link></item>
               <item><title>Globex: QA</title><link>https://a.io/2</link></item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].url, "https://a.io/2");
    }

    #[test]
    fn test_mismatched_tags_are_envelope_errors() {
        let err = adapter()
            .parse("<rss><channel><item><title>x</item></channel></rss>")
            .unwrap_err();
        assert!(matches!(err, IngestError::EnvelopeParse { format: "rss", .. }));
        assert!(err.escalates());
    }

    #[test]
    fn test_nested_markup_keeps_all_field_text() {
        let body = feed(
            r#"<item>
                <title>Acme: Senior <b>Rust</b> Engineer</title>
                <link>https://weworkremotely.com/jobs/3</link>
            </item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        assert_eq!(batch.records[0].company, "Acme");
        assert_eq!(batch.records[0].title, "Senior Rust Engineer");
    }

    #[test]
    fn test_only_direct_children_with_exact_names_are_mapped() {
        let body = feed(
            r#"<item>
                <title>Globex: QA Lead</title>
                <media:content url="https://cdn.example.com/logo.png">
                    <media:title>Globex logo</media:title>
                    <title>Nested title</title>
                </media:content>
                <media:title>Thumbnail</media:title>
                <link>https://weworkremotely.com/jobs/4</link>
                <atom:link>https://weworkremotely.com/self</atom:link>
            </item>"#,
        );

        let batch = adapter().parse(&body).unwrap();
        let record = &batch.records[0];
        assert_eq!(record.company, "Globex");
        assert_eq!(record.title, "QA Lead");
        assert_eq!(record.url, "https://weworkremotely.com/jobs/4");
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        let batch = adapter().parse("").unwrap();
        assert_eq!(batch, ParsedBatch::empty());
    }
}
