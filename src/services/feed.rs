// src/services/feed.rs

//! Bulk plugin feed reader.
//!
//! The feed is a gzip-compressed XML listing of NASL records:
//!
//! ```text
//! <nasl_plugins>
//!   <nasl>
//!     <script_id>10001</script_id>
//!     <script_name>...</script_name>
//!     ...
//!   </nasl>
//!   ...
//! </nasl_plugins>
//! ```
//!
//! Records are the children of the root element. The document is read as a
//! stream of events and never held as a tree; only `script_id` is kept.

use std::io::BufRead;
use std::time::Duration;

use flate2::bufread::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, KEY_FIELD, PluginId};
use crate::utils::http;

/// Nesting level of a NASL record (root element is level 1).
pub const RECORD_DEPTH: usize = 2;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Result of scanning the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedScan {
    /// Fetchable identifiers, in document order
    pub ids: Vec<PluginId>,
    /// Records seen at [`RECORD_DEPTH`]
    pub records: usize,
    /// Records skipped for lacking a usable `script_id`
    pub malformed: usize,
    /// Valid identifiers outside the fetchable ranges
    pub excluded: usize,
}

impl FeedScan {
    fn finish(&mut self, record: NaslRecord) {
        self.records += 1;

        let id = if record.fields == 0 || record.unreadable {
            None
        } else {
            record.script_id.as_deref().and_then(|s| s.parse::<PluginId>().ok())
        };

        match id {
            Some(id) if id.is_fetchable() => self.ids.push(id),
            Some(_) => self.excluded += 1,
            None => {
                self.malformed += 1;
                log::debug!(
                    "Skipping malformed feed record #{} (script_id: {:?})",
                    self.records,
                    record.script_id
                );
            }
        }
    }
}

/// Fields gathered for the record currently open.
#[derive(Debug, Default)]
struct NaslRecord {
    /// Child elements seen; zero means a text-only or empty record
    fields: usize,
    script_id: Option<String>,
    unreadable: bool,
}

impl NaslRecord {
    /// Start a `script_id` element; a second one makes the record unusable.
    fn open_key(&mut self) {
        if self.script_id.is_some() {
            self.unreadable = true;
        }
        self.script_id.get_or_insert_with(String::new);
    }
}

/// Scan feed bytes, decompressing them first when they are gzip.
///
/// Bytes that already went through `Content-Encoding: gzip` decoding in the
/// HTTP client are read as plain XML.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedScan> {
    if bytes.starts_with(&GZIP_MAGIC) {
        scan(std::io::BufReader::new(GzDecoder::new(bytes)))
    } else {
        scan(bytes)
    }
}

/// Scan an XML document and collect fetchable identifiers.
pub fn scan<R: BufRead>(input: R) -> Result<FeedScan> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut result = FeedScan::default();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut record: Option<NaslRecord> = None;
    let mut in_key = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                if depth == RECORD_DEPTH {
                    record = Some(NaslRecord::default());
                } else if depth == RECORD_DEPTH + 1 {
                    if let Some(rec) = record.as_mut() {
                        rec.fields += 1;
                        in_key = e.local_name().as_ref() == KEY_FIELD.as_bytes();
                        if in_key {
                            rec.open_key();
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if depth + 1 == RECORD_DEPTH {
                    result.finish(NaslRecord::default());
                } else if depth == RECORD_DEPTH {
                    if let Some(rec) = record.as_mut() {
                        rec.fields += 1;
                        if e.local_name().as_ref() == KEY_FIELD.as_bytes() {
                            rec.open_key();
                        }
                    }
                }
            }
            Event::Text(t) if in_key && depth == RECORD_DEPTH + 1 => {
                if let Some(rec) = record.as_mut() {
                    match t.unescape() {
                        Ok(text) => rec.script_id.get_or_insert_with(String::new).push_str(&text),
                        Err(_) => rec.unreadable = true,
                    }
                }
            }
            Event::CData(c) if in_key && depth == RECORD_DEPTH + 1 => {
                if let Some(rec) = record.as_mut() {
                    rec.script_id
                        .get_or_insert_with(String::new)
                        .push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if depth == RECORD_DEPTH + 1 {
                    in_key = false;
                } else if depth == RECORD_DEPTH {
                    if let Some(rec) = record.take() {
                        result.finish(rec);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 || record.is_some() {
                    return Err(AppError::feed(format!(
                        "document ended with {depth} element(s) still open"
                    )));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

/// Downloads and scans the bulk feed.
pub struct FeedReader {
    client: Client,
    url: String,
    timeout: Duration,
}

impl FeedReader {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            url: config.endpoints.feed_url.clone(),
            timeout: Duration::from_secs(config.crawler.feed_timeout_secs),
        }
    }

    /// Download the whole feed into memory.
    pub async fn download(&self) -> Result<Vec<u8>> {
        http::fetch_bytes(&self.client, &self.url, self.timeout)
            .await
            .map_err(|e| AppError::feed(format!("download of {} failed: {}", self.url, e)))
    }

    /// Download the feed and scan it off the async runtime.
    pub async fn read(&self) -> Result<FeedScan> {
        let bytes = self.download().await?;
        log::info!("Parsing plugin feed ({} bytes)", bytes.len());

        tokio::task::spawn_blocking(move || parse_feed(&bytes))
            .await
            .map_err(|e| AppError::feed(format!("feed parser task failed: {e}")))?
            .map_err(|e| AppError::feed(format!("feed is not readable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gzip(xml: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn record(script_id: &str) -> String {
        format!(
            "<nasl><script_id>{script_id}</script_id><script_name>Plugin {script_id}</script_name></nasl>"
        )
    }

    fn feed(records: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<nasl_plugins>\n{}\n</nasl_plugins>",
            records.join("\n")
        )
    }

    fn ids(scan: &FeedScan) -> Vec<u32> {
        scan.ids.iter().map(|id| id.get()).collect()
    }

    #[test]
    fn test_filters_and_skips_malformed() {
        let xml = feed(&[
            record("5000"),
            record("10001"),
            record("600000"),
            record("not-a-number-record"),
        ]);

        let scan = parse_feed(&gzip(&xml)).unwrap();
        assert_eq!(ids(&scan), vec![10001]);
        assert_eq!(scan.records, 4);
        assert_eq!(scan.excluded, 2);
        assert_eq!(scan.malformed, 1);
    }

    #[test]
    fn test_keeps_document_order() {
        let xml = feed(&[record("117291"), record("10001"), record("99000")]);
        let scan = parse_feed(&gzip(&xml)).unwrap();
        assert_eq!(ids(&scan), vec![117291, 10001, 99000]);
    }

    #[test]
    fn test_non_key_value_records_are_skipped() {
        let xml = feed(&[
            "<nasl>just text</nasl>".to_string(),
            "<nasl/>".to_string(),
            "<nasl><script_name>no id</script_name></nasl>".to_string(),
            "<nasl><script_id/></nasl>".to_string(),
            record("20000"),
        ]);

        let scan = parse_feed(&gzip(&xml)).unwrap();
        assert_eq!(ids(&scan), vec![20000]);
        assert_eq!(scan.records, 5);
        assert_eq!(scan.malformed, 4);
    }

    #[test]
    fn test_ignores_nested_script_ids() {
        let xml = feed(&[
            "<nasl><script_id>30000</script_id><xrefs><script_id>40000</script_id></xrefs></nasl>"
                .to_string(),
        ]);
        let scan = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(ids(&scan), vec![30000]);
    }

    #[test]
    fn test_plain_xml_and_cdata() {
        let xml = feed(&["<nasl><script_id><![CDATA[ 45000 ]]></script_id></nasl>".to_string()]);
        let scan = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(ids(&scan), vec![45000]);
    }

    #[test]
    fn test_broken_document_is_an_error() {
        // gzip magic followed by an unsupported compression method
        let corrupt = [0x1f, 0x8b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x01];
        assert!(parse_feed(&corrupt).is_err());

        assert!(parse_feed(b"<nasl_plugins><nasl></wrong></nasl_plugins>").is_err());
    }

    #[test]
    fn test_repeated_script_id_is_malformed() {
        let xml = feed(&[
            "<nasl><script_id>10001</script_id><script_id>2</script_id></nasl>".to_string(),
            "<nasl><script_id/><script_id>10003</script_id></nasl>".to_string(),
            record("10004"),
        ]);

        let scan = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(ids(&scan), vec![10004]);
        assert_eq!(scan.malformed, 2);
    }

    #[test]
    fn test_truncated_document_is_an_error() {
        let truncated = "<nasl_plugins><nasl><script_id>10001</script_id></nasl>\
                         <nasl><script_id>10002</script_id>";
        let err = parse_feed(truncated.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Feed(_)));

        // unclosed root after the last complete record
        let open_root = "<nasl_plugins><nasl><script_id>10001</script_id></nasl>";
        assert!(parse_feed(&gzip(open_root)).is_err());
    }

    #[tokio::test]
    async fn test_reader_downloads_and_parses() {
        let server = MockServer::start().await;
        let body = gzip(&feed(&[record("10001"), record("500001")]));
        Mock::given(method("GET"))
            .and(path("/plugins_rba.xml.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.endpoints.feed_url = format!("{}/plugins_rba.xml.gz", server.uri());
        let reader = FeedReader::new(&config, Client::new());

        let scan = reader.read().await.unwrap();
        assert_eq!(ids(&scan), vec![10001]);
        assert_eq!(scan.excluded, 1);
    }

    #[tokio::test]
    async fn test_reader_download_failure_is_feed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.endpoints.feed_url = format!("{}/plugins_rba.xml.gz", server.uri());
        let reader = FeedReader::new(&config, Client::new());

        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, AppError::Feed(_)));
        assert!(err.is_fatal());
    }
}
