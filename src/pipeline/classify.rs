//! Classifier client: send an image to the vision service, parse its reply.
//!
//! The service boundary is deliberately narrow. [`VisionClassifier`] is
//! "image in, raw text out" — transport only. Turning that free-form text
//! into a [`Classification`] is a separate pure function,
//! [`parse_classification`], so the parsing rules are unit-testable and the
//! whole service can be swapped or mocked without touching pipeline logic.
//!
//! Every failure on this path is soft: a dead service, a timeout, or an
//! unparseable reply skips the item, writes no catalog entry, and lets the
//! batch continue.

use crate::catalog::CatalogRecord;
use crate::error::{CatalogError, ItemError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Image bytes plus MIME type, ready for a multimodal request body.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImagePayload {
    /// JPEG payload (the normalizer's output format).
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/jpeg".to_string(),
        }
    }

    /// Guess the MIME type from a filename extension, defaulting to JPEG.
    pub fn from_bytes_named(bytes: Vec<u8>, name: &str) -> Self {
        let mime = match name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Self {
            bytes,
            mime: mime.to_string(),
        }
    }
}

/// The transport seam to the external classification service.
///
/// Implementations submit the image with the fixed instruction and return
/// the service's raw textual reply. `label` is a human-readable item name
/// used only for logging and error messages.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    async fn describe(&self, image: &ImagePayload, label: &str) -> Result<String, ItemError>;
}

// ── Gemini REST implementation ───────────────────────────────────────────

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default classifier: Google Gemini `generateContent` over plain REST.
pub struct GeminiClassifier {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClassifier {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs,
        })
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl VisionClassifier for GeminiClassifier {
    async fn describe(&self, image: &ImagePayload, label: &str) -> Result<String, ItemError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: crate::prompts::CLASSIFY_PROMPT.to_string(),
                    },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: image.mime.clone(),
                            data: STANDARD.encode(&image.bytes),
                        },
                    },
                ],
            }],
        };

        debug!("classifying '{}' ({} bytes, {})", label, image.bytes.len(), image.mime);

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ItemError::Timeout {
                    url: format!("{}/models/{}", self.base_url, self.model),
                    secs: self.timeout_secs,
                }
            } else {
                ItemError::Classifier {
                    label: label.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemError::Classifier {
                label: label.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| ItemError::Classifier {
            label: label.to_string(),
            reason: format!("response body: {e}"),
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ItemError::Classifier {
                label: label.to_string(),
                reason: "empty reply".to_string(),
            });
        }

        Ok(text)
    }
}

// ── Reply parsing ────────────────────────────────────────────────────────

/// Parsed classifier reply. All fields optional; the caller fills gaps with
/// placeholders when building the catalog record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default)]
    pub vibe: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    /// Combined pipe-delimited string (legacy prompt variant).
    #[serde(default)]
    pub tags: Option<String>,
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip any outer code fence the service wrapped around its reply.
fn strip_code_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input.trim(),
    }
}

/// Parse the classifier's free-form reply into a [`Classification`].
///
/// Best-effort by design: strips code fences, then tries the whole text as
/// JSON, then falls back to the outermost `{…}` slice in case the model
/// prefixed prose. Returns `None` when nothing parses — the caller skips
/// the item.
pub fn parse_classification(raw: &str) -> Option<Classification> {
    let text = strip_code_fences(raw);

    if let Ok(c) = serde_json::from_str::<Classification>(text) {
        return Some(c);
    }

    // Some replies prefix commentary ("Here is the JSON: {…}").
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Classification>(&text[start..=end]) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("classifier reply did not parse: {e}");
            None
        }
    }
}

impl Classification {
    /// Build the catalog record, defaulting missing fields to placeholders.
    ///
    /// Replies carrying any of the split fields produce the split record
    /// shape; otherwise the legacy combined `tags` shape is used.
    pub fn into_record(self, img: impl Into<String>) -> CatalogRecord {
        let nonempty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let title = nonempty(self.title).unwrap_or_else(|| "Untitled Space".to_string());

        let space = nonempty(self.space);
        let vibe = nonempty(self.vibe);
        let detail = nonempty(self.detail);

        if space.is_some() || vibe.is_some() || detail.is_some() {
            CatalogRecord {
                title,
                space: Some(space.unwrap_or_else(|| "Space".to_string())),
                vibe: Some(vibe.unwrap_or_else(|| "Style".to_string())),
                detail: Some(detail.unwrap_or_else(|| "Detail".to_string())),
                tags: None,
                img: img.into(),
            }
        } else {
            CatalogRecord {
                title,
                space: None,
                vibe: None,
                detail: None,
                tags: Some(
                    nonempty(self.tags).unwrap_or_else(|| "Design | Global".to_string()),
                ),
                img: img.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str =
        r#"{"title": "Oak Chair Nook", "space": "Home", "vibe": "Minimalist", "detail": "Wood & White"}"#;

    #[test]
    fn plain_json_parses() {
        let c = parse_classification(REPLY).unwrap();
        assert_eq!(c.title.as_deref(), Some("Oak Chair Nook"));
        assert_eq!(c.space.as_deref(), Some("Home"));
    }

    #[test]
    fn fenced_json_parses_same_as_plain() {
        let fenced = format!("```json\n{REPLY}\n```");
        assert_eq!(parse_classification(&fenced), parse_classification(REPLY));

        let bare_fence = format!("```\n{REPLY}\n```");
        assert_eq!(parse_classification(&bare_fence), parse_classification(REPLY));
    }

    #[test]
    fn prose_prefixed_json_parses() {
        let noisy = format!("Sure, here is the JSON you asked for:\n{REPLY}");
        let c = parse_classification(&noisy).unwrap();
        assert_eq!(c.vibe.as_deref(), Some("Minimalist"));
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_classification("I cannot classify this image.").is_none());
        assert!(parse_classification("").is_none());
        assert!(parse_classification("{broken json").is_none());
    }

    #[test]
    fn legacy_tags_reply_parses() {
        let c = parse_classification(
            r#"{"title": "Cozy Nordic Living Room", "tags": "Home | Wood | Beige | Sweden"}"#,
        )
        .unwrap();
        assert_eq!(c.tags.as_deref(), Some("Home | Wood | Beige | Sweden"));
        assert!(c.space.is_none());
    }

    #[test]
    fn record_defaults_missing_split_fields() {
        let c = parse_classification(r#"{"title": "Bare", "space": "Cafe"}"#).unwrap();
        let r = c.into_record("images/x.jpg");
        assert_eq!(r.space.as_deref(), Some("Cafe"));
        assert_eq!(r.vibe.as_deref(), Some("Style"));
        assert_eq!(r.detail.as_deref(), Some("Detail"));
        assert!(r.tags.is_none());
        assert_eq!(r.img, "images/x.jpg");
    }

    #[test]
    fn record_defaults_to_legacy_shape_when_no_split_fields() {
        let r = Classification::default().into_record("https://cdn.test/a.jpg");
        assert_eq!(r.title, "Untitled Space");
        assert_eq!(r.tags.as_deref(), Some("Design | Global"));
        assert!(r.space.is_none());
    }

    #[test]
    fn mime_guess_from_filename() {
        assert_eq!(ImagePayload::from_bytes_named(vec![], "a.PNG").mime, "image/png");
        assert_eq!(ImagePayload::from_bytes_named(vec![], "b.webp").mime, "image/webp");
        assert_eq!(ImagePayload::from_bytes_named(vec![], "c.jpeg").mime, "image/jpeg");
        assert_eq!(ImagePayload::from_bytes_named(vec![], "noext").mime, "image/jpeg");
    }

    // ── REST transport against a local stub endpoint ─────────────────────

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: answers the first request with `status` and
    /// `body`, then hands the raw request back for assertions.
    async fn stub_endpoint(
        status: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];

            let (headers_end, content_length) = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed before sending a full request");
                raw.extend_from_slice(&chunk[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..pos]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    break (pos + 4, len);
                }
            };
            while raw.len() < headers_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed mid-body");
                raw.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn describe_round_trips_through_the_rest_endpoint() {
        let reply = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "{\"title\": \"Stub " },
                        { "text": "Room\", \"space\": \"Home\"}" }
                    ]
                }
            }]
        })
        .to_string();
        let (base_url, server) = stub_endpoint("200 OK", reply).await;

        let classifier = GeminiClassifier::new("test-key", "gemini-1.5-flash", 5)
            .unwrap()
            .with_base_url(base_url);
        let image = ImagePayload::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        let raw = classifier.describe(&image, "stub item").await.unwrap();
        let request = server.await.unwrap();

        // Request line: model path and key as query parameter.
        assert!(
            request.starts_with("POST /models/gemini-1.5-flash:generateContent?key=test-key "),
            "got: {}",
            request.lines().next().unwrap_or("")
        );

        // Body shape: instruction text first, snake_case inline_data second.
        let body_start = request.find("\r\n\r\n").unwrap() + 4;
        let body: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], crate::prompts::CLASSIFY_PROMPT);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(
            parts[1]["inline_data"]["data"],
            STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])
        );

        // Multi-part reply text is concatenated, then parses as usual.
        let c = parse_classification(&raw).unwrap();
        assert_eq!(c.title.as_deref(), Some("Stub Room"));
        assert_eq!(c.space.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn describe_maps_http_error_status_to_classifier_error() {
        let (base_url, server) = stub_endpoint("503 Service Unavailable", "{}".to_string()).await;

        let classifier = GeminiClassifier::new("test-key", "gemini-1.5-flash", 5)
            .unwrap()
            .with_base_url(base_url);
        let image = ImagePayload::jpeg(vec![1, 2, 3]);
        let err = classifier.describe(&image, "busy item").await.unwrap_err();
        server.await.unwrap();

        match err {
            ItemError::Classifier { label, reason } => {
                assert_eq!(label, "busy item");
                assert!(reason.contains("503"), "got: {reason}");
            }
            other => panic!("expected Classifier error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn describe_rejects_reply_without_candidate_text() {
        let (base_url, server) =
            stub_endpoint("200 OK", r#"{"candidates": []}"#.to_string()).await;

        let classifier = GeminiClassifier::new("test-key", "gemini-1.5-flash", 5)
            .unwrap()
            .with_base_url(base_url);
        let image = ImagePayload::jpeg(vec![1, 2, 3]);
        let err = classifier.describe(&image, "silent item").await.unwrap_err();
        server.await.unwrap();

        assert!(
            matches!(err, ItemError::Classifier { ref reason, .. } if reason.contains("empty")),
            "got: {err}"
        );
    }
}
