//! Image resolution: derive a usable image address from an arbitrary URL.
//!
//! Two cases. A URL whose path already ends in a raster-image extension is
//! the image — it is returned unchanged with no HTTP traffic at all. Any
//! other URL is treated as a web page: fetch it with browser-identity
//! headers (plain-client requests get blocked by half the design blogs out
//! there) and take the page's `og:image` social-preview reference, which in
//! practice is the hero shot the post is about.
//!
//! A page without the tag, or a fetch error, is an [`ItemError`] the
//! orchestrator downgrades to a skip.

use crate::error::{CatalogError, ItemError};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

/// Extensions accepted as direct image links and as intake uploads.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// HTTP client with browser-identity headers for page and image fetches.
///
/// The spoofed User-Agent and Accept headers are load-bearing: several
/// popular CDN fronts return 403 to default library user agents.
pub fn browser_client(timeout_secs: u64) -> Result<reqwest::Client, CatalogError> {
    let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                      (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
            .parse()
            .expect("static header value"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        "en-US,en;q=0.5".parse().expect("static header value"),
    );

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| CatalogError::Internal(format!("http client: {e}")))
}

/// Whether the URL's path ends in a known raster-image extension.
///
/// Query strings and fragments are ignored, so
/// `https://cdn.test/room.jpg?w=1200` counts as a direct image link.
pub fn is_direct_image_url(url: &str) -> bool {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        // Not parseable as an absolute URL; fall back to the raw string
        // minus any query suffix.
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase(),
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}

/// Extract the `og:image` content from an HTML document.
pub fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Resolve `url` to the address of the actual image.
///
/// Direct image links pass through untouched; anything else is fetched as a
/// page and its `og:image` reference returned.
pub async fn resolve_image_url(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<String, ItemError> {
    if is_direct_image_url(url) {
        debug!("'{url}' is a direct image link");
        return Ok(url.to_string());
    }

    debug!("fetching page '{url}' for og:image");
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ItemError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ItemError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItemError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let html = response.text().await.map_err(|e| ItemError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    extract_og_image(&html).ok_or_else(|| ItemError::NoPreviewImage {
        url: url.to_string(),
    })
}

/// Download the resolved image's bytes for classification.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<Vec<u8>, ItemError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ItemError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ItemError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItemError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let bytes = response.bytes().await.map_err(|e| ItemError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_image_urls_pass_the_extension_check() {
        assert!(is_direct_image_url("https://cdn.test/room.jpg"));
        assert!(is_direct_image_url("https://cdn.test/ROOM.JPEG"));
        assert!(is_direct_image_url("https://cdn.test/a/b/c.png"));
        assert!(is_direct_image_url("https://cdn.test/shot.webp"));
        assert!(is_direct_image_url("https://cdn.test/room.jpg?w=1200&q=80"));
    }

    #[test]
    fn page_urls_are_not_direct_images() {
        assert!(!is_direct_image_url("https://blog.test/posts/oak-chair"));
        assert!(!is_direct_image_url("https://blog.test/gallery.html"));
        assert!(!is_direct_image_url("https://cdn.test/archive.jpg.zip"));
    }

    #[tokio::test]
    async fn direct_image_resolves_without_http() {
        // The client points nowhere routable; the fast path must not touch it.
        let client = browser_client(1).unwrap();
        let url = "https://cdn.test/room.jpg";
        let resolved = resolve_image_url(&client, url, 1).await.unwrap();
        assert_eq!(resolved, url);
    }

    #[test]
    fn og_image_is_extracted_exactly() {
        let html = r#"<html><head>
            <meta property="og:title" content="A Post">
            <meta property="og:image" content="https://cdn.test/hero.jpg">
            </head><body></body></html>"#;
        assert_eq!(
            extract_og_image(html).as_deref(),
            Some("https://cdn.test/hero.jpg")
        );
    }

    #[test]
    fn missing_or_empty_og_image_yields_none() {
        let no_tag = "<html><head><title>x</title></head><body></body></html>";
        assert!(extract_og_image(no_tag).is_none());

        let empty = r#"<html><head><meta property="og:image" content=""></head></html>"#;
        assert!(extract_og_image(empty).is_none());
    }

    #[test]
    fn first_nonempty_og_image_wins() {
        let html = r#"<head>
            <meta property="og:image" content="">
            <meta property="og:image" content="https://cdn.test/first.jpg">
            <meta property="og:image" content="https://cdn.test/second.jpg">
            </head>"#;
        assert_eq!(
            extract_og_image(html).as_deref(),
            Some("https://cdn.test/first.jpg")
        );
    }
}
