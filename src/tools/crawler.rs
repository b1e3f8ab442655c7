//! Single-page crawler: fetch a URL and extract readable text.

use crate::types::{AppError, Result};
use scraper::{Html, Selector};
use std::time::Duration;

/// Content tags worth keeping when flattening a page to text.
const CONTENT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, td, th, pre, blockquote";

/// Cap on extracted characters so one giant page cannot blow up the
/// synthesis context.
const MAX_CONTENT_CHARS: usize = 8000;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Crawler {
    client: reqwest::Client,
}

impl Crawler {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("prism-worker/0.3 research crawler")
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetch one page and return its visible text, truncated.
    pub async fn crawl(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Tool(format!("fetch failed for {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Tool(format!("{} returned {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Tool(format!("body read failed for {}: {}", url, e)))?;

        Ok(extract_text(&body))
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(CONTENT_SELECTOR) else {
        return String::new();
    };

    let mut text = String::new();
    for element in document.select(&selector) {
        let fragment: String = element.text().collect::<Vec<_>>().join(" ");
        let fragment = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&fragment);
        if text.len() >= MAX_CONTENT_CHARS {
            break;
        }
    }

    if text.len() > MAX_CONTENT_CHARS {
        let mut cut = MAX_CONTENT_CHARS;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_text_keeps_content_drops_script() {
        let html = r#"
            <html><head><script>var x = "should not appear";</script></head>
            <body>
                <h1>Title</h1>
                <p>First   paragraph
                with broken whitespace.</p>
                <style>.hidden { display: none; }</style>
                <li>An item</li>
            </body></html>
        "#;
        let text = extract_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph with broken whitespace."));
        assert!(text.contains("An item"));
        assert!(!text.contains("should not appear"));
        assert!(!text.contains("display: none"));
    }

    #[test]
    fn test_extract_text_truncates_long_pages() {
        let paragraph = format!("<p>{}</p>", "word ".repeat(5000));
        let text = extract_text(&format!("<html><body>{}</body></html>", paragraph));
        assert!(text.len() <= MAX_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn test_crawl_fetches_and_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>The actual content.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let crawler = Crawler::new();
        let content = crawler.crawl(&format!("{}/article", server.uri())).await.unwrap();
        assert_eq!(content, "The actual content.");
    }

    #[tokio::test]
    async fn test_crawl_http_error_is_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let crawler = Crawler::new();
        let err = crawler.crawl(&format!("{}/missing", server.uri())).await.unwrap_err();
        assert!(matches!(err, AppError::Tool(_)));
    }
}
