//! Link previews: redirect resolution, Open Graph tags, thumbnail bytes
//!
//! Absent tags are absent values, never errors; only the network layer can
//! fail here, and those failures propagate for the caller to classify.

use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::{PreviewError, Result};

/// Open Graph metadata of a fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub image: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fetch `url`, following redirects to the final URL.
///
/// Returns the resolved URL together with whatever Open Graph tags the page
/// carries. Short-link aliases must be resolved before building an embed;
/// image and video retrieval against the alias host is unreliable.
pub async fn fetch_page_meta(http: &Client, url: &str) -> Result<(String, PageMeta)> {
    let response = http.get(url).send().await.map_err(PreviewError::Http)?;
    let final_url = response.url().to_string();
    let body = response.text().await.map_err(PreviewError::Http)?;

    Ok((final_url, parse_og_tags(&body)))
}

/// Extract `og:image` / `og:title` / `og:description` from an HTML body.
pub fn parse_og_tags(html: &str) -> PageMeta {
    let document = Html::parse_document(html);
    PageMeta {
        image: og_content(&document, "og:image"),
        title: og_content(&document, "og:title"),
        description: og_content(&document, "og:description"),
    }
}

fn og_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content").map(str::to_owned))
}

/// Download an image, reporting its MIME type from the response headers
/// (falling back to `image/jpeg` when the server does not say).
pub async fn download_image(http: &Client, url: &str) -> Result<(Vec<u8>, String)> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(PreviewError::Http)?
        .error_for_status()
        .map_err(PreviewError::Http)?;

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    let bytes = response.bytes().await.map_err(PreviewError::Http)?;
    Ok((bytes.to_vec(), mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta property="og:title" content="Example Title" />
<meta property="og:description" content="An example description" />
<meta property="og:image" content="https://cdn.example.com/preview.jpg" />
</head><body>hi</body></html>"#;

    #[test]
    fn test_parse_og_tags_full() {
        let meta = parse_og_tags(PAGE);
        assert_eq!(meta.title.as_deref(), Some("Example Title"));
        assert_eq!(meta.description.as_deref(), Some("An example description"));
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/preview.jpg"));
    }

    #[test]
    fn test_parse_og_tags_absent_are_none() {
        let meta = parse_og_tags("<html><head><title>plain</title></head></html>");
        assert_eq!(meta, PageMeta::default());
    }

    #[test]
    fn test_parse_og_tags_partial() {
        let html = r#"<head><meta property="og:title" content="Only title"></head>"#;
        let meta = parse_og_tags(html);
        assert_eq!(meta.title.as_deref(), Some("Only title"));
        assert!(meta.image.is_none());
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_parse_og_tags_first_wins() {
        let html = r#"<head>
<meta property="og:image" content="first.jpg">
<meta property="og:image" content="second.jpg">
</head>"#;
        let meta = parse_og_tags(html);
        assert_eq!(meta.image.as_deref(), Some("first.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_page_meta_follows_redirects() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/full", server.uri()).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/full"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let http = Client::new();
        let (final_url, meta) = fetch_page_meta(&http, &format!("{}/short", server.uri()))
            .await
            .unwrap();

        assert_eq!(final_url, format!("{}/full", server.uri()));
        assert_eq!(meta.title.as_deref(), Some("Example Title"));
    }

    #[tokio::test]
    async fn test_fetch_page_meta_network_error_propagates() {
        let http = Client::new();
        // Nothing listens here.
        let result = fetch_page_meta(&http, "http://127.0.0.1:9/page").await;
        assert!(matches!(
            result,
            Err(crate::MirrorError::Preview(PreviewError::Http(_)))
        ));
    }

    #[tokio::test]
    async fn test_download_image_reports_mime() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/preview.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(vec![0x89u8, 0x50, 0x4e, 0x47], "image/png; charset=binary"),
            )
            .mount(&server)
            .await;

        let http = Client::new();
        let (bytes, mime) = download_image(&http, &format!("{}/preview.png", server.uri()))
            .await
            .unwrap();

        assert_eq!(bytes, vec![0x89u8, 0x50, 0x4e, 0x47]);
        assert_eq!(mime, "image/png");
    }

    #[tokio::test]
    async fn test_download_image_defaults_mime() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/raw"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let http = Client::new();
        let (_, mime) = download_image(&http, &format!("{}/raw", server.uri()))
            .await
            .unwrap();
        // wiremock serves octet-stream unless told otherwise; an absent or
        // non-image type still yields a usable default upstream.
        assert!(mime == "image/jpeg" || mime == "application/octet-stream");
    }

    #[tokio::test]
    async fn test_download_image_http_error_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let http = Client::new();
        let result = download_image(&http, &format!("{}/missing.jpg", server.uri())).await;
        assert!(result.is_err());
    }
}
