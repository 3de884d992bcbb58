use crate::error::{Result, ScanError};
use crate::fetch::Fetcher;
use crate::page::Page;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Fetches pages over HTTP and pulls `a[href]` links out of HTML bodies.
///
/// The page `<title>` is used as the content. Links are resolved against the
/// page URL and stripped of fragments but are otherwise left as found.
pub struct HttpFetcher {
    client: Client,
    same_domain_only: bool,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "Arachne/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/trapdoorsec/arachne)"
            ))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            same_domain_only: false,
        })
    }

    /// Drop links whose host differs from (and is not a subdomain of) the
    /// page they were found on.
    pub fn with_same_domain_only(mut self, same_domain_only: bool) -> Self {
        self.same_domain_only = same_domain_only;
        self
    }

    fn extract_page(html: &str, current_url: &str, same_domain_only: bool) -> Result<Page> {
        let document = Html::parse_document(html);

        let link_selector = Selector::parse("a[href]")
            .map_err(|e| ScanError::ParseError(format!("link selector: {}", e)))?;
        let title_selector = Selector::parse("title")
            .map_err(|e| ScanError::ParseError(format!("title selector: {}", e)))?;

        let base_domain = Url::parse(current_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));

        let mut links = Vec::new();
        for element in document.select(&link_selector) {
            if let Some(href) = element.value().attr("href")
                && let Some(absolute_url) = resolve_url(current_url, href)
            {
                if same_domain_only
                    && let Some(ref domain) = base_domain
                    && !is_same_domain(&absolute_url, domain)
                {
                    debug!("  -> Cross-domain, skipping {}", absolute_url);
                    continue;
                }
                links.push(absolute_url);
            }
        }

        let content = document
            .select(&title_selector)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        Ok(Page { content, links })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        debug!("Fetching {}", url);
        Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::HttpStatus(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let body = response.text().await?;
        debug!("Fetched {} in {:?}", url, start.elapsed());

        // Only parse HTML content
        if is_html {
            Self::extract_page(&body, url, self.same_domain_only)
        } else {
            Ok(Page::default())
        }
    }
}

pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut url = base_url.join(href).ok()?;
    url.set_fragment(None);

    Some(url.to_string())
}

pub fn is_same_domain(url: &str, base_domain: &str) -> bool {
    if let Ok(parsed) = Url::parse(url)
        && let Some(host) = parsed.host_str()
    {
        return host == base_domain || host.ends_with(&format!(".{}", base_domain));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_resolve_url() {
        let base = "https://golang.org/pkg/";
        assert_eq!(
            resolve_url(base, "fmt/"),
            Some("https://golang.org/pkg/fmt/".to_string())
        );
        assert_eq!(
            resolve_url(base, "/cmd/#top"),
            Some("https://golang.org/cmd/".to_string())
        );
        assert_eq!(
            resolve_url(base, "https://go.dev/"),
            Some("https://go.dev/".to_string())
        );
        assert_eq!(resolve_url(base, ""), None);
        assert_eq!(resolve_url(base, "#section"), None);
        assert_eq!(resolve_url(base, "mailto:gopher@golang.org"), None);
        assert_eq!(resolve_url(base, "javascript:void(0)"), None);
        assert_eq!(resolve_url(base, "tel:123"), None);
        assert_eq!(resolve_url("not a url", "/x"), None);
    }

    #[test]
    fn test_is_same_domain() {
        assert!(is_same_domain("https://golang.org/pkg/", "golang.org"));
        assert!(is_same_domain("https://blog.golang.org/", "golang.org"));
        assert!(!is_same_domain("https://go.dev/", "golang.org"));
        assert!(!is_same_domain("https://notgolang.org/", "golang.org"));
        assert!(!is_same_domain("garbage", "golang.org"));
    }

    #[test]
    fn test_extract_page_title_and_links() {
        let html = r##"<html><head><title> Packages </title></head><body>
            <a href="/pkg/fmt/">fmt</a>
            <a href="os/#files">os</a>
            <a href="https://go.dev/">go.dev</a>
            <a href="#top">top</a>
            <a>no href</a>
        </body></html>"##;

        let page = HttpFetcher::extract_page(html, "https://golang.org/pkg/", false).unwrap();
        assert_eq!(page.content, "Packages");
        assert_eq!(
            page.links,
            vec![
                "https://golang.org/pkg/fmt/".to_string(),
                "https://golang.org/pkg/os/".to_string(),
                "https://go.dev/".to_string(),
            ]
        );

        let page = HttpFetcher::extract_page(html, "https://golang.org/pkg/", true).unwrap();
        assert_eq!(page.links.len(), 2);
        assert!(page.links.iter().all(|l| l.starts_with("https://golang.org/")));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let mock_server = MockServer::start().await;

        let root_html = format!(
            r#"<html><head><title>Root</title></head><body>
                <a href="{}/page1">Page 1</a>
                <a href="/page2">Page 2</a>
            </body></html>"#,
            mock_server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let page = fetcher
            .fetch(&format!("{}/", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(page.content, "Root");
        assert_eq!(
            page.links,
            vec![
                format!("{}/page1", mock_server.uri()),
                format!("{}/page2", mock_server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_non_html_has_no_links() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_bytes(br#"{"href": "<a href='/x'>x</a>"}"#),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let page = fetcher
            .fetch(&format!("{}/data.json", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(page, Page::default());
    }

    #[tokio::test]
    async fn test_fetch_error_status_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_fails() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }
}
