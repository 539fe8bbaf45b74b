// Some sites reject clients that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues exactly one request per call; no retries. An audit favors speed
/// over resilience, so a single failed attempt is terminal for that URL.
#[derive(Clone)]
struct Fetcher {
    client: reqwest::Client,
    cache: TtlCache<Result<FetchedPage, FetchError>>,
}

impl Fetcher {
    fn new(
        timeout: Duration,
        user_agent: Option<&str>,
        cache_ttl: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(BROWSER_USER_AGENT))
            .build()
            .map_err(|e| format!("failed to build http client: {e}"))?;
        Ok(Self {
            client,
            cache: TtlCache::new(cache_ttl),
        })
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(outcome) = self.cache.get(url) {
            debug!(url, "fetch served from cache");
            return outcome;
        }
        let outcome = self.fetch_uncached(url).await;
        self.cache.put(url, outcome.clone());
        outcome
    }

    async fn fetch_uncached(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_request_error)?;
        let status = response.status().as_u16();
        let content_type = header_str(response.headers(), reqwest::header::CONTENT_TYPE);
        let server = header_str(response.headers(), reqwest::header::SERVER);
        if !(200..=299).contains(&status) {
            return Err(FetchError::HttpStatus(status));
        }
        let body = response.text().await.map_err(classify_request_error)?;
        Ok(FetchedPage {
            status,
            body,
            content_type,
            server,
            response_time_ms: started.elapsed().as_millis(),
        })
    }

    /// Lightweight existence check. Returns the bare status code so the
    /// caller can treat a 404 as a finding rather than a failure.
    async fn head_status(&self, url: &str) -> Result<u16, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(classify_request_error)?;
        Ok(response.status().as_u16())
    }

    async fn probe_get_ok(&self, url: &str) -> bool {
        self.client
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|res| res.status().as_u16() == 200)
            .unwrap_or(false)
    }

    async fn probe_head_ok(&self, url: &str) -> bool {
        self.client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|res| res.status().as_u16() == 200)
            .unwrap_or(false)
    }
}

fn classify_request_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn header_str(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn site_origin(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{host}{port}", url.scheme()))
}

/// Presence is inferred purely from a 200 status, matching how crawlers
/// treat these well-known paths.
async fn probe_site(fetcher: &Fetcher, seed_url: &str) -> SiteProbe {
    let https = seed_url.starts_with("https://");
    let Some(origin) = Url::parse(seed_url).ok().as_ref().and_then(site_origin) else {
        return SiteProbe {
            https,
            robots_txt: false,
            sitemap_xml: false,
        };
    };
    let robots_txt = fetcher.probe_get_ok(&format!("{origin}/robots.txt")).await;
    let sitemap_xml = fetcher
        .probe_head_ok(&format!("{origin}/sitemap.xml"))
        .await;
    SiteProbe {
        https,
        robots_txt,
        sitemap_xml,
    }
}

#[cfg(test)]
mod fetch_tests {
    use super::*;

    fn test_fetcher(cache_ttl: Duration) -> Fetcher {
        Fetcher::new(Duration::from_secs(5), None, cache_ttl).unwrap()
    }

    #[tokio::test]
    async fn fetch_returns_body_and_headers_on_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_header("server", "nginx")
            .with_body("<html><title>Hi</title></html>")
            .create_async()
            .await;

        let fetcher = test_fetcher(Duration::ZERO);
        let page = fetcher.fetch(&format!("{}/", server.url())).await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.body.contains("<title>Hi</title>"));
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(page.server.as_deref(), Some("nginx"));
    }

    #[tokio::test]
    async fn fetch_classifies_non_2xx_as_status_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = test_fetcher(Duration::ZERO);
        let err = fetcher
            .fetch(&format!("{}/gone", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(404));
    }

    #[tokio::test]
    async fn fetch_classifies_connection_failure_as_network_error() {
        let fetcher = test_fetcher(Duration::ZERO);
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    async fn fetch_memoizes_within_the_ttl_window() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cached")
            .with_status(200)
            .with_body("once")
            .expect(1)
            .create_async()
            .await;

        let fetcher = test_fetcher(Duration::from_secs(60));
        let url = format!("{}/cached", server.url());
        let first = fetcher.fetch(&url).await.unwrap();
        let second = fetcher.fetch(&url).await.unwrap();
        assert_eq!(first.body, second.body);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn head_status_reports_4xx_as_a_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = test_fetcher(Duration::ZERO);
        let status = fetcher
            .head_status(&format!("{}/missing", server.url()))
            .await
            .unwrap();
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn probe_reports_robots_and_sitemap_presence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *")
            .create_async()
            .await;
        server
            .mock("HEAD", "/sitemap.xml")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = test_fetcher(Duration::ZERO);
        let probe = probe_site(&fetcher, &format!("{}/", server.url())).await;
        assert!(probe.robots_txt);
        assert!(!probe.sitemap_xml);
        assert!(!probe.https);
    }
}
