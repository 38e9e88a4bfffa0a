use chrono::Utc;
use log::{debug, info};
use reqwest::{header, Client, ClientBuilder};
use std::time::Duration;
use url::Url;

use crate::browser::BrowserCookie;
use crate::core::config::DownloadConfig;
use crate::stats::StatsTracker;
use crate::{FetchError, FetchResult};

use super::mime::extension_for_content_type;

#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedFile {
    /// Extension implied by the Content-Type, or `fallback`.
    pub fn extension<'a>(&self, fallback: &'a str) -> &'a str {
        self.content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .unwrap_or(fallback)
    }
}

/// A plain HTTP client that carries the browser session's cookies.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    stats: StatsTracker,
}

pub fn cookie_header(cookies: &[BrowserCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Downloader {
    pub fn from_cookies(cookies: &[BrowserCookie], config: &DownloadConfig) -> FetchResult<Self> {
        let mut header_map = header::HeaderMap::new();
        header_map.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)?,
        );
        if !cookies.is_empty() {
            let mut value = header::HeaderValue::from_str(&cookie_header(cookies))?;
            value.set_sensitive(true);
            header_map.insert(header::COOKIE, value);
        }
        debug!("Carrying {} browser cookies", cookies.len());

        let mut builder = ClientBuilder::new().default_headers(header_map);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            stats: StatsTracker::new(),
        })
    }

    pub fn with_stats(mut self, stats: StatsTracker) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// One GET, no retries. An error status is returned as
    /// [`FetchError::StatusError`].
    pub async fn fetch(&self, url: &Url) -> FetchResult<FetchedFile> {
        info!("Loading URL: {}", url);
        let start_time = Utc::now();

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_failure(failure_reason(&e));
                return Err(e.into());
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if response.status().is_client_error() || response.status().is_server_error() {
            self.stats
                .record_request(status, 0, Utc::now().signed_duration_since(start_time));
            return Err(FetchError::StatusError {
                url: url.clone(),
                status,
            });
        }

        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                self.stats.record_failure(failure_reason(&e));
                return Err(e.into());
            }
        };
        self.stats.record_request(
            status,
            body.len() as u64,
            Utc::now().signed_duration_since(start_time),
        );
        debug!(
            "Received {} bytes from {} (content-type={:?})",
            body.len(),
            url,
            content_type
        );

        Ok(FetchedFile {
            url: url.clone(),
            status,
            content_type,
            body,
        })
    }
}

fn failure_reason(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&server.uri()).unwrap().join(p).unwrap()
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let cookies = vec![
            BrowserCookie::new("session_id", "abc"),
            BrowserCookie::new("piazza_session", "x=y"),
        ];
        assert_eq!(cookie_header(&cookies), "session_id=abc; piazza_session=x=y");
        assert_eq!(cookie_header(&[]), "");
    }

    #[tokio::test]
    async fn sends_browser_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file"))
            .and(header("cookie", "session_id=abc; last_piaz_user=ada"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"%PDF-1.4".to_vec())
                    .insert_header("content-type", "application/pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cookies = vec![
            BrowserCookie::new("session_id", "abc"),
            BrowserCookie::new("last_piaz_user", "ada"),
        ];
        let downloader = Downloader::from_cookies(&cookies, &DownloadConfig::default()).unwrap();
        let file = downloader.fetch(&url(&server, "/file")).await.unwrap();

        assert_eq!(file.status, 200);
        assert_eq!(file.body, b"%PDF-1.4");
        assert_eq!(file.extension(".bin"), ".pdf");

        let stats = downloader.stats().get_stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.bytes_downloaded, 8);
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let downloader = Downloader::from_cookies(&[], &DownloadConfig::default()).unwrap();
        let err = downloader.fetch(&url(&server, "/gone")).await.unwrap_err();

        assert!(matches!(err, FetchError::StatusError { status: 404, .. }));
        assert_eq!(downloader.stats().get_stats().failed_requests, 1);
    }

    #[tokio::test]
    async fn missing_content_type_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let downloader = Downloader::from_cookies(&[], &DownloadConfig::default()).unwrap();
        let file = downloader.fetch(&url(&server, "/blob")).await.unwrap();

        assert_eq!(file.content_type, None);
        assert_eq!(file.extension(".pdf"), ".pdf");
    }

    #[test]
    fn invalid_cookie_value_is_rejected() {
        let cookies = vec![BrowserCookie::new("bad", "line\nbreak")];
        let result = Downloader::from_cookies(&cookies, &DownloadConfig::default());
        assert!(matches!(result, Err(FetchError::HeaderError(_))));
    }
}
