//! # Stat Sources
//!
//! A [`StatSource`] turns one request against the media server into a list of
//! [`StreamSnapshot`]s. Sources keep no state between calls and never retry; the
//! polling loop of the [`Monitor`](crate::Monitor) is the retry.

pub mod parser;

use crate::{
    error::FetchError,
    metrics::StreamSnapshot,
};
use eyre::Result;
pub use parser::{
    extract_known_fields,
    parse_document,
};
use reqwest::Client as HttpClient;
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use tracing::Instrument as _;
use url::Url;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<StreamSnapshot>, FetchError>> + Send + 'a>>;

/// Trait for anything that can report the streams currently known to the media server
pub trait StatSource {
    /// Fetch and parse the current stat document. An empty list means "no live streams".
    fn fetch(&self) -> FetchFuture<'_>;
}

/// Reads the XML stat page (e.g. nginx-rtmp's `/stat`) over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatSource {
    url: Url,
    http_client: HttpClient,
}

impl HttpStatSource {
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(url, http_client))
    }

    pub fn with_client(url: Url, http_client: HttpClient) -> Self {
        Self { url, http_client }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn transport_error(&self, source: reqwest::Error) -> FetchError {
        FetchError::Transport {
            url: self.url.clone(),
            source,
        }
    }
}

impl StatSource for HttpStatSource {
    fn fetch(&self) -> FetchFuture<'_> {
        let span = debug_span!("fetch", url = %self.url);
        Box::pin(
            async move {
                let response = self
                    .http_client
                    .get(self.url.clone())
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|err| self.transport_error(err))?;

                let status = response.status().as_u16();
                let body = response.text().await.map_err(|err| self.transport_error(err))?;
                let streams = parse_document(&body)?;

                debug!(status, bytes = body.len(), streams = streams.len(), "Fetched stat document");
                Ok(streams)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::{
        matchers::{
            method,
            path,
        },
        Mock,
        MockServer,
        ResponseTemplate,
    };

    const ONE_STREAM: &str = "<rtmp><server><application><live>\
        <stream><name>alpha</name><bytes_in>2048</bytes_in><bw_video>900</bw_video></stream>\
        </live></application></server></rtmp>";

    async fn source_for(server: &MockServer) -> HttpStatSource {
        let url = Url::parse(&format!("{}/stat", server.uri())).unwrap();
        HttpStatSource::new(url, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_parses_the_stat_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ONE_STREAM))
            .expect(1)
            .mount(&server)
            .await;

        let streams = source_for(&server).await.fetch().await.unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].name, "alpha");
        assert_eq!(streams[0].bytes_in(), Some(2048));
        assert_eq!(streams[0].bw_video(), Some(900));
    }

    #[tokio::test]
    async fn empty_document_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rtmp><server/></rtmp>"))
            .mount(&server)
            .await;

        let streams = source_for(&server).await.fetch().await.unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = source_for(&server).await.fetch().await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(ONE_STREAM)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/stat", server.uri())).unwrap();
        let source = HttpStatSource::new(url, Duration::from_millis(50)).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Port 9 (discard) is not expected to have an HTTP server listening.
        let url = Url::parse("http://127.0.0.1:9/stat").unwrap();
        let source = HttpStatSource::new(url, Duration::from_secs(1)).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>502 Bad Gateway"))
            .mount(&server)
            .await;

        let err = source_for(&server).await.fetch().await.unwrap_err();
        assert!(err.is_parse(), "unexpected error: {err}");
    }
}
