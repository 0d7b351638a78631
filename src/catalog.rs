use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::CatalogError;
use crate::http::HttpTransport;
use crate::show::Show;

/// Base URL of the public show catalog
pub const DEFAULT_BASE_URL: &str = "https://api.dotnetrocks.com/api";

/// Show name requested from the catalog (one catalog serves several shows)
pub const DEFAULT_SHOW_NAME: &str = "dotnetrocks";

/// Remote show catalog, treated as a black-box collaborator.
///
/// All five operations the core consumes; everything else the real service
/// offers is out of scope.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// The complete ordered list of show numbers, newest first
    async fn get_show_numbers(&self) -> Result<Vec<u32>, CatalogError>;

    /// Summaries for a specific set of show numbers
    async fn get_by_show_numbers(&self, numbers: &[u32]) -> Result<Vec<Show>, CatalogError>;

    /// One show including its detail payload
    async fn get_show_with_details(&self, show_number: u32) -> Result<Show, CatalogError>;

    /// A page of shows matching a text filter
    async fn get_filtered_shows(
        &self,
        filter: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, CatalogError>;

    /// Total number of shows matching a text filter
    async fn get_count(&self, filter: &str) -> Result<usize, CatalogError>;
}

/// Synchronous connectivity sample taken before actions that need the
/// network. Not a source of truth while an action runs: a flap mid-download
/// is only detected by the failing HTTP call itself.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe that always reports online. The right default wherever the platform
/// offers no reachability API.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeOnline;

impl ConnectivityProbe for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Catalog client over an [`HttpTransport`]
pub struct HttpCatalog<T: HttpTransport> {
    transport: T,
    base_url: String,
    show_name: String,
}

impl<T: HttpTransport> HttpCatalog<T> {
    pub fn new(transport: T) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL, DEFAULT_SHOW_NAME)
    }

    pub fn with_base_url(transport: T, base_url: &str, show_name: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            show_name: show_name.to_string(),
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, CatalogError> {
        let body = self
            .transport
            .get(url)
            .await
            .map_err(|e| CatalogError::RequestFailed {
                url: url.to_string(),
                source: e,
            })?;

        if body.status >= 400 {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: body.status,
            });
        }

        serde_json::from_slice(&body.bytes).map_err(|e| CatalogError::DecodeFailed {
            url: url.to_string(),
            source: e,
        })
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[async_trait]
impl<T: HttpTransport> CatalogClient for HttpCatalog<T> {
    async fn get_show_numbers(&self) -> Result<Vec<u32>, CatalogError> {
        let url = format!("{}/shownumbers/{}", self.base_url, self.show_name);
        self.get_json(&url).await
    }

    async fn get_by_show_numbers(&self, numbers: &[u32]) -> Result<Vec<Show>, CatalogError> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }
        let list = numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/shows/{}?numbers={}",
            self.base_url, self.show_name, list
        );
        self.get_json(&url).await
    }

    async fn get_show_with_details(&self, show_number: u32) -> Result<Show, CatalogError> {
        let url = format!(
            "{}/show/{}/{}/details",
            self.base_url, self.show_name, show_number
        );
        self.get_json(&url).await
    }

    async fn get_filtered_shows(
        &self,
        filter: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, CatalogError> {
        let url = format!(
            "{}/search/{}?query={}&offset={}&count={}",
            self.base_url,
            self.show_name,
            encode(filter),
            offset,
            limit
        );
        self.get_json(&url).await
    }

    async fn get_count(&self, filter: &str) -> Result<usize, CatalogError> {
        let url = format!(
            "{}/search/{}/count?query={}",
            self.base_url,
            self.show_name,
            encode(filter)
        );
        self.get_json(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpBody, HttpStream};
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Transport that records requested URLs and replays canned bodies
    struct CannedTransport {
        responses: Mutex<Vec<(u16, &'static str)>>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn new(responses: Vec<(u16, &'static str)>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn get(&self, url: &str) -> Result<HttpBody, reqwest::Error> {
            self.requested.lock().unwrap().push(url.to_string());
            let (status, body) = self.responses.lock().unwrap().remove(0);
            Ok(HttpBody {
                status,
                bytes: Bytes::from_static(body.as_bytes()),
            })
        }

        async fn get_streaming(&self, _url: &str) -> Result<HttpStream, reqwest::Error> {
            unimplemented!("catalog never streams")
        }
    }

    fn catalog(responses: Vec<(u16, &'static str)>) -> HttpCatalog<CannedTransport> {
        HttpCatalog::with_base_url(
            CannedTransport::new(responses),
            "https://catalog.test/api",
            "dotnetrocks",
        )
    }

    #[tokio::test]
    async fn fetches_show_numbers() {
        let catalog = catalog(vec![(200, "[1802, 1801, 1800]")]);
        let numbers = catalog.get_show_numbers().await.unwrap();
        assert_eq!(numbers, vec![1802, 1801, 1800]);
        assert_eq!(
            catalog.transport.requested.lock().unwrap()[0],
            "https://catalog.test/api/shownumbers/dotnetrocks"
        );
    }

    #[tokio::test]
    async fn by_show_numbers_short_circuits_on_empty_input() {
        let catalog = catalog(vec![]);
        let shows = catalog.get_by_show_numbers(&[]).await.unwrap();
        assert!(shows.is_empty());
        assert!(catalog.transport.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn by_show_numbers_joins_numbers_into_query() {
        let catalog = catalog(vec![(200, "[]")]);
        catalog.get_by_show_numbers(&[3, 2, 1]).await.unwrap();
        assert_eq!(
            catalog.transport.requested.lock().unwrap()[0],
            "https://catalog.test/api/shows/dotnetrocks?numbers=3,2,1"
        );
    }

    #[tokio::test]
    async fn filtered_query_is_url_encoded() {
        let catalog = catalog(vec![(200, "[]")]);
        catalog.get_filtered_shows("rust & wasm", 20, 10).await.unwrap();
        assert_eq!(
            catalog.transport.requested.lock().unwrap()[0],
            "https://catalog.test/api/search/dotnetrocks?query=rust+%26+wasm&offset=20&count=10"
        );
    }

    #[tokio::test]
    async fn http_error_status_is_surfaced() {
        let catalog = catalog(vec![(503, "busy")]);
        let err = catalog.get_count("").await.unwrap_err();
        match err {
            CatalogError::HttpStatus { status, .. } => assert_eq!(status, 503),
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let catalog = catalog(vec![(200, "not json")]);
        let err = catalog.get_show_numbers().await.unwrap_err();
        assert!(matches!(err, CatalogError::DecodeFailed { .. }));
    }

    #[test]
    fn assume_online_reports_online() {
        assert!(AssumeOnline.is_online());
    }
}
