// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// A fully buffered HTTP response
pub struct HttpBody {
    /// HTTP status code
    pub status: u16,
    /// The complete response body
    pub bytes: Bytes,
}

/// A streaming HTTP response, used for large audio downloads
pub struct HttpStream {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

/// HTTP transport abstraction for testability.
///
/// Both the catalog client and the audio cache go through this seam, so
/// every network path in the crate can be driven by a mock.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch an entire response body into memory
    async fn get(&self, url: &str) -> Result<HttpBody, reqwest::Error>;

    /// Fetch a response as a byte stream
    async fn get_streaming(&self, url: &str) -> Result<HttpStream, reqwest::Error>;
}

/// Default transport implementation using reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Wrap a pre-configured reqwest client (custom timeouts, proxies, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpBody, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok(HttpBody { status, bytes })
    }

    async fn get_streaming(&self, url: &str) -> Result<HttpStream, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body: ByteStream = Box::pin(response.bytes_stream());

        Ok(HttpStream {
            status,
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_transport_can_be_created() {
        let _transport = ReqwestTransport::new();
        let _transport_default = ReqwestTransport::default();
    }

    #[test]
    fn reqwest_transport_can_be_cloned() {
        let transport = ReqwestTransport::new();
        let _cloned = transport.clone();
    }
}
