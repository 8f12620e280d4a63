use reqwest::header::HeaderMap;
use reqwest::{Client, Method};

/// A request about to be dispatched, as seen by the authenticator.
pub trait OutgoingRequest {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Per-request opt-out of credential injection
    fn skip_authorization(&self) -> bool {
        false
    }
}

impl OutgoingRequest for reqwest::Request {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        reqwest::Request::headers_mut(self)
    }
}

/// Request description not yet bound to a client.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub skip_authorization: bool,
}

impl RequestParts {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            skip_authorization: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Mark the request so no credential is attached to it
    pub fn without_authorization(mut self) -> Self {
        self.skip_authorization = true;
        self
    }

    /// Build a `reqwest::Request` on `client`, keeping the headers gathered so far
    pub fn into_request(self, client: &Client) -> reqwest::Result<reqwest::Request> {
        client
            .request(self.method, &self.url)
            .headers(self.headers)
            .build()
    }
}

impl OutgoingRequest for RequestParts {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn skip_authorization(&self) -> bool {
        self.skip_authorization
    }
}
