// ABOUTME: Request builder and response wrapper for driving the API router in tests
// ABOUTME: Requests go through tower's oneshot, so no listener or port is needed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, Response, StatusCode},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tower::ServiceExt;

/// One API request under construction
pub struct AxumTestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl AxumTestRequest {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    #[allow(dead_code)]
    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    #[allow(dead_code)]
    pub fn patch(uri: &str) -> Self {
        Self::new(Method::PATCH, uri)
    }

    #[allow(dead_code)]
    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Authenticate with an access token in the `Authorization` header
    pub fn bearer(self, token: &str) -> Self {
        self.header(header::AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// Authenticate with the browser session cookie instead of a header
    #[allow(dead_code)]
    pub fn session_cookie(self, token: &str) -> Self {
        self.header(header::COOKIE.as_str(), &format!("auth_token={token}"))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_vec(body).expect("request body should serialize"));
        self.header(header::CONTENT_TYPE.as_str(), "application/json")
    }

    pub async fn send(self, app: Router) -> AxumTestResponse {
        let request = self
            .headers
            .iter()
            .fold(
                Request::builder().method(self.method).uri(&self.uri),
                |builder, (name, value)| builder.header(name, value),
            )
            .body(Body::from(self.body.unwrap_or_default()))
            .expect("request should build");

        let response = app.oneshot(request).await.expect("router is infallible");
        AxumTestResponse::read(response).await
    }
}

/// Fully buffered API response
pub struct AxumTestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl AxumTestResponse {
    async fn read(response: Response<Body>) -> Self {
        let (parts, body) = response.into_parts();
        let body = to_bytes(body, usize::MAX)
            .await
            .expect("response body should be readable")
            .to_vec();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    /// Value of the `auth_token` cookie set by this response, if any
    #[allow(dead_code)]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| cookie.strip_prefix("auth_token="))
            .map(|rest| rest.split(';').next().unwrap_or_default().to_owned())
    }

    pub fn json<T: DeserializeOwned>(self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "response is not the expected JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    /// `error.code` of an error response body
    #[allow(dead_code)]
    pub fn error_code(self) -> String {
        let body: Value = self.json();
        body["error"]["code"]
            .as_str()
            .unwrap_or_else(|| panic!("not an error body: {body}"))
            .to_owned()
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status for body {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}
