// This file is part of the terraform-provider-huaweicloud project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value as Json;
use time::OffsetDateTime;

pub mod error;
pub mod signer;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, ClientError};
pub use signer::Signer;

const HEADER_PROJECT_ID: &str = "X-Project-Id";
const HEADER_REQUEST_ID: &str = "X-Request-Id";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Signed JSON client bound to one service endpoint and one project
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    signer: Arc<Signer>,
    extra_headers: Vec<(&'static str, String)>,
    pub endpoint: String,
    pub project_id: String,
    pub max_retries: u32,
}

impl ServiceClient {
    pub fn new(
        http: reqwest::Client,
        signer: Arc<Signer>,
        endpoint: String,
        project_id: String,
        max_retries: u32,
    ) -> Self {
        Self {
            http,
            signer,
            extra_headers: Vec::new(),
            endpoint,
            project_id,
            max_retries,
        }
    }

    /// Add a header sent (and signed) with every request
    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    /// Join the endpoint and a path template, substituting `{project_id}` and `{name}` parameters
    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.endpoint, template.trim_start_matches('/'))
            .replace("{project_id}", &self.project_id);
        for (name, value) in params {
            url = url.replace(&format!("{{{name}}}"), value);
        }
        url
    }

    pub async fn get(&self, url: &str) -> Result<Json, ClientError> {
        self.request(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &Json) -> Result<Json, ClientError> {
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn put(&self, url: &str, body: &Json) -> Result<Json, ClientError> {
        self.request(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str, body: Option<&Json>) -> Result<Json, ClientError> {
        self.request(Method::DELETE, url, body).await
    }

    /// Send a signed request and decode its JSON response
    ///
    /// Responses with status 429 are retried with an exponential back-off,
    /// any other non successful status is turned into an [`ApiError`].
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Json>,
    ) -> Result<Json, ClientError> {
        let parsed = Url::parse(url).map_err(|_| ClientError::Url(url.to_owned()))?;
        let body = body
            .map(|body| serde_json::to_vec(body).map(Bytes::from))
            .transpose()?;

        let mut attempt = 0;
        loop {
            let mut builder = self
                .http
                .request(method.clone(), parsed.clone())
                .header(CONTENT_TYPE, "application/json");
            if !self.project_id.is_empty() {
                builder = builder.header(HEADER_PROJECT_ID, &self.project_id);
            }
            for (name, value) in &self.extra_headers {
                builder = builder.header(*name, value);
            }
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }
            let mut request = builder.build()?;
            self.signer.sign(&mut request, OffsetDateTime::now_utc())?;

            tracing::debug!("{method} {url}");
            let response = self.http.execute(request).await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                let delay = backoff(attempt);
                tracing::warn!("{method} {url} was throttled, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let request_id = response
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("NONE")
                .to_owned();
            let content = response.bytes().await?;
            tracing::debug!("{method} {url} returned {status} (request id: {request_id})");

            if !status.is_success() {
                return Err(ApiError {
                    method: method.to_string(),
                    url: url.to_owned(),
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&content).into_owned(),
                    request_id,
                }
                .into());
            }

            return decode_body(&content);
        }
    }
}

fn decode_body(content: &[u8]) -> Result<Json, ClientError> {
    if content.iter().all(u8::is_ascii_whitespace) {
        Ok(Json::Null)
    } else {
        Ok(serde_json::from_slice(content)?)
    }
}

/// `2^attempt` seconds capped at 30 seconds, plus up to one second of jitter
fn backoff(attempt: u32) -> Duration {
    let base = Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF);
    base + Duration::from_millis(rand::thread_rng().gen_range(0..1000))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::MockServer;
    use super::*;

    fn client() -> ServiceClient {
        ServiceClient::new(
            reqwest::Client::new(),
            Arc::new(Signer::new("ak".to_owned(), "sk".to_owned(), None)),
            "https://dws.cn-north-4.myhuaweicloud.com/".to_owned(),
            "0123456789".to_owned(),
            3,
        )
    }

    #[test]
    fn test_url() {
        let client = client();
        assert_eq!(
            client.url(
                "v1.0/{project_id}/clusters/{cluster_id}",
                &[("cluster_id", "abc")]
            ),
            "https://dws.cn-north-4.myhuaweicloud.com/v1.0/0123456789/clusters/abc"
        );
        assert_eq!(
            client.url("/v2/{project_id}/disaster-recovery/{id}/{id}", &[("id", "x")]),
            "https://dws.cn-north-4.myhuaweicloud.com/v2/0123456789/disaster-recovery/x/x"
        );
    }

    #[test]
    fn test_backoff() {
        for attempt in 0..10 {
            let delay = backoff(attempt);
            let base = Duration::from_secs(2u64.pow(attempt)).min(MAX_BACKOFF);
            assert!(delay >= base);
            assert!(delay < base + Duration::from_secs(1));
        }
        assert!(backoff(u32::MAX) < MAX_BACKOFF + Duration::from_secs(1));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b"").unwrap(), Json::Null);
        assert_eq!(decode_body(b" \n").unwrap(), Json::Null);
        assert_eq!(
            decode_body(br#"{"job_id":"j"}"#).unwrap(),
            serde_json::json!({"job_id": "j"})
        );
        assert!(decode_body(b"<html>").is_err());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = client().get("not a url").await.unwrap_err();
        assert!(matches!(err, ClientError::Url(_)));
    }

    fn local_client(endpoint: &str, max_retries: u32) -> ServiceClient {
        ServiceClient::new(
            reqwest::Client::new(),
            Arc::new(Signer::new("ak".to_owned(), "sk".to_owned(), None)),
            endpoint.to_owned(),
            "p".to_owned(),
            max_retries,
        )
    }

    #[tokio::test]
    async fn test_throttled_request_is_retried() {
        let server = MockServer::start(vec![
            (429, r#"{"error_code":"APIGW.0308","error_msg":"throttled"}"#),
            (200, r#"{"job_id":"j"}"#),
        ])
        .await;
        let client = local_client(&server.endpoint, 1);

        let body = client
            .get(&client.url("v1.0/{project_id}/job/j", &[]))
            .await
            .unwrap();
        assert_eq!(body, json!({"job_id": "j"}));
        assert_eq!(server.requests(), vec!["GET /v1.0/p/job/j HTTP/1.1"; 2]);
    }

    #[tokio::test]
    async fn test_throttled_request_without_retries() {
        let server = MockServer::start(vec![(
            429,
            r#"{"error_code":"APIGW.0308","error_msg":"throttled"}"#,
        )])
        .await;
        let client = local_client(&server.endpoint, 0);

        let err = client
            .get(&client.url("v1.0/{project_id}/job/j", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api(ApiError { status: 429, .. })));
        assert_eq!(err.error_code("error_code").as_deref(), Some("APIGW.0308"));
        assert_eq!(server.requests().len(), 1);
    }
}
