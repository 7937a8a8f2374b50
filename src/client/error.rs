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

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde_json::Value as Json;
use thiserror::Error;

use crate::utils::PathSearch;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("error sending request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("error decoding response body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL '{0}'")]
    Url(String),
    #[error("error signing request: {0}")]
    Signing(String),
}

/// Non successful response of the remote API
#[derive(Debug, Clone, Error)]
#[error("{method} {url} returned status {status} (request id: {request_id}): {body}")]
pub struct ApiError {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub body: String,
    pub request_id: String,
}

impl ApiError {
    /// Decoded response body, the API sometimes returns base64 encoded JSON
    pub fn json(&self) -> Option<Json> {
        serde_json::from_str(&self.body).ok().or_else(|| {
            let decoded = URL_SAFE.decode(self.body.trim()).ok()?;
            serde_json::from_slice(&decoded).ok()
        })
    }

    pub fn error_code(&self, key: &str) -> Option<String> {
        self.json()?.search_str(key)
    }
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn error_code(&self, key: &str) -> Option<String> {
        match self {
            ClientError::Api(err) => err.error_code(key),
            _ => None,
        }
    }

    /// Turn an error with the given status and error code into a 404
    pub fn convert_expected(self, status: u16, key: &str, code: &str) -> Self {
        match self {
            ClientError::Api(mut err)
                if err.status == status && err.error_code(key).as_deref() == Some(code) =>
            {
                tracing::debug!(
                    "converting {} error with code {code} into not found",
                    err.status
                );
                err.status = 404;
                ClientError::Api(err)
            }
            err => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, body: &str) -> ClientError {
        ClientError::Api(ApiError {
            method: "GET".to_owned(),
            url: "https://dws.example.com/v1.0/p/clusters/c".to_owned(),
            status,
            body: body.to_owned(),
            request_id: "req".to_owned(),
        })
    }

    #[test]
    fn test_convert_expected() {
        let err = api_error(401, r#"{"error_code":"DWS.0047","error_msg":"no cluster"}"#)
            .convert_expected(401, "error_code", "DWS.0047");
        assert!(err.is_not_found());

        let err = api_error(403, r#"{"error_code":"DWS.0001"}"#)
            .convert_expected(403, "error_code", "DWS.0015");
        assert_eq!(err.status(), Some(403));

        let err = api_error(400, r#"{"error_code":"DWS.0015"}"#)
            .convert_expected(403, "error_code", "DWS.0015");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_base64_body() {
        let body = URL_SAFE.encode(r#"{"error_code":"DWS.7107"}"#);
        let err = api_error(400, &body);
        assert_eq!(err.error_code("error_code").as_deref(), Some("DWS.7107"));
    }
}
