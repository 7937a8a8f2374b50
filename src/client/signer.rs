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

//! AK/SK request signing (`SDK-HMAC-SHA256`)

use crypto::digest::Digest;
use crypto::hmac::Hmac;
use crypto::mac::Mac;
use crypto::sha2::Sha256;
use reqwest::header::{HeaderValue, AUTHORIZATION, HOST};
use reqwest::{Request, Url};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::error::ClientError;

const ALGORITHM: &str = "SDK-HMAC-SHA256";
const HEADER_DATE: &str = "x-sdk-date";
const HEADER_SECURITY_TOKEN: &str = "x-security-token";

#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    security_token: Option<String>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(access_key: String, secret_key: String, security_token: Option<String>) -> Self {
        Self {
            access_key,
            secret_key,
            security_token,
        }
    }

    /// Add the date, host and authorization headers to a built request
    pub fn sign(&self, request: &mut Request, now: OffsetDateTime) -> Result<(), ClientError> {
        let date = now
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year][month][day]T[hour][minute][second]Z"
            ))
            .map_err(|err| ClientError::Signing(err.to_string()))?;

        let host = host_header(request.url())?;
        let headers = request.headers_mut();
        headers.insert(HEADER_DATE, header_value(&date)?);
        headers.insert(HOST, header_value(&host)?);
        if let Some(token) = &self.security_token {
            headers.insert(HEADER_SECURITY_TOKEN, header_value(token)?);
        }

        let mut signed_headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value
                    .to_str()
                    .map_err(|err| ClientError::Signing(format!("header {name}: {err}")))?;
                Ok((name.as_str().to_ascii_lowercase(), value.trim().to_owned()))
            })
            .collect::<Result<Vec<_>, ClientError>>()?;
        signed_headers.sort();

        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .unwrap_or_default();
        let canonical = canonical_request(
            request.method().as_str(),
            request.url(),
            &signed_headers,
            body,
        );
        let string_to_sign = format!("{ALGORITHM}\n{date}\n{}", sha256_hex(canonical.as_bytes()));
        let signature = hmac_sha256_hex(self.secret_key.as_bytes(), string_to_sign.as_bytes());

        let names = signed_headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let authorization = format!(
            "{ALGORITHM} Access={}, SignedHeaders={names}, Signature={signature}",
            self.access_key
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, header_value(&authorization)?);

        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|err| ClientError::Signing(err.to_string()))
}

fn host_header(url: &Url) -> Result<String, ClientError> {
    let host = url
        .host_str()
        .ok_or_else(|| ClientError::Url(url.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

pub(super) fn canonical_request(
    method: &str,
    url: &Url,
    headers: &[(String, String)],
    body: &[u8],
) -> String {
    let mut uri = url
        .path()
        .split('/')
        .map(|segment| escape(&percent_decode(segment)))
        .collect::<Vec<_>>()
        .join("/");
    if !uri.ends_with('/') {
        uri.push('/');
    }

    let mut query = url.query_pairs().collect::<Vec<_>>();
    query.sort();
    let query = query
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(body)
    )
}

fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("%{byte:02X}")),
        }
    }
    escaped
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let hex = bytes
            .get(i + 1..i + 3)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match (bytes[i], hex) {
            (b'%', Some(byte)) => {
                decoded.push(byte);
                i += 3;
            }
            (byte, _) => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.input(data);
    hasher.result_str()
}

fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = Hmac::new(Sha256::new(), key);
    mac.input(data);
    mac.result()
        .code()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use reqwest::header::CONTENT_TYPE;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("abc-_.~09"), "abc-_.~09");
        assert_eq!(escape("a b/c"), "a%20b%2Fc");
        assert_eq!(percent_decode("x%20y%zz"), "x y%zz");
    }

    #[test]
    fn test_canonical_request() {
        let url = Url::parse("https://iam.myhuaweicloud.com/v3/projects?name=cn-north-4").unwrap();
        let headers = vec![("host".to_owned(), "iam.myhuaweicloud.com".to_owned())];
        assert_eq!(
            canonical_request("GET", &url, &headers, b""),
            "GET\n/v3/projects/\nname=cn-north-4\nhost:iam.myhuaweicloud.com\n\nhost\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sign() {
        let signer = Signer::new("AK".to_owned(), "SK".to_owned(), None);
        let mut request = reqwest::Client::new()
            .post("https://dws.cn-north-4.myhuaweicloud.com/v1.0/proj/clusters?b=2&a=x%20y")
            .header(CONTENT_TYPE, "application/json")
            .header("X-Project-Id", "proj")
            .body(r#"{"a":1}"#)
            .build()
            .unwrap();

        signer
            .sign(&mut request, datetime!(2024-01-02 03:04:05 UTC))
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[HEADER_DATE], "20240102T030405Z");
        assert_eq!(headers[HOST], "dws.cn-north-4.myhuaweicloud.com");
        assert_eq!(
            headers[AUTHORIZATION],
            "SDK-HMAC-SHA256 Access=AK, SignedHeaders=content-type;host;x-project-id;x-sdk-date, \
             Signature=388fa5e53142d44f8c68cf935fd0264aab00dbba34e9f07d26d36f828bdb3af3"
        );
    }

    #[test]
    fn test_security_token_is_signed() {
        let signer = Signer::new("AK".to_owned(), "SK".to_owned(), Some("token".to_owned()));
        let mut request = reqwest::Client::new()
            .get("https://dws.cn-north-4.myhuaweicloud.com:8443/v1.0/proj/clusters")
            .build()
            .unwrap();
        signer
            .sign(&mut request, datetime!(2024-01-02 03:04:05 UTC))
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[HEADER_SECURITY_TOKEN], "token");
        assert_eq!(headers[HOST], "dws.cn-north-4.myhuaweicloud.com:8443");
        assert!(headers[AUTHORIZATION]
            .to_str()
            .unwrap()
            .contains("SignedHeaders=host;x-sdk-date;x-security-token,"));
    }
}
