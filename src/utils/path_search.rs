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

//! JMESPath searches used to pick fields out of API responses

use jmespath::Expression;
use serde_json::Value as Json;

/// Compiled search expression
pub struct Path(Expression<'static>);

impl Path {
    pub fn compile(expr: &str) -> Result<Self, jmespath::JmespathError> {
        jmespath::compile(expr).map(Path)
    }

    /// Evaluate the expression, `None` when the result is `null` or the evaluation fails
    pub fn search(&self, value: &Json) -> Option<Json> {
        let result = match self.0.search(value.clone()) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!("{err}");
                return None;
            }
        };
        match serde_json::to_value(&*result) {
            Ok(Json::Null) => None,
            Ok(result) => Some(result),
            Err(err) => {
                tracing::debug!("could not convert a search result: {err}");
                None
            }
        }
    }
}

/// Search helpers on decoded response bodies
pub trait PathSearch {
    fn search(&self, expr: &str) -> Option<Json>;

    fn search_str(&self, expr: &str) -> Option<String> {
        match self.search(expr)? {
            Json::String(s) => Some(s),
            _ => None,
        }
    }

    fn search_i64(&self, expr: &str) -> Option<i64> {
        let value = self.search(expr)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    fn search_bool(&self, expr: &str) -> Option<bool> {
        self.search(expr)?.as_bool()
    }

    fn search_array(&self, expr: &str) -> Vec<Json> {
        match self.search(expr) {
            Some(Json::Array(items)) => items,
            _ => Vec::new(),
        }
    }
}

impl PathSearch for Json {
    fn search(&self, expr: &str) -> Option<Json> {
        match Path::compile(expr) {
            Ok(path) => path.search(self),
            Err(err) => {
                tracing::warn!("invalid search expression '{expr}': {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cluster() -> Json {
        json!({
            "cluster": {
                "id": "c-1",
                "status": "AVAILABLE",
                "port": 8000,
                "action_progress": {"CREATING": "10%"},
                "endpoints": [
                    {"connect_info": "10.0.0.1:8000", "jdbc_url": "jdbc:a"},
                    {"connect_info": "10.0.0.2:8000", "jdbc_url": "jdbc:b"}
                ],
                "tags": []
            }
        })
    }

    #[test]
    fn test_field_access() {
        let body = cluster();
        assert_eq!(body.search_str("cluster.status").as_deref(), Some("AVAILABLE"));
        assert_eq!(body.search_i64("cluster.port"), Some(8000));
        assert_eq!(body.search("cluster.missing"), None);
        assert_eq!(body.search("cluster.status.deeper"), None);
    }

    #[test]
    fn test_index() {
        let body = cluster();
        assert_eq!(
            body.search_str("cluster.endpoints[0].jdbc_url").as_deref(),
            Some("jdbc:a")
        );
        assert_eq!(
            body.search_str("cluster.endpoints[-1].connect_info").as_deref(),
            Some("10.0.0.2:8000")
        );
        assert_eq!(body.search("cluster.endpoints[5]"), None);
    }

    #[test]
    fn test_length() {
        let body = cluster();
        assert_eq!(body.search_i64("length(cluster.action_progress)"), Some(1));
        assert_eq!(body.search_i64("length(cluster.endpoints)"), Some(2));
        assert_eq!(body.search_i64("length(cluster.tags)"), Some(0));
        assert_eq!(body.search("length(cluster.missing)"), None);
    }

    #[test]
    fn test_filter_and_pipe() {
        let body = json!({
            "data_sources": [
                {"id": "a", "type": "MRS", "status": "1"},
                {"id": "b", "type": "OBS", "status": "2"}
            ]
        });
        assert_eq!(
            body.search_str("data_sources[?id=='b']|[0].type").as_deref(),
            Some("OBS")
        );
        assert_eq!(body.search("data_sources[?id=='z']|[0]"), None);
        assert_eq!(
            body.search("data_sources[?type!='MRS'].id"),
            Some(json!(["b"]))
        );
        assert_eq!(body.search("data_sources[*].id"), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_json_literal_filter() {
        let body = json!({"items": [{"n": 1, "v": "x"}, {"n": 2, "v": "y"}]});
        assert_eq!(
            body.search_str("items[?n==`2`] | [0].v").as_deref(),
            Some("y")
        );
    }

    #[test]
    fn test_compile_errors() {
        assert!(Path::compile("cluster.").is_err());
        assert!(Path::compile("items[x]").is_err());
        assert!(Path::compile("a b").is_err());
        assert_eq!(cluster().search("cluster..id"), None);
    }

    #[test]
    fn test_evaluation_errors() {
        let body = cluster();
        assert_eq!(body.search("length(cluster.port)"), None);
        assert_eq!(body.search("no_such_function(cluster)"), None);
        assert_eq!(body.search_i64("length(cluster.missing)").unwrap_or(0), 0);
    }
}
