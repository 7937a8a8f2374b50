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

//! Polling until a remote object reaches a target state

use std::future::Future;
use std::time::Duration;

use serde_json::Value as Json;
use thiserror::Error;

pub const PENDING: &str = "PENDING";
pub const COMPLETED: &str = "COMPLETED";

/// Outcome of one refresh: the fetched object (if it exists) and its state
pub type RefreshResult = anyhow::Result<(Option<Json>, String)>;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        target: String,
        last_state: String,
        timeout: Duration,
    },
    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },
    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: usize },
    #[error(transparent)]
    Refresh(#[from] anyhow::Error),
}

pub struct StateChangeConf<F> {
    pending: Vec<String>,
    target: Vec<String>,
    refresh: F,
    timeout: Duration,
    delay: Duration,
    poll_interval: Duration,
    not_found_checks: usize,
}

impl<F, Fut> StateChangeConf<F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = RefreshResult>,
{
    /// Wait for [`COMPLETED`] while the refresh reports [`PENDING`]
    pub fn new(refresh: F) -> Self {
        Self {
            pending: vec![PENDING.to_owned()],
            target: vec![COMPLETED.to_owned()],
            refresh,
            timeout: Duration::from_secs(600),
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(10),
            not_found_checks: 20,
        }
    }

    pub fn pending<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.pending = states.into_iter().map(Into::into).collect();
        self
    }

    /// An empty target means waiting for the object to disappear
    pub fn target<I: IntoIterator<Item = S>, S: Into<String>>(mut self, states: I) -> Self {
        self.target = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn not_found_checks(mut self, checks: usize) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Poll until the target is reached and return the last fetched object
    pub async fn wait_for_state(&self) -> Result<Option<Json>, WaitError> {
        let mut last_state = String::new();
        match tokio::time::timeout(self.timeout, self.poll(&mut last_state)).await {
            Ok(result) => result,
            Err(_) => Err(WaitError::Timeout {
                target: self.target_list(),
                last_state,
                timeout: self.timeout,
            }),
        }
    }

    async fn poll(&self, last_state: &mut String) -> Result<Option<Json>, WaitError> {
        tokio::time::sleep(self.delay).await;

        let mut not_found = 0;
        loop {
            let (object, state) = (self.refresh)().await?;
            tracing::debug!("refreshed state: '{state}'");
            *last_state = state;

            match object {
                None if self.target.is_empty() => return Ok(None),
                None => {
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(WaitError::NotFound { checks: not_found });
                    }
                }
                Some(object) => {
                    not_found = 0;
                    if self.target.contains(last_state) {
                        return Ok(Some(object));
                    }
                    if !self.pending.contains(last_state) {
                        return Err(WaitError::UnexpectedState {
                            state: last_state.clone(),
                            target: self.target_list(),
                        });
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn target_list(&self) -> String {
        self.target.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reaches_target() {
        let calls = &AtomicUsize::new(0);
        let conf = StateChangeConf::new(move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let state = if n < 3 { PENDING } else { COMPLETED };
            RefreshResult::Ok((Some(json!({"calls": n})), state.to_owned()))
        })
        .delay(Duration::from_secs(30))
        .poll_interval(Duration::from_secs(30))
        .timeout(Duration::from_secs(3600));

        let object = assert_ok!(conf.wait_for_state().await);
        assert_eq!(object, Some(json!({"calls": 3})));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_state() {
        let conf = StateChangeConf::new(|| async move {
            RefreshResult::Ok((Some(json!({})), "CREATE_FAILED".to_owned()))
        });
        let err = assert_err!(conf.wait_for_state().await);
        assert_eq!(
            err.to_string(),
            "unexpected state 'CREATE_FAILED', wanted target 'COMPLETED'"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_state_lists_targets() {
        let conf = StateChangeConf::new(|| async move {
            RefreshResult::Ok((Some(json!({})), "abnormal".to_owned()))
        })
        .pending(["starting"])
        .target(["running", "stopped"]);
        let err = assert_err!(conf.wait_for_state().await);
        assert_eq!(
            err.to_string(),
            "unexpected state 'abnormal', wanted target 'running, stopped'"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let conf = StateChangeConf::new(|| async move {
            RefreshResult::Ok((Some(json!({})), PENDING.to_owned()))
        })
            .poll_interval(Duration::from_secs(10))
            .timeout(Duration::from_secs(60));
        let err = assert_err!(conf.wait_for_state().await);
        assert!(matches!(
            &err,
            WaitError::Timeout { last_state, .. } if last_state == PENDING
        ));
        assert!(err
            .to_string()
            .starts_with("timeout while waiting for state to become 'COMPLETED'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found() {
        let calls = &AtomicUsize::new(0);
        let conf = StateChangeConf::new(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            RefreshResult::Ok((None, String::new()))
        })
        .not_found_checks(2)
        .timeout(Duration::from_secs(3600));
        let err = assert_err!(conf.wait_for_state().await);
        assert!(matches!(err, WaitError::NotFound { checks: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_with_empty_target() {
        let conf = StateChangeConf::new(|| async move {
            RefreshResult::Ok((None, COMPLETED.to_owned()))
        })
            .target(Vec::<String>::new());
        assert_eq!(assert_ok!(conf.wait_for_state().await), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_error() {
        let conf = StateChangeConf::new(|| async move {
            RefreshResult::Err(anyhow::anyhow!("error retrieving cluster"))
        });
        let err = assert_err!(conf.wait_for_state().await);
        assert!(matches!(err, WaitError::Refresh(_)));
        assert_eq!(err.to_string(), "error retrieving cluster");
    }
}
