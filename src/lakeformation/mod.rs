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

//! LakeFormation instances

use std::time::Duration;

use anyhow::bail;
use serde_json::Value as Json;

use crate::client::{ApiError, ClientError, ServiceClient};
use crate::model::InstanceStatus;
use crate::utils::PathSearch;
use crate::waiter::{RefreshResult, StateChangeConf, WaitError, COMPLETED, PENDING};

mod data_source;
mod resource;
mod state;

pub use data_source::LakeFormationInstanceDataSource;
pub use resource::LakeFormationInstanceResource;

pub(crate) const SERVICE: &str = "lakeformation";

fn instance_url(client: &ServiceClient, instance_id: &str) -> String {
    client.url(
        "v1/{project_id}/instances/{instance_id}",
        &[("instance_id", instance_id)],
    )
}

/// Fetch an instance, instances waiting in the recycle bin are reported as 404
pub(crate) async fn get_instance(
    client: &ServiceClient,
    instance_id: &str,
) -> Result<Json, ClientError> {
    let url = instance_url(client, instance_id);
    let body = client.get(&url).await?;
    if in_recycle_bin(&body) {
        return Err(ClientError::Api(ApiError {
            method: "GET".to_owned(),
            url,
            status: 404,
            body: format!("the instance ({instance_id}) has been moved to the recycle bin"),
            request_id: "NONE".to_owned(),
        }));
    }
    Ok(body)
}

fn in_recycle_bin(body: &Json) -> bool {
    InstanceStatus::from(body.search_str("status").unwrap_or_default()) == InstanceStatus::Deleting
        && body.search_bool("in_recycle_bin").unwrap_or(false)
}

/// Classify an instance against the awaited statuses
fn instance_state(body: &Json, targets: &[InstanceStatus]) -> anyhow::Result<String> {
    let status = InstanceStatus::from(body.search_str("status").unwrap_or_default());
    if status.is_failed() {
        bail!("unexpected status ({status})");
    }
    if targets.contains(&status) {
        Ok(COMPLETED.to_owned())
    } else {
        Ok(PENDING.to_owned())
    }
}

async fn refresh_instance(
    client: &ServiceClient,
    instance_id: &str,
    targets: &[InstanceStatus],
) -> RefreshResult {
    match get_instance(client, instance_id).await {
        Ok(body) => {
            let state = instance_state(&body, targets)?;
            Ok((Some(body), state))
        }
        Err(err) if err.is_not_found() && targets.is_empty() => {
            Ok((Some(Json::Null), COMPLETED.to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn wait_instance_running(
    client: &ServiceClient,
    instance_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    let targets = [InstanceStatus::Running];
    StateChangeConf::new(|| refresh_instance(client, instance_id, &targets))
        .timeout(timeout)
        .delay(Duration::from_secs(45))
        .poll_interval(Duration::from_secs(30))
        .wait_for_state()
        .await?;
    Ok(())
}

pub(crate) async fn wait_instance_deleted(
    client: &ServiceClient,
    instance_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    let targets: [InstanceStatus; 0] = [];
    StateChangeConf::new(|| refresh_instance(client, instance_id, &targets))
        .timeout(timeout)
        .delay(Duration::from_secs(10))
        .poll_interval(Duration::from_secs(15))
        .wait_for_state()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_in_recycle_bin() {
        assert!(in_recycle_bin(&json!({ "status": "DELETING", "in_recycle_bin": true })));
        assert!(!in_recycle_bin(&json!({ "status": "DELETING" })));
        assert!(!in_recycle_bin(&json!({ "status": "RUNNING", "in_recycle_bin": true })));
    }

    #[test]
    fn test_instance_state() {
        let running = [InstanceStatus::Running];
        assert_eq!(
            instance_state(&json!({ "status": "RUNNING" }), &running).unwrap(),
            COMPLETED
        );
        assert_eq!(
            instance_state(&json!({ "status": "SCALING" }), &running).unwrap(),
            PENDING
        );
        assert_eq!(instance_state(&json!({ "status": "RUNNING" }), &[]).unwrap(), PENDING);
        let err = instance_state(&json!({ "status": "SCALE_FAIL" }), &running).unwrap_err();
        assert_eq!(err.to_string(), "unexpected status (SCALE_FAIL)");
    }
}
