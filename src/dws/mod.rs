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

//! Data Warehouse Service resources

use std::time::Duration;

use anyhow::anyhow;
use serde_json::Value as Json;

use crate::client::{ClientError, ServiceClient};
use crate::model::{ClusterStatus, JobStatus};
use crate::utils::PathSearch;
use crate::waiter::{RefreshResult, StateChangeConf, WaitError, COMPLETED, PENDING};

mod cluster;
mod disaster_recovery_task;
mod ext_data_source;

pub use cluster::{DwsClusterDataSource, DwsClusterResource};
pub use disaster_recovery_task::DwsDisasterRecoveryTaskResource;
pub use ext_data_source::DwsExtDataSourceResource;

pub(crate) const SERVICE: &str = "dws";

/// Cluster IDs that are not UUIDs are rejected with this code
pub(crate) const CLUSTER_ID_ILLEGAL: &str = "DWS.0001";

/// Fetch a cluster, absent clusters are reported as 404
pub(crate) async fn get_cluster(client: &ServiceClient, cluster_id: &str) -> Result<Json, ClientError> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}",
        &[("cluster_id", cluster_id)],
    );
    client.get(&url).await.map_err(parse_cluster_not_found)
}

/// DWS.0047 (401) and DWS.0015 (403) both mean the cluster does not exist
pub(crate) fn parse_cluster_not_found(err: ClientError) -> ClientError {
    err.convert_expected(401, "error_code", "DWS.0047")
        .convert_expected(403, "error_code", "DWS.0015")
}

/// State of a cluster while waiting for it to become available
pub(crate) fn cluster_available_state(cluster: &Json) -> String {
    if cluster
        .search_i64("length(cluster.action_progress)")
        .unwrap_or(0)
        > 0
    {
        return PENDING.to_owned();
    }
    let status = ClusterStatus::from(cluster.search_str("cluster.status").unwrap_or_default());
    if status.is_ready() {
        COMPLETED.to_owned()
    } else if status.is_failed() {
        status.to_string()
    } else {
        PENDING.to_owned()
    }
}

/// State of a cluster while waiting for a management task to finish
pub(crate) fn cluster_task_state(cluster: &Json) -> String {
    let task_status = cluster.search_str("cluster.task_status").unwrap_or_default();
    let status = ClusterStatus::from(cluster.search_str("cluster.status").unwrap_or_default());
    if status.is_failed() {
        status.to_string()
    } else if task_status.is_empty() && status.is_ready() {
        COMPLETED.to_owned()
    } else {
        PENDING.to_owned()
    }
}

/// State of a cluster while waiting for its deletion
pub(crate) fn cluster_deleted_state(cluster: &Json) -> String {
    let status = ClusterStatus::from(cluster.search_str("cluster.status").unwrap_or_default());
    if status == ClusterStatus::Deleted {
        COMPLETED.to_owned()
    } else if status.is_delete_failed() {
        status.to_string()
    } else {
        PENDING.to_owned()
    }
}

async fn refresh_cluster(
    client: &ServiceClient,
    cluster_id: &str,
    classify: fn(&Json) -> String,
) -> RefreshResult {
    let cluster = get_cluster(client, cluster_id).await?;
    let state = classify(&cluster);
    Ok((Some(cluster), state))
}

pub(crate) async fn wait_cluster_available(
    client: &ServiceClient,
    cluster_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::new(|| refresh_cluster(client, cluster_id, cluster_available_state))
        .timeout(timeout)
        .delay(Duration::from_secs(30))
        .poll_interval(Duration::from_secs(30))
        .wait_for_state()
        .await?;
    Ok(())
}

pub(crate) async fn wait_cluster_task_completed(
    client: &ServiceClient,
    cluster_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::new(|| refresh_cluster(client, cluster_id, cluster_task_state))
        .timeout(timeout)
        .delay(Duration::from_secs(30))
        .poll_interval(Duration::from_secs(30))
        .wait_for_state()
        .await?;
    Ok(())
}

pub(crate) async fn wait_cluster_deleted(
    client: &ServiceClient,
    cluster_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::new(|| refresh_cluster_deleted(client, cluster_id))
        .timeout(timeout)
        .delay(Duration::from_secs(30))
        .poll_interval(Duration::from_secs(30))
        .wait_for_state()
        .await?;
    Ok(())
}

async fn refresh_cluster_deleted(client: &ServiceClient, cluster_id: &str) -> RefreshResult {
    match get_cluster(client, cluster_id).await {
        Ok(cluster) => {
            let state = cluster_deleted_state(&cluster);
            Ok((Some(cluster), state))
        }
        // Gone for good
        Err(err) if err.is_not_found() => Ok((Some(Json::Null), COMPLETED.to_owned())),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn get_job(client: &ServiceClient, job_id: &str) -> Result<Json, ClientError> {
    let url = client.url("v1.0/{project_id}/job/{job_id}", &[("job_id", job_id)]);
    client.get(&url).await
}

/// Status of a job, failed jobs abort the wait with their failure details
pub(crate) fn job_status(job_id: &str, job: &Json) -> anyhow::Result<String> {
    let status = JobStatus::from(job.search_str("status").unwrap_or_default());
    if status == JobStatus::Fail {
        return Err(anyhow!(
            "job {job_id} failed, failed_code: {}, failed_detail: {}",
            job.search_str("failed_code").unwrap_or_default(),
            job.search_str("failed_detail").unwrap_or_default(),
        ));
    }
    Ok(status.to_string())
}

/// State of a job that must end in success
pub(crate) fn job_completion_state(job: &Json) -> String {
    let status = JobStatus::from(job.search_str("status").unwrap_or_default());
    if status.is_ready() {
        COMPLETED.to_owned()
    } else if status.is_failed() {
        status.to_string()
    } else {
        PENDING.to_owned()
    }
}

/// Wait for a job started by an ELB binding change
pub(crate) async fn wait_job_success(
    client: &ServiceClient,
    job_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::new(|| refresh_job(client, job_id))
        .pending([JobStatus::Init.as_str(), JobStatus::Running.as_str()])
        .target([JobStatus::Success.as_str()])
        .timeout(timeout)
        .delay(Duration::from_secs(60))
        .poll_interval(Duration::from_secs(10))
        .wait_for_state()
        .await?;
    Ok(())
}

async fn refresh_job(client: &ServiceClient, job_id: &str) -> RefreshResult {
    let job = get_job(client, job_id).await?;
    let status = job_status(job_id, &job)?;
    Ok((Some(job), status))
}

/// Wait for a job started on an external data source
pub(crate) async fn wait_job_completed(
    client: &ServiceClient,
    job_id: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    StateChangeConf::new(|| refresh_job_completion(client, job_id))
        .timeout(timeout)
        .delay(Duration::from_secs(30))
        .poll_interval(Duration::from_secs(30))
        .wait_for_state()
        .await?;
    Ok(())
}

async fn refresh_job_completion(client: &ServiceClient, job_id: &str) -> RefreshResult {
    let job = get_job(client, job_id).await?;
    let state = job_completion_state(&job);
    Ok((Some(job), state))
}
