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

//! GaussDB(DWS) clusters

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value as Json};
use tf_provider::value::{Value, ValueMap, ValueString};

use crate::client::{ClientError, ServiceClient};
use crate::utils::{expand_resource_tags, remove_nil, value_ignore_empty, PathSearch, ToJson};

use super::{get_cluster, wait_cluster_task_completed, wait_job_success};

mod data_source;
mod resource;
mod state;

pub use data_source::DwsClusterDataSource;
pub use resource::DwsClusterResource;

use state::{ClusterState, PublicIp, Volume};

/// LTS is already in the requested state
const LTS_UNCHANGED: &str = "DWS.7107";
const CLUSTER_NOT_EXIST: &str = "DWS.0015";
const SHRINK_ACCEPTED: &str = "DWS.0000";

fn ignore_empty<T: Serialize>(value: &Value<T>) -> Json {
    value_ignore_empty(value.to_json())
}

fn public_ip_body(public_ip: &Value<PublicIp>) -> Json {
    match public_ip {
        Value::Value(public_ip) => json!({
            "public_bind_type": ignore_empty(&public_ip.public_bind_type),
            "eip_id": ignore_empty(&public_ip.eip_id),
        }),
        _ => Json::Null,
    }
}

fn volume_body(volume: &Value<Volume>) -> Json {
    match volume {
        Value::Value(volume) => json!({
            "volume": ignore_empty(&volume.volume_type),
            "capacity": ignore_empty(&volume.capacity),
        }),
        _ => Json::Null,
    }
}

/// Creation body of the v2 API, used when a cluster version is given
pub(super) fn build_create_body_v2(
    state: &ClusterState,
    enterprise_project_id: Option<&str>,
) -> Json {
    let availability_zones = state
        .availability_zone
        .as_deref_option()
        .unwrap_or_default()
        .split(',')
        .collect::<Vec<_>>();

    remove_nil(json!({
        "cluster": {
            "name": ignore_empty(&state.name),
            "flavor": ignore_empty(&state.node_type),
            "num_node": ignore_empty(&state.number_of_node),
            "num_cn": ignore_empty(&state.number_of_cn),
            "db_name": ignore_empty(&state.user_name),
            "db_password": ignore_empty(&state.user_pwd),
            "db_port": ignore_empty(&state.port),
            "availability_zones": availability_zones,
            "vpc_id": ignore_empty(&state.vpc_id),
            "subnet_id": ignore_empty(&state.network_id),
            "security_group_id": ignore_empty(&state.security_group_id),
            "datastore_version": ignore_empty(&state.version),
            "dss_pool_id": ignore_empty(&state.dss_pool_id),
            "enterprise_project_id": value_ignore_empty(json!(enterprise_project_id)),
            "master_key_id": ignore_empty(&state.kms_key_id),
            "public_ip": public_ip_body(&state.public_ip),
            "volume": volume_body(&state.volume),
            "tags": expand_resource_tags(&state.tags),
        }
    }))
}

/// Creation body of the v1 API
pub(super) fn build_create_body_v1(
    state: &ClusterState,
    enterprise_project_id: Option<&str>,
) -> Json {
    remove_nil(json!({
        "cluster": {
            "name": ignore_empty(&state.name),
            "node_type": ignore_empty(&state.node_type),
            "number_of_node": ignore_empty(&state.number_of_node),
            "number_of_cn": ignore_empty(&state.number_of_cn),
            "user_name": ignore_empty(&state.user_name),
            "user_pwd": ignore_empty(&state.user_pwd),
            "port": ignore_empty(&state.port),
            "availability_zone": ignore_empty(&state.availability_zone),
            "vpc_id": ignore_empty(&state.vpc_id),
            "subnet_id": ignore_empty(&state.network_id),
            "security_group_id": ignore_empty(&state.security_group_id),
            "enterprise_project_id": value_ignore_empty(json!(enterprise_project_id)),
            "public_ip": public_ip_body(&state.public_ip),
            "tags": expand_resource_tags(&state.tags),
        }
    }))
}

/// Create a cluster and return its ID
pub(super) async fn create_cluster(client: &ServiceClient, body: &Json, v2: bool) -> Result<String> {
    let template = if v2 {
        "v2/{project_id}/clusters"
    } else {
        "v1.0/{project_id}/clusters"
    };
    let response = client
        .post(&client.url(template, &[]), body)
        .await
        .context("error creating DWS cluster")?;

    response
        .search_str("cluster.id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("unable to find the DWS Cluster ID from the API response"))
}

pub(super) async fn enable_logical_cluster(
    client: &ServiceClient,
    cluster_id: &str,
    enable: bool,
) -> Result<()> {
    let url = client.url(
        "v2/{project_id}/clusters/{cluster_id}/logical-clusters/enable",
        &[("cluster_id", cluster_id)],
    );
    client
        .put(&url, &json!({ "enable": enable }))
        .await
        .context("error updating DWS logical cluster switch")?;
    Ok(())
}

fn elb_url(client: &ServiceClient, cluster_id: &str, elb_id: &str) -> String {
    client.url(
        "v2/{project_id}/clusters/{cluster_id}/elbs/{elb_id}",
        &[("cluster_id", cluster_id), ("elb_id", elb_id)],
    )
}

fn job_id(response: &Json) -> Option<String> {
    response.search_str("job_id").filter(|id| !id.is_empty())
}

pub(super) async fn bind_elb(
    client: &ServiceClient,
    cluster_id: &str,
    elb_id: &str,
    timeout: Duration,
) -> Result<()> {
    if elb_id.is_empty() {
        return Ok(());
    }

    let response = client
        .post(&elb_url(client, cluster_id, elb_id), &json!({}))
        .await
        .context("error binding ELB to DWS cluster")?;
    let job_id = job_id(&response).ok_or_else(|| {
        anyhow!("error binding ELB to DWS cluster: job ID is not found in API response")
    })?;

    wait_job_success(client, &job_id, timeout)
        .await
        .context("error waiting for binding ELB to DWS cluster")
}

pub(super) async fn unbind_elb(
    client: &ServiceClient,
    cluster_id: &str,
    elb_id: &str,
    timeout: Duration,
) -> Result<()> {
    if elb_id.is_empty() {
        return Ok(());
    }

    let response = client
        .delete(&elb_url(client, cluster_id, elb_id), None)
        .await
        .context("error unbinding ELB from DWS cluster")?;
    let job_id = job_id(&response).ok_or_else(|| {
        anyhow!("error unbinding ELB from DWS cluster: job ID is not found in API response")
    })?;

    wait_job_success(client, &job_id, timeout)
        .await
        .context("error waiting for unbinding ELB from DWS cluster")
}

pub(super) async fn set_lts(
    client: &ServiceClient,
    cluster_id: &str,
    enable: bool,
) -> Result<(), ClientError> {
    let action = if enable { "enable" } else { "disable" };
    let url = client.url(
        "v1/{project_id}/clusters/{cluster_id}/lts-logs/{action}",
        &[("cluster_id", cluster_id), ("action", action)],
    );
    client.post(&url, &json!({})).await?;
    Ok(())
}

/// LTS switch errors: an unchanged state is ignored, a missing cluster is a 404
pub(super) fn parse_lts_error(err: ClientError) -> Result<(), ClientError> {
    if err.status() == Some(400) && err.error_code("error_code").as_deref() == Some(LTS_UNCHANGED) {
        tracing::warn!("LTS of the DWS cluster is already in the requested state");
        return Ok(());
    }
    Err(err.convert_expected(400, "error_code", CLUSTER_NOT_EXIST))
}

pub(super) async fn update_description(
    client: &ServiceClient,
    cluster_id: &str,
    description: &str,
) -> Result<()> {
    let url = client.url(
        "v1/{project_id}/clusters/{cluster_id}/description",
        &[("cluster_id", cluster_id)],
    );
    // An empty description clears the current one
    client
        .post(&url, &json!({ "description_info": description }))
        .await
        .with_context(|| format!("unable to set description for the cluster ({cluster_id})"))?;
    Ok(())
}

pub(super) async fn update_security_group(
    client: &ServiceClient,
    cluster_id: &str,
    security_group_id: &str,
) -> Result<()> {
    let url = client.url(
        "v1/{project_id}/clusters/{cluster_id}/security-group",
        &[("cluster_id", cluster_id)],
    );
    client
        .put(&url, &json!({ "security_groups": [security_group_id] }))
        .await
        .with_context(|| {
            format!("error updating security group for the cluster ({cluster_id})")
        })?;
    Ok(())
}

pub(super) async fn expand_volume(
    client: &ServiceClient,
    cluster_id: &str,
    capacity: &ValueString<'_>,
) -> Result<()> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/expand-instance-storage",
        &[("cluster_id", cluster_id)],
    );
    client
        .post(&url, &remove_nil(json!({ "new_size": ignore_empty(capacity) })))
        .await
        .context("error updating DWS cluster")?;
    Ok(())
}

pub(super) async fn reset_password(
    client: &ServiceClient,
    cluster_id: &str,
    password: &ValueString<'_>,
) -> Result<()> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/reset-password",
        &[("cluster_id", cluster_id)],
    );
    client
        .post(&url, &remove_nil(json!({ "new_password": ignore_empty(password) })))
        .await
        .context("error updating DWS cluster")?;
    Ok(())
}

async fn scale_out(client: &ServiceClient, cluster_id: &str, count: i64) -> Result<()> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/resize",
        &[("cluster_id", cluster_id)],
    );
    client
        .post(&url, &json!({ "scale_out": { "count": count } }))
        .await
        .with_context(|| format!("error extending nodes of the DWS cluster ({cluster_id})"))?;
    Ok(())
}

/// Shrink answers 200 even on failure, success is `DWS.0000` or a job ID
fn check_shrink_response(cluster_id: &str, response: &Json) -> Result<()> {
    if response.search_str("error_code").as_deref() == Some(SHRINK_ACCEPTED)
        || job_id(response).is_some()
    {
        return Ok(());
    }
    Err(anyhow!(
        "error shrinking nodes of the DWS cluster ({cluster_id}) : {}",
        response.search_str("error_msg").unwrap_or_default()
    ))
}

async fn scale_in(
    client: &ServiceClient,
    cluster_id: &str,
    count: i64,
    force_backup: bool,
) -> Result<()> {
    let cluster = get_cluster(client, cluster_id).await?;
    let datastore_type = cluster
        .search_str("cluster.datastore_type")
        .filter(|datastore_type| !datastore_type.is_empty())
        .ok_or_else(|| anyhow!("unable to get datastore type of the cluster ({cluster_id})"))?;

    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/cluster-shrink",
        &[("cluster_id", cluster_id)],
    );
    let body = json!({
        "shrink_number": count,
        "force_backup": force_backup,
        "type": datastore_type,
    });
    let response = client.post(&url, &body).await?;
    check_shrink_response(cluster_id, &response)
}

/// Scale the cluster to `new` nodes and wait for the task to settle
pub(super) async fn resize_cluster(
    client: &ServiceClient,
    cluster_id: &str,
    old: i64,
    new: i64,
    force_backup: bool,
    timeout: Duration,
) -> Result<()> {
    let delta = new - old;
    tracing::info!("resizing DWS cluster {cluster_id} from {old} to {new} nodes");
    if delta > 0 {
        scale_out(client, cluster_id, delta).await?;
    } else {
        scale_in(client, cluster_id, -delta, force_backup).await?;
    }

    wait_cluster_task_completed(client, cluster_id, timeout)
        .await
        .with_context(|| {
            format!("error waiting for the DWS cluster ({cluster_id}) task to complete")
        })
}

async fn batch_tags(
    client: &ServiceClient,
    cluster_id: &str,
    action: &str,
    tags: &ValueMap<'_, ValueString<'_>>,
) -> Result<(), ClientError> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/tags/{action}",
        &[("cluster_id", cluster_id), ("action", action)],
    );
    client
        .post(&url, &json!({ "tags": expand_resource_tags(tags) }))
        .await?;
    Ok(())
}

/// Replace every tag of the cluster: old tags are removed before the new ones are set
pub(super) async fn update_tags(
    client: &ServiceClient,
    cluster_id: &str,
    old: &ValueMap<'_, ValueString<'_>>,
    new: &ValueMap<'_, ValueString<'_>>,
) -> Result<()> {
    let non_empty = |tags: &ValueMap<'_, ValueString<'_>>| {
        tags.as_ref_option().is_some_and(|tags| !tags.is_empty())
    };

    if non_empty(old) {
        batch_tags(client, cluster_id, "batch-delete", old)
            .await
            .context("error deleting tags of DWS cluster")?;
    }
    if non_empty(new) {
        batch_tags(client, cluster_id, "batch-create", new)
            .await
            .context("error adding tags of DWS cluster")?;
    }
    Ok(())
}

/// Swap the EIP bound to the cluster, empty IDs are skipped
pub(super) async fn update_eip(
    client: &ServiceClient,
    cluster_id: &str,
    old_eip_id: &str,
    new_eip_id: &str,
) -> Result<()> {
    let url = |eip_id: &str| {
        client.url(
            "v2/{project_id}/clusters/{cluster_id}/eips/{eip_id}",
            &[("cluster_id", cluster_id), ("eip_id", eip_id)],
        )
    };

    if !old_eip_id.is_empty() {
        client.delete(&url(old_eip_id), None).await.with_context(|| {
            format!("error unbinding EIP ({old_eip_id}) from DWS instance ({cluster_id})")
        })?;
    }
    if !new_eip_id.is_empty() {
        client
            .post(&url(new_eip_id), &json!({}))
            .await
            .with_context(|| {
                format!("error binding EIP ({new_eip_id}) to DWS instance ({cluster_id})")
            })?;
    }
    Ok(())
}

pub(super) async fn delete_cluster(
    client: &ServiceClient,
    cluster_id: &str,
    keep_last_manual_snapshot: i64,
) -> Result<(), ClientError> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}",
        &[("cluster_id", cluster_id)],
    );
    let body = json!({ "keep_last_manual_snapshot": keep_last_manual_snapshot });
    client.delete(&url, Some(&body)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::client::ApiError;

    fn planned() -> ClusterState<'static> {
        ClusterState {
            name: Value::Value(Cow::Borrowed("dws-demo")),
            node_type: Value::Value(Cow::Borrowed("dws2.m6.4xlarge.8")),
            number_of_node: Value::Value(3),
            user_name: Value::Value(Cow::Borrowed("dbadmin")),
            user_pwd: Value::Value(Cow::Borrowed("Secret@123")),
            vpc_id: Value::Value(Cow::Borrowed("vpc-1")),
            network_id: Value::Value(Cow::Borrowed("subnet-1")),
            security_group_id: Value::Value(Cow::Borrowed("sg-1")),
            availability_zone: Value::Value(Cow::Borrowed("cn-north-4a,cn-north-4b")),
            version: Value::Value(Cow::Borrowed("8.1.3.110")),
            port: Value::Value(8000),
            dss_pool_id: Value::Value(Cow::Borrowed("")),
            public_ip: Value::Value(PublicIp {
                public_bind_type: Value::Value(Cow::Borrowed("auto_assign")),
                eip_id: Value::Unknown,
            }),
            volume: Value::Value(Volume {
                volume_type: Value::Value(Cow::Borrowed("SSD")),
                capacity: Value::Value(Cow::Borrowed("300")),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_create_body_v2() {
        let body = build_create_body_v2(&planned(), Some("0"));
        assert_eq!(
            body,
            json!({
                "cluster": {
                    "name": "dws-demo",
                    "flavor": "dws2.m6.4xlarge.8",
                    "num_node": 3,
                    "db_name": "dbadmin",
                    "db_password": "Secret@123",
                    "db_port": 8000,
                    "availability_zones": ["cn-north-4a", "cn-north-4b"],
                    "vpc_id": "vpc-1",
                    "subnet_id": "subnet-1",
                    "security_group_id": "sg-1",
                    "datastore_version": "8.1.3.110",
                    "enterprise_project_id": "0",
                    "public_ip": {"public_bind_type": "auto_assign"},
                    "volume": {"volume": "SSD", "capacity": "300"},
                    "tags": [],
                }
            })
        );
    }

    #[test]
    fn test_build_create_body_v1() {
        let body = build_create_body_v1(&planned(), None);
        let cluster = &body["cluster"];
        assert_eq!(cluster["node_type"], "dws2.m6.4xlarge.8");
        assert_eq!(cluster["availability_zone"], "cn-north-4a,cn-north-4b");
        assert_eq!(cluster["user_pwd"], "Secret@123");
        assert!(cluster.get("enterprise_project_id").is_none());
        assert!(cluster.get("volume").is_none());
        assert!(cluster.get("datastore_version").is_none());
    }

    #[test]
    fn test_check_shrink_response() {
        assert!(check_shrink_response("c", &json!({"error_code": "DWS.0000"})).is_ok());
        assert!(check_shrink_response("c", &json!({"job_id": "j-1"})).is_ok());
        let err = check_shrink_response(
            "c",
            &json!({"error_code": "DWS.6008", "error_msg": "invalid shrink number"}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "error shrinking nodes of the DWS cluster (c) : invalid shrink number"
        );
    }

    #[test]
    fn test_parse_lts_error() {
        let error = |status: u16, code: &str| {
            ClientError::Api(ApiError {
                method: "POST".to_owned(),
                url: "https://dws.example.com".to_owned(),
                status,
                body: json!({"error_code": code}).to_string(),
                request_id: "r".to_owned(),
            })
        };
        assert!(parse_lts_error(error(400, "DWS.7107")).is_ok());
        assert!(parse_lts_error(error(400, "DWS.0015"))
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            parse_lts_error(error(500, "DWS.7107")).unwrap_err().status(),
            Some(500)
        );
    }
}
