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

//! Disaster recovery between a primary and a standby DWS cluster

use std::borrow::Cow;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{self, Value, ValueEmpty, ValueList, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::client::{ClientError, ServiceClient};
use crate::config::ConfigHandle;
use crate::model::DisasterRecoveryStatus;
use crate::utils::{
    changed_attributes, computed, replace_triggers, settle_unknowns, string_at, PathSearch,
    ReportError, TimeoutKind, Timeouts, WithSchema, WithTimeouts, WithValidate, ID_ATTRIBUTE,
    REGION_ATTRIBUTE, TIMEOUTS_BLOCK,
};
use crate::waiter::{RefreshResult, StateChangeConf, COMPLETED, PENDING};

use super::SERVICE;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Reported with a 400 when the task does not exist
const TASK_NOT_EXIST: &str = "DWS.10101";

const ACTION_START: &str = "start";
const ACTION_PAUSE: &str = "pause";
const ACTION_SWITCHOVER: &str = "switchover";

const FORCE_NEW: &[&str] = &[
    "region",
    "name",
    "dr_type",
    "primary_cluster_id",
    "standby_cluster_id",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClusterInfo<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub name: ValueString<'a>,
    pub cluster_az: ValueString<'a>,
    pub role: ValueString<'a>,
    pub status: ValueString<'a>,
    pub progress: ValueString<'a>,
    pub last_success_at: ValueString<'a>,
    pub obs_bucket_name: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DisasterRecoveryTaskState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub name: ValueString<'a>,
    pub dr_type: ValueString<'a>,
    pub primary_cluster_id: ValueString<'a>,
    pub standby_cluster_id: ValueString<'a>,
    pub dr_sync_period: ValueString<'a>,
    pub action: ValueString<'a>,
    pub status: ValueString<'a>,
    pub started_at: ValueString<'a>,
    pub created_at: ValueString<'a>,
    pub primary_cluster: ValueList<Value<ClusterInfo<'a>>>,
    pub standby_cluster: ValueList<Value<ClusterInfo<'a>>>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

fn flatten_cluster_info<'a>(body: &Json, expr: &str) -> ValueList<Value<ClusterInfo<'a>>> {
    let Some(cluster) = body.search(expr).filter(Json::is_object) else {
        return Value::Null;
    };
    Value::Value(vec![Value::Value(ClusterInfo {
        id: string_at(&cluster, "id"),
        region: string_at(&cluster, "region"),
        name: string_at(&cluster, "name"),
        cluster_az: string_at(&cluster, "cluster_az"),
        role: string_at(&cluster, "role"),
        status: string_at(&cluster, "status"),
        progress: string_at(&cluster, "progress"),
        last_success_at: string_at(&cluster, "last_success_time"),
        obs_bucket_name: string_at(&cluster, "obs_bucket_name"),
    })])
}

impl<'a> DisasterRecoveryTaskState<'a> {
    fn unknown_outputs(&mut self) {
        self.status = Value::Unknown;
        self.started_at = Value::Unknown;
        self.primary_cluster = Value::Unknown;
        self.standby_cluster = Value::Unknown;
    }

    fn settle(&mut self) {
        settle_unknowns!(
            self,
            [
                id,
                region,
                status,
                started_at,
                created_at,
                primary_cluster,
                standby_cluster,
            ]
        );
    }

    fn apply_response(&mut self, region: &str, body: &Json) {
        self.region = Value::Value(Cow::Owned(region.to_owned()));
        self.name = string_at(body, "disaster_recovery.name");
        self.dr_sync_period = string_at(body, "disaster_recovery.dr_sync_period");
        self.dr_type = string_at(body, "disaster_recovery.dr_type");
        self.status = Value::Value(Cow::Owned(
            body.search_str("disaster_recovery.status").unwrap_or_default(),
        ));
        self.started_at = string_at(body, "disaster_recovery.start_time");
        self.created_at = string_at(body, "disaster_recovery.create_time");
        self.primary_cluster = flatten_cluster_info(body, "disaster_recovery.primary_cluster");
        self.standby_cluster = flatten_cluster_info(body, "disaster_recovery.standby_cluster");
    }
}

lazy_static! {
    static ref CLUSTER_INFO_ATTRIBUTES: std::collections::HashMap<String, Attribute> = map! {
        "id" => computed(AttributeType::String, "The ID of the cluster."),
        "region" => computed(AttributeType::String, "The region of the cluster."),
        "name" => computed(AttributeType::String, "The name of the cluster."),
        "cluster_az" => computed(AttributeType::String, "The availability zone of the cluster."),
        "role" => computed(AttributeType::String, "The role of the cluster in the task."),
        "status" => computed(AttributeType::String, "The status of the cluster."),
        "progress" => computed(AttributeType::String, "The synchronization progress."),
        "last_success_at" => computed(AttributeType::String, "The last successful synchronization time."),
        "obs_bucket_name" => computed(AttributeType::String, "The OBS bucket used by the task."),
    };
}

impl WithSchema for DisasterRecoveryTaskState<'_> {
    fn schema() -> Schema {
        let required = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => ID_ATTRIBUTE.clone(),
                    "region" => REGION_ATTRIBUTE.clone(),
                    "name" => required("The name of the disaster recovery task."),
                    "dr_type" => required("The type of the disaster recovery task."),
                    "primary_cluster_id" => required("The ID of the primary cluster."),
                    "standby_cluster_id" => required("The ID of the standby cluster."),
                    "dr_sync_period" => required("The synchronization period of the task."),
                    "action" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "The action to apply to the task: start, pause or switchover.",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "status" => computed(AttributeType::String, "The status of the task."),
                    "started_at" => computed(AttributeType::String, "The start time of the task."),
                    "created_at" => computed(AttributeType::String, "The creation time of the task."),
                    "primary_cluster" => computed(
                        AttributeType::AttributeList(CLUSTER_INFO_ATTRIBUTES.clone()),
                        "The primary cluster of the task.",
                    ),
                    "standby_cluster" => computed(
                        AttributeType::AttributeList(CLUSTER_INFO_ATTRIBUTES.clone()),
                        "The standby cluster of the task.",
                    ),
                },
                blocks: map! {
                    "timeouts" => TIMEOUTS_BLOCK.clone(),
                },
                description: Description::plain("Manages a DWS disaster recovery task"),
                ..Default::default()
            },
        }
    }
}

fn build_create_body(state: &DisasterRecoveryTaskState) -> Json {
    json!({
        "disaster_recovery": {
            "name": state.name.as_deref_option(),
            "dr_type": state.dr_type.as_deref_option(),
            "primary_cluster_id": state.primary_cluster_id.as_deref_option(),
            "standby_cluster_id": state.standby_cluster_id.as_deref_option(),
            "dr_sync_period": state.dr_sync_period.as_deref_option(),
        }
    })
}

fn task_url(client: &ServiceClient, id: &str) -> String {
    client.url(
        "v2/{project_id}/disaster-recovery/{disaster_recovery_id}",
        &[("disaster_recovery_id", id)],
    )
}

async fn get_task(client: &ServiceClient, id: &str) -> Result<Json, ClientError> {
    client
        .get(&task_url(client, id))
        .await
        .map_err(|err| err.convert_expected(400, "error_code", TASK_NOT_EXIST))
}

async fn do_action(client: &ServiceClient, id: &str, action: &str) -> Result<(), ClientError> {
    let url = client.url(
        "v2/{project_id}/disaster-recovery/{disaster_recovery_id}/{action}",
        &[("disaster_recovery_id", id), ("action", action)],
    );
    client
        .post(&url, &json!({}))
        .await
        .map_err(|err| err.convert_expected(400, "error_code", TASK_NOT_EXIST))?;
    Ok(())
}

/// Classify a task: failed statuses abort, reaching a target completes the wait
fn task_state(body: &Json, targets: &[&str]) -> Result<String> {
    let status = DisasterRecoveryStatus::from(
        body.search_str("disaster_recovery.status")
            .unwrap_or_default(),
    );
    if status.is_failed() {
        bail!("unexpect status ({status})");
    }
    if targets.contains(&status.as_str()) {
        Ok(COMPLETED.to_owned())
    } else {
        Ok(PENDING.to_owned())
    }
}

/// While stopping, a failed stop ends the wait as well
fn stop_state(body: &Json) -> String {
    let status = DisasterRecoveryStatus::from(
        body.search_str("disaster_recovery.status")
            .unwrap_or_default(),
    );
    match status {
        DisasterRecoveryStatus::Stopped | DisasterRecoveryStatus::StopFailed => COMPLETED.to_owned(),
        _ => PENDING.to_owned(),
    }
}

async fn refresh_task(client: &ServiceClient, id: &str, targets: &[&str]) -> RefreshResult {
    match get_task(client, id).await {
        Ok(body) => {
            let state = task_state(&body, targets)?;
            Ok((Some(body), state))
        }
        Err(err) if err.is_not_found() && targets.is_empty() => {
            Ok((Some(Json::Null), COMPLETED.to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn refresh_stop(client: &ServiceClient, id: &str) -> RefreshResult {
    match get_task(client, id).await {
        Ok(body) => {
            let state = stop_state(&body);
            Ok((Some(body), state))
        }
        Err(err) if err.is_not_found() => Ok((Some(Json::Null), COMPLETED.to_owned())),
        Err(err) => Err(err.into()),
    }
}

/// Wait for the task to reach `target`, or to disappear when `target` is `None`
async fn wait_task(
    client: &ServiceClient,
    id: &str,
    target: Option<DisasterRecoveryStatus>,
    timeout: Duration,
) -> Result<()> {
    let targets: Vec<&str> = target.iter().map(DisasterRecoveryStatus::as_str).collect();
    StateChangeConf::new(|| refresh_task(client, id, &targets))
        .timeout(timeout)
        .delay(POLL_INTERVAL)
        .poll_interval(POLL_INTERVAL)
        .wait_for_state()
        .await?;
    Ok(())
}

async fn wait_task_stopped(client: &ServiceClient, id: &str, timeout: Duration) -> Result<()> {
    StateChangeConf::new(|| refresh_stop(client, id))
        .timeout(timeout)
        .delay(POLL_INTERVAL)
        .poll_interval(POLL_INTERVAL)
        .wait_for_state()
        .await?;
    Ok(())
}

/// Run an action and wait for the status it leads to
async fn apply_action(client: &ServiceClient, id: &str, action: &str, timeout: Duration) -> Result<()> {
    let (target, verb) = match action {
        ACTION_START => (DisasterRecoveryStatus::Running, "start"),
        ACTION_PAUSE => (DisasterRecoveryStatus::Stopped, "stop"),
        ACTION_SWITCHOVER => (DisasterRecoveryStatus::Running, "switchover"),
        other => bail!("not supported action: {other}"),
    };
    tracing::info!("applying action {action} to DWS disaster recovery {id}");
    do_action(client, id, action)
        .await
        .with_context(|| format!("error running {verb} on DWS disaster recovery"))?;
    wait_task(client, id, Some(target), timeout)
        .await
        .with_context(|| {
            format!("error waiting for the {verb} of DWS disaster recovery ({id}) to complete")
        })
}

#[derive(Debug, Default, Clone)]
pub struct DwsDisasterRecoveryTaskResource {
    config: ConfigHandle,
}

impl DwsDisasterRecoveryTaskResource {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    async fn client(&self, region: &ValueString<'_>) -> Result<(String, ServiceClient)> {
        let config = self.config.get().await?;
        let region = config.region_or(region.as_deref_option());
        let client = config
            .service_client(SERVICE, &region)
            .await
            .context("error creating DWS client")?;
        Ok((region, client))
    }
}

#[async_trait]
impl Resource for DwsDisasterRecoveryTaskResource {
    type State<'a> = DisasterRecoveryTaskState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(DisasterRecoveryTaskState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config
            .timeouts
            .validate(diags, AttributePath::new("timeouts"));
        if let Some(action) = config.action.as_deref_option() {
            if ![ACTION_START, ACTION_PAUSE, ACTION_SWITCHOVER].contains(&action) {
                diags.error(
                    "Invalid `action`",
                    format!("not supported action: {action}"),
                    AttributePath::new("action"),
                );
            }
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (region, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error reading DWS disaster recovery")?;
        let id = state.id.as_deref_option().unwrap_or_default().to_owned();

        match get_task(&client, &id).await {
            Ok(body) => {
                let mut state = state;
                state.apply_response(&region, &body);
                state.settle();
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::warn!("DWS disaster recovery {id} not found, removing it from the state");
                diags.root_warning(
                    "DWS disaster recovery not found",
                    format!("The disaster recovery task {id} does not exist anymore and has been removed from the state"),
                );
                None
            }
            Err(err) => Err(err).or_report(diags, "Error retrieving DWS disaster recovery"),
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.created_at = Value::Unknown;
        state.unknown_outputs();
        if state.region.is_null() {
            state.region = match self.config.get().await {
                Ok(config) => Value::Value(Cow::Owned(config.region.clone())),
                Err(_) => Value::Unknown,
            };
        }
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<AttributePath>,
    )> {
        let mut state = proposed_state;
        let changed = changed_attributes!(
            prior_state,
            state,
            [
                region,
                name,
                dr_type,
                primary_cluster_id,
                standby_cluster_id,
                dr_sync_period,
                action,
            ]
        );
        let trigger_replace = replace_triggers(&changed, FORCE_NEW);
        if !changed.is_empty() {
            state.unknown_outputs();
        }
        Some((state, prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error creating DWS disaster recovery")?;
        let mut state = planned_state;

        let url = client.url("v2/{project_id}/disaster-recoveries", &[]);
        let response = client
            .post(&url, &build_create_body(&state))
            .await
            .or_report(diags, "error creating DWS disaster recovery")?;
        let id = response
            .search_str("disaster_recovery.id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("unable to find the DWS disaster recovery ID from the API response"))
            .or_report(diags, "Error creating DWS disaster recovery")?;
        tracing::info!("created DWS disaster recovery {id}");
        state.id = Value::Value(Cow::Owned(id.clone()));
        state.region = Value::Value(Cow::Owned(region.clone()));

        let timeout = state.timeouts.timeout(TimeoutKind::Create, DEFAULT_TIMEOUT);
        let started = async {
            wait_task(&client, &id, Some(DisasterRecoveryStatus::Unstart), timeout)
                .await
                .with_context(|| {
                    format!("error waiting for the creation of DWS disaster recovery ({id}) to complete")
                })?;
            if state.action.as_deref_option() == Some(ACTION_START) {
                apply_action(&client, &id, ACTION_START, timeout).await?;
            }
            get_task(&client, &id)
                .await
                .context("error retrieving DWS disaster recovery")
        }
        .await
        .or_report(diags, "Error creating DWS disaster recovery");

        if let Some(body) = started {
            state.apply_response(&region, &body);
        }
        state.settle();
        Some((state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error updating DWS disaster recovery")?;
        let id = prior_state.id.as_deref_option().unwrap_or_default().to_owned();
        let timeout = planned_state
            .timeouts
            .timeout(TimeoutKind::Update, DEFAULT_TIMEOUT);

        // Receives each change once it went through
        let mut applied = prior_state.clone();
        applied.timeouts = planned_state.timeouts.clone();

        let updated = async {
            if applied.dr_sync_period != planned_state.dr_sync_period {
                let body = json!({
                    "disaster_recovery": {
                        "dr_sync_period": planned_state.dr_sync_period.as_deref_option(),
                    }
                });
                client
                    .put(&task_url(&client, &id), &body)
                    .await
                    .map_err(|err| err.convert_expected(400, "error_code", TASK_NOT_EXIST))
                    .context("error updating DWS disaster recovery")?;
                applied.dr_sync_period = planned_state.dr_sync_period.clone();
            }
            if applied.action != planned_state.action {
                let action = planned_state.action.as_deref_option().unwrap_or_default();
                apply_action(&client, &id, action, timeout).await?;
                applied.action = planned_state.action.clone();
            }
            Ok::<_, anyhow::Error>(())
        }
        .await
        .or_report(diags, "Error updating DWS disaster recovery");
        if updated.is_none() {
            applied.settle();
            return Some((applied, private_state));
        }

        let mut state = planned_state;
        if let Some(body) = get_task(&client, &id)
            .await
            .or_report(diags, "Error retrieving DWS disaster recovery")
        {
            state.apply_response(&region, &body);
        }
        state.settle();
        Some((state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let (_, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error deleting DWS disaster recovery")?;
        let id = state.id.as_deref_option().unwrap_or_default();

        let body = match get_task(&client, id).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => {
                tracing::warn!("DWS disaster recovery {id} is already gone");
                return Some(());
            }
            Err(err) => {
                return Err(err).or_report(diags, "error deleting disaster recovery when check the status")
            }
        };

        let running = body.search_str("disaster_recovery.status").as_deref()
            == Some(DisasterRecoveryStatus::Running.as_str());
        if running {
            // A running task must be stopped before it can be deleted
            let update_timeout = state.timeouts.timeout(TimeoutKind::Update, DEFAULT_TIMEOUT);
            async {
                do_action(&client, id, ACTION_PAUSE)
                    .await
                    .context("error stopping DWS disaster recovery")?;
                wait_task_stopped(&client, id, update_timeout)
                    .await
                    .with_context(|| {
                        format!("error waiting for the stop of DWS disaster recovery ({id}) to complete")
                    })
            }
            .await
            .or_report(diags, "Error deleting DWS disaster recovery")?;
        }

        match client.delete(&task_url(&client, id), None).await {
            Ok(_) => (),
            Err(err) => match err.convert_expected(400, "error_code", TASK_NOT_EXIST) {
                err if err.is_not_found() => return Some(()),
                err => return Err(err).or_report(diags, "error deleting disaster recovery"),
            },
        }

        let timeout = state.timeouts.timeout(TimeoutKind::Delete, DEFAULT_TIMEOUT);
        wait_task(&client, id, None, timeout)
            .await
            .with_context(|| {
                format!("error waiting for the deleting of DWS disaster recovery ({id}) to complete")
            })
            .or_report(diags, "Error deleting DWS disaster recovery")
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = DisasterRecoveryTaskState {
            id: Value::Value(Cow::Owned(id)),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
