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

//! External data sources (MRS or OBS) attached to a DWS cluster

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{self, Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::client::{ClientError, ServiceClient};
use crate::config::{Config, ConfigHandle};
use crate::utils::{
    assign_string, changed_attributes, computed, remove_nil, replace_triggers, settle_unknowns,
    string_at, value_ignore_empty, PathSearch, ReportError, TimeoutKind, Timeouts, ToJson,
    WithSchema, WithTimeouts, WithValidate, ID_ATTRIBUTE, REGION_ATTRIBUTE, TIMEOUTS_BLOCK,
};

use super::{parse_cluster_not_found, wait_job_completed, CLUSTER_ID_ILLEGAL, SERVICE};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const TYPE_MRS: &str = "MRS";
const TYPE_OBS: &str = "OBS";

const FORCE_NEW: &[&str] = &[
    "region",
    "cluster_id",
    "name",
    "type",
    "data_source_id",
    "user_pwd",
    "connect_info",
    "description",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtDataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub cluster_id: ValueString<'a>,
    pub name: ValueString<'a>,
    #[serde(borrow = "'a", rename = "type")]
    pub source_type: ValueString<'a>,
    pub user_name: ValueString<'a>,
    pub data_source_id: ValueString<'a>,
    pub user_pwd: ValueString<'a>,
    pub connect_info: ValueString<'a>,
    pub reboot: ValueBool,
    pub description: ValueString<'a>,
    pub configure_status: ValueString<'a>,
    pub status: ValueString<'a>,
    pub created_at: ValueString<'a>,
    pub updated_at: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

impl<'a> ExtDataSourceState<'a> {
    fn unknown_outputs(&mut self) {
        self.configure_status = Value::Unknown;
        self.status = Value::Unknown;
        self.updated_at = Value::Unknown;
    }

    fn settle(&mut self) {
        settle_unknowns!(
            self,
            [
                id,
                region,
                data_source_id,
                connect_info,
                description,
                configure_status,
                status,
                created_at,
                updated_at,
            ]
        );
    }

    /// Copy an entry of the data source list into the state
    fn apply_response(&mut self, region: &str, data_source: &Json) {
        self.region = Value::Value(Cow::Owned(region.to_owned()));
        self.name = string_at(data_source, "name");
        self.source_type = string_at(data_source, "type");
        self.user_name = string_at(data_source, "user_name");
        assign_string(&mut self.data_source_id, string_at(data_source, "data_source_id"));
        assign_string(&mut self.connect_info, string_at(data_source, "connect_info"));
        assign_string(&mut self.description, string_at(data_source, "description"));
        self.configure_status = string_at(data_source, "configure_status");
        self.status = string_at(data_source, "status");
        self.created_at = string_at(data_source, "created");
        self.updated_at = string_at(data_source, "data_source_updated");
    }

    fn is_obs(&self) -> bool {
        self.source_type.as_deref_option() == Some(TYPE_OBS)
    }
}

fn input(attr_type: AttributeType, constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

impl WithSchema for ExtDataSourceState<'_> {
    fn schema() -> Schema {
        use AttributeConstraint::{Optional, OptionalComputed, Required};
        use AttributeType::Bool;

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => ID_ATTRIBUTE.clone(),
                    "region" => REGION_ATTRIBUTE.clone(),
                    "cluster_id" => input(AttributeType::String, Required, "The ID of the DWS cluster."),
                    "name" => input(AttributeType::String, Required, "The name of the external data source."),
                    "type" => input(AttributeType::String, Required, "The type of the external data source."),
                    "user_name" => input(AttributeType::String, Required, "The user name of the external data source."),
                    "data_source_id" => input(
                        AttributeType::String,
                        OptionalComputed,
                        "ID of the external data source. It is mandatory when **type** is **MRS**.",
                    ),
                    "user_pwd" => Attribute {
                        sensitive: true,
                        ..input(
                            AttributeType::String,
                            Optional,
                            "The password of the external data source. It is mandatory when **type** is **MRS**.",
                        )
                    },
                    "connect_info" => input(
                        AttributeType::String,
                        OptionalComputed,
                        "The connection information of the external data source. It is mandatory when **type** is **OBS**.",
                    ),
                    "reboot" => input(Bool, Optional, "Whether to reboot the cluster."),
                    "description" => input(AttributeType::String, OptionalComputed, "The description of the external data source."),
                    "configure_status" => computed(AttributeType::String, "The configure status of the external data source."),
                    "status" => computed(AttributeType::String, "The status of the external data source."),
                    "created_at" => computed(AttributeType::String, "The creation time of the external data source."),
                    "updated_at" => computed(AttributeType::String, "The updated time of the external data source."),
                },
                blocks: map! {
                    "timeouts" => TIMEOUTS_BLOCK.clone(),
                },
                description: Description::plain("Manages an external data source of a DWS cluster"),
                ..Default::default()
            },
        }
    }
}

fn ignore_empty<T: Serialize>(value: &Value<T>) -> Json {
    value_ignore_empty(value.to_json())
}

fn build_create_body(state: &ExtDataSourceState) -> Json {
    remove_nil(json!({
        "data_source_name": ignore_empty(&state.name),
        "type": ignore_empty(&state.source_type),
        "data_source_id": ignore_empty(&state.data_source_id),
        "user_name": ignore_empty(&state.user_name),
        "user_pwd": ignore_empty(&state.user_pwd),
        "connect_info": ignore_empty(&state.connect_info),
        "description": ignore_empty(&state.description),
    }))
}

/// OBS data sources carry their agency in `user_name`
fn build_update_body(state: &ExtDataSourceState) -> Json {
    let mut reconfigure = json!({ "reboot": ignore_empty(&state.reboot) });
    if state.is_obs() {
        reconfigure["agency"] = ignore_empty(&state.user_name);
    }
    remove_nil(json!({ "reconfigure": reconfigure }))
}

fn required_job_id(response: &Json, action: &str) -> Result<String> {
    response.search_str("job_id").ok_or_else(|| {
        anyhow!("error {action} DWS external data source: job_id is not found in API response")
    })
}

/// Look a data source up in the list of the given type
async fn get_ext_data_source(
    client: &ServiceClient,
    cluster_id: &str,
    id: &str,
    source_type: &str,
) -> Result<Option<Json>, ClientError> {
    let url = client.url(
        "v1.0/{project_id}/clusters/{cluster_id}/ext-data-sources?type={type}",
        &[("cluster_id", cluster_id), ("type", source_type)],
    );
    let response = client
        .get(&url)
        .await
        .map_err(|err| parse_cluster_not_found(err.convert_expected(400, "error_code", CLUSTER_ID_ILLEGAL)))?;
    Ok(select_data_source(&response, id))
}

fn select_data_source(response: &Json, id: &str) -> Option<Json> {
    response
        .search(&format!("data_sources[?id=='{id}']|[0]"))
        .filter(|data_source| !data_source.is_null())
}

/// Type of an imported data source, trying MRS first
async fn discover_type(client: &ServiceClient, cluster_id: &str, id: &str) -> Result<String> {
    for source_type in [TYPE_MRS, TYPE_OBS] {
        let found = get_ext_data_source(client, cluster_id, id, source_type)
            .await
            .context("error retrieving DWS external data source")?;
        if let Some(data_source) = found {
            return data_source.search_str("type").ok_or_else(|| {
                anyhow!("error import DWS external data source: type is not found in API response")
            });
        }
    }
    Err(anyhow!("DWS external data source {cluster_id}/{id} does not exist"))
}

fn parse_import_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once('/') {
        Some((cluster_id, id)) if !cluster_id.is_empty() && !id.is_empty() => Ok((cluster_id, id)),
        _ => Err(anyhow!(
            "invalid format specified for import id, must be <cluster_id>/<id>"
        )),
    }
}

#[derive(Debug, Default, Clone)]
pub struct DwsExtDataSourceResource {
    config: ConfigHandle,
}

impl DwsExtDataSourceResource {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    async fn client(
        &self,
        region: &ValueString<'_>,
    ) -> Result<(Arc<Config>, String, ServiceClient)> {
        let config = self.config.get().await?;
        let region = config.region_or(region.as_deref_option());
        let client = config
            .service_client(SERVICE, &region)
            .await
            .context("error creating DWS client")?;
        Ok((config, region, client))
    }
}

#[async_trait]
impl Resource for DwsExtDataSourceResource {
    type State<'a> = ExtDataSourceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ExtDataSourceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config
            .timeouts
            .validate(diags, AttributePath::new("timeouts"));

        match config.source_type.as_deref_option() {
            Some(TYPE_MRS) => {
                if config.data_source_id.is_null() {
                    diags.error_short(
                        "`data_source_id` is mandatory for MRS data sources",
                        AttributePath::new("data_source_id"),
                    );
                }
            }
            Some(TYPE_OBS) => {
                if config.connect_info.is_null() {
                    diags.error_short(
                        "`connect_info` is mandatory for OBS data sources",
                        AttributePath::new("connect_info"),
                    );
                }
            }
            Some(other) => diags.error(
                "Invalid `type`",
                format!("expected MRS or OBS, got '{other}'"),
                AttributePath::new("type"),
            ),
            None => (),
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
        let (_, region, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error reading DWS external data source")?;
        let cluster_id = state.cluster_id.as_deref_option().unwrap_or_default();
        let id = state.id.as_deref_option().unwrap_or_default();
        let source_type = state.source_type.as_deref_option().unwrap_or_default();

        let found = match get_ext_data_source(&client, cluster_id, id, source_type).await {
            Ok(found) => found,
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                return Err(err).or_report(diags, "error retrieving DWS external data source")
            }
        };
        let Some(data_source) = found else {
            tracing::warn!("DWS external data source {cluster_id}/{id} not found");
            diags.root_warning(
                "DWS external data source not found",
                format!("The data source {id} of cluster {cluster_id} does not exist anymore and has been removed from the state"),
            );
            return None;
        };

        let mut state = state;
        state.apply_response(&region, &data_source);
        state.settle();
        Some((state, private_state))
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
        for value in [
            &mut state.data_source_id,
            &mut state.connect_info,
            &mut state.description,
        ] {
            if value.is_null() {
                *value = Value::Unknown;
            }
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
                cluster_id,
                name,
                source_type,
                data_source_id,
                user_pwd,
                connect_info,
                description,
                reboot,
                user_name,
            ]
        );
        let mut trigger_replace = replace_triggers(&changed, FORCE_NEW);
        if changed.contains(&"source_type") {
            trigger_replace.push(AttributePath::new("type"));
        }
        if changed.contains(&"reboot") || changed.contains(&"user_name") {
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
        let (_, region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error creating DWS external data source")?;
        let mut state = planned_state;
        let cluster_id = state.cluster_id.as_deref_option().unwrap_or_default().to_owned();

        let url = client.url(
            "v1.0/{project_id}/clusters/{cluster_id}/ext-data-sources",
            &[("cluster_id", &cluster_id)],
        );
        let response = client
            .post(&url, &build_create_body(&state))
            .await
            .or_report(diags, "error creating DWS external data source")?;
        let id = response
            .search_str("id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("unable to find the DWS external data source ID from the API response"))
            .or_report(diags, "Error creating DWS external data source")?;
        tracing::info!("created DWS external data source {id} on cluster {cluster_id}");
        state.id = Value::Value(Cow::Owned(id.clone()));
        state.region = Value::Value(Cow::Owned(region.clone()));

        let timeout = state.timeouts.timeout(TimeoutKind::Create, DEFAULT_TIMEOUT);
        let completed = async {
            let job_id = required_job_id(&response, "creating")?;
            wait_job_completed(&client, &job_id, timeout)
                .await
                .with_context(|| {
                    format!("error waiting for the creation of external data source({id}) to complete")
                })?;
            get_ext_data_source(&client, &cluster_id, &id, state.source_type.as_deref_option().unwrap_or_default())
                .await
                .context("error retrieving DWS external data source")
        }
        .await
        .or_report(diags, "Error creating DWS external data source");

        if let Some(Some(data_source)) = completed {
            state.apply_response(&region, &data_source);
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
        let (_, region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error updating DWS external data source")?;
        let cluster_id = prior_state.cluster_id.as_deref_option().unwrap_or_default();
        let id = prior_state.id.as_deref_option().unwrap_or_default();

        if prior_state.reboot != planned_state.reboot || prior_state.user_name != planned_state.user_name {
            let timeout = planned_state
                .timeouts
                .timeout(TimeoutKind::Update, DEFAULT_TIMEOUT);
            let url = client.url(
                "v1.0/{project_id}/clusters/{cluster_id}/ext-data-sources/{ext_data_source_id}",
                &[("cluster_id", cluster_id), ("ext_data_source_id", id)],
            );
            let updated = async {
                let response = client
                    .put(&url, &build_update_body(&planned_state))
                    .await
                    .context("error updating DWS external data source")?;
                let job_id = required_job_id(&response, "updating")?;
                wait_job_completed(&client, &job_id, timeout)
                    .await
                    .with_context(|| {
                        format!("error waiting for the update of external data source({id}) to complete")
                    })
            }
            .await
            .or_report(diags, "Error updating DWS external data source");
            if updated.is_none() {
                return Some((prior_state, private_state));
            }
        }

        let mut state = planned_state;
        let source_type = state.source_type.as_deref_option().unwrap_or_default().to_owned();
        if let Some(Some(data_source)) = get_ext_data_source(&client, cluster_id, id, &source_type)
            .await
            .or_report(diags, "error retrieving DWS external data source")
        {
            state.apply_response(&region, &data_source);
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
        let (_, _, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error deleting DWS external data source")?;
        let cluster_id = state.cluster_id.as_deref_option().unwrap_or_default();
        let id = state.id.as_deref_option().unwrap_or_default();
        let timeout = state.timeouts.timeout(TimeoutKind::Delete, DEFAULT_TIMEOUT);

        let url = client.url(
            "v1.0/{project_id}/clusters/{cluster_id}/ext-data-sources/{ext_data_source_id}",
            &[("cluster_id", cluster_id), ("ext_data_source_id", id)],
        );
        async {
            let response = client
                .delete(&url, None)
                .await
                .context("error deleting DWS external data source")?;
            let job_id = required_job_id(&response, "deleting")?;
            wait_job_completed(&client, &job_id, timeout)
                .await
                .with_context(|| {
                    format!("error waiting for the delete of external data source({id}) to complete")
                })
        }
        .await
        .or_report(diags, "Error deleting DWS external data source")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (cluster_id, id) = parse_import_id(&id).or_report(diags, "Invalid import ID")?;
        let (_, _, client) = self
            .client(&Value::Null)
            .await
            .or_report(diags, "Error importing DWS external data source")?;
        let source_type = discover_type(&client, cluster_id, id)
            .await
            .or_report(diags, "Error importing DWS external data source")?;

        let state = ExtDataSourceState {
            id: Value::Value(Cow::Owned(id.to_owned())),
            cluster_id: Value::Value(Cow::Owned(cluster_id.to_owned())),
            source_type: Value::Value(Cow::Owned(source_type)),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}
