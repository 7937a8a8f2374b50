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

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value as Json};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::ServiceClient;
use crate::config::{Config, ConfigHandle};
use crate::utils::{
    changed_attributes, expand_resource_tags, remove_nil, replace_triggers, value_ignore_empty,
    PathSearch, ReportError, TimeoutKind, ToJson, WithSchema, WithTimeouts, WithValidate,
};

use super::state::{build_specs, InstanceState};
use super::{get_instance, instance_url, wait_instance_deleted, wait_instance_running, SERVICE};

const CREATE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

const FORCE_NEW: &[&str] = &["region"];
/// Replaced only when `enable_force_new` is "true", rejected otherwise
const NON_UPDATABLE: &[&str] = &["shared", "enterprise_project_id"];
const FORCE_NEW_VALUES: [&str; 2] = ["true", "false"];

fn build_create_body(state: &InstanceState, enterprise_project_id: Option<&str>) -> Json {
    remove_nil(json!({
        "name": state.name.as_deref_option(),
        "charge_mode": "postPaid",
        "shared": state.shared.as_option(),
        "specs": build_specs(&state.specs),
        "description": value_ignore_empty(state.description.to_json()),
        "enterprise_project_id": enterprise_project_id.filter(|id| !id.is_empty()),
        "tags": value_ignore_empty(expand_resource_tags(&state.tags)),
    }))
}

async fn create_instance(client: &ServiceClient, body: &Json) -> Result<String> {
    let url = client.url("v1/{project_id}/instances", &[]);
    let response = client
        .post(&url, body)
        .await
        .context("error creating instance")?;
    response
        .search_str("instance_id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("unable to find the instance ID from the API response"))
}

async fn update_instance(client: &ServiceClient, instance_id: &str, state: &InstanceState<'_>) -> Result<()> {
    let body = json!({
        "name": state.name.as_deref_option(),
        "description": state.description.as_deref_option().unwrap_or_default(),
    });
    client
        .put(&instance_url(client, instance_id), &body)
        .await
        .with_context(|| format!("error updating instance ({instance_id})"))?;
    Ok(())
}

async fn scale_instance(
    client: &ServiceClient,
    instance_id: &str,
    state: &InstanceState<'_>,
    timeout: Duration,
) -> Result<()> {
    let url = client.url(
        "v1/{project_id}/instances/{instance_id}/scale",
        &[("instance_id", instance_id)],
    );
    client
        .post(&url, &json!({ "specs": build_specs(&state.specs) }))
        .await
        .with_context(|| format!("error updating instance ({instance_id}) specs"))?;
    wait_instance_running(client, instance_id, timeout)
        .await
        .with_context(|| {
            format!("error waiting for the status of instance ({instance_id}) scale to complete")
        })
}

async fn update_instance_tags(
    client: &ServiceClient,
    instance_id: &str,
    state: &InstanceState<'_>,
) -> Result<()> {
    let url = client.url(
        "v1/{project_id}/instances/{instance_id}/tags",
        &[("instance_id", instance_id)],
    );
    client
        .put(&url, &json!({ "tags": expand_resource_tags(&state.tags) }))
        .await
        .with_context(|| format!("error updating tags of instance ({instance_id})"))?;
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct LakeFormationInstanceResource {
    config: ConfigHandle,
}

impl LakeFormationInstanceResource {
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
            .context("error creating LakeFormation client")?;
        Ok((config, region, client))
    }
}

#[async_trait]
impl Resource for LakeFormationInstanceResource {
    type State<'a> = InstanceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(InstanceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config
            .timeouts
            .validate(diags, AttributePath::new("timeouts"));
        for (index, spec) in config.specs.iter().flatten().enumerate() {
            let Some(spec) = spec.as_ref_option() else {
                continue;
            };
            if spec.spec_code.as_deref_option() == Some("") {
                diags.error_short(
                    "`spec_code` must not be empty",
                    AttributePath::new("specs").index(index as i64).attribute("spec_code"),
                );
            }
        }
        if let Some(value) = config.enable_force_new.as_deref_option() {
            if !FORCE_NEW_VALUES.contains(&value) {
                diags.error(
                    "Invalid `enable_force_new`",
                    format!("expected one of {}, got '{value}'", FORCE_NEW_VALUES.join(", ")),
                    AttributePath::new("enable_force_new"),
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
        let (_, region, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error reading LakeFormation instance")?;
        let instance_id = state.id.as_deref_option().unwrap_or_default().to_owned();

        match get_instance(&client, &instance_id).await {
            Ok(body) => {
                let mut state = state;
                state.apply_response(&region, &body);
                state.settle();
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::warn!("LakeFormation instance {instance_id} not found, removing it from the state");
                diags.root_warning(
                    "LakeFormation instance not found",
                    format!("The instance {instance_id} does not exist anymore and has been removed from the state"),
                );
                None
            }
            Err(err) => Err(err).or_report(diags, "error retrieving LakeFormation instance"),
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
        state.is_default = Value::Unknown;
        state.create_time = Value::Unknown;
        state.unknown_outputs();
        state.unknown_spec_fields();
        if state.region.is_null() {
            state.region = match self.config.get().await {
                Ok(config) => Value::Value(Cow::Owned(config.region.clone())),
                Err(_) => Value::Unknown,
            };
        }
        if state.enterprise_project_id.is_null() {
            state.enterprise_project_id = Value::Unknown;
        }
        if state.to_recycle_bin.is_null() {
            state.to_recycle_bin = Value::Value(false);
        }
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
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
                shared,
                enterprise_project_id,
                name,
                description,
                specs,
                tags,
            ]
        );
        let mut trigger_replace = replace_triggers(&changed, FORCE_NEW);
        if state.enable_force_new.as_deref_option() == Some("true") {
            trigger_replace.extend(replace_triggers(&changed, NON_UPDATABLE));
        } else {
            let rejected: Vec<&'static str> = changed
                .iter()
                .copied()
                .filter(|name| NON_UPDATABLE.contains(name))
                .collect();
            for name in &rejected {
                diags.error(
                    "Attribute cannot be updated",
                    format!("{name} can't be updated, set `enable_force_new = \"true\"` to replace the instance instead"),
                    AttributePath::new(*name),
                );
            }
            if !rejected.is_empty() {
                return None;
            }
        }
        if changed.contains(&"specs") {
            state.unknown_spec_fields();
        }
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
        let (config, region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error creating LakeFormation instance")?;
        let mut state = planned_state;

        let enterprise_project_id =
            config.enterprise_project_id_or(state.enterprise_project_id.as_deref_option());
        let body = build_create_body(&state, enterprise_project_id.as_deref());
        let instance_id = create_instance(&client, &body)
            .await
            .or_report(diags, "Error creating LakeFormation instance")?;
        tracing::info!("created LakeFormation instance {instance_id} in {region}");
        state.id = Value::Value(Cow::Owned(instance_id.clone()));
        state.region = Value::Value(Cow::Owned(region.clone()));

        let timeout = state.timeouts.timeout(TimeoutKind::Create, CREATE_TIMEOUT);
        let created = async {
            wait_instance_running(&client, &instance_id, timeout)
                .await
                .with_context(|| {
                    format!("error waiting for the status of instance ({instance_id}) to become running")
                })?;
            get_instance(&client, &instance_id)
                .await
                .context("error retrieving LakeFormation instance")
        }
        .await
        .or_report(diags, "Error creating LakeFormation instance");

        if let Some(body) = created {
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
        let (_, region, client) = self
            .client(&planned_state.region)
            .await
            .or_report(diags, "Error updating LakeFormation instance")?;
        let instance_id = prior_state.id.as_deref_option().unwrap_or_default().to_owned();
        let timeout = planned_state
            .timeouts
            .timeout(TimeoutKind::Update, UPDATE_TIMEOUT);

        // Receives each change once it went through
        let mut applied = prior_state.clone();
        applied.timeouts = planned_state.timeouts.clone();
        applied.to_recycle_bin = planned_state.to_recycle_bin.clone();
        applied.enable_force_new = planned_state.enable_force_new.clone();

        let updated = async {
            if applied.name != planned_state.name || applied.description != planned_state.description {
                update_instance(&client, &instance_id, &planned_state).await?;
                applied.name = planned_state.name.clone();
                applied.description = planned_state.description.clone();
            }
            if applied.specs != planned_state.specs {
                scale_instance(&client, &instance_id, &planned_state, timeout).await?;
                applied.specs = planned_state.specs.clone();
            }
            if applied.tags != planned_state.tags {
                update_instance_tags(&client, &instance_id, &planned_state).await?;
                applied.tags = planned_state.tags.clone();
            }
            Ok::<_, anyhow::Error>(())
        }
        .await
        .or_report(diags, "Error updating LakeFormation instance");
        if updated.is_none() {
            applied.settle();
            return Some((applied, private_state));
        }

        let mut state = planned_state;
        if let Some(body) = get_instance(&client, &instance_id)
            .await
            .or_report(diags, "error retrieving LakeFormation instance")
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
        let (_, _, client) = self
            .client(&state.region)
            .await
            .or_report(diags, "Error deleting LakeFormation instance")?;
        let instance_id = state.id.as_deref_option().unwrap_or_default();
        let to_recycle_bin = state.to_recycle_bin.unwrap_or(false);

        let url = format!(
            "{}?to_recycle_bin={to_recycle_bin}",
            instance_url(&client, instance_id)
        );
        match client.delete(&url, None).await {
            Ok(_) => (),
            Err(err) if err.is_not_found() => {
                tracing::warn!("LakeFormation instance {instance_id} is already gone");
                return Some(());
            }
            Err(err) => return Err(err).or_report(diags, "error deleting instance"),
        }

        let timeout = state.timeouts.timeout(TimeoutKind::Delete, DELETE_TIMEOUT);
        wait_instance_deleted(&client, instance_id, timeout)
            .await
            .with_context(|| {
                format!("error waiting for the deletion of instance ({instance_id}) to complete")
            })
            .or_report(diags, "Error deleting LakeFormation instance")
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = InstanceState {
            id: Value::Value(Cow::Owned(id)),
            to_recycle_bin: Value::Value(false),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::testing::{config_handle, MockServer};
    use crate::lakeformation::state::Spec;

    fn state() -> InstanceState<'static> {
        InstanceState {
            id: Value::Value(Cow::Borrowed("i-1")),
            name: Value::Value(Cow::Borrowed("lf-demo")),
            shared: Value::Value(true),
            specs: Value::Value(vec![Value::Value(Spec {
                spec_code: Value::Value(Cow::Borrowed("lakeformation.unit.basic.qps")),
                stride_num: Value::Value(2),
                product_id: Value::Value(Cow::Borrowed("p-1")),
            })]),
            description: Value::Null,
            enterprise_project_id: Value::Value(Cow::Borrowed("0")),
            tags: Value::Value(BTreeMap::from([(
                Cow::Borrowed("env"),
                Value::Value(Cow::Borrowed("test")),
            )])),
            to_recycle_bin: Value::Value(false),
            status: Value::Value(Cow::Borrowed("RUNNING")),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_create_body() {
        assert_eq!(
            build_create_body(&state(), Some("0")),
            json!({
                "name": "lf-demo",
                "charge_mode": "postPaid",
                "shared": true,
                "specs": [{
                    "spec_code": "lakeformation.unit.basic.qps",
                    "stride_num": 2,
                    "product_id": "p-1",
                }],
                "enterprise_project_id": "0",
                "tags": [{ "key": "env", "value": "test" }],
            })
        );

        let state = InstanceState {
            specs: Value::Null,
            tags: Value::Null,
            ..state()
        };
        assert_eq!(
            build_create_body(&state, None),
            json!({
                "name": "lf-demo",
                "charge_mode": "postPaid",
                "shared": true,
            })
        );
    }

    #[tokio::test]
    async fn test_plan_create() {
        let resource = LakeFormationInstanceResource::default();
        let mut diags = Diagnostics::default();
        let proposed = InstanceState {
            name: Value::Value(Cow::Borrowed("lf-demo")),
            shared: Value::Value(false),
            ..Default::default()
        };
        let (planned, _) = resource
            .plan_create(&mut diags, proposed.clone(), proposed, Value::Null)
            .await
            .unwrap();
        assert!(planned.id.is_unknown());
        assert!(planned.specs.is_unknown());
        assert!(planned.enterprise_project_id.is_unknown());
        assert_eq!(planned.to_recycle_bin.as_option(), Some(false));
    }

    #[tokio::test]
    async fn test_plan_update() {
        let resource = LakeFormationInstanceResource::default();
        let mut diags = Diagnostics::default();

        let proposed = InstanceState {
            description: Value::Value(Cow::Borrowed("updated")),
            ..state()
        };
        let (planned, _, replace) = resource
            .plan_update(&mut diags, state(), proposed, state(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(replace.is_empty());
        assert!(planned.status.is_unknown());

        let proposed = InstanceState {
            region: Value::Value(Cow::Borrowed("cn-east-3")),
            ..state()
        };
        let (_, _, replace) = resource
            .plan_update(&mut diags, state(), proposed, state(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(replace, vec![AttributePath::new("region")]);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn test_plan_update_non_updatable() {
        let resource = LakeFormationInstanceResource::default();
        let mut diags = Diagnostics::default();
        let proposed = InstanceState {
            shared: Value::Value(false),
            enterprise_project_id: Value::Value(Cow::Borrowed("ep-1")),
            ..state()
        };
        assert!(resource
            .plan_update(&mut diags, state(), proposed.clone(), state(), Value::Null, Value::Null)
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 2);

        let mut diags = Diagnostics::default();
        let proposed = InstanceState {
            enable_force_new: Value::Value(Cow::Borrowed("true")),
            ..proposed
        };
        let (_, _, replace) = resource
            .plan_update(&mut diags, state(), proposed, state(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(
            replace,
            vec![
                AttributePath::new("shared"),
                AttributePath::new("enterprise_project_id"),
            ]
        );
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_applied_steps() {
        let server = MockServer::start(vec![
            (200, "{}"),
            (500, r#"{"error_code":"LKF.00000001","error_msg":"scale failed"}"#),
        ])
        .await;
        let resource =
            LakeFormationInstanceResource::new(config_handle(SERVICE, &server.endpoint).await);
        let mut diags = Diagnostics::default();

        let planned = InstanceState {
            name: Value::Value(Cow::Borrowed("lf-renamed")),
            specs: Value::Value(vec![Value::Value(Spec {
                spec_code: Value::Value(Cow::Borrowed("lakeformation.unit.basic.qps")),
                stride_num: Value::Value(4),
                product_id: Value::Value(Cow::Borrowed("p-1")),
            })]),
            tags: Value::Null,
            status: Value::Unknown,
            ..state()
        };
        let (updated, _) = resource
            .update(&mut diags, state(), planned.clone(), planned, Value::Null, Value::Null)
            .await
            .unwrap();

        assert_eq!(diags.errors.len(), 1);
        assert_eq!(updated.name.as_deref_option(), Some("lf-renamed"));
        assert_eq!(updated.specs, state().specs);
        assert_eq!(updated.tags, state().tags);
        assert_eq!(updated.status.as_deref_option(), Some("RUNNING"));
        assert_eq!(
            server.requests(),
            vec![
                "PUT /v1/p/instances/i-1 HTTP/1.1",
                "POST /v1/p/instances/i-1/scale HTTP/1.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_validate() {
        let resource = LakeFormationInstanceResource::default();
        let mut diags = Diagnostics::default();
        let config = InstanceState {
            specs: Value::Value(vec![Value::Value(Spec {
                spec_code: Value::Value(Cow::Borrowed("")),
                ..Default::default()
            })]),
            ..Default::default()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        let config = InstanceState {
            enable_force_new: Value::Value(Cow::Borrowed("yes")),
            ..Default::default()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        let config = InstanceState {
            enable_force_new: Value::Value(Cow::Borrowed("false")),
            ..Default::default()
        };
        assert!(resource.validate(&mut diags, config).await.is_some());
    }
}
