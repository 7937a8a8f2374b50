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

use anyhow::{Context, Result};
use async_trait::async_trait;
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::ServiceClient;
use crate::config::{Config, ConfigHandle};
use crate::utils::{
    changed_attributes, replace_triggers, ReportError, TimeoutKind, WithSchema, WithTimeouts,
    WithValidate,
};

use super::super::{get_cluster, wait_cluster_available, wait_cluster_deleted, SERVICE};
use super::state::ClusterState;
use super::{
    bind_elb, build_create_body_v1, build_create_body_v2, create_cluster, delete_cluster,
    enable_logical_cluster, expand_volume, parse_lts_error, reset_password, resize_cluster,
    set_lts, unbind_elb, update_description, update_eip, update_security_group, update_tags,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DEFAULT_PORT: i64 = 8000;
const PUBLIC_BIND_TYPES: [&str; 3] = ["auto_assign", "not_use", "bind_existing"];

/// Changing any of these attributes replaces the cluster
const FORCE_NEW: &[&str] = &[
    "region",
    "name",
    "node_type",
    "user_name",
    "vpc_id",
    "network_id",
    "availability_zone",
    "version",
    "number_of_cn",
    "port",
    "dss_pool_id",
    "kms_key_id",
];

#[derive(Debug, Default, Clone)]
pub struct DwsClusterResource {
    config: ConfigHandle,
}

impl DwsClusterResource {
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

fn eip_id<'a>(state: &'a ClusterState) -> &'a str {
    state
        .public_ip
        .as_ref_option()
        .and_then(|public_ip| public_ip.eip_id.as_deref_option())
        .unwrap_or_default()
}

fn capacity<'a>(state: &ClusterState<'a>) -> ValueString<'a> {
    state
        .volume
        .as_ref_option()
        .map(|volume| volume.capacity.clone())
        .unwrap_or_default()
}

fn volume_type<'a>(state: &ClusterState<'a>) -> ValueString<'a> {
    state
        .volume
        .as_ref_option()
        .map(|volume| volume.volume_type.clone())
        .unwrap_or_default()
}

async fn wait_updated(client: &ServiceClient, cluster_id: &str, timeout: Duration) -> Result<()> {
    wait_cluster_available(client, cluster_id, timeout)
        .await
        .with_context(|| format!("error waiting for the DWS cluster ({cluster_id}) update to complete"))
}

/// Steps that follow the creation call, once the cluster ID is known
async fn configure_new_cluster(
    client: &ServiceClient,
    state: &ClusterState<'_>,
    cluster_id: &str,
    v2: bool,
    timeout: Duration,
) -> Result<()> {
    wait_cluster_available(client, cluster_id, timeout)
        .await
        .with_context(|| {
            format!("error waiting for the DWS cluster ({cluster_id}) creation to complete")
        })?;

    if state.logical_cluster_enable.as_option() == Some(true) {
        enable_logical_cluster(client, cluster_id, true).await?;
    }
    if let Some(elb_id) = state.elb_id.as_deref_option() {
        bind_elb(client, cluster_id, elb_id, timeout).await?;
    }
    // LTS can only be switched on clusters created through the v2 API
    if v2 && state.lts_enable.as_option() == Some(true) {
        set_lts(client, cluster_id, true)
            .await
            .context("error enable LTS for DWS cluster")?;
    }
    if let Some(description) = state.description.as_deref_option().filter(|d| !d.is_empty()) {
        update_description(client, cluster_id, description).await?;
    }
    Ok(())
}

/// Timeout of the ELB bind and unbind jobs, which follow the create timeout
fn elb_timeout(state: &ClusterState<'_>) -> Duration {
    state.timeouts.timeout(TimeoutKind::Create, DEFAULT_TIMEOUT)
}

/// Apply the planned changes, in the order the API expects them
///
/// `applied` starts as the prior state and receives each change once it went through.
async fn update_cluster<'a>(
    client: &ServiceClient,
    applied: &mut ClusterState<'a>,
    planned: &ClusterState<'a>,
    cluster_id: &str,
    timeout: Duration,
) -> Result<()> {
    wait_cluster_available(client, cluster_id, timeout)
        .await
        .with_context(|| format!("cluster ({cluster_id}) state is not available to update"))?;

    if capacity(applied) != capacity(planned) {
        expand_volume(client, cluster_id, &capacity(planned)).await?;
        wait_updated(client, cluster_id, timeout).await?;
        applied.volume = planned.volume.clone();
    }
    if applied.user_pwd != planned.user_pwd {
        reset_password(client, cluster_id, &planned.user_pwd).await?;
        wait_updated(client, cluster_id, timeout).await?;
        applied.user_pwd = planned.user_pwd.clone();
    }
    if applied.number_of_node != planned.number_of_node {
        resize_cluster(
            client,
            cluster_id,
            applied.number_of_node.unwrap_or_default(),
            planned.number_of_node.unwrap_or_default(),
            planned.force_backup.unwrap_or(true),
            timeout,
        )
        .await?;
        applied.number_of_node = planned.number_of_node.clone();
    }
    if applied.tags != planned.tags {
        update_tags(client, cluster_id, &applied.tags, &planned.tags)
            .await
            .with_context(|| format!("error updating tags of DWS cluster: {cluster_id}"))?;
        applied.tags = planned.tags.clone();
    }
    if applied.logical_cluster_enable != planned.logical_cluster_enable {
        enable_logical_cluster(
            client,
            cluster_id,
            planned.logical_cluster_enable.unwrap_or_default(),
        )
        .await?;
        applied.logical_cluster_enable = planned.logical_cluster_enable.clone();
    }
    if applied.elb_id != planned.elb_id {
        let old = applied.elb_id.as_deref_option().unwrap_or_default();
        let new = planned.elb_id.as_deref_option().unwrap_or_default();
        unbind_elb(client, cluster_id, old, elb_timeout(planned)).await?;
        bind_elb(client, cluster_id, new, elb_timeout(planned)).await?;
        applied.elb_id = planned.elb_id.clone();
    }
    if applied.lts_enable != planned.lts_enable {
        let enable = planned.lts_enable.unwrap_or_default();
        if let Err(err) = set_lts(client, cluster_id, enable).await {
            parse_lts_error(err).with_context(|| {
                format!(
                    "error modifying LTS for DWS cluster, the expected LTS enable status is: {enable}"
                )
            })?;
        }
        applied.lts_enable = planned.lts_enable.clone();
    }
    if eip_id(applied) != eip_id(planned) {
        update_eip(client, cluster_id, eip_id(applied), eip_id(planned)).await?;
        applied.public_ip = planned.public_ip.clone();
    }
    if applied.description != planned.description {
        let description = planned.description.as_deref_option().unwrap_or_default();
        update_description(client, cluster_id, description).await?;
        applied.description = planned.description.clone();
    }
    if applied.security_group_id != planned.security_group_id {
        let security_group_id = planned.security_group_id.as_deref_option().unwrap_or_default();
        update_security_group(client, cluster_id, security_group_id).await?;
        applied.security_group_id = planned.security_group_id.clone();
    }
    Ok(())
}

#[async_trait]
impl Resource for DwsClusterResource {
    type State<'a> = ClusterState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ClusterState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config
            .timeouts
            .validate(diags, AttributePath::new("timeouts"));

        if let Some(nodes) = config.number_of_node.as_option() {
            if nodes < 1 {
                diags.error(
                    "Invalid `number_of_node`",
                    format!("a cluster needs at least one node, got {nodes}"),
                    AttributePath::new("number_of_node"),
                );
            }
        }
        if let Some(bind_type) = config
            .public_ip
            .as_ref_option()
            .and_then(|public_ip| public_ip.public_bind_type.as_deref_option())
        {
            if !PUBLIC_BIND_TYPES.contains(&bind_type) {
                diags.error(
                    "Invalid `public_bind_type`",
                    format!(
                        "expected one of {}, got '{bind_type}'",
                        PUBLIC_BIND_TYPES.join(", ")
                    ),
                    AttributePath::new("public_ip").attribute("public_bind_type"),
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
            .or_report(diags, "Error reading DWS cluster")?;
        let cluster_id = state.id.as_deref_option().unwrap_or_default().to_owned();

        match get_cluster(&client, &cluster_id).await {
            Ok(body) => {
                let mut state = state;
                state.apply_response(&region, &body);
                state.settle();
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::warn!("DWS cluster {cluster_id} not found, removing it from the state");
                diags.root_warning(
                    "DWS cluster not found",
                    format!("The cluster {cluster_id} does not exist anymore and has been removed from the state"),
                );
                None
            }
            Err(err) => Err(err).or_report(diags, "Error retrieving DWS cluster"),
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
        state.created = Value::Unknown;
        state.unknown_outputs();

        if state.region.is_null() {
            state.region = match self.config.get().await {
                Ok(config) => Value::Value(Cow::Owned(config.region.clone())),
                Err(_) => Value::Unknown,
            };
        }
        if state.port.is_null() {
            state.port = Value::Value(DEFAULT_PORT);
        }
        if state.force_backup.is_null() {
            state.force_backup = Value::Value(true);
        }
        if state.version.is_null() {
            state.version = Value::Unknown;
        }
        if state.enterprise_project_id.is_null() {
            state.enterprise_project_id = Value::Unknown;
        }
        match &mut state.public_ip {
            Value::Value(public_ip) => {
                if public_ip.public_bind_type.is_null() {
                    public_ip.public_bind_type = Value::Unknown;
                }
                if public_ip.eip_id.is_null() {
                    public_ip.eip_id = Value::Unknown;
                }
            }
            public_ip => *public_ip = Value::Unknown,
        }
        match &mut state.volume {
            Value::Value(volume) => {
                if volume.volume_type.is_null() {
                    volume.volume_type = Value::Unknown;
                }
                if volume.capacity.is_null() {
                    volume.capacity = Value::Unknown;
                }
            }
            volume => *volume = Value::Unknown,
        }

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<AttributePath>,
    )> {
        let mut state = proposed_state;

        if config_state.enterprise_project_id.is_value()
            && config_state.enterprise_project_id != prior_state.enterprise_project_id
        {
            diags.error(
                "Enterprise project cannot be changed",
                "Moving a DWS cluster to another enterprise project is not supported",
                AttributePath::new("enterprise_project_id"),
            );
            return None;
        }

        let changed = changed_attributes!(
            prior_state,
            state,
            [
                region,
                name,
                node_type,
                user_name,
                vpc_id,
                network_id,
                availability_zone,
                version,
                number_of_cn,
                port,
                dss_pool_id,
                kms_key_id,
                number_of_node,
                user_pwd,
                volume,
                tags,
                logical_cluster_enable,
                elb_id,
                lts_enable,
                public_ip,
                description,
                security_group_id,
            ]
        );
        let mut trigger_replace = replace_triggers(&changed, FORCE_NEW);

        if !volume_type(&state).is_unknown() && volume_type(&prior_state) != volume_type(&state) {
            trigger_replace.push(AttributePath::new("volume").attribute("type"));
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
            .or_report(diags, "Error creating DWS cluster")?;
        let mut state = planned_state;

        let enterprise_project_id =
            config.enterprise_project_id_or(state.enterprise_project_id.as_deref_option());
        let v2 = state
            .version
            .as_deref_option()
            .is_some_and(|version| !version.is_empty());
        let body = if v2 {
            build_create_body_v2(&state, enterprise_project_id.as_deref())
        } else {
            build_create_body_v1(&state, enterprise_project_id.as_deref())
        };

        let cluster_id = create_cluster(&client, &body, v2)
            .await
            .or_report(diags, "Error creating DWS cluster")?;
        tracing::info!("created DWS cluster {cluster_id} in {region}");
        state.id = Value::Value(Cow::Owned(cluster_id.clone()));
        state.region = Value::Value(Cow::Owned(region.clone()));

        let timeout = state.timeouts.timeout(TimeoutKind::Create, DEFAULT_TIMEOUT);
        let configured = configure_new_cluster(&client, &state, &cluster_id, v2, timeout)
            .await
            .or_report(diags, "Error creating DWS cluster");

        if configured.is_some() {
            if let Some(body) = get_cluster(&client, &cluster_id)
                .await
                .or_report(diags, "Error retrieving DWS cluster")
            {
                state.apply_response(&region, &body);
            }
        }

        // The cluster exists: keep it in the state even on failure so it gets tainted
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
            .or_report(diags, "Error updating DWS cluster")?;
        let cluster_id = prior_state.id.as_deref_option().unwrap_or_default().to_owned();
        let timeout = planned_state
            .timeouts
            .timeout(TimeoutKind::Update, DEFAULT_TIMEOUT);

        let mut applied = prior_state.clone();
        applied.timeouts = planned_state.timeouts.clone();
        applied.force_backup = planned_state.force_backup.clone();
        applied.keep_last_manual_snapshot = planned_state.keep_last_manual_snapshot.clone();
        if update_cluster(&client, &mut applied, &planned_state, &cluster_id, timeout)
            .await
            .or_report(diags, "Error updating DWS cluster")
            .is_none()
        {
            applied.settle();
            return Some((applied, private_state));
        }

        let mut state = planned_state;
        if let Some(body) = get_cluster(&client, &cluster_id)
            .await
            .or_report(diags, "Error retrieving DWS cluster")
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
            .or_report(diags, "Error deleting DWS cluster")?;
        let cluster_id = state.id.as_deref_option().unwrap_or_default();

        match delete_cluster(
            &client,
            cluster_id,
            state.keep_last_manual_snapshot.unwrap_or_default(),
        )
        .await
        {
            Ok(()) => (),
            Err(err) if err.is_not_found() => {
                tracing::warn!("DWS cluster {cluster_id} is already gone");
                return Some(());
            }
            Err(err) => {
                return Err(err).or_report(diags, "Error deleting DWS cluster");
            }
        }

        let timeout = state.timeouts.timeout(TimeoutKind::Delete, DEFAULT_TIMEOUT);
        wait_cluster_deleted(&client, cluster_id, timeout)
            .await
            .with_context(|| {
                format!("error waiting for the DWS cluster ({cluster_id}) deletion to complete")
            })
            .or_report(diags, "Error deleting DWS cluster")
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = ClusterState {
            id: Value::Value(Cow::Owned(id)),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{config_handle, MockServer};
    use crate::dws::cluster::state::{PublicIp, Volume};
    use crate::utils::Timeouts;

    fn prior() -> ClusterState<'static> {
        ClusterState {
            id: Value::Value(Cow::Borrowed("c-1")),
            region: Value::Value(Cow::Borrowed("cn-north-4")),
            name: Value::Value(Cow::Borrowed("dws-demo")),
            number_of_node: Value::Value(3),
            port: Value::Value(8000),
            status: Value::Value(Cow::Borrowed("AVAILABLE")),
            enterprise_project_id: Value::Value(Cow::Borrowed("0")),
            volume: Value::Value(Volume {
                volume_type: Value::Value(Cow::Borrowed("SSD")),
                capacity: Value::Value(Cow::Borrowed("300")),
            }),
            public_ip: Value::Value(PublicIp {
                public_bind_type: Value::Value(Cow::Borrowed("bind_existing")),
                eip_id: Value::Value(Cow::Borrowed("eip-1")),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_plan_create() {
        let resource = DwsClusterResource::default();
        let mut diags = Diagnostics::default();
        let proposed = ClusterState {
            name: Value::Value(Cow::Borrowed("dws-demo")),
            ..Default::default()
        };
        let (planned, _) = resource
            .plan_create(&mut diags, proposed.clone(), proposed, Value::Null)
            .await
            .unwrap();

        assert!(planned.id.is_unknown());
        assert!(planned.region.is_unknown());
        assert_eq!(planned.port.as_option(), Some(8000));
        assert_eq!(planned.force_backup.as_option(), Some(true));
        assert!(planned.volume.is_unknown());
        assert!(planned.status.is_unknown());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn test_plan_update_in_place() {
        let resource = DwsClusterResource::default();
        let mut diags = Diagnostics::default();
        let mut proposed = prior();
        proposed.number_of_node = Value::Value(5);
        if let Value::Value(volume) = &mut proposed.volume {
            volume.capacity = Value::Value(Cow::Borrowed("600"));
        }

        let (planned, _, replace) = resource
            .plan_update(&mut diags, prior(), proposed, ClusterState::default(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(replace.is_empty());
        assert!(planned.status.is_unknown());
        assert_eq!(planned.number_of_node.as_option(), Some(5));
    }

    #[tokio::test]
    async fn test_plan_update_replace() {
        let resource = DwsClusterResource::default();
        let mut diags = Diagnostics::default();
        let mut proposed = prior();
        proposed.name = Value::Value(Cow::Borrowed("renamed"));
        if let Value::Value(volume) = &mut proposed.volume {
            volume.volume_type = Value::Value(Cow::Borrowed("SAS"));
        }

        let (_, _, replace) = resource
            .plan_update(&mut diags, prior(), proposed, ClusterState::default(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(
            replace,
            vec![
                AttributePath::new("name"),
                AttributePath::new("volume").attribute("type")
            ]
        );
    }

    #[tokio::test]
    async fn test_plan_update_rejects_enterprise_project_change() {
        let resource = DwsClusterResource::default();
        let mut diags = Diagnostics::default();
        let config = ClusterState {
            enterprise_project_id: Value::Value(Cow::Borrowed("eps-2")),
            ..Default::default()
        };
        let planned = resource
            .plan_update(&mut diags, prior(), prior(), config, Value::Null, Value::Null)
            .await;
        assert!(planned.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_validate() {
        let resource = DwsClusterResource::default();
        let mut diags = Diagnostics::default();
        let config = ClusterState {
            number_of_node: Value::Value(0),
            public_ip: Value::Value(PublicIp {
                public_bind_type: Value::Value(Cow::Borrowed("random")),
                eip_id: Value::Null,
            }),
            ..Default::default()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn test_eip_and_capacity() {
        let state = prior();
        assert_eq!(eip_id(&state), "eip-1");
        assert_eq!(capacity(&state).as_deref_option(), Some("300"));
        assert_eq!(volume_type(&state).as_deref_option(), Some("SSD"));
        assert_eq!(eip_id(&ClusterState::default()), "");
        assert!(capacity(&ClusterState::default()).is_null());
    }

    #[test]
    fn test_elb_timeout() {
        let state = ClusterState {
            timeouts: Value::Value(Timeouts {
                create: ValueString::from("90m"),
                update: ValueString::from("10m"),
                ..Default::default()
            }),
            ..prior()
        };
        assert_eq!(elb_timeout(&state), Duration::from_secs(90 * 60));
        assert_eq!(elb_timeout(&prior()), DEFAULT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_keeps_applied_steps() {
        const AVAILABLE: &str = r#"{"cluster":{"id":"c-1","status":"AVAILABLE","action_progress":{}}}"#;
        let server = MockServer::start(vec![
            (200, AVAILABLE),
            (200, "{}"),
            (200, AVAILABLE),
            (400, r#"{"error_code":"DWS.0001","error_msg":"invalid password"}"#),
        ])
        .await;
        let resource = DwsClusterResource::new(config_handle(SERVICE, &server.endpoint).await);
        let mut diags = Diagnostics::default();

        let mut planned = prior();
        planned.user_pwd = Value::Value(Cow::Borrowed("N3w-password"));
        planned.status = Value::Unknown;
        if let Value::Value(volume) = &mut planned.volume {
            volume.capacity = Value::Value(Cow::Borrowed("600"));
        }
        let (updated, _) = resource
            .update(&mut diags, prior(), planned.clone(), planned, Value::Null, Value::Null)
            .await
            .unwrap();

        assert_eq!(diags.errors.len(), 1);
        assert_eq!(capacity(&updated).as_deref_option(), Some("600"));
        assert!(updated.user_pwd.is_null());
        assert_eq!(updated.status.as_deref_option(), Some("AVAILABLE"));
        assert_eq!(
            server.requests(),
            vec![
                "GET /v1.0/p/clusters/c-1 HTTP/1.1",
                "POST /v1.0/p/clusters/c-1/expand-instance-storage HTTP/1.1",
                "GET /v1.0/p/clusters/c-1 HTTP/1.1",
                "POST /v1.0/p/clusters/c-1/reset-password HTTP/1.1",
            ]
        );
    }
}
