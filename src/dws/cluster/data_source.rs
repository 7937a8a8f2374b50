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

use anyhow::Context;
use async_trait::async_trait;
use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{AttributePath, DataSource, Diagnostics};

use crate::config::ConfigHandle;
use crate::utils::{ReportError, WithSchema};

use super::super::{get_cluster, SERVICE};
use super::state::ClusterDataState;

#[derive(Debug, Default, Clone)]
pub struct DwsClusterDataSource {
    config: ConfigHandle,
}

impl DwsClusterDataSource {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for DwsClusterDataSource {
    type State<'a> = ClusterDataState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ClusterDataState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if config.cluster_id.as_deref_option() == Some("") {
            diags.error_short("`cluster_id` must not be empty", AttributePath::new("cluster_id"));
            return None;
        }
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let provider = self
            .config
            .get()
            .await
            .or_report(diags, "Error reading DWS cluster")?;
        let region = provider.region_or(config.region.as_deref_option());
        let cluster_id = config.cluster_id.as_deref_option().unwrap_or_default().to_owned();

        let client = provider
            .service_client(SERVICE, &region)
            .await
            .context("error creating DWS client")
            .or_report(diags, "Error reading DWS cluster")?;
        let body = get_cluster(&client, &cluster_id)
            .await
            .with_context(|| format!("error retrieving DWS cluster {cluster_id}"))
            .or_report(diags, "Error reading DWS cluster")?;

        let mut state = config;
        state.apply_response(&region, &body);
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use tf_provider::value::Value;

    use super::*;

    #[tokio::test]
    async fn test_validate() {
        let data_source = DwsClusterDataSource::default();
        let mut diags = Diagnostics::default();
        let config = ClusterDataState {
            cluster_id: Value::Value(Cow::Borrowed("")),
            ..Default::default()
        };
        assert!(data_source.validate(&mut diags, config).await.is_none());

        let config = ClusterDataState {
            cluster_id: Value::Value(Cow::Borrowed("c-1")),
            ..Default::default()
        };
        assert!(data_source.validate(&mut diags, config).await.is_some());
    }

    #[tokio::test]
    async fn test_read_unconfigured() {
        let data_source = DwsClusterDataSource::default();
        let mut diags = Diagnostics::default();
        let config = ClusterDataState {
            cluster_id: Value::Value(Cow::Borrowed("c-1")),
            ..Default::default()
        };
        assert!(data_source.read(&mut diags, config, Value::Null).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
