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
use tf_provider::{DataSource, Diagnostics};

use crate::config::ConfigHandle;
use crate::utils::{ReportError, WithSchema};

use super::state::InstanceDataState;
use super::{get_instance, SERVICE};

#[derive(Debug, Default, Clone)]
pub struct LakeFormationInstanceDataSource {
    config: ConfigHandle,
}

impl LakeFormationInstanceDataSource {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DataSource for LakeFormationInstanceDataSource {
    type State<'a> = InstanceDataState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(InstanceDataState::schema())
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
            .or_report(diags, "Error reading LakeFormation instance")?;
        let region = provider.region_or(config.region.as_deref_option());
        let instance_id = config.instance_id.as_deref_option().unwrap_or_default().to_owned();

        let client = provider
            .service_client(SERVICE, &region)
            .await
            .context("error creating LakeFormation client")
            .or_report(diags, "Error reading LakeFormation instance")?;
        let body = get_instance(&client, &instance_id)
            .await
            .with_context(|| format!("error retrieving LakeFormation instance {instance_id}"))
            .or_report(diags, "Error reading LakeFormation instance")?;

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
    async fn test_read_unconfigured() {
        let data_source = LakeFormationInstanceDataSource::default();
        let mut diags = Diagnostics::default();
        let config = InstanceDataState {
            instance_id: Value::Value(Cow::Borrowed("i-1")),
            ..Default::default()
        };
        assert!(data_source.read(&mut diags, config, Value::Null).await.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert!(data_source
            .schema(&mut diags)
            .is_some_and(|schema| schema.block.attributes.contains_key("instance_id")));
    }
}
