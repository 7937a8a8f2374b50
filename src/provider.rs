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

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType};
use tf_provider::value::{ValueBool, ValueEmpty, ValueMap, ValueNumber, ValueString};
use tf_provider::schema::{Block, Description, Schema};
use tf_provider::{map, AttributePath, Diagnostics, Provider};

use crate::config::{Config, ConfigHandle, Settings};
use crate::dws::{
    DwsClusterDataSource, DwsClusterResource, DwsDisasterRecoveryTaskResource,
    DwsExtDataSourceResource,
};
use crate::lakeformation::{LakeFormationInstanceDataSource, LakeFormationInstanceResource};
use crate::utils::ReportError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub region: ValueString<'a>,
    pub access_key: ValueString<'a>,
    pub secret_key: ValueString<'a>,
    pub security_token: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub domain_id: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub enterprise_project_id: ValueString<'a>,
    pub insecure: ValueBool,
    pub max_retries: ValueNumber,
    pub endpoints: ValueMap<'a, ValueString<'a>>,
}

impl ProviderConfig<'_> {
    fn settings(&self) -> Settings {
        let string = |value: &ValueString| value.as_deref_option().map(str::to_owned);
        Settings {
            region: string(&self.region),
            access_key: string(&self.access_key),
            secret_key: string(&self.secret_key),
            security_token: string(&self.security_token),
            project_id: string(&self.project_id),
            domain_id: string(&self.domain_id),
            cloud: string(&self.cloud),
            enterprise_project_id: string(&self.enterprise_project_id),
            insecure: self.insecure.as_option(),
            max_retries: self.max_retries.as_option(),
            endpoints: self
                .endpoints
                .iter()
                .flatten()
                .filter_map(|(service, url)| Some((service.to_string(), string(url)?)))
                .collect::<HashMap<_, _>>(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct HuaweiCloudProvider {
    config: ConfigHandle,
}

fn string_attribute(description: &str, sensitive: bool) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(description),
        constraint: AttributeConstraint::Optional,
        sensitive,
        ..Default::default()
    }
}

#[async_trait]
impl Provider for HuaweiCloudProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "region" => string_attribute("The region to which the resources belong (HW_REGION_NAME)", false),
                    "access_key" => string_attribute("The access key of the HuaweiCloud account (HW_ACCESS_KEY)", true),
                    "secret_key" => string_attribute("The secret key of the HuaweiCloud account (HW_SECRET_KEY)", true),
                    "security_token" => string_attribute("The security token of a temporary access key (HW_SECURITY_TOKEN)", true),
                    "project_id" => string_attribute("The project of the provider region, looked up when omitted (HW_PROJECT_ID)", false),
                    "domain_id" => string_attribute("The account ID (HW_DOMAIN_ID)", false),
                    "cloud" => string_attribute("The endpoint suffix of the cloud (HW_CLOUD), defaults to myhuaweicloud.com", false),
                    "enterprise_project_id" => string_attribute("The default enterprise project of the resources (HW_ENTERPRISE_PROJECT_ID)", false),
                    "insecure" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Skip the verification of TLS certificates (HW_INSECURE)"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "max_retries" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("How many times a throttled request is retried (HW_MAX_RETRIES), defaults to 5"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "endpoints" => Attribute {
                        attr_type: AttributeType::Map(AttributeType::String.into()),
                        description: Description::plain("Custom endpoints, by service name"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                description: Description::plain("HuaweiCloud DWS and LakeFormation resources"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        for (name, value) in [
            ("region", &config.region),
            ("access_key", &config.access_key),
            ("secret_key", &config.secret_key),
            ("security_token", &config.security_token),
            ("project_id", &config.project_id),
            ("domain_id", &config.domain_id),
            ("cloud", &config.cloud),
            ("enterprise_project_id", &config.enterprise_project_id),
        ] {
            if value.as_deref_option() == Some("") {
                diags.error_short(format!("`{name}` must not be empty"), AttributePath::new(name));
            }
        }
        if let Some(max_retries) = config.max_retries.as_option() {
            if max_retries < 0 {
                diags.error(
                    "Invalid `max_retries`",
                    format!("`max_retries` must be positive, got {max_retries}"),
                    AttributePath::new("max_retries"),
                );
            }
        }
        for (service, url) in config.endpoints.iter().flatten() {
            if url.as_deref_option() == Some("") {
                diags.error_short(
                    format!("endpoint of `{service}` must not be empty"),
                    AttributePath::new("endpoints").key(service.to_string()),
                );
            }
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = config
            .settings()
            .with_env_fallbacks(|name| std::env::var(name).ok());
        let config = Config::new(settings).or_report(diags, "Invalid provider configuration")?;

        tracing::info!(
            "configured provider for region {} (terraform {terraform_version})",
            config.region
        );
        self.config.set(config).await;
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicResource>>> {
        Some(map! {
            "dws_cluster" => DwsClusterResource::new(self.config.clone()),
            "dws_ext_data_source" => DwsExtDataSourceResource::new(self.config.clone()),
            "dws_disaster_recovery_task" => DwsDisasterRecoveryTaskResource::new(self.config.clone()),
            "lakeformation_instance" => LakeFormationInstanceResource::new(self.config.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicDataSource>>> {
        Some(map! {
            "dws_cluster" => DwsClusterDataSource::new(self.config.clone()),
            "lakeformation_instance" => LakeFormationInstanceDataSource::new(self.config.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    fn provider_config() -> ProviderConfig<'static> {
        ProviderConfig {
            region: Value::from("cn-north-4"),
            access_key: Value::from("ak"),
            secret_key: Value::from("sk"),
            project_id: Value::from("0123456789"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_validate() {
        let provider = HuaweiCloudProvider::default();
        let mut diags = Diagnostics::default();
        assert!(provider.validate(&mut diags, provider_config()).await.is_some());

        let config = ProviderConfig {
            region: Value::from(""),
            max_retries: Value::from(-2),
            ..provider_config()
        };
        assert!(provider.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_configure() {
        let provider = HuaweiCloudProvider::default();
        let mut diags = Diagnostics::default();
        assert!(provider
            .configure(&mut diags, "1.7.0".to_owned(), provider_config())
            .await
            .is_some());
        assert!(diags.errors.is_empty());

        let config = provider.config.get().await.unwrap();
        assert_eq!(config.region, "cn-north-4");
        assert_eq!(config.project_id("cn-north-4").await.unwrap(), "0123456789");
    }

    #[test]
    fn test_registries() {
        let provider = HuaweiCloudProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 4);
        assert!(resources.contains_key("dws_disaster_recovery_task"));
        let data_sources = provider.get_data_sources(&mut diags).unwrap();
        assert!(data_sources.contains_key("dws_cluster"));
        assert!(data_sources.contains_key("lakeformation_instance"));
        assert!(provider.schema(&mut diags).is_some());
    }
}
