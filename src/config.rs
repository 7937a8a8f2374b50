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

//! Provider level configuration shared by every resource

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{Mutex, RwLock};

use crate::client::{ServiceClient, Signer};
use crate::utils::PathSearch;

pub const DEFAULT_CLOUD: &str = "myhuaweicloud.com";
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Raw provider settings, before environment fallbacks are applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub security_token: Option<String>,
    pub project_id: Option<String>,
    pub domain_id: Option<String>,
    pub cloud: Option<String>,
    pub enterprise_project_id: Option<String>,
    pub insecure: Option<bool>,
    pub max_retries: Option<i64>,
    pub endpoints: HashMap<String, String>,
}

impl Settings {
    /// Fill the unset fields from the `HW_*` variables
    pub fn with_env_fallbacks<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let fill = |field: &mut Option<String>, name: &str| {
            if field.is_none() {
                *field = var(name);
            }
        };
        fill(&mut self.region, "HW_REGION_NAME");
        fill(&mut self.access_key, "HW_ACCESS_KEY");
        fill(&mut self.secret_key, "HW_SECRET_KEY");
        fill(&mut self.security_token, "HW_SECURITY_TOKEN");
        fill(&mut self.project_id, "HW_PROJECT_ID");
        fill(&mut self.domain_id, "HW_DOMAIN_ID");
        fill(&mut self.cloud, "HW_CLOUD");
        fill(&mut self.enterprise_project_id, "HW_ENTERPRISE_PROJECT_ID");
        if self.insecure.is_none() {
            self.insecure = var("HW_INSECURE").map(|value| value == "true" || value == "1");
        }
        if self.max_retries.is_none() {
            self.max_retries = var("HW_MAX_RETRIES").and_then(|value| value.parse().ok());
        }
        self
    }
}

#[derive(Debug)]
pub struct Config {
    pub region: String,
    pub cloud: String,
    pub enterprise_project_id: Option<String>,
    pub max_retries: u32,
    project_id: Option<String>,
    domain_id: Option<String>,
    endpoints: HashMap<String, String>,
    http: reqwest::Client,
    signer: Arc<Signer>,
    projects: Mutex<HashMap<String, String>>,
}

impl Config {
    pub fn new(settings: Settings) -> Result<Self> {
        let region = settings
            .region
            .ok_or_else(|| anyhow!("region must be set, either in the provider or with HW_REGION_NAME"))?;
        let access_key = settings
            .access_key
            .ok_or_else(|| anyhow!("access_key must be set, either in the provider or with HW_ACCESS_KEY"))?;
        let secret_key = settings
            .secret_key
            .ok_or_else(|| anyhow!("secret_key must be set, either in the provider or with HW_SECRET_KEY"))?;
        let max_retries = match settings.max_retries {
            Some(n) => u32::try_from(n).context("max_retries must be a positive number")?,
            None => DEFAULT_MAX_RETRIES,
        };

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(settings.insecure.unwrap_or(false))
            .user_agent(concat!("terraform-provider-huaweicloud/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("could not build the HTTP client")?;

        Ok(Self {
            region,
            cloud: settings.cloud.unwrap_or_else(|| DEFAULT_CLOUD.to_owned()),
            enterprise_project_id: settings.enterprise_project_id,
            max_retries,
            project_id: settings.project_id,
            domain_id: settings.domain_id,
            endpoints: settings.endpoints,
            http,
            signer: Arc::new(Signer::new(
                access_key,
                secret_key,
                settings.security_token,
            )),
            projects: Default::default(),
        })
    }

    /// Region of a resource, defaulting to the provider region
    pub fn region_or(&self, region: Option<&str>) -> String {
        match region {
            Some(region) if !region.is_empty() => region.to_owned(),
            _ => self.region.clone(),
        }
    }

    /// Enterprise project of a resource, defaulting to the provider one
    pub fn enterprise_project_id_or(&self, value: Option<&str>) -> Option<String> {
        match value {
            Some(value) if !value.is_empty() => Some(value.to_owned()),
            _ => self.enterprise_project_id.clone(),
        }
    }

    /// Base URL of a service in a region, always ending with `/`
    pub fn service_endpoint(&self, service: &str, region: &str) -> String {
        if let Some(endpoint) = self.endpoints.get(service) {
            if endpoint.ends_with('/') {
                return endpoint.clone();
            }
            return format!("{endpoint}/");
        }
        match service {
            "iam" => format!("https://iam.{}/", self.cloud),
            _ => format!("https://{service}.{region}.{}/", self.cloud),
        }
    }

    /// Project ID of a region, looked up through IAM when not configured
    pub async fn project_id(&self, region: &str) -> Result<String> {
        if let Some(project_id) = &self.project_id {
            if region == self.region {
                return Ok(project_id.clone());
            }
        }

        // Locked across the lookup: one IAM query per region
        let mut projects = self.projects.lock().await;
        if let Some(project_id) = projects.get(region) {
            return Ok(project_id.clone());
        }

        let iam = self.iam_client();
        let url = iam.url("v3/projects?name={region}", &[("region", region)]);
        let response = iam
            .get(&url)
            .await
            .with_context(|| format!("error retrieving the project of region {region}"))?;
        let project_id = response
            .search_str(&format!("projects[?name=='{region}']|[0].id"))
            .ok_or_else(|| anyhow!("no project found for region {region}"))?;

        tracing::info!("resolved project {project_id} for region {region}");
        projects.insert(region.to_owned(), project_id.clone());
        Ok(project_id)
    }

    /// Client of a regional service, scoped to the project of that region
    pub async fn service_client(&self, service: &str, region: &str) -> Result<ServiceClient> {
        let project_id = self.project_id(region).await?;
        Ok(ServiceClient::new(
            self.http.clone(),
            self.signer.clone(),
            self.service_endpoint(service, region),
            project_id,
            self.max_retries,
        ))
    }

    fn iam_client(&self) -> ServiceClient {
        let client = ServiceClient::new(
            self.http.clone(),
            self.signer.clone(),
            self.service_endpoint("iam", &self.region),
            String::new(),
            self.max_retries,
        );
        match &self.domain_id {
            Some(domain_id) => client.with_header("X-Domain-Id", domain_id.clone()),
            None => client,
        }
    }
}

/// Configuration slot filled when the provider is configured
///
/// Resources are instantiated before the provider configuration is known, so
/// they keep a handle and fetch the configuration when they need it.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle(Arc<RwLock<Option<Arc<Config>>>>);

impl ConfigHandle {
    pub async fn set(&self, config: Config) {
        *self.0.write().await = Some(Arc::new(config));
    }

    pub async fn get(&self) -> Result<Arc<Config>> {
        self.0
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("the provider has not been configured"))
    }
}
