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

use anyhow::Result;
use tf_provider::serve;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod client;
mod config;
mod dws;
mod lakeformation;
mod model;
mod provider;
mod utils;
mod waiter;

use provider::HuaweiCloudProvider;

/// Log to stderr, stdout carries the plugin handshake
///
/// When `PLUGIN_LOG_FILE` is set, the plugin server installs its own file
/// subscriber instead.
fn init_logging() {
    if std::env::var_os("PLUGIN_LOG_FILE").is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TF_LOG").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("could not install the log subscriber: {err}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!("starting terraform-provider-huaweicloud");
    serve("huaweicloud", HuaweiCloudProvider::default()).await
}
