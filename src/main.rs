// Copyright 2025 The Rooster Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
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

//! rooster - staged rollouts of node-scoped Kubernetes workloads
//!
//! One action per invocation: rollout, rollback, update, or scale-down of a
//! project's DaemonSets and companion resources across a labeled node
//! fleet.

#![warn(clippy::all)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rooster::{
    dispatch, Action, Config, KubeClientManager, Manager, ProjectOptions, RolloutOptions,
    Strategy,
};

/// Staged deployment controller for node-scoped workloads.
///
/// Rooster reconciles three sources of truth - declared manifests, per-node
/// version labels, and a project-scoped versioning cache - while driving
/// batched node mutations with at most one current version per project.
#[derive(Parser, Debug)]
#[command(name = "rooster")]
#[command(about = "Staged rollouts of node-scoped Kubernetes workloads", long_about = None)]
struct Args {
    /// Action to perform
    #[arg(long, value_enum)]
    action: Action,

    /// Project the action applies to
    #[arg(long, default_value = "")]
    project: String,

    /// Version to roll out, update to, or roll back to. May be omitted for
    /// rollback and scale-down, which act on the current version
    #[arg(long, default_value = "")]
    version: String,

    /// Identifier of the cluster this invocation may touch; checked against
    /// the kubeconfig's current context
    #[arg(long, default_value = "")]
    cluster_id: String,

    /// Path to the manifests to act on
    #[arg(long, default_value = "")]
    manifest_path: String,

    /// Existing label on nodes to target, `key=value`
    #[arg(long, default_value = "")]
    target_label: String,

    /// Label to put on nodes to control the canary process, `key=value`
    #[arg(long, default_value = "")]
    canary_label: String,

    /// Rollout strategy; defaults to the DEFAULTROLLOUTSTRATEGY environment
    /// variable, normally linear
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Canary batch size, in percentage
    #[arg(long, default_value_t = 0)]
    canary: u32,

    /// Rollout increment over time, in percentage
    #[arg(long, default_value_t = 0)]
    increment: u32,

    /// Scale-down decrement, in percentage
    #[arg(long, default_value_t = 0)]
    decrement: u32,

    /// Delete and redeploy resources that already exist
    #[arg(long)]
    update_if_exists: bool,

    /// Targeted namespace
    #[arg(long, default_value = "")]
    namespace: String,

    /// Test suite name
    #[arg(long, default_value = "")]
    test_suite: String,

    /// Test binary name
    #[arg(long, default_value = "")]
    test_binary: String,

    /// Propagate server-side dry run to every mutation
    #[arg(long)]
    dry_run: bool,

    /// Path to the kubeconfig file
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.log_json);

    let config = Config::from_env();
    info!("Deployer version: {}", config.deployer_version);
    print_options(&args);

    let strategy = match args.strategy {
        Some(strategy) => strategy,
        None => config
            .default_rollout_strategy
            .parse()
            .context("invalid DEFAULTROLLOUTSTRATEGY")?,
    };

    let client = create_client(args.kubeconfig.as_deref()).await?;
    let manager = Manager::new(KubeClientManager::new(client), Arc::new(config));

    let opts = RolloutOptions {
        action: args.action,
        strategy,
        target_label: args.target_label,
        control_label: args.canary_label,
        cluster_id: args.cluster_id,
        manifest_path: args.manifest_path,
        namespace: args.namespace,
        canary: args.canary,
        increment: args.increment,
        decrement: args.decrement,
        update_if_exists: args.update_if_exists,
        dry_run: args.dry_run,
        ignore_resources: false,
        test_suite: args.test_suite,
        test_binary: args.test_binary,
        project: ProjectOptions {
            project: args.project,
            current_version: String::new(),
            desired_version: args.version,
        },
        resources: Vec::new(),
    };

    if let Err(e) = dispatch::run(&manager, opts).await {
        error!("{e}");
        return Err(e.into());
    }

    info!("rooster exited successfully");
    Ok(())
}

/// Initializes logging based on the provided level and format.
fn init_logging(level: &str, json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.parse().unwrap())
        .from_env_lossy();

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

/// Echoes the effective invocation for the operator's log.
fn print_options(args: &Args) {
    info!("Action: {}", args.action);
    info!("Project: {}", args.project);
    info!("Version: {}", args.version);
    info!("Cluster id: {}", args.cluster_id);
    info!("Manifest path: {}", args.manifest_path);
    info!("Target label: {}", args.target_label);
    info!("Canary label: {}", args.canary_label);
    info!("Canary batch size: {}", args.canary);
    info!("Increment: {}", args.increment);
    info!("Decrement: {}", args.decrement);
    info!("Namespace: {}", args.namespace);
    info!("Update if exists: {}", args.update_if_exists);
    info!("Test suite name: {}", args.test_suite);
    info!("Test binary name: {}", args.test_binary);
    info!("dry-run: {}", args.dry_run);
}

/// Creates a Kubernetes client, from an explicit kubeconfig path when given.
async fn create_client(kubeconfig: Option<&Path>) -> anyhow::Result<kube::Client> {
    use kube::config::{KubeConfigOptions, Kubeconfig};
    use kube::Config;

    let kube_config = if let Some(path) = kubeconfig {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("failed to read kubeconfig from: {path:?}"))?;
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("failed to load kubeconfig from: {path:?}"))?
    } else {
        Config::infer().await.context("failed to load kubeconfig")?
    };

    Ok(kube::Client::try_from(kube_config)?)
}
