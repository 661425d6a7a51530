#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

use anyhow::{bail, Result};
use clap::Parser;
use gatus_sidecar::{
    controller,
    resources::{httproute, ingress, ingressroute, service},
    AdminArgs, ClientArgs, Config, Controller, LogArgs, ResourceKind, Runtime, StateManager,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

#[derive(Clone, Debug, Parser)]
#[clap(name = "gatus-sidecar", version, about)]
struct Args {
    #[clap(flatten)]
    log: LogArgs,

    #[clap(flatten)]
    client: ClientArgs,

    #[clap(flatten)]
    admin: AdminArgs,

    #[clap(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        log,
        client,
        admin,
        config,
    } = Args::parse();

    let mut runtime = Runtime::builder()
        .with_log(log)
        .with_client(client)
        .with_admin(admin)
        .build()
        .await?;

    let mut kinds = config.resources.clone();
    kinds.sort();
    kinds.dedup();
    if kinds.is_empty() {
        bail!("no resources to watch");
    }

    let config = Arc::new(config);
    let state = StateManager::new(config.output.clone());
    let mut controllers = JoinSet::new();
    for kind in kinds {
        info!(resource = %kind, "Starting controller");
        let (state, config) = (state.clone(), config.clone());
        match kind {
            ResourceKind::HttpRoute => {
                let ctrl = Controller::new(httproute::definition(), state, config);
                controllers.spawn(runtime.run_controller(ctrl));
            }
            ResourceKind::Ingress => {
                let ctrl = Controller::new(ingress::definition(), state, config);
                controllers.spawn(runtime.run_controller(ctrl));
            }
            ResourceKind::Service => {
                let ctrl = Controller::new(service::definition(), state, config);
                controllers.spawn(runtime.run_controller(ctrl));
            }
            ResourceKind::IngressRoute => {
                let ctrl = Controller::new(ingressroute::definition(), state, config);
                controllers.spawn(runtime.run_controller(ctrl));
            }
        }
    }

    tokio::select! {
        res = runtime.run() => {
            if res.is_err() {
                bail!("aborted");
            }
        }
        res = supervise(controllers) => res?,
    }

    Ok(())
}

/// Completes when all controllers have stopped, failing as soon as any
/// controller fails.
async fn supervise(mut controllers: JoinSet<Result<(), controller::Error>>) -> Result<()> {
    while let Some(res) = controllers.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(error.into()),
            Err(error) => bail!("controller task failed: {error}"),
        }
    }
    Ok(())
}
