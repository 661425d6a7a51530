//! Process infrastructure shared by all controllers
//!
//! A [`Runtime`] owns:
//!
//! * the global tracing subscriber
//! * the Kubernetes client
//! * signal handling and graceful shutdown
//! * an admin server with liveness and readiness probes
//!
//! Readiness is reported once every controller spawned through
//! [`Runtime::run_controller`] has completed its initial sync.

use crate::{
    admin::{self, AdminArgs, Readiness},
    client::{self, Client, ClientArgs},
    controller::{self, Controller},
    initialized::{self, Initialized},
    log::{LogArgs, LogInitError},
    shutdown,
};
use kube::Resource;
use std::future::Future;

/// Configures a [`Runtime`]
#[derive(Debug, Default)]
#[must_use]
pub struct Builder {
    admin: AdminArgs,
    client: Option<ClientArgs>,
    log: Option<LogArgs>,
}

/// Runs controllers until the process is signaled to shut down
#[must_use]
pub struct Runtime {
    admin: admin::Bound,
    client: Client,
    initialized: Initialized,
    shutdown_rx: shutdown::Watch,
    shutdown: shutdown::Shutdown,
}

/// Indicates that the [`Builder`] could not configure a [`Runtime`]
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    LogInit(#[from] LogInitError),

    #[error("failed to bind admin server: {0}")]
    Admin(#[from] admin::Error),

    #[error(transparent)]
    Client(#[from] client::ConfigError),

    #[error(transparent)]
    Signal(#[from] shutdown::RegisterError),
}

// === impl Builder ===

impl Builder {
    pub fn with_admin(mut self, admin: AdminArgs) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_client(mut self, client: ClientArgs) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_log(mut self, log: LogArgs) -> Self {
        self.log = Some(log);
        self
    }

    /// Initializes logging, loads the Kubernetes client, registers signal
    /// handlers, and binds the admin server.
    pub async fn build(self) -> Result<Runtime, BuildError> {
        self.log.unwrap_or_default().try_init()?;
        let client = self.client.unwrap_or_default().try_client().await?;
        let (shutdown, shutdown_rx) = shutdown::sigint_or_sigterm()?;
        let admin = self.admin.into_builder().bind()?;
        Ok(Runtime {
            admin,
            client,
            initialized: Initialized::default(),
            shutdown_rx,
            shutdown,
        })
    }
}

// === impl Runtime ===

impl Runtime {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn readiness(&self) -> Readiness {
        self.admin.readiness()
    }

    /// Returns a handle that delays readiness until it is dropped.
    pub fn initialized_handle(&mut self) -> initialized::Handle {
        self.initialized.add_handle()
    }

    pub fn shutdown_handle(&self) -> shutdown::Watch {
        self.shutdown_rx.clone()
    }

    /// Prepares a controller to run with this runtime's client, shutdown
    /// signal, and readiness tracking.
    pub fn run_controller<K>(
        &mut self,
        controller: Controller<K>,
    ) -> impl Future<Output = Result<(), controller::Error>> + Send + 'static
    where
        K: Resource + Send + Sync + 'static,
    {
        controller.run(
            self.client(),
            self.shutdown_handle(),
            self.initialized_handle(),
        )
    }

    /// Serves the admin server and waits for shutdown to complete.
    ///
    /// The process is reported ready once all initialization handles are
    /// released, and unready as soon as shutdown begins.
    pub async fn run(self) -> Result<(), shutdown::Aborted> {
        let Self {
            admin,
            initialized,
            shutdown,
            shutdown_rx,
            ..
        } = self;

        let admin = admin.spawn();
        let ready = admin.readiness();
        tokio::spawn(async move {
            initialized.initialized().await;
            ready.set(true);
            tracing::info!("Ready");

            drop(shutdown_rx.signaled().await);
            ready.set(false);
            tracing::debug!("Not ready");
        });

        shutdown.signaled().await
    }
}
