//! Builds a Kubernetes client

pub use kube::Client;

/// Selects the cluster credentials to use
///
/// When no kubeconfig option is set, the client is configured from the
/// in-cluster service account or, failing that, the local kubeconfig.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ClientArgs {
    /// The kubeconfig context to use
    #[clap(long)]
    pub context: Option<String>,

    /// The kubeconfig cluster to use
    #[clap(long)]
    pub cluster: Option<String>,

    /// The kubeconfig user to use
    #[clap(long)]
    pub user: Option<String>,
}

/// Indicates that a client could not be configured
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Infer(#[from] kube::config::InferConfigError),

    #[error(transparent)]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to build client: {0}")]
    Client(#[from] kube::Error),
}

impl ClientArgs {
    pub async fn try_client(self) -> Result<Client, ConfigError> {
        let Self {
            context,
            cluster,
            user,
        } = self;

        let config = if context.is_none() && cluster.is_none() && user.is_none() {
            kube::Config::infer().await?
        } else {
            let options = kube::config::KubeConfigOptions {
                context,
                cluster,
                user,
            };
            kube::Config::from_kubeconfig(&options).await?
        };

        Ok(Client::try_from(config)?)
    }
}
