//! Command-line configuration for endpoint generation

use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

/// Controls which objects produce endpoints and where they are written
#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct Config {
    /// Only watch objects in this namespace (all namespaces when unset)
    #[clap(long, env = "GATUS_SIDECAR_NAMESPACE")]
    pub namespace: Option<String>,

    /// Only process HTTPRoutes attached to this Gateway
    #[clap(long)]
    pub gateway_name: Option<String>,

    /// Only process Ingresses of this class
    #[clap(long)]
    pub ingress_class: Option<String>,

    /// Group endpoints by their parent (Gateway or class) or namespace
    #[clap(long)]
    pub auto_group: bool,

    /// Monitor every HTTPRoute, even without annotations
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_httproute: bool,

    /// Monitor every Ingress, even without annotations
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_ingress: bool,

    /// Monitor every Service, even without annotations
    #[clap(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub auto_service: bool,

    /// Monitor every Traefik IngressRoute, even without annotations
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_ingressroute: bool,

    /// The kinds of objects to watch
    #[clap(long, value_enum, value_delimiter = ',', default_value = "httproute,ingress,service")]
    pub resources: Vec<ResourceKind>,

    /// The file to which endpoints are written
    #[clap(long, default_value = "/config/gatus-sidecar.yaml")]
    pub output: PathBuf,

    /// The check interval of endpoints without an explicit interval
    #[clap(long, default_value = "1m")]
    pub default_interval: Interval,

    /// The annotation that explicitly enables or disables monitoring
    #[clap(long, default_value = "gatus.home-operations.com/enabled")]
    pub enabled_annotation: String,

    /// The annotation holding a YAML endpoint template
    #[clap(long, default_value = "gatus.home-operations.com/endpoint")]
    pub template_annotation: String,

    /// How long to wait before reopening a failed watch
    #[clap(long, default_value = "5s")]
    pub reconnect_delay: Interval,
}

/// A kind of object that can be watched
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum ResourceKind {
    #[value(name = "httproute")]
    HttpRoute,
    Ingress,
    Service,
    #[value(name = "ingressroute")]
    IngressRoute,
}

/// A duration expressed the way Gatus expects it, e.g. `30s` or `1m`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval(Duration);

#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid interval {0:?}: expected a number followed by one of ms, s, m or h")]
pub struct InvalidInterval(String);

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            gateway_name: None,
            ingress_class: None,
            auto_group: false,
            auto_httproute: true,
            auto_ingress: true,
            auto_service: false,
            auto_ingressroute: true,
            resources: vec![
                ResourceKind::HttpRoute,
                ResourceKind::Ingress,
                ResourceKind::Service,
            ],
            output: PathBuf::from("/config/gatus-sidecar.yaml"),
            default_interval: Interval::from_secs(60),
            enabled_annotation: "gatus.home-operations.com/enabled".to_string(),
            template_annotation: "gatus.home-operations.com/endpoint".to_string(),
            reconnect_delay: Interval::from_secs(5),
        }
    }
}

// === impl ResourceKind ===

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpRoute => f.write_str("httproute"),
            Self::Ingress => f.write_str("ingress"),
            Self::Service => f.write_str("service"),
            Self::IngressRoute => f.write_str("ingressroute"),
        }
    }
}

// === impl Interval ===

impl Interval {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for Interval {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl FromStr for Interval {
    type Err = InvalidInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^\s*(\d+)(ms|s|m|h)\s*$").expect("interval regex must compile")
        });

        let invalid = || InvalidInterval(s.to_string());
        let caps = RE.captures(s).ok_or_else(invalid)?;
        let n = caps[1].parse::<u64>().map_err(|_| invalid())?;
        let d = match &caps[2] {
            "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n.checked_mul(60).ok_or_else(invalid)?),
            "h" => Duration::from_secs(n.checked_mul(60 * 60).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };
        Ok(Self(d))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.subsec_nanos() != 0 {
            return write!(f, "{}ms", self.0.as_millis());
        }
        match self.0.as_secs() {
            0 => f.write_str("0s"),
            s if s % (60 * 60) == 0 => write!(f, "{}h", s / (60 * 60)),
            s if s % 60 == 0 => write!(f, "{}m", s / 60),
            s => write!(f, "{s}s"),
        }
    }
}
