//! Per-kind rules for deriving endpoints from Kubernetes objects
//!
//! Each kind is described by a [`Definition`]: a table of functions that
//! select objects, extract their URL, and apply kind-specific defaults. A
//! [`Handler`] evaluates a definition against objects on behalf of a
//! controller.

use crate::{config::Config, endpoint::Endpoint};
use kube::{
    api::DynamicObject,
    core::{ApiResource, Resource},
};
use serde::de::DeserializeOwned;
use std::fmt;

mod handler;
pub mod httproute;
pub mod ingress;
pub mod ingressroute;
pub mod service;

pub use self::handler::Handler;

/// The condition applied to HTTP endpoints by default
pub const STATUS_OK: &str = "[STATUS] == 200";

/// The condition applied to TCP endpoints by default
pub const CONNECTED: &str = "[CONNECTED] == true";

/// Describes how objects of one kind become endpoints
///
/// Optional entries that are absent leave the corresponding step a no-op.
pub struct Definition<K> {
    pub resource: ApiResource,

    /// Decodes a watched object into its typed form.
    pub convert: fn(DynamicObject) -> Result<K, ConversionError>,

    /// Whether objects of this kind are monitored without any annotation.
    pub auto_enabled: fn(&Config) -> bool,

    /// Rejects objects that are out of scope, e.g. attached to another
    /// gateway.
    pub filter: Option<fn(&K, &Config) -> bool>,

    /// Returns the URL to monitor, or an empty string if there is none.
    pub extract_url: Option<fn(&K) -> String>,

    pub assign_conditions: Option<fn(&Config, &K, &mut Endpoint)>,

    /// Rewrites the endpoint into a DNS resolution probe.
    pub apply_guarded: Option<fn(&K, &mut Endpoint)>,

    /// The group used when `--auto-group` is set.
    pub group: Option<fn(&K) -> Option<String>>,

    /// Locates the object whose annotations this object inherits.
    pub parent: Option<fn(&K) -> Option<ParentRef>>,
}

/// Refers to an object whose annotations are inherited
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentRef {
    pub resource: ApiResource,

    /// Unset for cluster-scoped parents.
    pub namespace: Option<String>,

    pub name: String,
}

/// Indicates that a watched object could not be decoded
#[derive(Debug, thiserror::Error)]
#[error("failed to decode {kind}: {source}")]
pub struct ConversionError {
    kind: String,
    #[source]
    source: serde_json::Error,
}

/// Decodes a dynamic object into a typed resource.
pub fn convert<K>(obj: DynamicObject) -> Result<K, ConversionError>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|source| ConversionError {
            kind: K::kind(&()).into_owned(),
            source,
        })
}

/// Builds the API description of a resource.
pub fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    let api_version = if group.is_empty() {
        version.to_string()
    } else {
        format!("{group}/{version}")
    };
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version,
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

/// Turns an endpoint into a DNS probe of `host` against a public resolver.
///
/// The probe succeeds when the name resolves; the response body is the
/// resolved address set.
pub(crate) fn apply_dns_probe(host: &str, ep: &mut Endpoint) {
    ep.url = "1.1.1.1".to_string();
    ep.dns.insert("query-name".into(), host.into());
    ep.dns.insert("query-type".into(), "A".into());
    ep.conditions = vec!["len([BODY]) == 0".to_string()];
}

// === impl Definition ===

impl<K> Definition<K> {
    /// Returns a definition with no optional behavior.
    pub fn new(
        resource: ApiResource,
        convert: fn(DynamicObject) -> Result<K, ConversionError>,
        auto_enabled: fn(&Config) -> bool,
    ) -> Self {
        Self {
            resource,
            convert,
            auto_enabled,
            filter: None,
            extract_url: None,
            assign_conditions: None,
            apply_guarded: None,
            group: None,
            parent: None,
        }
    }
}

impl<K> fmt::Debug for Definition<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("resource", &self.resource.plural)
            .field("filter", &self.filter.is_some())
            .field("apply_guarded", &self.apply_guarded.is_some())
            .field("parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}
