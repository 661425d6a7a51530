use super::{Definition, ParentRef};
use crate::{config::Config, endpoint::Endpoint};
use kube::{
    api::{Api, DynamicObject},
    Client, Resource, ResourceExt,
};
use std::{collections::BTreeMap, fmt};
use tracing::debug;

/// Evaluates a [`Definition`] against objects
///
/// Parent annotations can only be resolved when the handler has a client.
pub struct Handler<K> {
    definition: Definition<K>,
    client: Option<Client>,
}

impl<K> Handler<K>
where
    K: Resource + Sync,
{
    pub fn new(definition: Definition<K>) -> Self {
        Self {
            definition,
            client: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn definition(&self) -> &Definition<K> {
        &self.definition
    }

    /// Indicates whether an endpoint should be generated for `obj`.
    ///
    /// Objects rejected by the kind's filter are never processed. Otherwise
    /// an object is processed when its kind is auto-enabled or when it
    /// carries either the enabled or the template annotation.
    pub fn should_process(&self, obj: &K, config: &Config) -> bool {
        if let Some(filter) = self.definition.filter {
            if !filter(obj, config) {
                return false;
            }
        }

        if (self.definition.auto_enabled)(config) {
            return true;
        }

        let annotations = obj.annotations();
        annotations.contains_key(&config.enabled_annotation)
            || annotations.contains_key(&config.template_annotation)
    }

    /// Returns the URL to monitor, if the object has one.
    pub fn extract_url(&self, obj: &K) -> Option<String> {
        let extract = self.definition.extract_url?;
        Some(extract(obj)).filter(|url| !url.is_empty())
    }

    /// Applies the kind's defaults to `ep`.
    ///
    /// Guarded endpoints are rewritten into DNS probes when the kind supports
    /// it; all others receive the kind's default conditions.
    pub fn apply_template(&self, config: &Config, obj: &K, ep: &mut Endpoint) {
        if config.auto_group {
            if let Some(group) = self.definition.group.and_then(|group| group(obj)) {
                ep.group = group;
            }
        }

        match self.definition.apply_guarded {
            Some(apply_guarded) if ep.guarded => apply_guarded(obj, ep),
            _ => {
                if let Some(assign) = self.definition.assign_conditions {
                    assign(config, obj, ep);
                }
            }
        }
    }

    /// Fetches the annotations of the object's parent.
    ///
    /// Lookup failures are not errors: the object is processed as if it had
    /// no parent.
    pub async fn parent_annotations(&self, obj: &K) -> Option<BTreeMap<String, String>> {
        let parent = self.definition.parent.and_then(|parent| parent(obj))?;
        let client = self.client.clone()?;
        let ParentRef {
            resource,
            namespace,
            name,
        } = parent;

        let api = match namespace.as_deref() {
            Some(ns) => Api::<DynamicObject>::namespaced_with(client, ns, &resource),
            None => Api::<DynamicObject>::all_with(client, &resource),
        };
        match api.get_opt(&name).await {
            Ok(Some(parent)) => Some(parent.annotations().clone()),
            Ok(None) => {
                debug!(kind = %resource.kind, %name, ?namespace, "parent not found");
                None
            }
            Err(error) => {
                debug!(%error, kind = %resource.kind, %name, ?namespace, "failed to fetch parent");
                None
            }
        }
    }
}

impl<K> fmt::Debug for Handler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("definition", &self.definition)
            .field("client", &self.client.is_some())
            .finish()
    }
}
