//! Keeps endpoints in sync with the objects of one kind
//!
//! A [`Controller`] lists all objects of its kind, seeds the shared state
//! from them, and then follows a watch from the list's resource version.
//! Watches are reopened from the last observed version after they end or
//! fail, and restarted from scratch when the version has expired.

use crate::{
    config::Config,
    endpoint::Endpoint,
    initialized,
    resources::{ConversionError, Definition, Handler},
    shutdown,
    state::{Key, StateManager, Write},
    template::{self, Scope},
};
use futures_util::StreamExt;
use kube::{
    api::{Api, DynamicObject, ListParams, WatchEvent, WatchParams},
    core::ApiResource,
    Client, Resource, ResourceExt,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Server-side timeout for each watch request, in seconds.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Resource version that asks the API server for a fresh watch.
const FROM_START: &str = "0";

/// Drives a [`Handler`] from a Kubernetes watch
#[derive(Debug)]
pub struct Controller<K> {
    handler: Handler<K>,
    state: StateManager,
    config: Arc<Config>,
}

/// A change to a watched object
#[derive(Clone, Debug)]
pub enum Event {
    Added(DynamicObject),
    Modified(DynamicObject),
    Deleted(DynamicObject),
}

/// Indicates that a controller could not start
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list {resource}: {source}")]
    InitialList {
        resource: String,
        #[source]
        source: kube::Error,
    },
}

impl<K> Controller<K>
where
    K: Resource + Send + Sync,
{
    pub fn new(definition: Definition<K>, state: StateManager, config: Arc<Config>) -> Self {
        Self {
            handler: Handler::new(definition),
            state,
            config,
        }
    }

    /// Enables lookups of parent annotations.
    pub fn with_client(mut self, client: Client) -> Self {
        self.handler = self.handler.with_client(client);
        self
    }

    fn resource(&self) -> &ApiResource {
        &self.handler.definition().resource
    }

    /// Runs the controller until shutdown is signaled.
    ///
    /// The initialization handle is released once the initial list has been
    /// applied and written. Only a failure of the initial list is returned
    /// as an error; watch failures are retried indefinitely.
    pub async fn run(
        self,
        client: Client,
        shutdown: shutdown::Watch,
        initialized: initialized::Handle,
    ) -> Result<(), Error> {
        let span = info_span!("controller", resource = %self.resource().plural);
        self.with_client(client.clone())
            .run_inner(client, shutdown, initialized)
            .instrument(span)
            .await
    }

    async fn run_inner(
        self,
        client: Client,
        shutdown: shutdown::Watch,
        initialized: initialized::Handle,
    ) -> Result<(), Error> {
        let api = match self.config.namespace.as_deref() {
            Some(ns) => Api::<DynamicObject>::namespaced_with(client, ns, self.resource()),
            None => Api::<DynamicObject>::all_with(client, self.resource()),
        };

        let shutdown = shutdown.signaled();
        tokio::pin!(shutdown);

        let mut version = tokio::select! {
            res = self.seed(&api) => res?,
            _ = &mut shutdown => return Ok(()),
        };
        drop(initialized);
        info!(%version, "watching");

        let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let delay = self.config.reconnect_delay.as_duration();
        loop {
            let stream = tokio::select! {
                res = api.watch(&params, &version) => res,
                _ = &mut shutdown => return Ok(()),
            };
            match stream {
                Ok(stream) => {
                    tokio::pin!(stream);
                    loop {
                        let next = tokio::select! {
                            next = stream.next() => next,
                            _ = &mut shutdown => return Ok(()),
                        };
                        match next {
                            Some(Ok(event)) => {
                                if !self.observe(event, &mut version).await {
                                    break;
                                }
                            }
                            Some(Err(error)) => {
                                warn!(%error, "watch failed");
                                break;
                            }
                            None => {
                                debug!(%version, "watch ended");
                                break;
                            }
                        }
                    }
                }
                Err(error) => warn!(%error, "failed to start watch"),
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => return Ok(()),
            }
        }
    }

    /// Applies the initial list to the state and writes it, returning the
    /// list's resource version.
    async fn seed(&self, api: &Api<DynamicObject>) -> Result<String, Error> {
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| Error::InitialList {
                resource: self.resource().plural.clone(),
                source,
            })?;

        let count = list.items.len();
        for obj in list.items {
            self.handle_event(Event::Added(obj), Write::Deferred).await;
        }
        self.state.force_write();
        info!(objects = count, "synced");

        Ok(list.metadata.resource_version.unwrap_or_default())
    }

    /// Applies a watch event, tracking the resource version to resume from.
    ///
    /// Returns false when the watch must be reopened.
    async fn observe(&self, event: WatchEvent<DynamicObject>, version: &mut String) -> bool {
        let event = match event {
            WatchEvent::Added(obj) => Event::Added(obj),
            WatchEvent::Modified(obj) => Event::Modified(obj),
            WatchEvent::Deleted(obj) => Event::Deleted(obj),
            WatchEvent::Bookmark(bookmark) => {
                *version = bookmark.metadata.resource_version;
                return true;
            }
            WatchEvent::Error(error) if error.code == 410 => {
                debug!(message = %error.message, "resource version expired");
                *version = FROM_START.to_string();
                return false;
            }
            WatchEvent::Error(error) => {
                warn!(code = error.code, message = %error.message, "watch error");
                return false;
            }
        };

        let obj = match &event {
            Event::Added(obj) | Event::Modified(obj) | Event::Deleted(obj) => obj,
        };
        if let Some(v) = obj.resource_version() {
            *version = v;
        }
        self.handle_event(event, Write::Now).await;
        true
    }

    /// Applies a single change to the state.
    ///
    /// Deletions are keyed from the object's metadata so that they apply
    /// even when the object no longer decodes.
    pub async fn handle_event(&self, event: Event, write: Write) {
        let obj = match event {
            Event::Added(obj) | Event::Modified(obj) => obj,
            Event::Deleted(obj) => {
                self.remove(&self.key(&obj));
                return;
            }
        };

        let name = obj.name_any();
        let namespace = obj.namespace().unwrap_or_default();
        match self.convert(obj) {
            Ok(obj) => self.handle_object(&obj, write).await,
            Err(error) => warn!(%error, %name, %namespace, "skipping object"),
        }
    }

    fn convert(&self, obj: DynamicObject) -> Result<K, ConversionError> {
        (self.handler.definition().convert)(obj)
    }

    /// Derives the endpoint for a typed object and records it.
    pub async fn handle_object(&self, obj: &K, write: Write) {
        let key = self.key(obj);
        if !self.handler.should_process(obj, &self.config) {
            self.remove(&key);
            return;
        }

        let url = match self.handler.extract_url(obj) {
            Some(url) => url,
            None => {
                // An existing endpoint is kept until the object is disabled
                // or deleted.
                warn!(name = %key.name, namespace = %key.namespace, "No URL; skipping");
                return;
            }
        };

        let parent = self
            .handler
            .parent_annotations(obj)
            .await
            .unwrap_or_default();
        let annotations = obj.annotations();

        let enabled = annotations
            .get(&self.config.enabled_annotation)
            .or_else(|| parent.get(&self.config.enabled_annotation));
        if let Some(enabled) = enabled {
            if enabled != "true" && enabled != "1" {
                self.remove(&key);
                return;
            }
        }

        let template = match self.template(&parent, annotations) {
            Ok(template) => template,
            Err(error) => {
                error!(%error, name = %key.name, namespace = %key.namespace, "invalid template");
                return;
            }
        };

        let mut ep = Endpoint {
            guarded: template
                .as_ref()
                .is_some_and(|t| t.contains_key("guarded")),
            ..Endpoint::new(
                key.name.clone(),
                url,
                self.config.default_interval.to_string(),
            )
        };
        self.handler.apply_template(&self.config, obj, &mut ep);
        if let Some(template) = &template {
            ep.apply_template(template);
        }

        let (name, namespace) = (key.name.clone(), key.namespace.clone());
        if self.state.add_or_update(key, ep, write) {
            info!(%name, %namespace, "updated endpoint");
        }
    }

    fn template(
        &self,
        parent: &BTreeMap<String, String>,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Option<template::Template>, template::TemplateParseError> {
        let key = &self.config.template_annotation;
        let parent = template::parse(parent, key, Scope::Parent)?;
        let object = template::parse(annotations, key, Scope::Object)?;
        Ok(template::merge(parent, object))
    }

    fn remove(&self, key: &Key) {
        if self.state.remove(key) {
            info!(name = %key.name, namespace = %key.namespace, "removed endpoint");
        }
    }

    fn key<R: Resource>(&self, obj: &R) -> Key {
        Key::new(
            obj.name_any(),
            obj.namespace().unwrap_or_default(),
            self.resource().plural.clone(),
        )
    }
}
