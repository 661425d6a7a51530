//! Derives [Gatus] monitoring endpoints from Kubernetes objects
//!
//! Controllers watch HTTPRoutes, Ingresses, Services and (optionally)
//! Traefik IngressRoutes. Each object in scope yields one [`Endpoint`],
//! shaped by per-kind defaults and by YAML templates read from the object's
//! annotations and, for routes and ingresses, from its parent Gateway or
//! IngressClass. All endpoints are written to a single YAML file that Gatus
//! loads as configuration.
//!
//! # Annotations
//!
//! - `gatus.home-operations.com/enabled`: `"true"` or `"1"` opts an object in
//!   when its kind is not monitored automatically; any other value opts it
//!   out.
//! - `gatus.home-operations.com/endpoint`: a YAML mapping of endpoint fields.
//!   A `guarded` key turns HTTPRoute and Ingress endpoints into DNS
//!   resolution probes.
//!
//! # TLS Features
//!
//! - **rustls-tls** (default): Use [`rustls`] for the Kubernetes client.
//! - **openssl-tls**: Use OpenSSL for the Kubernetes client.
//!
//! [Gatus]: https://github.com/TwiN/gatus
//! [`rustls`]: https://crates.io/crates/rustls

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod admin;
pub mod client;
pub mod config;
pub mod controller;
pub mod endpoint;
pub mod initialized;
pub mod log;
pub mod resources;
pub mod runtime;
pub mod shutdown;
pub mod state;
pub mod template;

pub use self::{
    admin::AdminArgs,
    client::ClientArgs,
    config::{Config, Interval, ResourceKind},
    controller::Controller,
    endpoint::Endpoint,
    log::{LogArgs, LogFormat},
    runtime::Runtime,
    state::{Key, StateManager, Write},
};
