//! Kubernetes Gateway API types
//!
//! Only the fields read by `gatus-sidecar` are modeled: route hostnames and
//! parent references. Unknown fields are ignored when deserializing, so objects
//! served by newer API versions still parse.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod httproute;
mod shared;

pub use self::{
    httproute::{HTTPRoute, HttpRoute, HttpRouteSpec},
    shared::{CommonRouteSpec, Hostname, ParentReference},
};

/// The API group of all Gateway API resources
pub const GROUP: &str = "gateway.networking.k8s.io";
