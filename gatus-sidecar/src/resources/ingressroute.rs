//! Traefik `IngressRoute`s
//!
//! No typed API is available for Traefik's CRDs, so objects are read as
//! [`DynamicObject`]s.

use super::{api_resource, apply_dns_probe, ConversionError, Definition, STATUS_OK};
use crate::{config::Config, endpoint::Endpoint};
use kube::api::DynamicObject;
use once_cell::sync::Lazy;
use regex::Regex;

static HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host\(`([^`]+)`\)").expect("host regex must compile"));

pub fn definition() -> Definition<DynamicObject> {
    Definition {
        extract_url: Some(extract_url),
        assign_conditions: Some(assign_conditions),
        apply_guarded: Some(apply_guarded),
        ..Definition::new(
            api_resource("traefik.io", "v1alpha1", "IngressRoute", "ingressroutes"),
            convert,
            auto_enabled,
        )
    }
}

fn convert(obj: DynamicObject) -> Result<DynamicObject, ConversionError> {
    Ok(obj)
}

fn auto_enabled(config: &Config) -> bool {
    config.auto_ingressroute
}

/// Returns the first host matched by a `Host(...)` rule.
fn first_host(route: &DynamicObject) -> Option<&str> {
    route.data["spec"]["routes"]
        .as_array()?
        .iter()
        .filter_map(|r| r["match"].as_str())
        .find_map(|rule| HOST.captures(rule)?.get(1))
        .map(|m| m.as_str())
}

fn extract_url(route: &DynamicObject) -> String {
    let host = match first_host(route) {
        Some(host) => host,
        None => return String::new(),
    };
    let scheme = if route.data["spec"]["tls"].is_object() {
        "https"
    } else {
        "http"
    };
    format!("{scheme}://{host}")
}

fn assign_conditions(_: &Config, _: &DynamicObject, ep: &mut Endpoint) {
    ep.conditions = vec![STATUS_OK.to_string()];
}

fn apply_guarded(route: &DynamicObject, ep: &mut Endpoint) {
    if let Some(host) = first_host(route) {
        apply_dns_probe(host, ep);
    }
}
