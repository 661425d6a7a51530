//! Core `Service`s, monitored with TCP connection checks

use super::{api_resource, convert, Definition, CONNECTED};
use crate::{config::Config, endpoint::Endpoint};
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;

pub fn definition() -> Definition<Service> {
    Definition {
        extract_url: Some(extract_url),
        assign_conditions: Some(assign_conditions),
        group: Some(group),
        ..Definition::new(
            api_resource("", "v1", "Service", "services"),
            convert::<Service>,
            auto_enabled,
        )
    }
}

fn auto_enabled(config: &Config) -> bool {
    config.auto_service
}

/// Addresses the service's first port through cluster DNS.
fn extract_url(svc: &Service) -> String {
    let port = match svc
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
    {
        Some(port) => port,
        None => return String::new(),
    };
    let protocol = port
        .protocol
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("tcp")
        .to_lowercase();
    format!(
        "{protocol}://{}.{}.svc:{}",
        svc.name_any(),
        svc.namespace().unwrap_or_default(),
        port.port
    )
}

fn assign_conditions(_: &Config, _: &Service, ep: &mut Endpoint) {
    ep.conditions = vec![CONNECTED.to_string()];
}

fn group(svc: &Service) -> Option<String> {
    svc.namespace()
}
