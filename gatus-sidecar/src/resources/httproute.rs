//! Gateway API `HTTPRoute`s

use super::{api_resource, apply_dns_probe, convert, Definition, ParentRef, STATUS_OK};
use crate::{config::Config, endpoint::Endpoint};
use k8s_gateway_api::{HttpRoute, GROUP};
use kube::ResourceExt;

pub fn definition() -> Definition<HttpRoute> {
    Definition {
        resource: api_resource(GROUP, "v1", "HTTPRoute", "httproutes"),
        convert: convert::<HttpRoute>,
        auto_enabled,
        filter: Some(filter),
        extract_url: Some(extract_url),
        assign_conditions: Some(assign_conditions),
        apply_guarded: Some(apply_guarded),
        group: Some(group),
        parent: Some(parent),
    }
}

fn auto_enabled(config: &Config) -> bool {
    config.auto_httproute
}

/// Only routes attached to the configured gateway are monitored.
fn filter(route: &HttpRoute, config: &Config) -> bool {
    match config.gateway_name.as_deref() {
        Some(gateway) => route.parent_refs().iter().any(|p| p.name == gateway),
        None => true,
    }
}

fn extract_url(route: &HttpRoute) -> String {
    match route.first_hostname() {
        Some(host) if host.starts_with("http") => host.to_string(),
        Some(host) => format!("https://{host}"),
        None => String::new(),
    }
}

fn assign_conditions(_: &Config, _: &HttpRoute, ep: &mut Endpoint) {
    ep.conditions = vec![STATUS_OK.to_string()];
}

fn apply_guarded(route: &HttpRoute, ep: &mut Endpoint) {
    apply_dns_probe(route.first_hostname().unwrap_or_default(), ep);
}

fn group(route: &HttpRoute) -> Option<String> {
    route.parent_refs().first().map(|p| p.name.clone())
}

/// Routes inherit annotations from the first gateway they attach to.
fn parent(route: &HttpRoute) -> Option<ParentRef> {
    let parent = route.parent_refs().first()?;
    if !parent.is_gateway() {
        return None;
    }

    let group = parent.group.as_deref().unwrap_or(GROUP);
    Some(ParentRef {
        resource: api_resource(group, "v1", "Gateway", "gateways"),
        namespace: parent.namespace.clone().or_else(|| route.namespace()),
        name: parent.name.clone(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resources::Handler;

    fn route(value: serde_json::Value) -> HttpRoute {
        serde_json::from_value(value).expect("route must parse")
    }

    fn api_route() -> HttpRoute {
        route(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api", "namespace": "apps" },
            "spec": {
                "parentRefs": [{ "name": "internal", "namespace": "network" }],
                "hostnames": ["api.example.com", "api.example.org"]
            }
        }))
    }

    #[test]
    fn url_from_first_hostname() {
        assert_eq!(extract_url(&api_route()), "https://api.example.com");

        let explicit = route(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api" },
            "spec": { "hostnames": ["http://api.example.com"] }
        }));
        assert_eq!(extract_url(&explicit), "http://api.example.com");

        let none = route(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api" },
            "spec": {}
        }));
        assert_eq!(extract_url(&none), "");
    }

    #[test]
    fn filters_by_gateway() {
        let handler = Handler::new(definition());
        let mut config = Config::default();
        assert!(handler.should_process(&api_route(), &config));

        config.gateway_name = Some("internal".to_string());
        assert!(handler.should_process(&api_route(), &config));

        config.gateway_name = Some("external".to_string());
        assert!(!handler.should_process(&api_route(), &config));
    }

    #[test]
    fn gateway_parent() {
        assert_eq!(
            parent(&api_route()),
            Some(ParentRef {
                resource: api_resource(GROUP, "v1", "Gateway", "gateways"),
                namespace: Some("network".to_string()),
                name: "internal".to_string(),
            })
        );

        let local = route(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api", "namespace": "apps" },
            "spec": { "parentRefs": [{ "name": "internal" }] }
        }));
        assert_eq!(parent(&local).and_then(|p| p.namespace).as_deref(), Some("apps"));

        let mesh = route(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api", "namespace": "apps" },
            "spec": { "parentRefs": [{ "kind": "Service", "group": "", "name": "api" }] }
        }));
        assert_eq!(parent(&mesh), None);
    }

    #[test]
    fn guarded_probe() {
        let mut ep = Endpoint::new("api", "https://api.example.com", "1m");
        ep.guarded = true;
        Handler::new(definition()).apply_template(&Config::default(), &api_route(), &mut ep);
        assert_eq!(ep.url, "1.1.1.1");
        assert_eq!(ep.conditions, vec!["len([BODY]) == 0"]);
        assert_eq!(
            ep.dns.get("query-name").and_then(|v| v.as_str()),
            Some("api.example.com")
        );
    }

    #[test]
    fn groups_by_gateway() {
        assert_eq!(group(&api_route()).as_deref(), Some("internal"));
    }
}
