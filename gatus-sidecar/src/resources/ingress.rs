//! `networking.k8s.io/v1` Ingresses

use super::{api_resource, apply_dns_probe, convert, Definition, ParentRef, STATUS_OK};
use crate::{config::Config, endpoint::Endpoint};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;

/// The legacy annotation naming an ingress's class
const CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

pub fn definition() -> Definition<Ingress> {
    Definition {
        resource: api_resource("networking.k8s.io", "v1", "Ingress", "ingresses"),
        convert: convert::<Ingress>,
        auto_enabled,
        filter: Some(filter),
        extract_url: Some(extract_url),
        assign_conditions: Some(assign_conditions),
        apply_guarded: Some(apply_guarded),
        group: Some(class),
        parent: Some(parent),
    }
}

fn auto_enabled(config: &Config) -> bool {
    config.auto_ingress
}

fn filter(ing: &Ingress, config: &Config) -> bool {
    match config.ingress_class.as_deref() {
        Some(expected) => class(ing).as_deref() == Some(expected),
        None => true,
    }
}

/// Returns the ingress's class, preferring `spec.ingressClassName` over the
/// legacy annotation.
fn class(ing: &Ingress) -> Option<String> {
    ing.spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.clone())
        .or_else(|| ing.annotations().get(CLASS_ANNOTATION).cloned())
        .filter(|class| !class.is_empty())
}

fn first_host(ing: &Ingress) -> Option<&str> {
    ing.spec
        .as_ref()?
        .rules
        .as_ref()?
        .iter()
        .filter_map(|rule| rule.host.as_deref())
        .find(|host| !host.is_empty())
}

/// Hosts listed in a TLS entry are monitored over HTTPS.
fn extract_url(ing: &Ingress) -> String {
    let host = match first_host(ing) {
        Some(host) => host,
        None => return String::new(),
    };
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }

    let tls = ing
        .spec
        .as_ref()
        .and_then(|spec| spec.tls.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|tls| tls.hosts.as_ref())
        .flatten()
        .any(|h| h == host);
    let scheme = if tls { "https" } else { "http" };
    format!("{scheme}://{host}")
}

fn assign_conditions(_: &Config, _: &Ingress, ep: &mut Endpoint) {
    ep.conditions = vec![STATUS_OK.to_string()];
}

fn apply_guarded(ing: &Ingress, ep: &mut Endpoint) {
    apply_dns_probe(first_host(ing).unwrap_or_default(), ep);
}

/// Ingresses inherit annotations from their `IngressClass`.
fn parent(ing: &Ingress) -> Option<ParentRef> {
    Some(ParentRef {
        resource: api_resource("networking.k8s.io", "v1", "IngressClass", "ingressclasses"),
        namespace: None,
        name: class(ing)?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resources::Handler;

    fn ingress(value: serde_json::Value) -> Ingress {
        serde_json::from_value(value).expect("ingress must parse")
    }

    fn web() -> Ingress {
        ingress(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "web", "namespace": "apps" },
            "spec": {
                "ingressClassName": "nginx",
                "rules": [{ "http": { "paths": [] } }, { "host": "web.example.com" }],
                "tls": [{ "hosts": ["web.example.com"], "secretName": "web-tls" }]
            }
        }))
    }

    #[test]
    fn url_scheme_follows_tls() {
        assert_eq!(extract_url(&web()), "https://web.example.com");

        let plain = ingress(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "web" },
            "spec": {
                "rules": [{ "host": "web.example.com" }],
                "tls": [{ "hosts": ["other.example.com"] }]
            }
        }));
        assert_eq!(extract_url(&plain), "http://web.example.com");

        let hostless = ingress(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": { "name": "web" },
            "spec": { "rules": [{ "host": "" }] }
        }));
        assert_eq!(extract_url(&hostless), "");
    }

    #[test]
    fn class_falls_back_to_annotation() {
        assert_eq!(class(&web()).as_deref(), Some("nginx"));

        let legacy = ingress(serde_json::json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {
                "name": "web",
                "annotations": { "kubernetes.io/ingress.class": "traefik" }
            },
            "spec": {}
        }));
        assert_eq!(class(&legacy).as_deref(), Some("traefik"));
        assert_eq!(
            parent(&legacy).map(|p| (p.name, p.namespace)),
            Some(("traefik".to_string(), None))
        );
    }

    #[test]
    fn filters_by_class() {
        let handler = Handler::new(definition());
        let mut config = Config::default();
        assert!(handler.should_process(&web(), &config));

        config.ingress_class = Some("nginx".to_string());
        assert!(handler.should_process(&web(), &config));

        config.ingress_class = Some("traefik".to_string());
        assert!(!handler.should_process(&web(), &config));
    }

    #[test]
    fn guarded_probe() {
        let mut ep = Endpoint::new("web", "https://web.example.com", "1m");
        ep.guarded = true;
        Handler::new(definition()).apply_template(&Config::default(), &web(), &mut ep);
        assert_eq!(ep.url, "1.1.1.1");
        assert_eq!(
            ep.dns.get("query-name").and_then(|v| v.as_str()),
            Some("web.example.com")
        );
    }
}
