use crate::{CommonRouteSpec, Hostname};

/// Routes HTTP requests from a Gateway listener to backends.
///
/// Only the attachment (`parentRefs`) and `hostnames` fields are modeled.
#[derive(Clone, Debug, Default, PartialEq, Eq, kube::CustomResource, serde::Deserialize, serde::Serialize)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "HTTPRoute",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteSpec {
    /// Common route information.
    #[serde(flatten)]
    pub inner: CommonRouteSpec,

    /// Hostnames matched against the HTTP Host header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<Hostname>>,
}

/// An `HTTPRoute` object, named in the crate's casing.
pub type HttpRoute = HTTPRoute;

impl HttpRoute {
    /// Returns the first hostname, if any.
    pub fn first_hostname(&self) -> Option<&str> {
        self.spec.hostnames.as_ref()?.first().map(String::as_str)
    }

    /// Returns the route's parent references.
    pub fn parent_refs(&self) -> &[crate::ParentReference] {
        self.spec.inner.parent_refs.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_route() {
        let route: HttpRoute = serde_json::from_value(serde_json::json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "name": "api-route", "namespace": "default" },
            "spec": {
                "parentRefs": [{ "name": "internal", "sectionName": "https" }],
                "hostnames": ["api.example.com", "www.example.com"],
                "rules": [{ "backendRefs": [{ "name": "api", "port": 8080 }] }]
            }
        }))
        .expect("route must parse");

        assert_eq!(route.first_hostname(), Some("api.example.com"));
        assert_eq!(route.parent_refs().len(), 1);
        assert_eq!(route.parent_refs()[0].name, "internal");
        assert_eq!(route.parent_refs()[0].section_name.as_deref(), Some("https"));
        assert!(route.parent_refs()[0].is_gateway());
    }

    #[test]
    fn resource_metadata() {
        use kube::Resource;

        assert_eq!(HttpRoute::kind(&()), "HTTPRoute");
        assert_eq!(HttpRoute::group(&()), crate::GROUP);
        assert_eq!(HttpRoute::version(&()), "v1");
        assert_eq!(HttpRoute::plural(&()), "httproutes");
        assert_eq!(HttpRoute::api_version(&()), "gateway.networking.k8s.io/v1");
    }

    #[test]
    fn empty_spec() {
        let route = HttpRoute::new("empty", HttpRouteSpec::default());
        assert_eq!(route.first_hostname(), None);
        assert!(route.parent_refs().is_empty());
    }

    #[test]
    fn non_gateway_parent() {
        let parent = crate::ParentReference {
            kind: Some("Service".to_string()),
            name: "mesh".to_string(),
            ..Default::default()
        };
        assert!(!parent.is_gateway());
    }
}
