/// A fully qualified domain name, optionally prefixed with a wildcard label
/// (e.g. `*.example.com`).
pub type Hostname = String;

/// Fields shared by all route types.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonRouteSpec {
    /// The resources (usually Gateways) that a route wants to be attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_refs: Option<Vec<ParentReference>>,
}

/// Identifies an API object (usually a Gateway) that a route attaches to.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// The API group of the referent. Defaults to `gateway.networking.k8s.io`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// The kind of the referent. Defaults to `Gateway`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The namespace of the referent. Defaults to the route's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// The name of the referent.
    pub name: String,

    /// The name of a section (e.g. a listener) within the referent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    /// The network port this route targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ParentReference {
    /// Indicates whether the reference points at a `Gateway`, either
    /// explicitly or by default.
    pub fn is_gateway(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k == "Gateway")
    }
}
