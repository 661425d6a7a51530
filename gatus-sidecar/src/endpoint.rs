use crate::template::{self, Template};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// A Gatus monitoring endpoint
///
/// Named fields are serialized first, in declaration order, followed by any
/// other top-level template keys, so every Gatus option can be expressed
/// without this type modeling it.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Endpoint {
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,

    pub url: String,

    pub interval: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,

    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub dns: Mapping,

    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub client: Mapping,

    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub ui: Mapping,

    /// Probes the host's DNS resolution instead of the URL itself.
    #[serde(skip)]
    pub guarded: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            interval: interval.into(),
            ..Self::default()
        }
    }

    /// Overlays a template onto the endpoint.
    ///
    /// Values with an unexpected type for a known field are ignored; the
    /// field keeps its current value. Unknown keys are carried verbatim.
    pub fn apply_template(&mut self, template: &Template) {
        for (key, value) in template {
            let key = match key.as_str() {
                Some(key) => key,
                None => continue,
            };
            match key {
                "name" => {
                    // An endpoint is always addressable by name.
                    if let Some(name) = value.as_str().filter(|n| !n.is_empty()) {
                        self.name = name.to_string();
                    }
                }
                "group" => set_string(&mut self.group, value),
                "url" => set_string(&mut self.url, value),
                "interval" => set_string(&mut self.interval, value),
                "conditions" => self.set_conditions(value),
                "dns" => merge_mapping(&mut self.dns, value),
                "client" => merge_mapping(&mut self.client, value),
                "ui" => merge_mapping(&mut self.ui, value),
                "guarded" => {
                    if let Value::Bool(guarded) = value {
                        self.guarded = *guarded;
                    }
                }
                key => {
                    self.extra.insert(key.to_string(), value.clone());
                }
            }
        }
    }

    fn set_conditions(&mut self, value: &Value) {
        match value {
            Value::String(condition) => self.conditions = vec![condition.clone()],
            Value::Sequence(conditions) => {
                self.conditions = conditions
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect();
            }
            _ => {}
        }
    }
}

fn set_string(field: &mut String, value: &Value) {
    if let Some(s) = value.as_str() {
        *field = s.to_string();
    }
}

fn merge_mapping(field: &mut Mapping, value: &Value) {
    if let Value::Mapping(overrides) = value {
        template::merge_into(field, overrides.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn yaml(s: &str) -> Template {
        serde_yaml::from_str(s).expect("test template must parse")
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("api", "https://api.example.com", "1m")
    }

    #[test]
    fn overrides_scalars() {
        let mut ep = endpoint();
        ep.apply_template(&yaml(
            "{name: custom, group: edge, url: 'https://other', interval: 5m}",
        ));
        assert_eq!(ep.name, "custom");
        assert_eq!(ep.group, "edge");
        assert_eq!(ep.url, "https://other");
        assert_eq!(ep.interval, "5m");
    }

    #[test]
    fn ignores_mistyped_values() {
        let mut ep = endpoint();
        ep.apply_template(&yaml("{interval: 30, guarded: 'yes', name: 123, dns: 8.8.8.8}"));
        ep.apply_template(&yaml("{name: ''}"));
        assert_eq!(ep, endpoint());
    }

    #[test]
    fn normalizes_conditions() {
        let mut ep = endpoint();
        ep.apply_template(&yaml("{conditions: '[STATUS] == 200'}"));
        assert_eq!(ep.conditions, vec!["[STATUS] == 200"]);

        ep.apply_template(&yaml(
            "{conditions: ['[STATUS] == 200', 42, '[RESPONSE_TIME] < 300']}",
        ));
        assert_eq!(
            ep.conditions,
            vec!["[STATUS] == 200", "[RESPONSE_TIME] < 300"]
        );

        ep.apply_template(&yaml("{conditions: {a: b}}"));
        assert_eq!(ep.conditions.len(), 2);
    }

    #[test]
    fn merges_nested_mappings() {
        let mut ep = endpoint();
        ep.client = yaml("{insecure: true, timeout: 10s}");
        ep.apply_template(&yaml("{client: {timeout: 3s}, ui: {hide-url: true}}"));
        assert_eq!(ep.client, yaml("{insecure: true, timeout: 3s}"));
        assert_eq!(ep.ui, yaml("{hide-url: true}"));
    }

    #[test]
    fn carries_unknown_keys() {
        let mut ep = endpoint();
        ep.apply_template(&yaml(
            "{alerts: [{type: slack}], 42: ignored, headers: {X-Test: a}}",
        ));
        assert_eq!(ep.extra.len(), 2);
        assert!(ep.extra.contains_key("alerts"));
        assert!(ep.extra.contains_key("headers"));
    }

    #[test]
    fn idempotent() {
        let template = yaml(
            "{interval: 5m, conditions: ['[STATUS] == 200'], client: {insecure: true}, alerts: [{type: slack}]}",
        );
        let mut once = endpoint();
        once.apply_template(&template);
        let mut twice = once.clone();
        twice.apply_template(&template);
        assert_eq!(once, twice);
    }

    #[test]
    fn sets_guarded() {
        let mut ep = endpoint();
        ep.apply_template(&yaml("{guarded: true}"));
        assert!(ep.guarded);
        assert!(ep.extra.is_empty());
    }

    #[test]
    fn serializes_in_field_order() {
        let mut ep = endpoint();
        ep.guarded = true;
        ep.conditions = vec!["[STATUS] == 200".to_string()];
        ep.extra.insert("alerts".to_string(), yaml("{type: slack}").into());
        let yaml = serde_yaml::to_string(&ep).expect("must serialize");
        let doc: Mapping = serde_yaml::from_str(&yaml).expect("must parse");
        let keys = doc.keys().filter_map(Value::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["name", "url", "interval", "conditions", "alerts"]);
    }
}
