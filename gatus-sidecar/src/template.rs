//! Endpoint templates read from object annotations
//!
//! A template is a YAML mapping of endpoint overrides. Templates may be
//! inherited from a parent object (e.g. a `Gateway`) and combined with the
//! object's own template with [`merge`], so that the child wins on every
//! conflicting leaf while sibling keys of nested maps are preserved.

use serde_yaml::{Mapping, Value};
use std::{collections::BTreeMap, fmt};

/// An override tree parsed from a template annotation
pub type Template = Mapping;

/// Where a template was read from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The annotations of a parent object
    Parent,

    /// The annotations of the watched object itself
    Object,
}

/// Indicates that a template annotation does not hold a YAML mapping
#[derive(Debug, thiserror::Error)]
#[error("invalid {scope} template: {source}")]
pub struct TemplateParseError {
    scope: Scope,
    #[source]
    source: serde_yaml::Error,
}

/// Parses the template stored under `key` in `annotations`
///
/// Returns `None` when the annotation is missing, empty, or holds an empty
/// YAML document.
pub fn parse(
    annotations: &BTreeMap<String, String>,
    key: &str,
    scope: Scope,
) -> Result<Option<Template>, TemplateParseError> {
    let text = match annotations.get(key) {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Ok(None),
    };
    serde_yaml::from_str::<Option<Template>>(text)
        .map_err(|source| TemplateParseError { scope, source })
}

/// Deep-merges a `child` template over a `parent` template
///
/// If either side is absent, the other is returned unchanged.
pub fn merge(parent: Option<Template>, child: Option<Template>) -> Option<Template> {
    match (parent, child) {
        (None, child) => child,
        (parent, None) => parent,
        (Some(mut parent), Some(child)) => {
            merge_into(&mut parent, child);
            Some(parent)
        }
    }
}

/// Deep-merges `overrides` into `base`
///
/// Where both sides hold a mapping for the same key, the mappings are merged
/// recursively. Otherwise the override replaces the base value entirely;
/// sequences are never concatenated.
pub fn merge_into(base: &mut Mapping, overrides: Mapping) {
    for (key, value) in overrides {
        if let Value::Mapping(nested) = value {
            if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                merge_into(existing, nested);
                continue;
            }
            base.insert(key, Value::Mapping(nested));
        } else {
            base.insert(key, value);
        }
    }
}

// === impl Scope ===

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Object => f.write_str("object"),
        }
    }
}
