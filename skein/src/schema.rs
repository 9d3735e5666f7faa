//! Converts a JSON-Schema-shaped `inputSchema` value into the internal
//! [`PropertySpec`] tree used when assembling tool descriptors for the agent.
//!
//! The converter is intentionally permissive: malformed or unexpected shapes
//! degrade to an empty property tree rather than failing, since the schema
//! comes from a remote MCP server we do not control.

use serde_json::Value;
use std::collections::BTreeMap;

/// One property of a tool's input schema, recursively expanded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertySpec {
    /// JSON-Schema `type`; defaults to `"object"` when absent or non-string,
    /// so compound schemas (`oneOf`/`anyOf`/`allOf`) degrade gracefully.
    pub r#type: String,
    /// Human-readable description, if present.
    pub description: Option<String>,
    /// Stringified `enum` choices, if present.
    pub r#enum: Vec<String>,
    /// Nested item spec, populated when `type == "array"` and `items` is an object.
    pub items: Option<Box<PropertySpec>>,
    /// Nested properties, populated when `type == "object"`.
    pub properties: BTreeMap<String, PropertySpec>,
    /// Names from nested `required`, populated when `type == "object"`.
    pub required: Vec<String>,
}

/// A tool's full descriptor: its top-level properties and required names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolDescriptor {
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: Vec<String>,
}

/// Converts a raw JSON-Schema-shaped value into a [`ToolDescriptor`].
///
/// Returns an empty descriptor when `schema` is not a JSON object.
pub fn to_tool_descriptor(schema: &Value) -> ToolDescriptor {
    let Some(obj) = schema.as_object() else {
        return ToolDescriptor::default();
    };
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .filter_map(|(name, v)| v.as_object().map(|_| (name.clone(), to_property_spec(v))))
                .collect()
        })
        .unwrap_or_default();
    let required = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    ToolDescriptor {
        properties,
        required,
    }
}

/// Converts one JSON-Schema property node into a [`PropertySpec`], recursing
/// into `items` (for arrays) or `properties`/`required` (for objects).
pub fn to_property_spec(node: &Value) -> PropertySpec {
    let Some(obj) = node.as_object() else {
        return PropertySpec::default();
    };
    let r#type = obj
        .get("type")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| "object".to_string());
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);
    let r#enum = obj
        .get("enum")
        .and_then(Value::as_array)
        .map(|values| values.iter().map(stringify_scalar).collect())
        .unwrap_or_default();

    let items = if r#type == "array" {
        obj.get("items")
            .filter(|v| v.is_object())
            .map(|v| Box::new(to_property_spec(v)))
    } else {
        None
    };

    let (properties, required) = if r#type == "object" {
        let nested = to_tool_descriptor(node);
        (nested.properties, nested.required)
    } else {
        (BTreeMap::new(), Vec::new())
    };

    PropertySpec {
        r#type,
        description,
        r#enum,
        items,
        properties,
        required,
    }
}

fn stringify_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Re-serializes a [`ToolDescriptor`] back into a JSON-Schema-shaped value,
/// the inverse of [`to_tool_descriptor`]. Used to hand the agent a
/// normalized schema (defaulted types, stringified enums, compound schemas
/// collapsed to `object`) instead of the server's raw `inputSchema`.
pub fn descriptor_to_schema(descriptor: &ToolDescriptor) -> Value {
    let properties: serde_json::Map<String, Value> = descriptor
        .properties
        .iter()
        .map(|(name, spec)| (name.clone(), property_spec_to_schema(spec)))
        .collect();
    serde_json::json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": descriptor.required,
    })
}

/// Re-serializes one [`PropertySpec`] back into a JSON-Schema property node.
pub fn property_spec_to_schema(spec: &PropertySpec) -> Value {
    let mut node = serde_json::Map::new();
    node.insert("type".to_string(), Value::String(spec.r#type.clone()));
    if let Some(description) = &spec.description {
        node.insert("description".to_string(), Value::String(description.clone()));
    }
    if !spec.r#enum.is_empty() {
        node.insert(
            "enum".to_string(),
            Value::Array(spec.r#enum.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(items) = &spec.items {
        node.insert("items".to_string(), property_spec_to_schema(items));
    }
    if spec.r#type == "object" {
        let properties: serde_json::Map<String, Value> = spec
            .properties
            .iter()
            .map(|(name, nested)| (name.clone(), property_spec_to_schema(nested)))
            .collect();
        node.insert("properties".to_string(), Value::Object(properties));
        node.insert(
            "required".to_string(),
            Value::Array(spec.required.iter().cloned().map(Value::String).collect()),
        );
    }
    Value::Object(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_schema_yields_empty_descriptor() {
        assert_eq!(to_tool_descriptor(&json!("nonsense")), ToolDescriptor::default());
        assert_eq!(to_tool_descriptor(&json!(null)), ToolDescriptor::default());
    }

    #[test]
    fn flat_object_schema_converts_properties_and_required() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "file path"},
                "recursive": {"type": "boolean"}
            },
            "required": ["path"]
        });
        let descriptor = to_tool_descriptor(&schema);
        assert_eq!(descriptor.required, vec!["path".to_string()]);
        assert_eq!(descriptor.properties["path"].r#type, "string");
        assert_eq!(
            descriptor.properties["path"].description.as_deref(),
            Some("file path")
        );
        assert_eq!(descriptor.properties["recursive"].r#type, "boolean");
    }

    #[test]
    fn missing_type_defaults_to_object() {
        let spec = to_property_spec(&json!({"oneOf": [{"type": "string"}, {"type": "number"}]}));
        assert_eq!(spec.r#type, "object");
        assert!(spec.properties.is_empty());
    }

    #[test]
    fn array_schema_recurses_into_items() {
        let spec = to_property_spec(&json!({
            "type": "array",
            "items": {"type": "string", "enum": ["a", "b"]}
        }));
        assert_eq!(spec.r#type, "array");
        let items = spec.items.expect("items spec");
        assert_eq!(items.r#type, "string");
        assert_eq!(items.r#enum, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn nested_object_schema_recurses() {
        let spec = to_property_spec(&json!({
            "type": "object",
            "properties": {
                "inner": {"type": "number"}
            },
            "required": ["inner"]
        }));
        assert_eq!(spec.required, vec!["inner".to_string()]);
        assert_eq!(spec.properties["inner"].r#type, "number");
    }

    #[test]
    fn non_string_and_non_mapping_entries_are_skipped() {
        let schema = json!({
            "properties": {
                "ok": {"type": "string"},
                "bad": "not-a-mapping"
            },
            "required": ["ok", 5, "bad"]
        });
        let descriptor = to_tool_descriptor(&schema);
        assert_eq!(descriptor.properties.len(), 1);
        assert!(descriptor.properties.contains_key("ok"));
        assert_eq!(descriptor.required, vec!["ok".to_string(), "bad".to_string()]);
    }

    #[test]
    fn enum_scalars_are_stringified() {
        let spec = to_property_spec(&json!({"type": "number", "enum": [1, 2.5, true]}));
        assert_eq!(spec.r#enum, vec!["1", "2.5", "true"]);
    }

    #[test]
    fn descriptor_to_schema_round_trips_flat_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "file path"},
                "recursive": {"type": "boolean"}
            },
            "required": ["path"]
        });
        let rebuilt = descriptor_to_schema(&to_tool_descriptor(&schema));
        assert_eq!(rebuilt["required"], json!(["path"]));
        assert_eq!(rebuilt["properties"]["path"]["type"], json!("string"));
        assert_eq!(rebuilt["properties"]["path"]["description"], json!("file path"));
        assert_eq!(rebuilt["properties"]["recursive"]["type"], json!("boolean"));
    }

    #[test]
    fn descriptor_to_schema_collapses_compound_schemas_to_object() {
        let schema = json!({
            "type": "object",
            "properties": {
                "either": {"oneOf": [{"type": "string"}, {"type": "number"}]}
            },
            "required": []
        });
        let rebuilt = descriptor_to_schema(&to_tool_descriptor(&schema));
        assert_eq!(rebuilt["properties"]["either"]["type"], json!("object"));
    }
}
