//! OpenAPI v3 schema model
//!
//! `JsonSchemaProps` mirrors the `apiextensions.k8s.io/v1beta1`
//! `JSONSchemaProps` type. Fields are declared in the order Kubernetes
//! serializes them, and empty fields are skipped, so rendering a schema
//! produces the same key order as `kubectl` and the code generators do.
//!
//! Equality is structural: nested maps are `BTreeMap`s, so two schemata
//! built in a different order still compare equal.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchemaProps {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "$schema", default, skip_serializing_if = "String::is_empty")]
    pub schema: String,

    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    /// Allowed values, in source order
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Json>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<i64>,

    /// Required property names, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchemaPropsOrArray>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<JsonSchemaProps>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<JsonSchemaPropsOrBool>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_properties: BTreeMap<String, JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, JsonSchemaPropsOrStringArray>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<Box<JsonSchemaPropsOrBool>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, JsonSchemaProps>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocumentation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Json>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    /// Kept when explicitly set, even to `false`
    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub x_kubernetes_preserve_unknown_fields: Option<bool>,

    #[serde(rename = "x-kubernetes-embedded-resource", default, skip_serializing_if = "is_false")]
    pub x_kubernetes_embedded_resource: bool,

    #[serde(rename = "x-kubernetes-int-or-string", default, skip_serializing_if = "is_false")]
    pub x_kubernetes_int_or_string: bool,

    #[serde(rename = "x-kubernetes-list-map-keys", default, skip_serializing_if = "Vec::is_empty")]
    pub x_kubernetes_list_map_keys: Vec<String>,

    #[serde(rename = "x-kubernetes-list-type", default, skip_serializing_if = "Option::is_none")]
    pub x_kubernetes_list_type: Option<String>,

    #[serde(rename = "x-kubernetes-map-type", default, skip_serializing_if = "Option::is_none")]
    pub x_kubernetes_map_type: Option<String>,
}

impl JsonSchemaProps {
    /// A schema with just a type
    pub fn typed(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper adding a property
    pub fn with_property(mut self, name: impl Into<String>, schema: JsonSchemaProps) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Builder-style helper setting the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Call `f` on every schema nested directly inside this one
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut JsonSchemaProps)) {
        if let Some(items) = self.items.as_deref_mut() {
            match items {
                JsonSchemaPropsOrArray::Schema(schema) => f(schema),
                JsonSchemaPropsOrArray::Array(schemas) => schemas.iter_mut().for_each(&mut f),
            }
        }
        self.all_of.iter_mut().for_each(&mut f);
        self.one_of.iter_mut().for_each(&mut f);
        self.any_of.iter_mut().for_each(&mut f);
        if let Some(not) = self.not.as_deref_mut() {
            f(not);
        }
        self.properties.values_mut().for_each(&mut f);
        if let Some(JsonSchemaPropsOrBool::Schema(schema)) =
            self.additional_properties.as_deref_mut()
        {
            f(schema);
        }
        self.pattern_properties.values_mut().for_each(&mut f);
        for dependency in self.dependencies.values_mut() {
            if let JsonSchemaPropsOrStringArray::Schema(schema) = dependency {
                f(schema);
            }
        }
        if let Some(JsonSchemaPropsOrBool::Schema(schema)) = self.additional_items.as_deref_mut() {
            f(schema);
        }
        self.definitions.values_mut().for_each(&mut f);
    }
}

/// `items`: one schema for all elements, or one per position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonSchemaPropsOrArray {
    Array(Vec<JsonSchemaProps>),
    Schema(Box<JsonSchemaProps>),
}

/// `additionalProperties` / `additionalItems`: allowed flag or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonSchemaPropsOrBool {
    Allows(bool),
    Schema(Box<JsonSchemaProps>),
}

/// `dependencies` entry: a schema or a list of property names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonSchemaPropsOrStringArray {
    Property(Vec<String>),
    Schema(Box<JsonSchemaProps>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalDocumentation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_follows_kubernetes() {
        let schema: JsonSchemaProps = serde_yaml::from_str(
            concat!(
                "properties:\n  size: {type: integer}\ntype: object\n",
                "description: A widget\nrequired: [size]\n",
            ),
        )
        .unwrap();
        let out = serde_yaml::to_string(&schema).unwrap();
        assert_eq!(
            out,
            concat!(
                "description: A widget\ntype: object\nrequired:\n- size\n",
                "properties:\n  size:\n    type: integer\n",
            )
        );
    }

    #[test]
    fn test_equality_ignores_map_construction_order() {
        let a = JsonSchemaProps::typed("object")
            .with_property("a", JsonSchemaProps::typed("string"))
            .with_property("b", JsonSchemaProps::typed("integer"));
        let b = JsonSchemaProps::typed("object")
            .with_property("b", JsonSchemaProps::typed("integer"))
            .with_property("a", JsonSchemaProps::typed("string"));
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_description("changed"));
    }

    #[test]
    fn test_union_fields() {
        let schema: JsonSchemaProps = serde_yaml::from_str(
            concat!(
                "items: [{type: string}, {type: integer}]\nadditionalProperties: false\n",
                "dependencies:\n  a: [b, c]\n  d: {type: object}\n",
            ),
        )
        .unwrap();
        assert!(matches!(
            schema.items.as_deref(),
            Some(JsonSchemaPropsOrArray::Array(v)) if v.len() == 2
        ));
        assert_eq!(
            schema.additional_properties.as_deref(),
            Some(&JsonSchemaPropsOrBool::Allows(false))
        );
        assert!(matches!(schema.dependencies["a"], JsonSchemaPropsOrStringArray::Property(_)));
        assert!(matches!(schema.dependencies["d"], JsonSchemaPropsOrStringArray::Schema(_)));
    }

    #[test]
    fn test_preserve_unknown_fields_kept_when_false() {
        let schema = JsonSchemaProps {
            x_kubernetes_preserve_unknown_fields: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_yaml::to_string(&schema).unwrap(),
            "x-kubernetes-preserve-unknown-fields: false\n"
        );
        assert_eq!(serde_yaml::to_string(&JsonSchemaProps::default()).unwrap(), "{}\n");
    }
}
