//! Recursive view of a JSON Schema object.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `type` keyword: a single name, a union array, or something
/// non-standard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    /// Union such as `["integer", "null"]`. Non-string members are ignored.
    Union(Vec<Value>),
    Other(Value),
}

/// A JSON Schema node, reduced to the keywords parameter translation uses.
///
/// `properties` keeps the order in which the schema declares them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JsonSchemaNode {
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    #[serde(deserialize_with = "ordered_properties")]
    pub properties: Option<Vec<(String, JsonSchemaNode)>>,
    #[serde(deserialize_with = "boxed_node")]
    pub items: Option<Box<JsonSchemaNode>>,
    pub required: Option<Vec<String>>,
    pub description: Option<String>,
}

impl JsonSchemaNode {
    /// Parse a node from a raw schema value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Whether `name` appears in this node's `required` list.
    pub fn is_required(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|list| list.iter().any(|r| r == name))
    }
}

/// Sub-schemas that are not objects (e.g. boolean schemas) carry no type
/// information and become an empty node.
fn node_from_value<E: serde::de::Error>(value: Value) -> Result<JsonSchemaNode, E> {
    if value.is_object() {
        JsonSchemaNode::deserialize(value).map_err(E::custom)
    } else {
        Ok(JsonSchemaNode::default())
    }
}

fn ordered_properties<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<(String, JsonSchemaNode)>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(map) = Option::<serde_json::Map<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    map.into_iter()
        .map(|(name, value)| Ok((name, node_from_value::<D::Error>(value)?)))
        .collect::<Result<Vec<_>, D::Error>>()
        .map(Some)
}

fn boxed_node<'de, D>(deserializer: D) -> Result<Option<Box<JsonSchemaNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value @ Value::Object(_)) => node_from_value(value).map(|n| Some(Box::new(n))),
        Some(Value::Array(_)) => Err(D::Error::custom(
            "tuple-style `items` arrays are not supported",
        )),
        Some(_) => Ok(None),
    }
}
