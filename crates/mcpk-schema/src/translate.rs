//! Schema-to-parameter translation.

use crate::node::{JsonSchemaNode, SchemaType};
use mcpk_types::{ParameterList, ParameterSpec, SchemaError, TypeTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What to do with a property whose type cannot be resolved.
///
/// One policy governs a whole schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Reject the schema with a [`SchemaError`].
    #[default]
    Strict,
    /// Degrade the property to `String`.
    Lenient,
}

/// Translate a tool's raw `inputSchema` into parameter metadata.
///
/// A `null` schema means the tool takes no arguments.
pub fn translate(input_schema: &Value, policy: SchemaPolicy) -> Result<ParameterList, SchemaError> {
    if input_schema.is_null() {
        return Ok(ParameterList::default());
    }
    if !input_schema.is_object() {
        return degrade_or_fail(policy, format!("expected an object, got {input_schema}"));
    }
    match JsonSchemaNode::from_value(input_schema) {
        Ok(node) => translate_node(&node, policy),
        Err(e) => degrade_or_fail(policy, e.to_string()),
    }
}

fn degrade_or_fail(policy: SchemaPolicy, message: String) -> Result<ParameterList, SchemaError> {
    match policy {
        SchemaPolicy::Strict => Err(SchemaError::Malformed { message }),
        SchemaPolicy::Lenient => {
            tracing::warn!("Ignoring malformed input schema: {message}");
            Ok(ParameterList::default())
        }
    }
}

/// Translate an already parsed schema node.
pub fn translate_node(
    schema: &JsonSchemaNode,
    policy: SchemaPolicy,
) -> Result<ParameterList, SchemaError> {
    let Some(properties) = &schema.properties else {
        return Ok(ParameterList::default());
    };

    let specs = properties
        .iter()
        .map(|(name, sub)| {
            let required = schema.is_required(name);
            Ok(ParameterSpec {
                name: name.clone(),
                description: sub.description.clone().unwrap_or_default(),
                required,
                resolved_type: resolve_type(name, sub, required, policy)?,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(ParameterList::new(
        specs,
        schema.required.clone().unwrap_or_default(),
    ))
}

/// Resolve one property's sub-schema to a [`TypeTag`].
///
/// `property` names the property in error messages. A non-required primitive
/// comes back wrapped in [`TypeTag::Optional`].
pub fn resolve_type(
    property: &str,
    schema: &JsonSchemaNode,
    required: bool,
    policy: SchemaPolicy,
) -> Result<TypeTag, SchemaError> {
    let tag = match &schema.schema_type {
        None => return Ok(TypeTag::Dynamic),
        Some(SchemaType::Single(name)) => resolve_keyword(property, name, schema, policy)?,
        Some(SchemaType::Union(members)) => {
            let names: Vec<&str> = members.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            // More than one non-null member: the first one wins.
            match names.iter().find(|n| **n != "null") {
                Some(first) => {
                    let tag = resolve_keyword(property, first, schema, policy)?;
                    if nullable { tag.into_optional() } else { tag }
                }
                None => unresolvable(
                    policy,
                    SchemaError::EmptyUnion {
                        property: property.to_string(),
                    },
                )?,
            }
        }
        Some(SchemaType::Other(value)) => unresolvable(
            policy,
            SchemaError::UnknownType {
                property: property.to_string(),
                type_name: value.to_string(),
            },
        )?,
    };

    Ok(if required { tag } else { tag.into_optional() })
}

fn resolve_keyword(
    property: &str,
    keyword: &str,
    schema: &JsonSchemaNode,
    policy: SchemaPolicy,
) -> Result<TypeTag, SchemaError> {
    match keyword {
        "string" => Ok(TypeTag::String),
        "integer" => Ok(TypeTag::Integer),
        "number" => Ok(TypeTag::Number),
        "boolean" => Ok(TypeTag::Boolean),
        "array" => Ok(TypeTag::Array(Box::new(item_type(property, schema, policy)))),
        "object" => match &schema.properties {
            Some(properties) => {
                let fields = properties
                    .iter()
                    .map(|(name, sub)| {
                        let path = format!("{property}.{name}");
                        let tag = resolve_type(&path, sub, schema.is_required(name), policy)?;
                        Ok((name.clone(), tag))
                    })
                    .collect::<Result<BTreeMap<_, _>, SchemaError>>()?;
                Ok(TypeTag::Object(fields))
            }
            None => Ok(TypeTag::Map),
        },
        "null" => unresolvable(
            policy,
            SchemaError::EmptyUnion {
                property: property.to_string(),
            },
        ),
        other => unresolvable(
            policy,
            SchemaError::UnknownType {
                property: property.to_string(),
                type_name: other.to_string(),
            },
        ),
    }
}

/// Element type of an array; `String` when `items` is absent or untyped.
fn item_type(property: &str, schema: &JsonSchemaNode, policy: SchemaPolicy) -> TypeTag {
    let Some(items) = schema.items.as_deref() else {
        return TypeTag::String;
    };
    if items.schema_type.is_none() {
        return TypeTag::String;
    }
    match resolve_type(&format!("{property}[]"), items, true, policy) {
        // Element nullability is not tracked.
        Ok(tag) => tag.base().clone(),
        Err(e) => {
            tracing::debug!("Array items of '{property}' fall back to string: {e}");
            TypeTag::String
        }
    }
}

fn unresolvable(policy: SchemaPolicy, error: SchemaError) -> Result<TypeTag, SchemaError> {
    match policy {
        SchemaPolicy::Strict => Err(error),
        SchemaPolicy::Lenient => {
            tracing::debug!("Degrading to string: {error}");
            Ok(TypeTag::String)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opt(tag: TypeTag) -> TypeTag {
        TypeTag::Optional(Box::new(tag))
    }

    fn resolve(schema: Value, required: bool) -> Result<TypeTag, SchemaError> {
        let node = JsonSchemaNode::from_value(&schema).unwrap();
        resolve_type("p", &node, required, SchemaPolicy::Strict)
    }

    #[test]
    fn primitives_resolve_to_matching_tag() {
        for (name, tag) in [
            ("string", TypeTag::String),
            ("integer", TypeTag::Integer),
            ("number", TypeTag::Number),
            ("boolean", TypeTag::Boolean),
        ] {
            assert_eq!(resolve(json!({"type": name}), true).unwrap(), tag);
            assert_eq!(resolve(json!({"type": [name, "null"]}), true).unwrap(), opt(tag.clone()));
            assert_eq!(resolve(json!({"type": ["null", name]}), true).unwrap(), opt(tag));
        }
    }

    #[test]
    fn optional_primitive_is_wrapped_once() {
        assert_eq!(resolve(json!({"type": "integer"}), false).unwrap(), opt(TypeTag::Integer));
        assert_eq!(
            resolve(json!({"type": ["integer", "null"]}), false).unwrap(),
            opt(TypeTag::Integer)
        );
    }

    #[test]
    fn collections_are_never_wrapped() {
        assert_eq!(
            resolve(json!({"type": "array", "items": {"type": "string"}}), false).unwrap(),
            TypeTag::Array(Box::new(TypeTag::String))
        );
        assert_eq!(resolve(json!({"type": "object"}), false).unwrap(), TypeTag::Map);
        assert_eq!(resolve(json!({}), false).unwrap(), TypeTag::Dynamic);
    }

    #[test]
    fn array_item_types() {
        assert_eq!(
            resolve(json!({"type": "array", "items": {"type": "integer"}}), true).unwrap(),
            TypeTag::Array(Box::new(TypeTag::Integer))
        );
        assert_eq!(
            resolve(json!({"type": "array"}), true).unwrap(),
            TypeTag::Array(Box::new(TypeTag::String))
        );
        assert_eq!(
            resolve(json!({"type": "array", "items": {"description": "untyped"}}), true).unwrap(),
            TypeTag::Array(Box::new(TypeTag::String))
        );
        assert_eq!(
            resolve(json!({"type": "array", "items": {"type": ["number", "null"]}}), true).unwrap(),
            TypeTag::Array(Box::new(TypeTag::Number))
        );
        // An unresolvable element type still yields an array of strings.
        assert_eq!(
            resolve(json!({"type": "array", "items": {"type": "widget"}}), true).unwrap(),
            TypeTag::Array(Box::new(TypeTag::String))
        );
    }

    #[test]
    fn nested_object_becomes_record() {
        let tag = resolve(
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "labels": {"type": "array", "items": {"type": "string"}},
                    "note": {"type": "string"}
                },
                "required": ["id"]
            }),
            true,
        )
        .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), TypeTag::Integer);
        fields.insert("labels".to_string(), TypeTag::Array(Box::new(TypeTag::String)));
        fields.insert("note".to_string(), opt(TypeTag::String));
        assert_eq!(tag, TypeTag::Object(fields));
    }

    #[test]
    fn multi_member_union_takes_first_non_null() {
        assert_eq!(
            resolve(json!({"type": ["string", "integer"]}), true).unwrap(),
            TypeTag::String
        );
        assert_eq!(
            resolve(json!({"type": ["null", "integer", "string"]}), true).unwrap(),
            opt(TypeTag::Integer)
        );
    }

    #[test]
    fn empty_union_fails_in_strict_mode() {
        for schema in [json!({"type": ["null"]}), json!({"type": []}), json!({"type": "null"})] {
            assert_eq!(
                resolve(schema, true).unwrap_err(),
                SchemaError::EmptyUnion {
                    property: "p".into()
                }
            );
        }
    }

    #[test]
    fn unknown_type_fails_in_strict_mode() {
        let err = resolve(json!({"type": "widget"}), true).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownType {
                property: "p".into(),
                type_name: "widget".into()
            }
        );
    }

    #[test]
    fn lenient_policy_degrades_to_string() {
        let node = JsonSchemaNode::from_value(&json!({"type": ["null"]})).unwrap();
        assert_eq!(
            resolve_type("p", &node, true, SchemaPolicy::Lenient).unwrap(),
            TypeTag::String
        );
        let node = JsonSchemaNode::from_value(&json!({"type": "widget"})).unwrap();
        assert_eq!(
            resolve_type("p", &node, false, SchemaPolicy::Lenient).unwrap(),
            opt(TypeTag::String)
        );
    }

    #[test]
    fn nested_errors_name_the_full_path() {
        let err = resolve(
            json!({"type": "object", "properties": {"inner": {"type": "widget"}}}),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { property, .. } if property == "p.inner"));
    }

    #[test]
    fn empty_or_absent_schema_yields_no_parameters() {
        for schema in [
            Value::Null,
            json!({}),
            json!({"type": "object"}),
            json!({"type": "object", "properties": {}}),
        ] {
            let params = translate(&schema, SchemaPolicy::Strict).unwrap();
            assert!(params.is_empty(), "schema {schema} produced parameters");
        }
    }

    #[test]
    fn translate_preserves_both_orderings() {
        let schema = json!({
            "type": "object",
            "properties": {
                "repo": {"type": "string", "description": "Repository name"},
                "owner": {"type": "string", "description": "Repository owner"},
                "page": {"type": "number"}
            },
            "required": ["owner", "repo"]
        });
        let params = translate(&schema, SchemaPolicy::Strict).unwrap();
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["repo", "owner", "page"]);
        assert_eq!(params.required_order(), ["owner", "repo"]);

        let repo = params.get("repo").unwrap();
        assert!(repo.required);
        assert_eq!(repo.description, "Repository name");
        assert_eq!(repo.resolved_type, TypeTag::String);

        let page = params.get("page").unwrap();
        assert!(!page.required);
        assert_eq!(page.description, "");
        assert_eq!(page.resolved_type, opt(TypeTag::Number));
    }

    #[test]
    fn strict_translation_rejects_whole_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "ok": {"type": "string"},
                "bad": {"type": ["null"]}
            }
        });
        assert!(translate(&schema, SchemaPolicy::Strict).is_err());
        let params = translate(&schema, SchemaPolicy::Lenient).unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn non_object_schema_is_malformed() {
        let err = translate(&json!("nope"), SchemaPolicy::Strict).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
        assert!(translate(&json!("nope"), SchemaPolicy::Lenient).unwrap().is_empty());
    }

    #[test]
    fn policy_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: SchemaPolicy,
        }
        let w: Wrapper = toml::from_str(r#"policy = "lenient""#).unwrap();
        assert_eq!(w.policy, SchemaPolicy::Lenient);
        assert_eq!(SchemaPolicy::default(), SchemaPolicy::Strict);
    }
}
