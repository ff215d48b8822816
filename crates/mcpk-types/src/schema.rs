//! Typed parameter metadata produced from a tool's input schema.

use crate::error::ArgumentError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Resolved type of one function parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    /// Homogeneous array with the given element type.
    Array(Box<TypeTag>),
    /// Record whose fields mirror a nested object schema.
    Object(BTreeMap<String, TypeTag>),
    /// Open-ended object without declared properties.
    Map,
    /// No declared type; the raw wire value is passed through.
    Dynamic,
    /// A primitive that also accepts absence / null.
    Optional(Box<TypeTag>),
}

impl TypeTag {
    /// Whether this is one of the four scalar tags.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeTag::String | TypeTag::Integer | TypeTag::Number | TypeTag::Boolean
        )
    }

    /// Wrap a primitive in `Optional`. Collections, records, `Map`, `Dynamic`
    /// and already-optional tags are returned unchanged.
    pub fn into_optional(self) -> Self {
        if self.is_primitive() {
            TypeTag::Optional(Box::new(self))
        } else {
            self
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeTag::Optional(_))
    }

    /// The tag with any `Optional` wrapper removed.
    pub fn base(&self) -> &TypeTag {
        match self {
            TypeTag::Optional(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::String => f.write_str("string"),
            TypeTag::Integer => f.write_str("integer"),
            TypeTag::Number => f.write_str("number"),
            TypeTag::Boolean => f.write_str("boolean"),
            TypeTag::Array(item) => write!(f, "array<{item}>"),
            TypeTag::Object(fields) => {
                f.write_str("object{")?;
                for (i, (name, tag)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {tag}")?;
                }
                f.write_str("}")
            }
            TypeTag::Map => f.write_str("map"),
            TypeTag::Dynamic => f.write_str("any"),
            TypeTag::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}

/// One top-level argument of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub resolved_type: TypeTag,
}

/// Translated parameters of one tool.
///
/// Keeps two orderings: the full property order from the schema, and the
/// order of the schema's `required` list. Positional callers rely on the
/// latter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    specs: Vec<ParameterSpec>,
    required_order: Vec<String>,
}

impl ParameterList {
    pub fn new(specs: Vec<ParameterSpec>, required_order: Vec<String>) -> Self {
        Self {
            specs,
            required_order,
        }
    }

    /// Parameters in schema property order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Required parameter names in the order the schema lists them.
    pub fn required_order(&self) -> &[String] {
        &self.required_order
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Bind positional values to parameter names.
    ///
    /// Values fill required parameters first, in required-list order, then
    /// the remaining parameters in property order.
    pub fn bind_positional(
        &self,
        values: Vec<Value>,
    ) -> Result<serde_json::Map<String, Value>, ArgumentError> {
        let names: Vec<&str> = self
            .required_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.get(name).is_some())
            .chain(
                self.specs
                    .iter()
                    .filter(|p| !self.required_order.contains(&p.name))
                    .map(|p| p.name.as_str()),
            )
            .collect();

        if values.len() > names.len() {
            return Err(ArgumentError::TooManyPositional {
                expected: names.len(),
                given: values.len(),
            });
        }

        Ok(names
            .into_iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect())
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a ParameterSpec;
    type IntoIter = std::slice::Iter<'a, ParameterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
