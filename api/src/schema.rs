use crate::fields::{Field, is_empty};
use indexmap::IndexMap;
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum BindError {
    #[error("{schema}: request must be a JSON object")]
    NotAnObject { schema: &'static str },
    #[error("{schema}: unknown field {field:?}")]
    UnknownField { schema: &'static str, field: String },
    #[error("{schema}: invalid value for field {field:?}")]
    InvalidField { schema: &'static str, field: &'static str },
}

/// A named, ordered set of field descriptors, fixed once built.
#[derive(Clone, Debug)]
pub struct Schema {
    name: &'static str,
    fields: IndexMap<&'static str, Field>,
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Schema {
            name,
            fields: IndexMap::new(),
        }
    }

    /// Starts from every descriptor declared on `base`. Redeclaring an
    /// inherited name replaces its descriptor in place.
    pub fn extending(name: &'static str, base: &Schema) -> Self {
        Schema {
            name,
            fields: base.fields.clone(),
        }
    }

    pub fn with(mut self, attr: &'static str, field: Field) -> Self {
        self.fields.insert(attr, field);
        self
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.fields.get(attr)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// Validates every supplied attribute and every declared one the caller
    /// left out. Nothing is bound unless all of them pass. `null` binds as an
    /// empty object.
    pub fn bind(&self, raw: &Value) -> Result<Bound, BindError> {
        let empty = Map::new();
        let map = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(BindError::NotAnObject { schema: self.name }),
        };

        for (key, value) in map {
            let (attr, field) =
                self.fields
                    .get_key_value(key.as_str())
                    .ok_or_else(|| BindError::UnknownField {
                        schema: self.name,
                        field: key.clone(),
                    })?;
            if !field.validate(Some(value)) {
                return Err(BindError::InvalidField {
                    schema: self.name,
                    field: *attr,
                });
            }
        }

        for (attr, field) in &self.fields {
            if !map.contains_key(*attr) && !field.validate(None) {
                return Err(BindError::InvalidField {
                    schema: self.name,
                    field: *attr,
                });
            }
        }

        let values = self
            .fields
            .keys()
            .filter_map(|attr| map.get(*attr).map(|value| (*attr, value.clone())))
            .collect();

        Ok(Bound { values })
    }
}

/// A fully validated instance of a schema. Read-only once built.
#[derive(Clone, Debug)]
pub struct Bound {
    values: IndexMap<&'static str, Value>,
}

impl Bound {
    /// The supplied value, unless it is empty.
    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.values.get(attr).filter(|value| !is_empty(value))
    }

    /// The supplied value, including `null` and empty ones.
    pub fn raw(&self, attr: &str) -> Option<&Value> {
        self.values.get(attr)
    }

    pub fn text(&self, attr: &str) -> Option<String> {
        self.get(attr).map(value_text)
    }

    /// Attributes supplied with a non-empty value, in declaration order.
    pub fn present(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, value)| !is_empty(value))
            .map(|(attr, _)| *attr)
            .collect()
    }
}

/// Strings as-is, anything else as its JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
