use crate::error::NormalizationError;
use crate::JsonMap;
use crate::JsonValue;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Operation;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use std::sync::Arc;

/// Input coercion for a custom scalar type.
///
/// Called with the JSON representation of a variable value or argument literal,
/// returns the coerced value or a message describing why the value was rejected.
/// Custom scalars without a registered coercion accept any value as-is.
pub type ScalarCoercion = Arc<dyn Fn(&JsonValue) -> Result<JsonValue, String> + Send + Sync>;

/// Values of variables from a given GraphQL request, after coercion to types expected by the operation.
///
/// Variables that were not provided, are nullable, and have no default value are absent from the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableValues(JsonMap);

impl std::ops::Deref for VariableValues {
    type Target = JsonMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl VariableValues {
    /// <https://spec.graphql.org/October2021/#sec-Coercing-Variable-Values>
    ///
    /// `schema` and `operation` are presumed valid.
    /// Custom scalars are passed through unchanged;
    /// use [`Normalizer::scalar_coercion`][crate::Normalizer::scalar_coercion] to check them.
    pub fn coerce(
        schema: &Schema,
        operation: &Operation,
        values: &JsonMap,
    ) -> Result<Self, NormalizationError> {
        Coercion::new(schema, &IndexMap::new()).variable_values(operation, values)
    }

    pub fn into_inner(self) -> JsonMap {
        self.0
    }
}

macro_rules! fail {
    ($($arg: tt)+) => {
        return Err(format!($($arg)+))
    };
}

pub(crate) struct Coercion<'a> {
    schema: &'a Schema,
    custom_scalars: &'a IndexMap<Name, ScalarCoercion>,
}

impl<'a> Coercion<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        custom_scalars: &'a IndexMap<Name, ScalarCoercion>,
    ) -> Self {
        Self {
            schema,
            custom_scalars,
        }
    }

    /// <https://spec.graphql.org/October2021/#CoerceVariableValues()>
    pub(crate) fn variable_values(
        &self,
        operation: &Operation,
        values: &JsonMap,
    ) -> Result<VariableValues, NormalizationError> {
        let mut coerced_values = JsonMap::new();
        for variable_def in &operation.variables {
            let name = variable_def.name.as_str();
            let error = |message| NormalizationError::variable(&variable_def.name, message);
            if let Some((key, value)) = values.get_key_value(name) {
                let value = self
                    .input_value("", &variable_def.ty, value)
                    .map_err(error)?;
                coerced_values.insert(key.clone(), value);
            } else if let Some(default) = &variable_def.default_value {
                let value = self
                    .literal("", &variable_def.ty, default, &VariableValues::default())
                    .map_err(error)?;
                coerced_values.insert(name, value);
            } else if variable_def.ty.is_non_null() {
                return Err(error(format!(
                    "expected a value of type {}, found none",
                    *variable_def.ty
                )));
            } else {
                // Nullable variable with no provided value nor explicit default.
                // Left unspecified by GraphQL, but for the similar case in input objects:
                //
                // > there is a semantic difference between the explicitly provided value null
                // > versus having not provided a value
            }
        }
        Ok(VariableValues(coerced_values))
    }

    /// <https://spec.graphql.org/October2021/#sec-Coercing-Field-Arguments>
    ///
    /// `parent_type` is the type of the selection set containing `field`, used in errors.
    pub(crate) fn argument_values(
        &self,
        variables: &VariableValues,
        parent_type: &Name,
        field_def: &FieldDefinition,
        field: &Field,
    ) -> Result<JsonMap, NormalizationError> {
        let mut coerced_values = JsonMap::new();
        for arg_def in &field_def.arguments {
            let arg_name = &arg_def.name;
            let error = |message| NormalizationError::ArgumentCoercion {
                coordinate: format!("{parent_type}.{}", field_def.name),
                argument: arg_name.clone(),
                message,
            };
            if let Some(arg) = field.arguments.iter().find(|arg| arg.name == *arg_name) {
                let provided = arg
                    .value
                    .as_variable()
                    .map_or(true, |var| variables.contains_key(var.as_str()));
                if provided {
                    let value = self
                        .literal("", &arg_def.ty, &arg.value, variables)
                        .map_err(error)?;
                    coerced_values.insert(arg_name.as_str(), value);
                    continue;
                }
            }
            if let Some(default) = &arg_def.default_value {
                let value = self
                    .literal("", &arg_def.ty, default, variables)
                    .map_err(error)?;
                coerced_values.insert(arg_name.as_str(), value);
            } else if arg_def.ty.is_non_null() {
                return Err(error(format!(
                    "expected a value of type {}, found none",
                    *arg_def.ty
                )));
            }
        }
        Ok(coerced_values)
    }

    /// Coerce a JSON value from the request to `ty`.
    fn input_value(
        &self,
        location: &str,
        ty: &Type,
        value: &JsonValue,
    ) -> Result<JsonValue, String> {
        if value.is_null() {
            if ty.is_non_null() {
                fail!("expected {ty}{}, found null", at(location))
            } else {
                return Ok(JsonValue::Null);
            }
        }
        let ty_name = match ty {
            Type::List(inner) | Type::NonNullList(inner) => {
                // https://spec.graphql.org/October2021/#sec-List.Input-Coercion
                return value
                    .as_array()
                    .map(Vec::as_slice)
                    // If not an array, treat the value as an array of size one:
                    .unwrap_or(std::slice::from_ref(value))
                    .iter()
                    .map(|item| self.input_value(location, inner, item))
                    .collect();
            }
            Type::Named(ty_name) | Type::NonNullNamed(ty_name) => ty_name,
        };
        let Some(ty_def) = self.schema.types.get(ty_name) else {
            fail!("undefined type {ty_name}{}", at(location))
        };
        match ty_def {
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                fail!("{ty_name} is not an input type")
            }
            ExtendedType::Scalar(_) => match ty_name.as_str() {
                "Int" => {
                    // https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
                    if value
                        .as_i64()
                        .is_some_and(|value| i32::try_from(value).is_ok())
                    {
                        return Ok(value.clone());
                    }
                }
                "Float" => {
                    // https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
                    // Integer input values are accepted for `Float`
                    if value.is_number() {
                        return Ok(value.clone());
                    }
                }
                "String" => {
                    // https://spec.graphql.org/October2021/#sec-String.Input-Coercion
                    if value.is_string() {
                        return Ok(value.clone());
                    }
                }
                "Boolean" => {
                    // https://spec.graphql.org/October2021/#sec-Boolean.Input-Coercion
                    if value.is_boolean() {
                        return Ok(value.clone());
                    }
                }
                "ID" => {
                    // https://spec.graphql.org/October2021/#sec-ID.Input-Coercion
                    if value.is_string() || value.is_i64() {
                        return Ok(value.clone());
                    }
                }
                _ => return self.custom_scalar(location, ty_name, value.clone()),
            },
            ExtendedType::Enum(ty_def) => {
                // https://spec.graphql.org/October2021/#sec-Enums.Input-Coercion
                if let Some(str) = value.as_str() {
                    if ty_def.values.keys().any(|value_name| value_name == str) {
                        return Ok(value.clone());
                    }
                }
            }
            ExtendedType::InputObject(ty_def) => {
                // https://spec.graphql.org/October2021/#sec-Input-Objects.Input-Coercion
                if let Some(object) = value.as_object() {
                    if let Some(key) = object
                        .keys()
                        .find(|key| !ty_def.fields.contains_key(key.as_str()))
                    {
                        fail!(
                            "input object{} has key {} not in type {ty_name}",
                            at(location),
                            key.as_str()
                        )
                    }
                    let mut object = object.clone();
                    for (field_name, field_def) in &ty_def.fields {
                        let field_location = format!("{ty_name}.{field_name}");
                        if let Some(field_value) = object.get_mut(field_name.as_str()) {
                            *field_value =
                                self.input_value(&field_location, &field_def.ty, field_value)?
                        } else if let Some(default) = &field_def.default_value {
                            let default = self.literal(
                                &field_location,
                                &field_def.ty,
                                default,
                                &VariableValues::default(),
                            )?;
                            object.insert(field_name.as_str(), default);
                        } else if field_def.ty.is_non_null() {
                            fail!("missing value for non-null input object field {field_location}")
                        } else {
                            // Field not required
                        }
                    }
                    return Ok(object.into());
                }
            }
        }
        fail!("expected {ty}{}, found {value}", at(location))
    }

    /// Coerce a GraphQL literal (argument value or default value) to `ty`,
    /// replacing variables with their coerced values.
    fn literal(
        &self,
        location: &str,
        ty: &Type,
        value: &Node<Value>,
        variables: &VariableValues,
    ) -> Result<JsonValue, String> {
        if let Some(var_name) = value.as_variable() {
            return match variables.get(var_name.as_str()) {
                Some(var_value) if var_value.is_null() && ty.is_non_null() => {
                    fail!("expected {ty}{}, found null variable ${var_name}", at(location))
                }
                Some(var_value) => Ok(var_value.clone()),
                None if ty.is_non_null() => {
                    fail!("expected {ty}{}, found missing variable ${var_name}", at(location))
                }
                None => Ok(JsonValue::Null),
            };
        }
        if value.is_null() {
            if ty.is_non_null() {
                fail!("expected {ty}{}, found null", at(location))
            } else {
                return Ok(JsonValue::Null);
            }
        }
        let ty_name = match ty {
            Type::List(inner_ty) | Type::NonNullList(inner_ty) => {
                // https://spec.graphql.org/October2021/#sec-List.Input-Coercion
                return value
                    .as_list()
                    // If not a list, treat the value as a list of size one:
                    .unwrap_or(std::slice::from_ref(value))
                    .iter()
                    .map(|item| self.literal(location, inner_ty, item, variables))
                    .collect();
            }
            Type::Named(ty_name) | Type::NonNullNamed(ty_name) => ty_name,
        };
        let Some(ty_def) = self.schema.types.get(ty_name) else {
            fail!("undefined type {ty_name}{}", at(location))
        };
        match ty_def {
            ExtendedType::InputObject(ty_def) => {
                // https://spec.graphql.org/October2021/#sec-Input-Objects.Input-Coercion
                let Some(object) = value.as_object() else {
                    fail!("expected {ty}{}, found {}", at(location), **value)
                };
                if let Some((key, _value)) = object
                    .iter()
                    .find(|(key, _value)| !ty_def.fields.contains_key(key))
                {
                    fail!(
                        "input object{} has key {key} not in type {ty_name}",
                        at(location)
                    )
                }
                let mut coerced_object = JsonMap::new();
                for (field_name, field_def) in &ty_def.fields {
                    let field_location = format!("{ty_name}.{field_name}");
                    let field_value = object
                        .iter()
                        .find(|(key, _value)| key == field_name)
                        .map(|(_key, value)| value)
                        // A variable without a runtime value counts as not provided
                        .filter(|value| {
                            value
                                .as_variable()
                                .map_or(true, |var| variables.contains_key(var.as_str()))
                        });
                    if let Some(field_value) = field_value {
                        let coerced_value =
                            self.literal(&field_location, &field_def.ty, field_value, variables)?;
                        coerced_object.insert(field_name.as_str(), coerced_value);
                    } else if let Some(default) = &field_def.default_value {
                        let default =
                            self.literal(&field_location, &field_def.ty, default, variables)?;
                        coerced_object.insert(field_name.as_str(), default);
                    } else if field_def.ty.is_non_null() {
                        fail!("missing value for non-null input object field {field_location}")
                    } else {
                        // Field not required
                    }
                }
                Ok(coerced_object.into())
            }
            ExtendedType::Enum(ty_def) => match &**value {
                Value::Enum(value_name) if ty_def.values.contains_key(value_name) => {
                    Ok(value_name.as_str().into())
                }
                other => fail!("expected {ty}{}, found {other}", at(location)),
            },
            ExtendedType::Scalar(_) => {
                // Literals were checked by validation: only convert between representations
                let json = literal_to_json(value)?;
                if is_built_in_scalar(ty_name) {
                    Ok(json)
                } else {
                    self.custom_scalar(location, ty_name, json)
                }
            }
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                fail!("{ty_name} is not an input type")
            }
        }
    }

    fn custom_scalar(
        &self,
        location: &str,
        ty_name: &Name,
        value: JsonValue,
    ) -> Result<JsonValue, String> {
        match self.custom_scalars.get(ty_name) {
            Some(coerce) => coerce(&value)
                .map_err(|message| format!("invalid {ty_name}{}: {message}", at(location))),
            None => Ok(value),
        }
    }
}

fn at(location: &str) -> String {
    if location.is_empty() {
        String::new()
    } else {
        format!(" for {location}")
    }
}

fn is_built_in_scalar(name: &str) -> bool {
    matches!(name, "Int" | "Float" | "String" | "Boolean" | "ID")
}

/// Convert a variable-free GraphQL literal to JSON without type information.
fn literal_to_json(value: &Value) -> Result<JsonValue, String> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Variable(name) => fail!("unexpected variable ${name} in a constant value"),
        Value::Enum(value) => Ok(value.as_str().into()),
        Value::String(value) => Ok(value.as_str().into()),
        Value::Boolean(value) => Ok((*value).into()),
        // Rely on `serde_json::Number`’s own parser to use whatever precision it supports
        Value::Int(value) => Ok(JsonValue::Number(
            value
                .as_str()
                .parse()
                .map_err(|_| format!("Int value {} overflows", value.as_str()))?,
        )),
        Value::Float(value) => Ok(JsonValue::Number(
            value
                .as_str()
                .parse()
                .map_err(|_| format!("Float value {} overflows", value.as_str()))?,
        )),
        Value::List(value) => value.iter().map(|value| literal_to_json(value)).collect(),
        Value::Object(value) => value
            .iter()
            .map(|(key, value)| Ok((key.as_str(), literal_to_json(value)?)))
            .collect(),
    }
}
