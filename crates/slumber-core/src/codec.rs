//! JSON formatting of model fields for both the server and the client.
//!
//! [`to_json_data`] runs on the server and turns one attribute into its wire
//! data; [`from_json_data`] runs on the client and turns a `{kind, data}`
//! pair back into a value or a lazily resolved remote instance.

use crate::field::OBJECT_KIND;
use crate::{FieldKind, FieldMeta, FieldType, FieldValue, ModelInstance, ModelSchema, SlumberError, SlumberResult, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

/// Wire form of a reference to a remote instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectReference {
    /// URL of the model's schema endpoint.
    #[serde(rename = "type")]
    pub model_url: String,
    /// Human-readable label of the instance.
    pub display: String,
    /// URL of the instance's data endpoint.
    #[serde(rename = "data")]
    pub data_url: String,
}

/// Builds client-side proxies for remote object references.
///
/// Implementations must not fetch anything: decoding stays lazy and the
/// returned instance loads its data on first use.
pub trait InstanceResolver {
    /// The proxy type handed back to callers.
    type Instance;

    /// Returns the proxy for the instance at `data_url` of the model at `model_url`.
    fn resolve(&self, model_url: Url, data_url: Url, display: String) -> SlumberResult<Self::Instance>;
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<I> {
    /// No value.
    Null,
    /// Already-typed scalar data.
    Scalar(Value),
    /// A remote instance proxy.
    Remote(I),
}

impl<I> Decoded<I> {
    /// Returns true for the null state.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the scalar data, if any.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the remote instance, if any.
    #[must_use]
    pub const fn as_remote(&self) -> Option<&I> {
        match self {
            Self::Remote(instance) => Some(instance),
            _ => None,
        }
    }
}

/// Converts a model field to JSON on the server.
pub fn to_json_data(
    registry: &TypeRegistry,
    instance: &dyn ModelInstance,
    fieldname: &str,
    fieldmeta: &FieldMeta,
) -> SlumberResult<Value> {
    let value = instance.field(fieldname).ok_or_else(|| SlumberError::UnknownField {
        model: instance.model_type().to_string(),
        field: fieldname.to_string(),
    })?;

    match fieldmeta.kind {
        FieldKind::Object => encode_reference(registry, &value, fieldname),
        FieldKind::Value => encode_value(&fieldmeta.field_type, &value),
    }
}

fn encode_reference(registry: &TypeRegistry, value: &FieldValue, fieldname: &str) -> SlumberResult<Value> {
    let related = match value {
        FieldValue::Null => return Ok(Value::Null),
        FieldValue::Object(related) => related,
        other => {
            return Err(SlumberError::malformed(format!(
                "field {fieldname} is declared as an object but holds {other:?}"
            )))
        }
    };

    let model_type = related.model_type();
    let model_url = registry.model_url(&model_type)?;
    let reference = RemoteObjectReference {
        data_url: format!("{model_url}data/{}/", related.pk().to_text()),
        model_url,
        display: related.display(),
    };
    Ok(serde_json::to_value(reference)?)
}

fn encode_value(field_type: &FieldType, value: &FieldValue) -> SlumberResult<Value> {
    match field_type {
        FieldType::AutoField | FieldType::BooleanField => value.to_json(),
        FieldType::ForeignKey => match value {
            FieldValue::Object(related) => related.pk().to_json(),
            other => other.to_json(),
        },
        FieldType::Other(_) => Ok(match value {
            FieldValue::Null => Value::Null,
            other => Value::String(other.to_text()),
        }),
    }
}

/// Encodes every field of a schema as `{name: {kind, type, data}}`.
pub fn encode_fields(
    registry: &TypeRegistry,
    instance: &dyn ModelInstance,
    schema: &ModelSchema,
) -> SlumberResult<Map<String, Value>> {
    let mut fields = Map::with_capacity(schema.fields.len());
    for (name, meta) in &schema.fields {
        let data = to_json_data(registry, instance, name, meta)?;
        fields.insert(
            name.clone(),
            json!({
                "kind": meta.wire_kind(),
                "type": meta.field_type.qualified_name(),
                "data": data,
            }),
        );
    }
    Ok(fields)
}

/// Converts the JSON representation of a field to the right type on the client.
pub fn from_json_data<R: InstanceResolver>(
    resolver: &R,
    base_url: &Url,
    json: &Value,
) -> SlumberResult<Decoded<R::Instance>> {
    let kind = json
        .get("kind")
        .ok_or_else(|| SlumberError::malformed("field has no 'kind'"))?;
    let data = json
        .get("data")
        .ok_or_else(|| SlumberError::malformed("field has no 'data'"))?;

    if kind.as_str() != Some(OBJECT_KIND) {
        return Ok(match data {
            Value::Null => Decoded::Null,
            other => Decoded::Scalar(other.clone()),
        });
    }

    if data.is_null() {
        return Ok(Decoded::Null);
    }

    let reference: RemoteObjectReference = serde_json::from_value(data.clone())
        .map_err(|e| SlumberError::malformed(format!("invalid object reference: {e}")))?;
    let model_url = base_url.join(&reference.model_url)?;
    let data_url = base_url.join(&reference.data_url)?;

    resolver
        .resolve(model_url, data_url, reference.display)
        .map(Decoded::Remote)
}
