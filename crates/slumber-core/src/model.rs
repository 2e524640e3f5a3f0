//! Native model abstraction.
//!
//! Server code exposes its own types by implementing [`ModelInstance`]; the
//! [`Record`] type covers the common case of a plain field map.

use crate::{FieldMeta, SlumberError, SlumberResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

/// Identity of a native model class: application label plus model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelType {
    pub app_label: String,
    pub model_name: String,
}

impl ModelType {
    /// Creates a model type.
    #[must_use]
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
        }
    }

    /// Parses `app.label.ModelName`; the last segment is the model name.
    #[must_use]
    pub fn parse(qualified: &str) -> Option<Self> {
        let (app, name) = qualified.rsplit_once('.')?;
        if app.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(app, name))
    }

    /// Remote path for this model, relative to the applications root.
    ///
    /// `django.contrib.auth.User` maps to `django/contrib/auth/User/`.
    #[must_use]
    pub fn default_path(&self) -> String {
        format!("{}/{}/", self.app_path(), self.model_name)
    }

    /// Application part of the remote path, without trailing slash.
    #[must_use]
    pub fn app_path(&self) -> String {
        self.app_label.replace('.', "/")
    }
}

impl Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

/// A native model instance that can be served remotely.
pub trait ModelInstance: Debug + Send + Sync {
    /// The instance's runtime model type.
    fn model_type(&self) -> ModelType;

    /// Primary key.
    fn pk(&self) -> FieldValue;

    /// Human-readable label.
    fn display(&self) -> String;

    /// Reads an attribute; `None` when the model has no such attribute.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// Value of a single model attribute.
#[derive(Clone)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Object(Arc<dyn ModelInstance>),
}

impl FieldValue {
    /// Returns true for the explicit null state.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts the value to JSON without any type-specific transform.
    ///
    /// Related instances are represented by their primary key. Non-finite
    /// floats have no JSON form and fail with `MalformedPayload`.
    pub fn to_json(&self) -> SlumberResult<Value> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| SlumberError::malformed(format!("{f} has no JSON representation")))?,
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(_) => Value::String(self.to_text()),
            Self::Object(instance) => instance.pk().to_json()?,
        })
    }

    /// String form used for fields without a dedicated transform.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Self::Object(instance) => instance.display(),
        }
    }
}

impl Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Timestamp(ts) => f.debug_tuple("Timestamp").field(ts).finish(),
            Self::Object(instance) => f
                .debug_tuple("Object")
                .field(&format_args!("{}({})", instance.model_type(), instance.pk().to_text()))
                .finish(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Schema of an exposed model: its type and ordered field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    pub model_type: ModelType,
    pub fields: Vec<(String, FieldMeta)>,
}

impl ModelSchema {
    /// Creates a schema with no fields.
    #[must_use]
    pub const fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            fields: Vec::new(),
        }
    }

    /// Adds a field descriptor.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, meta: FieldMeta) -> Self {
        self.fields.push((name.into(), meta));
        self
    }

    /// Looks up a field descriptor by name.
    #[must_use]
    pub fn field_meta(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, meta)| meta)
    }

    /// Remote path for the schema's model.
    #[must_use]
    pub fn default_path(&self) -> String {
        self.model_type.default_path()
    }
}

/// A plain in-memory model instance.
#[derive(Debug, Clone)]
pub struct Record {
    model_type: ModelType,
    pk: FieldValue,
    display: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates a record; the primary key is also readable as the `id` field.
    #[must_use]
    pub fn new(model_type: ModelType, pk: impl Into<FieldValue>, display: impl Into<String>) -> Self {
        let pk = pk.into();
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), pk.clone());
        Self {
            model_type,
            pk,
            display: display.into(),
            fields,
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a relational attribute.
    #[must_use]
    pub fn with_object(mut self, name: impl Into<String>, related: Arc<dyn ModelInstance>) -> Self {
        self.fields.insert(name.into(), FieldValue::Object(related));
        self
    }
}

impl ModelInstance for Record {
    fn model_type(&self) -> ModelType {
        self.model_type.clone()
    }

    fn pk(&self) -> FieldValue {
        self.pk.clone()
    }

    fn display(&self) -> String {
        self.display.clone()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }
}
