//! Field descriptors.
//!
//! A [`FieldMeta`] says how one model attribute travels over the wire. The
//! set of field types with a dedicated transform is closed; everything else
//! is carried as [`FieldType::Other`] and encoded through its string form.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Wire `kind` for relational fields.
pub const OBJECT_KIND: &str = "object";

/// Whether a field holds a reference to another instance or a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A related instance, sent as a remote object reference.
    Object,
    /// A plain value, sent according to its [`FieldType`].
    Value,
}

/// Declared type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Auto-increment identifier.
    AutoField,
    /// Boolean flag.
    BooleanField,
    /// Foreign key exposed as the related primary key.
    ForeignKey,
    /// Any other field type, by qualified name.
    Other(String),
}

impl FieldType {
    /// Returns the qualified type name used on the wire.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        match self {
            Self::AutoField => "django.db.models.fields.AutoField",
            Self::BooleanField => "django.db.models.fields.BooleanField",
            Self::ForeignKey => "django.db.models.fields.related.ForeignKey",
            Self::Other(name) => name,
        }
    }

    /// Parses a qualified type name.
    #[must_use]
    pub fn from_qualified_name(name: &str) -> Self {
        match name {
            "django.db.models.fields.AutoField" => Self::AutoField,
            "django.db.models.fields.BooleanField" => Self::BooleanField,
            "django.db.models.fields.related.ForeignKey" => Self::ForeignKey,
            other => Self::Other(other.to_string()),
        }
    }

    /// Shorthand for `django.db.models.fields.CharField`.
    #[must_use]
    pub fn char_field() -> Self {
        Self::Other("django.db.models.fields.CharField".to_string())
    }

    /// Shorthand for `django.db.models.fields.DateTimeField`.
    #[must_use]
    pub fn date_time_field() -> Self {
        Self::Other("django.db.models.fields.DateTimeField".to_string())
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

impl Serialize for FieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.qualified_name())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_qualified_name(&name))
    }
}

/// Describes how a single model attribute is encoded and decoded.
///
/// Serialized in wire form: `{"kind": "object" | <type name>, "type": <type name>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireFieldMeta", from = "WireFieldMeta")]
pub struct FieldMeta {
    pub kind: FieldKind,
    pub field_type: FieldType,
}

#[derive(Serialize, Deserialize)]
struct WireFieldMeta {
    kind: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

impl From<FieldMeta> for WireFieldMeta {
    fn from(meta: FieldMeta) -> Self {
        Self {
            kind: meta.wire_kind().to_string(),
            field_type: meta.field_type,
        }
    }
}

impl From<WireFieldMeta> for FieldMeta {
    fn from(wire: WireFieldMeta) -> Self {
        let kind = if wire.kind == OBJECT_KIND {
            FieldKind::Object
        } else {
            FieldKind::Value
        };
        Self {
            kind,
            field_type: wire.field_type,
        }
    }
}

impl FieldMeta {
    /// A plain value field of the given type.
    #[must_use]
    pub const fn value(field_type: FieldType) -> Self {
        Self {
            kind: FieldKind::Value,
            field_type,
        }
    }

    /// A relational field sent as a remote object reference.
    #[must_use]
    pub const fn object(field_type: FieldType) -> Self {
        Self {
            kind: FieldKind::Object,
            field_type,
        }
    }

    /// Returns the `kind` string that accompanies the field's data on the wire.
    #[must_use]
    pub fn wire_kind(&self) -> &str {
        match self.kind {
            FieldKind::Object => OBJECT_KIND,
            FieldKind::Value => self.field_type.qualified_name(),
        }
    }
}
