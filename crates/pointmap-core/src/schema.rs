//! Record schemas: named, typed field descriptors built once per record type.
//!
//! A [`RecordSchema`] is an ordered list of [`FieldDescriptor`]s plus the
//! collection name and an optional primary-key marker. Schemas are built
//! explicitly through [`SchemaBuilder`] at startup and shared immutably by
//! every instance of the record type; inheritance is descriptor-list
//! concatenation with override-by-name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Scalar payload kinds understood by the engine's filter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Keyword,
    Integer,
    Float,
    Bool,
}

/// Distance metric for dense vector fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Array(ScalarKind),
    DenseVector { dim: usize, metric: Distance },
    SparseVector,
}

impl FieldKind {
    pub fn is_vector(&self) -> bool {
        matches!(self, FieldKind::DenseVector { .. } | FieldKind::SparseVector)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub default: Option<Value>,
    pub primary_key: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, nullable: true, default: None, primary_key: false }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Keyword))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Integer))
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Float))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Bool))
    }

    pub fn array(name: impl Into<String>, element: ScalarKind) -> Self {
        Self::new(name, FieldKind::Array(element))
    }

    pub fn dense_vector(name: impl Into<String>, dim: usize, metric: Distance) -> Self {
        Self::new(name, FieldKind::DenseVector { dim, metric })
    }

    pub fn sparse_vector(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::SparseVector)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Immutable schema for one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    collection: String,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<usize>,
}

impl RecordSchema {
    pub fn builder(collection: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder { collection: collection.into(), fields: Vec::new() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|i| &self.fields[i])
    }

    /// The first declared dense vector field, if any. Used as the default
    /// target for recommendation queries.
    pub fn first_dense_vector(&self) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| matches!(f.kind, FieldKind::DenseVector { .. }))
    }

    pub fn vector_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind.is_vector())
    }
}

/// Builder for [`RecordSchema`]; the explicit replacement for field
/// collection via reflection.
pub struct SchemaBuilder {
    collection: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Add a field, replacing any previously added field of the same name.
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        if let Some(slot) = self.fields.iter_mut().find(|f| f.name == descriptor.name) {
            *slot = descriptor;
        } else {
            self.fields.push(descriptor);
        }
        self
    }

    /// Append every parent field not already declared on this builder.
    /// Fields declared before `inherit` therefore override by name.
    pub fn inherit(mut self, parent: &RecordSchema) -> Self {
        for descriptor in parent.fields() {
            if !self.fields.iter().any(|f| f.name == descriptor.name) {
                self.fields.push(descriptor.clone());
            }
        }
        self
    }

    pub fn build(self) -> Result<RecordSchema> {
        let mut primary_key = None;
        for (i, descriptor) in self.fields.iter().enumerate() {
            if descriptor.primary_key {
                if let Some(first) = primary_key {
                    let first: &FieldDescriptor = &self.fields[first];
                    return Err(Error::Schema(format!(
                        "multiple primary keys defined for '{}': '{}' and '{}'",
                        self.collection, first.name, descriptor.name
                    )));
                }
                if descriptor.kind.is_vector() {
                    return Err(Error::Schema(format!(
                        "primary key '{}' of '{}' cannot be a vector field",
                        descriptor.name, self.collection
                    )));
                }
                primary_key = Some(i);
            }
        }
        Ok(RecordSchema { collection: self.collection, fields: self.fields, primary_key })
    }
}
