//! Static schema descriptors: the field reflector.
//!
//! Each record type registers its mapped fields once through a
//! [`SchemaBuilder`]. The resulting [`Schema`] is a table of
//! `(property name, accessor, kind)` entries used to turn records into
//! property maps and back, without per-call type introspection.
//!
//! Embedded groups are flattened into the parent with no name prefixing.
//! Property names must be unique across the flattened set; a collision is
//! reported when the schema is built rather than silently overwriting.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::SchemaError;
use crate::label::type_name_of;
use crate::types::{Embedded, Vertex, CREATED_AT, EXCLUDED, ID, LAST_MODIFIED};
use crate::value::{FieldKind, Property, PropertyMap, Value};

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, &Value) -> bool + Send + Sync>;

/// One mapped field of a record type.
pub struct FieldDescriptor<T> {
    name: String,
    kind: FieldKind,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Read the field's current value.
    pub fn read(&self, record: &T) -> Value {
        (self.get)(record)
    }

    /// Convert `value` into the field type and assign it.
    ///
    /// Returns `false` and leaves the field untouched when the value is not
    /// convertible.
    pub fn write(&self, record: &mut T, value: &Value) -> bool {
        (self.set)(record, value)
    }
}

// ── Builder ──────────────────────────────────────────────────────

/// Registers the mapped fields of a record type.
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
    duplicates: Vec<String>,
}

impl<T> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a field under the property `name`.
    ///
    /// An empty name or `"-"` excludes the field.
    pub fn field<F: Property>(
        mut self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        if name.is_empty() || name == EXCLUDED {
            return self;
        }
        self.push(FieldDescriptor {
            name: name.to_string(),
            kind: F::KIND,
            get: Arc::new(move |record: &T| get(record).to_value()),
            set: Arc::new(move |record: &mut T, value: &Value| match F::from_value(value) {
                Some(converted) => {
                    *get_mut(record) = converted;
                    true
                }
                None => false,
            }),
        });
        self
    }

    /// Flatten the fields of an embedded group into this schema.
    pub fn embed<E: Embedded>(mut self, get: fn(&T) -> &E, get_mut: fn(&mut T) -> &mut E) -> Self {
        let inner = E::describe(SchemaBuilder::new());
        self.duplicates.extend(inner.duplicates);
        for field in inner.fields {
            let inner_get = field.get;
            let inner_set = field.set;
            self.push(FieldDescriptor {
                name: field.name,
                kind: field.kind,
                get: Arc::new(move |record: &T| inner_get(get(record))),
                set: Arc::new(move |record: &mut T, value: &Value| {
                    inner_set(get_mut(record), value)
                }),
            });
        }
        self
    }

    fn push(&mut self, field: FieldDescriptor<T>) {
        if self.fields.iter().any(|f| f.name == field.name) {
            self.duplicates.push(field.name.clone());
        }
        self.fields.push(field);
    }

    /// Finish registration, rejecting duplicate property names.
    pub fn build(self) -> Result<Schema<T>, SchemaError> {
        let type_name = type_name_of::<T>();
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(SchemaError::DuplicateProperty {
                type_name: type_name.to_string(),
                name,
            });
        }
        Ok(Schema {
            type_name,
            fields: self.fields,
        })
    }
}

// ── Schema ───────────────────────────────────────────────────────

/// The registered field table of a record type.
pub struct Schema<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl<T> Schema<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All mapped property names, in registration order.
    pub fn property_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Flatten a record into its property map. Values are stored verbatim.
    pub fn to_property_map(&self, record: &T) -> PropertyMap {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.read(record)))
            .collect()
    }

    /// Populate a record from a property map.
    ///
    /// Missing properties and unconvertible values leave the field as is.
    pub fn from_property_map(&self, map: &PropertyMap, record: &mut T) {
        for field in &self.fields {
            if let Some(value) = map.get(&field.name) {
                if !field.write(record, value) {
                    tracing::trace!(
                        field = %field.name,
                        found = value.type_name(),
                        "Skipping unconvertible property"
                    );
                }
            }
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────

type RegistryEntry = &'static (dyn Any + Send + Sync);

static REGISTRY: OnceLock<RwLock<HashMap<TypeId, RegistryEntry>>> = OnceLock::new();

/// The schema of a vertex type, built on first use and cached for the
/// lifetime of the process.
///
/// Fails if the type's registration has duplicate property names or does
/// not embed the vertex base.
pub fn schema_of<T: Vertex>() -> Result<&'static Schema<T>, SchemaError> {
    let registry = REGISTRY.get_or_init(Default::default);
    let key = TypeId::of::<T>();

    let cached = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .copied();

    let entry = match cached {
        Some(entry) => entry,
        // Built under the write lock so each type is leaked at most once.
        None => *registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| {
                let built: Box<Result<Schema<T>, SchemaError>> = Box::new(build_vertex_schema::<T>());
                let leaked: RegistryEntry = Box::leak(built);
                leaked
            }),
    };

    match entry.downcast_ref::<Result<Schema<T>, SchemaError>>() {
        Some(Ok(schema)) => Ok(schema),
        Some(Err(e)) => Err(e.clone()),
        None => Err(SchemaError::Unregistered {
            type_name: type_name_of::<T>().to_string(),
        }),
    }
}

fn build_vertex_schema<T: Vertex>() -> Result<Schema<T>, SchemaError> {
    let schema = T::describe(SchemaBuilder::new()).build()?;
    for required in [ID, LAST_MODIFIED, CREATED_AT] {
        if schema.field(required).is_none() {
            return Err(SchemaError::MissingBase {
                type_name: schema.type_name.to_string(),
                missing: required.to_string(),
            });
        }
    }
    tracing::debug!(
        type_name = schema.type_name,
        fields = schema.fields.len(),
        "Registered vertex schema"
    );
    Ok(schema)
}
