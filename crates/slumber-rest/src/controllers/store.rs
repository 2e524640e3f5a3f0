//! Sources of model instances served by the resource views.

use async_trait::async_trait;
use parking_lot::RwLock;
use slumber_core::{FieldValue, ModelInstance, SlumberResult};
use std::sync::Arc;

/// Read access to the instances of one model.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Finds the instance whose primary key renders as `pk`.
    async fn get(&self, pk: &str) -> SlumberResult<Option<Arc<dyn ModelInstance>>>;

    /// Returns every instance whose fields match all `(field, value)` pairs.
    async fn filter(&self, criteria: &[(String, String)]) -> SlumberResult<Vec<Arc<dyn ModelInstance>>>;
}

/// In-memory [`ModelStore`] over a list of instances.
#[derive(Default)]
pub struct InMemoryModelStore {
    instances: RwLock<Vec<Arc<dyn ModelInstance>>>,
}

impl InMemoryModelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance.
    pub fn insert(&self, instance: Arc<dyn ModelInstance>) {
        self.instances.write().push(instance);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(self, instance: impl ModelInstance + 'static) -> Self {
        self.insert(Arc::new(instance));
        self
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn get(&self, pk: &str) -> SlumberResult<Option<Arc<dyn ModelInstance>>> {
        Ok(self
            .instances
            .read()
            .iter()
            .find(|instance| instance.pk().to_text() == pk)
            .cloned())
    }

    async fn filter(&self, criteria: &[(String, String)]) -> SlumberResult<Vec<Arc<dyn ModelInstance>>> {
        Ok(self
            .instances
            .read()
            .iter()
            .filter(|instance| {
                criteria.iter().all(|(field, expected)| {
                    instance
                        .field(field)
                        .is_some_and(|value| value_matches(&value, expected))
                })
            })
            .cloned()
            .collect())
    }
}

/// Compares a field value against its query string form.
fn value_matches(value: &FieldValue, expected: &str) -> bool {
    match value {
        FieldValue::Bool(b) => match expected.to_ascii_lowercase().as_str() {
            "true" | "1" => *b,
            "false" | "0" => !*b,
            _ => false,
        },
        FieldValue::Object(related) => related.pk().to_text() == expected,
        other => other.to_text() == expected,
    }
}
