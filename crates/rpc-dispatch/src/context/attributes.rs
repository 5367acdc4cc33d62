//! Immutable, insertion-ordered attribute bag shared by request and response
//! contexts.
//!
//! Every write returns a new bag. Values are reference counted, so deriving a
//! context copies only the key table, never the values themselves.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Typed name for an attribute.
///
/// The type parameter fixes what a key stores, so lookups downcast without
/// caller-side casting. Two keys with the same name address the same slot.
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    /// Declares a key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Name of the attribute slot.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttributeKey").field(&self.name).finish()
    }
}

/// Insertion-ordered attribute storage.
#[derive(Clone, Default)]
pub struct Attributes {
    entries: Arc<Vec<(&'static str, Value)>>,
}

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new bag with `value` stored under `key`.
    ///
    /// An existing entry for the key is replaced in place and keeps its
    /// original position; new keys are appended.
    #[must_use]
    pub fn with<T>(&self, key: AttributeKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.with_value(key.name, Arc::new(value))
    }

    /// Returns a new bag with every entry of `other` merged over this one.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        other
            .entries
            .iter()
            .fold(self.clone(), |merged, (name, value)| {
                merged.with_value(*name, Arc::clone(value))
            })
    }

    fn with_value(&self, name: &'static str, value: Value) -> Self {
        let mut entries: Vec<(&'static str, Value)> = self.entries.as_ref().clone();
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => entries.push((name, value)),
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Looks up the value stored under `key`.
    ///
    /// Returns `None` when the key is absent or holds a value of another type.
    #[must_use]
    pub fn get<T>(&self, key: AttributeKey<T>) -> Option<&T>
    where
        T: 'static,
    {
        self.entries
            .iter()
            .find(|(name, _)| *name == key.name)
            .and_then(|(_, value)| value.downcast_ref::<T>())
    }

    /// Whether an entry exists for `name`, regardless of its type.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| *existing == name)
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Number of stored attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
