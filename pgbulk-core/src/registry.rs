//! Rust type to wire type mapping
//!
//! The default registry covers strings, 32/64-bit integers, booleans,
//! timestamps and doubles, plus `Option<T>` of each as a nullable column.
//! Applications add their own newtypes with [`TypeRegistry::register`].

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;

use crate::wire::WireType;

static DEFAULT_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::default);

/// Wire mapping for one registered Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub wire_type: WireType,
    pub nullable: bool,
}

/// Registry of Rust types that can be mapped onto columns.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<TypeId, TypeMapping>,
}

impl TypeRegistry {
    /// A registry with no mappings at all.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// The process-wide registry holding the built-in mappings.
    pub fn global() -> &'static TypeRegistry {
        &DEFAULT_REGISTRY
    }

    /// Map `T` (and `Option<T>`, as nullable) to `wire_type`.
    pub fn register<T: 'static>(&mut self, wire_type: WireType) -> &mut Self {
        tracing::trace!(rust_type = type_name::<T>(), %wire_type, "registering wire type");
        self.types.insert(
            TypeId::of::<T>(),
            TypeMapping {
                wire_type,
                nullable: false,
            },
        );
        self.types.insert(
            TypeId::of::<Option<T>>(),
            TypeMapping {
                wire_type,
                nullable: true,
            },
        );
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<T: 'static>(mut self, wire_type: WireType) -> Self {
        self.register::<T>(wire_type);
        self
    }

    pub fn lookup<T: 'static>(&self) -> Option<TypeMapping> {
        self.types.get(&TypeId::of::<T>()).copied()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::empty()
            .with::<String>(WireType::Text)
            .with::<&'static str>(WireType::Text)
            .with::<i32>(WireType::Integer)
            .with::<i64>(WireType::BigInt)
            .with::<bool>(WireType::Boolean)
            .with::<NaiveDateTime>(WireType::Timestamp)
            .with::<DateTime<Utc>>(WireType::Timestamp)
            .with::<f64>(WireType::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mappings() {
        let registry = TypeRegistry::global();

        assert_eq!(
            registry.lookup::<String>(),
            Some(TypeMapping {
                wire_type: WireType::Text,
                nullable: false
            })
        );
        assert_eq!(registry.lookup::<i32>().map(|m| m.wire_type), Some(WireType::Integer));
        assert_eq!(registry.lookup::<f64>().map(|m| m.wire_type), Some(WireType::Double));
        assert!(registry.lookup::<Option<bool>>().unwrap().nullable);
    }

    #[test]
    fn unknown_types_are_absent() {
        let registry = TypeRegistry::default();
        assert!(registry.lookup::<u8>().is_none());
        assert!(registry.lookup::<Vec<u8>>().is_none());
        assert!(registry.lookup::<f32>().is_none());
    }

    #[test]
    fn registration_extends_without_touching_defaults() {
        struct Cents(#[allow(dead_code)] i64);

        let mut registry = TypeRegistry::default();
        let before = registry.len();
        registry.register::<Cents>(WireType::BigInt);

        assert_eq!(registry.len(), before + 2);
        assert_eq!(
            registry.lookup::<Option<Cents>>(),
            Some(TypeMapping {
                wire_type: WireType::BigInt,
                nullable: true
            })
        );
        assert!(!TypeRegistry::global().contains::<Cents>());
    }
}
