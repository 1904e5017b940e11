//! Collection binding: which physical collection a document type lives in.
//!
//! A name is resolved in this order:
//!
//! 1. a name passed explicitly when the repository is created;
//! 2. a name registered for the type in the [`CollectionRegistry`];
//! 3. the type's own naming metadata (`#[document(collection = "...")]`);
//! 4. the name its registered base type resolves to, when the type inherits one;
//! 5. the type's own name.

use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
};

use log::debug;

use crate::document::Document;

#[derive(Debug, Clone)]
enum Binding {
    Named(String),
    Inherit {
        base: TypeId,
        base_metadata: fn() -> Option<&'static str>,
    },
}

/// Document type to collection name map, built once at startup.
///
/// ```ignore
/// let registry = CollectionRegistry::new()
///     .register::<AuditEntry>("audit_log")
///     .inherit::<ArchivedRestaurant, Restaurant>();
/// let store = DocumentStore::with_registry(backend, registry);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    bindings: HashMap<TypeId, Binding>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `D` to `collection`, overriding its naming metadata.
    pub fn register<D: Document>(mut self, collection: impl Into<String>) -> Self {
        self.bindings
            .insert(TypeId::of::<D>(), Binding::Named(collection.into()));
        self
    }

    /// Makes `Derived` share the collection of `Base` unless `Derived` declares its own.
    pub fn inherit<Derived: Document, Base: Document>(mut self) -> Self {
        self.bindings.insert(
            TypeId::of::<Derived>(),
            Binding::Inherit {
                base: TypeId::of::<Base>(),
                base_metadata: Base::collection_name,
            },
        );
        self
    }

    /// Resolves the collection name for `D`.
    pub fn resolve<D: Document>(&self, explicit: Option<&str>) -> String {
        let name = explicit
            .map(str::to_string)
            .or_else(|| self.named(TypeId::of::<D>()))
            .or_else(|| D::collection_name().map(str::to_string))
            .or_else(|| self.inherited(TypeId::of::<D>()))
            .unwrap_or_else(|| D::type_name().to_string());

        debug!("{} bound to collection {:?}", D::type_name(), name);
        name
    }

    fn named(&self, ty: TypeId) -> Option<String> {
        match self.bindings.get(&ty) {
            Some(Binding::Named(name)) => Some(name.clone()),
            _ => None,
        }
    }

    fn inherited(&self, ty: TypeId) -> Option<String> {
        let mut visited = HashSet::from([ty]);
        let mut current = ty;

        while let Some(Binding::Inherit { base, base_metadata }) = self.bindings.get(&current) {
            if !visited.insert(*base) {
                return None;
            }

            if let Some(name) = self.named(*base).or_else(|| base_metadata().map(str::to_string)) {
                return Some(name);
            }
            current = *base;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use bson::DateTime;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::schema::{Schema, Shape};

    macro_rules! doc_type {
        ($name:ident, $collection:expr) => {
            #[derive(Debug, Clone, Serialize, Deserialize)]
            struct $name {
                id: Option<String>,
            }

            impl Shape for $name {
                fn schema() -> Schema {
                    Schema::object(Vec::new())
                }
            }

            impl Document for $name {
                type Key = String;

                fn id(&self) -> Option<&String> {
                    self.id.as_ref()
                }

                fn set_id(&mut self, id: String) {
                    self.id = Some(id);
                }

                fn modified_on(&self) -> Option<DateTime> {
                    None
                }

                fn set_modified_on(&mut self, _at: DateTime) {}

                fn collection_name() -> Option<&'static str> {
                    $collection
                }
            }
        };
    }

    doc_type!(Restaurant, Some("restaurants"));
    doc_type!(Diner, None);
    doc_type!(Bistro, Some("bistros"));
    doc_type!(Kiosk, None);
    doc_type!(Stall, None);

    #[test]
    fn explicit_name_wins() {
        let registry = CollectionRegistry::new().register::<Restaurant>("places");

        assert_eq!(registry.resolve::<Restaurant>(Some("override")), "override");
        assert_eq!(registry.resolve::<Restaurant>(None), "places");
    }

    #[test]
    fn metadata_then_type_name() {
        let registry = CollectionRegistry::new();

        assert_eq!(registry.resolve::<Restaurant>(None), "restaurants");
        assert_eq!(registry.resolve::<Diner>(None), "Diner");
    }

    #[test]
    fn inheritance_is_transitive_and_overridable() {
        let registry = CollectionRegistry::new()
            .inherit::<Diner, Restaurant>()
            .inherit::<Bistro, Restaurant>()
            .inherit::<Kiosk, Diner>();

        assert_eq!(registry.resolve::<Diner>(None), "restaurants");
        assert_eq!(registry.resolve::<Kiosk>(None), "restaurants");
        assert_eq!(registry.resolve::<Bistro>(None), "bistros");
    }

    #[test]
    fn inheritance_cycles_fall_back_to_type_name() {
        let registry = CollectionRegistry::new()
            .inherit::<Kiosk, Stall>()
            .inherit::<Stall, Kiosk>();

        assert_eq!(registry.resolve::<Kiosk>(None), "Kiosk");
    }
}
