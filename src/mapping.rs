//! Correspondence between layout elements and model elements.
//!
//! Two maps are kept in sync: the forward map sends each layout id to the
//! single model key it depicts, the inverse map sends each model key to the
//! layout ids depicting it.

use indexmap::{IndexMap, IndexSet};

use crate::element::UniqueId;

/// A model element, or an auxiliary element together with its owner
/// (state variables, units of information, subunits, flux roles...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKey {
    Element(UniqueId),
    Owned { element: UniqueId, owner: UniqueId },
}

impl ModelKey {
    pub fn element(id: impl Into<UniqueId>) -> Self {
        Self::Element(id.into())
    }

    pub fn owned(element: impl Into<UniqueId>, owner: impl Into<UniqueId>) -> Self {
        Self::Owned {
            element: element.into(),
            owner: owner.into(),
        }
    }

    /// Id of the element the key is about.
    pub fn id(&self) -> &UniqueId {
        match self {
            Self::Element(id) => id,
            Self::Owned { element, .. } => element,
        }
    }

    pub fn owner(&self) -> Option<&UniqueId> {
        match self {
            Self::Element(_) => None,
            Self::Owned { owner, .. } => Some(owner),
        }
    }
}

/// Lookup key for [`LayoutModelMappingBuilder::get_mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapElementRef<'a> {
    Layout(&'a UniqueId),
    Model(&'a ModelKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped<'a> {
    Model(&'a ModelKey),
    Layout(Vec<&'a UniqueId>),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Entries {
    forward: IndexMap<UniqueId, ModelKey>,
    inverse: IndexMap<ModelKey, IndexSet<UniqueId>>,
}

impl Entries {
    fn add_mapping(&mut self, key: ModelKey, layout: UniqueId, replace: bool) {
        if replace {
            if let Some(previous) = self.inverse.shift_remove(&key) {
                for layout_id in previous {
                    self.forward.shift_remove(&layout_id);
                }
            }
        }
        if let Some(old_key) = self.forward.insert(layout.clone(), key.clone()) {
            if old_key != key {
                if let Some(layouts) = self.inverse.get_mut(&old_key) {
                    layouts.shift_remove(&layout);
                    if layouts.is_empty() {
                        self.inverse.shift_remove(&old_key);
                    }
                }
            }
        }
        self.inverse.entry(key).or_default().insert(layout);
    }

    fn get_mapping(&self, query: MapElementRef<'_>) -> Option<Mapped<'_>> {
        match query {
            MapElementRef::Layout(id) => self.forward.get(id).map(Mapped::Model),
            MapElementRef::Model(key) => self
                .inverse
                .get(key)
                .map(|layouts| Mapped::Layout(layouts.iter().collect())),
        }
    }

    fn is_subset(&self, other: &Self) -> bool {
        self.forward
            .iter()
            .all(|(layout, key)| other.forward.get(layout) == Some(key))
    }
}

/// Mapping under construction.
#[derive(Debug, Clone, Default)]
pub struct LayoutModelMappingBuilder {
    entries: Entries,
}

impl LayoutModelMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `layout` to `key`. With `replace`, layout ids previously mapped
    /// to `key` are dropped first; otherwise `layout` joins them. A layout
    /// id always maps to one key, so remapping moves it.
    pub fn add_mapping(&mut self, key: ModelKey, layout: UniqueId, replace: bool) {
        self.entries.add_mapping(key, layout, replace);
    }

    pub fn get_mapping(&self, query: MapElementRef<'_>) -> Option<Mapped<'_>> {
        self.entries.get_mapping(query)
    }

    pub fn len(&self) -> usize {
        self.entries.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.forward.is_empty()
    }

    pub fn finalize(self) -> LayoutModelMapping {
        LayoutModelMapping {
            entries: self.entries,
        }
    }
}

/// Finalized, read-only mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutModelMapping {
    entries: Entries,
}

impl LayoutModelMapping {
    pub fn get_mapping(&self, query: MapElementRef<'_>) -> Option<Mapped<'_>> {
        self.entries.get_mapping(query)
    }

    /// Model key depicted by a layout element.
    pub fn model_key(&self, layout: &str) -> Option<&ModelKey> {
        self.entries.forward.get(layout)
    }

    /// Layout ids depicting `key`, in insertion order.
    pub fn layout_ids(&self, key: &ModelKey) -> impl Iterator<Item = &UniqueId> {
        self.entries.inverse.get(key).into_iter().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UniqueId, &ModelKey)> {
        self.entries.forward.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.forward.is_empty()
    }

    /// True iff every entry of `self` is present in `other`.
    pub fn is_submapping(&self, other: &LayoutModelMapping) -> bool {
        self.entries.is_subset(&other.entries)
    }

    pub fn to_builder(&self) -> LayoutModelMappingBuilder {
        LayoutModelMappingBuilder {
            entries: self.entries.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> UniqueId {
        UniqueId::new(value)
    }

    fn layouts<'a>(mapping: &'a LayoutModelMappingBuilder, key: &ModelKey) -> Vec<&'a str> {
        match mapping.get_mapping(MapElementRef::Model(key)) {
            Some(Mapped::Layout(ids)) => ids.into_iter().map(UniqueId::as_str).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_lookup_in_both_directions() {
        let mut mapping = LayoutModelMappingBuilder::new();
        let key = ModelKey::element("m1");
        mapping.add_mapping(key.clone(), id("m1"), false);

        assert_eq!(mapping.get_mapping(MapElementRef::Layout(&id("m1"))), Some(Mapped::Model(&key)));
        assert_eq!(layouts(&mapping, &key), vec!["m1"]);
        assert!(mapping.get_mapping(MapElementRef::Layout(&id("nope"))).is_none());
    }

    #[test]
    fn test_append_versus_replace() {
        let mut mapping = LayoutModelMappingBuilder::new();
        let key = ModelKey::element("m1");
        mapping.add_mapping(key.clone(), id("a"), false);
        mapping.add_mapping(key.clone(), id("b"), false);
        assert_eq!(layouts(&mapping, &key), vec!["a", "b"]);

        mapping.add_mapping(key.clone(), id("c"), true);
        assert_eq!(layouts(&mapping, &key), vec!["c"]);
        assert!(mapping.get_mapping(MapElementRef::Layout(&id("a"))).is_none());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_remapping_moves_layout_between_keys() {
        let mut mapping = LayoutModelMappingBuilder::new();
        let first = ModelKey::element("m1");
        let second = ModelKey::owned("sv1", "m1");
        mapping.add_mapping(first.clone(), id("x"), false);
        mapping.add_mapping(second.clone(), id("x"), false);

        assert!(layouts(&mapping, &first).is_empty());
        assert_eq!(layouts(&mapping, &second), vec!["x"]);
        assert_eq!(second.owner().map(UniqueId::as_str), Some("m1"));
        assert_eq!(second.id().as_str(), "sv1");
    }

    #[test]
    fn test_submapping() {
        let mut small = LayoutModelMappingBuilder::new();
        small.add_mapping(ModelKey::element("m1"), id("m1"), false);
        let mut large = small.clone();
        large.add_mapping(ModelKey::element("c1"), id("c1"), false);
        let (small, large) = (small.finalize(), large.finalize());

        assert!(small.is_submapping(&small));
        assert!(small.is_submapping(&large));
        assert!(!large.is_submapping(&small));
        assert_eq!(large.layout_ids(&ModelKey::element("c1")).count(), 1);
        assert_eq!(large.model_key("m1"), Some(&ModelKey::element("m1")));
    }
}
