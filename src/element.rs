//! Identity and container primitives shared by the model and layout graphs.

use std::{borrow::Borrow, collections::BTreeMap, fmt};

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Document-scoped, stable identifier of a map element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identifier for elements the document did not name.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniqueId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UniqueId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for UniqueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UniqueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub trait MapElement {
    fn id(&self) -> &UniqueId;
}

/// Read-only state that reaches into the collections an element owns.
///
/// Elements without nested collections keep the default no-ops.
pub trait Freeze {
    fn freeze(&mut self) {}

    fn thaw(&mut self) {}
}

/// Id-ordered set of elements.
///
/// Inserting an element whose id is already present replaces the old one.
/// Once frozen, every insertion fails with [`Error::ImmutableElement`].
#[derive(Debug, Clone)]
pub struct ElementSet<T> {
    elements: BTreeMap<UniqueId, T>,
    frozen: bool,
}

// Equality is about content; a frozen set equals its unfrozen copy.
impl<T: PartialEq> PartialEq for ElementSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T> Default for ElementSet<T> {
    fn default() -> Self {
        Self {
            elements: BTreeMap::new(),
            frozen: false,
        }
    }
}

impl<T: MapElement> ElementSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `element`, returning the element it replaced, if any.
    pub fn add_element(&mut self, element: T) -> Result<Option<T>> {
        if self.frozen {
            return Err(Error::ImmutableElement {
                id: element.id().clone(),
            });
        }
        Ok(self.elements.insert(element.id().clone(), element))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.elements.get(id)
    }

    /// Remove and return the element with `id`.
    pub fn remove(&mut self, id: &str) -> Result<Option<T>> {
        if self.frozen {
            return Err(Error::ImmutableElement { id: UniqueId::new(id) });
        }
        Ok(self.elements.remove(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<Option<&mut T>> {
        if self.frozen {
            return Err(Error::ImmutableElement { id: UniqueId::new(id) });
        }
        Ok(self.elements.get_mut(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &UniqueId> {
        self.elements.keys()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// An unfrozen copy with the same elements, nested collections
    /// included.
    pub fn thawed(&self) -> Self
    where
        T: Clone + Freeze,
    {
        let mut copy = self.clone();
        copy.thaw();
        copy
    }
}

impl<T: Freeze> Freeze for ElementSet<T> {
    fn freeze(&mut self) {
        self.frozen = true;
        self.elements.values_mut().for_each(Freeze::freeze);
    }

    fn thaw(&mut self) {
        self.frozen = false;
        self.elements.values_mut().for_each(Freeze::thaw);
    }
}

impl<T: MapElement + PartialEq> ElementSet<T> {
    /// True iff every element of `self` is present, unchanged, in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.elements
            .iter()
            .all(|(id, element)| other.elements.get(id) == Some(element))
    }
}

impl<T: MapElement> FromIterator<T> for ElementSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let elements = iter
            .into_iter()
            .map(|element| (element.id().clone(), element))
            .collect();
        Self {
            elements,
            frozen: false,
        }
    }
}

/// Insertion-ordered counterpart of [`ElementSet`], used where document
/// order matters (layout children are drawn and written in this order).
#[derive(Debug, Clone)]
pub struct ElementList<T> {
    elements: IndexMap<UniqueId, T>,
    frozen: bool,
}

impl<T: PartialEq> PartialEq for ElementList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<T> Default for ElementList<T> {
    fn default() -> Self {
        Self {
            elements: IndexMap::new(),
            frozen: false,
        }
    }
}

impl<T: MapElement> ElementList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `element`; an element with the same id is replaced in place.
    pub fn add_element(&mut self, element: T) -> Result<Option<T>> {
        if self.frozen {
            return Err(Error::ImmutableElement {
                id: element.id().clone(),
            });
        }
        Ok(self.elements.insert(element.id().clone(), element))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Result<Option<&mut T>> {
        if self.frozen {
            return Err(Error::ImmutableElement { id: UniqueId::new(id) });
        }
        Ok(self.elements.get_mut(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn thawed(&self) -> Self
    where
        T: Clone + Freeze,
    {
        let mut copy = self.clone();
        copy.thaw();
        copy
    }
}

impl<T: Freeze> Freeze for ElementList<T> {
    fn freeze(&mut self) {
        self.frozen = true;
        self.elements.values_mut().for_each(Freeze::freeze);
    }

    fn thaw(&mut self) {
        self.frozen = false;
        self.elements.values_mut().for_each(Freeze::thaw);
    }
}

impl<T: MapElement + PartialEq> ElementList<T> {
    /// Order is ignored: only membership and equality of elements count.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.elements
            .iter()
            .all(|(id, element)| other.elements.get(id) == Some(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: UniqueId,
        value: u32,
    }

    impl MapElement for Item {
        fn id(&self) -> &UniqueId {
            &self.id
        }
    }

    impl Freeze for Item {}

    #[derive(Debug, Clone, PartialEq)]
    struct Group {
        id: UniqueId,
        items: ElementList<Item>,
    }

    impl MapElement for Group {
        fn id(&self) -> &UniqueId {
            &self.id
        }
    }

    impl Freeze for Group {
        fn freeze(&mut self) {
            self.items.freeze();
        }

        fn thaw(&mut self) {
            self.items.thaw();
        }
    }

    fn item(id: &str, value: u32) -> Item {
        Item {
            id: UniqueId::new(id),
            value,
        }
    }

    #[test]
    fn test_set_is_id_ordered_and_replaces_by_id() {
        let mut set = ElementSet::new();
        set.add_element(item("b", 1)).unwrap();
        set.add_element(item("a", 2)).unwrap();
        let replaced = set.add_element(item("b", 3)).unwrap();

        assert_eq!(replaced, Some(item("b", 1)));
        let ids: Vec<_> = set.ids().map(UniqueId::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.get("b").map(|item| item.value), Some(3));
    }

    #[test]
    fn test_list_keeps_insertion_order_on_replace() {
        let mut list = ElementList::new();
        list.add_element(item("z", 1)).unwrap();
        list.add_element(item("a", 1)).unwrap();
        list.add_element(item("z", 2)).unwrap();

        let values: Vec<_> = list.iter().map(|item| (item.id.as_str(), item.value)).collect();
        assert_eq!(values, vec![("z", 2), ("a", 1)]);
    }

    #[test]
    fn test_frozen_set_rejects_insertion_even_when_cloned() {
        let mut set: ElementSet<Item> = [item("a", 1)].into_iter().collect();
        set.freeze();
        let mut copy = set.clone();

        let err = copy.add_element(item("b", 1)).unwrap_err();
        assert!(matches!(err, Error::ImmutableElement { id } if id.as_str() == "b"));
        assert!(copy.get_mut("a").is_err());

        let mut thawed = set.thawed();
        assert!(thawed.add_element(item("b", 1)).is_ok());
    }

    #[test]
    fn test_freezing_reaches_nested_collections() {
        let mut items = ElementList::new();
        items.add_element(item("a", 1)).unwrap();
        let group = Group {
            id: UniqueId::new("g"),
            items,
        };
        let mut set: ElementSet<Group> = [group].into_iter().collect();
        set.freeze();

        let mut nested = set.get("g").unwrap().items.clone();
        assert!(nested.is_frozen());
        assert!(matches!(
            nested.add_element(item("b", 2)),
            Err(Error::ImmutableElement { id }) if id.as_str() == "b"
        ));

        let thawed = set.thawed();
        let mut nested = thawed.get("g").unwrap().items.clone();
        assert!(!nested.is_frozen());
        assert!(nested.add_element(item("b", 2)).unwrap().is_none());
    }

    #[test]
    fn test_subset_compares_elements() {
        let small: ElementSet<Item> = [item("a", 1)].into_iter().collect();
        let large: ElementSet<Item> = [item("a", 1), item("b", 2)].into_iter().collect();
        let changed: ElementSet<Item> = [item("a", 5), item("b", 2)].into_iter().collect();

        assert!(small.is_subset(&large));
        assert!(!large.is_subset(&small));
        assert!(!small.is_subset(&changed));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(UniqueId::generate(), UniqueId::generate());
    }
}
