//! A map: model, layout and the mapping joining them, plus the
//! annotations and notes read alongside.

use crate::{
    annotation::{Annotations, Notes},
    element::UniqueId,
    layout::{Layout, LayoutBuilder, LayoutElement},
    mapping::{LayoutModelMapping, LayoutModelMappingBuilder, ModelKey},
    model::{Dialect, Model, ModelBuilder},
};

/// Map under construction. Every part is optional so that readers can
/// materialize only what was asked for.
#[derive(Debug, Clone)]
pub struct MapBuilder {
    pub id: UniqueId,
    pub dialect: Dialect,
    pub model: Option<ModelBuilder>,
    pub layout: Option<LayoutBuilder>,
    pub mapping: Option<LayoutModelMappingBuilder>,
    pub annotations: Annotations,
    pub notes: Notes,
}

impl MapBuilder {
    pub fn new(id: UniqueId, dialect: Dialect) -> Self {
        Self {
            id,
            dialect,
            model: None,
            layout: None,
            mapping: None,
            annotations: Annotations::new(),
            notes: Notes::new(),
        }
    }

    /// A builder with empty model, layout and mapping.
    pub fn complete(id: UniqueId, dialect: Dialect) -> Self {
        Self {
            model: Some(ModelBuilder::new(dialect)),
            layout: Some(LayoutBuilder::new()),
            mapping: Some(LayoutModelMappingBuilder::new()),
            ..Self::new(id, dialect)
        }
    }

    pub fn finalize(self) -> Map {
        Map {
            id: self.id,
            dialect: self.dialect,
            model: self.model.map(ModelBuilder::finalize),
            layout: self.layout.map(LayoutBuilder::finalize),
            mapping: self.mapping.map(LayoutModelMappingBuilder::finalize),
            annotations: self.annotations,
            notes: self.notes,
        }
    }
}

/// Finalized map. Its model and layout collections refuse insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    id: UniqueId,
    dialect: Dialect,
    model: Option<Model>,
    layout: Option<Layout>,
    mapping: Option<LayoutModelMapping>,
    annotations: Annotations,
    notes: Notes,
}

impl Map {
    pub fn id(&self) -> &UniqueId {
        &self.id
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn mapping(&self) -> Option<&LayoutModelMapping> {
        self.mapping.as_ref()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    /// Model key depicted by a layout element.
    pub fn model_key_of(&self, layout_id: &str) -> Option<&ModelKey> {
        self.mapping.as_ref()?.model_key(layout_id)
    }

    /// Layout elements depicting `key`.
    pub fn layouts_for(&self, key: &ModelKey) -> Vec<&LayoutElement> {
        let (Some(mapping), Some(layout)) = (&self.mapping, &self.layout) else {
            return Vec::new();
        };
        mapping
            .layout_ids(key)
            .filter_map(|id| layout.find(id.as_str()))
            .collect()
    }

    /// True iff the model, layout and mapping of `self` are each contained
    /// in those of `other`. A part missing from `self` is contained in
    /// anything; a part present only in `self` is not.
    pub fn is_submap(&self, other: &Map) -> bool {
        fn part<T>(mine: &Option<T>, theirs: &Option<T>, subset: impl Fn(&T, &T) -> bool) -> bool {
            match (mine, theirs) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(mine), Some(theirs)) => subset(mine, theirs),
            }
        }
        self.dialect == other.dialect
            && part(&self.model, &other.model, Model::is_submodel)
            && part(&self.layout, &other.layout, Layout::is_sublayout)
            && part(&self.mapping, &other.mapping, LayoutModelMapping::is_submapping)
    }

    /// Editable deep copy of this map.
    pub fn to_builder(&self) -> MapBuilder {
        MapBuilder {
            id: self.id.clone(),
            dialect: self.dialect,
            model: self.model.as_ref().map(Model::to_builder),
            layout: self.layout.as_ref().map(Layout::to_builder),
            mapping: self.mapping.as_ref().map(LayoutModelMapping::to_builder),
            annotations: self.annotations.clone(),
            notes: self.notes.clone(),
        }
    }
}
