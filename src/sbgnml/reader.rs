//! SBGN-ML documents into maps.
//!
//! Reading happens in two passes. [`SbgnmlIndex`] first records every id,
//! port and arc of the `<map>`; the construction pass then builds model
//! elements and layout nodes in dependency order, so that every reference
//! points at something already built.

use std::{collections::HashSet, fs, path::Path};

use log::{debug, trace};
use roxmltree::{Document, Node};

use super::{
    class::{self, ArcClass, GlyphClass, SubglyphClass},
    detect_version, heuristics,
    index::{IdIndex, IndexedArc, SbgnmlIndex},
    style::{self, RenderInformation},
    SbgnmlVersion,
};
use crate::{
    annotation::{self, Annotations, Notes},
    element::{ElementSet, MapElement, UniqueId},
    error::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result},
    geometry::{segments_from_points, BBox, Point},
    layout::{
        ArcKind, ArcLayout, Connectors, Layout, LayoutBuilder, LayoutElement, NodeKind, NodeLayout, Orientation,
        TextLayout,
    },
    map::{Map, MapBuilder},
    mapping::{LayoutModelMappingBuilder, ModelKey},
    model::{
        Activity, ActivityKind, Compartment, Dialect, EntityPool, EntityPoolKind, FluxRole, LogicalOperator, Model,
        ModelBuilder, ModelElement, Modulation, OperatorInput, OperatorKind, Process, ProcessKind, Reference,
        StateVariable, Submap, Subunit, Tag, Terminal, UnitOfInformation,
    },
    options::{ReadOptions, ReturnType},
    xml,
};

/// What a read produced, per [`ReadOptions::return_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReadObject {
    Map(Map),
    Model(Model),
    Layout(Layout),
}

impl ReadObject {
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The model, whether read alone or as part of a map.
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Map(map) => map.model(),
            Self::Model(model) => Some(model),
            Self::Layout(_) => None,
        }
    }

    pub fn as_layout(&self) -> Option<&Layout> {
        match self {
            Self::Map(map) => map.layout(),
            Self::Layout(layout) => Some(layout),
            Self::Model(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct ReadResult {
    pub object: ReadObject,
    pub annotations: Annotations,
    pub notes: Notes,
    /// Every id of the document with what it named there.
    pub id_index: IdIndex,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbgnmlReader {
    version: SbgnmlVersion,
}

impl SbgnmlReader {
    pub fn new(version: SbgnmlVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> SbgnmlVersion {
        self.version
    }

    pub fn check_file(&self, path: &Path) -> bool {
        self.version.check_file(path)
    }

    pub fn read(&self, path: &Path, options: &ReadOptions) -> Result<ReadResult> {
        debug!(path = path.display().to_string(), format = self.version.format_name(); "Reading SBGN-ML file");
        let text = fs::read_to_string(path)?;
        self.read_str(&text, options)
    }

    /// Read a document held in memory. The version declared by the document
    /// wins over the reader's own.
    pub fn read_str(&self, text: &str, options: &ReadOptions) -> Result<ReadResult> {
        let document = Document::parse(text)?;
        let root = document.root_element();
        if !root.has_tag_name("sbgn") {
            return Err(Error::malformed(format!(
                "root element is <{}>, expected <sbgn>",
                root.tag_name().name()
            )));
        }
        let version = detect_version(&root)?;
        if version != self.version {
            debug!(
                declared = version.format_name(),
                reader = self.version.format_name();
                "Document version differs from reader version"
            );
        }
        let map = xml::child(&root, "map").ok_or_else(|| Error::malformed("document has no <map>"))?;
        let dialect = version.dialect_of(&map)?;

        let mut diagnostics = Diagnostics::default();
        let index = SbgnmlIndex::build(&map, dialect, &mut diagnostics)?;
        ReadingContext::new(&index, dialect, options, diagnostics, &map).read(&map)
    }
}

/// Sub-glyphs of a glyph that are not built in place.
#[derive(Default)]
struct Auxiliary<'a, 'input> {
    state_variables: ElementSet<StateVariable>,
    units_of_information: ElementSet<UnitOfInformation>,
    subunits: ElementSet<Subunit>,
    terminals: Vec<Node<'a, 'input>>,
}

fn entity_auxiliary(class: SubglyphClass) -> bool {
    matches!(
        class,
        SubglyphClass::StateVariable | SubglyphClass::UnitOfInformation(_) | SubglyphClass::Subunit(_)
    )
}

fn compartment_auxiliary(class: SubglyphClass) -> bool {
    matches!(class, SubglyphClass::StateVariable | SubglyphClass::UnitOfInformation(_))
}

fn activity_auxiliary(class: SubglyphClass) -> bool {
    matches!(class, SubglyphClass::UnitOfInformation(_))
}

fn submap_auxiliary(class: SubglyphClass) -> bool {
    matches!(class, SubglyphClass::Terminal)
}

fn parse_orientation(value: &str) -> Option<Orientation> {
    match value {
        "left" => Some(Orientation::Left),
        "right" => Some(Orientation::Right),
        "up" => Some(Orientation::Up),
        "down" => Some(Orientation::Down),
        _ => None,
    }
}

fn arc_endpoint(arc: &Node, tag: &str) -> Result<Point> {
    let endpoint = xml::child(arc, tag).ok_or_else(|| {
        Error::malformed(format!(
            "arc `{}` has no <{tag}>",
            arc.attribute("id").unwrap_or_default()
        ))
    })?;
    xml::parse_point(&endpoint)
}

/// Start, intermediate and end points of an arc.
fn arc_points(arc: &Node) -> Result<Vec<Point>> {
    let mut points = vec![arc_endpoint(arc, "start")?];
    for next in xml::children(arc, "next") {
        points.push(xml::parse_point(&next)?);
    }
    points.push(arc_endpoint(arc, "end")?);
    Ok(points)
}

fn read_ports(glyph: &Node) -> Result<Vec<Point>> {
    xml::children(glyph, "port").map(|port| xml::parse_point(&port)).collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}

struct ReadingContext<'i, 'a, 'input> {
    index: &'i SbgnmlIndex<'a, 'input>,
    dialect: Dialect,
    options: &'i ReadOptions,
    render: Option<RenderInformation>,
    model: Option<ModelBuilder>,
    layout: Option<LayoutBuilder>,
    mapping: Option<LayoutModelMappingBuilder>,
    annotations: Annotations,
    notes: Notes,
    diagnostics: Diagnostics,
    /// Ids of top-level elements built so far.
    built: HashSet<String>,
    under_construction: HashSet<String>,
}

impl<'i, 'a, 'input> ReadingContext<'i, 'a, 'input> {
    fn new(
        index: &'i SbgnmlIndex<'a, 'input>,
        dialect: Dialect,
        options: &'i ReadOptions,
        diagnostics: Diagnostics,
        map: &Node,
    ) -> Self {
        let model = options.builds_model().then(|| ModelBuilder::new(dialect));
        let layout = options.builds_layout().then(LayoutBuilder::new);
        let mapping = (model.is_some() && layout.is_some()).then(LayoutModelMappingBuilder::new);
        let render = if options.with_styles {
            style::read_render_information(map)
        } else {
            None
        };
        Self {
            index,
            dialect,
            options,
            render,
            model,
            layout,
            mapping,
            annotations: Annotations::new(),
            notes: Notes::new(),
            diagnostics,
            built: HashSet::new(),
            under_construction: HashSet::new(),
        }
    }

    fn read(mut self, map: &Node<'a, 'input>) -> Result<ReadResult> {
        let map_id = map.attribute("id").map_or_else(UniqueId::generate, UniqueId::new);
        self.annotate(&map_id, map);

        let index = self.index;
        for glyph in &index.compartments {
            self.build_compartment(glyph)?;
        }
        for (glyph, kind) in &index.entity_pools {
            self.build_entity_pool(glyph, *kind)?;
        }
        for (glyph, kind) in &index.activities {
            self.build_activity(glyph, *kind)?;
        }
        for (glyph, kind) in &index.logical_operators {
            self.build_operator(glyph, *kind)?;
        }
        for glyph in &index.submaps {
            self.build_submap(glyph)?;
        }
        for glyph in &index.phenotypes {
            self.build_phenotype(glyph)?;
        }
        for glyph in &index.tags {
            self.build_tag(glyph)?;
        }
        for (glyph, kind) in &index.processes {
            self.build_process(glyph, *kind)?;
        }
        for arc in &index.modulations {
            self.build_modulation(arc)?;
        }
        debug!(
            elements = self.built.len(),
            annotated = self.annotations.len(),
            dialect:? = self.dialect;
            "Built SBGN-ML map"
        );
        self.finish(map_id, map)
    }

    fn finish(self, map_id: UniqueId, map: &Node) -> Result<ReadResult> {
        let Self {
            index,
            dialect,
            options,
            render,
            model,
            mut layout,
            mapping,
            annotations,
            notes,
            diagnostics,
            ..
        } = self;

        if let Some(layout) = &mut layout {
            match xml::parse_bbox(map)? {
                Some(bbox) => layout.set_bbox(bbox),
                None => layout.fit(options.xsep, options.ysep),
            }
            if let Some(background) = render.as_ref().and_then(|render| render.background) {
                layout.style.fill = Some(background);
            }
        }

        let object = match options.return_type {
            ReturnType::Map => {
                let mut builder = MapBuilder::new(map_id, dialect);
                builder.model = model;
                builder.layout = layout;
                builder.mapping = mapping;
                builder.annotations = annotations.clone();
                builder.notes = notes.clone();
                ReadObject::Map(builder.finalize())
            }
            ReturnType::Model => ReadObject::Model(model.unwrap_or_else(|| ModelBuilder::new(dialect)).finalize()),
            ReturnType::Layout => ReadObject::Layout(layout.unwrap_or_default().finalize()),
        };
        Ok(ReadResult {
            object,
            annotations,
            notes,
            id_index: index.id_index(),
            diagnostics: diagnostics.into_vec(),
        })
    }

    fn element_id(&mut self, node: &Node) -> UniqueId {
        if let Some(id) = node.attribute("id") {
            return UniqueId::new(id);
        }
        let id = UniqueId::generate();
        self.diagnostics.record(
            DiagnosticKind::MissingAttribute,
            Some(id.as_str()),
            format!("<{}> without an id", node.tag_name().name()),
        );
        id
    }

    /// Record annotations and notes of `node` under `id`. Only maps with a
    /// model carry them.
    fn annotate(&mut self, id: &UniqueId, node: &Node) {
        if self.model.is_none() {
            return;
        }
        if self.options.with_annotations {
            let annotations = annotation::read_annotations(node);
            if !annotations.is_empty() {
                self.annotations.entry(id.clone()).or_default().extend(annotations);
            }
        }
        if self.options.with_notes {
            if let Some(notes) = annotation::read_notes(node) {
                self.notes.insert(id.clone(), notes);
            }
        }
    }

    fn map_to(&mut self, key: ModelKey, layout_id: UniqueId) {
        if let Some(mapping) = &mut self.mapping {
            mapping.add_mapping(key, layout_id, false);
        }
    }

    fn require(&self, element: &UniqueId, reference: &str) -> Result<()> {
        if self.built.contains(reference) {
            Ok(())
        } else {
            Err(Error::unresolved(element.as_str(), reference))
        }
    }

    fn insert(&mut self, element: ModelElement, layout: impl Into<LayoutElement>) -> Result<()> {
        let layout = layout.into();
        let id = element.id().clone();
        trace!(id = id.as_str(); "Built element");
        self.built.insert(id.to_string());
        self.map_to(ModelKey::Element(id), layout.id().clone());
        if let Some(model) = &mut self.model {
            model.add_element(element)?;
        }
        if let Some(builder) = &mut self.layout {
            builder.add_element(layout)?;
        }
        Ok(())
    }

    /// Nest `child` in `parent` and map it to the element owned by `owner`
    /// that carries the same id.
    fn nest(&mut self, owner: &UniqueId, parent: &mut NodeLayout, child: NodeLayout) -> Result<()> {
        self.map_to(ModelKey::owned(child.id.clone(), owner.clone()), child.id.clone());
        parent.layout_elements.add_element(child.into())?;
        Ok(())
    }

    fn node_layout(&mut self, glyph: &Node, id: UniqueId, kind: NodeKind, text: Option<String>) -> Result<NodeLayout> {
        let mut node = NodeLayout::new(id, kind);
        match xml::parse_bbox(glyph)? {
            Some(bbox) => node.set_bbox(bbox),
            None => self.diagnostics.record(
                DiagnosticKind::MissingAttribute,
                Some(node.id.as_str()),
                "glyph has no bbox, placed at the origin with no size",
            ),
        }
        if let Some(text) = text {
            let label_box = match xml::child(glyph, "label") {
                Some(label) => xml::parse_bbox(&label)?,
                None => None,
            };
            let position = label_box.map_or(node.position, |bbox| bbox.center());
            node.label = Some(TextLayout::new(text, position));
        }
        node.has_clone = xml::child(glyph, "clone").is_some();
        if matches!(kind, NodeKind::Tag | NodeKind::Terminal) {
            node.orientation = glyph.attribute("orientation").and_then(parse_orientation);
        }
        if let Some(spec) = self.render.as_ref().and_then(|render| render.style_for(node.id.as_str())) {
            spec.apply_to_style(&mut node.style);
            if let Some(label) = &mut node.label {
                spec.apply_to_label(label);
            }
        }
        self.annotate(&node.id, glyph);
        trace!(id = node.id.as_str(), kind:? = kind; "Built node layout");
        Ok(node)
    }

    fn arc_layout(&mut self, arc: &Node, id: UniqueId, kind: ArcKind, points: &[Point]) -> ArcLayout {
        let mut layout = ArcLayout::new(id, kind);
        layout.segments = segments_from_points(points);
        if let Some(spec) = self.render.as_ref().and_then(|render| render.style_for(layout.id.as_str())) {
            spec.apply_to_style(&mut layout.style);
        }
        self.annotate(&layout.id, arc);
        trace!(id = layout.id.as_str(), kind:? = kind; "Built arc layout");
        layout
    }

    /// Arc stored from its owner towards `target`, so its points run
    /// backwards relative to the document.
    fn inverted_arc(&mut self, arc: &IndexedArc, id: UniqueId, kind: ArcKind, target: &str) -> Result<ArcLayout> {
        let mut points = arc_points(&arc.node)?;
        points.reverse();
        let mut layout = self.arc_layout(&arc.node, id, kind, &points);
        layout.target = Some(UniqueId::new(target));
        Ok(layout)
    }

    /// Glyph box, read again for geometric inference so that it is not
    /// rebuilt from the node's centre.
    fn glyph_bbox(glyph: &Node, node: &NodeLayout) -> Result<BBox> {
        Ok(xml::parse_bbox(glyph)?.unwrap_or_else(|| node.bbox()))
    }

    fn compartment_ref(&self, id: &UniqueId, glyph: &Node) -> Result<Option<UniqueId>> {
        let Some(reference) = glyph.attribute("compartmentRef") else {
            return Ok(None);
        };
        if self.index.glyph_class(reference) != Some(GlyphClass::Compartment) {
            return Err(Error::unresolved(id.as_str(), reference));
        }
        self.require(id, reference)?;
        Ok(Some(UniqueId::new(reference)))
    }

    fn read_auxiliary(
        &mut self,
        glyph: &Node<'a, 'input>,
        owner: &UniqueId,
        node: &mut NodeLayout,
        accepts: fn(SubglyphClass) -> bool,
    ) -> Result<Auxiliary<'a, 'input>> {
        let mut auxiliary = Auxiliary::default();
        let mut undefined_variables = 0;
        for sub in xml::children(glyph, "glyph") {
            let class_name = sub.attribute("class").unwrap_or_default();
            let entity = xml::child(&sub, "entity").and_then(|entity| entity.attribute("name"));
            let Some(sub_class) = class::subglyph_class(self.dialect, class_name, entity).filter(|class| accepts(*class))
            else {
                self.diagnostics.record(
                    DiagnosticKind::UnknownClassValue,
                    sub.attribute("id"),
                    format!("`{class_name}` is not expected inside `{owner}`"),
                );
                continue;
            };
            match sub_class {
                SubglyphClass::StateVariable => {
                    let order = if xml::child(&sub, "state")
                        .and_then(|state| non_empty(state.attribute("variable")))
                        .is_none()
                    {
                        undefined_variables += 1;
                        Some(undefined_variables - 1)
                    } else {
                        None
                    };
                    let state_variable = self.read_state_variable(&sub, owner, node, order)?;
                    auxiliary.state_variables.add_element(state_variable)?;
                }
                SubglyphClass::UnitOfInformation(entity) => {
                    let unit = self.read_unit_of_information(&sub, owner, node, entity)?;
                    auxiliary.units_of_information.add_element(unit)?;
                }
                SubglyphClass::Subunit(kind) => {
                    let subunit = self.read_subunit(&sub, kind, owner, node)?;
                    auxiliary.subunits.add_element(subunit)?;
                }
                SubglyphClass::Terminal => auxiliary.terminals.push(sub),
                SubglyphClass::Cardinality => self.diagnostics.record(
                    DiagnosticKind::UnknownClassValue,
                    sub.attribute("id"),
                    "stoichiometry outside an arc",
                ),
            }
        }
        Ok(auxiliary)
    }

    fn read_state_variable(
        &mut self,
        glyph: &Node,
        owner: &UniqueId,
        parent: &mut NodeLayout,
        order: Option<usize>,
    ) -> Result<StateVariable> {
        let id = self.element_id(glyph);
        let state = xml::child(glyph, "state");
        let value = non_empty(state.and_then(|state| state.attribute("value")));
        let variable = non_empty(state.and_then(|state| state.attribute("variable")));
        let text = match (&value, &variable) {
            (Some(value), Some(variable)) => Some(format!("{value}@{variable}")),
            (Some(value), None) => Some(value.clone()),
            (None, Some(variable)) => Some(format!("@{variable}")),
            (None, None) => None,
        };
        let node = self.node_layout(glyph, id.clone(), NodeKind::StateVariable, text)?;
        self.nest(owner, parent, node)?;
        Ok(StateVariable {
            id,
            value,
            variable,
            order,
        })
    }

    fn read_unit_of_information(
        &mut self,
        glyph: &Node,
        owner: &UniqueId,
        parent: &mut NodeLayout,
        entity: Option<crate::model::UnitEntityKind>,
    ) -> Result<UnitOfInformation> {
        let id = self.element_id(glyph);
        let text = xml::label_text(glyph);
        let (prefix, value) = match text.as_deref().and_then(|text| text.split_once(':')) {
            Some((prefix, value)) => (Some(prefix.to_string()), value.to_string()),
            None => (None, text.clone().unwrap_or_default()),
        };
        let node = self.node_layout(glyph, id.clone(), NodeKind::UnitOfInformation(entity), text)?;
        self.nest(owner, parent, node)?;
        Ok(UnitOfInformation {
            id,
            value,
            prefix,
            entity,
        })
    }

    fn read_subunit(
        &mut self,
        glyph: &Node<'a, 'input>,
        kind: EntityPoolKind,
        owner: &UniqueId,
        parent: &mut NodeLayout,
    ) -> Result<Subunit> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Subunit(kind), label.clone())?;
        let auxiliary = self.read_auxiliary(glyph, &id, &mut node, entity_auxiliary)?;
        self.nest(owner, parent, node)?;
        Ok(Subunit {
            id,
            kind,
            label,
            state_variables: auxiliary.state_variables,
            units_of_information: auxiliary.units_of_information,
            subunits: auxiliary.subunits,
        })
    }

    fn build_compartment(&mut self, glyph: &Node<'a, 'input>) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Compartment, label.clone())?;
        let auxiliary = self.read_auxiliary(glyph, &id, &mut node, compartment_auxiliary)?;
        let compartment = Compartment {
            id,
            label,
            state_variables: auxiliary.state_variables,
            units_of_information: auxiliary.units_of_information,
        };
        self.insert(ModelElement::Compartment(compartment), node)
    }

    fn build_entity_pool(&mut self, glyph: &Node<'a, 'input>, kind: EntityPoolKind) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let compartment = self.compartment_ref(&id, glyph)?;
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::EntityPool(kind), label.clone())?;
        let auxiliary = self.read_auxiliary(glyph, &id, &mut node, entity_auxiliary)?;
        let pool = EntityPool {
            id,
            kind,
            label,
            compartment,
            state_variables: auxiliary.state_variables,
            units_of_information: auxiliary.units_of_information,
            subunits: auxiliary.subunits,
        };
        self.insert(ModelElement::EntityPool(pool), node)
    }

    fn build_activity(&mut self, glyph: &Node<'a, 'input>, kind: ActivityKind) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let compartment = self.compartment_ref(&id, glyph)?;
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Activity(kind), label.clone())?;
        let auxiliary = self.read_auxiliary(glyph, &id, &mut node, activity_auxiliary)?;
        let activity = Activity {
            id,
            kind,
            label,
            compartment,
            units_of_information: auxiliary.units_of_information,
        };
        self.insert(ModelElement::Activity(activity), node)
    }

    /// Build an operator after the operators it takes as inputs.
    fn build_operator(&mut self, glyph: &Node<'a, 'input>, kind: OperatorKind) -> Result<()> {
        let id = self.element_id(glyph);
        if self.built.contains(id.as_str()) {
            return Ok(());
        }
        if !self.under_construction.insert(id.to_string()) {
            return Err(Error::ReferenceCycle(id.to_string()));
        }

        let index = self.index;
        let inputs: Vec<&IndexedArc> = index.arcs_into(id.as_str(), ArcClass::Logic).collect();
        for arc in &inputs {
            if self.built.contains(arc.source) {
                continue;
            }
            match (index.glyph_class(arc.source), index.get(arc.source)) {
                (Some(GlyphClass::LogicalOperator(input_kind)), Some(input)) => {
                    self.build_operator(&input, input_kind)?;
                }
                _ => {
                    let arc_id = arc.node.attribute("id").unwrap_or_default();
                    return Err(Error::unresolved(arc_id, arc.source));
                }
            }
        }

        let mut node = self.node_layout(glyph, id.clone(), NodeKind::LogicalOperator(kind), xml::label_text(glyph))?;
        let bbox = Self::glyph_bbox(glyph, &node)?;
        let ports = read_ports(glyph)?;
        let direction = heuristics::direction(&bbox, &ports, glyph.attribute("orientation"));
        let first_input_end = match inputs.first() {
            Some(arc) => Some(arc_endpoint(&arc.node, "end")?),
            None => None,
        };
        let (left, right) = heuristics::connector_lengths(&bbox, &ports);
        node.connectors = Some(Connectors {
            direction,
            left_to_right: heuristics::operator_left_to_right(direction, &bbox, first_input_end),
            left_connector_length: left,
            right_connector_length: right,
        });

        let mut operator = LogicalOperator {
            id: id.clone(),
            kind,
            inputs: ElementSet::new(),
        };
        for arc in inputs {
            let arc_id = self.element_id(&arc.node);
            operator.inputs.add_element(OperatorInput {
                id: arc_id.clone(),
                element: UniqueId::new(arc.source),
            })?;
            let layout = self.inverted_arc(arc, arc_id.clone(), ArcKind::Logic, arc.source)?;
            self.map_to(ModelKey::owned(arc_id.clone(), id.clone()), arc_id);
            node.layout_elements.add_element(layout.into())?;
        }

        self.under_construction.remove(id.as_str());
        self.insert(ModelElement::LogicalOperator(operator), node)
    }

    /// Equivalence arcs into a tag or terminal, nested in its layout. All
    /// of them map to the key of the first one, which is also the model
    /// reference.
    fn read_equivalences(&mut self, owner: &UniqueId, node: &mut NodeLayout) -> Result<Option<Reference>> {
        let index = self.index;
        let mut reference: Option<Reference> = None;
        for arc in index.arcs_into(owner.as_str(), ArcClass::Equivalence) {
            let arc_id = self.element_id(&arc.node);
            self.require(&arc_id, arc.source)?;
            let first = reference.get_or_insert_with(|| Reference {
                id: arc_id.clone(),
                element: UniqueId::new(arc.source),
            });
            let key = ModelKey::owned(first.id.clone(), owner.clone());
            let layout = self.inverted_arc(arc, arc_id.clone(), ArcKind::Equivalence, arc.source)?;
            self.map_to(key, arc_id);
            node.layout_elements.add_element(layout.into())?;
        }
        Ok(reference)
    }

    fn build_submap(&mut self, glyph: &Node<'a, 'input>) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Submap, label.clone())?;
        let auxiliary = self.read_auxiliary(glyph, &id, &mut node, submap_auxiliary)?;

        let mut submap = Submap {
            id: id.clone(),
            label,
            terminals: ElementSet::new(),
        };
        for terminal in auxiliary.terminals {
            let terminal_id = self.element_id(&terminal);
            let terminal_label = xml::label_text(&terminal);
            let mut terminal_node =
                self.node_layout(&terminal, terminal_id.clone(), NodeKind::Terminal, terminal_label.clone())?;
            let reference = self.read_equivalences(&terminal_id, &mut terminal_node)?;
            submap.terminals.add_element(Terminal {
                id: terminal_id,
                label: terminal_label,
                reference,
            })?;
            self.nest(&id, &mut node, terminal_node)?;
        }
        self.insert(ModelElement::Submap(submap), node)
    }

    fn build_phenotype(&mut self, glyph: &Node<'a, 'input>) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let node = self.node_layout(glyph, id.clone(), NodeKind::Process(ProcessKind::Phenotype), label.clone())?;
        let phenotype = Process {
            id,
            kind: ProcessKind::Phenotype,
            label,
            reversible: false,
            reactants: ElementSet::new(),
            products: ElementSet::new(),
        };
        self.insert(ModelElement::Process(phenotype), node)
    }

    fn build_tag(&mut self, glyph: &Node<'a, 'input>) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Tag, label.clone())?;
        let reference = self.read_equivalences(&id, &mut node)?;
        self.insert(ModelElement::Tag(Tag { id, label, reference }), node)
    }

    /// Stoichiometry sub-glyphs of a flux arc, nested in its layout and
    /// mapped to the flux role. The first parsable label gives the value.
    fn read_stoichiometry(&mut self, arc: &Node, key: &ModelKey, layout: &mut ArcLayout) -> Result<Option<f64>> {
        let mut stoichiometry = None;
        for sub in xml::children(arc, "glyph") {
            let class_name = sub.attribute("class").unwrap_or_default();
            if class::subglyph_class(self.dialect, class_name, None) != Some(SubglyphClass::Cardinality) {
                self.diagnostics.record(
                    DiagnosticKind::UnknownClassValue,
                    sub.attribute("id"),
                    format!("`{class_name}` is not expected on arc `{}`", layout.id),
                );
                continue;
            }
            let id = self.element_id(&sub);
            let text = xml::label_text(&sub);
            if stoichiometry.is_none() {
                stoichiometry = text.as_deref().and_then(|text| text.trim().parse::<f64>().ok());
            }
            let node = self.node_layout(&sub, id.clone(), NodeKind::Cardinality, text)?;
            layout.layout_elements.add_element(node.into())?;
            self.map_to(key.clone(), id);
        }
        Ok(stoichiometry)
    }

    fn build_process(&mut self, glyph: &Node<'a, 'input>, kind: ProcessKind) -> Result<()> {
        let id = self.element_id(glyph);
        let label = xml::label_text(glyph);
        let index = self.index;
        let consumptions: Vec<&IndexedArc> = index.arcs_into(id.as_str(), ArcClass::Consumption).collect();
        let productions: Vec<&IndexedArc> = index
            .arcs_of(id.as_str())
            .iter()
            .filter(|arc| arc.class == ArcClass::Production && arc.source == id.as_str())
            .collect();

        let mut node = self.node_layout(glyph, id.clone(), NodeKind::Process(kind), label.clone())?;
        let bbox = Self::glyph_bbox(glyph, &node)?;
        let ports = read_ports(glyph)?;
        let direction = heuristics::direction(&bbox, &ports, glyph.attribute("orientation"));
        let first_production_start = match productions.first() {
            Some(arc) => Some(arc_endpoint(&arc.node, "start")?),
            None => None,
        };
        let first_consumption_end = match consumptions.first() {
            Some(arc) => Some(arc_endpoint(&arc.node, "end")?),
            None => None,
        };
        let (left, right) = heuristics::connector_lengths(&bbox, &ports);
        node.connectors = Some(Connectors {
            direction,
            left_to_right: heuristics::process_left_to_right(
                direction,
                &bbox,
                first_production_start,
                first_consumption_end,
            ),
            left_connector_length: left,
            right_connector_length: right,
        });

        let reversible = consumptions.is_empty();
        let mut process = Process {
            id: id.clone(),
            kind,
            label,
            reversible,
            reactants: ElementSet::new(),
            products: ElementSet::new(),
        };

        for arc in consumptions {
            let arc_id = self.element_id(&arc.node);
            self.require(&arc_id, arc.source)?;
            let key = ModelKey::owned(arc_id.clone(), id.clone());
            let mut layout = self.inverted_arc(arc, arc_id.clone(), ArcKind::Consumption, arc.source)?;
            self.map_to(key.clone(), arc_id.clone());
            let stoichiometry = self.read_stoichiometry(&arc.node, &key, &mut layout)?;
            process.reactants.add_element(FluxRole {
                id: arc_id,
                element: UniqueId::new(arc.source),
                stoichiometry,
            })?;
            node.layout_elements.add_element(layout.into())?;
        }

        for arc in productions {
            let arc_id = self.element_id(&arc.node);
            self.require(&arc_id, arc.target)?;
            let key = ModelKey::owned(arc_id.clone(), id.clone());
            let points = arc_points(&arc.node)?;
            let mut layout = self.arc_layout(&arc.node, arc_id.clone(), ArcKind::Production, &points);
            layout.source = Some(id.clone());
            layout.target = Some(UniqueId::new(arc.target));
            self.map_to(key.clone(), arc_id.clone());
            let stoichiometry = self.read_stoichiometry(&arc.node, &key, &mut layout)?;
            let role = FluxRole {
                id: arc_id,
                element: UniqueId::new(arc.target),
                stoichiometry,
            };
            if reversible && heuristics::before_center(direction, &bbox, points[0]) {
                process.reactants.add_element(role)?;
            } else {
                process.products.add_element(role)?;
            }
            node.layout_elements.add_element(layout.into())?;
        }

        self.insert(ModelElement::Process(process), node)
    }

    fn build_modulation(&mut self, arc: &IndexedArc<'a, 'input>) -> Result<()> {
        let ArcClass::Modulation(kind) = arc.class else {
            return Ok(());
        };
        let id = self.element_id(&arc.node);
        self.require(&id, arc.source)?;
        self.require(&id, arc.target)?;
        let points = arc_points(&arc.node)?;
        let mut layout = self.arc_layout(&arc.node, id.clone(), ArcKind::Modulation(kind), &points);
        layout.source = Some(UniqueId::new(arc.source));
        layout.target = Some(UniqueId::new(arc.target));
        let modulation = Modulation {
            id,
            kind,
            source: UniqueId::new(arc.source),
            target: UniqueId::new(arc.target),
        };
        self.insert(ModelElement::Modulation(modulation), layout)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;
    use crate::{
        annotation::{Qualifier, RdfAnnotation},
        layout::Direction,
        model::{ModelElementRef, ModulationKind, UnitEntityKind},
    };

    const CYTOSOL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbgn xmlns="http://sbgn.org/libsbgn/0.3">
  <map id="map1" language="process description">
    <bbox x="0" y="0" w="500" h="300"/>
    <glyph id="c1" class="compartment">
      <label text="cytosol"/>
      <bbox x="0" y="0" w="400" h="200"/>
    </glyph>
    <glyph id="m1" class="macromolecule" compartmentRef="c1">
      <label text="MAPK"/>
      <bbox x="20" y="20" w="60" h="40"/>
      <glyph id="m1_sv1" class="state variable">
        <state value="P" variable="T183"/>
        <bbox x="15" y="15" w="10" h="10"/>
      </glyph>
      <glyph id="m1_sv2" class="state variable">
        <state value="P"/>
        <bbox x="45" y="15" w="10" h="10"/>
      </glyph>
      <glyph id="m1_sv3" class="state variable">
        <state value="P"/>
        <bbox x="75" y="15" w="10" h="10"/>
      </glyph>
    </glyph>
  </map>
</sbgn>"#;

    const REACTION: &str = r#"<sbgn xmlns="http://sbgn.org/libsbgn/0.3">
  <map language="process description">
    <glyph id="e1" class="simple chemical"><label text="ATP"/><bbox x="0" y="50" w="20" h="20"/></glyph>
    <glyph id="e2" class="simple chemical"><label text="ADP"/><bbox x="200" y="50" w="20" h="20"/></glyph>
    <glyph id="p1" class="process">
      <bbox x="100" y="50" w="20" h="20"/>
      <port id="p1.1" x="90" y="60"/>
      <port id="p1.2" x="130" y="60"/>
    </glyph>
    <arc id="a1" class="consumption" source="e1" target="p1.1">
      <glyph id="a1_st" class="stoichiometry"><label text="2"/><bbox x="50" y="50" w="10" h="10"/></glyph>
      <start x="20" y="60"/>
      <next x="50" y="60"/>
      <end x="90" y="60"/>
    </arc>
    <arc id="a2" class="production" source="p1.2" target="e2">
      <start x="130" y="60"/>
      <end x="200" y="60"/>
    </arc>
  </map>
</sbgn>"#;

    fn read(source: &str) -> Result<ReadResult> {
        SbgnmlReader::new(SbgnmlVersion::V0_3).read_str(source, &ReadOptions::default())
    }

    fn process<'m>(model: &'m Model, id: &str) -> &'m Process {
        match model.get(id) {
            Some(ModelElementRef::Process(process)) => process,
            other => panic!("expected process `{id}`, got {other:?}"),
        }
    }

    fn node<'l>(layout: &'l Layout, id: &str) -> &'l NodeLayout {
        layout.find(id).and_then(LayoutElement::as_node).unwrap()
    }

    #[test]
    fn test_compartment_and_macromolecule() {
        let result = read(CYTOSOL).unwrap();
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let map = result.object.into_map().unwrap();
        assert_eq!(map.id().as_str(), "map1");
        assert_eq!(map.dialect(), Dialect::ProcessDescription);

        let model = map.model().unwrap();
        assert_eq!(model.compartments().len(), 1);
        let pool = model.entity_pools().get("m1").unwrap();
        assert_eq!(pool.label.as_deref(), Some("MAPK"));
        assert_eq!(pool.compartment.as_ref().map(UniqueId::as_str), Some("c1"));

        let layout = map.layout().unwrap();
        let m1 = node(layout, "m1");
        assert!(approx_eq!(f64, m1.position.x, 50.0));
        assert!(approx_eq!(f64, m1.position.y, 40.0));
        assert_eq!(m1.label.as_ref().map(|label| label.text.as_str()), Some("MAPK"));
        assert_eq!(m1.layout_elements.len(), 3);
        assert!(approx_eq!(f64, layout.width(), 500.0));

        assert_eq!(map.model_key_of("m1"), Some(&ModelKey::element("m1")));
        assert_eq!(map.model_key_of("m1_sv2"), Some(&ModelKey::owned("m1_sv2", "m1")));
        assert_eq!(map.model_key_of("c1"), Some(&ModelKey::element("c1")));
    }

    #[test]
    fn test_state_variable_ordinals() {
        let result = read(CYTOSOL).unwrap();
        let model = result.object.as_model().unwrap();
        let pool = model.entity_pools().get("m1").unwrap();

        let defined = pool.state_variables.get("m1_sv1").unwrap();
        assert_eq!(defined.variable.as_deref(), Some("T183"));
        assert_eq!(defined.order, None);
        assert_eq!(pool.state_variables.get("m1_sv2").unwrap().order, Some(0));
        assert_eq!(pool.state_variables.get("m1_sv3").unwrap().order, Some(1));

        let layout = result.object.as_layout().unwrap();
        let label = node(layout, "m1_sv1").label.as_ref().unwrap();
        assert_eq!(label.text, "P@T183");
    }

    #[test]
    fn test_process_polarity_and_flux() {
        let result = read(REACTION).unwrap();
        let map = result.object.into_map().unwrap();
        let p1 = process(map.model().unwrap(), "p1");
        assert!(!p1.reversible);
        let reactant = p1.reactants.get("a1").unwrap();
        assert_eq!(reactant.element.as_str(), "e1");
        assert_eq!(reactant.stoichiometry, Some(2.0));
        assert_eq!(p1.products.get("a2").unwrap().element.as_str(), "e2");

        let layout = node(map.layout().unwrap(), "p1");
        let connectors = layout.connectors.unwrap();
        assert_eq!(connectors.direction, Direction::Horizontal);
        assert!(connectors.left_to_right);
        assert!(approx_eq!(f64, connectors.left_connector_length, 10.0));

        assert_eq!(map.model_key_of("a1"), Some(&ModelKey::owned("a1", "p1")));
        assert_eq!(map.model_key_of("a1_st"), Some(&ModelKey::owned("a1", "p1")));
    }

    #[test]
    fn test_production_before_center_flips_polarity() {
        let source = REACTION.replace(r#"<start x="130" y="60"/>"#, r#"<start x="90" y="60"/>"#);
        let result = read(&source).unwrap();
        let layout = node(result.object.as_layout().unwrap(), "p1");
        assert!(!layout.connectors.unwrap().left_to_right);
    }

    #[test]
    fn test_consumption_is_stored_inverted() {
        let result = read(REACTION).unwrap();
        let layout = result.object.as_layout().unwrap();
        let consumption = layout.find("a1").and_then(LayoutElement::as_arc).unwrap();

        assert!(node(layout, "p1").layout_elements.get("a1").is_some());
        assert!(consumption.source.is_none());
        assert_eq!(consumption.target.as_ref().map(UniqueId::as_str), Some("e1"));
        assert_eq!(consumption.segments.len(), 2);
        assert_eq!(consumption.segments[0].source, Point::new(90.0, 60.0));
        assert_eq!(consumption.segments[1].target, Point::new(20.0, 60.0));

        let production = layout.find("a2").and_then(LayoutElement::as_arc).unwrap();
        assert_eq!(production.source.as_ref().map(UniqueId::as_str), Some("p1"));
        assert_eq!(production.segments[0].source, Point::new(130.0, 60.0));
    }

    #[test]
    fn test_process_without_consumption_is_reversible() {
        let source = REACTION
            .replace(r#"class="consumption" source="e1" target="p1.1""#, r#"class="production" source="p1.1" target="e1""#)
            .replace(
                r#"<start x="20" y="60"/>
      <next x="50" y="60"/>
      <end x="90" y="60"/>"#,
                r#"<start x="90" y="60"/>
      <end x="20" y="60"/>"#,
            );
        let result = read(&source).unwrap();
        let p1 = process(result.object.as_model().unwrap(), "p1");
        assert!(p1.reversible);
        assert!(p1.reactants.contains("a1"));
        assert!(p1.products.contains("a2"));
    }

    #[test]
    fn test_unknown_class_is_diagnosed_and_skipped() {
        let source = CYTOSOL.replace(
            r#"<glyph id="c1" class="compartment">"#,
            r#"<glyph id="x1" class="mystery"><bbox x="0" y="0" w="1" h="1"/></glyph>
    <glyph id="c1" class="compartment">"#,
        );
        let result = read(&source).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::UnknownClassValue);
        assert_eq!(result.diagnostics[0].element.as_deref(), Some("x1"));
        assert!(result.object.as_layout().unwrap().find("x1").is_none());
    }

    #[test]
    fn test_entity_relationship_is_unsupported() {
        let source = CYTOSOL.replace("process description", "entity relationship");
        assert!(matches!(read(&source), Err(Error::UnsupportedDialect(_))));
    }

    #[test]
    fn test_unknown_compartment_is_unresolved() {
        let source = CYTOSOL.replace(r#"compartmentRef="c1""#, r#"compartmentRef="c9""#);
        assert!(matches!(
            read(&source),
            Err(Error::UnresolvedReference { element, reference }) if element == "m1" && reference == "c9"
        ));
    }

    const OPERATORS: &str = r#"<sbgn xmlns="http://sbgn.org/libsbgn/0.3">
  <map language="process description">
    <glyph id="e1" class="macromolecule"><bbox x="0" y="0" w="40" h="20"/></glyph>
    <glyph id="e2" class="macromolecule"><bbox x="0" y="100" w="40" h="20"/></glyph>
    <glyph id="e3" class="macromolecule"><bbox x="0" y="200" w="40" h="20"/></glyph>
    <glyph id="and1" class="and"><bbox x="200" y="100" w="20" h="20"/></glyph>
    <glyph id="or1" class="or"><bbox x="100" y="150" w="20" h="20"/></glyph>
    <arc id="l1" class="logic arc" source="e1" target="and1"><start x="40" y="10"/><end x="200" y="110"/></arc>
    <arc id="l2" class="logic arc" source="or1" target="and1"><start x="120" y="160"/><end x="200" y="110"/></arc>
    <arc id="l3" class="logic arc" source="e2" target="or1"><start x="40" y="110"/><end x="100" y="160"/></arc>
    <arc id="l4" class="logic arc" source="e3" target="or1"><start x="40" y="210"/><end x="100" y="160"/></arc>
  </map>
</sbgn>"#;

    #[test]
    fn test_operator_inputs_are_built_first() {
        let result = read(OPERATORS).unwrap();
        let map = result.object.into_map().unwrap();
        let operators = map.model().unwrap().logical_operators();
        assert_eq!(operators.len(), 2);

        let and1 = operators.get("and1").unwrap();
        assert_eq!(and1.inputs.len(), 2);
        assert_eq!(and1.inputs.get("l2").unwrap().element.as_str(), "or1");
        assert_eq!(operators.get("or1").unwrap().kind, OperatorKind::Or);

        let logic = map.layout().unwrap().find("l2").and_then(LayoutElement::as_arc).unwrap();
        assert_eq!(logic.target.as_ref().map(UniqueId::as_str), Some("or1"));
        assert_eq!(map.model_key_of("l2"), Some(&ModelKey::owned("l2", "and1")));
    }

    #[test]
    fn test_operator_cycle_is_rejected() {
        let source = OPERATORS.replace(
            "</map>",
            r#"<arc id="l5" class="logic arc" source="and1" target="or1"><start x="200" y="110"/><end x="110" y="150"/></arc>
  </map>"#,
        );
        assert!(matches!(read(&source), Err(Error::ReferenceCycle(_))));
    }

    #[test]
    fn test_activity_flow() {
        let source = r#"<sbgn xmlns="http://sbgn.org/libsbgn/0.3">
  <map language="activity flow">
    <glyph id="a1" class="biological activity">
      <label text="MEK"/>
      <bbox x="0" y="0" w="60" h="30"/>
      <glyph id="u1" class="unit of information">
        <label text="mt:prot"/>
        <entity name="macromolecule"/>
        <bbox x="5" y="-5" w="20" h="10"/>
      </glyph>
    </glyph>
    <glyph id="a2" class="biological activity"><label text="ERK"/><bbox x="200" y="0" w="60" h="30"/></glyph>
    <arc id="i1" class="positive influence" source="a1" target="a2"><start x="60" y="15"/><end x="200" y="15"/></arc>
  </map>
</sbgn>"#;
        let result = read(source).unwrap();
        let map = result.object.into_map().unwrap();
        assert_eq!(map.dialect(), Dialect::ActivityFlow);
        let model = map.model().unwrap();
        assert_eq!(model.activities().len(), 2);

        let unit = model.activities().get("a1").unwrap().units_of_information.get("u1").unwrap();
        assert_eq!(unit.prefix.as_deref(), Some("mt"));
        assert_eq!(unit.value, "prot");
        assert_eq!(unit.entity, Some(UnitEntityKind::Macromolecule));

        let influence = model.modulations().get("i1").unwrap();
        assert_eq!(influence.kind, ModulationKind::PositiveInfluence);
        assert_eq!((influence.source.as_str(), influence.target.as_str()), ("a1", "a2"));
        let arc = map.layout().unwrap().layout_elements().get("i1").and_then(LayoutElement::as_arc).unwrap();
        assert_eq!(arc.source.as_ref().map(UniqueId::as_str), Some("a1"));
    }

    #[test]
    fn test_annotations_and_notes_are_keyed_by_id() {
        let source = CYTOSOL.replace(
            r#"<label text="MAPK"/>"#,
            r##"<label text="MAPK"/>
      <notes><p xmlns="http://www.w3.org/1999/xhtml">kinase</p></notes>
      <extension><annotation><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
          xmlns:bqbiol="http://biomodels.net/biology-qualifiers/">
        <rdf:Description rdf:about="#m1"><bqbiol:is><rdf:Bag>
          <rdf:li rdf:resource="urn:miriam:uniprot:P27361"/>
        </rdf:Bag></bqbiol:is></rdf:Description>
      </rdf:RDF></annotation></extension>"##,
        );
        let result = read(&source).unwrap();
        let expected = RdfAnnotation {
            qualifier: Qualifier::BiologyIs,
            resources: ["urn:miriam:uniprot:P27361".to_string()].into_iter().collect(),
        };
        assert!(result.annotations.get("m1").unwrap().contains(&expected));
        assert!(result.notes.get("m1").unwrap().contains("kinase"));
        assert_eq!(result.object.as_map().unwrap().annotations(), &result.annotations);

        let without = SbgnmlReader::new(SbgnmlVersion::V0_3)
            .read_str(
                &source,
                &ReadOptions {
                    with_annotations: false,
                    ..ReadOptions::default()
                },
            )
            .unwrap();
        assert!(without.annotations.is_empty());
        assert_eq!(without.notes.len(), 1);
    }

    #[test]
    fn test_return_type_model_skips_layout() {
        let options = ReadOptions {
            return_type: ReturnType::Model,
            ..ReadOptions::default()
        };
        let result = SbgnmlReader::new(SbgnmlVersion::V0_3).read_str(REACTION, &options).unwrap();
        assert!(matches!(result.object, ReadObject::Model(_)));
        assert!(result.object.as_layout().is_none());
        assert_eq!(result.object.as_model().unwrap().len(), 3);
        assert!(result.id_index.contains_key("p1.1"));
    }

    #[test]
    fn test_missing_bbox_is_diagnosed() {
        let source = REACTION.replace(
            r#"<glyph id="e1" class="simple chemical"><label text="ATP"/><bbox x="0" y="50" w="20" h="20"/></glyph>"#,
            r#"<glyph id="e1" class="simple chemical"><label text="ATP"/></glyph>"#,
        );
        let result = read(&source).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::MissingAttribute);
    }
}
