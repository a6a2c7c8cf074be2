//! Maps into SBGN-ML documents.
//!
//! The layout drives the output. Writing is planned first, so that the
//! styles of every written element are known before `<extension>` is
//! emitted at the top of the map, then serialized in one pass.

use std::{collections::HashSet, fs, io, path::Path};

use log::{debug, trace};
use quick_xml::{
    events::{BytesDecl, Event},
    Writer,
};

use super::{class, style::StyleIndex, SbgnmlVersion};
use crate::{
    annotation,
    element::UniqueId,
    error::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result},
    geometry::{points_from_segments, BBox, Point},
    layout::{ArcKind, ArcLayout, Direction, LayoutElement, NodeKind, NodeLayout, Orientation, Style, TextLayout},
    map::Map,
    mapping::ModelKey,
    model::{Dialect, ModelElementRef, StateVariable},
    options::WriteOptions,
    xml::{self, XmlWriter},
};

/// Problems met while writing. The document is written regardless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbgnmlWriter {
    version: SbgnmlVersion,
}

impl SbgnmlWriter {
    pub fn new(version: SbgnmlVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> SbgnmlVersion {
        self.version
    }

    pub fn write(&self, map: &Map, path: &Path, options: &WriteOptions) -> Result<WriteReport> {
        let (text, report) = self.write_string(map, options)?;
        fs::write(path, text)?;
        debug!(
            path = path.display().to_string(),
            format = self.version.format_name(),
            diagnostics = report.diagnostics.len();
            "Wrote SBGN-ML file"
        );
        Ok(report)
    }

    pub fn write_string(&self, map: &Map, options: &WriteOptions) -> Result<(String, WriteReport)> {
        let mut plan = Plan::new(map, self.version, options);
        plan.build();

        let mut writer = Writer::new_with_indent(io::Cursor::new(Vec::new()), b' ', 2);
        plan.write(&mut writer)?;
        let text = String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        Ok((
            text,
            WriteReport {
                diagnostics: plan.diagnostics.into_vec(),
            },
        ))
    }
}

struct GlyphPlan<'m> {
    node: &'m NodeLayout,
    class: &'static str,
    compartment: Option<String>,
    /// Value and variable of a state variable.
    state: Option<(Option<String>, Option<String>)>,
    text: Option<String>,
    annotated: Option<&'m UniqueId>,
    children: Vec<GlyphPlan<'m>>,
}

struct ArcPlan<'m> {
    arc: &'m ArcLayout,
    class: &'static str,
    source: String,
    target: String,
    points: Vec<Point>,
    annotated: Option<&'m UniqueId>,
    glyphs: Vec<GlyphPlan<'m>>,
}

fn port_id(owner: &NodeLayout, left: bool) -> String {
    if left {
        format!("{}_left", owner.id)
    } else {
        format!("{}_right", owner.id)
    }
}

/// Port an inbound consumption or logic arc ends on.
fn input_port(owner: &NodeLayout) -> String {
    match owner.connectors {
        Some(connectors) => port_id(owner, connectors.left_to_right),
        None => owner.id.to_string(),
    }
}

/// Port a production arc starts from.
fn output_port(owner: &NodeLayout) -> String {
    match owner.connectors {
        Some(connectors) => port_id(owner, !connectors.left_to_right),
        None => owner.id.to_string(),
    }
}

fn orientation_name(node: &NodeLayout) -> Option<&'static str> {
    match node.kind {
        NodeKind::Tag | NodeKind::Terminal => node.orientation.map(|orientation| match orientation {
            Orientation::Left => "left",
            Orientation::Right => "right",
            Orientation::Up => "up",
            Orientation::Down => "down",
        }),
        _ => node.connectors.map(|connectors| match connectors.direction {
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
        }),
    }
}

/// `value@variable` label split at the last `@`.
fn split_state_label(text: &str) -> (Option<String>, Option<String>) {
    let non_empty = |part: &str| (!part.is_empty()).then(|| part.to_string());
    match text.rsplit_once('@') {
        Some((value, variable)) => (non_empty(value), non_empty(variable)),
        None => (non_empty(text), None),
    }
}

fn write_bbox(writer: &mut XmlWriter, bbox: BBox) -> Result<()> {
    let [x, y, w, h] = [bbox.x, bbox.y, bbox.w, bbox.h].map(xml::format_number);
    xml::write_empty(
        writer,
        "bbox",
        &[("x", x.as_str()), ("y", y.as_str()), ("w", w.as_str()), ("h", h.as_str())],
    )
}

fn write_point(writer: &mut XmlWriter, tag: &str, point: Point, id: Option<&str>) -> Result<()> {
    let x = xml::format_number(point.x);
    let y = xml::format_number(point.y);
    let mut attrs = Vec::with_capacity(3);
    if let Some(id) = id {
        attrs.push(("id", id));
    }
    attrs.push(("x", x.as_str()));
    attrs.push(("y", y.as_str()));
    xml::write_empty(writer, tag, &attrs)
}

struct Plan<'m> {
    map: &'m Map,
    version: SbgnmlVersion,
    dialect: Dialect,
    options: &'m WriteOptions,
    styles: StyleIndex,
    /// Model ids whose annotations and notes already have a home.
    annotated: HashSet<&'m UniqueId>,
    diagnostics: Diagnostics,
    glyphs: Vec<GlyphPlan<'m>>,
    arcs: Vec<ArcPlan<'m>>,
}

impl<'m> Plan<'m> {
    fn new(map: &'m Map, version: SbgnmlVersion, options: &'m WriteOptions) -> Self {
        let background = map.layout().and_then(|layout| layout.style().fill);
        Self {
            map,
            version,
            dialect: map.dialect(),
            options,
            styles: StyleIndex::new(background.filter(|_| options.with_styles)),
            annotated: HashSet::new(),
            diagnostics: Diagnostics::default(),
            glyphs: Vec::new(),
            arcs: Vec::new(),
        }
    }

    fn build(&mut self) {
        let map = self.map;
        let Some(layout) = map.layout() else {
            debug!(map = map.id().as_str(); "Map has no layout, writing an empty map");
            return;
        };
        for element in layout.layout_elements().iter() {
            match element {
                LayoutElement::Node(node) => {
                    if let Some(glyph) = self.plan_node(node, true) {
                        self.glyphs.push(glyph);
                    }
                }
                LayoutElement::Arc(arc) => self.plan_arc(arc, None),
            }
        }
        debug!(
            glyphs = self.glyphs.len(),
            arcs = self.arcs.len(),
            skipped = self.diagnostics.len();
            "Planned SBGN-ML document"
        );
    }

    fn add_style(&mut self, id: &UniqueId, style: &Style, label: Option<&TextLayout>) {
        if self.options.with_styles {
            self.styles.add(id.as_str(), style, label);
        }
    }

    /// Model id whose annotations and notes go on the element written for
    /// `layout_id`, the first time that id is met.
    fn claim_annotations(&mut self, layout_id: &UniqueId) -> Option<&'m UniqueId> {
        let map = self.map;
        let id = match map.model_key_of(layout_id.as_str()) {
            Some(key) => key.id(),
            None => map
                .annotations()
                .get_key_value(layout_id)
                .map(|(id, _)| id)
                .or_else(|| map.notes().get_key_value(layout_id).map(|(id, _)| id))?,
        };
        let carries = map.annotations().contains_key(id) || map.notes().contains_key(id);
        (carries && self.annotated.insert(id)).then_some(id)
    }

    /// Layout id of the compartment holding the element depicted by
    /// `layout_id`.
    fn compartment_ref(&self, layout_id: &UniqueId) -> Option<String> {
        let model = self.map.model()?;
        let key = self.map.model_key_of(layout_id.as_str())?;
        let element = model.get(key.id().as_str())?;
        let compartment = element.compartment()?.clone();
        let depicted = self
            .map
            .mapping()
            .and_then(|mapping| mapping.layout_ids(&ModelKey::Element(compartment.clone())).next().cloned());
        Some(depicted.unwrap_or(compartment).to_string())
    }

    fn model_state_variable(&self, layout_id: &UniqueId) -> Option<&'m StateVariable> {
        let model = self.map.model()?;
        let ModelKey::Owned { element, owner } = self.map.model_key_of(layout_id.as_str())? else {
            return None;
        };
        match model.get(owner.as_str())? {
            ModelElementRef::EntityPool(pool) => pool.state_variables.get(element.as_str()),
            ModelElementRef::Compartment(compartment) => compartment.state_variables.get(element.as_str()),
            _ => None,
        }
    }

    fn model_stoichiometry(&self, layout_id: &UniqueId) -> Option<String> {
        let model = self.map.model()?;
        let ModelKey::Owned { element, owner } = self.map.model_key_of(layout_id.as_str())? else {
            return None;
        };
        let ModelElementRef::Process(process) = model.get(owner.as_str())? else {
            return None;
        };
        let role = process
            .reactants
            .get(element.as_str())
            .or_else(|| process.products.get(element.as_str()))?;
        role.stoichiometry.map(xml::format_number)
    }

    fn plan_node(&mut self, node: &'m NodeLayout, top_level: bool) -> Option<GlyphPlan<'m>> {
        let Some(class) = class::node_class(node.kind, self.dialect, self.version) else {
            self.diagnostics.record(
                DiagnosticKind::UnwritableLayoutType,
                Some(node.id.as_str()),
                format!(
                    "{:?} has no {} class in {:?} maps",
                    node.kind,
                    self.version.format_name(),
                    self.dialect
                ),
            );
            return None;
        };
        self.add_style(&node.id, &node.style, node.label.as_ref());
        let annotated = self.claim_annotations(&node.id);

        let label_text = node.label.as_ref().map(|label| label.text.clone());
        let (state, text) = match node.kind {
            NodeKind::StateVariable => {
                let state = match self.model_state_variable(&node.id) {
                    Some(state_variable) => (state_variable.value.clone(), state_variable.variable.clone()),
                    None => label_text.as_deref().map(split_state_label).unwrap_or_default(),
                };
                (Some(state), None)
            }
            NodeKind::Cardinality => (None, self.model_stoichiometry(&node.id).or(label_text)),
            _ => (None, label_text),
        };
        let compartment = match node.kind {
            NodeKind::EntityPool(_) | NodeKind::Activity(_) if top_level => self.compartment_ref(&node.id),
            _ => None,
        };

        let mut children = Vec::new();
        for element in node.layout_elements.iter() {
            match element {
                LayoutElement::Node(child) => {
                    if let Some(glyph) = self.plan_node(child, false) {
                        children.push(glyph);
                    }
                }
                LayoutElement::Arc(arc) => self.plan_arc(arc, Some(node)),
            }
        }
        trace!(id = node.id.as_str(), class = class; "Planned glyph");
        Some(GlyphPlan {
            node,
            class,
            compartment,
            state,
            text,
            annotated,
            children,
        })
    }

    /// Arcs nested in `owner` are stored from the owner outwards and get
    /// their document direction back here.
    fn plan_arc(&mut self, arc: &'m ArcLayout, owner: Option<&'m NodeLayout>) {
        let Some(class) = class::arc_class_name(arc.kind, self.dialect) else {
            self.diagnostics.record(
                DiagnosticKind::UnwritableLayoutType,
                Some(arc.id.as_str()),
                format!("{:?} arcs have no class in {:?} maps", arc.kind, self.dialect),
            );
            return;
        };
        let mut points = points_from_segments(&arc.segments);
        let stored_target = arc.target.as_ref().map(UniqueId::to_string);
        let ends = match owner {
            Some(owner) if arc.kind.is_inverted() => {
                points.reverse();
                let target = match arc.kind {
                    ArcKind::Equivalence => owner.id.to_string(),
                    _ => input_port(owner),
                };
                stored_target.map(|source| (source, target))
            }
            Some(owner) if arc.kind == ArcKind::Production => {
                stored_target.map(|target| (output_port(owner), target))
            }
            _ => arc.source.as_ref().map(UniqueId::to_string).zip(stored_target),
        };
        let Some((source, target)) = ends else {
            self.diagnostics.record(
                DiagnosticKind::MissingAttribute,
                Some(arc.id.as_str()),
                "arc has no source or no target",
            );
            return;
        };
        if points.len() < 2 {
            self.diagnostics.record(
                DiagnosticKind::MissingAttribute,
                Some(arc.id.as_str()),
                "arc has no segments",
            );
            return;
        }

        self.add_style(&arc.id, &arc.style, arc.label.as_ref());
        let annotated = self.claim_annotations(&arc.id);
        let mut glyphs = Vec::new();
        for element in arc.layout_elements.iter() {
            if let LayoutElement::Node(node) = element {
                if let Some(glyph) = self.plan_node(node, false) {
                    glyphs.push(glyph);
                }
            }
        }
        trace!(id = arc.id.as_str(), class = class, source = source.as_str(), target = target.as_str(); "Planned arc");
        self.arcs.push(ArcPlan {
            arc,
            class,
            source,
            target,
            points,
            annotated,
            glyphs,
        });
    }

    fn write(&self, writer: &mut XmlWriter) -> Result<()> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        xml::write_start(writer, "sbgn", &[("xmlns", self.version.namespace())])?;

        let mut attrs = vec![("id", self.map.id().as_str())];
        attrs.extend(self.version.dialect_attributes(self.dialect));
        xml::write_start(writer, "map", &attrs)?;
        self.write_metadata(writer, Some(self.map.id()), true)?;
        if let Some(layout) = self.map.layout() {
            write_bbox(writer, layout.bbox())?;
        }
        for glyph in &self.glyphs {
            self.write_glyph(writer, glyph)?;
        }
        for arc in &self.arcs {
            self.write_arc(writer, arc)?;
        }
        xml::write_end(writer, "map")?;
        xml::write_end(writer, "sbgn")
    }

    /// `<notes>` then `<extension>`, each only when there is something to
    /// put in it.
    fn write_metadata(&self, writer: &mut XmlWriter, about: Option<&UniqueId>, with_render: bool) -> Result<()> {
        if let Some(notes) = about
            .filter(|_| self.options.with_notes)
            .and_then(|id| self.map.notes().get(id))
        {
            annotation::write_notes(writer, notes)?;
        }
        let annotations = about
            .filter(|_| self.options.with_annotations)
            .and_then(|id| Some((id, self.map.annotations().get(id)?)))
            .filter(|(_, annotations)| !annotations.is_empty());
        let with_render = with_render && !self.styles.is_empty();
        if annotations.is_none() && !with_render {
            return Ok(());
        }
        xml::write_start(writer, "extension", &[])?;
        if let Some((id, annotations)) = annotations {
            annotation::write_annotation(writer, id.as_str(), annotations)?;
        }
        if with_render {
            self.styles.write(writer)?;
        }
        xml::write_end(writer, "extension")
    }

    fn write_glyph(&self, writer: &mut XmlWriter, plan: &GlyphPlan) -> Result<()> {
        let node = plan.node;
        let mut attrs = vec![("id", node.id.as_str()), ("class", plan.class)];
        if let Some(compartment) = &plan.compartment {
            attrs.push(("compartmentRef", compartment.as_str()));
        }
        if let Some(orientation) = orientation_name(node) {
            attrs.push(("orientation", orientation));
        }
        xml::write_start(writer, "glyph", &attrs)?;
        self.write_metadata(writer, plan.annotated, false)?;

        if let Some(text) = &plan.text {
            match node.label.as_ref().map(|label| label.position) {
                Some(position) if position != node.position => {
                    xml::write_start(writer, "label", &[("text", text.as_str())])?;
                    write_bbox(writer, BBox::from_center(position, 0.0, 0.0))?;
                    xml::write_end(writer, "label")?;
                }
                _ => xml::write_empty(writer, "label", &[("text", text.as_str())])?,
            }
        }
        if let Some((value, variable)) = &plan.state {
            let mut state = Vec::new();
            if let Some(value) = value {
                state.push(("value", value.as_str()));
            }
            if let Some(variable) = variable {
                state.push(("variable", variable.as_str()));
            }
            xml::write_empty(writer, "state", &state)?;
        }
        if node.has_clone {
            xml::write_empty(writer, "clone", &[])?;
        }
        if let (NodeKind::UnitOfInformation(Some(entity)), Dialect::ActivityFlow) = (node.kind, self.dialect) {
            xml::write_empty(writer, "entity", &[("name", class::unit_entity_name(entity))])?;
        }
        write_bbox(writer, node.bbox())?;

        for child in &plan.children {
            self.write_glyph(writer, child)?;
        }
        if let (Some(input), Some(output)) = (node.input_tip(), node.output_tip()) {
            write_point(writer, "port", input, Some(input_port(node).as_str()))?;
            write_point(writer, "port", output, Some(output_port(node).as_str()))?;
        }
        xml::write_end(writer, "glyph")
    }

    fn write_arc(&self, writer: &mut XmlWriter, plan: &ArcPlan) -> Result<()> {
        xml::write_start(
            writer,
            "arc",
            &[
                ("id", plan.arc.id.as_str()),
                ("class", plan.class),
                ("source", plan.source.as_str()),
                ("target", plan.target.as_str()),
            ],
        )?;
        self.write_metadata(writer, plan.annotated, false)?;
        for glyph in &plan.glyphs {
            self.write_glyph(writer, glyph)?;
        }
        if let [start, next @ .., end] = plan.points.as_slice() {
            write_point(writer, "start", *start, None)?;
            for point in next {
                write_point(writer, "next", *point, None)?;
            }
            write_point(writer, "end", *end, None)?;
        }
        xml::write_end(writer, "arc")
    }
}
