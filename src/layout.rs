//! The geometric side of a map: positioned node shapes, polylines and
//! labels, nested the way their SBGN-ML glyphs are.

use crate::{
    element::{ElementList, Freeze, MapElement, UniqueId},
    error::Result,
    geometry::{BBox, Bounds, Point, Segment},
    model::{ActivityKind, EntityPoolKind, ModulationKind, OperatorKind, ProcessKind, UnitEntityKind},
};

pub const DEFAULT_CONNECTOR_LENGTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
}

/// Pointing direction of a tag or terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Left,
    Right,
    Up,
    Down,
}

/// Connector geometry of a process or logical operator shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connectors {
    pub direction: Direction,
    pub left_to_right: bool,
    pub left_connector_length: f64,
    pub right_connector_length: f64,
}

impl Default for Connectors {
    fn default() -> Self {
        Self {
            direction: Direction::Vertical,
            left_to_right: true,
            left_connector_length: DEFAULT_CONNECTOR_LENGTH,
            right_connector_length: DEFAULT_CONNECTOR_LENGTH,
        }
    }
}

impl Connectors {
    /// Tip of the left (or upper) connector of a shape centred at `position`.
    pub fn left_tip(&self, position: Point, width: f64, height: f64) -> Point {
        match self.direction {
            Direction::Horizontal => Point::new(
                position.x - width / 2.0 - self.left_connector_length,
                position.y,
            ),
            Direction::Vertical => Point::new(
                position.x,
                position.y - height / 2.0 - self.left_connector_length,
            ),
        }
    }

    /// Tip of the right (or lower) connector.
    pub fn right_tip(&self, position: Point, width: f64, height: f64) -> Point {
        match self.direction {
            Direction::Horizontal => Point::new(
                position.x + width / 2.0 + self.right_connector_length,
                position.y,
            ),
            Direction::Vertical => Point::new(
                position.x,
                position.y + height / 2.0 + self.right_connector_length,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        match hex.len() {
            3 => {
                let expand = |index: usize| channel(index..index + 1).map(|value| value * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: channel(6..8)?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub text: String,
    pub position: Point,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<Color>,
}

impl TextLayout {
    pub fn new(text: impl Into<String>, position: Point) -> Self {
        Self {
            text: text.into(),
            position,
            font_family: None,
            font_size: None,
            font_color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Compartment,
    Submap,
    Tag,
    Terminal,
    EntityPool(EntityPoolKind),
    Subunit(EntityPoolKind),
    Activity(ActivityKind),
    Process(ProcessKind),
    LogicalOperator(OperatorKind),
    StateVariable,
    UnitOfInformation(Option<UnitEntityKind>),
    /// Stoichiometry label box on a flux arc.
    Cardinality,
}

impl NodeKind {
    /// Process and operator shapes carry connectors and get ports on write.
    pub fn has_connectors(self) -> bool {
        match self {
            Self::Process(kind) => kind.is_stoichiometric(),
            Self::LogicalOperator(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcKind {
    Consumption,
    Production,
    Modulation(ModulationKind),
    Logic,
    Equivalence,
}

impl ArcKind {
    /// Arcs stored reversed, with only a target, inside their owning node.
    pub fn is_inverted(self) -> bool {
        matches!(self, Self::Consumption | Self::Logic | Self::Equivalence)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: UniqueId,
    pub kind: NodeKind,
    /// Centre of the shape.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub label: Option<TextLayout>,
    pub layout_elements: ElementList<LayoutElement>,
    pub connectors: Option<Connectors>,
    pub orientation: Option<Orientation>,
    pub has_clone: bool,
    pub style: Style,
}

impl NodeLayout {
    pub fn new(id: UniqueId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            position: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            label: None,
            layout_elements: ElementList::new(),
            connectors: kind.has_connectors().then(Connectors::default),
            orientation: None,
            has_clone: false,
            style: Style::default(),
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.position, self.width, self.height)
    }

    pub fn set_bbox(&mut self, bbox: BBox) {
        self.position = bbox.center();
        self.width = bbox.w;
        self.height = bbox.h;
    }

    /// Connector tip an inbound flux (or logic) arc attaches to.
    pub fn input_tip(&self) -> Option<Point> {
        let connectors = self.connectors?;
        Some(if connectors.left_to_right {
            connectors.left_tip(self.position, self.width, self.height)
        } else {
            connectors.right_tip(self.position, self.width, self.height)
        })
    }

    /// Connector tip an outbound production arc leaves from.
    pub fn output_tip(&self) -> Option<Point> {
        let connectors = self.connectors?;
        Some(if connectors.left_to_right {
            connectors.right_tip(self.position, self.width, self.height)
        } else {
            connectors.left_tip(self.position, self.width, self.height)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcLayout {
    pub id: UniqueId,
    pub kind: ArcKind,
    pub segments: Vec<Segment>,
    pub source: Option<UniqueId>,
    pub target: Option<UniqueId>,
    pub label: Option<TextLayout>,
    pub layout_elements: ElementList<LayoutElement>,
    pub style: Style,
}

impl ArcLayout {
    pub fn new(id: UniqueId, kind: ArcKind) -> Self {
        Self {
            id,
            kind,
            segments: Vec::new(),
            source: None,
            target: None,
            label: None,
            layout_elements: ElementList::new(),
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutElement {
    Node(NodeLayout),
    Arc(ArcLayout),
}

impl LayoutElement {
    pub fn layout_elements(&self) -> &ElementList<LayoutElement> {
        match self {
            Self::Node(node) => &node.layout_elements,
            Self::Arc(arc) => &arc.layout_elements,
        }
    }

    pub fn as_node(&self) -> Option<&NodeLayout> {
        match self {
            Self::Node(node) => Some(node),
            Self::Arc(_) => None,
        }
    }

    pub fn as_arc(&self) -> Option<&ArcLayout> {
        match self {
            Self::Arc(arc) => Some(arc),
            Self::Node(_) => None,
        }
    }

    fn collect_points(&self, points: &mut Vec<Point>) {
        match self {
            Self::Node(node) => {
                let bbox = node.bbox();
                points.push(Point::new(bbox.x, bbox.y));
                points.push(Point::new(bbox.x + bbox.w, bbox.y + bbox.h));
            }
            Self::Arc(arc) => {
                for segment in &arc.segments {
                    points.push(segment.source);
                    points.push(segment.target);
                }
            }
        }
        for child in self.layout_elements().iter() {
            child.collect_points(points);
        }
    }
}

impl From<NodeLayout> for LayoutElement {
    fn from(node: NodeLayout) -> Self {
        Self::Node(node)
    }
}

impl From<ArcLayout> for LayoutElement {
    fn from(arc: ArcLayout) -> Self {
        Self::Arc(arc)
    }
}

impl MapElement for LayoutElement {
    fn id(&self) -> &UniqueId {
        match self {
            Self::Node(node) => &node.id,
            Self::Arc(arc) => &arc.id,
        }
    }
}

impl Freeze for LayoutElement {
    fn freeze(&mut self) {
        match self {
            Self::Node(node) => node.layout_elements.freeze(),
            Self::Arc(arc) => arc.layout_elements.freeze(),
        }
    }

    fn thaw(&mut self) {
        match self {
            Self::Node(node) => node.layout_elements.thaw(),
            Self::Arc(arc) => arc.layout_elements.thaw(),
        }
    }
}

fn find_in<'a>(elements: &'a ElementList<LayoutElement>, id: &str) -> Option<&'a LayoutElement> {
    if let Some(element) = elements.get(id) {
        return Some(element);
    }
    elements
        .iter()
        .find_map(|element| find_in(element.layout_elements(), id))
}

fn collect_descendants<'a>(elements: &'a ElementList<LayoutElement>, out: &mut Vec<&'a LayoutElement>) {
    for element in elements.iter() {
        out.push(element);
        collect_descendants(element.layout_elements(), out);
    }
}

/// Mutable layout under construction.
#[derive(Debug, Clone)]
pub struct LayoutBuilder {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub style: Style,
    layout_elements: ElementList<LayoutElement>,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self {
            position: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            style: Style::default(),
            layout_elements: ElementList::new(),
        }
    }
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_node(&self, kind: NodeKind) -> NodeLayout {
        NodeLayout::new(UniqueId::generate(), kind)
    }

    pub fn new_arc(&self, kind: ArcKind) -> ArcLayout {
        ArcLayout::new(UniqueId::generate(), kind)
    }

    /// Append a top-level element, replacing one with the same id in place.
    pub fn add_element(&mut self, element: impl Into<LayoutElement>) -> Result<Option<LayoutElement>> {
        self.layout_elements.add_element(element.into())
    }

    pub fn layout_elements(&self) -> &ElementList<LayoutElement> {
        &self.layout_elements
    }

    pub fn find(&self, id: &str) -> Option<&LayoutElement> {
        find_in(&self.layout_elements, id)
    }

    pub fn set_bbox(&mut self, bbox: BBox) {
        self.position = bbox.center();
        self.width = bbox.w;
        self.height = bbox.h;
    }

    /// Size the layout to enclose its elements plus `xsep`/`ysep` margins.
    pub fn fit(&mut self, xsep: f64, ysep: f64) {
        let mut points = Vec::new();
        for element in self.layout_elements.iter() {
            element.collect_points(&mut points);
        }
        if let Some(bounds) = Bounds::from_points(points) {
            self.set_bbox(bounds.padded(xsep, ysep).to_bbox());
        }
    }

    pub fn finalize(self) -> Layout {
        let mut layout_elements = self.layout_elements;
        layout_elements.freeze();
        Layout {
            position: self.position,
            width: self.width,
            height: self.height,
            style: self.style,
            layout_elements,
        }
    }
}

/// Finalized, read-only layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    position: Point,
    width: f64,
    height: f64,
    style: Style,
    layout_elements: ElementList<LayoutElement>,
}

impl Layout {
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.position, self.width, self.height)
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn layout_elements(&self) -> &ElementList<LayoutElement> {
        &self.layout_elements
    }

    /// Depth-first search through nested layout elements.
    pub fn find(&self, id: &str) -> Option<&LayoutElement> {
        find_in(&self.layout_elements, id)
    }

    /// Every layout element, parents before children, in document order.
    pub fn descendants(&self) -> Vec<&LayoutElement> {
        let mut out = Vec::new();
        collect_descendants(&self.layout_elements, &mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.layout_elements.is_empty()
    }

    /// Compares top-level elements (with everything they contain) only;
    /// the layout's own box is derived and ignored.
    pub fn is_sublayout(&self, other: &Layout) -> bool {
        self.layout_elements.is_subset(&other.layout_elements)
    }

    pub fn to_builder(&self) -> LayoutBuilder {
        LayoutBuilder {
            position: self.position,
            width: self.width,
            height: self.height,
            style: self.style.clone(),
            layout_elements: self.layout_elements.thawed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;
    use crate::error::Error;

    fn process_node(direction: Direction, left_to_right: bool) -> NodeLayout {
        let mut node = NodeLayout::new(UniqueId::new("p1"), NodeKind::Process(ProcessKind::GenericProcess));
        node.set_bbox(BBox {
            x: 100.0,
            y: 50.0,
            w: 20.0,
            h: 20.0,
        });
        node.connectors = Some(Connectors {
            direction,
            left_to_right,
            left_connector_length: 12.0,
            right_connector_length: 8.0,
        });
        node
    }

    #[test]
    fn test_connector_tips_horizontal() {
        let node = process_node(Direction::Horizontal, true);
        let input = node.input_tip().unwrap();
        let output = node.output_tip().unwrap();
        assert!(approx_eq!(f64, input.x, 88.0));
        assert!(approx_eq!(f64, input.y, 60.0));
        assert!(approx_eq!(f64, output.x, 128.0));
    }

    #[test]
    fn test_connector_tips_vertical_right_to_left() {
        let node = process_node(Direction::Vertical, false);
        let input = node.input_tip().unwrap();
        let output = node.output_tip().unwrap();
        assert!(approx_eq!(f64, input.y, 78.0));
        assert!(approx_eq!(f64, output.y, 38.0));
        assert!(approx_eq!(f64, output.x, 110.0));
    }

    #[test]
    fn test_only_connector_shapes_get_default_connectors() {
        let process = NodeLayout::new(UniqueId::new("p"), NodeKind::Process(ProcessKind::Association));
        let phenotype = NodeLayout::new(UniqueId::new("ph"), NodeKind::Process(ProcessKind::Phenotype));
        let macromolecule = NodeLayout::new(
            UniqueId::new("m"),
            NodeKind::EntityPool(EntityPoolKind::Macromolecule),
        );
        assert_eq!(process.connectors, Some(Connectors::default()));
        assert!(phenotype.connectors.is_none());
        assert!(macromolecule.connectors.is_none());
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#FFFFFF"), Some(Color::WHITE));
        let translucent = Color::from_hex("#ff000080").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#ff000080");
        assert_eq!(Color::rgb(1, 2, 255).to_hex(), "#0102ff");
        assert!(Color::from_hex("red").is_none());
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn test_find_and_fit() {
        let mut builder = LayoutBuilder::new();
        let mut parent = NodeLayout::new(
            UniqueId::new("m1"),
            NodeKind::EntityPool(EntityPoolKind::Macromolecule),
        );
        parent.set_bbox(BBox {
            x: 10.0,
            y: 10.0,
            w: 60.0,
            h: 30.0,
        });
        let mut child = NodeLayout::new(UniqueId::new("sv1"), NodeKind::StateVariable);
        child.set_bbox(BBox {
            x: 60.0,
            y: 0.0,
            w: 20.0,
            h: 20.0,
        });
        parent.layout_elements.add_element(child.into()).unwrap();
        builder.add_element(parent).unwrap();
        builder.fit(5.0, 5.0);

        assert!(builder.find("sv1").is_some());
        let layout = builder.finalize();
        let bbox = layout.bbox();
        assert!(approx_eq!(f64, bbox.x, 5.0));
        assert!(approx_eq!(f64, bbox.y, -5.0));
        assert!(approx_eq!(f64, bbox.w, 80.0));
        assert!(approx_eq!(f64, bbox.h, 50.0));
        assert_eq!(layout.descendants().len(), 2);
    }

    #[test]
    fn test_finalized_layout_is_frozen() {
        let mut builder = LayoutBuilder::new();
        let node = builder.new_node(NodeKind::Compartment);
        builder.add_element(node).unwrap();
        let layout = builder.finalize();

        let mut elements = layout.layout_elements().clone();
        let extra = NodeLayout::new(UniqueId::new("x"), NodeKind::Tag);
        assert!(matches!(
            elements.add_element(extra.into()),
            Err(Error::ImmutableElement { .. })
        ));
        assert!(layout.to_builder().add_element(NodeLayout::new(UniqueId::new("x"), NodeKind::Tag)).is_ok());
    }

    #[test]
    fn test_finalize_freezes_nested_layout_elements() {
        let mut builder = LayoutBuilder::new();
        let mut process = builder.new_node(NodeKind::Process(ProcessKind::GenericProcess));
        let process_id = process.id.clone();
        let mut arc = builder.new_arc(ArcKind::Consumption);
        arc.target = Some(UniqueId::new("e1"));
        process.layout_elements.add_element(arc.into()).unwrap();
        builder.add_element(process).unwrap();
        let layout = builder.finalize();

        let node = layout.find(process_id.as_str()).and_then(LayoutElement::as_node).unwrap();
        let arc = node.layout_elements.iter().next().and_then(LayoutElement::as_arc).unwrap();
        assert!(arc.kind.is_inverted());
        assert!(arc.layout_elements.is_frozen());
        let mut children = node.layout_elements.clone();
        assert!(matches!(
            children.add_element(NodeLayout::new(UniqueId::new("c"), NodeKind::Cardinality).into()),
            Err(Error::ImmutableElement { .. })
        ));

        let editable = layout.to_builder();
        let node = editable.find(process_id.as_str()).and_then(LayoutElement::as_node).unwrap();
        let mut children = node.layout_elements.clone();
        assert!(children
            .add_element(NodeLayout::new(UniqueId::new("c"), NodeKind::Cardinality).into())
            .unwrap()
            .is_none());
    }
}
