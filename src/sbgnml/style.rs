//! `renderInformation` extension: colour definitions and styles keyed by
//! element ids, read onto layout elements and written back deduplicated.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;
use roxmltree::Node;

use crate::{
    error::Result,
    layout::{Color, Style, TextLayout},
    xml::{self, XmlWriter},
};

pub const RENDER_NAMESPACE: &str = "http://www.sbml.org/sbml/level3/version1/render/version1";

/// Render attributes of one document element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSpec {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<Color>,
}

impl StyleSpec {
    pub fn apply_to_style(&self, style: &mut Style) {
        if self.fill.is_some() {
            style.fill = self.fill;
        }
        if self.stroke.is_some() {
            style.stroke = self.stroke;
        }
        if self.stroke_width.is_some() {
            style.stroke_width = self.stroke_width;
        }
    }

    pub fn apply_to_label(&self, label: &mut TextLayout) {
        if self.font_family.is_some() {
            label.font_family.clone_from(&self.font_family);
        }
        if self.font_size.is_some() {
            label.font_size = self.font_size;
        }
        if self.font_color.is_some() {
            label.font_color = self.font_color;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderInformation {
    pub background: Option<Color>,
    styles: HashMap<String, StyleSpec>,
}

impl RenderInformation {
    pub fn style_for(&self, id: &str) -> Option<&StyleSpec> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// `renderInformation` under the map's `<extension>`, if any. Colour
/// references that are neither a definition id nor a hex value are
/// ignored, as are unparsable widths and sizes.
pub fn read_render_information(map: &Node) -> Option<RenderInformation> {
    let render = xml::child(map, "extension").and_then(|extension| xml::child(&extension, "renderInformation"))?;

    let mut definitions = HashMap::new();
    if let Some(list) = xml::child(&render, "listOfColorDefinitions") {
        for definition in xml::children(&list, "colorDefinition") {
            if let (Some(id), Some(color)) = (
                definition.attribute("id"),
                definition.attribute("value").and_then(Color::from_hex),
            ) {
                definitions.insert(id, color);
            }
        }
    }
    let color = |value: Option<&str>| {
        let value = value?;
        definitions.get(value).copied().or_else(|| Color::from_hex(value))
    };

    let mut info = RenderInformation {
        background: color(render.attribute("backgroundColor")),
        styles: HashMap::new(),
    };
    if let Some(list) = xml::child(&render, "listOfStyles") {
        for style in xml::children(&list, "style") {
            let Some(g) = xml::child(&style, "g") else {
                continue;
            };
            let spec = StyleSpec {
                fill: color(g.attribute("fill")),
                stroke: color(g.attribute("stroke")),
                stroke_width: xml::parse_f64(g.attribute("strokeWidth")),
                font_family: g.attribute("fontFamily").map(str::to_string),
                font_size: xml::parse_f64(g.attribute("fontSize")),
                font_color: color(g.attribute("fontColor")),
            };
            for id in style.attribute("idList").unwrap_or_default().split_whitespace() {
                info.styles.insert(id.to_string(), spec.clone());
            }
        }
    }
    debug!(styled = info.styles.len(), colors = definitions.len(); "Read render information");
    Some(info)
}

/// Normalized style of one element. Numbers are compared in their
/// written form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct StyleKey {
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: Option<String>,
    font_family: Option<String>,
    font_size: Option<String>,
    font_color: Option<Color>,
}

impl StyleKey {
    fn of(style: &Style, label: Option<&TextLayout>) -> Self {
        Self {
            fill: style.fill,
            stroke: style.stroke,
            stroke_width: style.stroke_width.map(xml::format_number),
            font_family: label.and_then(|label| label.font_family.clone()),
            font_size: label.and_then(|label| label.font_size).map(xml::format_number),
            font_color: label.and_then(|label| label.font_color),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Groups written elements by identical style and interns colours.
#[derive(Debug, Default)]
pub struct StyleIndex {
    background: Option<Color>,
    colors: IndexMap<Color, String>,
    styles: IndexMap<StyleKey, Vec<String>>,
}

impl StyleIndex {
    pub fn new(background: Option<Color>) -> Self {
        Self {
            background,
            ..Self::default()
        }
    }

    pub fn add(&mut self, id: &str, style: &Style, label: Option<&TextLayout>) {
        let key = StyleKey::of(style, label);
        if key.is_empty() {
            return;
        }
        for color in [key.fill, key.stroke, key.font_color].into_iter().flatten() {
            let next = self.colors.len() + 1;
            self.colors.entry(color).or_insert_with(|| format!("color_{next}"));
        }
        self.styles.entry(key).or_default().push(id.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.background.is_none()
    }

    fn color_ref(&self, color: Option<Color>) -> Option<&str> {
        self.colors.get(&color?).map(String::as_str)
    }

    /// Write the `<renderInformation>` element.
    pub(crate) fn write(&self, writer: &mut XmlWriter) -> Result<()> {
        let background = self.background.map(Color::to_hex);
        let mut attrs = vec![
            ("xmlns", RENDER_NAMESPACE),
            ("id", "renderInformation"),
            ("programName", env!("CARGO_PKG_NAME")),
            ("programVersion", env!("CARGO_PKG_VERSION")),
        ];
        if let Some(background) = &background {
            attrs.push(("backgroundColor", background.as_str()));
        }
        xml::write_start(writer, "renderInformation", &attrs)?;

        xml::write_start(writer, "listOfColorDefinitions", &[])?;
        for (color, id) in &self.colors {
            let value = color.to_hex();
            xml::write_empty(writer, "colorDefinition", &[("id", id.as_str()), ("value", value.as_str())])?;
        }
        xml::write_end(writer, "listOfColorDefinitions")?;

        xml::write_start(writer, "listOfStyles", &[])?;
        for (index, (key, ids)) in self.styles.iter().enumerate() {
            let style_id = format!("style_{}", index + 1);
            let id_list = ids.join(" ");
            xml::write_start(writer, "style", &[("id", style_id.as_str()), ("idList", id_list.as_str())])?;

            let mut g = Vec::new();
            if let Some(fill) = self.color_ref(key.fill) {
                g.push(("fill", fill));
            }
            if let Some(stroke) = self.color_ref(key.stroke) {
                g.push(("stroke", stroke));
            }
            if let Some(width) = &key.stroke_width {
                g.push(("strokeWidth", width.as_str()));
            }
            if let Some(family) = &key.font_family {
                g.push(("fontFamily", family.as_str()));
            }
            if let Some(size) = &key.font_size {
                g.push(("fontSize", size.as_str()));
            }
            if let Some(color) = self.color_ref(key.font_color) {
                g.push(("fontColor", color));
            }
            xml::write_empty(writer, "g", &g)?;
            xml::write_end(writer, "style")?;
        }
        xml::write_end(writer, "listOfStyles")?;

        debug!(styles = self.styles.len(), colors = self.colors.len(); "Wrote render information");
        xml::write_end(writer, "renderInformation")
    }
}
