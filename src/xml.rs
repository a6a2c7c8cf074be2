//! Small helpers over `roxmltree` (reading) and `quick_xml` (writing).

use std::{collections::BTreeSet, io::Cursor};

use quick_xml::{
    escape::escape,
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use roxmltree::Node;

use crate::{
    error::{Error, Result},
    geometry::{BBox, Point},
};

pub(crate) type XmlWriter = Writer<Cursor<Vec<u8>>>;

pub(crate) fn child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(name))
}

pub(crate) fn children<'a, 'input: 'a>(
    node: &Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |child| child.has_tag_name(name))
}

pub(crate) fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

/// Numeric attribute that must be present and well-formed.
pub(crate) fn required_f64(node: &Node, name: &str) -> Result<f64> {
    let value = node.attribute(name);
    parse_f64(value).ok_or_else(|| {
        Error::malformed(format!(
            "<{}> line {}: bad or missing `{name}` ({value:?})",
            node.tag_name().name(),
            node.document().text_pos_at(node.range().start).row,
        ))
    })
}

pub(crate) fn parse_point(node: &Node) -> Result<Point> {
    Ok(Point::new(required_f64(node, "x")?, required_f64(node, "y")?))
}

pub(crate) fn parse_bbox(node: &Node) -> Result<Option<BBox>> {
    let Some(bbox) = child(node, "bbox") else {
        return Ok(None);
    };
    Ok(Some(BBox {
        x: required_f64(&bbox, "x")?,
        y: required_f64(&bbox, "y")?,
        w: required_f64(&bbox, "w")?,
        h: required_f64(&bbox, "h")?,
    }))
}

/// Text of the `<label text=".."/>` child, with carriage returns dropped.
pub(crate) fn label_text(node: &Node) -> Option<String> {
    child(node, "label")
        .and_then(|label| label.attribute("text"))
        .map(|text| text.replace('\r', ""))
}

/// Source of the element `node`, verbatim except that the namespace
/// bindings it uses but inherits from its ancestors are declared on its
/// start tag, so the markup parses on its own.
pub(crate) fn standalone_source(node: &Node) -> Option<String> {
    let text = node.document().input_text();
    let range = node.range();
    let source = text.get(range.clone())?;
    let tag_end = node.first_child().map_or(range.end, |child| child.range().start);
    let start_tag = source.get(..tag_end - range.start)?;
    let name_end = start_tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;

    // Prefixes used in the subtree; `None` stands for the default namespace.
    let mut used = BTreeSet::new();
    for element in node.descendants().filter(Node::is_element) {
        used.insert(element_prefix(text, &element));
        for uri in element.attributes().filter_map(|attribute| attribute.namespace()) {
            used.insert(element.lookup_prefix(uri));
        }
    }
    let mut declarations = String::new();
    for namespace in node.parent_element()?.namespaces() {
        let attribute = match namespace.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        if used.contains(&namespace.name()) && !declares(start_tag, &attribute) {
            declarations.push_str(&format!(r#" {attribute}="{}""#, escape(namespace.uri())));
        }
    }
    Some(format!("{}{declarations}{}", &source[..name_end], &source[name_end..]))
}

fn element_prefix<'input>(text: &'input str, element: &Node) -> Option<&'input str> {
    let tag = text.get(element.range().start + 1..)?;
    let name = &tag[..tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?];
    name.split_once(':').map(|(prefix, _)| prefix)
}

fn declares(start_tag: &str, attribute: &str) -> bool {
    start_tag.match_indices(attribute).any(|(at, _)| {
        let before = start_tag[..at].chars().next_back();
        before.is_some_and(char::is_whitespace) && start_tag[at + attribute.len()..].trim_start().starts_with('=')
    })
}

/// Shortest decimal form, without a trailing `.0` for integers.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub(crate) fn write_start(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem))?;
    Ok(())
}

pub(crate) fn write_empty(writer: &mut XmlWriter, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

pub(crate) fn write_end(writer: &mut XmlWriter, tag: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Write already-serialized markup without escaping it.
pub(crate) fn write_raw(writer: &mut XmlWriter, markup: &str) -> Result<()> {
    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
    Ok(())
}
