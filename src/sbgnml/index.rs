//! First pass over a `<map>`: every id, the glyph behind every port, the
//! arcs attached to every glyph, and the glyphs grouped by what they will
//! be built into.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};
use roxmltree::Node;

use super::class::{self, ArcClass, GlyphClass};
use crate::{
    element::UniqueId,
    error::{DiagnosticKind, Diagnostics, Error, Result},
    model::{ActivityKind, Dialect, EntityPoolKind, OperatorKind, ProcessKind},
    xml,
};

/// What a document id names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentElement {
    Glyph { class: String },
    Arc { class: String },
    /// A port, with the id of the glyph carrying it.
    Port { glyph: UniqueId },
}

pub type IdIndex = BTreeMap<UniqueId, DocumentElement>;

/// An arc whose ends have been resolved to glyph ids (ports replaced by
/// the glyph carrying them).
#[derive(Debug, Clone, Copy)]
pub struct IndexedArc<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub class: ArcClass,
    pub source: &'a str,
    pub target: &'a str,
}

pub struct SbgnmlIndex<'a, 'input> {
    elements: HashMap<&'a str, Node<'a, 'input>>,
    port_owners: HashMap<&'a str, Node<'a, 'input>>,
    glyph_classes: HashMap<&'a str, GlyphClass>,
    arcs_by_glyph: HashMap<&'a str, Vec<IndexedArc<'a, 'input>>>,
    pub compartments: Vec<Node<'a, 'input>>,
    pub entity_pools: Vec<(Node<'a, 'input>, EntityPoolKind)>,
    pub activities: Vec<(Node<'a, 'input>, ActivityKind)>,
    pub logical_operators: Vec<(Node<'a, 'input>, OperatorKind)>,
    pub submaps: Vec<Node<'a, 'input>>,
    pub phenotypes: Vec<Node<'a, 'input>>,
    pub tags: Vec<Node<'a, 'input>>,
    pub processes: Vec<(Node<'a, 'input>, ProcessKind)>,
    pub modulations: Vec<IndexedArc<'a, 'input>>,
}

fn line_of(node: &Node) -> u32 {
    node.document().text_pos_at(node.range().start).row
}

impl<'a, 'input> SbgnmlIndex<'a, 'input> {
    pub fn build(map: &Node<'a, 'input>, dialect: Dialect, diagnostics: &mut Diagnostics) -> Result<Self> {
        let mut index = Self {
            elements: HashMap::new(),
            port_owners: HashMap::new(),
            glyph_classes: HashMap::new(),
            arcs_by_glyph: HashMap::new(),
            compartments: Vec::new(),
            entity_pools: Vec::new(),
            activities: Vec::new(),
            logical_operators: Vec::new(),
            submaps: Vec::new(),
            phenotypes: Vec::new(),
            tags: Vec::new(),
            processes: Vec::new(),
            modulations: Vec::new(),
        };
        let mut skipped = HashSet::new();

        for glyph in xml::children(map, "glyph") {
            let class_name = glyph.attribute("class").unwrap_or_default();
            let Some(glyph_class) = class::glyph_class(dialect, class_name) else {
                diagnostics.record(
                    DiagnosticKind::UnknownClassValue,
                    glyph.attribute("id"),
                    format!("line {}: unknown glyph class `{class_name}`", line_of(&glyph)),
                );
                collect_ids(&glyph, &mut skipped);
                continue;
            };
            index.add_glyph(glyph, glyph_class);
        }

        for arc in xml::children(map, "arc") {
            index.add_arc(arc, dialect, &skipped, diagnostics)?;
        }

        debug!(
            elements = index.elements.len(),
            ports = index.port_owners.len(),
            modulations = index.modulations.len();
            "Indexed SBGN-ML map"
        );
        Ok(index)
    }

    fn add_glyph(&mut self, glyph: Node<'a, 'input>, glyph_class: GlyphClass) {
        match glyph_class {
            GlyphClass::Compartment => self.compartments.push(glyph),
            GlyphClass::Submap => self.submaps.push(glyph),
            GlyphClass::Tag => self.tags.push(glyph),
            GlyphClass::EntityPool(kind) => self.entity_pools.push((glyph, kind)),
            GlyphClass::Activity(kind) => self.activities.push((glyph, kind)),
            GlyphClass::Process(ProcessKind::Phenotype) => self.phenotypes.push(glyph),
            GlyphClass::Process(kind) => self.processes.push((glyph, kind)),
            GlyphClass::LogicalOperator(kind) => self.logical_operators.push((glyph, kind)),
        }
        if let Some(id) = glyph.attribute("id") {
            trace!(id = id, class:? = glyph_class; "Indexed glyph");
            self.elements.insert(id, glyph);
            self.glyph_classes.insert(id, glyph_class);
        }
        self.add_nested(&glyph, glyph);
    }

    /// Sub-glyphs at any depth, and the ports of `owner` and of its
    /// sub-glyphs.
    fn add_nested(&mut self, node: &Node<'a, 'input>, owner: Node<'a, 'input>) {
        for port in xml::children(node, "port") {
            if let Some(id) = port.attribute("id") {
                self.port_owners.insert(id, owner);
            }
        }
        for subglyph in xml::children(node, "glyph") {
            if let Some(id) = subglyph.attribute("id") {
                self.elements.insert(id, subglyph);
            }
            self.add_nested(&subglyph, subglyph);
        }
    }

    fn add_arc(
        &mut self,
        arc: Node<'a, 'input>,
        dialect: Dialect,
        skipped: &HashSet<&'a str>,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let id = arc.attribute("id").unwrap_or_default();
        let class_name = arc.attribute("class").unwrap_or_default();
        let Some(arc_class) = class::arc_class(dialect, class_name) else {
            diagnostics.record(
                DiagnosticKind::UnknownClassValue,
                Some(id),
                format!("line {}: unknown arc class `{class_name}`", line_of(&arc)),
            );
            return Ok(());
        };
        let (Some(source), Some(target)) = (arc.attribute("source"), arc.attribute("target")) else {
            return Err(Error::malformed(format!(
                "arc `{id}` at line {} lacks a source or a target",
                line_of(&arc)
            )));
        };
        if skipped.contains(source) || skipped.contains(target) {
            diagnostics.record(
                DiagnosticKind::UnknownClassValue,
                Some(id),
                "arc attached to a glyph of unknown class",
            );
            return Ok(());
        }
        let source = self.resolve_id(source).ok_or_else(|| Error::unresolved(id, source))?;
        let target = self.resolve_id(target).ok_or_else(|| Error::unresolved(id, target))?;
        let indexed = IndexedArc {
            node: arc,
            class: arc_class,
            source,
            target,
        };

        if !id.is_empty() {
            self.elements.insert(id, arc);
        }
        for subglyph in xml::children(&arc, "glyph") {
            if let Some(subglyph_id) = subglyph.attribute("id") {
                self.elements.insert(subglyph_id, subglyph);
            }
        }
        self.arcs_by_glyph.entry(source).or_default().push(indexed);
        if target != source {
            self.arcs_by_glyph.entry(target).or_default().push(indexed);
        }
        if matches!(arc_class, ArcClass::Modulation(_)) {
            self.modulations.push(indexed);
        }
        Ok(())
    }

    /// Id of the glyph named by `id`, looking through ports.
    fn resolve_id(&self, id: &str) -> Option<&'a str> {
        let node = match self.elements.get(id) {
            Some(node) if node.has_tag_name("glyph") => node,
            _ => self.port_owners.get(id)?,
        };
        node.attribute("id")
    }

    pub fn get(&self, id: &str) -> Option<Node<'a, 'input>> {
        self.elements.get(id).copied()
    }

    pub fn glyph_class(&self, id: &str) -> Option<GlyphClass> {
        self.glyph_classes.get(id).copied()
    }

    /// Arcs with `id` at either end, in document order.
    pub fn arcs_of(&self, id: &str) -> &[IndexedArc<'a, 'input>] {
        self.arcs_by_glyph.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Arcs of `class` that end on `id`.
    pub fn arcs_into(&self, id: &str, class: ArcClass) -> impl Iterator<Item = &IndexedArc<'a, 'input>> + '_ {
        let id = id.to_string();
        self.arcs_of(&id)
            .iter()
            .filter(move |arc| arc.class == class && arc.target == id)
    }

    /// Every indexed id with what it names.
    pub fn id_index(&self) -> IdIndex {
        let mut ids = IdIndex::new();
        for (id, node) in &self.elements {
            let class = node.attribute("class").unwrap_or_default().to_string();
            let element = if node.has_tag_name("arc") {
                DocumentElement::Arc { class }
            } else {
                DocumentElement::Glyph { class }
            };
            ids.insert(UniqueId::new(*id), element);
        }
        for (id, owner) in &self.port_owners {
            let glyph = UniqueId::new(owner.attribute("id").unwrap_or_default());
            ids.insert(UniqueId::new(*id), DocumentElement::Port { glyph });
        }
        ids
    }
}

fn collect_ids<'a>(node: &Node<'a, '_>, ids: &mut HashSet<&'a str>) {
    if let Some(id) = node.attribute("id") {
        ids.insert(id);
    }
    for child in node.children().filter(|child| child.has_tag_name("glyph") || child.has_tag_name("port")) {
        collect_ids(&child, ids);
    }
}

#[cfg(test)]
mod tests {
    use roxmltree::Document;

    use super::*;

    const MAP: &str = r#"<sbgn xmlns="http://sbgn.org/libsbgn/0.3"><map language="process description">
        <glyph id="e1" class="simple chemical"><bbox x="0" y="0" w="20" h="20"/>
          <glyph id="sv1" class="state variable"><bbox x="0" y="0" w="5" h="5"/></glyph>
        </glyph>
        <glyph id="p1" class="process"><bbox x="100" y="50" w="20" h="20"/>
          <port id="p1.1" x="90" y="60"/><port id="p1.2" x="130" y="60"/>
        </glyph>
        <glyph id="x1" class="annotation"><bbox x="0" y="0" w="1" h="1"/></glyph>
        <glyph id="e2" class="macromolecule"><bbox x="200" y="0" w="20" h="20"/></glyph>
        <arc id="a1" class="consumption" source="e1" target="p1.1"><start x="20" y="10"/><end x="90" y="60"/></arc>
        <arc id="a2" class="catalysis" source="e2" target="p1"><start x="200" y="10"/><end x="110" y="50"/></arc>
        <arc id="a3" class="assignment" source="e2" target="p1"><start x="0" y="0"/><end x="1" y="1"/></arc>
        <arc id="a4" class="catalysis" source="x1" target="p1"><start x="0" y="0"/><end x="1" y="1"/></arc>
    </map></sbgn>"#;

    fn build(source: &str) -> (Result<Vec<String>>, Vec<String>) {
        let doc = Document::parse(source).unwrap();
        let map = doc.root_element().first_element_child().unwrap();
        let mut diagnostics = Diagnostics::default();
        let result = SbgnmlIndex::build(&map, Dialect::ProcessDescription, &mut diagnostics).map(|index| {
            let mut facts = vec![
                format!("pools={}", index.entity_pools.len()),
                format!("processes={}", index.processes.len()),
                format!("modulations={}", index.modulations.len()),
            ];
            for arc in index.arcs_of("p1") {
                facts.push(format!("{}:{}->{}", arc.node.attribute("id").unwrap(), arc.source, arc.target));
            }
            facts.push(format!("sv1={}", index.get("sv1").is_some()));
            facts.push(format!("port={:?}", index.id_index().get("p1.1")));
            facts
        });
        let diagnostics = diagnostics.into_vec().into_iter().map(|d| d.element.unwrap_or_default()).collect();
        (result, diagnostics)
    }

    #[test]
    fn test_ports_resolve_to_their_glyph() {
        let (facts, diagnostics) = build(MAP);
        let facts = facts.unwrap();
        assert!(facts.contains(&"pools=2".to_string()));
        assert!(facts.contains(&"processes=1".to_string()));
        assert!(facts.contains(&"modulations=1".to_string()));
        assert!(facts.contains(&"a1:e1->p1".to_string()));
        assert!(facts.contains(&"a2:e2->p1".to_string()));
        assert!(facts.contains(&"sv1=true".to_string()));
        assert!(facts.contains(&format!(
            "port={:?}",
            Some(&DocumentElement::Port { glyph: UniqueId::new("p1") })
        )));
        assert_eq!(diagnostics, vec!["x1", "a3", "a4"]);
    }

    #[test]
    fn test_dangling_arc_is_unresolved() {
        let source = MAP.replace(r#"source="e1""#, r#"source="missing""#);
        let (result, _) = build(&source);
        assert!(matches!(
            result,
            Err(Error::UnresolvedReference { element, reference }) if element == "a1" && reference == "missing"
        ));
    }
}
