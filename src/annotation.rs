//! RDF annotations (`bqbiol:*` / `bqmodel:*` qualifiers) and notes.

use std::collections::{BTreeMap, BTreeSet};

use roxmltree::Node;

use crate::{
    element::UniqueId,
    error::Result,
    xml::{self, XmlWriter},
};

pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const BQBIOL_NAMESPACE: &str = "http://biomodels.net/biology-qualifiers/";
pub const BQMODEL_NAMESPACE: &str = "http://biomodels.net/model-qualifiers/";

/// Annotations of each element, keyed by model element id.
pub type Annotations = BTreeMap<UniqueId, BTreeSet<RdfAnnotation>>;
/// Verbatim notes markup of each element, keyed by model element id.
pub type Notes = BTreeMap<UniqueId, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualifier {
    BiologyEncodes,
    BiologyHasPart,
    BiologyHasProperty,
    BiologyHasVersion,
    BiologyIs,
    BiologyIsDescribedBy,
    BiologyIsEncodedBy,
    BiologyIsHomologTo,
    BiologyIsPartOf,
    BiologyIsPropertyOf,
    BiologyIsVersionOf,
    BiologyOccursIn,
    BiologyHasTaxon,
    BiologyHasInstance,
    ModelIs,
    ModelIsDerivedFrom,
    ModelIsDescribedBy,
    ModelIsInstanceOf,
}

const QUALIFIERS: [(Qualifier, &str, &str); 18] = [
    (Qualifier::BiologyEncodes, BQBIOL_NAMESPACE, "encodes"),
    (Qualifier::BiologyHasPart, BQBIOL_NAMESPACE, "hasPart"),
    (Qualifier::BiologyHasProperty, BQBIOL_NAMESPACE, "hasProperty"),
    (Qualifier::BiologyHasVersion, BQBIOL_NAMESPACE, "hasVersion"),
    (Qualifier::BiologyIs, BQBIOL_NAMESPACE, "is"),
    (Qualifier::BiologyIsDescribedBy, BQBIOL_NAMESPACE, "isDescribedBy"),
    (Qualifier::BiologyIsEncodedBy, BQBIOL_NAMESPACE, "isEncodedBy"),
    (Qualifier::BiologyIsHomologTo, BQBIOL_NAMESPACE, "isHomologTo"),
    (Qualifier::BiologyIsPartOf, BQBIOL_NAMESPACE, "isPartOf"),
    (Qualifier::BiologyIsPropertyOf, BQBIOL_NAMESPACE, "isPropertyOf"),
    (Qualifier::BiologyIsVersionOf, BQBIOL_NAMESPACE, "isVersionOf"),
    (Qualifier::BiologyOccursIn, BQBIOL_NAMESPACE, "occursIn"),
    (Qualifier::BiologyHasTaxon, BQBIOL_NAMESPACE, "hasTaxon"),
    (Qualifier::BiologyHasInstance, BQBIOL_NAMESPACE, "hasInstance"),
    (Qualifier::ModelIs, BQMODEL_NAMESPACE, "is"),
    (Qualifier::ModelIsDerivedFrom, BQMODEL_NAMESPACE, "isDerivedFrom"),
    (Qualifier::ModelIsDescribedBy, BQMODEL_NAMESPACE, "isDescribedBy"),
    (Qualifier::ModelIsInstanceOf, BQMODEL_NAMESPACE, "isInstanceOf"),
];

impl Qualifier {
    pub fn from_tag(namespace: &str, name: &str) -> Option<Self> {
        QUALIFIERS
            .iter()
            .find(|(_, ns, local)| *ns == namespace && *local == name)
            .map(|(qualifier, _, _)| *qualifier)
    }

    /// Namespace and local name of the qualifier element.
    pub fn tag(self) -> (&'static str, &'static str) {
        QUALIFIERS
            .iter()
            .find(|(qualifier, _, _)| *qualifier == self)
            .map(|(_, namespace, name)| (*namespace, *name))
            .unwrap_or((BQBIOL_NAMESPACE, "is"))
    }

    /// Prefixed form used when writing, e.g. `bqbiol:isVersionOf`.
    pub fn prefixed_name(self) -> String {
        let (namespace, name) = self.tag();
        let prefix = if namespace == BQMODEL_NAMESPACE {
            "bqmodel"
        } else {
            "bqbiol"
        };
        format!("{prefix}:{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RdfAnnotation {
    pub qualifier: Qualifier,
    pub resources: BTreeSet<String>,
}

/// Annotations found under `<extension><annotation>` of an SBGN-ML element.
/// One record per `rdf:Bag`; unknown qualifiers are skipped.
pub fn read_annotations(element: &Node) -> Vec<RdfAnnotation> {
    let Some(rdf) = xml::child(element, "extension")
        .and_then(|extension| xml::child(&extension, "annotation"))
        .and_then(|annotation| xml::child(&annotation, "RDF"))
    else {
        return Vec::new();
    };
    let mut annotations = Vec::new();
    for description in xml::children(&rdf, "Description") {
        for qualifier_node in description.children().filter(Node::is_element) {
            let tag = qualifier_node.tag_name();
            let Some(qualifier) = Qualifier::from_tag(tag.namespace().unwrap_or_default(), tag.name())
            else {
                continue;
            };
            for bag in xml::children(&qualifier_node, "Bag") {
                let resources = xml::children(&bag, "li")
                    .filter_map(|li| li.attribute((RDF_NAMESPACE, "resource")))
                    .map(str::to_string)
                    .collect();
                annotations.push(RdfAnnotation { qualifier, resources });
            }
        }
    }
    annotations
}

/// Content of an element's `<notes>` child, verbatim apart from the
/// namespace declarations its elements inherit from outside it.
pub fn read_notes(element: &Node) -> Option<String> {
    let notes = xml::child(element, "notes")?;
    let text = notes.document().input_text();
    let mut markup = String::new();
    for child in notes.children() {
        if child.is_element() {
            markup.push_str(&xml::standalone_source(&child)?);
        } else {
            markup.push_str(text.get(child.range())?);
        }
    }
    let markup = markup.trim();
    (!markup.is_empty()).then(|| markup.to_string())
}

/// `<annotation>` block describing `about`. Nothing is written for an
/// empty set.
pub(crate) fn write_annotation(
    writer: &mut XmlWriter,
    about: &str,
    annotations: &BTreeSet<RdfAnnotation>,
) -> Result<()> {
    if annotations.is_empty() {
        return Ok(());
    }
    xml::write_start(writer, "annotation", &[])?;
    xml::write_start(
        writer,
        "rdf:RDF",
        &[
            ("xmlns:rdf", RDF_NAMESPACE),
            ("xmlns:bqbiol", BQBIOL_NAMESPACE),
            ("xmlns:bqmodel", BQMODEL_NAMESPACE),
        ],
    )?;
    let about = format!("#{about}");
    xml::write_start(writer, "rdf:Description", &[("rdf:about", about.as_str())])?;
    for annotation in annotations {
        let tag = annotation.qualifier.prefixed_name();
        xml::write_start(writer, &tag, &[])?;
        xml::write_start(writer, "rdf:Bag", &[])?;
        for resource in &annotation.resources {
            xml::write_empty(writer, "rdf:li", &[("rdf:resource", resource.as_str())])?;
        }
        xml::write_end(writer, "rdf:Bag")?;
        xml::write_end(writer, &tag)?;
    }
    xml::write_end(writer, "rdf:Description")?;
    xml::write_end(writer, "rdf:RDF")?;
    xml::write_end(writer, "annotation")
}

pub(crate) fn write_notes(writer: &mut XmlWriter, notes: &str) -> Result<()> {
    xml::write_start(writer, "notes", &[])?;
    xml::write_raw(writer, notes)?;
    xml::write_end(writer, "notes")
}
