//! `class` attribute values and the element kinds they stand for.

use super::SbgnmlVersion;
use crate::{
    layout::{ArcKind, NodeKind},
    model::{ActivityKind, Dialect, EntityPoolKind, ModulationKind, OperatorKind, ProcessKind, UnitEntityKind},
};

/// Kind of a glyph placed directly in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphClass {
    Compartment,
    Submap,
    Tag,
    EntityPool(EntityPoolKind),
    Activity(ActivityKind),
    Process(ProcessKind),
    LogicalOperator(OperatorKind),
}

/// Kind of a glyph nested in another glyph or in an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubglyphClass {
    StateVariable,
    UnitOfInformation(Option<UnitEntityKind>),
    Subunit(EntityPoolKind),
    Terminal,
    Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcClass {
    Consumption,
    Production,
    Modulation(ModulationKind),
    Logic,
    Equivalence,
}

fn entity_pool_kind(class: &str) -> Option<EntityPoolKind> {
    let kind = match class {
        "unspecified entity" => EntityPoolKind::UnspecifiedEntity,
        "simple chemical" => EntityPoolKind::SimpleChemical,
        "simple chemical multimer" => EntityPoolKind::SimpleChemicalMultimer,
        "macromolecule" => EntityPoolKind::Macromolecule,
        "macromolecule multimer" => EntityPoolKind::MacromoleculeMultimer,
        "nucleic acid feature" => EntityPoolKind::NucleicAcidFeature,
        "nucleic acid feature multimer" => EntityPoolKind::NucleicAcidFeatureMultimer,
        "complex" => EntityPoolKind::Complex,
        "complex multimer" => EntityPoolKind::ComplexMultimer,
        "source and sink" | "empty set" => EntityPoolKind::EmptySet,
        "perturbing agent" => EntityPoolKind::PerturbingAgent,
        _ => return None,
    };
    Some(kind)
}

fn operator_kind(dialect: Dialect, class: &str) -> Option<OperatorKind> {
    match (dialect, class) {
        (_, "and") => Some(OperatorKind::And),
        (_, "or") => Some(OperatorKind::Or),
        (_, "not") => Some(OperatorKind::Not),
        (Dialect::ActivityFlow, "delay") => Some(OperatorKind::Delay),
        (Dialect::ProcessDescription, "equivalence") => Some(OperatorKind::Equivalence),
        _ => None,
    }
}

fn unit_entity_kind(name: &str) -> Option<UnitEntityKind> {
    let kind = match name {
        "unspecified entity" => UnitEntityKind::UnspecifiedEntity,
        "macromolecule" => UnitEntityKind::Macromolecule,
        "nucleic acid feature" => UnitEntityKind::NucleicAcidFeature,
        "simple chemical" => UnitEntityKind::SimpleChemical,
        "complex" => UnitEntityKind::Complex,
        "perturbation" => UnitEntityKind::Perturbation,
        _ => return None,
    };
    Some(kind)
}

pub fn glyph_class(dialect: Dialect, class: &str) -> Option<GlyphClass> {
    match class {
        "compartment" => return Some(GlyphClass::Compartment),
        "submap" => return Some(GlyphClass::Submap),
        "tag" => return Some(GlyphClass::Tag),
        _ => {}
    }
    if let Some(kind) = operator_kind(dialect, class) {
        return Some(GlyphClass::LogicalOperator(kind));
    }
    match dialect {
        Dialect::ProcessDescription => {
            let kind = match class {
                "process" => ProcessKind::GenericProcess,
                "omitted process" => ProcessKind::OmittedProcess,
                "uncertain process" => ProcessKind::UncertainProcess,
                "association" => ProcessKind::Association,
                "dissociation" => ProcessKind::Dissociation,
                "phenotype" => ProcessKind::Phenotype,
                _ => return entity_pool_kind(class).map(GlyphClass::EntityPool),
            };
            Some(GlyphClass::Process(kind))
        }
        Dialect::ActivityFlow => match class {
            "biological activity" => Some(GlyphClass::Activity(ActivityKind::BiologicalActivity)),
            "phenotype" => Some(GlyphClass::Activity(ActivityKind::Phenotype)),
            _ => None,
        },
    }
}

/// `entity` is the `name` of an `<entity>` child, carried by Activity
/// Flow units of information.
pub fn subglyph_class(dialect: Dialect, class: &str, entity: Option<&str>) -> Option<SubglyphClass> {
    match (dialect, class) {
        (_, "terminal") => Some(SubglyphClass::Terminal),
        (_, "unit of information") => match (dialect, entity) {
            (Dialect::ActivityFlow, Some(name)) => {
                unit_entity_kind(name).map(|kind| SubglyphClass::UnitOfInformation(Some(kind)))
            }
            (Dialect::ActivityFlow, None) | (Dialect::ProcessDescription, _) => {
                Some(SubglyphClass::UnitOfInformation(None))
            }
        },
        (Dialect::ProcessDescription, "state variable") => Some(SubglyphClass::StateVariable),
        (Dialect::ProcessDescription, "cardinality" | "stoichiometry") => Some(SubglyphClass::Cardinality),
        (Dialect::ProcessDescription, _) => entity_pool_kind(class)
            .filter(|kind| kind.can_be_subunit())
            .map(SubglyphClass::Subunit),
        (Dialect::ActivityFlow, _) => None,
    }
}

pub fn arc_class(dialect: Dialect, class: &str) -> Option<ArcClass> {
    let common = match class {
        "logic arc" => Some(ArcClass::Logic),
        "equivalence arc" => Some(ArcClass::Equivalence),
        "necessary stimulation" => Some(ArcClass::Modulation(ModulationKind::NecessaryStimulation)),
        _ => None,
    };
    if common.is_some() {
        return common;
    }
    let kind = match (dialect, class) {
        (Dialect::ProcessDescription, "consumption") => return Some(ArcClass::Consumption),
        (Dialect::ProcessDescription, "production") => return Some(ArcClass::Production),
        (Dialect::ProcessDescription, "modulation") => ModulationKind::Modulation,
        (Dialect::ProcessDescription, "stimulation") => ModulationKind::Stimulation,
        (Dialect::ProcessDescription, "catalysis") => ModulationKind::Catalysis,
        (Dialect::ProcessDescription, "inhibition") => ModulationKind::Inhibition,
        (Dialect::ActivityFlow, "positive influence") => ModulationKind::PositiveInfluence,
        (Dialect::ActivityFlow, "negative influence") => ModulationKind::NegativeInfluence,
        (Dialect::ActivityFlow, "unknown influence") => ModulationKind::UnknownInfluence,
        _ => return None,
    };
    Some(ArcClass::Modulation(kind))
}

fn entity_pool_class(kind: EntityPoolKind, version: SbgnmlVersion) -> &'static str {
    match kind {
        EntityPoolKind::UnspecifiedEntity => "unspecified entity",
        EntityPoolKind::SimpleChemical => "simple chemical",
        EntityPoolKind::SimpleChemicalMultimer => "simple chemical multimer",
        EntityPoolKind::Macromolecule => "macromolecule",
        EntityPoolKind::MacromoleculeMultimer => "macromolecule multimer",
        EntityPoolKind::NucleicAcidFeature => "nucleic acid feature",
        EntityPoolKind::NucleicAcidFeatureMultimer => "nucleic acid feature multimer",
        EntityPoolKind::Complex => "complex",
        EntityPoolKind::ComplexMultimer => "complex multimer",
        EntityPoolKind::EmptySet => match version {
            SbgnmlVersion::V0_2 => "source and sink",
            SbgnmlVersion::V0_3 => "empty set",
        },
        EntityPoolKind::PerturbingAgent => "perturbing agent",
    }
}

/// Class written for a node layout, or `None` when the kind has no
/// counterpart in `dialect`.
pub fn node_class(kind: NodeKind, dialect: Dialect, version: SbgnmlVersion) -> Option<&'static str> {
    use Dialect::{ActivityFlow as Af, ProcessDescription as Pd};

    let class = match (kind, dialect) {
        (NodeKind::Compartment, _) => "compartment",
        (NodeKind::Submap, _) => "submap",
        (NodeKind::Tag, _) => "tag",
        (NodeKind::Terminal, _) => "terminal",
        (NodeKind::UnitOfInformation(None), _) => "unit of information",
        (NodeKind::UnitOfInformation(Some(_)), Af) => "unit of information",
        (NodeKind::UnitOfInformation(Some(_)), Pd) => return None,
        (NodeKind::EntityPool(kind), Pd) => entity_pool_class(kind, version),
        (NodeKind::Subunit(kind), Pd) if kind.can_be_subunit() => entity_pool_class(kind, version),
        (NodeKind::StateVariable, Pd) => "state variable",
        (NodeKind::Cardinality, Pd) => match version {
            SbgnmlVersion::V0_2 => "cardinality",
            SbgnmlVersion::V0_3 => "stoichiometry",
        },
        (NodeKind::Process(kind), Pd) => match kind {
            ProcessKind::GenericProcess => "process",
            ProcessKind::UncertainProcess => "uncertain process",
            ProcessKind::OmittedProcess => "omitted process",
            ProcessKind::Association => "association",
            ProcessKind::Dissociation => "dissociation",
            ProcessKind::Phenotype => "phenotype",
        },
        (NodeKind::Activity(kind), Af) => match kind {
            ActivityKind::BiologicalActivity => "biological activity",
            ActivityKind::Phenotype => "phenotype",
        },
        (NodeKind::LogicalOperator(kind), _) => match (kind, dialect) {
            (OperatorKind::And, _) => "and",
            (OperatorKind::Or, _) => "or",
            (OperatorKind::Not, _) => "not",
            (OperatorKind::Delay, Af) => "delay",
            (OperatorKind::Equivalence, Pd) => "equivalence",
            (OperatorKind::Delay, Pd) | (OperatorKind::Equivalence, Af) => return None,
        },
        (
            NodeKind::EntityPool(_)
            | NodeKind::Subunit(_)
            | NodeKind::StateVariable
            | NodeKind::Cardinality
            | NodeKind::Process(_),
            Af,
        )
        | (NodeKind::Subunit(_), Pd)
        | (NodeKind::Activity(_), Pd) => return None,
    };
    Some(class)
}

pub fn arc_class_name(kind: ArcKind, dialect: Dialect) -> Option<&'static str> {
    use Dialect::{ActivityFlow as Af, ProcessDescription as Pd};

    let class = match (kind, dialect) {
        (ArcKind::Logic, _) => "logic arc",
        (ArcKind::Equivalence, _) => "equivalence arc",
        (ArcKind::Consumption, Pd) => "consumption",
        (ArcKind::Production, Pd) => "production",
        (ArcKind::Modulation(kind), _) => match (kind, dialect) {
            (ModulationKind::NecessaryStimulation, _) => "necessary stimulation",
            (ModulationKind::Modulation, Pd) => "modulation",
            (ModulationKind::Stimulation, Pd) => "stimulation",
            (ModulationKind::Catalysis, Pd) => "catalysis",
            (ModulationKind::Inhibition, Pd) => "inhibition",
            (ModulationKind::PositiveInfluence, Af) => "positive influence",
            (ModulationKind::NegativeInfluence, Af) => "negative influence",
            (ModulationKind::UnknownInfluence, Af) => "unknown influence",
            _ => return None,
        },
        (ArcKind::Consumption | ArcKind::Production, Af) => return None,
    };
    Some(class)
}

pub fn unit_entity_name(kind: UnitEntityKind) -> &'static str {
    match kind {
        UnitEntityKind::UnspecifiedEntity => "unspecified entity",
        UnitEntityKind::Macromolecule => "macromolecule",
        UnitEntityKind::NucleicAcidFeature => "nucleic acid feature",
        UnitEntityKind::SimpleChemical => "simple chemical",
        UnitEntityKind::Complex => "complex",
        UnitEntityKind::Perturbation => "perturbation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PD: Dialect = Dialect::ProcessDescription;
    const AF: Dialect = Dialect::ActivityFlow;

    #[test]
    fn test_glyph_classes_depend_on_dialect() {
        assert_eq!(
            glyph_class(PD, "phenotype"),
            Some(GlyphClass::Process(ProcessKind::Phenotype))
        );
        assert_eq!(
            glyph_class(AF, "phenotype"),
            Some(GlyphClass::Activity(ActivityKind::Phenotype))
        );
        assert_eq!(
            glyph_class(PD, "source and sink"),
            Some(GlyphClass::EntityPool(EntityPoolKind::EmptySet))
        );
        assert_eq!(glyph_class(PD, "delay"), None);
        assert_eq!(
            glyph_class(PD, "equivalence"),
            Some(GlyphClass::LogicalOperator(OperatorKind::Equivalence))
        );
        assert_eq!(glyph_class(AF, "equivalence"), None);
        assert_eq!(glyph_class(AF, "macromolecule"), None);
        assert_eq!(glyph_class(PD, "annotation"), None);
    }

    #[test]
    fn test_subglyph_classes() {
        assert_eq!(
            subglyph_class(AF, "unit of information", Some("macromolecule")),
            Some(SubglyphClass::UnitOfInformation(Some(UnitEntityKind::Macromolecule)))
        );
        assert_eq!(
            subglyph_class(PD, "complex", None),
            Some(SubglyphClass::Subunit(EntityPoolKind::Complex))
        );
        assert_eq!(subglyph_class(PD, "perturbing agent", None), None);
        assert_eq!(subglyph_class(PD, "stoichiometry", None), Some(SubglyphClass::Cardinality));
        assert_eq!(subglyph_class(AF, "state variable", None), None);
    }

    #[test]
    fn test_arc_classes() {
        assert_eq!(arc_class(PD, "consumption"), Some(ArcClass::Consumption));
        assert_eq!(arc_class(AF, "consumption"), None);
        assert_eq!(
            arc_class(AF, "necessary stimulation"),
            Some(ArcClass::Modulation(ModulationKind::NecessaryStimulation))
        );
        assert_eq!(arc_class(PD, "positive influence"), None);
    }

    #[test]
    fn test_empty_set_class_depends_on_version() {
        let kind = NodeKind::EntityPool(EntityPoolKind::EmptySet);
        assert_eq!(node_class(kind, PD, SbgnmlVersion::V0_2), Some("source and sink"));
        assert_eq!(node_class(kind, PD, SbgnmlVersion::V0_3), Some("empty set"));
    }

    #[test]
    fn test_unwritable_kinds() {
        let activity = NodeKind::Activity(ActivityKind::BiologicalActivity);
        assert_eq!(node_class(activity, PD, SbgnmlVersion::V0_3), None);
        let equivalence = NodeKind::LogicalOperator(OperatorKind::Equivalence);
        assert_eq!(node_class(equivalence, AF, SbgnmlVersion::V0_3), None);
        assert_eq!(node_class(equivalence, PD, SbgnmlVersion::V0_2), Some("equivalence"));
        assert_eq!(arc_class_name(ArcKind::Production, AF), None);
        assert_eq!(
            arc_class_name(ArcKind::Modulation(ModulationKind::Catalysis), AF),
            None
        );
    }

    #[test]
    fn test_written_classes_read_back() {
        let kinds = [
            EntityPoolKind::Macromolecule,
            EntityPoolKind::ComplexMultimer,
            EntityPoolKind::EmptySet,
            EntityPoolKind::PerturbingAgent,
        ];
        for version in [SbgnmlVersion::V0_2, SbgnmlVersion::V0_3] {
            for kind in kinds {
                let class = node_class(NodeKind::EntityPool(kind), PD, version).unwrap();
                assert_eq!(glyph_class(PD, class), Some(GlyphClass::EntityPool(kind)));
            }
        }
    }
}
