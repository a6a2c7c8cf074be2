//! The semantic side of a map: entities, processes, compartments, logical
//! operators and the references between them.
//!
//! Model elements refer to each other by [`UniqueId`]. A [`ModelBuilder`]
//! collects elements while a document is read; [`ModelBuilder::finalize`]
//! turns it into a read-only [`Model`].

use crate::{
    element::{ElementSet, Freeze, MapElement, UniqueId},
    error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    ProcessDescription,
    ActivityFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityPoolKind {
    UnspecifiedEntity,
    SimpleChemical,
    SimpleChemicalMultimer,
    Macromolecule,
    MacromoleculeMultimer,
    NucleicAcidFeature,
    NucleicAcidFeatureMultimer,
    Complex,
    ComplexMultimer,
    EmptySet,
    PerturbingAgent,
}

impl EntityPoolKind {
    /// Kinds that may appear nested inside a complex.
    pub fn can_be_subunit(self) -> bool {
        !matches!(self, Self::EmptySet | Self::PerturbingAgent)
    }
}

/// Entity kind carried by an Activity Flow unit of information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitEntityKind {
    UnspecifiedEntity,
    Macromolecule,
    NucleicAcidFeature,
    SimpleChemical,
    Complex,
    Perturbation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    BiologicalActivity,
    Phenotype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    GenericProcess,
    UncertainProcess,
    OmittedProcess,
    Association,
    Dissociation,
    Phenotype,
}

impl ProcessKind {
    /// Phenotypes have no participants and no connectors.
    pub fn is_stoichiometric(self) -> bool {
        !matches!(self, Self::Phenotype)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    And,
    Or,
    Not,
    Delay,
    Equivalence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulationKind {
    Modulation,
    Stimulation,
    Catalysis,
    Inhibition,
    NecessaryStimulation,
    PositiveInfluence,
    NegativeInfluence,
    UnknownInfluence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateVariable {
    pub id: UniqueId,
    pub value: Option<String>,
    pub variable: Option<String>,
    /// Position among the parent's state variables that have no `variable`.
    pub order: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitOfInformation {
    pub id: UniqueId,
    pub value: String,
    pub prefix: Option<String>,
    pub entity: Option<UnitEntityKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subunit {
    pub id: UniqueId,
    pub kind: EntityPoolKind,
    pub label: Option<String>,
    pub state_variables: ElementSet<StateVariable>,
    pub units_of_information: ElementSet<UnitOfInformation>,
    pub subunits: ElementSet<Subunit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityPool {
    pub id: UniqueId,
    pub kind: EntityPoolKind,
    pub label: Option<String>,
    pub compartment: Option<UniqueId>,
    pub state_variables: ElementSet<StateVariable>,
    pub units_of_information: ElementSet<UnitOfInformation>,
    pub subunits: ElementSet<Subunit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub id: UniqueId,
    pub label: Option<String>,
    pub state_variables: ElementSet<StateVariable>,
    pub units_of_information: ElementSet<UnitOfInformation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: UniqueId,
    pub kind: ActivityKind,
    pub label: Option<String>,
    pub compartment: Option<UniqueId>,
    pub units_of_information: ElementSet<UnitOfInformation>,
}

/// Membership of an entity pool in a process, as reactant or product.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxRole {
    pub id: UniqueId,
    pub element: UniqueId,
    pub stoichiometry: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub id: UniqueId,
    pub kind: ProcessKind,
    pub label: Option<String>,
    pub reversible: bool,
    pub reactants: ElementSet<FluxRole>,
    pub products: ElementSet<FluxRole>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorInput {
    pub id: UniqueId,
    pub element: UniqueId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalOperator {
    pub id: UniqueId,
    pub kind: OperatorKind,
    pub inputs: ElementSet<OperatorInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modulation {
    pub id: UniqueId,
    pub kind: ModulationKind,
    pub source: UniqueId,
    pub target: UniqueId,
}

/// Link from a tag or terminal to the element it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub id: UniqueId,
    pub element: UniqueId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: UniqueId,
    pub label: Option<String>,
    pub reference: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub id: UniqueId,
    pub label: Option<String>,
    pub reference: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submap {
    pub id: UniqueId,
    pub label: Option<String>,
    pub terminals: ElementSet<Terminal>,
}

macro_rules! impl_map_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapElement for $ty {
                fn id(&self) -> &UniqueId {
                    &self.id
                }
            }
        )*
    };
}

impl_map_element!(
    StateVariable,
    UnitOfInformation,
    Subunit,
    EntityPool,
    Compartment,
    Activity,
    FluxRole,
    Process,
    OperatorInput,
    LogicalOperator,
    Modulation,
    Reference,
    Tag,
    Terminal,
    Submap,
);

macro_rules! impl_freeze {
    ($($ty:ty => [$($field:ident),*]),* $(,)?) => {
        $(
            impl Freeze for $ty {
                fn freeze(&mut self) {
                    $(self.$field.freeze();)*
                }

                fn thaw(&mut self) {
                    $(self.$field.thaw();)*
                }
            }
        )*
    };
}

impl_freeze!(
    StateVariable => [],
    UnitOfInformation => [],
    Subunit => [state_variables, units_of_information, subunits],
    EntityPool => [state_variables, units_of_information, subunits],
    Compartment => [state_variables, units_of_information],
    Activity => [units_of_information],
    FluxRole => [],
    Process => [reactants, products],
    OperatorInput => [],
    LogicalOperator => [inputs],
    Modulation => [],
    Tag => [],
    Terminal => [],
    Submap => [terminals],
);

/// Kind selector for [`ModelBuilder::new_element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelElementKind {
    Compartment,
    EntityPool(EntityPoolKind),
    Activity(ActivityKind),
    Process(ProcessKind),
    LogicalOperator(OperatorKind),
    Modulation(ModulationKind),
    Submap,
    Tag,
}

/// A top-level model element.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelElement {
    Compartment(Compartment),
    EntityPool(EntityPool),
    Activity(Activity),
    Process(Process),
    LogicalOperator(LogicalOperator),
    Modulation(Modulation),
    Submap(Submap),
    Tag(Tag),
}

impl ModelElement {
    /// An empty element of `kind`. Modulations start with dangling
    /// endpoints equal to their own id until the caller sets them.
    pub fn new(kind: ModelElementKind, id: UniqueId) -> Self {
        match kind {
            ModelElementKind::Compartment => Self::Compartment(Compartment {
                id,
                label: None,
                state_variables: ElementSet::new(),
                units_of_information: ElementSet::new(),
            }),
            ModelElementKind::EntityPool(kind) => Self::EntityPool(EntityPool {
                id,
                kind,
                label: None,
                compartment: None,
                state_variables: ElementSet::new(),
                units_of_information: ElementSet::new(),
                subunits: ElementSet::new(),
            }),
            ModelElementKind::Activity(kind) => Self::Activity(Activity {
                id,
                kind,
                label: None,
                compartment: None,
                units_of_information: ElementSet::new(),
            }),
            ModelElementKind::Process(kind) => Self::Process(Process {
                id,
                kind,
                label: None,
                reversible: false,
                reactants: ElementSet::new(),
                products: ElementSet::new(),
            }),
            ModelElementKind::LogicalOperator(kind) => Self::LogicalOperator(LogicalOperator {
                id,
                kind,
                inputs: ElementSet::new(),
            }),
            ModelElementKind::Modulation(kind) => Self::Modulation(Modulation {
                source: id.clone(),
                target: id.clone(),
                id,
                kind,
            }),
            ModelElementKind::Submap => Self::Submap(Submap {
                id,
                label: None,
                terminals: ElementSet::new(),
            }),
            ModelElementKind::Tag => Self::Tag(Tag {
                id,
                label: None,
                reference: None,
            }),
        }
    }
}

impl MapElement for ModelElement {
    fn id(&self) -> &UniqueId {
        match self {
            Self::Compartment(element) => &element.id,
            Self::EntityPool(element) => &element.id,
            Self::Activity(element) => &element.id,
            Self::Process(element) => &element.id,
            Self::LogicalOperator(element) => &element.id,
            Self::Modulation(element) => &element.id,
            Self::Submap(element) => &element.id,
            Self::Tag(element) => &element.id,
        }
    }
}

/// Borrowed view of a top-level element, returned by lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelElementRef<'a> {
    Compartment(&'a Compartment),
    EntityPool(&'a EntityPool),
    Activity(&'a Activity),
    Process(&'a Process),
    LogicalOperator(&'a LogicalOperator),
    Modulation(&'a Modulation),
    Submap(&'a Submap),
    Tag(&'a Tag),
}

impl ModelElementRef<'_> {
    /// Compartment of an entity pool or activity.
    pub fn compartment(&self) -> Option<&UniqueId> {
        match self {
            Self::EntityPool(element) => element.compartment.as_ref(),
            Self::Activity(element) => element.compartment.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Collections {
    compartments: ElementSet<Compartment>,
    entity_pools: ElementSet<EntityPool>,
    activities: ElementSet<Activity>,
    processes: ElementSet<Process>,
    logical_operators: ElementSet<LogicalOperator>,
    modulations: ElementSet<Modulation>,
    submaps: ElementSet<Submap>,
    tags: ElementSet<Tag>,
}

impl Collections {
    fn new() -> Self {
        Self {
            compartments: ElementSet::new(),
            entity_pools: ElementSet::new(),
            activities: ElementSet::new(),
            processes: ElementSet::new(),
            logical_operators: ElementSet::new(),
            modulations: ElementSet::new(),
            submaps: ElementSet::new(),
            tags: ElementSet::new(),
        }
    }

    /// Insert `element`, first removing whatever top-level element holds
    /// its id, in any collection.
    fn add_element(&mut self, element: ModelElement) -> Result<Option<ModelElement>> {
        let replaced = self.remove(element.id().as_str())?;
        match element {
            ModelElement::Compartment(element) => {
                self.compartments.add_element(element)?;
            }
            ModelElement::EntityPool(element) => {
                self.entity_pools.add_element(element)?;
            }
            ModelElement::Activity(element) => {
                self.activities.add_element(element)?;
            }
            ModelElement::Process(element) => {
                self.processes.add_element(element)?;
            }
            ModelElement::LogicalOperator(element) => {
                self.logical_operators.add_element(element)?;
            }
            ModelElement::Modulation(element) => {
                self.modulations.add_element(element)?;
            }
            ModelElement::Submap(element) => {
                self.submaps.add_element(element)?;
            }
            ModelElement::Tag(element) => {
                self.tags.add_element(element)?;
            }
        }
        Ok(replaced)
    }

    fn remove(&mut self, id: &str) -> Result<Option<ModelElement>> {
        let removed = [
            self.compartments.remove(id)?.map(ModelElement::Compartment),
            self.entity_pools.remove(id)?.map(ModelElement::EntityPool),
            self.activities.remove(id)?.map(ModelElement::Activity),
            self.processes.remove(id)?.map(ModelElement::Process),
            self.logical_operators.remove(id)?.map(ModelElement::LogicalOperator),
            self.modulations.remove(id)?.map(ModelElement::Modulation),
            self.submaps.remove(id)?.map(ModelElement::Submap),
            self.tags.remove(id)?.map(ModelElement::Tag),
        ];
        Ok(removed.into_iter().flatten().next())
    }

    fn get(&self, id: &str) -> Option<ModelElementRef<'_>> {
        if let Some(element) = self.compartments.get(id) {
            return Some(ModelElementRef::Compartment(element));
        }
        if let Some(element) = self.entity_pools.get(id) {
            return Some(ModelElementRef::EntityPool(element));
        }
        if let Some(element) = self.activities.get(id) {
            return Some(ModelElementRef::Activity(element));
        }
        if let Some(element) = self.processes.get(id) {
            return Some(ModelElementRef::Process(element));
        }
        if let Some(element) = self.logical_operators.get(id) {
            return Some(ModelElementRef::LogicalOperator(element));
        }
        if let Some(element) = self.modulations.get(id) {
            return Some(ModelElementRef::Modulation(element));
        }
        if let Some(element) = self.submaps.get(id) {
            return Some(ModelElementRef::Submap(element));
        }
        self.tags.get(id).map(ModelElementRef::Tag)
    }

    fn len(&self) -> usize {
        self.compartments.len()
            + self.entity_pools.len()
            + self.activities.len()
            + self.processes.len()
            + self.logical_operators.len()
            + self.modulations.len()
            + self.submaps.len()
            + self.tags.len()
    }

    fn is_subset(&self, other: &Self) -> bool {
        self.compartments.is_subset(&other.compartments)
            && self.entity_pools.is_subset(&other.entity_pools)
            && self.activities.is_subset(&other.activities)
            && self.processes.is_subset(&other.processes)
            && self.logical_operators.is_subset(&other.logical_operators)
            && self.modulations.is_subset(&other.modulations)
            && self.submaps.is_subset(&other.submaps)
            && self.tags.is_subset(&other.tags)
    }

    fn freeze(&mut self) {
        self.compartments.freeze();
        self.entity_pools.freeze();
        self.activities.freeze();
        self.processes.freeze();
        self.logical_operators.freeze();
        self.modulations.freeze();
        self.submaps.freeze();
        self.tags.freeze();
    }

    fn thawed(&self) -> Self {
        Self {
            compartments: self.compartments.thawed(),
            entity_pools: self.entity_pools.thawed(),
            activities: self.activities.thawed(),
            processes: self.processes.thawed(),
            logical_operators: self.logical_operators.thawed(),
            modulations: self.modulations.thawed(),
            submaps: self.submaps.thawed(),
            tags: self.tags.thawed(),
        }
    }
}

/// Mutable model under construction.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    dialect: Dialect,
    collections: Collections,
}

impl ModelBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            collections: Collections::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A fresh element of `kind` with a generated id, not yet inserted.
    pub fn new_element(&self, kind: ModelElementKind) -> ModelElement {
        ModelElement::new(kind, UniqueId::generate())
    }

    /// Insert into the collection matching the element's kind. Any
    /// top-level element with the same id is replaced, whatever its kind.
    pub fn add_element(&mut self, element: ModelElement) -> Result<Option<ModelElement>> {
        self.collections.add_element(element)
    }

    pub fn get(&self, id: &str) -> Option<ModelElementRef<'_>> {
        self.collections.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finalize(self) -> Model {
        let mut collections = self.collections;
        collections.freeze();
        Model {
            dialect: self.dialect,
            collections,
        }
    }
}

/// Finalized, read-only model.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    dialect: Dialect,
    collections: Collections,
}

impl Model {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compartments(&self) -> &ElementSet<Compartment> {
        &self.collections.compartments
    }

    pub fn entity_pools(&self) -> &ElementSet<EntityPool> {
        &self.collections.entity_pools
    }

    pub fn activities(&self) -> &ElementSet<Activity> {
        &self.collections.activities
    }

    pub fn processes(&self) -> &ElementSet<Process> {
        &self.collections.processes
    }

    pub fn logical_operators(&self) -> &ElementSet<LogicalOperator> {
        &self.collections.logical_operators
    }

    pub fn modulations(&self) -> &ElementSet<Modulation> {
        &self.collections.modulations
    }

    pub fn submaps(&self) -> &ElementSet<Submap> {
        &self.collections.submaps
    }

    pub fn tags(&self) -> &ElementSet<Tag> {
        &self.collections.tags
    }

    pub fn get(&self, id: &str) -> Option<ModelElementRef<'_>> {
        self.collections.get(id)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff every element of `self` is present, unchanged, in `other`.
    pub fn is_submodel(&self, other: &Model) -> bool {
        self.dialect == other.dialect && self.collections.is_subset(&other.collections)
    }

    /// Editable copy of this model.
    pub fn to_builder(&self) -> ModelBuilder {
        ModelBuilder {
            dialect: self.dialect,
            collections: self.collections.thawed(),
        }
    }
}
