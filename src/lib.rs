//! SBGN-ML maps as three linked structures: a [`Model`] of biological
//! entities and processes, a [`Layout`] of positioned shapes, and a
//! [`LayoutModelMapping`] between the two.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sbgnml_rs::{ReadOptions, Registry, WriteOptions};
//!
//! let registry = Registry::with_defaults();
//! let result = registry.read(Path::new("map.sbgn"), None, &ReadOptions::default())?;
//! if let Some(map) = result.object.as_map() {
//!     registry.write(map, Path::new("out.sbgn"), "sbgnml-0.3", &WriteOptions::default())?;
//! }
//! # Ok::<(), sbgnml_rs::Error>(())
//! ```

pub mod annotation;
pub mod element;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod map;
pub mod mapping;
pub mod model;
pub mod options;
pub mod registry;
pub mod sbgnml;
mod xml;

pub use annotation::{Annotations, Notes, Qualifier, RdfAnnotation};
pub use element::{ElementList, ElementSet, Freeze, MapElement, UniqueId};
pub use error::{Diagnostic, DiagnosticKind, Error, Result};
pub use layout::{Layout, LayoutBuilder, LayoutElement};
pub use map::{Map, MapBuilder};
pub use mapping::{LayoutModelMapping, LayoutModelMappingBuilder, ModelKey};
pub use model::{Dialect, Model, ModelBuilder};
pub use options::{CodecConfig, ReadOptions, ReturnType, WriteOptions};
pub use registry::{MapReader, MapWriter, Registry};
pub use sbgnml::{ReadObject, ReadResult, SbgnmlReader, SbgnmlVersion, SbgnmlWriter, WriteReport};
