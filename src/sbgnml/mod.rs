//! SBGN-ML 0.2 and 0.3 reading and writing.

pub mod class;
pub mod heuristics;
pub mod index;
pub mod reader;
pub mod style;
pub mod writer;

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use roxmltree::Node;

use crate::{
    error::{Error, Result},
    model::Dialect,
};

pub use reader::{ReadObject, ReadResult, SbgnmlReader};
pub use writer::{SbgnmlWriter, WriteReport};

const NAMESPACE_0_2: &str = "http://sbgn.org/libsbgn/0.2";
const NAMESPACE_0_3: &str = "http://sbgn.org/libsbgn/0.3";

const PD_VERSION_URI: &str = "http://identifiers.org/combine.specifications/sbgn.pd.level-1.version-2.0";
const AF_VERSION_URI: &str = "http://identifiers.org/combine.specifications/sbgn.af.level-1.version-1.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SbgnmlVersion {
    V0_2,
    V0_3,
}

impl SbgnmlVersion {
    pub fn namespace(self) -> &'static str {
        match self {
            Self::V0_2 => NAMESPACE_0_2,
            Self::V0_3 => NAMESPACE_0_3,
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            NAMESPACE_0_2 => Some(Self::V0_2),
            NAMESPACE_0_3 => Some(Self::V0_3),
            _ => None,
        }
    }

    /// Registry name of the format, e.g. `sbgnml-0.3`.
    pub fn format_name(self) -> &'static str {
        match self {
            Self::V0_2 => "sbgnml-0.2",
            Self::V0_3 => "sbgnml-0.3",
        }
    }

    /// True if one of the first lines of the file mentions this version's
    /// namespace. Unreadable files are not recognized.
    pub fn check_file(self, path: &Path) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        BufReader::new(file)
            .lines()
            .take(32)
            .map_while(|line| line.ok())
            .any(|line| line.contains(self.namespace()))
    }

    /// Dialect declared by a `<map>` element.
    pub(crate) fn dialect_of(self, map: &Node) -> Result<Dialect> {
        if self == Self::V0_3 {
            if let Some(version) = map.attribute("version") {
                if version.contains("sbgn.pd") {
                    return Ok(Dialect::ProcessDescription);
                }
                if version.contains("sbgn.af") {
                    return Ok(Dialect::ActivityFlow);
                }
                if version.contains("sbgn.er") {
                    return Err(Error::UnsupportedDialect(
                        "entity relationship maps are not supported".to_string(),
                    ));
                }
            }
        }
        match map.attribute("language") {
            Some("process description") => Ok(Dialect::ProcessDescription),
            Some("activity flow") => Ok(Dialect::ActivityFlow),
            Some("entity relationship") => Err(Error::UnsupportedDialect(
                "entity relationship maps are not supported".to_string(),
            )),
            Some(other) => Err(Error::UnsupportedDialect(format!("unknown language `{other}`"))),
            None => Err(Error::UnsupportedDialect("map declares no language".to_string())),
        }
    }

    /// Attributes written on `<map>` to declare `dialect`.
    pub(crate) fn dialect_attributes(self, dialect: Dialect) -> Vec<(&'static str, &'static str)> {
        let (language, uri) = match dialect {
            Dialect::ProcessDescription => ("process description", PD_VERSION_URI),
            Dialect::ActivityFlow => ("activity flow", AF_VERSION_URI),
        };
        match self {
            Self::V0_2 => vec![("language", language)],
            Self::V0_3 => vec![("language", language), ("version", uri)],
        }
    }
}

/// Version of an SBGN-ML document, from the namespace of its root.
pub fn detect_version(root: &Node) -> Result<SbgnmlVersion> {
    let namespace = root.tag_name().namespace().unwrap_or_default();
    SbgnmlVersion::from_namespace(namespace)
        .ok_or_else(|| Error::UnsupportedDialect(format!("unknown SBGN-ML namespace `{namespace}`")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use roxmltree::Document;

    use super::*;

    fn map_node_dialect(source: &str) -> Result<Dialect> {
        let doc = Document::parse(source).unwrap();
        let root = doc.root_element();
        let version = detect_version(&root)?;
        let map = root.first_element_child().unwrap();
        version.dialect_of(&map)
    }

    #[test]
    fn test_dialect_from_version_uri() {
        let dialect = map_node_dialect(&format!(
            r#"<sbgn xmlns="{NAMESPACE_0_3}"><map version="{AF_VERSION_URI}" language="process description"/></sbgn>"#
        ))
        .unwrap();
        assert_eq!(dialect, Dialect::ActivityFlow);
    }

    #[test]
    fn test_dialect_from_language() {
        let dialect = map_node_dialect(&format!(
            r#"<sbgn xmlns="{NAMESPACE_0_2}"><map language="process description"/></sbgn>"#
        ))
        .unwrap();
        assert_eq!(dialect, Dialect::ProcessDescription);
    }

    #[test]
    fn test_entity_relationship_is_rejected() {
        let by_uri = map_node_dialect(&format!(
            r#"<sbgn xmlns="{NAMESPACE_0_3}"><map version="http://identifiers.org/combine.specifications/sbgn.er.level-1.version-2"/></sbgn>"#
        ));
        assert!(matches!(by_uri, Err(Error::UnsupportedDialect(_))));
        let by_language = map_node_dialect(&format!(
            r#"<sbgn xmlns="{NAMESPACE_0_2}"><map language="entity relationship"/></sbgn>"#
        ));
        assert!(matches!(by_language, Err(Error::UnsupportedDialect(_))));
    }

    #[test]
    fn test_unknown_namespace_is_rejected() {
        let result = map_node_dialect(r#"<sbgn xmlns="http://sbgn.org/libsbgn/9.9"><map language="activity flow"/></sbgn>"#);
        assert!(matches!(result, Err(Error::UnsupportedDialect(_))));
    }

    #[test]
    fn test_check_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();
        writeln!(file, r#"<sbgn xmlns="{NAMESPACE_0_2}">"#).unwrap();
        writeln!(file, "</sbgn>").unwrap();

        assert!(SbgnmlVersion::V0_2.check_file(file.path()));
        assert!(!SbgnmlVersion::V0_3.check_file(file.path()));
        assert!(!SbgnmlVersion::V0_3.check_file(Path::new("/nonexistent/file.sbgn")));
    }
}
