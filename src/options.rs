//! Read and write options, loadable from a TOML file.
//!
//! ```toml
//! [read]
//! return_type = "map"
//! with_styles = false
//! xsep = 10.0
//!
//! [write]
//! with_notes = false
//! ```

use std::{fs, path::Path};

use log::info;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Which part of the map a read materializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    #[default]
    Map,
    Model,
    Layout,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub return_type: ReturnType,
    pub with_model: bool,
    pub with_layout: bool,
    pub with_annotations: bool,
    pub with_notes: bool,
    pub with_styles: bool,
    /// Margins added around the elements when the document has no map bbox.
    pub xsep: f64,
    pub ysep: f64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            return_type: ReturnType::Map,
            with_model: true,
            with_layout: true,
            with_annotations: true,
            with_notes: true,
            with_styles: true,
            xsep: 0.0,
            ysep: 0.0,
        }
    }
}

impl ReadOptions {
    pub fn builds_model(&self) -> bool {
        match self.return_type {
            ReturnType::Model => true,
            ReturnType::Map => self.with_model,
            ReturnType::Layout => false,
        }
    }

    pub fn builds_layout(&self) -> bool {
        match self.return_type {
            ReturnType::Layout => true,
            ReturnType::Map => self.with_layout,
            ReturnType::Model => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub with_annotations: bool,
    pub with_notes: bool,
    pub with_styles: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            with_annotations: true,
            with_notes: true,
            with_styles: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub read: ReadOptions,
    pub write: WriteOptions,
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!(path = path.display().to_string(); "Loading configuration");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
