//! Readers and writers by format name.
//!
//! A read without a format asks each registered reader, in registration
//! order, whether it recognizes the file.

use std::path::Path;

use indexmap::IndexMap;
use log::debug;

use crate::{
    error::{Error, Result},
    map::Map,
    options::{ReadOptions, WriteOptions},
    sbgnml::{ReadResult, SbgnmlReader, SbgnmlVersion, SbgnmlWriter, WriteReport},
};

pub trait MapReader {
    fn name(&self) -> &str;

    /// Cheap sniff of the file, without parsing it.
    fn check_file(&self, path: &Path) -> bool;

    fn read(&self, path: &Path, options: &ReadOptions) -> Result<ReadResult>;
}

pub trait MapWriter {
    fn name(&self) -> &str;

    fn write(&self, map: &Map, path: &Path, options: &WriteOptions) -> Result<WriteReport>;
}

impl MapReader for SbgnmlReader {
    fn name(&self) -> &str {
        self.version().format_name()
    }

    fn check_file(&self, path: &Path) -> bool {
        SbgnmlReader::check_file(self, path)
    }

    fn read(&self, path: &Path, options: &ReadOptions) -> Result<ReadResult> {
        SbgnmlReader::read(self, path, options)
    }
}

impl MapWriter for SbgnmlWriter {
    fn name(&self) -> &str {
        self.version().format_name()
    }

    fn write(&self, map: &Map, path: &Path, options: &WriteOptions) -> Result<WriteReport> {
        SbgnmlWriter::write(self, map, path, options)
    }
}

#[derive(Default)]
pub struct Registry {
    readers: IndexMap<String, Box<dyn MapReader>>,
    writers: IndexMap<String, Box<dyn MapWriter>>,
}

impl Registry {
    /// A registry with no formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// SBGN-ML 0.2 and 0.3, both ways.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for version in [SbgnmlVersion::V0_2, SbgnmlVersion::V0_3] {
            registry.register_reader(Box::new(SbgnmlReader::new(version)));
            registry.register_writer(Box::new(SbgnmlWriter::new(version)));
        }
        registry
    }

    /// Register `reader` under its name, replacing any reader of that name.
    pub fn register_reader(&mut self, reader: Box<dyn MapReader>) {
        self.readers.insert(reader.name().to_string(), reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn MapWriter>) {
        self.writers.insert(writer.name().to_string(), writer);
    }

    pub fn reader_names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }

    pub fn writer_names(&self) -> impl Iterator<Item = &str> {
        self.writers.keys().map(String::as_str)
    }

    pub fn read(&self, path: &Path, format: Option<&str>, options: &ReadOptions) -> Result<ReadResult> {
        let reader: &dyn MapReader = match format {
            Some(format) => self
                .readers
                .get(format)
                .map(|reader| &**reader)
                .ok_or_else(|| Error::UnknownFormat(format.to_string()))?,
            None => self.detect(path)?,
        };
        debug!(format = reader.name(), path = path.display().to_string(); "Reading map");
        reader.read(path, options)
    }

    pub fn write(&self, map: &Map, path: &Path, format: &str, options: &WriteOptions) -> Result<WriteReport> {
        let writer = self
            .writers
            .get(format)
            .ok_or_else(|| Error::UnknownFormat(format.to_string()))?;
        debug!(format = writer.name(), path = path.display().to_string(); "Writing map");
        writer.write(map, path, options)
    }

    fn detect(&self, path: &Path) -> Result<&dyn MapReader> {
        self.readers
            .values()
            .find(|reader| reader.check_file(path))
            .map(|reader| &**reader)
            .ok_or_else(|| Error::UnknownFormat(format!("no reader recognizes {}", path.display())))
    }
}
