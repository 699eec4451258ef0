use crate::analysis::{DurationWindow, GraphDescription, InspectorView};
use crate::domain::ExportError;
use chainscope_common::Category;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Format version written into every document
const FORMAT_VERSION: u32 = 1;

/// Top-level JSON document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    version: u32,
    generator: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_range: Option<DurationWindow>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    inspector: BTreeMap<&'static str, &'a InspectorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<&'a GraphDescription>,
}

/// Collects engine outputs and writes them as one JSON document
#[derive(Debug, Default)]
pub struct JsonExporter {
    duration_range: Option<DurationWindow>,
    inspector: BTreeMap<Category, Arc<InspectorView>>,
    graph: Option<Arc<GraphDescription>>,
}

impl JsonExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_duration_range(&mut self, range: DurationWindow) {
        self.duration_range = Some(range);
    }

    /// Add the inspector view of one path, replacing any earlier one
    pub fn add_inspector(&mut self, category: Category, view: Arc<InspectorView>) {
        self.inspector.insert(category, view);
    }

    pub fn set_graph(&mut self, graph: Arc<GraphDescription>) {
        self.graph = Some(graph);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.duration_range.is_none() && self.inspector.is_empty() && self.graph.is_none()
    }

    /// Write the document to `writer`
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn export<W: Write>(&self, writer: &mut W) -> Result<(), ExportError> {
        let document = ExportDocument {
            version: FORMAT_VERSION,
            generator: env!("CARGO_PKG_NAME"),
            duration_range: self.duration_range,
            inspector: self.inspector.iter().map(|(c, v)| (c.as_str(), v.as_ref())).collect(),
            graph: self.graph.as_deref(),
        };
        serde_json::to_writer_pretty(&mut *writer, &document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Write the document to a file, creating or truncating it
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn export_to_path(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);
        self.export(&mut writer)
    }
}
