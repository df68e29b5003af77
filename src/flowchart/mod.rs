//! Structural flowcharts for COBOL sources.
//!
//! A [`StructureFlags`] value is computed once from the source text and handed
//! to both renderers: [`graphviz::GraphvizRenderer`] lays the chart out with an
//! external Graphviz install, and [`fallback::render`] assembles a fixed-layout
//! SVG when that engine is missing or fails.

use serde::Serialize;
use thiserror::Error;

pub mod fallback;
pub mod graphviz;

pub use graphviz::{DotEngine, FlowGraph, GraphvizRenderer, LayoutEngine};

/// Leading text of a stored flowchart that records a rendering failure
pub const ERROR_PREFIX: &str = "Error:";

/// The three COBOL divisions the detector looks for, in chart order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Division {
    Identification,
    Data,
    Procedure,
}

impl Division {
    pub const ALL: [Division; 3] = [
        Division::Identification,
        Division::Data,
        Division::Procedure,
    ];

    /// Literal, case-sensitive marker searched for in the source
    pub fn marker(self) -> &'static str {
        match self {
            Division::Identification => "IDENTIFICATION DIVISION",
            Division::Data => "DATA DIVISION",
            Division::Procedure => "PROCEDURE DIVISION",
        }
    }

    pub fn node_id(self) -> &'static str {
        match self {
            Division::Identification => "id_div",
            Division::Data => "data_div",
            Division::Procedure => "proc_div",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Division::Identification => "1. Identification",
            Division::Data => "2. Data",
            Division::Procedure => "3. Procedure",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Division::Identification => "Program Details",
            Division::Data => "Variables & Storage",
            Division::Procedure => "Main Logic",
        }
    }
}

/// Which divisions are present in a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct StructureFlags {
    pub identification: bool,
    pub data: bool,
    pub procedure: bool,
}

impl StructureFlags {
    pub fn new(identification: bool, data: bool, procedure: bool) -> Self {
        Self {
            identification,
            data,
            procedure,
        }
    }

    /// Classify a source by literal marker presence. Never fails.
    pub fn detect(source: &str) -> Self {
        Self {
            identification: source.contains(Division::Identification.marker()),
            data: source.contains(Division::Data.marker()),
            procedure: source.contains(Division::Procedure.marker()),
        }
    }

    pub fn contains(self, division: Division) -> bool {
        match division {
            Division::Identification => self.identification,
            Division::Data => self.data,
            Division::Procedure => self.procedure,
        }
    }

    /// Present divisions in chart order
    pub fn divisions(self) -> impl Iterator<Item = Division> {
        Division::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    pub fn count(self) -> usize {
        self.divisions().count()
    }

    pub fn is_empty(self) -> bool {
        self.count() == 0
    }

    /// PROCEDURE DIVISION is the only marker found
    pub fn procedure_only(self) -> bool {
        self.procedure && !self.identification && !self.data
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "Graphviz executable '{command}' not found in system PATH. Please install Graphviz software."
    )]
    EngineUnavailable { command: String },
    #[error("Failed to generate flowchart. Graphviz error: {0}")]
    EngineFailed(String),
    #[error("Graphviz did not produce a valid SVG. Please check your Graphviz installation.")]
    InvalidOutput,
    #[error("Unexpected error when generating flowchart: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Text stored in place of a flowchart when rendering fails
    pub fn to_stored_text(&self) -> String {
        format!("{ERROR_PREFIX} {self}")
    }
}
