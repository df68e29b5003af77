use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Division, RenderError, StructureFlags};

const STDERR_CAP_BYTES: usize = 10 * 1024;

pub const START_ID: &str = "start";
pub const END_ID: &str = "end";
pub const PROCESS_ID: &str = "process";
pub const DECISION_ID: &str = "decision";

const TERMINAL_FILL: &str = "#ffefd5";
const DIVISION_FILL: &str = "#f0f5f9";
const PROCESS_FILL: &str = "#f9ecef";
const DECISION_FILL: &str = "#fff0f5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Ellipse,
    Box,
    Diamond,
}

impl NodeShape {
    fn as_dot(self) -> &'static str {
        match self {
            NodeShape::Ellipse => "ellipse",
            NodeShape::Box => "box",
            NodeShape::Diamond => "diamond",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: &'static str,
    pub label: String,
    pub shape: NodeShape,
    pub style: &'static str,
    pub fill: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub label: Option<&'static str>,
    pub dashed: bool,
}

impl Edge {
    fn plain(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            label: None,
            dashed: false,
        }
    }
}

/// Directed flowchart ready to be emitted as DOT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl FlowGraph {
    /// Build the chart for a set of detected divisions.
    ///
    /// Divisions are chained start → … → end in fixed order. When PROCEDURE
    /// is present the process/decision loop hangs off the procedure box, except
    /// when it is the only division found: then the loop is wired straight
    /// between start and end.
    pub fn from_flags(flags: StructureFlags) -> Self {
        let mut graph = FlowGraph::default();
        graph.push_node(START_ID, "Program Start", NodeShape::Ellipse, "filled", TERMINAL_FILL);
        graph.push_node(END_ID, "Program End", NodeShape::Ellipse, "filled", TERMINAL_FILL);

        let divisions: Vec<Division> = flags.divisions().collect();
        for division in &divisions {
            graph.push_node(
                division.node_id(),
                &format!("{}\n{}", division.title(), division.subtitle()),
                NodeShape::Box,
                "rounded,filled",
                DIVISION_FILL,
            );
        }

        match (divisions.first(), divisions.last()) {
            (Some(first), Some(last)) => {
                graph.edges.push(Edge::plain(START_ID, first.node_id()));
                for pair in divisions.windows(2) {
                    graph
                        .edges
                        .push(Edge::plain(pair[0].node_id(), pair[1].node_id()));
                }
                graph.edges.push(Edge::plain(last.node_id(), END_ID));
            }
            _ => graph.edges.push(Edge::plain(START_ID, END_ID)),
        }

        if flags.procedure {
            let anchor = if flags.procedure_only() {
                START_ID
            } else {
                Division::Procedure.node_id()
            };
            graph.push_loop(anchor);
        }

        graph
    }

    fn push_node(
        &mut self,
        id: &'static str,
        label: &str,
        shape: NodeShape,
        style: &'static str,
        fill: &'static str,
    ) {
        self.nodes.push(Node {
            id,
            label: label.to_string(),
            shape,
            style,
            fill,
        });
    }

    fn push_loop(&mut self, anchor: &'static str) {
        self.push_node(PROCESS_ID, "Process\nRecords", NodeShape::Box, "filled", PROCESS_FILL);
        self.push_node(
            DECISION_ID,
            "Condition\nCheck?",
            NodeShape::Diamond,
            "filled",
            DECISION_FILL,
        );
        self.edges.push(Edge::plain(anchor, PROCESS_ID));
        self.edges.push(Edge::plain(PROCESS_ID, DECISION_ID));
        self.edges.push(Edge {
            from: DECISION_ID,
            to: END_ID,
            label: Some("Done"),
            dashed: false,
        });
        self.edges.push(Edge {
            from: DECISION_ID,
            to: PROCESS_ID,
            label: Some("Continue"),
            dashed: true,
        });
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    pub fn to_dot(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        writeln!(f, "\tfontname=Arial rankdir=TB")?;
        for node in &self.nodes {
            writeln!(
                f,
                "\t{} [label=\"{}\" fillcolor=\"{}\" shape={} style=\"{}\"]",
                node.id,
                escape_dot(&node.label),
                node.fill,
                node.shape.as_dot(),
                node.style
            )?;
        }
        for edge in &self.edges {
            let mut attrs = Vec::new();
            if let Some(label) = edge.label {
                attrs.push(format!("label=\"{}\"", escape_dot(label)));
            }
            if edge.dashed {
                attrs.push("style=dashed".to_string());
            }
            if attrs.is_empty() {
                writeln!(f, "\t{} -> {}", edge.from, edge.to)?;
            } else {
                writeln!(f, "\t{} -> {} [{}]", edge.from, edge.to, attrs.join(" "))?;
            }
        }
        writeln!(f, "}}")
    }
}

fn escape_dot(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Turns DOT text into an SVG document
#[async_trait]
pub trait LayoutEngine: Send + Sync {
    /// Name reported when the engine cannot be found
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    async fn render_svg(&self, dot: &str) -> Result<String, RenderError>;
}

/// Graphviz `dot` invoked as a child process
#[derive(Debug, Clone)]
pub struct DotEngine {
    command: String,
}

impl DotEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Resolve the executable, searching PATH for bare names
    pub fn locate(&self) -> Option<PathBuf> {
        let candidate = Path::new(&self.command);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.command))
            .find(|p| p.is_file())
    }
}

#[async_trait]
impl LayoutEngine for DotEngine {
    fn name(&self) -> &str {
        &self.command
    }

    fn is_available(&self) -> bool {
        self.locate().is_some()
    }

    async fn render_svg(&self, dot: &str) -> Result<String, RenderError> {
        let program = self.locate().ok_or_else(|| RenderError::EngineUnavailable {
            command: self.command.clone(),
        })?;

        let mut child = Command::new(program)
            .arg("-Tsvg")
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| map_spawn_err(e, &self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(dot.as_bytes()).await {
                Ok(()) => {}
                // exited without reading its input; the exit status reports why
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!("'{}' closed stdin early: {}", self.command, e);
                }
                Err(e) => return Err(e.into()),
            }
            // EOF lets dot start the layout
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let cap = output.stderr.len().min(STDERR_CAP_BYTES);
            let stderr = String::from_utf8_lossy(&output.stderr[..cap]);
            let stderr = stderr.trim();
            return Err(RenderError::EngineFailed(if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{} ({})", stderr, output.status)
            }));
        }

        String::from_utf8(output.stdout).map_err(|_| RenderError::InvalidOutput)
    }
}

fn map_spawn_err(err: std::io::Error, command: &str) -> RenderError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RenderError::EngineUnavailable {
            command: command.to_string(),
        }
    } else {
        RenderError::Io(err)
    }
}

/// Slice of `output` starting at the root `<svg` element, skipping an XML
/// prolog, doctype and comments. `None` if no root element follows them.
pub fn svg_document(output: &str) -> Option<&str> {
    let mut rest = output.trim_start();
    loop {
        if rest.starts_with("<svg") {
            return Some(rest.trim_end());
        }
        let close = if rest.starts_with("<?") {
            "?>"
        } else if rest.starts_with("<!--") {
            "-->"
        } else if rest.starts_with("<!DOCTYPE") || rest.starts_with("<!doctype") {
            ">"
        } else {
            return None;
        };
        let end = rest.find(close)? + close.len();
        rest = rest[end..].trim_start();
    }
}

/// Graph-layout renderer backed by a [`LayoutEngine`]
#[derive(Clone)]
pub struct GraphvizRenderer {
    engine: Arc<dyn LayoutEngine>,
}

impl GraphvizRenderer {
    pub fn new(engine: Arc<dyn LayoutEngine>) -> Self {
        Self { engine }
    }

    pub async fn render(&self, flags: StructureFlags) -> Result<String, RenderError> {
        if !self.engine.is_available() {
            tracing::error!(
                "Graphviz '{}' executable not found in PATH",
                self.engine.name()
            );
            return Err(RenderError::EngineUnavailable {
                command: self.engine.name().to_string(),
            });
        }

        let dot = FlowGraph::from_flags(flags).to_dot();
        tracing::info!("Generating SVG using Graphviz...");
        let output = match self.engine.render_svg(&dot).await {
            Ok(out) => out,
            Err(e) => {
                tracing::error!("Graphviz execution error: {}", e);
                return Err(e);
            }
        };

        match svg_document(&output) {
            Some(svg) => {
                tracing::info!(
                    "Successfully generated flowchart SVG with length: {}",
                    svg.len()
                );
                Ok(svg.to_string())
            }
            None => {
                let head: String = output.chars().take(100).collect();
                tracing::warn!("Output did not start with <svg>: {}", head);
                Err(RenderError::InvalidOutput)
            }
        }
    }
}
