//! Fixed-layout SVG flowchart used when Graphviz is unavailable.
//!
//! Everything is positioned on a single vertical axis: a start circle, one
//! box per detected division, the process/decision loop under the procedure
//! box, and an end circle. The canvas is 800×700 unless the procedure loop
//! runs past the end circle, in which case the canvas grows downward.

use std::fmt::{self, Write as _};

use super::{Division, StructureFlags};

const WIDTH: i32 = 800;
const MIN_HEIGHT: i32 = 700;
const CX: i32 = WIDTH / 2;

const START_Y: i32 = 80;
const CIRCLE_R: i32 = 40;
const TERMINAL_MARGIN: i32 = 80;

const FIRST_BOX_Y: i32 = 180;
const BOX_W: i32 = 220;
const BOX_H: i32 = 80;
const BOX_SPACING: i32 = 100;

const PROCESS_W: i32 = 200;
const PROCESS_H: i32 = 70;
const PROCESS_GAP: i32 = 80;
const DECISION_OFFSET: i32 = 130;
const DECISION_HALF_W: i32 = 70;
const DECISION_HALF_H: i32 = 40;
const LOOP_EXIT_GAP: i32 = 100;

const STROKE: &str = "#333";
const TERMINAL_FILL: &str = "#ffefd5";
const DIVISION_FILL: &str = "#f0f5f9";
const NOTE_FILL: &str = "#f9ecef";
const DECISION_FILL: &str = "#fff0f5";

pub const NO_STRUCTURE_NOTE: &str = "No Standard COBOL Divisions Found";
pub const CAPTION: &str = "Generated flowchart based on COBOL structure analysis";

/// Render the fallback chart. Returns `None` (after logging) if assembly fails.
pub fn render(flags: StructureFlags) -> Option<String> {
    match build(flags) {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::error!("Error in fallback SVG generation: {}", e);
            None
        }
    }
}

/// Vertical positions of the procedure loop, derived from the procedure box
struct LoopLayout {
    process_y: i32,
    decision_y: i32,
}

impl LoopLayout {
    fn below(procedure_box_y: i32) -> Self {
        let process_y = procedure_box_y + BOX_H + PROCESS_GAP;
        Self {
            process_y,
            decision_y: process_y + DECISION_OFFSET,
        }
    }

    fn bottom(&self) -> i32 {
        self.decision_y + DECISION_HALF_H
    }
}

fn build(flags: StructureFlags) -> Result<String, fmt::Error> {
    let divisions: Vec<Division> = flags.divisions().collect();
    let box_ys: Vec<i32> = (0..divisions.len() as i32)
        .map(|i| FIRST_BOX_Y + i * (BOX_H + BOX_SPACING))
        .collect();
    let procedure_loop = divisions
        .iter()
        .position(|d| *d == Division::Procedure)
        .map(|i| LoopLayout::below(box_ys[i]));

    let mut end_y = MIN_HEIGHT - TERMINAL_MARGIN;
    if let Some(layout) = &procedure_loop {
        end_y = end_y.max(layout.bottom() + LOOP_EXIT_GAP);
    }
    let height = end_y + TERMINAL_MARGIN;

    let mut svg = SvgWriter::new(WIDTH, height)?;
    svg.text(CX, 30, "middle", 24, true, None, "COBOL Program Flowchart")?;

    svg.terminal(START_Y, "Start")?;
    svg.terminal(end_y, "End")?;

    if divisions.is_empty() {
        svg.arrow(CX, START_Y + CIRCLE_R, CX, end_y - CIRCLE_R)?;
        let note_y = height / 2;
        svg.rect(CX - 150, note_y - 40, 300, 80, 10, NOTE_FILL)?;
        svg.centered_text(note_y, 16, false, NO_STRUCTURE_NOTE)?;
    } else {
        let mut last_y = START_Y + CIRCLE_R;
        for (division, &y) in divisions.iter().zip(&box_ys) {
            svg.rect(CX - BOX_W / 2, y, BOX_W, BOX_H, 10, DIVISION_FILL)?;
            svg.centered_text(y + BOX_H / 2 - 15, 18, true, division.title())?;
            svg.centered_text(y + BOX_H / 2 + 15, 16, false, division.subtitle())?;
            svg.arrow(CX, last_y, CX, y)?;
            last_y = y + BOX_H;
        }

        match &procedure_loop {
            Some(layout) => svg.procedure_loop(layout, last_y, end_y)?,
            None => svg.arrow(CX, last_y, CX, end_y - CIRCLE_R)?,
        }
    }

    svg.text(50, height - 60, "start", 12, false, Some("#666"), CAPTION)?;
    svg.finish()
}

struct SvgWriter {
    buf: String,
}

impl SvgWriter {
    fn new(width: i32, height: i32) -> Result<Self, fmt::Error> {
        let mut buf = String::new();
        write!(
            buf,
            r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}">"#
        )?;
        buf.push_str("<defs>");
        buf.push_str(r#"<marker id="arrowhead" markerWidth="10" markerHeight="7" refX="9" refY="3.5" orient="auto">"#);
        write!(buf, r#"<polygon points="0 0, 10 3.5, 0 7" fill="{STROKE}"/>"#)?;
        buf.push_str("</marker></defs>");
        write!(
            buf,
            r##"<rect width="{width}" height="{height}" fill="#ffffff"/>"##
        )?;
        Ok(Self { buf })
    }

    fn terminal(&mut self, cy: i32, label: &str) -> fmt::Result {
        write!(
            self.buf,
            r#"<circle cx="{CX}" cy="{cy}" r="{CIRCLE_R}" fill="{TERMINAL_FILL}" stroke="{STROKE}" stroke-width="2"/>"#
        )?;
        self.centered_text(cy, 16, true, label)
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, rx: i32, fill: &str) -> fmt::Result {
        write!(
            self.buf,
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{rx}" fill="{fill}" stroke="{STROKE}" stroke-width="2"/>"#
        )
    }

    fn arrow(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> fmt::Result {
        write!(
            self.buf,
            r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{STROKE}" stroke-width="2" marker-end="url(#arrowhead)"/>"#
        )
    }

    fn centered_text(&mut self, y: i32, size: u32, bold: bool, content: &str) -> fmt::Result {
        write!(
            self.buf,
            r#"<text x="{CX}" y="{y}" text-anchor="middle" dominant-baseline="middle" font-family="Arial" font-size="{size}""#
        )?;
        if bold {
            self.buf.push_str(r#" font-weight="bold""#);
        }
        write!(self.buf, ">{}</text>", escape_xml(content))
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        x: i32,
        y: i32,
        anchor: &str,
        size: u32,
        bold: bool,
        fill: Option<&str>,
        content: &str,
    ) -> fmt::Result {
        write!(
            self.buf,
            r#"<text x="{x}" y="{y}" text-anchor="{anchor}" font-family="Arial" font-size="{size}""#
        )?;
        if bold {
            self.buf.push_str(r#" font-weight="bold""#);
        }
        if let Some(fill) = fill {
            write!(self.buf, r#" fill="{fill}""#)?;
        }
        write!(self.buf, ">{}</text>", escape_xml(content))
    }

    /// Process box, decision diamond, exit to the end circle and the dashed
    /// curved loop back into the process box.
    fn procedure_loop(&mut self, layout: &LoopLayout, from_y: i32, end_y: i32) -> fmt::Result {
        let py = layout.process_y;
        let dy = layout.decision_y;
        let process_x = CX - PROCESS_W / 2;
        let process_mid = py + PROCESS_H / 2;

        self.rect(process_x, py, PROCESS_W, PROCESS_H, 5, NOTE_FILL)?;
        self.centered_text(process_mid, 16, false, "Process Records")?;
        self.arrow(CX, from_y, CX, py)?;

        write!(
            self.buf,
            r#"<polygon points="{},{} {},{} {},{} {},{}" fill="{DECISION_FILL}" stroke="{STROKE}" stroke-width="2"/>"#,
            CX,
            dy - DECISION_HALF_H,
            CX + DECISION_HALF_W,
            dy,
            CX,
            dy + DECISION_HALF_H,
            CX - DECISION_HALF_W,
            dy
        )?;
        self.centered_text(dy, 14, false, "Condition?")?;
        self.arrow(CX, py + PROCESS_H, CX, dy - DECISION_HALF_H)?;

        self.arrow(CX, dy + DECISION_HALF_H, CX, end_y - CIRCLE_R)?;
        self.text(CX + 15, dy + 60, "start", 14, false, None, "Done")?;

        let left = CX - DECISION_HALF_W;
        write!(
            self.buf,
            r#"<path d="M {left} {dy} L {} {dy} C {} {dy} {} {process_mid} {} {process_mid} L {process_x} {process_mid}" fill="none" stroke="{STROKE}" stroke-width="2" stroke-dasharray="5,3" marker-end="url(#arrowhead)"/>"#,
            CX - 130,
            CX - 180,
            CX - 180,
            CX - 150,
        )?;
        self.text(CX - 100, dy - 15, "middle", 14, false, None, "Continue")
    }

    fn finish(mut self) -> Result<String, fmt::Error> {
        self.buf.push_str("</svg>");
        Ok(self.buf)
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
