//! Terminal rendering of view nodes and the busy indicator.

use rollcall_core::{Node, Severity};
use std::fmt::{self, Write as _};

/// Render nodes as indented text, one element per line.
pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = nodes.iter().try_for_each(|node| render_node(&mut out, node, 0));
    out
}

fn render_node(out: &mut String, node: &Node, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match node {
        Node::Placeholder(lines) => lines
            .iter()
            .try_for_each(|line| writeln!(out, "{pad}  {line}")),
        Node::Summary { title, detail, severity } => {
            let marker = match severity {
                Severity::Success => "✓",
                Severity::Error => "⚠️",
                Severity::Info => "•",
            };
            writeln!(out, "{pad}{marker} {title}")?;
            writeln!(out, "{pad}  {detail}")
        }
        Node::StudentCard { student_id, confidence } => writeln!(
            out,
            "{pad}  [{student_id}]  Confidence: {confidence}%  ✓ Present"
        ),
        Node::UnknownCard { ordinal } => writeln!(
            out,
            "{pad}  ⚠️ Unknown Person #{ordinal}  Not in student database (possible security concern)"
        ),
        Node::Tag(id) => writeln!(out, "{pad}  • {id}"),
        Node::DateSection { title, body } => {
            writeln!(out, "{pad}📅 {title}")?;
            body.iter().try_for_each(|child| render_node(out, child, depth + 1))
        }
        Node::AttendanceCard {
            student_id,
            status,
            timestamp,
        } => writeln!(out, "{pad}  {student_id}  [{status}]  ⏰ {timestamp}"),
        Node::TotalPresent(count) => writeln!(out, "{pad}Total Present: {count}"),
    }
}

/// Busy indicator for one screen.
#[derive(Debug)]
pub struct BusyIndicator {
    label: &'static str,
    visible: bool,
    echo: bool,
}

impl BusyIndicator {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            visible: false,
            echo: false,
        }
    }

    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn show(&mut self) {
        self.visible = true;
        tracing::debug!(label = self.label, "busy");
        if self.echo {
            eprintln!("⏳ {}", self.label);
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
