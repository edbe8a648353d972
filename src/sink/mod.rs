//! Commit sinks: where an effective layout goes once the engine decides it changed.

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::error::Result;
use crate::layout::EffectiveLayout;
use crate::state::RoleId;

/// Receives effective layouts the staging cache lets through.
pub trait CommitSink {
    /// Realize a freshly composed layout in the host.
    fn apply(&mut self, layout: &EffectiveLayout) -> Result<()>;

    /// Re-apply role-dependent visibility for an unchanged layout after a role switch.
    fn refresh_role(&mut self, _role: Option<&RoleId>, _layout: &EffectiveLayout) -> Result<()> {
        Ok(())
    }
}

/// Keeps every commit and role refresh, oldest first.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub commits: Vec<EffectiveLayout>,
    pub role_refreshes: Vec<(Option<RoleId>, blake3::Hash)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&EffectiveLayout> {
        self.commits.last()
    }
}

impl CommitSink for RecordingSink {
    fn apply(&mut self, layout: &EffectiveLayout) -> Result<()> {
        self.commits.push(layout.clone());
        Ok(())
    }

    fn refresh_role(&mut self, role: Option<&RoleId>, layout: &EffectiveLayout) -> Result<()> {
        self.role_refreshes
            .push((role.cloned(), layout.fingerprint()));
        Ok(())
    }
}

/// Writes a column-aligned text summary of each commit.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

impl<W: Write> CommitSink for WriterSink<W> {
    fn apply(&mut self, layout: &EffectiveLayout) -> Result<()> {
        let fingerprint = layout.fingerprint().to_hex();
        writeln!(
            self.writer,
            "layout {} layers [{}] #{}",
            layout.base,
            layout.layers.join(", "),
            &fingerprint.as_str()[..12]
        )?;

        let column = layout
            .elements
            .keys()
            .chain(layout.windows.keys())
            .map(|name| name.width())
            .max()
            .unwrap_or(0);

        for (kind, element) in &layout.elements {
            writeln!(
                self.writer,
                "  element {} x={:.1} y={:.1} scale={:.2} opacity={:.2} anchor={:?}",
                pad(kind, column),
                element.x,
                element.y,
                element.scale,
                element.opacity,
                element.anchor
            )?;
        }
        for (name, window) in &layout.windows {
            writeln!(
                self.writer,
                "  window  {} x={:.1} y={:.1}",
                pad(name, column),
                window.x,
                window.y
            )?;
        }
        for overlay in &layout.overlays {
            writeln!(self.writer, "  overlay {}", overlay.key)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn refresh_role(&mut self, role: Option<&RoleId>, layout: &EffectiveLayout) -> Result<()> {
        writeln!(
            self.writer,
            "role {} on layout {}",
            role.map(String::as_str).unwrap_or("-"),
            layout.base
        )?;
        self.writer.flush()?;
        Ok(())
    }
}
