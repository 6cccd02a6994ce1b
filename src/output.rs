//! Output sink: terminal echo and the itinerary file

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::Result;
use crate::models::GeneratedItinerary;

/// Writes the itinerary to the terminal and to a file that is overwritten
/// on every successful run
pub struct OutputSink<W> {
    path: PathBuf,
    out: W,
}

impl<W: Write> OutputSink<W> {
    pub fn new(path: impl Into<PathBuf>, out: W) -> Self {
        Self {
            path: path.into(),
            out,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Print text immediately, without a trailing newline
    pub fn echo(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    /// The terminal stream, for status lines
    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Overwrite the output file with the full itinerary text and confirm
    /// on the terminal.
    pub fn persist(&mut self, itinerary: &GeneratedItinerary) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let text = itinerary.text();
        fs::write(&self.path, &text)?;
        info!(path = %self.path.display(), bytes = text.len(), "Itinerary written");

        writeln!(self.out, "\n\nItinerary also written to {}", self.path.display())?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
