//! Drives one header through the emission and excision passes.
//!
//! All reads happen before any write. The emission pass consumes original
//! coordinates against the untouched buffer and appends the out-of-line
//! definitions to the companion file; the excision pass then re-walks the
//! same tree in the same document order and edits the header buffer left to
//! right, folding each edit's length change into the offset bias for the
//! next one. Mutating during a single walk would invalidate every coordinate
//! computed after the first edit.
//!
//! The companion append happens strictly before the header rewrite and there
//! is no rollback: a failure between the two leaves the companion extended
//! while the header keeps its bodies. Recognized atomicity gap.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::buffer::{OffsetBias, SourceBuffer};
use crate::compdb::CompilationDatabase;
use crate::extract::{
    body_range, extracted_definition, is_function_definition, walk_file_nodes,
};
use crate::formatter::{ClangFormat, Reformat};
use crate::syntax::cpp;

/// What is left behind in the header where a body used to be.
const TERMINATOR: &str = ";";

pub struct Relocator<F = ClangFormat> {
    compdb: CompilationDatabase,
    formatter: F,
}

impl Relocator<ClangFormat> {
    pub fn new(compdb: CompilationDatabase) -> Self {
        Self {
            compdb,
            formatter: ClangFormat::new(),
        }
    }
}

impl<F: Reformat> Relocator<F> {
    pub fn with_formatter(compdb: CompilationDatabase, formatter: F) -> Self {
        Self { compdb, formatter }
    }

    /// Relocate every extractable body in `header` into its `.cpp` sibling,
    /// then rewrite the header with terminators in place of the bodies.
    pub fn relocate_file(&self, header: &Path) -> Result<()> {
        // Resolving arguments first means a missing compilation-database
        // entry aborts before anything is touched.
        let args = self.compdb.arguments_for(header)?;

        let mut buffer = SourceBuffer::from_path(header)
            .with_context(|| format!("reading {}", header.display()))?;
        let unit = cpp::parse_unit(header, buffer.text().to_string(), &args)?;
        let root = unit.root();

        let companion = header.with_extension("cpp");
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&companion)
            .with_context(|| format!("opening {} for append", companion.display()))?;
        out.write_all(b"\n")
            .with_context(|| format!("appending to {}", companion.display()))?;

        let mut emitted = 0usize;
        for node in walk_file_nodes(header, &root) {
            if !is_function_definition(&node) {
                continue;
            }
            let definition = extracted_definition(&node, &buffer, &self.formatter)?;
            out.write_all(definition.as_bytes())
                .and_then(|_| out.write_all(b"\n\n"))
                .with_context(|| format!("appending to {}", companion.display()))?;
            emitted += 1;
        }
        debug!("emitted {} definitions into {}", emitted, companion.display());

        let mut bias = OffsetBias::default();
        for node in walk_file_nodes(header, &root) {
            if !is_function_definition(&node) {
                continue;
            }
            bias = buffer.replace_range(&body_range(&node, true)?, TERMINATOR, bias)?;
        }

        fs::write(header, buffer.text())
            .with_context(|| format!("rewriting {}", header.display()))?;
        info!(
            "relocated {} definitions out of {}",
            emitted,
            header.display()
        );
        Ok(())
    }
}
