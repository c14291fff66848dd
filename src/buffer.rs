//! Mutable text state for one file being rewritten.
//!
//! A [`SourceBuffer`] owns two views of the same file: the full text as one
//! string, addressed by byte offsets, and a line view used only by [`cut`].
//! The views are not kept synchronized: `cut` mutates the line view while
//! `copy_range`/`replace_range` work on the full text. Callers must not
//! interleave both update paths on one buffer without re-deriving one view
//! from the other.
//!
//! All coordinates come from the front end and describe the *original* file
//! text. Once `replace_range` has run, later offsets are only valid after
//! adding the accumulated [`OffsetBias`]; an unbiased offset that lands
//! outside the current text is a caller bug and fails hard.
//!
//! [`cut`]: SourceBuffer::cut

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::syntax::SourceRange;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("range [{start}, {end}) is outside the current text (len {len}); coordinates are stale or missing the offset bias")]
    OffsetOutOfBounds { start: usize, end: usize, len: usize },

    #[error("range start {start} is past range end {end}")]
    InvertedRange { start: usize, end: usize },

    #[error("offset bias {bias} moves offset {offset} before the start of the buffer")]
    BiasUnderflow { offset: usize, bias: i64 },

    #[error("line {line} is outside the line view (1..={len})")]
    LineOutOfBounds { line: u32, len: usize },
}

/// Cumulative byte-length change from prior edits.
///
/// Sequential `replace_range` calls on one buffer must run in increasing
/// original-offset order; each call takes the bias accumulated so far and
/// returns the bias for the next call, keeping the ordering dependency
/// visible in the signature. After k edits the bias equals minus the total
/// shrinkage, so adding it to the (k+1)-th edit's original offsets yields
/// positions valid in the current text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetBias(i64);

impl OffsetBias {
    /// Shift an original byte offset into the current text.
    pub fn apply(self, offset: usize) -> Result<usize, BufferError> {
        let shifted = offset as i64 + self.0;
        if shifted < 0 {
            return Err(BufferError::BiasUnderflow {
                offset,
                bias: self.0,
            });
        }
        Ok(shifted as usize)
    }

    fn absorb_shrinkage(self, shrinkage: i64) -> OffsetBias {
        OffsetBias(self.0 - shrinkage)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

/// Canonical mutable representation of one file's text.
pub struct SourceBuffer {
    text: String,
    lines: Vec<String>,
}

impl SourceBuffer {
    pub fn from_path(path: &Path) -> io::Result<Self> {
        Ok(Self::from_text(fs::read_to_string(path)?))
    }

    pub fn from_text(text: String) -> Self {
        let lines = text.lines().map(str::to_owned).collect();
        Self { text, lines }
    }

    /// Current full text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current line view (terminators stripped).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Read-only copy of the text between the range's byte offsets.
    pub fn copy_range(&self, range: &SourceRange) -> Result<String, BufferError> {
        let (start, end) = range.offsets();
        self.slice_checked(start, end).map(str::to_owned)
    }

    /// Replace the slice at `range` shifted by `bias` with `replacement`.
    ///
    /// Returns the bias to use for the next edit. Calls must target
    /// increasing original offsets; overlapping ranges are undefined.
    pub fn replace_range(
        &mut self,
        range: &SourceRange,
        replacement: &str,
        bias: OffsetBias,
    ) -> Result<OffsetBias, BufferError> {
        let start = bias.apply(range.start.offset)?;
        let end = bias.apply(range.end.offset)?;
        self.slice_checked(start, end)?;

        let old_len = self.text.len();
        self.text.replace_range(start..end, replacement);
        let shrinkage = old_len as i64 - self.text.len() as i64;
        Ok(bias.absorb_shrinkage(shrinkage))
    }

    /// Destructively remove `range` from the line view, returning the removed
    /// text as one or more fragments.
    ///
    /// Lines and columns are 1-based. A range is a full-line match when it
    /// starts at column 1 and its end column equals the line's length
    /// (terminator excluded); partial cuts treat the end column inclusively
    /// and clamp columns past the line end.
    ///
    /// Independent of the offset-bias mechanism; not used by the two-pass
    /// relocation algorithm, but a supported primitive for whole-line
    /// extraction.
    pub fn cut(&mut self, range: &SourceRange) -> Result<Vec<String>, BufferError> {
        let start = range.start;
        let end = range.end;
        self.check_line(start.line)?;
        self.check_line(end.line)?;

        let start_line = start.line as usize;
        let end_line = end.line as usize;

        if start_line == end_line {
            let line = &self.lines[start_line - 1];
            if start.column == 1 && end.column as usize == line.len() {
                return Ok(vec![self.lines.remove(start_line - 1)]);
            }
            return Ok(vec![self.cut_part(
                start_line,
                start.column as usize,
                Some(end.column as usize),
            )]);
        }

        if end_line - start_line == 1 {
            return Ok(vec![
                self.cut_part(start_line, start.column as usize, None),
                self.cut_part(end_line, 1, Some(end.column as usize)),
            ]);
        }

        let mut fragments = vec![self.cut_part(start_line, start.column as usize, None)];
        fragments.extend(self.lines[start_line..end_line - 1].iter().cloned());
        fragments.push(self.cut_part(end_line, 1, Some(end.column as usize)));
        // The edited first and last lines stay in the view; only the
        // fully-enclosed middle lines go.
        self.lines.drain(start_line..end_line - 1);
        Ok(fragments)
    }

    /// Excise columns `[start_col, end_col]` from one line, leaving prefix
    /// plus suffix in the view. `None` means through the end of the line.
    fn cut_part(&mut self, line_num: usize, start_col: usize, end_col: Option<usize>) -> String {
        let line = &self.lines[line_num - 1];
        let from = (start_col - 1).min(line.len());
        let to = end_col.unwrap_or(line.len()).min(line.len()).max(from);
        let excised = line[from..to].to_string();
        let kept = format!("{}{}", &line[..from], &line[to..]);
        self.lines[line_num - 1] = kept;
        excised
    }

    fn slice_checked(&self, start: usize, end: usize) -> Result<&str, BufferError> {
        if start > end {
            return Err(BufferError::InvertedRange { start, end });
        }
        self.text
            .get(start..end)
            .ok_or(BufferError::OffsetOutOfBounds {
                start,
                end,
                len: self.text.len(),
            })
    }

    fn check_line(&self, line: u32) -> Result<(), BufferError> {
        if line == 0 || line as usize > self.lines.len() {
            return Err(BufferError::LineOutOfBounds {
                line,
                len: self.lines.len(),
            });
        }
        Ok(())
    }
}
