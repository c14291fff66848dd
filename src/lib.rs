//! Outliner - moves inline C++ function bodies out of headers.
//!
//! Inline definitions in a header are re-emitted as out-of-line qualified
//! definitions in the companion `.cpp` file, and the header keeps only the
//! declaration. The syntax tree comes from an external front end consumed
//! through a narrow capability interface; the rewrite itself is a sequence
//! of offset-biased edits against one mutable text buffer.

pub mod buffer;
pub mod compdb;
pub mod extract;
pub mod formatter;
pub mod relocate;
pub mod syntax;

pub use buffer::{BufferError, OffsetBias, SourceBuffer};
pub use compdb::{CompDbError, CompilationDatabase};
pub use formatter::{ClangFormat, FormatError, Reformat};
pub use relocate::Relocator;
