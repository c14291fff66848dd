//! Locating extractable definitions and slicing their text.
//!
//! Pure queries over the syntax tree plus reads of the (unedited) source
//! buffer. Everything here is generic over the front-end capability
//! interface; nothing mutates.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::buffer::SourceBuffer;
use crate::formatter::Reformat;
use crate::syntax::{NodeKind, SourceRange, SyntaxCursor, Token};

/// True when `node` is the translation-unit root or resolves to `path`.
///
/// Nodes with no file association (built-ins, implicit declarations) belong
/// to no file; that is not an error.
pub fn belongs_to_file<C: SyntaxCursor>(node: &C, path: &Path) -> bool {
    if node.kind() == NodeKind::TranslationUnit {
        return true;
    }
    match node.file() {
        Some(file) => {
            let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
            let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            file == target
        }
        None => false,
    }
}

/// Pre-order walk of the nodes belonging to `path`, in document order.
///
/// Recursion happens only beneath nodes that already belong to the file, so
/// subtrees from other files (textual includes) are pruned whole. This bounds
/// the walk to the target file's own declarations.
pub fn walk_file_nodes<C: SyntaxCursor>(path: &Path, node: &C) -> Vec<C> {
    let mut nodes = Vec::new();
    collect_file_nodes(path, node, &mut nodes);
    nodes
}

fn collect_file_nodes<C: SyntaxCursor>(path: &Path, node: &C, out: &mut Vec<C>) {
    if !belongs_to_file(node, path) {
        return;
    }
    out.push(node.clone());
    for child in node.children() {
        collect_file_nodes(path, &child, out);
    }
}

/// Extraction predicate: free functions, methods and destructors that are
/// definitions with a brace-delimited body. Constructors never match.
pub fn is_function_definition<C: SyntaxCursor>(node: &C) -> bool {
    if !matches!(
        node.kind(),
        NodeKind::Function | NodeKind::Method | NodeKind::Destructor
    ) {
        return false;
    }
    if !node.is_definition() {
        return false;
    }
    node.tokens().iter().any(Token::is_open_brace)
}

/// Scope-qualified name: spellings along the semantic-parent chain joined
/// root-to-leaf with `::`. The root and nodes without a spelling contribute
/// nothing.
pub fn qualified_name<C: SyntaxCursor>(node: &C) -> String {
    if node.kind() == NodeKind::TranslationUnit {
        return String::new();
    }
    let prefix = node
        .semantic_parent()
        .map(|parent| qualified_name(&parent))
        .unwrap_or_default();
    let spelling = node.spelling();
    if spelling.is_empty() {
        return prefix;
    }
    if prefix.is_empty() {
        spelling
    } else {
        format!("{}::{}", prefix, spelling)
    }
}

/// Literal declaration text: the source slice from the first token's start
/// to the end of the last token before the opening brace, reconstructed from
/// the buffer's physical lines. Original formatting and comments survive
/// verbatim.
pub fn declaration_text<C: SyntaxCursor>(node: &C, buffer: &SourceBuffer) -> Result<String> {
    let tokens = node.tokens();
    let decl: Vec<&Token> = tokens.iter().take_while(|t| !t.is_open_brace()).collect();
    let (first, last) = match (decl.first(), decl.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => bail!(
            "definition of `{}` has no tokens before its body",
            node.spelling()
        ),
    };

    let start = first.extent.start;
    let end = last.extent.end;
    let span = buffer
        .lines()
        .get(start.line as usize - 1..end.line as usize)
        .with_context(|| {
            format!(
                "declaration lines {}..{} fall outside the buffer",
                start.line, end.line
            )
        })?;

    // Range-end columns point one past the last character.
    if let [line] = span {
        let from = (start.column as usize - 1).min(line.len());
        let to = (end.column as usize - 1).clamp(from, line.len());
        return Ok(line[from..to].to_string());
    }

    let mut lines = span.to_vec();
    let from = (start.column as usize - 1).min(lines[0].len());
    let trimmed_first = lines[0][from..].to_string();
    lines[0] = trimmed_first;
    let last_idx = lines.len() - 1;
    let to = (end.column as usize - 1).min(lines[last_idx].len());
    let trimmed_last = lines[last_idx][..to].to_string();
    lines[last_idx] = trimmed_last;
    Ok(lines.join("\n"))
}

/// Source range of the body.
///
/// With `use_prev_token` false the range opens at the brace itself; with
/// true it opens at the end of the token immediately before the brace, so an
/// edit of the range removes the brace too and leaves that token intact.
pub fn body_range<C: SyntaxCursor>(node: &C, use_prev_token: bool) -> Result<SourceRange> {
    let tokens = node.tokens();
    let mut prev: Option<&Token> = None;
    for token in &tokens {
        if token.is_open_brace() {
            let start = if use_prev_token {
                prev.with_context(|| {
                    format!("body of `{}` opens at the very first token", node.spelling())
                })?
                .extent
                .end
            } else {
                token.extent.start
            };
            return Ok(SourceRange::new(start, node.extent().end));
        }
        prev = Some(token);
    }
    bail!("definition of `{}` has no opening brace", node.spelling())
}

/// Declaration text with the unqualified spelling substituted by the
/// qualified name.
///
/// A literal, all-occurrences substitution, not a semantic rewrite: a
/// same-spelled identifier elsewhere in the declaration (default arguments,
/// trailing return types) gets substituted too. Known fidelity gap, kept
/// as-is.
pub fn qualified_declaration<C: SyntaxCursor>(node: &C, buffer: &SourceBuffer) -> Result<String> {
    let decl = declaration_text(node, buffer)?;
    let spelling = node.spelling();
    if spelling.is_empty() {
        return Ok(decl);
    }
    Ok(decl.replace(&spelling, &qualified_name(node)))
}

/// Out-of-line definition ready for the companion file: qualified
/// declaration, newline, formatted body.
pub fn extracted_definition<C: SyntaxCursor, F: Reformat>(
    node: &C,
    buffer: &SourceBuffer,
    formatter: &F,
) -> Result<String> {
    let declaration = qualified_declaration(node, buffer)?;
    let body = buffer.copy_range(&body_range(node, false)?)?;
    let body = formatter
        .reformat(&body)
        .with_context(|| format!("formatting body of `{}`", qualified_name(node)))?;
    Ok(format!("{}\n{}", declaration, body))
}
