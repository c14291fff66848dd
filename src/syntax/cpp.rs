//! Tree-sitter binding for C++ sources.
//!
//! Satisfies the [`SyntaxCursor`](super::SyntaxCursor) interface on top of
//! `tree-sitter-cpp`. Function-like nodes are classified by inspecting their
//! declarator (method vs constructor vs destructor) the same way the name is
//! located: unwrap the `function_declarator`, then look at the name node and
//! the enclosing class.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;
use tree_sitter::{Node, Parser, Point, Tree};

use super::{NodeKind, SourceLocation, SourceRange, SyntaxCursor, Token, TokenKind};

/// One parsed file: owns the tree and the text its coordinates refer to.
pub struct ParsedUnit {
    path: PathBuf,
    text: String,
    tree: Tree,
}

/// Parse `text` as C++.
///
/// `args` is the compile-argument list resolved for the file. A single-file
/// tree-sitter parse has no use for it, but the signature keeps the
/// collaborator contract that front ends needing flags rely on.
pub fn parse_unit(path: &Path, text: String, args: &[String]) -> Result<ParsedUnit> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_cpp::LANGUAGE.into())
        .map_err(|e| anyhow::anyhow!("failed to set C++ parser language: {}", e))?;

    let tree = parser
        .parse(&text, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))?;

    debug!(
        "parsed {} ({} compile arguments, unused by the single-file parse)",
        path.display(),
        args.len()
    );

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Ok(ParsedUnit { path, text, tree })
}

impl ParsedUnit {
    pub fn root(&self) -> CppCursor<'_> {
        CppCursor {
            node: self.tree.root_node(),
            unit: self,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Cursor over one node of a [`ParsedUnit`].
#[derive(Clone, Copy)]
pub struct CppCursor<'u> {
    node: Node<'u>,
    unit: &'u ParsedUnit,
}

impl<'u> CppCursor<'u> {
    fn text_of(&self, node: Node<'u>) -> &'u str {
        &self.unit.text[node.byte_range()]
    }

    fn function_kind(&self) -> NodeKind {
        // Template-wrapped definitions are a kind the relocation predicate
        // never matches; templates stay in the header.
        if self
            .node
            .parent()
            .is_some_and(|p| p.kind() == "template_declaration")
        {
            return NodeKind::Other;
        }

        let Some(name) = declarator_name(self.node) else {
            return NodeKind::Other;
        };
        let spelling = self.text_of(name);

        if name.kind() == "destructor_name" || spelling.starts_with('~') {
            return NodeKind::Destructor;
        }

        let class_name = self.enclosing_class_name();
        if class_name == Some(spelling) {
            return NodeKind::Constructor;
        }
        if class_name.is_some() || name.kind() == "field_identifier" {
            NodeKind::Method
        } else {
            NodeKind::Function
        }
    }

    /// Name of the nearest enclosing class or struct, if any.
    fn enclosing_class_name(&self) -> Option<&'u str> {
        let mut current = self.node.parent();
        while let Some(parent) = current {
            if matches!(parent.kind(), "class_specifier" | "struct_specifier") {
                return parent
                    .child_by_field_name("name")
                    .map(|name| self.text_of(name));
            }
            current = parent.parent();
        }
        None
    }
}

impl SyntaxCursor for CppCursor<'_> {
    fn kind(&self) -> NodeKind {
        match self.node.kind() {
            "translation_unit" => NodeKind::TranslationUnit,
            "function_definition" => self.function_kind(),
            _ => NodeKind::Other,
        }
    }

    fn spelling(&self) -> String {
        match self.node.kind() {
            "function_definition" => declarator_name(self.node)
                .map(|name| self.text_of(name).to_string())
                .unwrap_or_default(),
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
            | "namespace_definition" => self
                .node
                .child_by_field_name("name")
                .map(|name| self.text_of(name).to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn extent(&self) -> SourceRange {
        range_of(self.node)
    }

    /// A single-file parse never sees nodes from included files, so every
    /// node resolves to the parsed path.
    fn file(&self) -> Option<&Path> {
        Some(self.unit.path())
    }

    fn is_definition(&self) -> bool {
        self.node.child_by_field_name("body").is_some()
    }

    fn tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        collect_tokens(self.node, &self.unit.text, &mut tokens);
        tokens
    }

    fn semantic_parent(&self) -> Option<Self> {
        self.node.parent().map(|node| CppCursor {
            node,
            unit: self.unit,
        })
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|node| CppCursor {
                node,
                unit: self.unit,
            })
            .collect()
    }
}

/// Innermost declarator name node: identifier, field identifier, destructor
/// or operator name, unwrapping pointer/reference declarators and qualified
/// scopes.
fn declarator_name(node: Node) -> Option<Node> {
    let declarator = find_function_declarator(node)?;
    let mut cursor = declarator.walk();
    let name = declarator.children(&mut cursor).find(|c| {
        matches!(
            c.kind(),
            "operator_name"
                | "destructor_name"
                | "field_identifier"
                | "identifier"
                | "qualified_identifier"
        )
    })?;
    Some(unqualify(name))
}

/// `Foo::bar` declarators carry the scope; the unqualified name is the
/// rightmost component.
fn unqualify(node: Node) -> Node {
    if node.kind() == "qualified_identifier" {
        if let Some(inner) = node.child_by_field_name("name") {
            return unqualify(inner);
        }
    }
    node
}

fn find_function_declarator(node: Node) -> Option<Node> {
    if node.kind() == "function_declarator" {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        // Stay out of the body; lambdas carry declarators of their own.
        if child.kind() == "compound_statement" {
            continue;
        }
        if let Some(found) = find_function_declarator(child) {
            return Some(found);
        }
    }
    None
}

fn collect_tokens(node: Node, text: &str, out: &mut Vec<Token>) {
    if node.child_count() == 0 {
        let spelling = text[node.byte_range()].to_string();
        if spelling.is_empty() {
            // Zero-width error-recovery nodes carry no text.
            return;
        }
        let word_like = spelling
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let kind = if !node.is_named() && !word_like {
            TokenKind::Punctuation
        } else {
            TokenKind::Other
        };
        out.push(Token {
            kind,
            spelling,
            extent: range_of(node),
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(child, text, out);
    }
}

fn range_of(node: Node) -> SourceRange {
    SourceRange::new(
        location(node.start_position(), node.start_byte()),
        location(node.end_position(), node.end_byte()),
    )
}

fn location(point: Point, offset: usize) -> SourceLocation {
    SourceLocation {
        line: point.row as u32 + 1,
        column: point.column as u32 + 1,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::qualified_name;

    fn parse(src: &str) -> ParsedUnit {
        parse_unit(Path::new("sample.h"), src.to_string(), &[]).unwrap()
    }

    fn all_cursors<'u>(cursor: CppCursor<'u>, out: &mut Vec<CppCursor<'u>>) {
        out.push(cursor);
        for child in cursor.children() {
            all_cursors(child, out);
        }
    }

    fn find_kind<'u>(unit: &'u ParsedUnit, kind: NodeKind) -> Vec<CppCursor<'u>> {
        let mut cursors = Vec::new();
        all_cursors(unit.root(), &mut cursors);
        cursors.into_iter().filter(|c| c.kind() == kind).collect()
    }

    #[test]
    fn classifies_function_shapes() {
        let unit = parse(
            "namespace ns {\n\
             class Foo {\n\
             public:\n\
             \x20 Foo() {}\n\
             \x20 ~Foo() {}\n\
             \x20 int bar() { return 1; }\n\
             };\n\
             int baz() { return 2; }\n\
             }\n",
        );

        let constructors = find_kind(&unit, NodeKind::Constructor);
        assert_eq!(constructors.len(), 1);
        assert_eq!(constructors[0].spelling(), "Foo");

        let destructors = find_kind(&unit, NodeKind::Destructor);
        assert_eq!(destructors.len(), 1);
        assert_eq!(destructors[0].spelling(), "~Foo");

        let methods = find_kind(&unit, NodeKind::Method);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].spelling(), "bar");

        let functions = find_kind(&unit, NodeKind::Function);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].spelling(), "baz");
    }

    #[test]
    fn structural_parents_produce_qualified_names() {
        let unit = parse(
            "namespace ns {\n\
             class Foo {\n\
             public:\n\
             \x20 int bar() { return 1; }\n\
             };\n\
             }\n",
        );
        let methods = find_kind(&unit, NodeKind::Method);
        assert_eq!(qualified_name(&methods[0]), "ns::Foo::bar");
    }

    #[test]
    fn tokens_carry_punctuation_and_byte_offsets() {
        let src = "int f() { return 0; }\n";
        let unit = parse(src);
        let tokens = unit.root().tokens();

        let brace = tokens.iter().find(|t| t.spelling == "{").unwrap();
        assert_eq!(brace.kind, TokenKind::Punctuation);
        assert_eq!(brace.extent.start.offset, src.find('{').unwrap());

        let name = tokens.iter().find(|t| t.spelling == "f").unwrap();
        assert_eq!(name.kind, TokenKind::Other);
        assert_eq!(name.extent.start.line, 1);
        assert_eq!(name.extent.start.column, 5);
    }

    #[test]
    fn template_definitions_classify_as_other() {
        let unit = parse("template <typename T> T id(T x) { return x; }\n");
        assert!(find_kind(&unit, NodeKind::Function).is_empty());
        assert!(find_kind(&unit, NodeKind::Method).is_empty());
    }

    #[test]
    fn bodyless_declarations_are_not_definitions() {
        let unit = parse("int declared();\nint defined() { return 0; }\n");
        let functions = find_kind(&unit, NodeKind::Function);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].spelling(), "defined");
        assert!(functions[0].is_definition());
    }
}
