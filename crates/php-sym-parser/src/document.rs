//! Parsed PHP document: tree-sitter + ropey::Rope for incremental reparse.

use php_sym_types::{Location, PackedRange};
use ropey::Rope;
use tree_sitter::{InputEdit, Node, Parser, Point, Tree};

/// A single PHP document with its parse tree and source text.
pub struct Document {
    uri: String,
    parser: Parser,
    tree: Option<Tree>,
    rope: Rope,
}

impl Document {
    /// Parse `text` as a new document.
    pub fn open(uri: impl Into<String>, text: &str) -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .expect("Failed to set tree-sitter PHP language");

        let rope = Rope::from_str(text);
        let tree = parser.parse(text.as_bytes(), None);
        Document {
            uri: uri.into(),
            parser,
            tree,
            rope,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Apply an incremental edit and reparse.
    ///
    /// The range is (start_line, start_char, end_line, end_char) in 0-based
    /// coordinates; `new_text` is the replacement text.
    pub fn apply_edit(
        &mut self,
        start_line: u32,
        start_char: u32,
        end_line: u32,
        end_char: u32,
        new_text: &str,
    ) {
        let start_line = start_line as usize;
        let start_char = start_char as usize;
        let end_line = end_line as usize;
        let end_char = end_char as usize;

        let start_byte = self.position_to_byte(start_line, start_char);
        let old_end_byte = self.position_to_byte(end_line, end_char);

        let start_point = Point::new(start_line, start_char);
        let old_end_point = Point::new(end_line, end_char);

        let start_char_idx = self.rope.byte_to_char(start_byte);
        let end_char_idx = self.rope.byte_to_char(old_end_byte);
        self.rope.remove(start_char_idx..end_char_idx);
        self.rope.insert(start_char_idx, new_text);

        let new_end_byte = start_byte + new_text.len();
        let (new_end_line, new_end_char) = self.byte_to_position(new_end_byte);
        let new_end_point = Point::new(new_end_line, new_end_char);

        if let Some(tree) = &mut self.tree {
            tree.edit(&InputEdit {
                start_byte,
                old_end_byte,
                new_end_byte,
                start_position: start_point,
                old_end_position: old_end_point,
                new_end_position: new_end_point,
            });
        }

        let source = self.rope.to_string();
        self.tree = self.parser.parse(source.as_bytes(), self.tree.as_ref());
    }

    /// The current tree, if parsing succeeded.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// The current source as a String.
    pub fn source(&self) -> String {
        self.rope.to_string()
    }

    /// Whether the tree contains syntax errors or missing nodes.
    pub fn has_syntax_errors(&self) -> bool {
        self.tree
            .as_ref()
            .map(|t| t.root_node().has_error())
            .unwrap_or(true)
    }

    fn position_to_byte(&self, line: usize, character: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        let line_start = self.rope.line_to_byte(line);
        let line_len = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_byte(line + 1) - line_start
        } else {
            self.rope.len_bytes() - line_start
        };
        line_start + character.min(line_len)
    }

    fn byte_to_position(&self, byte: usize) -> (usize, usize) {
        let byte = byte.min(self.rope.len_bytes());
        let line = self.rope.byte_to_line(byte);
        let line_start = self.rope.line_to_byte(line);
        (line, byte - line_start)
    }
}

/// Exact source text of a node.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Packed byte and line/column extent of a node.
pub fn node_range(node: Node) -> PackedRange {
    let start = node.start_position();
    let end = node.end_position();
    PackedRange {
        start_byte: node.start_byte() as u32,
        end_byte: node.end_byte() as u32,
        start_line: start.row as u32,
        start_col: start.column as u32,
        end_line: end.row as u32,
        end_col: end.column as u32,
    }
}

/// Packed location of a node within a document.
pub fn node_location(uri: &str, node: Node) -> Location {
    Location {
        uri: uri.to_string(),
        range: node_range(node),
    }
}
