//! Shared types for php-sym.
//!
//! Contains the symbol tree model, references, modifier flags and the
//! PHPDoc data model shared by the parser and index crates.

pub mod keys;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Kind of a PHP symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    File,
    Namespace,
    Class,
    Interface,
    Trait,
    Function,
    Method,
    Parameter,
    Property,
    ClassConstant,
    Constant,
    Variable,
    Use,
}

impl SymbolKind {
    /// Convert to LSP SymbolKind.
    pub fn to_lsp_symbol_kind(self) -> lsp_types::SymbolKind {
        match self {
            SymbolKind::File => lsp_types::SymbolKind::FILE,
            SymbolKind::Namespace => lsp_types::SymbolKind::NAMESPACE,
            SymbolKind::Class => lsp_types::SymbolKind::CLASS,
            SymbolKind::Interface => lsp_types::SymbolKind::INTERFACE,
            SymbolKind::Trait => lsp_types::SymbolKind::INTERFACE,
            SymbolKind::Function => lsp_types::SymbolKind::FUNCTION,
            SymbolKind::Method => lsp_types::SymbolKind::METHOD,
            SymbolKind::Parameter => lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Property => lsp_types::SymbolKind::PROPERTY,
            SymbolKind::ClassConstant => lsp_types::SymbolKind::CONSTANT,
            SymbolKind::Constant => lsp_types::SymbolKind::CONSTANT,
            SymbolKind::Variable => lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Use => lsp_types::SymbolKind::MODULE,
        }
    }
}

bitflags! {
    /// Modifier bits on a symbol.
    ///
    /// Visibility bits are mutually exclusive; `merge_visibility` keeps the
    /// first one seen. `USE` marks both use-imports and closure-captured
    /// variables. `MAGIC` marks members synthesised from PHPDoc tags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        const REFERENCE = 1 << 6;
        const VARIADIC = 1 << 7;
        const ANONYMOUS = 1 << 8;
        const USE = 1 << 9;
        const MAGIC = 1 << 10;
        const READ_ONLY = 1 << 11;
        const WRITE_ONLY = 1 << 12;
    }
}

impl Modifiers {
    pub const VISIBILITY: Modifiers = Modifiers::PUBLIC
        .union(Modifiers::PROTECTED)
        .union(Modifiers::PRIVATE);

    pub fn has_visibility(self) -> bool {
        self.intersects(Modifiers::VISIBILITY)
    }

    /// Add `other`'s bits, keeping any visibility already present and
    /// dropping `FINAL` when the result would also be `ABSTRACT`.
    pub fn merge(self, other: Modifiers) -> Modifiers {
        let mut merged = if self.has_visibility() {
            self | (other - Modifiers::VISIBILITY)
        } else {
            self | other
        };
        if merged.contains(Modifiers::ABSTRACT) {
            merged -= Modifiers::FINAL;
        }
        merged
    }

    /// Default to public visibility when no visibility bit is set.
    pub fn or_public(self) -> Modifiers {
        if self.has_visibility() {
            self
        } else {
            self | Modifiers::PUBLIC
        }
    }
}

impl Serialize for Modifiers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Modifiers {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Modifiers::from_bits_truncate(u16::deserialize(
            deserializer,
        )?))
    }
}

/// Byte and line/column extent of a node within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackedRange {
    pub start_byte: u32,
    pub end_byte: u32,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl PackedRange {
    pub fn to_lsp_range(self) -> lsp_types::Range {
        lsp_types::Range {
            start: lsp_types::Position::new(self.start_line, self.start_col),
            end: lsp_types::Position::new(self.end_line, self.end_col),
        }
    }
}

/// Document URI plus range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: PackedRange,
}

/// Description and type derived from a PHPDoc comment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocInfo {
    pub description: Option<String>,
    pub type_hint: Option<String>,
}

impl DocInfo {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.type_hint.is_none()
    }
}

/// A definition in the symbol tree.
///
/// `name` is the fully qualified name for namespaced top-level definitions
/// (classes, functions, global constants), the short name for members, the
/// `$`-prefixed name for properties, parameters and variables, and the
/// document URI for the file root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub modifiers: Modifiers,
    /// Declared or doc-derived type, resolved where possible.
    pub type_hint: Option<String>,
    pub location: Location,
    /// Qualified name of the containing symbol.
    pub scope: Option<String>,
    /// Literal text of the initialiser, if any.
    pub value: Option<String>,
    pub children: Vec<Symbol>,
    /// Base class, implemented interfaces and used traits, by reference.
    pub associated: Vec<Reference>,
    pub doc: Option<DocInfo>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, location: Location) -> Symbol {
        Symbol {
            kind,
            name: name.into(),
            modifiers: Modifiers::empty(),
            type_hint: None,
            location,
            scope: None,
            value: None,
            children: Vec::new(),
            associated: Vec::new(),
            doc: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.modifiers.contains(Modifiers::ANONYMOUS)
    }

    /// The name a member is addressed by from outside: `Scope::name` for
    /// class members, the plain name otherwise.
    pub fn qualified_name(&self) -> String {
        match self.kind {
            SymbolKind::Method | SymbolKind::Property | SymbolKind::ClassConstant => {
                match &self.scope {
                    Some(scope) if !scope.is_empty() => format!("{}::{}", scope, self.name),
                    _ => self.name.clone(),
                }
            }
            _ => self.name.clone(),
        }
    }

    /// Acronym key for fuzzy lookup; empty for anonymous symbols.
    pub fn acronym(&self) -> String {
        if self.is_anonymous() {
            return String::new();
        }
        keys::acronym(&self.name)
    }

    /// Right-suffix keys for fuzzy lookup; empty for anonymous symbols.
    pub fn suffix_keys(&self) -> Vec<String> {
        if self.is_anonymous() {
            return Vec::new();
        }
        keys::suffix_keys(&self.name)
    }

    /// Visit this symbol and all descendants, depth first.
    pub fn walk<F: FnMut(&Symbol)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

/// An occurrence of a name denoting a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: SymbolKind,
    /// Resolved fully qualified name (best effort).
    pub name: String,
    /// Original written form, kept only when resolution rewrote the name
    /// for a function or constant so a global-namespace fallback can retry.
    pub unresolved_name: Option<String>,
    pub range: PackedRange,
    /// Resolved type for definitions whose type the pass learned.
    pub type_hint: Option<String>,
}

impl Reference {
    pub fn new(kind: SymbolKind, name: impl Into<String>, range: PackedRange) -> Reference {
        Reference {
            kind,
            name: name.into(),
            unresolved_name: None,
            range,
            type_hint: None,
        }
    }
}
