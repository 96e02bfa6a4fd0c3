//! Global workspace symbol index.
//!
//! Populated one file at a time from extracted symbol trees; supports FQN
//! lookup and fuzzy search over suffix keys and acronyms.

use dashmap::DashMap;
use php_sym_types::{Modifiers, Symbol, SymbolKind};
use std::sync::Arc;

/// Global index of all symbols in the workspace.
#[derive(Default)]
pub struct WorkspaceIndex {
    /// File URI → that file's symbol tree.
    files: DashMap<String, Arc<Symbol>>,
    /// Qualified name → summary symbol (children stripped).
    definitions: DashMap<String, Arc<Symbol>>,
    /// Lowercased suffix key or acronym → qualified names carrying it.
    keys: DashMap<String, Vec<String>>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Replace the symbols of a file with a freshly extracted tree.
    pub fn update_file(&self, uri: &str, root: Symbol) {
        self.remove_file(uri);

        let mut count = 0usize;
        root.walk(&mut |symbol| {
            if !is_indexable(symbol) {
                return;
            }
            let qualified = symbol.qualified_name();
            self.definitions
                .insert(qualified.clone(), Arc::new(summarize(symbol)));
            for key in symbol.suffix_keys() {
                self.keys.entry(key).or_default().push(qualified.clone());
            }
            let acronym = symbol.acronym();
            if !acronym.is_empty() {
                self.keys.entry(acronym).or_default().push(qualified.clone());
            }
            count += 1;
        });
        tracing::debug!(uri, count, "indexed file symbols");

        self.files.insert(uri.to_string(), Arc::new(root));
    }

    /// Remove all symbols contributed by a file.
    pub fn remove_file(&self, uri: &str) {
        let Some((_, old)) = self.files.remove(uri) else {
            return;
        };
        old.walk(&mut |symbol| {
            if !is_indexable(symbol) {
                return;
            }
            let qualified = symbol.qualified_name();
            self.definitions.remove(&qualified);
            let drop_key = |key: &str| {
                if let Some(mut entry) = self.keys.get_mut(key) {
                    entry.retain(|q| q != &qualified);
                    if entry.is_empty() {
                        drop(entry);
                        self.keys.remove(key);
                    }
                }
            };
            for key in symbol.suffix_keys() {
                drop_key(&key);
            }
            let acronym = symbol.acronym();
            if !acronym.is_empty() {
                drop_key(&acronym);
            }
        });
    }

    /// The symbol tree of a file, if indexed.
    pub fn file(&self, uri: &str) -> Option<Arc<Symbol>> {
        self.files.get(uri).map(|r| r.value().clone())
    }

    /// Look up a definition by qualified name (`App\Foo`, `App\Foo::bar`,
    /// `App\Foo::$prop`).
    pub fn get(&self, qualified_name: &str) -> Option<Arc<Symbol>> {
        self.definitions
            .get(qualified_name)
            .map(|r| r.value().clone())
    }

    /// Fuzzy search: exact suffix-key or acronym match first, then a
    /// substring scan over definition names.
    pub fn search(&self, query: &str) -> Vec<Arc<Symbol>> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<Arc<Symbol>> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        if let Some(entry) = self.keys.get(&query) {
            for qualified in entry.value() {
                if seen.contains(qualified) {
                    continue;
                }
                if let Some(symbol) = self.get(qualified) {
                    seen.push(qualified.clone());
                    out.push(symbol);
                }
            }
        }

        if out.is_empty() {
            for entry in self.definitions.iter() {
                if entry.value().name.to_lowercase().contains(&query) {
                    out.push(entry.value().clone());
                }
            }
        }
        out
    }
}

/// Workspace search covers named definitions; locals, parameters and
/// anonymous symbols stay file-private.
fn is_indexable(symbol: &Symbol) -> bool {
    if symbol.is_anonymous() || symbol.modifiers.contains(Modifiers::USE) {
        return false;
    }
    matches!(
        symbol.kind,
        SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Trait
            | SymbolKind::Function
            | SymbolKind::Method
            | SymbolKind::Property
            | SymbolKind::ClassConstant
            | SymbolKind::Constant
    )
}

fn summarize(symbol: &Symbol) -> Symbol {
    Symbol {
        kind: symbol.kind,
        name: symbol.name.clone(),
        modifiers: symbol.modifiers,
        type_hint: symbol.type_hint.clone(),
        location: symbol.location.clone(),
        scope: symbol.scope.clone(),
        value: symbol.value.clone(),
        children: Vec::new(),
        associated: symbol.associated.clone(),
        doc: symbol.doc.clone(),
    }
}
