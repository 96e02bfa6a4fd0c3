//! The symbol-extraction pass.
//!
//! One synchronous ordered walk per document: pre-order decides whether a
//! node gets a transformer (everything else keeps a placeholder entry so
//! the stack mirrors the tree), post-order folds the finished transformer
//! into its nearest open ancestor. Name tokens resolve and record
//! references as they are reached, so references land in pre-order
//! arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use php_sym_types::{Modifiers, Reference, Symbol, SymbolKind};
use tree_sitter::{Node, Tree};

use crate::document::{node_range, node_text};
use crate::resolver::{is_reserved_name, ImportKind};
use crate::transform::{
    find_child_of_kind, scalar_type_of, CallableTf, ClassLikeTf, ClauseKind, ClauseTf,
    ClosureUseTf, ConstElementTf, EnumCaseTf, FileTf, MemberContext, MemberDeclTf, NamespaceTf,
    ParameterTf, PassContext, Product, PropertyElementTf, Token, Transform, TypeDeclTf,
    UseClauseTf, UseDeclTf,
};

/// Everything the pass produces for one document.
#[derive(Debug)]
pub struct DocumentSymbols {
    /// The file symbol with all definitions nested beneath it.
    pub root: Symbol,
    /// Every reference, in walk order.
    pub references: Vec<Reference>,
    /// CST node id → index into `references` for the node that bears it.
    pub node_references: HashMap<usize, usize>,
}

/// Extract the symbol tree and references of a parsed document.
///
/// Returns `None` when `cancel` was raised mid-walk; partial results are
/// discarded.
pub fn extract_document_symbols(
    tree: &Tree,
    source: &str,
    uri: &str,
    cancel: Option<&AtomicBool>,
) -> Option<DocumentSymbols> {
    SymbolPass::new(source, uri).run(tree, cancel)
}

struct SymbolPass<'a> {
    ctx: PassContext<'a>,
    stack: Vec<Option<Transform>>,
    root: Option<Symbol>,
}

impl<'a> SymbolPass<'a> {
    fn new(source: &'a str, uri: &'a str) -> Self {
        SymbolPass {
            ctx: PassContext::new(source, uri),
            stack: Vec::new(),
            root: None,
        }
    }

    fn run(mut self, tree: &Tree, cancel: Option<&AtomicBool>) -> Option<DocumentSymbols> {
        let mut cursor = tree.walk();
        'walk: loop {
            let node = cursor.node();
            let descend = self.enter(node);
            if descend && cursor.goto_first_child() {
                continue;
            }
            self.leave(cursor.node());
            loop {
                if cursor.goto_next_sibling() {
                    if is_cancelled(cancel) {
                        tracing::debug!(uri = self.ctx.uri, "symbol pass cancelled");
                        return None;
                    }
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
                self.leave(cursor.node());
            }
        }

        let root = self.root?;
        Some(DocumentSymbols {
            root,
            references: self.ctx.references,
            node_references: self.ctx.node_references,
        })
    }

    /// Pre-order: create a transformer for interesting nodes, handle
    /// tokens in place. Returns whether to descend into the subtree.
    fn enter(&mut self, node: Node) -> bool {
        let kind = node.kind();

        if !node.is_named() {
            self.on_punctuation(node);
            self.stack.push(None);
            return false;
        }

        let (transform, descend) = match kind {
            "comment" => {
                let text = node_text(node, self.ctx.source);
                if text.starts_with("/**") {
                    self.ctx.set_doc(text);
                }
                (None, false)
            }
            "name" | "qualified_name" | "relative_scope" => {
                self.on_name(node);
                (None, false)
            }
            "variable_name" => {
                self.on_variable(node);
                (None, false)
            }
            "primitive_type" => {
                let text = node_text(node, self.ctx.source).to_string();
                self.offer_token(Token {
                    kind,
                    text,
                    node_id: node.id(),
                    range: node_range(node),
                    ref_index: None,
                });
                (None, false)
            }
            "namespace_name" | "php_tag" | "text" | "text_interpolation" | "ERROR" => {
                (None, false)
            }
            "program" => (Some(Transform::File(FileTf::new())), true),
            "namespace_definition" => (
                Some(Transform::Namespace(NamespaceTf::new(node, &mut self.ctx))),
                true,
            ),
            "namespace_use_declaration" => (Some(Transform::UseDecl(UseDeclTf::new())), true),
            "namespace_use_group" => (None, true),
            "namespace_use_clause" => (
                UseClauseTf::new(node, &mut self.ctx).map(Transform::UseClause),
                false,
            ),
            "class_declaration" | "interface_declaration" | "trait_declaration"
            | "enum_declaration" | "anonymous_class" => (
                Some(Transform::ClassLike(ClassLikeTf::new(node, &mut self.ctx))),
                true,
            ),
            "object_creation_expression" => {
                // Pre-0.23 grammars put the anonymous class body directly
                // under the creation expression.
                if find_child_of_kind(node, "declaration_list").is_some() {
                    (
                        Some(Transform::ClassLike(ClassLikeTf::new(node, &mut self.ctx))),
                        true,
                    )
                } else {
                    (None, true)
                }
            }
            "function_definition"
            | "method_declaration"
            | "anonymous_function"
            | "anonymous_function_creation_expression"
            | "arrow_function" => (
                Some(Transform::Callable(CallableTf::new(node, &mut self.ctx))),
                true,
            ),
            "anonymous_function_use_clause" => {
                (Some(Transform::ClosureUse(ClosureUseTf::new())), true)
            }
            "simple_parameter" | "variadic_parameter" | "property_promotion_parameter" => (
                Some(Transform::Parameter(ParameterTf::new(node, &mut self.ctx))),
                true,
            ),
            "named_type" | "optional_type" | "union_type" | "intersection_type" | "type_list"
            | "disjunctive_normal_form_type" => {
                if node.parent().map(|p| is_type_kind(p.kind())).unwrap_or(false) {
                    (None, true)
                } else {
                    (Some(Transform::TypeDecl(TypeDeclTf::new(node))), true)
                }
            }
            "property_declaration" => (
                Some(Transform::MemberDecl(MemberDeclTf::new(
                    node,
                    MemberContext::Property,
                    &mut self.ctx,
                ))),
                true,
            ),
            "const_declaration" | "class_const_declaration" => {
                let context = if in_class_body(node) {
                    MemberContext::ClassConstant
                } else {
                    MemberContext::GlobalConstant
                };
                (
                    Some(Transform::MemberDecl(MemberDeclTf::new(
                        node,
                        context,
                        &mut self.ctx,
                    ))),
                    true,
                )
            }
            "property_element" => (
                Some(Transform::PropertyElement(PropertyElementTf::new(
                    node,
                    &mut self.ctx,
                ))),
                true,
            ),
            "const_element" => {
                let kind = if node.parent().map(|p| in_class_body(p)).unwrap_or(false) {
                    SymbolKind::ClassConstant
                } else {
                    SymbolKind::Constant
                };
                (
                    Some(Transform::ConstElement(ConstElementTf::new(
                        node,
                        kind,
                        &mut self.ctx,
                    ))),
                    true,
                )
            }
            "enum_case" => (
                Some(Transform::EnumCase(EnumCaseTf::new(node, &mut self.ctx))),
                true,
            ),
            "base_clause" => (
                Some(Transform::Clause(ClauseTf::new(ClauseKind::Extends))),
                true,
            ),
            "class_interface_clause" => (
                Some(Transform::Clause(ClauseTf::new(ClauseKind::Implements))),
                true,
            ),
            "use_declaration" => (
                Some(Transform::Clause(ClauseTf::new(ClauseKind::TraitUse))),
                true,
            ),
            "function_call_expression" => {
                self.on_function_call(node);
                (None, true)
            }
            _ => (None, true),
        };

        self.stack.push(transform);
        descend
    }

    /// Post-order: fold the node's transformer into its nearest open
    /// ancestor.
    fn leave(&mut self, node: Node) {
        let Some(entry) = self.stack.pop() else { return };
        let Some(transform) = entry else { return };

        if self.stack.is_empty() {
            if let Transform::File(file) = transform {
                self.root = Some(file.finish(node, &mut self.ctx));
            }
            return;
        }

        let product = transform.finalize(&mut self.ctx);
        if matches!(product, Product::None) {
            return;
        }
        if let Some(parent) = self.stack.iter_mut().rev().flatten().next() {
            parent.push(product, &mut self.ctx);
        }
    }

    fn on_punctuation(&mut self, node: Node) {
        match node.kind() {
            // A close brace drops any doc comment still waiting for its
            // declaration.
            "}" => self.ctx.clear_doc(),
            "&" | "?" | "..." | "callable" | "array" | "static" => {
                let text = node.kind().to_string();
                self.offer_token(Token {
                    kind: node.kind(),
                    text,
                    node_id: node.id(),
                    range: node_range(node),
                    ref_index: None,
                });
            }
            _ => {}
        }
    }

    /// A name-bearing token: classify by parent context, resolve and
    /// record a reference.
    fn on_name(&mut self, node: Node) {
        let Some(parent) = node.parent() else { return };
        let text = node_text(node, self.ctx.source).to_string();
        let parent_kind = parent.kind();
        let is_field =
            |field: &str| parent.child_by_field_name(field).map(|n| n.id()) == Some(node.id());

        match parent_kind {
            "function_call_expression" if is_field("function") => {
                // `define` calls turn into constants at the call node.
                if text == "define" || text == "\\define" {
                    return;
                }
                self.name_reference(node, &text, SymbolKind::Function, ImportKind::Function);
            }
            "object_creation_expression"
            | "base_clause"
            | "class_interface_clause"
            | "use_declaration"
            | "instanceof_expression"
            | "attribute" => {
                self.class_reference(node, &text);
            }
            "named_type" | "type_list" => {
                self.type_position_name(node, &text);
            }
            // Bare type names that skip the composed type nodes.
            "simple_parameter" | "variadic_parameter" | "property_promotion_parameter"
            | "property_declaration" | "catch_clause" => {
                self.type_position_name(node, &text);
            }
            "scoped_call_expression" => {
                if is_field("name") {
                    self.member_reference(node, text, SymbolKind::Method);
                } else {
                    self.class_reference(node, &text);
                }
            }
            "scoped_property_access_expression" => {
                if !is_field("name") {
                    self.class_reference(node, &text);
                }
            }
            "class_constant_access_expression" => {
                if parent.named_child(1).map(|n| n.id()) == Some(node.id()) {
                    self.member_reference(node, text, SymbolKind::ClassConstant);
                } else {
                    self.class_reference(node, &text);
                }
            }
            "member_access_expression" | "nullsafe_member_access_expression"
                if is_field("name") =>
            {
                // Instance properties are stored with a leading `$`.
                let name = if text.starts_with('$') {
                    text
                } else {
                    format!("${}", text)
                };
                self.member_reference(node, name, SymbolKind::Property);
            }
            "member_call_expression" | "nullsafe_member_call_expression" if is_field("name") => {
                self.member_reference(node, text, SymbolKind::Method);
            }
            "class_declaration" | "interface_declaration" | "trait_declaration"
            | "enum_declaration"
                if is_field("name") =>
            {
                let kind = match parent_kind {
                    "interface_declaration" => SymbolKind::Interface,
                    "trait_declaration" => SymbolKind::Trait,
                    _ => SymbolKind::Class,
                };
                let resolved = self.ctx.resolver.resolve_relative(&text);
                self.ctx
                    .add_reference(Reference::new(kind, resolved, node_range(node)), node.id());
            }
            "function_definition"
            | "method_declaration"
            | "arrow_function"
            | "anonymous_function"
            | "anonymous_function_creation_expression" => {
                // Only the return type reaches here as a bare name; the
                // declaration's own name is not a reference.
                if !is_field("name") {
                    self.type_position_name(node, &text);
                }
            }
            // Declaration and import names that are not references.
            "namespace_definition"
            | "namespace_use_declaration"
            | "namespace_use_group"
            | "namespace_use_clause"
            | "namespace_aliasing_clause"
            | "use_as_clause"
            | "use_instead_of_clause"
            | "const_element"
            | "property_element"
            | "enum_case"
            | "goto_statement"
            | "named_label_statement"
            | "declare_directive" => {}
            "argument" if is_field("name") => {}
            "member_access_expression"
            | "member_call_expression"
            | "nullsafe_member_access_expression"
            | "nullsafe_member_call_expression" => {}
            _ => {
                // A bare name in expression position denotes a constant.
                self.name_reference(node, &text, SymbolKind::Constant, ImportKind::Constant);
            }
        }
    }

    fn on_variable(&mut self, node: Node) {
        let Some(parent) = node.parent() else { return };
        let parent_kind = parent.kind();
        let text = node_text(node, self.ctx.source).to_string();

        match parent_kind {
            // Declaration names consumed eagerly by their transformers.
            "simple_parameter" | "variadic_parameter" | "property_promotion_parameter"
            | "property_element" => return,
            "anonymous_function_use_clause" => {
                self.offer_token(Token {
                    kind: "variable_name",
                    text,
                    node_id: node.id(),
                    range: node_range(node),
                    ref_index: None,
                });
                return;
            }
            "scoped_property_access_expression" => {
                if parent.child_by_field_name("name").map(|n| n.id()) == Some(node.id()) {
                    self.member_reference(node, text, SymbolKind::Property);
                    return;
                }
            }
            _ => {}
        }

        self.ctx.add_reference(
            Reference::new(SymbolKind::Variable, text.clone(), node_range(node)),
            node.id(),
        );
        let mut symbol = Symbol::new(SymbolKind::Variable, text, self.ctx.location(node));
        if parent_kind == "static_variable_declaration" {
            symbol.modifiers |= Modifiers::STATIC;
        }
        self.offer_symbol(symbol);
    }

    /// `define('NAME', value)` declares a constant at the call site.
    fn on_function_call(&mut self, node: Node) {
        let source = self.ctx.source;
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        let callee_text = node_text(callee, source);
        if callee_text != "define" && callee_text != "\\define" {
            return;
        }
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return;
        };

        let mut cursor = arguments.walk();
        let expressions: Vec<Node> = arguments
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "argument")
            .filter_map(|a| a.named_child(0))
            .collect();

        let Some(name_node) = expressions.first().copied() else {
            tracing::debug!("define call without arguments skipped");
            return;
        };
        if !matches!(name_node.kind(), "string" | "encapsed_string") {
            tracing::debug!("define call with non-string name skipped");
            return;
        }
        let Some(raw) = string_literal_value(node_text(name_node, source)) else {
            return;
        };
        let name = raw.trim_start_matches('\\').to_string();
        if name.is_empty() {
            return;
        }

        let mut symbol = Symbol::new(SymbolKind::Constant, name.clone(), self.ctx.location(node));
        if let Some(value_node) = expressions.get(1) {
            symbol.value = Some(node_text(*value_node, source).to_string());
            symbol.type_hint = scalar_type_of(value_node.kind()).map(|t| t.to_string());
        }

        let mut reference = Reference::new(SymbolKind::Constant, name, node_range(name_node));
        reference.type_hint = symbol.type_hint.clone();
        self.ctx.add_reference(reference, name_node.id());
        self.offer_symbol(symbol);
    }

    /// A name in type position: reserved type words are plain text, not
    /// references; everything else is a class reference.
    fn type_position_name(&mut self, node: Node, text: &str) {
        if is_reserved_name(text) {
            self.offer_token(Token {
                kind: node.kind(),
                text: text.to_string(),
                node_id: node.id(),
                range: node_range(node),
                ref_index: None,
            });
        } else {
            self.class_reference(node, text);
        }
    }

    /// Record a class reference and offer it upward so inheritance clauses
    /// and type declarations can claim it.
    fn class_reference(&mut self, node: Node, text: &str) {
        let (resolved, unresolved) = self.ctx.resolver.resolve(text, ImportKind::Class);
        let mut reference = Reference::new(SymbolKind::Class, resolved.clone(), node_range(node));
        reference.unresolved_name = unresolved;
        let index = self.ctx.add_reference(reference, node.id());
        self.offer_token(Token {
            kind: node.kind(),
            text: resolved,
            node_id: node.id(),
            range: node_range(node),
            ref_index: Some(index),
        });
    }

    /// Record a function or constant reference, keeping the written form
    /// when resolution rewrote it.
    fn name_reference(&mut self, node: Node, text: &str, kind: SymbolKind, import: ImportKind) {
        let (resolved, unresolved) = self.ctx.resolver.resolve(text, import);
        let mut reference = Reference::new(kind, resolved, node_range(node));
        reference.unresolved_name = unresolved;
        self.ctx.add_reference(reference, node.id());
    }

    /// Member names are recorded verbatim; cross-file tooling resolves the
    /// owner lazily.
    fn member_reference(&mut self, node: Node, name: String, kind: SymbolKind) {
        self.ctx
            .add_reference(Reference::new(kind, name, node_range(node)), node.id());
    }

    fn offer_token(&mut self, token: Token) {
        if let Some(top) = self.stack.iter_mut().rev().flatten().next() {
            top.push_token(&token, &mut self.ctx);
        }
    }

    /// Hand a token-produced symbol to the innermost transformer that
    /// collects loose symbols (callable body, namespace body or file).
    fn offer_symbol(&mut self, symbol: Symbol) {
        let position = self
            .stack
            .iter()
            .rposition(|e| e.as_ref().is_some_and(|t| t.accepts_loose_symbols()));
        if let Some(index) = position {
            if let Some(transform) = &mut self.stack[index] {
                transform.push(Product::Symbol(symbol), &mut self.ctx);
            }
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false)
}

fn is_type_kind(kind: &str) -> bool {
    matches!(
        kind,
        "named_type"
            | "optional_type"
            | "union_type"
            | "intersection_type"
            | "type_list"
            | "disjunctive_normal_form_type"
    )
}

/// Whether a declaration node sits directly in a class-like body.
fn in_class_body(node: Node) -> bool {
    node.parent()
        .map(|p| matches!(p.kind(), "declaration_list" | "enum_declaration_list"))
        .unwrap_or(false)
}

/// The unquoted value of a string literal, if it is one.
fn string_literal_value(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| {
            trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use php_sym_types::{Modifiers, SymbolKind};
    use pretty_assertions::assert_eq;

    fn extract(code: &str) -> DocumentSymbols {
        let doc = Document::open("file:///test.php", code);
        let tree = doc.tree().expect("tree");
        extract_document_symbols(tree, code, "file:///test.php", None).expect("not cancelled")
    }

    fn find<'a>(symbols: &'a [Symbol], name: &str) -> &'a Symbol {
        symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("symbol {} not found in {:?}", name, names(symbols)))
    }

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_namespace_class_hierarchy() {
        let out = extract(
            "<?php\nnamespace A\\B;\nclass C extends D implements E, F {\n    public function m($x): int {}\n}\n",
        );

        assert_eq!(out.root.kind, SymbolKind::File);
        let ns = find(&out.root.children, "A\\B");
        assert_eq!(ns.kind, SymbolKind::Namespace);

        let class = find(&ns.children, "A\\B\\C");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.scope.as_deref(), Some("A\\B"));

        let associated: Vec<(&str, SymbolKind)> = class
            .associated
            .iter()
            .map(|r| (r.name.as_str(), r.kind))
            .collect();
        assert_eq!(
            associated,
            vec![
                ("A\\B\\D", SymbolKind::Class),
                ("A\\B\\E", SymbolKind::Class),
                ("A\\B\\F", SymbolKind::Class),
            ]
        );

        let method = find(&class.children, "m");
        assert_eq!(method.kind, SymbolKind::Method);
        assert!(method.modifiers.contains(Modifiers::PUBLIC));
        assert_eq!(method.type_hint.as_deref(), Some("int"));
        assert_eq!(method.scope.as_deref(), Some("A\\B\\C"));

        let param = find(&method.children, "$x");
        assert_eq!(param.kind, SymbolKind::Parameter);
        assert_eq!(param.scope.as_deref(), Some("A\\B\\C::m"));
    }

    #[test]
    fn test_use_alias_and_reference() {
        let out = extract("<?php\nuse Foo\\Bar as B;\nnew B();\n");

        let import = find(&out.root.children, "B");
        assert_eq!(import.kind, SymbolKind::Class);
        assert!(import.modifiers.contains(Modifiers::USE));
        assert_eq!(import.associated.len(), 1);
        assert_eq!(import.associated[0].name, "Foo\\Bar");

        assert_eq!(out.references.len(), 1);
        assert_eq!(out.references[0].kind, SymbolKind::Class);
        assert_eq!(out.references[0].name, "Foo\\Bar");
    }

    #[test]
    fn test_define_constant() {
        let out = extract("<?php\ndefine('MY_CONST', 42);\n");

        let constant = find(&out.root.children, "MY_CONST");
        assert_eq!(constant.kind, SymbolKind::Constant);
        assert_eq!(constant.value.as_deref(), Some("42"));
        assert_eq!(constant.type_hint.as_deref(), Some("int"));

        assert_eq!(out.references.len(), 1);
        assert_eq!(out.references[0].kind, SymbolKind::Constant);
        assert_eq!(out.references[0].name, "MY_CONST");
    }

    #[test]
    fn test_define_with_leading_backslash_and_string_value() {
        let out = extract("<?php\ndefine('\\\\APP_ENV', 'prod');\n");
        let constant = find(&out.root.children, "APP_ENV");
        assert_eq!(constant.value.as_deref(), Some("'prod'"));
        assert_eq!(constant.type_hint.as_deref(), Some("string"));
    }

    #[test]
    fn test_define_malformed_produces_nothing() {
        let out = extract("<?php\ndefine($name, 42);\ndefine();\n");
        assert!(out.root.children.iter().all(|s| s.kind != SymbolKind::Constant));
        assert!(out.references.iter().all(|r| r.kind != SymbolKind::Constant));
    }

    #[test]
    fn test_variable_deduplication() {
        let out = extract("<?php\nfunction f() { $a = 1; $a = 2; $b = 3; }\n");

        let f = find(&out.root.children, "f");
        assert_eq!(f.kind, SymbolKind::Function);
        assert_eq!(names(&f.children), vec!["$a", "$b"]);
    }

    #[test]
    fn test_magic_property_from_doc() {
        let out = extract("<?php\n/** @property int $x */\nclass K {}\n");

        let class = find(&out.root.children, "K");
        assert_eq!(class.children.len(), 1);
        let magic = &class.children[0];
        assert_eq!(magic.kind, SymbolKind::Property);
        assert_eq!(magic.name, "$x");
        assert!(magic.modifiers.contains(Modifiers::MAGIC));
        assert!(magic.modifiers.contains(Modifiers::PUBLIC));
        assert_eq!(magic.type_hint.as_deref(), Some("int"));
        assert_eq!(magic.scope.as_deref(), Some("K"));
    }

    #[test]
    fn test_magic_member_variants() {
        let out = extract(
            "<?php\nnamespace App;\n/**\n * @property-read Foo $id\n * @property-write string $raw\n * @method static Foo create(int $n)\n */\nclass K {}\n",
        );

        let class = find(&out.root.children, "App").children.clone();
        let class = find(&class, "App\\K");

        let id = find(&class.children, "$id");
        assert!(id.modifiers.contains(Modifiers::READ_ONLY));
        assert_eq!(id.type_hint.as_deref(), Some("App\\Foo"));

        let raw = find(&class.children, "$raw");
        assert!(raw.modifiers.contains(Modifiers::WRITE_ONLY));

        let create = find(&class.children, "create");
        assert_eq!(create.kind, SymbolKind::Method);
        assert!(create.modifiers.contains(Modifiers::MAGIC));
        assert!(create.modifiers.contains(Modifiers::STATIC));
        assert_eq!(create.type_hint.as_deref(), Some("App\\Foo"));
        assert_eq!(create.children.len(), 1);
        assert_eq!(create.children[0].name, "$n");
        assert_eq!(create.children[0].scope.as_deref(), Some("App\\K::create"));
    }

    #[test]
    fn test_member_access_references() {
        let out = extract("<?php\n$o->prop;\n$o->meth();\n");

        let members: Vec<(&str, SymbolKind)> = out
            .references
            .iter()
            .filter(|r| matches!(r.kind, SymbolKind::Property | SymbolKind::Method))
            .map(|r| (r.name.as_str(), r.kind))
            .collect();
        assert_eq!(
            members,
            vec![("$prop", SymbolKind::Property), ("meth", SymbolKind::Method)]
        );
    }

    #[test]
    fn test_scoped_access_references() {
        let out = extract(
            "<?php\nnamespace App;\nclass K {\n    const V = 1;\n    public static $s = 2;\n    public function m() {\n        self::V;\n        static::$s;\n        K::m2();\n    }\n}\n",
        );

        let kinds: Vec<(&str, SymbolKind)> = out
            .references
            .iter()
            .map(|r| (r.name.as_str(), r.kind))
            .collect();
        // self:: and static:: resolve to the enclosing class.
        assert!(kinds.contains(&("App\\K", SymbolKind::Class)));
        assert!(kinds.contains(&("V", SymbolKind::ClassConstant)));
        assert!(kinds.contains(&("$s", SymbolKind::Property)));
        assert!(kinds.contains(&("m2", SymbolKind::Method)));
    }

    #[test]
    fn test_braced_namespace_contains_children() {
        let out = extract("<?php\nnamespace N {\n    function f() {}\n}\n");

        let ns = find(&out.root.children, "N");
        assert_eq!(ns.kind, SymbolKind::Namespace);
        let f = find(&ns.children, "N\\f");
        assert_eq!(f.scope.as_deref(), Some("N"));
    }

    #[test]
    fn test_global_namespace_names_unprefixed() {
        let out = extract("<?php\nclass G {}\nfunction g() {}\nconst C = 'x';\n");
        assert_eq!(find(&out.root.children, "G").kind, SymbolKind::Class);
        assert_eq!(find(&out.root.children, "g").kind, SymbolKind::Function);
        let constant = find(&out.root.children, "C");
        assert_eq!(constant.kind, SymbolKind::Constant);
        assert_eq!(constant.type_hint.as_deref(), Some("string"));
        assert_eq!(constant.value.as_deref(), Some("'x'"));
    }

    #[test]
    fn test_use_function_and_const_kinds() {
        let out = extract("<?php\nuse function App\\helper;\nuse const App\\LIMIT;\nhelper();\n");

        let helper = find(&out.root.children, "helper");
        assert_eq!(helper.kind, SymbolKind::Function);
        assert!(helper.modifiers.contains(Modifiers::USE));
        assert_eq!(helper.associated[0].name, "App\\helper");

        let limit = find(&out.root.children, "LIMIT");
        assert_eq!(limit.kind, SymbolKind::Constant);

        // The call resolves through the function alias without rewriting.
        let call = out
            .references
            .iter()
            .find(|r| r.kind == SymbolKind::Function)
            .unwrap();
        assert_eq!(call.name, "App\\helper");
        assert_eq!(call.unresolved_name.as_deref(), Some("helper"));
    }

    #[test]
    fn test_group_use_clauses() {
        let out = extract("<?php\nuse App\\{Foo, Bar as B};\nnew B();\n");

        let foo = find(&out.root.children, "Foo");
        assert_eq!(foo.associated[0].name, "App\\Foo");
        let b = find(&out.root.children, "B");
        assert_eq!(b.associated[0].name, "App\\Bar");

        let new_ref = out
            .references
            .iter()
            .find(|r| r.kind == SymbolKind::Class)
            .unwrap();
        assert_eq!(new_ref.name, "App\\Bar");
    }

    #[test]
    fn test_unresolved_function_keeps_written_form() {
        let out = extract("<?php\nnamespace App;\nstrlen('x');\n");

        let call = out
            .references
            .iter()
            .find(|r| r.kind == SymbolKind::Function)
            .unwrap();
        assert_eq!(call.name, "App\\strlen");
        assert_eq!(call.unresolved_name.as_deref(), Some("strlen"));
    }

    #[test]
    fn test_fully_qualified_reference_unchanged() {
        let out = extract("<?php\nnamespace App;\nnew \\DateTime();\n");
        let r = out
            .references
            .iter()
            .find(|r| r.kind == SymbolKind::Class)
            .unwrap();
        assert_eq!(r.name, "DateTime");
        assert_eq!(r.unresolved_name, None);
    }

    #[test]
    fn test_closure_with_use_clause() {
        let out = extract(
            "<?php\n$fn = function ($a) use ($b, &$c) {\n    $d = 1;\n};\n",
        );

        let closure = out
            .root
            .children
            .iter()
            .find(|s| s.kind == SymbolKind::Function)
            .expect("closure symbol");
        assert!(closure.modifiers.contains(Modifiers::ANONYMOUS));
        assert!(closure.name.starts_with("#anon#test.php#"));

        assert_eq!(names(&closure.children), vec!["$a", "$b", "$c", "$d"]);
        let b = find(&closure.children, "$b");
        assert!(b.modifiers.contains(Modifiers::USE));
        assert!(!b.modifiers.contains(Modifiers::REFERENCE));
        let c = find(&closure.children, "$c");
        assert!(c.modifiers.contains(Modifiers::USE));
        assert!(c.modifiers.contains(Modifiers::REFERENCE));
    }

    #[test]
    fn test_anonymous_class() {
        let out = extract("<?php\n$x = new class extends Base {\n    public function m() {}\n};\n");

        let anon = out
            .root
            .children
            .iter()
            .find(|s| s.kind == SymbolKind::Class)
            .expect("anonymous class symbol");
        assert!(anon.modifiers.contains(Modifiers::ANONYMOUS));
        assert!(anon.name.starts_with("#anon#test.php#"));
        assert_eq!(anon.associated.len(), 1);
        assert_eq!(anon.associated[0].name, "Base");
        assert!(anon.children.iter().any(|c| c.name == "m"));
    }

    #[test]
    fn test_promoted_constructor_parameters() {
        let out = extract(
            "<?php\nclass P {\n    public function __construct(private string $name, int $plain) {}\n}\n",
        );

        let class = find(&out.root.children, "P");
        let ctor = find(&class.children, "__construct");
        assert_eq!(names(&ctor.children), vec!["$name", "$plain"]);

        let promoted = find(&class.children, "$name");
        assert_eq!(promoted.kind, SymbolKind::Property);
        assert!(promoted.modifiers.contains(Modifiers::PRIVATE));
        assert_eq!(promoted.type_hint.as_deref(), Some("string"));
        // The un-promoted parameter declares no property.
        assert!(class
            .children
            .iter()
            .all(|c| !(c.kind == SymbolKind::Property && c.name == "$plain")));
    }

    #[test]
    fn test_class_constants_implicitly_static_public() {
        let out = extract("<?php\nclass K {\n    const A = 1;\n    private const B = 'two';\n}\n");

        let class = find(&out.root.children, "K");
        let a = find(&class.children, "A");
        assert_eq!(a.kind, SymbolKind::ClassConstant);
        assert!(a.modifiers.contains(Modifiers::STATIC));
        assert!(a.modifiers.contains(Modifiers::PUBLIC));
        assert_eq!(a.type_hint.as_deref(), Some("int"));

        let b = find(&class.children, "B");
        assert!(b.modifiers.contains(Modifiers::PRIVATE));
        assert!(!b.modifiers.contains(Modifiers::PUBLIC));
        assert_eq!(b.type_hint.as_deref(), Some("string"));
    }

    #[test]
    fn test_global_const_resolved_relative() {
        let out = extract("<?php\nnamespace App;\nconst LIMIT = 10;\n");
        let ns = find(&out.root.children, "App");
        let constant = find(&ns.children, "App\\LIMIT");
        assert_eq!(constant.kind, SymbolKind::Constant);
        assert_eq!(constant.value.as_deref(), Some("10"));
    }

    #[test]
    fn test_property_declared_and_doc_types() {
        let out = extract(
            "<?php\nnamespace App;\nuse Lib\\Widget;\nclass K {\n    public Widget $w;\n    /** @var Widget[] the widgets */\n    protected $list;\n    private static int $count = 0;\n}\n",
        );

        let ns = find(&out.root.children, "App");
        let class = find(&ns.children, "App\\K");

        let w = find(&class.children, "$w");
        assert_eq!(w.type_hint.as_deref(), Some("Lib\\Widget"));
        assert!(w.modifiers.contains(Modifiers::PUBLIC));

        let list = find(&class.children, "$list");
        assert_eq!(list.type_hint.as_deref(), Some("Lib\\Widget[]"));
        assert!(list.modifiers.contains(Modifiers::PROTECTED));

        let count = find(&class.children, "$count");
        assert_eq!(count.type_hint.as_deref(), Some("int"));
        assert!(count.modifiers.contains(Modifiers::STATIC));
        assert_eq!(count.value.as_deref(), Some("0"));
    }

    #[test]
    fn test_param_doc_and_union_types() {
        let out = extract(
            "<?php\nnamespace App;\n/**\n * Runs it.\n * @param Task $t the task\n * @return Task|null\n */\nfunction run($t, Other|int $u) {}\n",
        );

        let ns = find(&out.root.children, "App");
        let run = find(&ns.children, "App\\run");
        assert_eq!(run.type_hint.as_deref(), Some("App\\Task|null"));
        assert_eq!(
            run.doc.as_ref().and_then(|d| d.description.as_deref()),
            Some("Runs it.")
        );

        let t = find(&run.children, "$t");
        assert_eq!(t.type_hint.as_deref(), Some("App\\Task"));

        let u = find(&run.children, "$u");
        assert_eq!(u.type_hint.as_deref(), Some("App\\Other|int"));
    }

    #[test]
    fn test_catch_variable_and_type_reference() {
        let out = extract(
            "<?php\nfunction f() {\n    try {\n    } catch (\\RuntimeException $e) {\n    }\n}\n",
        );

        let f = find(&out.root.children, "f");
        assert!(f.children.iter().any(|c| c.name == "$e"));
        assert!(out
            .references
            .iter()
            .any(|r| r.kind == SymbolKind::Class && r.name == "RuntimeException"));
    }

    #[test]
    fn test_superglobals_never_emitted() {
        let out = extract("<?php\nfunction f() { $_GET; $this; $ok = 1; }\n");
        let f = find(&out.root.children, "f");
        assert_eq!(names(&f.children), vec!["$ok"]);
    }

    #[test]
    fn test_static_local_variable() {
        let out = extract("<?php\nfunction f() { static $count = 0; }\n");
        let f = find(&out.root.children, "f");
        let count = find(&f.children, "$count");
        assert!(count.modifiers.contains(Modifiers::STATIC));
    }

    #[test]
    fn test_trait_use_recorded_as_associated() {
        let out = extract("<?php\nnamespace App;\nclass K {\n    use Helpers, Loggable;\n}\n");

        let ns = find(&out.root.children, "App");
        let class = find(&ns.children, "App\\K");
        let targets: Vec<&str> = class.associated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(targets, vec!["App\\Helpers", "App\\Loggable"]);
    }

    #[test]
    fn test_enum_indexed_as_class_with_constant_cases() {
        let out = extract(
            "<?php\nenum Color: string {\n    case Red = 'red';\n    case Green = 'green';\n    public function label(): string { return $this->value; }\n}\n",
        );

        let class = find(&out.root.children, "Color");
        assert_eq!(class.kind, SymbolKind::Class);
        let red = find(&class.children, "Red");
        assert_eq!(red.kind, SymbolKind::ClassConstant);
        assert!(red.modifiers.contains(Modifiers::STATIC));
        assert_eq!(red.value.as_deref(), Some("'red'"));
        assert!(class.children.iter().any(|c| c.name == "label"));
    }

    #[test]
    fn test_interface_extends_associated() {
        let out = extract("<?php\ninterface I extends A, B {}\n");
        let iface = find(&out.root.children, "I");
        assert_eq!(iface.kind, SymbolKind::Interface);
        let targets: Vec<&str> = iface.associated.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(targets, vec!["A", "B"]);
    }

    #[test]
    fn test_doc_comment_cleared_on_close_brace() {
        let out = extract("<?php\nfunction f() { /** @property int $x */ }\nclass K {}\n");
        let class = find(&out.root.children, "K");
        assert!(class.children.is_empty());
        assert!(class.doc.is_none());
    }

    #[test]
    fn test_abstract_method_not_final() {
        let out = extract(
            "<?php\nabstract class K {\n    abstract public function m();\n}\n",
        );
        let class = find(&out.root.children, "K");
        assert!(class.modifiers.contains(Modifiers::ABSTRACT));
        let m = find(&class.children, "m");
        assert!(m.modifiers.contains(Modifiers::ABSTRACT));
        assert!(!m.modifiers.contains(Modifiers::FINAL));
    }

    #[test]
    fn test_static_return_type_is_not_a_modifier() {
        let out = extract(
            "<?php\nclass B {\n    public function withName(string $n): static { return $this; }\n    public static function make(): static { return new static(); }\n}\n",
        );

        let class = find(&out.root.children, "B");
        let with_name = find(&class.children, "withName");
        assert!(!with_name.modifiers.contains(Modifiers::STATIC));
        assert_eq!(with_name.type_hint.as_deref(), Some("static"));

        // A real static modifier still registers alongside the return type.
        let make = find(&class.children, "make");
        assert!(make.modifiers.contains(Modifiers::STATIC));
        assert_eq!(make.type_hint.as_deref(), Some("static"));
    }

    #[test]
    fn test_method_default_visibility_public() {
        let out = extract("<?php\nclass K {\n    function m() {}\n}\n");
        let class = find(&out.root.children, "K");
        let m = find(&class.children, "m");
        assert!(m.modifiers.contains(Modifiers::PUBLIC));
    }

    #[test]
    fn test_references_attach_to_nodes() {
        let out = extract("<?php\nuse Foo\\Bar as B;\nnew B();\n");
        assert_eq!(out.node_references.len(), out.references.len());
        for index in out.node_references.values() {
            assert!(*index < out.references.len());
        }
    }

    #[test]
    fn test_references_in_source_order() {
        let out = extract("<?php\nnamespace A;\nnew First();\nnew Second();\nnew Third();\n");
        let positions: Vec<u32> = out
            .references
            .iter()
            .filter(|r| r.kind == SymbolKind::Class)
            .map(|r| r.range.start_byte)
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_scope_closure_invariant() {
        let out = extract(
            "<?php\nnamespace App;\nclass K {\n    public function m() { $v = 1; }\n}\n",
        );

        fn check(symbol: &Symbol) {
            if symbol.kind == SymbolKind::File {
                for child in &symbol.children {
                    check(child);
                }
                return;
            }
            let qualified = symbol.qualified_name();
            for child in &symbol.children {
                assert_eq!(
                    child.scope.as_deref(),
                    Some(qualified.as_str()),
                    "child {} of {}",
                    child.name,
                    symbol.name
                );
                check(child);
            }
        }
        check(&out.root);
    }

    #[test]
    fn test_cancellation_discards_output() {
        use std::sync::atomic::AtomicBool;
        let code = "<?php\nclass A {}\nclass B {}\n";
        let doc = Document::open("file:///test.php", code);
        let tree = doc.tree().unwrap();
        let cancel = AtomicBool::new(true);
        assert!(extract_document_symbols(tree, code, "file:///test.php", Some(&cancel)).is_none());
    }

    #[test]
    fn test_anonymous_names_stable_per_offset() {
        let code = "<?php\n$a = function () {};\n";
        let first = extract(code);
        let second = extract(code);
        let name_of = |out: &DocumentSymbols| {
            out.root
                .children
                .iter()
                .find(|s| s.kind == SymbolKind::Function)
                .unwrap()
                .name
                .clone()
        };
        assert_eq!(name_of(&first), name_of(&second));
    }

    #[test]
    fn test_error_subtree_does_not_abort() {
        // The parser recovers; the pass keeps whatever it can see.
        let out = extract("<?php\nclass Ok {}\nfunction broken( {\n");
        assert!(out.root.children.iter().any(|s| s.name == "Ok"));
    }
}
