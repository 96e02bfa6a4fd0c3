//! Node transformers for the symbol-extraction pass.
//!
//! The tree walk keeps a stack with one entry per open node. Interesting
//! nodes get a transformer; on post-order completion a transformer is
//! folded into a `Product` and offered to the nearest open transformer
//! above it, which narrows on the product it receives. Tokens never get
//! stack entries; the walker offers them straight to the innermost open
//! transformer.

use std::collections::HashMap;

use php_sym_types::{DocInfo, Location, Modifiers, PackedRange, Reference, Symbol, SymbolKind};
use tree_sitter::Node;

use crate::collection::UniqueSymbolCollection;
use crate::document::{node_range, node_text};
use crate::phpdoc::{parse_doc_block, DocBlock, PropertyAccess};
use crate::resolver::{ClassContext, ImportKind, NameResolver};
use crate::typestr::resolve_type_string;

/// Mutable per-file state threaded through the walk.
pub(crate) struct PassContext<'a> {
    pub source: &'a str,
    pub uri: &'a str,
    pub resolver: NameResolver,
    pub references: Vec<Reference>,
    pub node_references: HashMap<usize, usize>,
    pending_doc: Option<String>,
}

impl<'a> PassContext<'a> {
    pub fn new(source: &'a str, uri: &'a str) -> Self {
        PassContext {
            source,
            uri,
            resolver: NameResolver::new(),
            references: Vec::new(),
            node_references: HashMap::new(),
            pending_doc: None,
        }
    }

    /// Record a reference and attach it to its originating node.
    pub fn add_reference(&mut self, reference: Reference, node_id: usize) -> usize {
        let index = self.references.len();
        self.references.push(reference);
        self.node_references.insert(node_id, index);
        index
    }

    pub fn set_doc(&mut self, text: &str) {
        self.pending_doc = Some(text.to_string());
    }

    pub fn clear_doc(&mut self) {
        self.pending_doc = None;
    }

    /// Consume the last-seen doc comment.
    pub fn take_doc(&mut self) -> Option<DocBlock> {
        self.pending_doc.take().map(|text| parse_doc_block(&text))
    }

    pub fn location(&self, node: Node) -> Location {
        Location {
            uri: self.uri.to_string(),
            range: node_range(node),
        }
    }

    /// Deterministic name for an anonymous class or closure at a byte offset.
    pub fn anonymous_name(&self, offset: usize) -> String {
        let short = self.uri.rsplit('/').next().unwrap_or(self.uri);
        format!("#anon#{}#{}", short, offset)
    }

    pub fn resolve_type(&self, type_string: &str) -> String {
        resolve_type_string(type_string, &self.resolver)
    }
}

/// A token offered to the innermost open transformer.
pub(crate) struct Token {
    pub kind: &'static str,
    pub text: String,
    pub node_id: usize,
    pub range: PackedRange,
    /// Index into the reference list when the token carried a name reference.
    pub ref_index: Option<usize>,
}

/// What a completed transformer folds into.
pub(crate) enum Product {
    None,
    Symbol(Symbol),
    Symbols(Vec<Symbol>),
    Namespace { symbol: Symbol, open: bool },
    Uses(Vec<Symbol>),
    Clause { kind: ClauseKind, refs: Vec<Reference> },
    Type { node_id: usize, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClauseKind {
    Extends,
    Implements,
    TraitUse,
}

pub(crate) enum Transform {
    File(FileTf),
    Namespace(NamespaceTf),
    UseDecl(UseDeclTf),
    UseClause(UseClauseTf),
    ClassLike(ClassLikeTf),
    Callable(CallableTf),
    Parameter(ParameterTf),
    TypeDecl(TypeDeclTf),
    MemberDecl(MemberDeclTf),
    PropertyElement(PropertyElementTf),
    ConstElement(ConstElementTf),
    EnumCase(EnumCaseTf),
    Clause(ClauseTf),
    ClosureUse(ClosureUseTf),
}

impl Transform {
    /// Whether stray symbols (variables, nested definitions) may land here.
    pub fn accepts_loose_symbols(&self) -> bool {
        matches!(
            self,
            Transform::File(_) | Transform::Namespace(_) | Transform::Callable(_)
        )
    }

    pub fn push(&mut self, product: Product, ctx: &mut PassContext) {
        match self {
            Transform::File(t) => t.push(product),
            Transform::Namespace(t) => t.push(product),
            Transform::UseDecl(t) => t.push(product),
            Transform::ClassLike(t) => t.push(product, ctx),
            Transform::Callable(t) => t.push(product, ctx),
            Transform::Parameter(t) => t.push(product),
            Transform::MemberDecl(t) => t.push(product),
            Transform::UseClause(_)
            | Transform::TypeDecl(_)
            | Transform::PropertyElement(_)
            | Transform::ConstElement(_)
            | Transform::EnumCase(_)
            | Transform::Clause(_)
            | Transform::ClosureUse(_) => {}
        }
    }

    pub fn push_token(&mut self, token: &Token, ctx: &mut PassContext) {
        match self {
            Transform::TypeDecl(t) => t.push_token(token),
            Transform::Clause(t) => t.push_token(token, ctx),
            Transform::ClosureUse(t) => t.push_token(token, ctx),
            Transform::Callable(t) => t.push_token(token),
            Transform::Parameter(t) => t.push_token(token),
            Transform::MemberDecl(t) => t.push_token(token),
            _ => {}
        }
    }

    pub fn finalize(self, ctx: &mut PassContext) -> Product {
        match self {
            // The file transform is finished explicitly by the pass.
            Transform::File(_) => Product::None,
            Transform::Namespace(t) => t.finalize(),
            Transform::UseDecl(t) => t.finalize(),
            Transform::UseClause(t) => Product::Symbol(t.symbol),
            Transform::ClassLike(t) => t.finalize(ctx),
            Transform::Callable(t) => t.finalize(),
            Transform::Parameter(t) => Product::Symbol(t.symbol),
            Transform::TypeDecl(t) => t.finalize(),
            Transform::MemberDecl(t) => t.finalize(ctx),
            Transform::PropertyElement(t) => Product::Symbol(t.symbol),
            Transform::ConstElement(t) => Product::Symbol(t.symbol),
            Transform::EnumCase(t) => Product::Symbol(t.symbol),
            Transform::Clause(t) => Product::Clause {
                kind: t.kind,
                refs: t.refs,
            },
            Transform::ClosureUse(t) => Product::Symbols(t.vars),
        }
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Root transformer: collects every top-level definition. A namespace
/// declaration without braces stays open and claims everything after it.
pub(crate) struct FileTf {
    children: UniqueSymbolCollection,
    open_namespace: Option<(Symbol, UniqueSymbolCollection)>,
}

impl FileTf {
    pub fn new() -> Self {
        FileTf {
            children: UniqueSymbolCollection::new(),
            open_namespace: None,
        }
    }

    fn insert(&mut self, symbol: Symbol) {
        match &mut self.open_namespace {
            Some((_, members)) => members.push(symbol),
            None => self.children.push(symbol),
        }
    }

    fn close_namespace(&mut self) {
        if let Some((mut symbol, members)) = self.open_namespace.take() {
            let scope = symbol.name.clone();
            symbol.children = members.into_vec();
            for child in &mut symbol.children {
                child.scope = Some(scope.clone());
            }
            self.children.push(symbol);
        }
    }

    fn push(&mut self, product: Product) {
        match product {
            Product::Symbol(s) => self.insert(s),
            Product::Symbols(list) | Product::Uses(list) => {
                for s in list {
                    self.insert(s);
                }
            }
            Product::Namespace { symbol, open } => {
                self.close_namespace();
                if open {
                    self.open_namespace = Some((symbol, UniqueSymbolCollection::new()));
                } else {
                    self.children.push(symbol);
                }
            }
            Product::Clause { .. } | Product::Type { .. } | Product::None => {}
        }
    }

    pub fn finish(mut self, root: Node, ctx: &mut PassContext) -> Symbol {
        self.close_namespace();
        let mut file = Symbol::new(SymbolKind::File, ctx.uri, ctx.location(root));
        file.children = self.children.into_vec();
        file
    }
}

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

pub(crate) struct NamespaceTf {
    symbol: Symbol,
    has_body: bool,
    children: UniqueSymbolCollection,
}

impl NamespaceTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let name = find_child_of_kind(node, "namespace_name")
            .map(|n| node_text(n, ctx.source).to_string())
            .unwrap_or_default();
        ctx.resolver.set_namespace(&name);
        let symbol = Symbol::new(SymbolKind::Namespace, name, ctx.location(node));
        NamespaceTf {
            symbol,
            has_body: node.child_by_field_name("body").is_some(),
            children: UniqueSymbolCollection::new(),
        }
    }

    fn push(&mut self, product: Product) {
        match product {
            Product::Symbol(s) => self.children.push(s),
            Product::Symbols(list) | Product::Uses(list) => self.children.extend(list),
            _ => {}
        }
    }

    fn finalize(mut self) -> Product {
        if self.has_body {
            let scope = self.symbol.name.clone();
            self.symbol.children = self.children.into_vec();
            for child in &mut self.symbol.children {
                child.scope = Some(scope.clone());
            }
        }
        Product::Namespace {
            symbol: self.symbol,
            open: !self.has_body,
        }
    }
}

// ---------------------------------------------------------------------------
// Use imports
// ---------------------------------------------------------------------------

pub(crate) struct UseDeclTf {
    symbols: Vec<Symbol>,
}

impl UseDeclTf {
    pub fn new() -> Self {
        UseDeclTf {
            symbols: Vec::new(),
        }
    }

    fn push(&mut self, product: Product) {
        if let Product::Symbol(s) = product {
            self.symbols.push(s);
        }
    }

    fn finalize(self) -> Product {
        Product::Uses(self.symbols)
    }
}

/// One use clause, consumed eagerly: the rule is registered with the
/// resolver before any later name in the file resolves.
pub(crate) struct UseClauseTf {
    pub symbol: Symbol,
}

impl UseClauseTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Option<Self> {
        let source = ctx.source;

        // The clause may sit directly in the declaration or inside a group.
        let parent = node.parent()?;
        let (declaration, group) = if parent.kind() == "namespace_use_group" {
            (parent.parent()?, Some(parent))
        } else {
            (parent, None)
        };

        let kind = clause_import_kind(node, source)
            .or_else(|| clause_import_kind(declaration, source))
            .unwrap_or(ImportKind::Class);

        // Target name: the first name-like child before any `as`.
        let mut target_node = None;
        let mut alias = None;
        let mut saw_as = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "qualified_name" | "namespace_name" | "name" if !saw_as => {
                    if target_node.is_none() {
                        target_node = Some(child);
                    }
                }
                "as" => saw_as = true,
                "name" if saw_as => alias = Some(node_text(child, source).to_string()),
                "namespace_aliasing_clause" => {
                    alias = find_child_of_kind(child, "name")
                        .map(|n| node_text(n, source).to_string());
                }
                _ => {}
            }
        }
        let target_node = target_node?;
        let mut target = node_text(target_node, source)
            .trim_start_matches('\\')
            .to_string();

        // Group imports prefix the declaration-level namespace name.
        if group.is_some() {
            let prefix = declaration
                .child_by_field_name("prefix")
                .or_else(|| find_child_of_kind(declaration, "namespace_name"))
                .or_else(|| find_child_of_kind(declaration, "qualified_name"))
                .map(|n| node_text(n, source).trim_matches('\\').to_string());
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                target = format!("{}\\{}", prefix, target);
            }
        }
        if target.is_empty() {
            return None;
        }

        let short = alias
            .clone()
            .unwrap_or_else(|| php_sym_types::keys::split_fqn(&target).1.to_string());

        ctx.resolver.add_rule(crate::resolver::UseRule {
            alias: short.clone(),
            target: target.clone(),
            kind,
        });

        let symbol_kind = match kind {
            ImportKind::Class => SymbolKind::Class,
            ImportKind::Function => SymbolKind::Function,
            ImportKind::Constant => SymbolKind::Constant,
        };
        let mut symbol = Symbol::new(symbol_kind, short, ctx.location(node));
        symbol.modifiers |= Modifiers::USE;
        symbol.associated.push(Reference::new(
            symbol_kind,
            target,
            node_range(target_node),
        ));
        Some(UseClauseTf { symbol })
    }
}

/// A `function` or `const` keyword scoping a use declaration or clause.
fn clause_import_kind(node: Node, source: &str) -> Option<ImportKind> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "namespace_use_clause" | "namespace_use_group" | "qualified_name" | "name"
            | "namespace_name" => return None,
            "function" => return Some(ImportKind::Function),
            "const" => return Some(ImportKind::Constant),
            _ => {
                let text = node_text(child, source);
                if text == "function" {
                    return Some(ImportKind::Function);
                }
                if text == "const" {
                    return Some(ImportKind::Constant);
                }
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Class-like declarations
// ---------------------------------------------------------------------------

pub(crate) struct ClassLikeTf {
    symbol: Symbol,
    members: UniqueSymbolCollection,
}

impl ClassLikeTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let (kind, anonymous) = match node.kind() {
            "interface_declaration" => (SymbolKind::Interface, false),
            "trait_declaration" => (SymbolKind::Trait, false),
            // Enums are indexed as classes; their cases as class constants.
            "class_declaration" | "enum_declaration" => (SymbolKind::Class, false),
            _ => (SymbolKind::Class, true),
        };

        let name = if anonymous {
            ctx.anonymous_name(node.start_byte())
        } else {
            node.child_by_field_name("name")
                .map(|n| ctx.resolver.resolve_relative(node_text(n, ctx.source)))
                .unwrap_or_else(|| ctx.anonymous_name(node.start_byte()))
        };

        let mut symbol = Symbol::new(kind, name.clone(), ctx.location(node));
        symbol.modifiers = scan_modifiers(node, ctx.source);
        if anonymous {
            symbol.modifiers |= Modifiers::ANONYMOUS;
        }

        let mut members = UniqueSymbolCollection::new();
        if let Some(doc) = ctx.take_doc() {
            if doc.description.is_some() {
                symbol.doc = Some(DocInfo {
                    description: doc.description.clone(),
                    type_hint: None,
                });
            }
            for magic in magic_members(&doc, &name, node, ctx) {
                members.push(magic);
            }
        }

        ctx.resolver.push_class(ClassContext {
            fqn: name,
            base: None,
        });

        ClassLikeTf { symbol, members }
    }

    fn push(&mut self, product: Product, ctx: &mut PassContext) {
        match product {
            Product::Symbol(s) => self.members.push(s),
            Product::Symbols(list) => self.members.extend(list),
            Product::Clause { kind, refs } => {
                if kind == ClauseKind::Extends && self.symbol.kind == SymbolKind::Class {
                    if let (Some(first), Some(class)) =
                        (refs.first(), ctx.resolver.current_class_mut())
                    {
                        class.base = Some(first.name.clone());
                    }
                }
                self.symbol.associated.extend(refs);
            }
            _ => {}
        }
    }

    fn finalize(mut self, ctx: &mut PassContext) -> Product {
        ctx.resolver.pop_class();

        let scope = self.symbol.name.clone();
        self.symbol.children = self.members.into_vec();
        for member in &mut self.symbol.children {
            member.scope = Some(scope.clone());
            // Magic methods stamp their parameters here; real methods have
            // already stamped their own children.
            if member.modifiers.contains(Modifiers::MAGIC) && member.kind == SymbolKind::Method {
                let qualified = member.qualified_name();
                for child in &mut member.children {
                    child.scope = Some(qualified.clone());
                }
            }
        }
        if self.symbol.modifiers.contains(Modifiers::ABSTRACT) {
            self.symbol.modifiers -= Modifiers::FINAL;
        }
        Product::Symbol(self.symbol)
    }
}

/// Materialise `@property*` and `@method` tags as Magic members.
fn magic_members(doc: &DocBlock, class_fqn: &str, node: Node, ctx: &PassContext) -> Vec<Symbol> {
    let location = ctx.location(node);
    let mut members = Vec::new();

    for prop in &doc.properties {
        let mut symbol = Symbol::new(SymbolKind::Property, prop.name.clone(), location.clone());
        symbol.modifiers = Modifiers::MAGIC | Modifiers::PUBLIC;
        match prop.access {
            PropertyAccess::ReadOnly => symbol.modifiers |= Modifiers::READ_ONLY,
            PropertyAccess::WriteOnly => symbol.modifiers |= Modifiers::WRITE_ONLY,
            PropertyAccess::ReadWrite => {}
        }
        symbol.type_hint = prop.type_string.as_deref().map(|t| ctx.resolve_type(t));
        if let Some(description) = &prop.description {
            symbol.doc = Some(DocInfo {
                description: Some(description.clone()),
                type_hint: symbol.type_hint.clone(),
            });
        }
        members.push(symbol);
    }

    for method in &doc.methods {
        let mut symbol = Symbol::new(SymbolKind::Method, method.name.clone(), location.clone());
        symbol.modifiers = Modifiers::MAGIC | Modifiers::PUBLIC;
        if method.is_static {
            symbol.modifiers |= Modifiers::STATIC;
        }
        symbol.type_hint = method.return_type.as_deref().map(|t| ctx.resolve_type(t));
        if let Some(description) = &method.description {
            symbol.doc = Some(DocInfo {
                description: Some(description.clone()),
                type_hint: symbol.type_hint.clone(),
            });
        }
        let method_scope = format!("{}::{}", class_fqn, method.name);
        for param in &method.params {
            let mut p = Symbol::new(SymbolKind::Parameter, param.name.clone(), location.clone());
            p.modifiers = Modifiers::MAGIC;
            p.type_hint = param.type_string.as_deref().map(|t| ctx.resolve_type(t));
            p.scope = Some(method_scope.clone());
            symbol.children.push(p);
        }
        members.push(symbol);
    }

    members
}

// ---------------------------------------------------------------------------
// Functions, methods and closures
// ---------------------------------------------------------------------------

pub(crate) struct CallableTf {
    symbol: Symbol,
    qualified: String,
    return_node: Option<usize>,
    doc: Option<DocBlock>,
    locals: UniqueSymbolCollection,
    promoted: Vec<Symbol>,
}

impl CallableTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let source = ctx.source;
        let (kind, name, qualified, anonymous) = match node.kind() {
            "method_declaration" => {
                let short = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                let class = ctx
                    .resolver
                    .current_class()
                    .map(|c| c.fqn.clone())
                    .unwrap_or_default();
                let qualified = if class.is_empty() {
                    short.clone()
                } else {
                    format!("{}::{}", class, short)
                };
                (SymbolKind::Method, short, qualified, false)
            }
            "function_definition" => {
                let fqn = node
                    .child_by_field_name("name")
                    .map(|n| ctx.resolver.resolve_relative(node_text(n, source)))
                    .unwrap_or_else(|| ctx.anonymous_name(node.start_byte()));
                (SymbolKind::Function, fqn.clone(), fqn, false)
            }
            _ => {
                let name = ctx.anonymous_name(node.start_byte());
                (SymbolKind::Function, name.clone(), name, true)
            }
        };

        let mut symbol = Symbol::new(kind, name, ctx.location(node));
        symbol.modifiers = scan_modifiers(node, source);
        if kind == SymbolKind::Method {
            symbol.modifiers = symbol.modifiers.or_public();
        }
        if anonymous {
            symbol.modifiers |= Modifiers::ANONYMOUS;
        }

        let doc = ctx.take_doc();
        if let Some(doc) = &doc {
            if doc.description.is_some() || doc.return_type.is_some() {
                symbol.doc = Some(DocInfo {
                    description: doc.description.clone(),
                    type_hint: doc.return_type.as_deref().map(|t| ctx.resolve_type(t)),
                });
            }
            if let Some(ret) = &doc.return_type {
                symbol.type_hint = Some(ctx.resolve_type(ret));
            }
        }

        CallableTf {
            symbol,
            qualified,
            return_node: node.child_by_field_name("return_type").map(|n| n.id()),
            doc,
            locals: UniqueSymbolCollection::new(),
            promoted: Vec::new(),
        }
    }

    fn push(&mut self, product: Product, ctx: &mut PassContext) {
        match product {
            Product::Symbol(mut s) => {
                if s.kind == SymbolKind::Parameter {
                    self.apply_param_doc(&mut s, ctx);
                    if s.modifiers.has_visibility()
                        || s.modifiers.contains(Modifiers::READ_ONLY)
                    {
                        self.promoted.push(promoted_property(&s));
                    }
                }
                self.locals.push(s);
            }
            Product::Symbols(list) => self.locals.extend(list),
            Product::Type { node_id, text } => {
                if Some(node_id) == self.return_node {
                    self.symbol.type_hint = Some(text);
                }
            }
            _ => {}
        }
    }

    fn push_token(&mut self, token: &Token) {
        // A bare primitive return type arrives as a token of the
        // `return_type` field rather than a composed type node.
        if Some(token.node_id) == self.return_node {
            self.symbol.type_hint = Some(token.text.clone());
        }
    }

    fn apply_param_doc(&self, param: &mut Symbol, ctx: &PassContext) {
        let Some(doc) = &self.doc else { return };
        let Some(tag) = doc.param(&param.name) else {
            return;
        };
        if param.type_hint.is_none() {
            param.type_hint = tag.type_string.as_deref().map(|t| ctx.resolve_type(t));
        }
        if let Some(description) = &tag.description {
            param.doc = Some(DocInfo {
                description: Some(description.clone()),
                type_hint: param.type_hint.clone(),
            });
        }
    }

    fn finalize(mut self) -> Product {
        self.symbol.children = self.locals.into_vec();
        for child in &mut self.symbol.children {
            child.scope = Some(self.qualified.clone());
        }
        if self.symbol.modifiers.contains(Modifiers::ABSTRACT) {
            self.symbol.modifiers -= Modifiers::FINAL;
        }
        let mut out = vec![self.symbol];
        out.extend(self.promoted);
        Product::Symbols(out)
    }
}

/// A promoted constructor parameter also declares a property.
fn promoted_property(param: &Symbol) -> Symbol {
    let mut property = Symbol::new(
        SymbolKind::Property,
        param.name.clone(),
        param.location.clone(),
    );
    property.modifiers =
        (param.modifiers & (Modifiers::VISIBILITY | Modifiers::READ_ONLY)).or_public();
    property.type_hint = param.type_hint.clone();
    property
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

pub(crate) struct ParameterTf {
    pub symbol: Symbol,
    type_node: Option<usize>,
}

impl ParameterTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let source = ctx.source;
        let name = node
            .child_by_field_name("name")
            .or_else(|| find_child_of_kind(node, "variable_name"))
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default();

        let mut symbol = Symbol::new(SymbolKind::Parameter, name, ctx.location(node));
        symbol.modifiers = scan_modifiers(node, source);
        if node.kind() == "variadic_parameter" || has_token(node, "...") {
            symbol.modifiers |= Modifiers::VARIADIC;
        }
        if has_child_of_kind(node, "reference_modifier") || has_token(node, "&") {
            symbol.modifiers |= Modifiers::REFERENCE;
        }
        symbol.value = initializer_node(node)
            .or_else(|| node.child_by_field_name("default_value"))
            .map(|n| node_text(n, source).to_string());

        ParameterTf {
            symbol,
            type_node: node.child_by_field_name("type").map(|n| n.id()),
        }
    }

    fn push(&mut self, product: Product) {
        if let Product::Type { node_id, text } = product {
            if Some(node_id) == self.type_node {
                self.symbol.type_hint = Some(text);
            }
        }
    }

    fn push_token(&mut self, token: &Token) {
        if Some(token.node_id) == self.type_node {
            self.symbol.type_hint = Some(token.text.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Type declarations
// ---------------------------------------------------------------------------

/// Collects the parts of a declared type (`Foo|int`, `?Bar`, `A&B`) in
/// source order; class-like parts arrive already resolved.
pub(crate) struct TypeDeclTf {
    node_id: usize,
    separator: &'static str,
    nullable: bool,
    parts: Vec<String>,
}

impl TypeDeclTf {
    pub fn new(node: Node) -> Self {
        let separator = match node.kind() {
            "intersection_type" => "&",
            _ => "|",
        };
        TypeDeclTf {
            node_id: node.id(),
            separator,
            nullable: false,
            parts: Vec::new(),
        }
    }

    fn push_token(&mut self, token: &Token) {
        match token.kind {
            "?" => self.nullable = true,
            "primitive_type" | "callable" | "array" | "static" => {
                self.parts.push(token.text.clone());
            }
            "name" | "qualified_name" | "relative_scope" => {
                self.parts.push(token.text.clone());
            }
            _ => {}
        }
    }

    fn finalize(self) -> Product {
        if self.parts.is_empty() {
            return Product::None;
        }
        let joined = self.parts.join(self.separator);
        let text = if self.nullable {
            format!("?{}", joined)
        } else {
            joined
        };
        Product::Type {
            node_id: self.node_id,
            text,
        }
    }
}

// ---------------------------------------------------------------------------
// Property / constant declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberContext {
    Property,
    ClassConstant,
    GlobalConstant,
}

/// A declaration list: stamps shared modifiers, the declared type and the
/// doc comment onto each element.
pub(crate) struct MemberDeclTf {
    context: MemberContext,
    modifiers: Modifiers,
    doc: Option<DocBlock>,
    type_node: Option<usize>,
    declared_type: Option<String>,
    elements: Vec<Symbol>,
}

impl MemberDeclTf {
    pub fn new(node: Node, context: MemberContext, ctx: &mut PassContext) -> Self {
        MemberDeclTf {
            context,
            modifiers: scan_modifiers(node, ctx.source),
            doc: ctx.take_doc(),
            type_node: node.child_by_field_name("type").map(|n| n.id()),
            declared_type: None,
            elements: Vec::new(),
        }
    }

    fn push(&mut self, product: Product) {
        match product {
            Product::Symbol(s) => self.elements.push(s),
            Product::Type { node_id, text } => {
                if Some(node_id) == self.type_node {
                    self.declared_type = Some(text);
                }
            }
            _ => {}
        }
    }

    fn push_token(&mut self, token: &Token) {
        if Some(token.node_id) == self.type_node {
            self.declared_type = Some(token.text.clone());
        }
    }

    fn finalize(mut self, ctx: &mut PassContext) -> Product {
        let shared = match self.context {
            MemberContext::Property | MemberContext::ClassConstant => self.modifiers.or_public(),
            MemberContext::GlobalConstant => self.modifiers,
        };
        let description = self.doc.as_ref().and_then(|d| d.description.clone());

        for element in &mut self.elements {
            element.modifiers = element.modifiers.merge(shared);
            if self.context == MemberContext::ClassConstant {
                element.modifiers |= Modifiers::STATIC;
            }
            if self.context == MemberContext::GlobalConstant {
                element.name = ctx.resolver.resolve_relative(&element.name);
            }

            let doc_type = self
                .doc
                .as_ref()
                .and_then(|d| d.var(Some(element.name.as_str())))
                .and_then(|v| v.type_string.as_deref())
                .map(|t| ctx.resolve_type(t));
            if let Some(declared) = &self.declared_type {
                element.type_hint = Some(declared.clone());
            } else if let Some(doc_type) = doc_type.clone() {
                element.type_hint = Some(doc_type);
            }

            if description.is_some() || doc_type.is_some() {
                element.doc = Some(DocInfo {
                    description: description.clone(),
                    type_hint: doc_type,
                });
            }
        }
        Product::Symbols(self.elements)
    }
}

pub(crate) struct PropertyElementTf {
    pub symbol: Symbol,
}

impl PropertyElementTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let name = node
            .child_by_field_name("name")
            .or_else(|| find_child_of_kind(node, "variable_name"))
            .map(|n| node_text(n, ctx.source).to_string())
            .unwrap_or_default();
        let mut symbol = Symbol::new(SymbolKind::Property, name, ctx.location(node));
        symbol.value = initializer_node(node).map(|n| node_text(n, ctx.source).to_string());
        PropertyElementTf { symbol }
    }
}

pub(crate) struct ConstElementTf {
    pub symbol: Symbol,
}

impl ConstElementTf {
    pub fn new(node: Node, kind: SymbolKind, ctx: &mut PassContext) -> Self {
        let name = node
            .child_by_field_name("name")
            .or_else(|| find_child_of_kind(node, "name"))
            .map(|n| node_text(n, ctx.source).to_string())
            .unwrap_or_default();
        let mut symbol = Symbol::new(kind, name, ctx.location(node));
        if let Some(init) = initializer_node(node) {
            symbol.value = Some(node_text(init, ctx.source).to_string());
            symbol.type_hint = scalar_type_of(init.kind()).map(|t| t.to_string());
        }
        ConstElementTf { symbol }
    }
}

/// An enum case, indexed as a class constant.
pub(crate) struct EnumCaseTf {
    pub symbol: Symbol,
}

impl EnumCaseTf {
    pub fn new(node: Node, ctx: &mut PassContext) -> Self {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, ctx.source).to_string())
            .unwrap_or_default();
        let mut symbol = Symbol::new(SymbolKind::ClassConstant, name, ctx.location(node));
        symbol.modifiers = Modifiers::PUBLIC | Modifiers::STATIC;
        if let Some(value) = node
            .child_by_field_name("value")
            .or_else(|| initializer_node(node))
        {
            symbol.value = Some(node_text(value, ctx.source).to_string());
            symbol.type_hint = scalar_type_of(value.kind()).map(|t| t.to_string());
        }
        EnumCaseTf { symbol }
    }
}

// ---------------------------------------------------------------------------
// Inheritance clauses and closure captures
// ---------------------------------------------------------------------------

/// Collects the class references of an extends/implements/trait-use clause.
pub(crate) struct ClauseTf {
    kind: ClauseKind,
    refs: Vec<Reference>,
}

impl ClauseTf {
    pub fn new(kind: ClauseKind) -> Self {
        ClauseTf {
            kind,
            refs: Vec::new(),
        }
    }

    fn push_token(&mut self, token: &Token, ctx: &mut PassContext) {
        if let Some(index) = token.ref_index {
            if let Some(reference) = ctx.references.get(index) {
                self.refs.push(reference.clone());
            }
        }
    }
}

/// `use ($a, &$b)` on a closure: each variable becomes a captured local.
pub(crate) struct ClosureUseTf {
    vars: Vec<Symbol>,
    by_ref: bool,
}

impl ClosureUseTf {
    pub fn new() -> Self {
        ClosureUseTf {
            vars: Vec::new(),
            by_ref: false,
        }
    }

    fn push_token(&mut self, token: &Token, ctx: &mut PassContext) {
        match token.kind {
            "&" => self.by_ref = true,
            "variable_name" => {
                let mut symbol = Symbol::new(
                    SymbolKind::Variable,
                    token.text.clone(),
                    Location {
                        uri: ctx.uri.to_string(),
                        range: token.range,
                    },
                );
                symbol.modifiers = Modifiers::USE;
                if self.by_ref {
                    symbol.modifiers |= Modifiers::REFERENCE;
                }
                self.by_ref = false;
                self.vars.push(symbol);
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

pub(crate) fn find_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

fn has_child_of_kind(node: Node, kind: &str) -> bool {
    find_child_of_kind(node, kind).is_some()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    result
}

/// The expression following an `=` token, if any.
pub(crate) fn initializer_node(node: Node) -> Option<Node> {
    let mut saw_eq = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if saw_eq && child.is_named() {
            return Some(child);
        }
        if !child.is_named() && child.kind() == "=" {
            saw_eq = true;
        }
    }
    None
}

/// PHP scalar type of a literal node kind.
pub(crate) fn scalar_type_of(kind: &str) -> Option<&'static str> {
    match kind {
        "integer" => Some("int"),
        "float" => Some("float"),
        "string" | "encapsed_string" => Some("string"),
        _ => None,
    }
}

/// Collect modifier flags from a declaration's direct children.
///
/// The type and return-type field children are skipped: a bare `static`
/// return type is the same anonymous token as the `static` keyword of a
/// static closure and must not read as a modifier.
fn scan_modifiers(node: Node, source: &str) -> Modifiers {
    let type_fields = [
        node.child_by_field_name("return_type").map(|n| n.id()),
        node.child_by_field_name("type").map(|n| n.id()),
    ];
    let mut modifiers = Modifiers::empty();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if type_fields.contains(&Some(child.id())) {
            continue;
        }
        match child.kind() {
            "visibility_modifier" => {
                if !modifiers.has_visibility() {
                    modifiers |= match node_text(child, source) {
                        "private" => Modifiers::PRIVATE,
                        "protected" => Modifiers::PROTECTED,
                        _ => Modifiers::PUBLIC,
                    };
                }
            }
            "static_modifier" => modifiers |= Modifiers::STATIC,
            "abstract_modifier" => modifiers |= Modifiers::ABSTRACT,
            "final_modifier" => modifiers |= Modifiers::FINAL,
            "readonly_modifier" => modifiers |= Modifiers::READ_ONLY,
            "var_modifier" => {
                if !modifiers.has_visibility() {
                    modifiers |= Modifiers::PUBLIC;
                }
            }
            _ => {
                if !child.is_named() && child.kind() == "static" {
                    modifiers |= Modifiers::STATIC;
                }
            }
        }
    }
    if modifiers.contains(Modifiers::ABSTRACT) {
        modifiers -= Modifiers::FINAL;
    }
    modifiers
}
