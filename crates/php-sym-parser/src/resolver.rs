//! Per-file name resolution.
//!
//! Tracks the current namespace, the use-import table and the stack of
//! enclosing classes, and resolves names written in source to fully
//! qualified names following PHP's rules for unqualified, qualified,
//! relative and fully qualified name forms.

/// Which alias table a use-import contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Class,
    Function,
    Constant,
}

/// One use-import: `use <target> as <alias>`.
#[derive(Debug, Clone)]
pub struct UseRule {
    pub alias: String,
    pub target: String,
    pub kind: ImportKind,
}

/// An enclosing class while its body is being walked.
#[derive(Debug, Clone)]
pub struct ClassContext {
    pub fqn: String,
    pub base: Option<String>,
}

/// Type names that resolve to themselves.
const RESERVED_NAMES: &[&str] = &[
    "int", "string", "bool", "float", "iterable", "true", "false", "null", "void", "object",
];

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}

/// Per-file resolution state.
#[derive(Debug, Default)]
pub struct NameResolver {
    namespace: String,
    rules: Vec<UseRule>,
    class_stack: Vec<ClassContext>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current namespace; empty in the global namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.trim_matches('\\').to_string();
    }

    /// Register a use-import. Rules apply to every name resolved afterwards.
    pub fn add_rule(&mut self, rule: UseRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[UseRule] {
        &self.rules
    }

    /// Prefix a declaration-site name with the current namespace.
    pub fn resolve_relative(&self, name: &str) -> String {
        let name = name.trim_start_matches('\\');
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.namespace, name)
        }
    }

    /// Resolve the `namespace\Foo` syntactic form.
    pub fn resolve_namespace_relative(&self, name: &str) -> String {
        self.resolve_relative(name)
    }

    /// Resolve a name that is not fully qualified.
    ///
    /// Unqualified names consult the alias table for `kind`; qualified names
    /// substitute a Class alias on their first segment. Without a matching
    /// alias the current namespace is prefixed; callers decide whether to
    /// fall back to the global namespace at lookup time.
    pub fn resolve_not_fully_qualified(&self, name: &str, kind: ImportKind) -> String {
        if is_reserved_name(name) {
            return name.to_string();
        }

        if kind == ImportKind::Class {
            if let Some(resolved) = self.resolve_class_keyword(name) {
                return resolved;
            }
        }

        if let Some((first, rest)) = name.split_once('\\') {
            if let Some(rule) = self
                .rules
                .iter()
                .find(|r| r.kind == ImportKind::Class && r.alias == first)
            {
                return format!("{}\\{}", rule.target, rest);
            }
            return self.resolve_relative(name);
        }

        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.kind == kind && r.alias == name)
        {
            return rule.target.clone();
        }
        self.resolve_relative(name)
    }

    /// Resolve any written name form; returns the resolved name and, when
    /// resolution rewrote a function or constant name, the original form.
    pub fn resolve(&self, name: &str, kind: ImportKind) -> (String, Option<String>) {
        if let Some(stripped) = name.strip_prefix('\\') {
            return (stripped.to_string(), None);
        }
        if let Some(rest) = name
            .strip_prefix("namespace\\")
            .or_else(|| name.strip_prefix("Namespace\\"))
        {
            return (self.resolve_namespace_relative(rest), None);
        }

        let resolved = self.resolve_not_fully_qualified(name, kind);
        let unresolved = if resolved != name
            && matches!(kind, ImportKind::Function | ImportKind::Constant)
        {
            Some(name.to_string())
        } else {
            None
        };
        (resolved, unresolved)
    }

    /// `self`, `static` and `parent` resolve against the class stack; with
    /// no enclosing class the keyword is kept as written.
    fn resolve_class_keyword(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("self") || name.eq_ignore_ascii_case("static") {
            return Some(
                self.class_stack
                    .last()
                    .map(|c| c.fqn.clone())
                    .unwrap_or_else(|| name.to_string()),
            );
        }
        if name.eq_ignore_ascii_case("parent") {
            return Some(
                self.class_stack
                    .last()
                    .and_then(|c| c.base.clone())
                    .unwrap_or_else(|| name.to_string()),
            );
        }
        None
    }

    pub fn push_class(&mut self, context: ClassContext) {
        self.class_stack.push(context);
    }

    pub fn pop_class(&mut self) -> Option<ClassContext> {
        self.class_stack.pop()
    }

    pub fn current_class(&self) -> Option<&ClassContext> {
        self.class_stack.last()
    }

    pub fn current_class_mut(&mut self) -> Option<&mut ClassContext> {
        self.class_stack.last_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(namespace: &str, rules: &[(&str, &str, ImportKind)]) -> NameResolver {
        let mut resolver = NameResolver::new();
        resolver.set_namespace(namespace);
        for (alias, target, kind) in rules {
            resolver.add_rule(UseRule {
                alias: alias.to_string(),
                target: target.to_string(),
                kind: *kind,
            });
        }
        resolver
    }

    #[test]
    fn test_resolve_relative_prepends_namespace() {
        let resolver = resolver_with("App\\Service", &[]);
        assert_eq!(resolver.resolve_relative("Foo"), "App\\Service\\Foo");
    }

    #[test]
    fn test_resolve_relative_global_namespace() {
        let resolver = resolver_with("", &[]);
        assert_eq!(resolver.resolve_relative("Foo"), "Foo");
    }

    #[test]
    fn test_unqualified_class_alias() {
        let resolver = resolver_with("App", &[("B", "Foo\\Bar", ImportKind::Class)]);
        assert_eq!(
            resolver.resolve_not_fully_qualified("B", ImportKind::Class),
            "Foo\\Bar"
        );
        // No alias: namespace prefixed.
        assert_eq!(
            resolver.resolve_not_fully_qualified("C", ImportKind::Class),
            "App\\C"
        );
    }

    #[test]
    fn test_qualified_name_substitutes_first_segment() {
        let resolver = resolver_with("App", &[("B", "Foo\\Bar", ImportKind::Class)]);
        assert_eq!(
            resolver.resolve_not_fully_qualified("B\\Baz", ImportKind::Class),
            "Foo\\Bar\\Baz"
        );
        assert_eq!(
            resolver.resolve_not_fully_qualified("X\\Baz", ImportKind::Class),
            "App\\X\\Baz"
        );
    }

    #[test]
    fn test_function_alias_is_kind_scoped() {
        let resolver = resolver_with(
            "App",
            &[
                ("helper", "Lib\\helper", ImportKind::Function),
                ("helper", "Lib\\HelperClass", ImportKind::Class),
            ],
        );
        assert_eq!(
            resolver.resolve_not_fully_qualified("helper", ImportKind::Function),
            "Lib\\helper"
        );
        assert_eq!(
            resolver.resolve_not_fully_qualified("helper", ImportKind::Constant),
            "App\\helper"
        );
    }

    #[test]
    fn test_reserved_names_unchanged() {
        let resolver = resolver_with("App", &[]);
        for name in ["int", "string", "bool", "float", "iterable", "void", "object"] {
            assert_eq!(
                resolver.resolve_not_fully_qualified(name, ImportKind::Class),
                name
            );
        }
    }

    #[test]
    fn test_fully_qualified_is_idempotent() {
        let resolver = resolver_with("App", &[("B", "Foo\\Bar", ImportKind::Class)]);
        let (name, unresolved) = resolver.resolve("\\Foo\\Bar", ImportKind::Class);
        assert_eq!(name, "Foo\\Bar");
        assert_eq!(unresolved, None);
        // Resolving the already-resolved form again changes nothing.
        let (again, _) = resolver.resolve(&format!("\\{}", name), ImportKind::Class);
        assert_eq!(again, name);
    }

    #[test]
    fn test_namespace_relative_form() {
        let resolver = resolver_with("App", &[]);
        let (name, unresolved) = resolver.resolve("namespace\\Sub\\Foo", ImportKind::Class);
        assert_eq!(name, "App\\Sub\\Foo");
        assert_eq!(unresolved, None);
    }

    #[test]
    fn test_unresolved_name_kept_for_functions() {
        let resolver = resolver_with("App", &[]);
        let (name, unresolved) = resolver.resolve("strlen", ImportKind::Function);
        assert_eq!(name, "App\\strlen");
        assert_eq!(unresolved.as_deref(), Some("strlen"));
        // Class rewrites do not keep the original.
        let (_, unresolved) = resolver.resolve("Foo", ImportKind::Class);
        assert_eq!(unresolved, None);
    }

    #[test]
    fn test_self_and_parent_resolve_via_class_stack() {
        let mut resolver = resolver_with("App", &[]);
        resolver.push_class(ClassContext {
            fqn: "App\\Child".to_string(),
            base: Some("App\\Base".to_string()),
        });
        assert_eq!(
            resolver.resolve_not_fully_qualified("self", ImportKind::Class),
            "App\\Child"
        );
        assert_eq!(
            resolver.resolve_not_fully_qualified("static", ImportKind::Class),
            "App\\Child"
        );
        assert_eq!(
            resolver.resolve_not_fully_qualified("parent", ImportKind::Class),
            "App\\Base"
        );
        resolver.pop_class();
        // Outside any class the keywords namespace-prefix like plain names.
        assert_eq!(
            resolver.resolve_not_fully_qualified("Foo", ImportKind::Class),
            "App\\Foo"
        );
    }
}
