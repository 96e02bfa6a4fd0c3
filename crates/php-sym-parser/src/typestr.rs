//! Type-string resolution.
//!
//! Doc-tag type strings arrive unresolved (`Foo|Bar[]|null`). Each union
//! part is expanded to a fully qualified name through the file's name
//! resolver; built-in type keywords pass through unchanged.

use crate::resolver::{ImportKind, NameResolver};

/// Type keywords that never resolve to a class name.
const KEYWORD_TYPES: &[&str] = &[
    "int", "integer", "string", "bool", "boolean", "float", "double", "array", "object", "mixed",
    "null", "void", "never", "callable", "iterable", "resource", "false", "true", "self", "static",
    "parent", "scalar", "numeric", "$this",
];

fn is_keyword_type(name: &str) -> bool {
    KEYWORD_TYPES.iter().any(|k| k.eq_ignore_ascii_case(name))
}

/// Resolve every class-like component of a type string.
pub fn resolve_type_string(input: &str, resolver: &NameResolver) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    split_top_level(input, '|')
        .into_iter()
        .map(|part| resolve_intersection(part, resolver))
        .collect::<Vec<_>>()
        .join("|")
}

fn resolve_intersection(part: &str, resolver: &NameResolver) -> String {
    split_top_level(part, '&')
        .into_iter()
        .map(|p| resolve_single(p, resolver))
        .collect::<Vec<_>>()
        .join("&")
}

fn resolve_single(part: &str, resolver: &NameResolver) -> String {
    let part = part.trim();
    if part.is_empty() {
        return String::new();
    }

    if let Some(inner) = part.strip_prefix('?') {
        return format!("?{}", resolve_single(inner, resolver));
    }
    if let Some(base) = part.strip_suffix("[]") {
        return format!("{}[]", resolve_single(base, resolver));
    }
    // Generic syntax: resolve the base, keep the arguments verbatim.
    if let Some(open) = part.find('<') {
        let base = resolve_single(&part[..open], resolver);
        return format!("{}{}", base, &part[open..]);
    }

    if is_keyword_type(part) {
        return part.to_string();
    }
    if let Some(stripped) = part.strip_prefix('\\') {
        return stripped.to_string();
    }
    resolver
        .resolve_not_fully_qualified(part, ImportKind::Class)
}

/// Split on `sep` outside of `<>`, `()` and `{}` nesting.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::UseRule;

    fn resolver() -> NameResolver {
        let mut r = NameResolver::new();
        r.set_namespace("App");
        r.add_rule(UseRule {
            alias: "Bar".to_string(),
            target: "Lib\\Bar".to_string(),
            kind: ImportKind::Class,
        });
        r
    }

    #[test]
    fn test_keywords_unchanged() {
        let r = resolver();
        assert_eq!(resolve_type_string("int", &r), "int");
        assert_eq!(resolve_type_string("string|null", &r), "string|null");
    }

    #[test]
    fn test_class_names_expanded() {
        let r = resolver();
        assert_eq!(resolve_type_string("Foo", &r), "App\\Foo");
        assert_eq!(resolve_type_string("Bar", &r), "Lib\\Bar");
        assert_eq!(resolve_type_string("\\DateTime", &r), "DateTime");
    }

    #[test]
    fn test_union_parts_resolved_independently() {
        let r = resolver();
        assert_eq!(
            resolve_type_string("Foo|Bar|null", &r),
            "App\\Foo|Lib\\Bar|null"
        );
    }

    #[test]
    fn test_nullable_and_array_suffix() {
        let r = resolver();
        assert_eq!(resolve_type_string("?Foo", &r), "?App\\Foo");
        assert_eq!(resolve_type_string("Foo[]", &r), "App\\Foo[]");
        assert_eq!(resolve_type_string("Foo[]|int", &r), "App\\Foo[]|int");
    }

    #[test]
    fn test_intersection() {
        let r = resolver();
        assert_eq!(resolve_type_string("Foo&Bar", &r), "App\\Foo&Lib\\Bar");
    }

    #[test]
    fn test_generic_base_resolved() {
        let r = resolver();
        assert_eq!(
            resolve_type_string("array<int, Foo>", &r),
            "array<int, Foo>"
        );
        assert_eq!(
            resolve_type_string("Collection<int>", &r),
            "App\\Collection<int>"
        );
    }
}
