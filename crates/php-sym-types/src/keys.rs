//! Name utilities: acronym computation, suffix-key generation and FQN
//! splitting for the workspace symbol index.

/// Split a fully qualified name into its namespace prefix and short name.
///
/// `split_fqn("App\\Service\\Foo")` is `("App\\Service", "Foo")`; a name
/// without a separator has an empty prefix.
pub fn split_fqn(name: &str) -> (&str, &str) {
    match name.rsplit_once('\\') {
        Some((prefix, short)) => (prefix, short),
        None => ("", name),
    }
}

/// Compute the acronym of a symbol name for fuzzy lookup.
///
/// Leading `$` and `_` sigils are stripped and the acronym is taken over the
/// last namespace segment: one letter per underscore-delimited part for
/// snake/screaming case, the first letter plus each uppercase letter for
/// camel case. Always lowercase.
///
/// `MyFooClass` → `mfc`, `_my_function` → `mf`, `$myProperty` → `mp`,
/// `THIS_IS_A_CONSTANT` → `tiac`.
pub fn acronym(name: &str) -> String {
    let (_, short) = split_fqn(name);
    let stripped = short.trim_start_matches(['$', '_']);
    if stripped.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    if stripped.contains('_') {
        for part in stripped.split('_').filter(|p| !p.is_empty()) {
            if let Some(first) = part.chars().next() {
                if first.is_ascii_alphabetic() {
                    out.push(first.to_ascii_lowercase());
                }
            }
        }
    } else {
        for (i, c) in stripped.chars().enumerate() {
            if (i == 0 || c.is_ascii_uppercase()) && c.is_ascii_alphabetic() {
                out.push(c.to_ascii_lowercase());
            }
        }
    }
    out
}

/// Generate lowercase right-suffix keys for a symbol name.
///
/// The first key is the whole name lowercased; each further key starts at
/// the next boundary: a namespace separator, an underscore, a leading sigil
/// or a camel-case hump.
///
/// `Foo\MyFooClass` → `["foo\\myfooclass", "myfooclass", "fooclass", "class"]`,
/// `$myProperty` → `["$myproperty", "myproperty", "property"]`,
/// `THIS_IS_A_CONSTANT` →
/// `["this_is_a_constant", "is_a_constant", "a_constant", "constant"]`.
pub fn suffix_keys(name: &str) -> Vec<String> {
    if name.is_empty() {
        return Vec::new();
    }

    let mut keys = vec![name.to_lowercase()];
    let mut prev: Option<char> = None;
    for (i, c) in name.char_indices() {
        if let Some(p) = prev {
            let after_separator = p == '\\' || p == '_' || p == '$';
            let camel_hump = c.is_ascii_uppercase() && (p.is_ascii_lowercase() || p.is_ascii_digit());
            if after_separator || camel_hump {
                let suffix = name[i..].to_lowercase();
                if !suffix.is_empty() && !keys.contains(&suffix) {
                    keys.push(suffix);
                }
            }
        }
        prev = Some(c);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fqn() {
        assert_eq!(split_fqn("App\\Service\\Foo"), ("App\\Service", "Foo"));
        assert_eq!(split_fqn("Foo"), ("", "Foo"));
        assert_eq!(split_fqn(""), ("", ""));
    }

    #[test]
    fn test_acronym_camel_case() {
        assert_eq!(acronym("MyFooClass"), "mfc");
        assert_eq!(acronym("$myProperty"), "mp");
        assert_eq!(acronym("getName"), "gn");
        assert_eq!(acronym("Foo"), "f");
    }

    #[test]
    fn test_acronym_snake_case() {
        assert_eq!(acronym("_my_function"), "mf");
        assert_eq!(acronym("THIS_IS_A_CONSTANT"), "tiac");
        assert_eq!(acronym("$http_response_header"), "hrh");
    }

    #[test]
    fn test_acronym_uses_short_name() {
        assert_eq!(acronym("App\\Service\\MyFooClass"), "mfc");
    }

    #[test]
    fn test_acronym_is_lowercase_letters_only() {
        for name in ["MyFooClass", "_my_function", "$myProperty", "X9Test"] {
            assert!(acronym(name).chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_suffix_keys_namespaced() {
        assert_eq!(
            suffix_keys("Foo\\MyFooClass"),
            vec!["foo\\myfooclass", "myfooclass", "fooclass", "class"]
        );
    }

    #[test]
    fn test_suffix_keys_property() {
        assert_eq!(
            suffix_keys("$myProperty"),
            vec!["$myproperty", "myproperty", "property"]
        );
    }

    #[test]
    fn test_suffix_keys_constant() {
        assert_eq!(
            suffix_keys("THIS_IS_A_CONSTANT"),
            vec![
                "this_is_a_constant",
                "is_a_constant",
                "a_constant",
                "constant"
            ]
        );
    }

    #[test]
    fn test_suffix_keys_first_is_lowercased_name() {
        for name in ["Foo\\Bar", "$x", "simple"] {
            assert_eq!(suffix_keys(name)[0], name.to_lowercase());
        }
    }

    #[test]
    fn test_suffix_keys_single_word() {
        assert_eq!(suffix_keys("simple"), vec!["simple"]);
    }
}
