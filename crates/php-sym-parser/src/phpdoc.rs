//! PHPDoc comment parser.
//!
//! Parses `/** ... */` comments into structured tags: `@param`, `@return`,
//! `@var`, `@property` (and the read/write variants), `@method`, plus the
//! leading description. Type strings are kept unresolved; the extraction
//! pass resolves them against the file's name resolver when it attaches
//! them to symbols.

/// Parsed PHPDoc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub description: Option<String>,
    pub params: Vec<DocParam>,
    pub return_type: Option<String>,
    pub vars: Vec<DocVar>,
    pub properties: Vec<DocProperty>,
    pub methods: Vec<DocMethod>,
}

impl DocBlock {
    /// The `@param` tag for a parameter name (with leading `$`), if any.
    pub fn param(&self, name: &str) -> Option<&DocParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The first `@var` tag, optionally matching a variable name.
    pub fn var(&self, name: Option<&str>) -> Option<&DocVar> {
        self.vars
            .iter()
            .find(|v| match (name, v.name.as_deref()) {
                (Some(wanted), Some(tagged)) => wanted == tagged,
                _ => true,
            })
    }
}

/// A `@param Type $name description` tag. `name` keeps the `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocParam {
    pub name: String,
    pub type_string: Option<String>,
    pub description: Option<String>,
}

/// A `@var Type [$name] [description]` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocVar {
    pub name: Option<String>,
    pub type_string: Option<String>,
    pub description: Option<String>,
}

/// Access declared by a `@property` family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyAccess {
    #[default]
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// A `@property[-read|-write] Type $name` tag. `name` keeps the `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocProperty {
    pub name: String,
    pub type_string: Option<String>,
    pub access: PropertyAccess,
    pub description: Option<String>,
}

/// A `@method [static] [ReturnType] name(Type $a, ...)` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMethod {
    pub name: String,
    pub return_type: Option<String>,
    pub is_static: bool,
    pub params: Vec<DocMethodParam>,
    pub description: Option<String>,
}

/// One parameter inside a `@method` signature. `name` keeps the `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMethodParam {
    pub name: String,
    pub type_string: Option<String>,
}

/// Parse a full PHPDoc comment (including `/**` and `*/`).
pub fn parse_doc_block(comment: &str) -> DocBlock {
    let mut doc = DocBlock::default();
    let lines = strip_comment_markers(comment);

    let mut description_lines: Vec<String> = Vec::new();
    let mut in_description = true;

    for line in &lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if in_description && !description_lines.is_empty() {
                in_description = false;
            }
            continue;
        }

        if trimmed.starts_with('@') {
            in_description = false;
            parse_tag(trimmed, &mut doc);
        } else if in_description {
            description_lines.push(trimmed.to_string());
        }
    }

    if !description_lines.is_empty() {
        doc.description = Some(description_lines.join(" "));
    }

    doc
}

fn strip_comment_markers(comment: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in comment.lines() {
        let trimmed = line.trim();
        let mut stripped = if let Some(rest) = trimmed.strip_prefix("/**") {
            rest.trim()
        } else if trimmed.starts_with("*/") {
            continue;
        } else if let Some(rest) = trimmed.strip_prefix('*') {
            rest.trim_start()
        } else {
            trimmed
        };
        if stripped.ends_with("*/") {
            stripped = stripped[..stripped.len() - 2].trim_end();
        }
        lines.push(stripped.to_string());
    }
    lines
}

fn parse_tag(line: &str, doc: &mut DocBlock) {
    if let Some(rest) = line.strip_prefix("@param") {
        parse_param_tag(rest.trim(), doc);
    } else if let Some(rest) = line.strip_prefix("@return") {
        let rest = rest.trim();
        if !rest.is_empty() {
            doc.return_type = Some(first_word(rest).to_string());
        }
    } else if let Some(rest) = line.strip_prefix("@var") {
        parse_var_tag(rest.trim(), doc);
    } else if let Some(rest) = line.strip_prefix("@property-read") {
        parse_property_tag(rest.trim(), PropertyAccess::ReadOnly, doc);
    } else if let Some(rest) = line.strip_prefix("@property-write") {
        parse_property_tag(rest.trim(), PropertyAccess::WriteOnly, doc);
    } else if let Some(rest) = line.strip_prefix("@property") {
        parse_property_tag(rest.trim(), PropertyAccess::ReadWrite, doc);
    } else if let Some(rest) = line.strip_prefix("@method") {
        parse_method_tag(rest.trim(), doc);
    }
    // Unknown tags are dropped.
}

fn parse_param_tag(rest: &str, doc: &mut DocBlock) {
    let parts: Vec<&str> = rest.splitn(3, char::is_whitespace).collect();
    if parts.is_empty() {
        return;
    }

    let (type_str, name_str, desc) = if parts[0].starts_with('$') {
        // @param $name, no type given
        (None, parts[0], parts.get(1).map(|s| s.to_string()))
    } else if parts.len() >= 2 && parts[1].starts_with('$') {
        // @param Type $name [description]
        (Some(parts[0]), parts[1], parts.get(2).map(|s| s.to_string()))
    } else {
        return;
    };

    doc.params.push(DocParam {
        name: normalize_var_name(name_str),
        type_string: type_str.map(|s| s.to_string()),
        description: desc,
    });
}

fn parse_var_tag(rest: &str, doc: &mut DocBlock) {
    if rest.is_empty() {
        return;
    }
    let parts: Vec<&str> = rest.splitn(3, char::is_whitespace).collect();

    let (type_str, name, desc) = if parts[0].starts_with('$') {
        (None, Some(parts[0]), parts.get(1).map(|s| s.to_string()))
    } else if parts.len() >= 2 && parts[1].starts_with('$') {
        (
            Some(parts[0]),
            Some(parts[1]),
            parts.get(2).map(|s| s.to_string()),
        )
    } else {
        (Some(parts[0]), None, parts.get(1).map(|s| s.to_string()))
    };

    doc.vars.push(DocVar {
        name: name.map(normalize_var_name),
        type_string: type_str.map(|s| s.to_string()),
        description: desc,
    });
}

fn parse_property_tag(rest: &str, access: PropertyAccess, doc: &mut DocBlock) {
    let parts: Vec<&str> = rest.splitn(3, char::is_whitespace).collect();
    if parts.is_empty() {
        return;
    }

    // Either "@property Type $name" or "@property $name".
    let (type_str, name_str, desc) = if parts[0].starts_with('$') {
        (None, parts[0], parts.get(1).map(|s| s.to_string()))
    } else if parts.len() >= 2 && parts[1].starts_with('$') {
        (Some(parts[0]), parts[1], parts.get(2).map(|s| s.to_string()))
    } else {
        return;
    };

    doc.properties.push(DocProperty {
        name: normalize_var_name(name_str),
        type_string: type_str.map(|s| s.to_string()),
        access,
        description: desc,
    });
}

fn parse_method_tag(rest: &str, doc: &mut DocBlock) {
    let rest = rest.trim();

    let (is_static, rest) = match rest.strip_prefix("static") {
        Some(r) if r.starts_with(char::is_whitespace) => (true, r.trim_start()),
        _ => (false, rest),
    };

    // Format: [ReturnType] name([params]) [description]
    let paren_pos = match rest.find('(') {
        Some(pos) => pos,
        None => return,
    };

    let before_paren = rest[..paren_pos].trim();
    let parts: Vec<&str> = before_paren.rsplitn(2, char::is_whitespace).collect();
    if parts.is_empty() || parts[0].is_empty() {
        return;
    }

    let (return_type, name) = if parts.len() == 2 {
        (Some(parts[1].to_string()), parts[0].to_string())
    } else {
        (None, parts[0].to_string())
    };

    let after_paren = &rest[paren_pos + 1..];
    let close = after_paren.find(')');
    let params = close
        .map(|end| parse_method_params(&after_paren[..end]))
        .unwrap_or_default();
    let description = close
        .map(|end| after_paren[end + 1..].trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string());

    doc.methods.push(DocMethod {
        name,
        return_type,
        is_static,
        params,
        description,
    });
}

fn parse_method_params(list: &str) -> Vec<DocMethodParam> {
    let mut params = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let words: Vec<&str> = part.split_whitespace().collect();
        let (type_str, name) = if words[0].starts_with('$') {
            (None, words[0])
        } else if words.len() >= 2 && words[1].starts_with('$') {
            (Some(words[0]), words[1])
        } else {
            continue;
        };
        // Strip a default value from "$x = 1".
        let name = name.split('=').next().unwrap_or(name).trim();
        params.push(DocMethodParam {
            name: normalize_var_name(name),
            type_string: type_str.map(|s| s.to_string()),
        });
    }
    params
}

fn normalize_var_name(name: &str) -> String {
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${}", name)
    }
}

/// Get the first whitespace-delimited word from a string.
fn first_word(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or(s)
}
