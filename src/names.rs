//! Identifier Translation
//!
//! Translates arbitrary schema identifiers (camelCase, kebab-case,
//! SCREAMING_CASE, space separated, punctuation-laden) into idiomatic Rust
//! naming: PascalCase for types, snake_case for fields and methods.
//!
//! Translation is a pure function of the input and kind: the same input
//! always yields the same output, and translating an already-idiomatic
//! name is a no-op. The raw-to-translated mapping is stored on every
//! descriptor at synthesis time; callers never re-derive it.

// =============================================================================
// Identifier Kind
// =============================================================================

/// Which naming convention to translate into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// PascalCase, used for synthesized data types
    Type,
    /// snake_case, used for fields, parameters, and client methods
    Member,
}

/// Rust keywords and reserved words that cannot be used as identifiers.
/// Translated names colliding with one of these get a `_` suffix.
const RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn",
    "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
    "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "union", "unsafe", "use", "where", "while",
    // Reserved for future use
    "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

// =============================================================================
// Translation
// =============================================================================

/// Translate a raw schema identifier into the convention for `kind`.
pub fn translate(raw: &str, kind: IdentKind) -> String {
    match kind {
        IdentKind::Type => type_name(raw),
        IdentKind::Member => member_name(raw),
    }
}

/// Translate a raw schema identifier into a PascalCase type name.
pub fn type_name(raw: &str) -> String {
    let words = split_words(raw);
    if words.is_empty() {
        return "Unnamed".to_string();
    }

    let mut result = String::with_capacity(raw.len());
    for word in &words {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            for c in chars {
                result.push(c.to_ascii_lowercase());
            }
        }
    }

    finish(result)
}

/// Translate a raw schema identifier into a snake_case member name.
pub fn member_name(raw: &str) -> String {
    let words = split_words(raw);
    if words.is_empty() {
        return "unnamed".to_string();
    }

    let result = words
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");

    finish(result)
}

/// Apply the digit-start and reserved-word fixups shared by both kinds
fn finish(name: String) -> String {
    let name = if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    };

    if RESERVED.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

/// Split an identifier into words at separators, illegal characters, and
/// case boundaries. Characters outside `[A-Za-z0-9]` are dropped.
fn split_words(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_alphabetic() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars
                .get(i + 1)
                .map(|n| n.is_ascii_lowercase())
                .unwrap_or(false);

            // Boundary on digit->letter, lower->Upper, and at the end of an
            // acronym run ("APIKey" -> ["API", "Key"])
            if prev.is_ascii_digit()
                || (c.is_ascii_uppercase()
                    && (prev.is_ascii_lowercase()
                        || (prev.is_ascii_uppercase() && next_is_lower)))
            {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}
