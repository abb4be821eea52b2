use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("name is empty (after trimming whitespace)")]
    Empty,
    #[error("must start with '_' or an ASCII letter")]
    InvalidStartChar,
    #[error("must contain only ASCII letters, digits, or '_'")]
    InvalidChar,
    #[error("is a reserved keyword")]
    Keyword,
}

/// Validate and sanitize an identifier introduced by a refactoring.
///
/// Conservative ASCII-only subset:
/// - non-empty after trimming whitespace
/// - first character: `_` or ASCII letter
/// - remaining characters: `_` or ASCII alphanumeric
/// - rejects keywords (contextual keywords included)
pub fn validate_identifier(name: &str) -> Result<String, IdentifierError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(IdentifierError::Empty);
    }

    let mut chars = name.chars();
    let first = chars.next().expect("non-empty");
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(IdentifierError::InvalidStartChar);
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(IdentifierError::InvalidChar);
    }

    if is_keyword(name) {
        return Err(IdentifierError::Keyword);
    }

    Ok(name.to_string())
}

pub(crate) fn is_keyword(ident: &str) -> bool {
    // Contextual keywords are included so synthesized code never needs
    // escaping to stay parseable.
    matches!(
        ident,
        "abstract"
            | "assert"
            | "boolean"
            | "break"
            | "byte"
            | "case"
            | "catch"
            | "char"
            | "class"
            | "const"
            | "continue"
            | "default"
            | "do"
            | "double"
            | "else"
            | "enum"
            | "extends"
            | "final"
            | "finally"
            | "float"
            | "for"
            | "goto"
            | "if"
            | "implements"
            | "import"
            | "instanceof"
            | "int"
            | "interface"
            | "long"
            | "native"
            | "new"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "return"
            | "short"
            | "static"
            | "strictfp"
            | "super"
            | "switch"
            | "synchronized"
            | "this"
            | "throw"
            | "throws"
            | "transient"
            | "try"
            | "void"
            | "volatile"
            | "while"
            | "true"
            | "false"
            | "null"
            | "var"
            | "yield"
            | "record"
            | "sealed"
            | "permits"
            | "when"
            | "module"
            | "open"
            | "opens"
            | "requires"
            | "transitive"
            | "exports"
            | "to"
            | "uses"
            | "provides"
            | "with"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names_and_trims() {
        assert_eq!(validate_identifier("  total "), Ok("total".to_string()));
        assert_eq!(validate_identifier("_buf2"), Ok("_buf2".to_string()));
    }

    #[test]
    fn rejects_bad_shapes_and_keywords() {
        assert_eq!(validate_identifier(""), Err(IdentifierError::Empty));
        assert_eq!(validate_identifier("2nd"), Err(IdentifierError::InvalidStartChar));
        assert_eq!(validate_identifier("a-b"), Err(IdentifierError::InvalidChar));
        assert_eq!(validate_identifier("class"), Err(IdentifierError::Keyword));
        assert_eq!(validate_identifier("record"), Err(IdentifierError::Keyword));
    }
}
