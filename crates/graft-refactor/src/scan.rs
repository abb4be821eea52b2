//! Lightweight lexical scanning over synthesized Java-like source text.
//!
//! The program model carries resolved references for declarations the host
//! binder indexed; body-local rewrites (receiver swaps, parameter renames,
//! temp substitution) still need to find identifier occurrences inside a
//! single body. The scanner tracks comment and literal modes so those
//! occurrences are never touched.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    Code,
    LineComment,
    BlockComment,
    StringLiteral,
    CharLiteral,
}

/// Iterate through `text` and invoke `f` for each byte with the current mode.
pub(crate) fn scan_modes(text: &str, mut f: impl FnMut(usize, u8, ScanMode)) {
    let bytes = text.as_bytes();
    let mut mode = ScanMode::Code;
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        f(idx, b, mode);

        match mode {
            ScanMode::Code => match b {
                b'/' if idx + 1 < bytes.len() && bytes[idx + 1] == b'/' => {
                    mode = ScanMode::LineComment;
                    idx += 2;
                    continue;
                }
                b'/' if idx + 1 < bytes.len() && bytes[idx + 1] == b'*' => {
                    mode = ScanMode::BlockComment;
                    idx += 2;
                    continue;
                }
                b'"' => {
                    mode = ScanMode::StringLiteral;
                }
                b'\'' => {
                    mode = ScanMode::CharLiteral;
                }
                _ => {}
            },
            ScanMode::LineComment => {
                if b == b'\n' {
                    mode = ScanMode::Code;
                }
            }
            ScanMode::BlockComment => {
                if b == b'*' && idx + 1 < bytes.len() && bytes[idx + 1] == b'/' {
                    // let the closing `/` be seen as comment too
                    f(idx + 1, bytes[idx + 1], mode);
                    idx += 2;
                    mode = ScanMode::Code;
                    continue;
                }
            }
            ScanMode::StringLiteral => {
                if b == b'\\' {
                    idx += 2;
                    continue;
                }
                if b == b'"' {
                    mode = ScanMode::Code;
                }
            }
            ScanMode::CharLiteral => {
                if b == b'\\' {
                    idx += 2;
                    continue;
                }
                if b == b'\'' {
                    mode = ScanMode::Code;
                }
            }
        }

        idx += 1;
    }
}

pub(crate) fn is_ident_char_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

pub(crate) fn is_boundary(text: &[u8], idx: usize) -> bool {
    if idx >= text.len() {
        return true;
    }
    !is_ident_char_byte(text[idx])
}

/// Start offsets of whole-identifier occurrences of `name` in code mode.
pub(crate) fn identifier_occurrences(text: &str, name: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let name_bytes = name.as_bytes();
    let mut out = Vec::new();
    scan_modes(text, |idx, b, mode| {
        if mode != ScanMode::Code || b != name_bytes[0] {
            return;
        }
        if idx + name_bytes.len() > bytes.len() || &bytes[idx..idx + name_bytes.len()] != name_bytes
        {
            return;
        }
        let before_ok = idx == 0 || !is_ident_char_byte(bytes[idx - 1]);
        if before_ok && is_boundary(bytes, idx + name_bytes.len()) {
            out.push(idx);
        }
    });
    out
}

/// Replace whole-identifier occurrences of `from` with `to`, skipping
/// occurrences directly preceded by `.` (already-qualified member accesses).
/// Returns the rewritten text and the number of replacements.
pub(crate) fn replace_identifier(text: &str, from: &str, to: &str) -> (String, usize) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut count = 0;
    for start in identifier_occurrences(text, from) {
        if start < copied {
            continue;
        }
        if start > 0 && bytes[start - 1] == b'.' {
            continue;
        }
        out.push_str(&text[copied..start]);
        out.push_str(to);
        copied = start + from.len();
        count += 1;
    }
    out.push_str(&text[copied..]);
    (out, count)
}

/// Whole-identifier occurrences of `name` that are not `.`-qualified, so a
/// reference to `other.total` never counts as a use of an enclosing `total`.
pub(crate) fn unqualified_occurrences(text: &str, name: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    identifier_occurrences(text, name)
        .into_iter()
        .filter(|&start| start == 0 || bytes[start - 1] != b'.')
        .collect()
}

/// Re-indent a block of lines from `old_indent` to `new_indent`. Blank lines
/// stay blank.
pub(crate) fn reindent(block: &str, old_indent: &str, new_indent: &str) -> String {
    let mut out = String::new();
    for line in block.split_inclusive('\n') {
        let has_newline = line.ends_with('\n');
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_prefix(old_indent).unwrap_or(line);
        if !line.trim().is_empty() {
            out.push_str(new_indent);
        }
        out.push_str(line);
        if has_newline {
            out.push('\n');
        }
    }
    if !block.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Indent every non-blank line of `block` by `indent`.
pub(crate) fn indent_block(block: &str, indent: &str) -> String {
    reindent(block, "", indent)
}
