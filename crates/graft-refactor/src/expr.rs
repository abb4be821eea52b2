//! Conservative side-effect analysis over expression text.
//!
//! Inlining duplicates or reorders an expression, which is only sound when
//! evaluating it twice (or not at all) is observationally equivalent to
//! evaluating it once. Anything that could write state counts: assignments,
//! increment/decrement, and invocations (including constructor calls). When
//! in doubt the answer is `true`.

use crate::scan::{is_ident_char_byte, scan_modes, ScanMode};

pub(crate) fn has_side_effects(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    let mut found = false;
    scan_modes(expr, |idx, b, mode| {
        if found || mode != ScanMode::Code {
            return;
        }
        match b {
            b'=' => {
                if is_assignment_eq(bytes, idx) {
                    found = true;
                }
            }
            b'+' | b'-' => {
                // Increment or decrement.
                if idx + 1 < bytes.len() && bytes[idx + 1] == b {
                    found = true;
                }
            }
            b'(' => {
                if is_invocation_paren(bytes, idx) {
                    found = true;
                }
            }
            _ => {}
        }
    });
    found
}

/// Whether the `=` at `idx` is (part of) an assignment operator rather than a
/// comparison.
fn is_assignment_eq(bytes: &[u8], idx: usize) -> bool {
    let next = bytes.get(idx + 1).copied();
    let prev = if idx > 0 { Some(bytes[idx - 1]) } else { None };
    if next == Some(b'=') || prev == Some(b'=') {
        return false;
    }
    match prev {
        Some(b'!') => false,
        // `<=` / `>=` are comparisons, but `<<=` / `>>=` assign.
        Some(c @ (b'<' | b'>')) => idx >= 2 && bytes[idx - 2] == c,
        // `+=`, `-=`, `*=`, ... all assign, as does bare `=`.
        _ => true,
    }
}

/// Whether the `(` at `idx` closes an invocation: a preceding identifier that
/// is not a control-flow keyword.
fn is_invocation_paren(bytes: &[u8], idx: usize) -> bool {
    let mut end = idx;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && is_ident_char_byte(bytes[start - 1]) {
        start -= 1;
    }
    if start == end {
        return false;
    }
    let ident = std::str::from_utf8(&bytes[start..end]).unwrap_or("");
    !matches!(
        ident,
        "if" | "for" | "while" | "switch" | "catch" | "return" | "assert" | "synchronized"
    )
}
