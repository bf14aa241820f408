// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-supplied filename sanitization.
//!
//! Uploaded names end up in a filesystem path and in a `Content-Disposition`
//! header, so only a conservative ASCII subset survives.

use unicode_normalization::UnicodeNormalization;

/// Name used when nothing usable is left after sanitization.
pub const FALLBACK_FILENAME: &str = "file";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3", "PRN", "NUL",
];

/// Reduce an arbitrary filename to `[A-Za-z0-9_.-]`.
///
/// Accents are folded via NFKD, path separators become word breaks,
/// whitespace runs collapse to `_`, and leading or trailing dots and
/// underscores are stripped.
pub fn sanitize_filename(raw: &str) -> String {
    let ascii: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
    {
        return format!("_{trimmed}");
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_filename("a.txt"), "a.txt");
        assert_eq!(sanitize_filename("report-2026_v2.pdf"), "report-2026_v2.pdf");
    }

    #[test]
    fn path_traversal_is_flattened() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("..\\windows\\win.ini"), "windows_win.ini");
    }

    #[test]
    fn whitespace_and_accents() {
        assert_eq!(sanitize_filename("my  résumé final.doc"), "my_resume_final.doc");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("../.."), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("日本語"), FALLBACK_FILENAME);
    }

    #[test]
    fn windows_device_names_are_prefixed() {
        assert_eq!(sanitize_filename("con.txt"), "_con.txt");
        assert_eq!(sanitize_filename("NUL"), "_NUL");
    }
}
