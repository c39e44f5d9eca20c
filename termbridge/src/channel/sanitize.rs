//! Output sanitizer for noisy device output.
//!
//! Every step is a pure `&str -> String` transform. The two pipelines are
//! [`clean`] (what subscribers see in the output log) and
//! [`clean_for_capture`] (what ends up in a run's captured result), and both
//! are idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pagination banners emitted by common network operating systems.
///
/// Covers `--More--`, `---- More ----`, `<--- More --->`, `---(more 45%)---`,
/// `More:` hint lines and the `<space>`/`<return>`/`CTRL+Z` key hints.
pub const PAGER_BANNER_PATTERN: &str = r"(?i)(?:-+\s*\(?\s*more\b[^-\n]*-+|\bmore:|<space>|<return>|ctrl\+z|press any key to continue)";

static PAGER_BANNER: Lazy<Regex> = Lazy::new(|| Regex::new(PAGER_BANNER_PATTERN).unwrap());

// CSI, OSC (BEL or ST terminated, single line), charset selection and
// two-byte escapes.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b\n]*(?:\x07|\x1b\\)|\x1b[()#][0-9A-Za-z]|\x1b[=>78DEHMc]")
        .unwrap()
});

// Cisco-style erase after a pager continuation: backspaces, spaces, backspaces.
static BACKSPACE_ERASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x08+ *\x08*").unwrap());

static CR_BEFORE_LF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r+\n").unwrap());

static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

/// Sanitize a chunk for the live output log.
///
/// Pager lines and escape sequences are removed and line endings
/// normalized. Control bytes are kept.
pub fn clean(raw: &str) -> String {
    normalize_line_endings(&strip_ansi(&strip_pager_lines(raw)))
}

/// Sanitize a chunk for a captured command result.
///
/// Same as [`clean`], plus everything outside printable ASCII, TAB, CR and LF
/// is dropped.
pub fn clean_for_capture(raw: &str) -> String {
    normalize_line_endings(&filter_non_printable(&strip_ansi(&strip_pager_lines(
        raw,
    ))))
}

/// Check whether the text contains a pager banner anywhere.
///
/// Escape sequences and control bytes are ignored, so `\x1b[7m--More--\x1b[m`
/// is still recognized.
pub fn contains_pager_banner(text: &str) -> bool {
    PAGER_BANNER.is_match(&probe(text))
}

/// Remove every line that carries a pager banner, including its line terminator.
pub fn strip_pager_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !contains_pager_banner(line) {
            out.push_str(line);
        }
    }
    out
}

/// Remove terminal escape sequences until none are left.
///
/// Repeated because removing one sequence can splice the bytes around it
/// into a new one (`\x1b[\x1b[0m1m`).
pub fn strip_ansi(text: &str) -> String {
    let mut current = text.to_string();
    while ANSI_ESCAPE.is_match(&current) {
        current = ANSI_ESCAPE.replace_all(&current, "").into_owned();
    }
    current
}

/// Drop backspace erase runs, then every char outside TAB, LF, CR and 0x20-0x7E.
pub fn filter_non_printable(text: &str) -> String {
    BACKSPACE_ERASE
        .replace_all(text, "")
        .chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r' | ' '..='~'))
        .collect()
}

/// Convert `\r\n` (and `\r\r\n`) to `\n` and collapse runs of blank lines.
pub fn normalize_line_endings(text: &str) -> String {
    let unix = CR_BEFORE_LF.replace_all(text, "\n");
    BLANK_LINE_RUN.replace_all(&unix, "\n\n").into_owned()
}

fn probe(text: &str) -> String {
    filter_non_printable(&strip_ansi(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOISY: &[&str] = &[
        "\x1b[32mGreen text\x1b[0m\r\n",
        "line1\r\n --More-- \x08\x08\x08\x08\x08\x08\x08\x08\x08         \x08\x08\x08\x08\x08\x08\x08\x08\x08line2\r\n",
        "\x1b[\x1b[0m1mnested\r\r\n",
        "a\r\n\r\n\r\n\r\n\r\nb",
        "\x1b]0;router: ~\x07router#",
        "---- More ----\x1b[42D                                          \x1b[42D  ip route\n",
        "Press any key to continue (Q to quit)\nreal\n",
        "--Mo\x1b[7mre--\nafter\n",
        "<HUAWEI>",
        "",
    ];

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32mGreen text\x1b[0m"), "Green text");
        assert_eq!(strip_ansi("\x1b[2J\x1b[1;1Hrouter#"), "router#");
        assert_eq!(strip_ansi("\x1b]0;title\x07prompt>"), "prompt>");
    }

    #[test]
    fn test_strip_ansi_spliced_sequence() {
        assert_eq!(strip_ansi("\x1b[\x1b[0m1mtext"), "text");
    }

    #[test]
    fn test_pager_line_removed_with_terminator() {
        let out = strip_pager_lines("--More--\nreal content\n");
        assert_eq!(out, "real content\n");

        let out = strip_pager_lines("interface Gi0/1\n<--- More --->\n shutdown\n");
        assert_eq!(out, "interface Gi0/1\n shutdown\n");
    }

    #[test]
    fn test_pager_banner_variants() {
        for banner in [
            " --More-- ",
            "---- More ----",
            "-- MORE --",
            "---(more 45%)---",
            "More: <space>,  Quit: q or CTRL+Z, One line: <return>",
            "\x1b[7m--More--\x1b[m",
        ] {
            assert!(contains_pager_banner(banner), "{banner:?}");
        }
        assert!(!contains_pager_banner("router#"));
        assert!(!contains_pager_banner("description more uplinks"));
    }

    #[test]
    fn test_filter_non_printable() {
        assert_eq!(filter_non_printable("a\x00b\x07c\td\r\n"), "abc\td\r\n");
        assert_eq!(filter_non_printable("x\x08\x08  \x08\x08y"), "xy");
        assert_eq!(filter_non_printable("caf\u{e9}"), "caf");
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\r\r\nc"), "a\nb\nc");
        assert_eq!(normalize_line_endings("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_line_endings("a\n\nb"), "a\n\nb");
        assert_eq!(normalize_line_endings("a\n \n\t\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_keeps_real_content_after_pager() {
        let out = clean_for_capture(NOISY[1]);
        assert_eq!(out, "line1\n");

        let out = clean_for_capture("\x08\x08\x08\x08\x08\x08\x08\x08\x08         \x08\x08\x08\x08\x08\x08\x08\x08\x08line2\r\n");
        assert_eq!(out, "line2\n");
    }

    #[test]
    fn test_clean_is_idempotent() {
        for raw in NOISY {
            let once = clean(raw);
            assert_eq!(clean(&once), once, "clean not idempotent for {raw:?}");

            let once = clean_for_capture(raw);
            assert_eq!(
                clean_for_capture(&once),
                once,
                "clean_for_capture not idempotent for {raw:?}"
            );
        }
    }

    #[test]
    fn test_prompt_terminators_survive() {
        for prompt in ["switch>", "switch#", "[~HUAWEI]", "user@host:~$"] {
            assert_eq!(clean(prompt), prompt);
            assert_eq!(clean_for_capture(prompt), prompt);
        }
    }
}
