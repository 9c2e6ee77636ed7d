//! Log sanitization: strip terminal control sequences and transient network
//! noise from raw CLI output so the archived log is readable.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

static ANSI_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_START_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_END_REGEX: OnceLock<Regex> = OnceLock::new();
static LINE_NOISE_REGEX: OnceLock<Regex> = OnceLock::new();

// CSI sequences, OSC title strings, DEC private modes, and raw carriage
// returns from PTY output.
fn ansi_regex() -> &'static Regex {
    ANSI_REGEX.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]|\x1b\][^\x07]*\x07|\x1b\[\?[0-9;]*[a-zA-Z]|\r")
            .expect("ANSI_REGEX is valid")
    })
}

// Transient network errors from the proxied CLI tools arrive as multi-line
// blocks: an "Error: peer closed connection" line followed by a raw nginx
// 503 page. Skip everything from the start marker to </html>.
fn block_start_regex() -> &'static Regex {
    BLOCK_START_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)Error:\s*peer closed connection|Error:\s*incomplete chunked read|^\s*<html>\s*$",
        )
        .expect("BLOCK_START_REGEX is valid")
    })
}

fn block_end_regex() -> &'static Regex {
    BLOCK_END_REGEX.get_or_init(|| Regex::new(r"(?i)</html>").expect("BLOCK_END_REGEX is valid"))
}

fn line_noise_regex() -> &'static Regex {
    LINE_NOISE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^\s*Error:\s*peer closed connection|^\s*\(incomplete chunked read\)\s*$")
            .expect("LINE_NOISE_REGEX is valid")
    })
}

/// Strip ANSI escapes, elide noise blocks, drop standalone noise lines, and
/// collapse runs of blank lines.
///
/// Block elision is a small state machine: once a block-start line is seen,
/// every line is skipped until the matching `</html>`. An unterminated block
/// elides to end of input.
pub fn sanitize_text(raw: &str) -> String {
    let text = ansi_regex().replace_all(raw, "");

    let mut clean = String::with_capacity(text.len());
    let mut in_noise = false;
    let mut prev_blank = false;

    for line in text.split_inclusive('\n') {
        let stripped = line.trim();

        if in_noise {
            if block_end_regex().is_match(stripped) {
                in_noise = false;
            }
            continue;
        }
        if block_start_regex().is_match(stripped) {
            in_noise = true;
            continue;
        }
        if !stripped.is_empty() && line_noise_regex().is_match(stripped) {
            continue;
        }

        let is_blank = stripped.is_empty();
        if is_blank && prev_blank {
            continue;
        }
        prev_blank = is_blank;

        clean.push_str(line);
    }

    clean
}

/// Last `max_lines` non-blank lines of sanitized text, newline-joined.
pub fn output_tail(clean: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = clean.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Sanitize a raw log file, writing the result to `<stem>.clean.log` next to
/// it. I/O failures degrade: an unreadable raw log yields empty text, an
/// unwritable clean log still returns the in-memory text.
pub fn sanitize_log_file(raw_path: &Path) -> (Option<PathBuf>, String) {
    let raw = match fs::read(raw_path) {
        Ok(bytes) => bytes,
        Err(_) => return (None, String::new()),
    };
    let clean = sanitize_text(&String::from_utf8_lossy(&raw));

    let clean_path = raw_path.with_extension("clean.log");
    match fs::write(&clean_path, &clean) {
        Ok(()) => (Some(clean_path), clean),
        Err(_) => (None, clean),
    }
}
