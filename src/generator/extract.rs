//! OTP recovery from free text.
//!
//! Used wherever a code must be pulled out of message content without access
//! to the synthesis step that produced it — including content this crate did
//! not generate. Synthesis callers never go through here; they keep the code
//! they embedded.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered rules, most specific label first. Each captures a 4–8 digit run
/// following (or, for the last rule, preceding) its label.
static LABELLED_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)verification code[^\d]*(\d{4,8})",
        r"(?i)security code[^\d]*(\d{4,8})",
        r"(?i)code is[^\d]*(\d{4,8})",
        r"(?i)one-time password[^\d]*(\d{4,8})",
        r"(?i)OTP[^\d]*(\d{4,8})",
        r"(?i)code[^\d]*(\d{4,8})",
        r"(?i)(\d{4,8})[^\d]*is your",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("pattern compiles"))
    .collect()
});

/// Last resort: any standalone six-digit run.
static BARE_SIX_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{6})\b").unwrap());

/// Extract an OTP-like code from arbitrary text.
///
/// The first matching rule wins; labelled rules take precedence over the
/// bare-digit fallback. Favors recall over precision — a stray six-digit
/// number in unlabelled text will be picked up.
pub fn extract_code(text: &str) -> Option<String> {
    for rule in LABELLED_RULES.iter() {
        if let Some(captures) = rule.captures(text) {
            if let Some(code) = captures.get(1) {
                return Some(code.as_str().to_string());
            }
        }
    }
    BARE_SIX_DIGITS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
