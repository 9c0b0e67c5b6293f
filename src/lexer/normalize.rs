//! Single-pass NFC normalization with inline literal-zone (fence) detection.
//!
//! Ported from `_normalize_with_fence_detection`: fence spans are recorded
//! against the *normalized* line buffer, not the raw input, so downstream
//! offsets stay consistent. Content inside an open fence is never NFC
//! normalized — it is preserved byte-for-byte.

use unicode_normalization::UnicodeNormalization;

use crate::lexer::patterns;

pub struct NormalizedLine {
    pub text: String,
    pub raw: String,
}

/// Splits `text` into lines, NFC-normalizing every line that falls outside an
/// open fence. Fence state is tracked with the same precedence rule the
/// lexer's main loop re-applies per line (`patterns::evaluate_fence_line`),
/// so this pass and the tokenizer agree on what is "inside a fence".
pub fn normalize_with_fences(text: &str) -> Vec<NormalizedLine> {
    let mut out = Vec::new();
    let mut fence_len: Option<usize> = None;

    for raw_line in text.split('\n') {
        let raw = raw_line.trim_end_matches('\r').to_string();

        if let Some(len) = fence_len {
            match patterns::evaluate_fence_line(&raw, len) {
                patterns::FenceDecision::Close => {
                    fence_len = None;
                    out.push(NormalizedLine { text: raw.clone(), raw });
                }
                _ => {
                    // content or nested-error lines are kept verbatim; the
                    // lexer's main loop re-evaluates and raises if needed.
                    out.push(NormalizedLine { text: raw.clone(), raw });
                }
            }
            continue;
        }

        let normalized: String = raw.nfc().collect();
        if let Some(len) = patterns::fence_open_len(&normalized) {
            fence_len = Some(len);
        }
        out.push(NormalizedLine { text: normalized, raw });
    }

    out
}
