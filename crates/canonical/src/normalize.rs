use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizeConfig;
use crate::document::NormalizedDocument;
use crate::error::CanonicalError;
use crate::hash::hash_normalized_bytes;
use crate::stopwords::is_stop_word;

/// CJK Unified Ideographs range recognized by the tokenizer.
const CJK_START: char = '\u{4E00}';
const CJK_END: char = '\u{9FA5}';

/// Minimum character count for an ASCII run to survive token filtering.
const MIN_TOKEN_CHARS: usize = 2;

/// Normalize raw text into a deterministic identity string and token stream.
///
/// The scan classifies every character into one of three classes: ASCII
/// alphanumerics (lowercased, accumulated into latin runs), CJK ideographs
/// (accumulated into ideograph runs, tokenized as overlapping character
/// bigrams), and everything else (a run delimiter). Runs joined by single
/// spaces form `normalized_text`; the filtered runs form `tokens`.
///
/// Empty, whitespace-only, and markup-only input all degrade to an empty
/// document rather than an error. Callers must treat an empty token stream
/// as "not comparable".
pub fn normalize(raw: &str, cfg: &NormalizeConfig) -> Result<NormalizedDocument, CanonicalError> {
    if cfg.version == 0 {
        return Err(CanonicalError::InvalidConfig(
            "version must be >= 1".into(),
        ));
    }

    let stripped: Cow<'_, str> = if cfg.strip_markup {
        strip_markup(raw)
    } else {
        Cow::Borrowed(raw)
    };
    let text: Cow<'_, str> = if cfg.normalize_unicode {
        Cow::Owned(stripped.nfkc().collect())
    } else {
        stripped
    };

    let mut normalized_text = String::with_capacity(text.len());
    let mut tokens: Vec<String> = Vec::new();
    let mut latin = String::new();
    let mut cjk: Vec<char> = Vec::new();

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            flush_cjk(&mut cjk, &mut normalized_text, &mut tokens);
            latin.push(ch.to_ascii_lowercase());
        } else if (CJK_START..=CJK_END).contains(&ch) {
            flush_latin(&mut latin, &mut normalized_text, &mut tokens);
            cjk.push(ch);
        } else {
            flush_latin(&mut latin, &mut normalized_text, &mut tokens);
            flush_cjk(&mut cjk, &mut normalized_text, &mut tokens);
        }
    }
    flush_latin(&mut latin, &mut normalized_text, &mut tokens);
    flush_cjk(&mut cjk, &mut normalized_text, &mut tokens);

    let content_hash = hash_normalized_bytes(cfg.version, normalized_text.as_bytes());
    Ok(NormalizedDocument {
        normalized_text,
        tokens,
        content_hash,
        version: cfg.version,
    })
}

fn push_run(normalized_text: &mut String, run: &str) {
    if !normalized_text.is_empty() {
        normalized_text.push(' ');
    }
    normalized_text.push_str(run);
}

fn flush_latin(latin: &mut String, normalized_text: &mut String, tokens: &mut Vec<String>) {
    if latin.is_empty() {
        return;
    }
    push_run(normalized_text, latin);
    // ASCII only, so byte length equals character count.
    if latin.len() >= MIN_TOKEN_CHARS && !is_stop_word(latin) {
        tokens.push(latin.clone());
    }
    latin.clear();
}

fn flush_cjk(cjk: &mut Vec<char>, normalized_text: &mut String, tokens: &mut Vec<String>) {
    if cjk.is_empty() {
        return;
    }
    let run: String = cjk.iter().collect();
    push_run(normalized_text, &run);
    // Character bigrams stand in for dictionary segmentation. A lone
    // ideograph produces no bigram and drops, matching the length filter
    // on latin runs.
    for pair in cjk.windows(2) {
        let bigram: String = pair.iter().collect();
        if !is_stop_word(&bigram) {
            tokens.push(bigram);
        }
    }
    cjk.clear();
}

/// Remove `<...>` spans. Mirrors a `<[^>]+>` regex: the span must contain at
/// least one character, and an unterminated `<` is kept literally.
fn strip_markup(input: &str) -> Cow<'_, str> {
    if !input.contains('<') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open + 1..].find('>') {
            Some(close) if close > 0 => {
                rest = &rest[open + 1 + close + 1..];
            }
            Some(_) => {
                // literal "<>", keep the bracket and rescan after it
                out.push('<');
                rest = &rest[open + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
