//! Organization-name normalization.
//!
//! `Normalizer::normalize` is a pure, idempotent canonicalization:
//! 1. Lower-case and trim
//! 2. Strip trailing location qualifiers: parenthetical groups and
//!    ", <country>" tails
//! 3. Drop apostrophes and periods, turn other punctuation into spaces
//! 4. Expand known abbreviations token by token
//! 5. Repeatedly strip trailing legal suffixes and a leading "the" until
//!    nothing changes, never removing the last remaining token
//!
//! Abbreviation expansions are terminal (enforced by the lexicon), so a
//! second pass finds nothing left to do.

use crate::lexicon::Lexicon;

/// Name canonicalizer bound to a lexicon.
#[derive(Debug, Clone)]
pub struct Normalizer {
    lexicon: Lexicon,
}

impl Normalizer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Normalize a raw organization name.
    ///
    /// Returns an empty string for empty or all-punctuation input.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        let unqualified = self.strip_location_qualifiers(&lowered);

        let cleaned: String = unqualified
            .chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}' | '.'))
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        let mut tokens: Vec<String> = Vec::new();
        for token in cleaned.split_whitespace() {
            match self.lexicon.expand(token) {
                Some(expansion) => tokens.extend(expansion.iter().cloned()),
                None => tokens.push(token.to_string()),
            }
        }

        loop {
            let mut changed = false;
            if tokens.len() > 1 && self.lexicon.is_legal_suffix(&tokens[tokens.len() - 1]) {
                tokens.pop();
                changed = true;
            }
            if tokens.len() > 1 && tokens[0] == "the" {
                tokens.remove(0);
                changed = true;
            }
            if !changed {
                break;
            }
        }

        tokens.join(" ")
    }

    /// Separator-insensitive form: the normalized name with all whitespace
    /// removed ("Alcatel Lucent" and "ALCATEL-LUCENT" agree).
    pub fn ultra_clean(&self, raw: &str) -> String {
        ultra_from_normalized(&self.normalize(raw))
    }

    fn strip_location_qualifiers<'a>(&self, lowered: &'a str) -> &'a str {
        let mut out = lowered.trim_end();
        loop {
            if let Some((head, _)) = split_trailing_group(out) {
                if !head.is_empty() {
                    out = head;
                    continue;
                }
            }
            if let Some((head, tail)) = out.rsplit_once(',') {
                let head = head.trim_end();
                if !head.is_empty() && self.lexicon.country_code(tail).is_some() {
                    out = head;
                    continue;
                }
            }
            return out;
        }
    }

    /// Content of the trailing location qualifier, if any
    /// ("IBM (Canada)" -> "Canada").
    pub fn location_qualifier(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim_end();
        if let Some((head, inner)) = split_trailing_group(trimmed) {
            if !head.is_empty() && !inner.trim().is_empty() {
                return Some(inner.trim().to_string());
            }
        }
        let (head, tail) = trimmed.rsplit_once(',')?;
        if !head.trim().is_empty() && self.lexicon.country_code(tail).is_some() {
            return Some(tail.trim().to_string());
        }
        None
    }

    /// Country code implied by the trailing location qualifier.
    pub fn country_hint(&self, raw: &str) -> Option<String> {
        let qualifier = self.location_qualifier(raw)?;
        self.lexicon.country_code(&qualifier).map(str::to_string)
    }

    /// Significant tokens of a normalized name: stopwords and tokens shorter
    /// than `min_len` characters are dropped, order is preserved, duplicates
    /// removed.
    pub fn tokens(&self, normalized: &str, min_len: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for token in normalized.split(' ') {
            if token.chars().count() < min_len || self.lexicon.is_stopword(token) {
                continue;
            }
            if !out.iter().any(|t| t == token) {
                out.push(token.to_string());
            }
        }
        out
    }

    /// Initials of a multi-token normalized name, skipping stopwords.
    pub fn initials(&self, normalized: &str) -> Option<String> {
        let letters: String = normalized
            .split(' ')
            .filter(|t| !t.is_empty() && !self.lexicon.is_stopword(t))
            .filter_map(|t| t.chars().next())
            .collect();
        if letters.chars().count() >= 2 {
            Some(letters)
        } else {
            None
        }
    }
}

/// Strip all whitespace from an already-normalized name.
pub fn ultra_from_normalized(normalized: &str) -> String {
    normalized.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Split a trailing `(...)` or `[...]` group off `s`, returning the trimmed
/// head and the group's inner text.
fn split_trailing_group(s: &str) -> Option<(&str, &str)> {
    let (open, close) = if s.ends_with(')') {
        ('(', ')')
    } else if s.ends_with(']') {
        ('[', ']')
    } else {
        return None;
    };
    let body = &s[..s.len() - close.len_utf8()];
    let start = body.rfind(open)?;
    let inner = &body[start + open.len_utf8()..];
    Some((s[..start].trim_end(), inner))
}

/// Whole-word containment: `needle` occurs in `haystack` bounded by spaces
/// or string ends. Both inputs are normalized (single-spaced).
pub fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack == needle
        || haystack.starts_with(&format!("{} ", needle))
        || haystack.ends_with(&format!(" {}", needle))
        || haystack.contains(&format!(" {} ", needle))
}
