// ABOUTME: FAQ rule loading and first-match-wins resolution for incoming questions
// ABOUTME: Supports regex rules and whole-word keyword rules, checked before the LLM fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # FAQ Matcher
//!
//! An ordered, immutable rule set checked against every incoming question
//! before the LLM fallback. Rules come in two kinds:
//!
//! - **Regex rules**: a case-insensitive pattern tested against the
//!   lower-cased utterance.
//! - **Keyword rules**: the rule fires when any of its keywords occurs in the
//!   utterance as a whole word.
//!
//! Rule order is significant: the first rule that matches wins and iteration
//! stops immediately. There is no scoring or ranking. Matching is pure and
//! never touches network or state.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};

/// On-disk representation of one FAQ rule (`faq.json` entry)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFaqRule {
    /// Regex source tested against the lower-cased utterance
    #[serde(default)]
    question_pattern_source: Option<String>,
    /// Keywords matched as whole words
    #[serde(default)]
    keywords: Option<Vec<String>>,
    /// Canned answer returned on a hit
    answer: String,
    /// Optional supplementary link appended to the answer
    #[serde(default)]
    related_link: Option<String>,
    /// Display text for the supplementary link
    #[serde(default)]
    link_text: Option<String>,
}

/// A compiled FAQ rule
#[derive(Debug)]
struct FaqRule {
    pattern: Option<Regex>,
    keywords: Vec<String>,
    answer: String,
    related_link: Option<String>,
    link_text: Option<String>,
}

/// Result of a successful FAQ lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqMatch {
    /// The canned answer
    pub answer: String,
    /// Supplementary link, present only when both URL and text are configured
    pub related_link: Option<RelatedLink>,
}

/// A supplementary link attached to a FAQ answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedLink {
    pub url: String,
    pub text: String,
}

/// Ordered FAQ rule set with first-match-wins resolution
#[derive(Debug, Default)]
pub struct FaqMatcher {
    rules: Vec<FaqRule>,
}

impl FaqMatcher {
    /// Load and compile rules from a JSON rule file
    ///
    /// Rules with a malformed regex are logged and excluded here, at load
    /// time, so matching itself can never fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("failed to read FAQ file {}: {e}", path.display()))
        })?;
        let matcher = Self::from_json(&data)?;
        info!(
            rules = matcher.rules.len(),
            path = %path.display(),
            "FAQ rules loaded"
        );
        Ok(matcher)
    }

    /// Parse and compile rules from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not parse as a rule list.
    pub fn from_json(data: &str) -> AppResult<Self> {
        let raw: Vec<RawFaqRule> = serde_json::from_str(data)
            .map_err(|e| AppError::config(format!("invalid FAQ rule file: {e}")))?;

        let mut rules = Vec::with_capacity(raw.len());
        for (index, entry) in raw.into_iter().enumerate() {
            let pattern = match entry.question_pattern_source.as_deref() {
                Some(source) => {
                    match RegexBuilder::new(source).case_insensitive(true).build() {
                        Ok(regex) => Some(regex),
                        Err(e) => {
                            warn!(index, pattern = source, error = %e, "excluding FAQ rule with malformed regex");
                            continue;
                        }
                    }
                }
                None => None,
            };

            rules.push(FaqRule {
                pattern,
                keywords: entry
                    .keywords
                    .unwrap_or_default()
                    .into_iter()
                    .map(|k| k.to_lowercase())
                    .collect(),
                answer: entry.answer,
                related_link: entry.related_link,
                link_text: entry.link_text,
            });
        }

        Ok(Self { rules })
    }

    /// Number of loaded rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the first rule matching the utterance
    ///
    /// Regex rules are tested against the lower-cased utterance; keyword
    /// rules fire when any keyword occurs as a whole word. Returns `None`
    /// when no rule matches.
    #[must_use]
    pub fn find(&self, utterance: &str) -> Option<FaqMatch> {
        let lowered = utterance.to_lowercase();

        for rule in &self.rules {
            if let Some(pattern) = &rule.pattern {
                if pattern.is_match(&lowered) {
                    return Some(Self::to_match(rule));
                }
            }

            if rule
                .keywords
                .iter()
                .any(|keyword| contains_whole_word(&lowered, keyword))
            {
                return Some(Self::to_match(rule));
            }
        }

        None
    }

    fn to_match(rule: &FaqRule) -> FaqMatch {
        let related_link = match (&rule.related_link, &rule.link_text) {
            (Some(url), Some(text)) => Some(RelatedLink {
                url: url.clone(),
                text: text.clone(),
            }),
            _ => None,
        };
        FaqMatch {
            answer: rule.answer.clone(),
            related_link,
        }
    }
}

/// Character class used for word-boundary detection
///
/// Japanese text has no spaces, so the usual `\b` is useless there: the regex
/// crate treats a katakana-to-hiragana transition as word-interior, which
/// would stop keyword "ペット" from matching "ペットは同伴できますか". A
/// script-class transition is the boundary instead: "ペットボトル" continues
/// in katakana (no boundary, no match) while "ペットは" switches to hiragana
/// (boundary, match).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    /// Latin/other alphanumerics and underscore
    Word,
    Hiragana,
    Katakana,
    Han,
    /// Whitespace, punctuation, symbols
    Other,
}

fn char_class(c: char) -> CharClass {
    match c {
        '\u{3040}'..='\u{309F}' => CharClass::Hiragana,
        // Includes the prolonged sound mark 'ー', which extends katakana words
        '\u{30A0}'..='\u{30FF}' => CharClass::Katakana,
        '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}' => {
            CharClass::Han
        }
        _ if c.is_alphanumeric() || c == '_' => CharClass::Word,
        _ => CharClass::Other,
    }
}

/// Test whether `keyword` occurs in `haystack` as a whole word
///
/// A word edge exists at the string boundary, before/after a non-word
/// character, or at a script-class transition. Both inputs are expected to be
/// lower-cased already.
fn contains_whole_word(haystack: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }

    let first_class = keyword.chars().next().map(char_class);
    let last_class = keyword.chars().next_back().map(char_class);

    for (start, matched) in haystack.match_indices(keyword) {
        let end = start + matched.len();

        let boundary_before = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|prev| Some(char_class(prev)) != first_class || char_class(prev) == CharClass::Other);
        let boundary_after = haystack[end..]
            .chars()
            .next()
            .is_none_or(|next| Some(char_class(next)) != last_class || char_class(next) == CharClass::Other);

        if boundary_before && boundary_after {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(json: &str) -> FaqMatcher {
        FaqMatcher::from_json(json).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let m = matcher(
            r#"[
                {"keywords": ["予約"], "answer": "first"},
                {"keywords": ["予約", "方法"], "answer": "second"}
            ]"#,
        );
        let hit = m.find("予約の方法を教えて").unwrap();
        assert_eq!(hit.answer, "first");
    }

    #[test]
    fn test_regex_rule_is_case_insensitive() {
        let m = matcher(r#"[{"questionPatternSource": "zil|crea", "answer": "vehicles"}]"#);
        assert!(m.find("ZILについて教えて").is_some());
        assert!(m.find("crea の装備は？").is_some());
        assert!(m.find("料金について").is_none());
    }

    #[test]
    fn test_keyword_whole_word_katakana() {
        let m = matcher(r#"[{"keywords": ["ペット"], "answer": "ペットは同伴可能です"}]"#);
        // Katakana continues: "ペットボトル" must not fire the pet rule
        assert!(m.find("ペットボトルが欲しい").is_none());
        // Script transition to hiragana is a word edge
        let hit = m.find("ペットは同伴できますか").unwrap();
        assert_eq!(hit.answer, "ペットは同伴可能です");
    }

    #[test]
    fn test_keyword_whole_word_ascii() {
        let m = matcher(r#"[{"keywords": ["pet"], "answer": "pets welcome"}]"#);
        assert!(m.find("can I bring a pet?").is_some());
        assert!(m.find("is there a carpet").is_none());
        assert!(m.find("pets allowed?").is_none());
        assert!(m.find("PET").is_some());
    }

    #[test]
    fn test_keyword_at_string_edges() {
        let m = matcher(r#"[{"keywords": ["ペット"], "answer": "ok"}]"#);
        assert!(m.find("ペット").is_some());
        assert!(m.find("ペットー").is_none());
    }

    #[test]
    fn test_malformed_regex_excluded_at_load() {
        let m = matcher(
            r#"[
                {"questionPatternSource": "([unclosed", "answer": "broken"},
                {"keywords": ["予約"], "answer": "booking"}
            ]"#,
        );
        assert_eq!(m.len(), 1);
        assert_eq!(m.find("予約したい").unwrap().answer, "booking");
    }

    #[test]
    fn test_related_link_requires_both_fields() {
        let m = matcher(
            r#"[
                {"keywords": ["料金"], "answer": "a", "relatedLink": "https://example.com/pricing", "linkText": "料金表"},
                {"keywords": ["保険"], "answer": "b", "relatedLink": "https://example.com/terms"}
            ]"#,
        );
        let with_link = m.find("料金を教えて").unwrap();
        assert_eq!(
            with_link.related_link.unwrap().url,
            "https://example.com/pricing"
        );
        let without = m.find("保険について").unwrap();
        assert!(without.related_link.is_none());
    }

    #[test]
    fn test_rules_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"keywords": ["予約"], "answer": "ご予約はオンラインで承ります。"}}]"#
        )
        .unwrap();

        let m = FaqMatcher::from_file(file.path()).unwrap();
        assert_eq!(m.len(), 1);
        assert!(m.find("予約できますか").is_some());
    }

    #[test]
    fn test_no_match_returns_none() {
        let m = matcher(r#"[{"keywords": ["予約"], "answer": "booking"}]"#);
        assert!(m.find("xyzzy").is_none());
    }

    #[test]
    fn test_rule_with_pattern_and_keywords() {
        let m = matcher(
            r#"[{"questionPatternSource": "チェックイン", "keywords": ["check-in"], "answer": "15時からです"}]"#,
        );
        assert!(m.find("チェックインは何時？").is_some());
        assert!(m.find("what time is check-in?").is_some());
    }
}
