//! Hotword compilation and per-decode biasing state.
//!
//! Hotwords are phrases the search should favor. A raw hotwords string holds
//! one or more phrases separated by `/` (e.g. "I LOVE YOU/HELLO WORLD"); each
//! phrase is compiled to a token-id sequence and shares one boost score. At
//! decode time a [`PhraseMatcher`] tracks which phrases are in progress and
//! which token IDs should receive the boost at the next frame.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{RecognizerError, Result};
use crate::vocab::SymbolTable;

/// Compiled biasing context for one stream. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct HotwordContext {
    /// One token-id sequence per phrase.
    pub phrases: Vec<Vec<i32>>,
    /// Additive log-space boost shared by all phrases.
    pub score: f32,
}

impl HotwordContext {
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// Compile a raw hotwords string into a biasing context.
///
/// Phrases are separated by `/`. With `tokenize` set, each phrase is run
/// through the vocabulary tokenizer; otherwise the phrase must already be
/// space-separated symbol-table entries (e.g. "▁I ▁LOVE ▁YOU") and each entry
/// is mapped by exact lookup, failing with `UnknownToken` on a miss.
///
/// Empty or whitespace-only input yields an empty context, not an error.
pub fn compile_hotwords(
    raw: &str,
    tokenize: bool,
    symbols: &SymbolTable,
    score: f32,
) -> Result<HotwordContext> {
    let mut phrases = Vec::new();

    for phrase in raw.split('/') {
        if let Some(ids) = compile_phrase(phrase, tokenize, symbols)? {
            phrases.push(ids);
        }
    }

    if !phrases.is_empty() {
        log::debug!("Compiled {} hotword phrases (score {})", phrases.len(), score);
    }
    Ok(HotwordContext { phrases, score })
}

/// Load hotwords from a file: one phrase per line, `#` comments and blank
/// lines skipped. Each line is one phrase; `/` has no special meaning here.
pub fn load_hotwords_file(
    path: &Path,
    tokenize: bool,
    symbols: &SymbolTable,
    score: f32,
) -> Result<HotwordContext> {
    let contents = fs::read_to_string(path)?;
    let mut phrases = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(ids) = compile_phrase(line, tokenize, symbols)? {
            phrases.push(ids);
        }
    }

    log::info!("Loaded {} hotword phrases from {:?}", phrases.len(), path);
    Ok(HotwordContext { phrases, score })
}

/// Compile one phrase to token IDs; `None` for empty/whitespace-only input.
fn compile_phrase(
    phrase: &str,
    tokenize: bool,
    symbols: &SymbolTable,
) -> Result<Option<Vec<i32>>> {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return Ok(None);
    }

    let ids = if tokenize {
        symbols.tokenize(phrase).ok_or_else(|| {
            RecognizerError::InvalidInput(format!(
                "hotword phrase '{}' cannot be tokenized with this vocabulary",
                phrase
            ))
        })?
    } else {
        phrase
            .split_whitespace()
            .map(|tok| {
                symbols.id(tok).ok_or(RecognizerError::UnknownToken {
                    token: tok.to_string(),
                })
            })
            .collect::<Result<Vec<i32>>>()?
    };

    Ok((!ids.is_empty()).then_some(ids))
}

/// Tracks phrase-prefix matches over the emitted token history of one stream.
///
/// Created fresh for every decode call; never shared across streams. A phrase
/// prefix is "active" when its tokens are a suffix of the emission history;
/// the next token of every active prefix, plus the first token of every
/// phrase, is boosted at the upcoming argmax.
pub(crate) struct PhraseMatcher<'a> {
    context: &'a HotwordContext,
    /// (phrase index, number of tokens already matched), matched count >= 1.
    active: Vec<(usize, usize)>,
}

impl<'a> PhraseMatcher<'a> {
    pub(crate) fn new(context: &'a HotwordContext) -> Self {
        Self {
            context,
            active: Vec::new(),
        }
    }

    /// Token IDs to boost before the next emission.
    pub(crate) fn boosted(&self) -> HashSet<i32> {
        let mut set = HashSet::new();
        for phrase in &self.context.phrases {
            if let Some(&first) = phrase.first() {
                set.insert(first);
            }
        }
        for &(idx, matched) in &self.active {
            set.insert(self.context.phrases[idx][matched]);
        }
        set
    }

    /// Advance the matcher after a (non-blank, collapsed) token emission.
    pub(crate) fn advance(&mut self, token: i32) {
        let mut next = Vec::new();

        for &(idx, matched) in &self.active {
            let phrase = &self.context.phrases[idx];
            if phrase[matched] == token && matched + 1 < phrase.len() {
                next.push((idx, matched + 1));
            }
        }
        for (idx, phrase) in self.context.phrases.iter().enumerate() {
            if phrase.first() == Some(&token)
                && phrase.len() > 1
                && !next.contains(&(idx, 1))
            {
                next.push((idx, 1));
            }
        }

        self.active = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::from_pairs(
            [
                ("<blk>", 0),
                ("\u{2581}I", 1),
                ("\u{2581}LOVE", 2),
                ("\u{2581}YOU", 3),
                ("\u{2581}HE", 4),
                ("LL", 5),
                ("O", 6),
                ("\u{2581}WORLD", 7),
            ]
            .map(|(s, i)| (s.to_string(), i)),
        )
    }

    #[test]
    fn test_compile_tokenized_phrases() {
        let ctx = compile_hotwords("I LOVE YOU/HELLO WORLD", true, &table(), 1.5).unwrap();
        assert_eq!(ctx.phrases, vec![vec![1, 2, 3], vec![4, 5, 6, 7]]);
        assert_eq!(ctx.score, 1.5);
    }

    #[test]
    fn test_compile_pretokenized_phrases() {
        let raw = "\u{2581}I \u{2581}LOVE \u{2581}YOU/\u{2581}HE LL O \u{2581}WORLD";
        let ctx = compile_hotwords(raw, false, &table(), 2.0).unwrap();
        assert_eq!(ctx.phrases, vec![vec![1, 2, 3], vec![4, 5, 6, 7]]);
    }

    #[test]
    fn test_compile_unknown_pretokenized_token() {
        let err = compile_hotwords("\u{2581}I \u{2581}HATE", false, &table(), 1.5).unwrap_err();
        match err {
            RecognizerError::UnknownToken { token } => assert_eq!(token, "\u{2581}HATE"),
            other => panic!("expected UnknownToken, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_empty_input_yields_empty_context() {
        assert!(compile_hotwords("", true, &table(), 1.5).unwrap().is_empty());
        assert!(compile_hotwords("   ", true, &table(), 1.5).unwrap().is_empty());
        assert!(compile_hotwords("//", true, &table(), 1.5).unwrap().is_empty());
    }

    #[test]
    fn test_load_hotwords_file_skips_comments() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# biasing phrases").unwrap();
        writeln!(file, "I LOVE YOU").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "HELLO WORLD").unwrap();

        let ctx = load_hotwords_file(file.path(), true, &table(), 1.5).unwrap();
        assert_eq!(ctx.phrases.len(), 2);
    }

    #[test]
    fn test_file_line_with_slash_stays_one_phrase() {
        use std::io::Write;
        let symbols = SymbolTable::from_pairs(
            [("<blk>", 0), ("\u{2581}TCP/IP", 1), ("\u{2581}I", 2)]
                .map(|(s, i)| (s.to_string(), i)),
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\u{2581}TCP/IP").unwrap();
        writeln!(file, "\u{2581}I").unwrap();

        let ctx = load_hotwords_file(file.path(), false, &symbols, 1.5).unwrap();
        assert_eq!(ctx.phrases, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_matcher_boosts_starts_and_continuations() {
        let ctx = compile_hotwords("I LOVE YOU/HELLO WORLD", true, &table(), 1.5).unwrap();
        let mut matcher = PhraseMatcher::new(&ctx);

        // Initially only phrase starts are boosted.
        let boosted = matcher.boosted();
        assert!(boosted.contains(&1) && boosted.contains(&4));
        assert!(!boosted.contains(&2));

        // After ▁I the continuation ▁LOVE joins the starts.
        matcher.advance(1);
        let boosted = matcher.boosted();
        assert!(boosted.contains(&2));
        assert!(boosted.contains(&1) && boosted.contains(&4));

        // An off-phrase token resets the prefix.
        matcher.advance(7);
        assert!(!matcher.boosted().contains(&2));
    }

    #[test]
    fn test_matcher_completed_phrase_drops_out() {
        let ctx = compile_hotwords("I LOVE YOU", true, &table(), 1.5).unwrap();
        let mut matcher = PhraseMatcher::new(&ctx);
        matcher.advance(1);
        matcher.advance(2);
        assert!(matcher.boosted().contains(&3));
        matcher.advance(3);
        // Phrase complete; only the start remains boosted.
        let boosted = matcher.boosted();
        assert_eq!(boosted.len(), 1);
        assert!(boosted.contains(&1));
    }
}
