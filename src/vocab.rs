//! Symbol table for sentencepiece-style token vocabularies.
//!
//! Loads the `tokens.txt` shipped with CTC models (one `symbol id` pair per
//! line) and provides id/symbol lookups, text assembly from decoded token IDs,
//! and a deterministic greedy tokenizer used for hotword compilation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Bidirectional token-id / symbol mapping.
pub struct SymbolTable {
    id_to_sym: HashMap<i32, String>,
    sym_to_id: HashMap<String, i32>,
}

impl SymbolTable {
    /// Load from a `tokens.txt` file.
    ///
    /// Format: "symbol id", whitespace separated; the symbol itself may
    /// contain spaces, so the id is split off from the right.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        let mut pairs = Vec::new();

        for line in contents.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.rsplitn(2, |c: char| c.is_whitespace()).collect();
            if parts.len() != 2 {
                continue;
            }

            if let Ok(id) = parts[0].parse::<i32>() {
                pairs.push((parts[1].to_string(), id));
            }
        }

        log::info!("Loaded {} symbols from {:?}", pairs.len(), path);
        Ok(Self::from_pairs(pairs))
    }

    /// Build from in-memory (symbol, id) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, i32)>) -> Self {
        let mut id_to_sym = HashMap::new();
        let mut sym_to_id = HashMap::new();
        for (sym, id) in pairs {
            id_to_sym.insert(id, sym.clone());
            sym_to_id.insert(sym, id);
        }
        Self { id_to_sym, sym_to_id }
    }

    pub fn symbol(&self, id: i32) -> Option<&str> {
        self.id_to_sym.get(&id).map(|s| s.as_str())
    }

    pub fn id(&self, symbol: &str) -> Option<i32> {
        self.sym_to_id.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.id_to_sym.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_sym.is_empty()
    }

    /// Assemble decoded token IDs into text.
    ///
    /// Sentencepiece conventions: `▁` marks a word boundary and becomes a
    /// space, `<...>` special symbols are skipped, the result is trimmed.
    pub fn decode_text(&self, token_ids: &[i32]) -> String {
        let mut text = String::new();

        for &id in token_ids {
            let Some(sym) = self.symbol(id) else {
                continue;
            };
            if sym.starts_with('<') && sym.ends_with('>') {
                continue;
            }
            text.push_str(&sym.replace('\u{2581}', " "));
        }

        text.trim().to_string()
    }

    /// Tokenize natural-language text against this vocabulary.
    ///
    /// Greedy longest-match: each whitespace-separated word is prefixed with
    /// the `▁` boundary marker and consumed by repeatedly taking the longest
    /// vocabulary entry that prefixes the remainder. When no entry matches and
    /// the remainder still carries the `▁` marker, the marker is dropped and
    /// matching continues (vocabularies for CJK scripts list bare characters
    /// without the marker). Returns `None` if some span cannot be covered.
    pub fn tokenize(&self, text: &str) -> Option<Vec<i32>> {
        let mut ids = Vec::new();

        for word in text.split_whitespace() {
            let piece = format!("\u{2581}{}", word);
            let mut rest = piece.as_str();

            while !rest.is_empty() {
                match self.longest_prefix(rest) {
                    Some((id, len)) => {
                        ids.push(id);
                        rest = &rest[len..];
                    }
                    None if rest.starts_with('\u{2581}') => {
                        rest = &rest['\u{2581}'.len_utf8()..];
                    }
                    None => return None,
                }
            }
        }

        Some(ids)
    }

    /// Longest vocabulary entry that prefixes `s`, as (id, byte length).
    fn longest_prefix(&self, s: &str) -> Option<(i32, usize)> {
        let mut end = s.len();
        loop {
            if s.is_char_boundary(end) && end > 0 {
                if let Some(id) = self.id(&s[..end]) {
                    return Some((id, end));
                }
            }
            if end == 0 {
                return None;
            }
            end -= 1;
        }
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
                ("你", 8),
                ("好", 9),
            ]
            .map(|(s, i)| (s.to_string(), i)),
        )
    }

    #[test]
    fn test_lookups() {
        let t = table();
        assert_eq!(t.symbol(2), Some("\u{2581}LOVE"));
        assert_eq!(t.id("\u{2581}LOVE"), Some(2));
        assert_eq!(t.symbol(99), None);
        assert_eq!(t.len(), 10);
    }

    #[test]
    fn test_decode_text_joins_and_skips_specials() {
        let t = table();
        assert_eq!(t.decode_text(&[1, 2, 3]), "I LOVE YOU");
        // Specials dropped, leading boundary trimmed
        assert_eq!(t.decode_text(&[0, 4, 5, 6]), "HELLO");
        // Unknown ids skipped
        assert_eq!(t.decode_text(&[1, 42]), "I");
    }

    #[test]
    fn test_tokenize_longest_match() {
        let t = table();
        assert_eq!(t.tokenize("I LOVE YOU"), Some(vec![1, 2, 3]));
        // HELLO splits into ▁HE LL O
        assert_eq!(t.tokenize("HELLO WORLD"), Some(vec![4, 5, 6, 7]));
    }

    #[test]
    fn test_tokenize_cjk_drops_boundary_marker() {
        let t = table();
        assert_eq!(t.tokenize("你好"), Some(vec![8, 9]));
    }

    #[test]
    fn test_tokenize_uncoverable_text() {
        let t = table();
        assert_eq!(t.tokenize("XYZZY"), None);
    }

    #[test]
    fn test_load_parses_symbol_id_lines() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "<blk> 0").unwrap();
        writeln!(file, "\u{2581}HELLO 1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "garbage-line").unwrap();

        let t = SymbolTable::load(file.path()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.id("\u{2581}HELLO"), Some(1));
    }
}
