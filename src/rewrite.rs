//! Post-decode text rewriting.
//!
//! Decoded text can be passed through an ordered chain of rewrite rules
//! (number normalization, abbreviation expansion, and the like). Rules come
//! from two kinds of files, both applied left to right in config order:
//!
//! - a rule file (`rule_fsts` entry): one `pattern<TAB>replacement` per line,
//!   `#` comments and blank lines skipped;
//! - a rule archive (`rule_fars` entry): the same line format grouped under
//!   `[name]` section headers, sections applied in file order.
//!
//! Patterns are regular expressions; a rule that matches nothing leaves the
//! text unchanged. Malformed files fail at load time, never at decode time.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{RecognizerError, Result};

/// One compiled rewrite rule.
#[derive(Debug)]
struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement.as_str()).into_owned()
    }
}

/// Ordered rewrite chain. Immutable after loading; the empty chain is the
/// identity transformation.
#[derive(Debug, Default)]
pub struct RuleChain {
    rules: Vec<RewriteRule>,
}

impl RuleChain {
    /// Load all rule files then all rule archives, preserving order.
    pub fn load(rule_fsts: &[PathBuf], rule_fars: &[PathBuf]) -> Result<Self> {
        let mut rules = Vec::new();

        for path in rule_fsts {
            Self::load_rule_file(path, &mut rules)?;
        }
        for path in rule_fars {
            Self::load_rule_archive(path, &mut rules)?;
        }

        if !rules.is_empty() {
            log::info!(
                "Loaded {} rewrite rules from {} files",
                rules.len(),
                rule_fsts.len() + rule_fars.len()
            );
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Apply every rule in order; the overall transformation is the
    /// composition of the rules in load order.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            out = rule.apply(&out);
        }
        out
    }

    fn load_rule_file(path: &Path, rules: &mut Vec<RewriteRule>) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            rules.push(Self::parse_rule(path, line_no + 1, line)?);
        }
        Ok(())
    }

    fn load_rule_archive(path: &Path, rules: &mut Vec<RewriteRule>) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let mut in_section = false;

        for (line_no, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                in_section = true;
                continue;
            }
            if !in_section {
                return Err(RecognizerError::RuleLoad {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    reason: "rule outside any [section] in archive".to_string(),
                });
            }
            rules.push(Self::parse_rule(path, line_no + 1, line)?);
        }
        Ok(())
    }

    fn parse_rule(path: &Path, line_no: usize, line: &str) -> Result<RewriteRule> {
        let (pattern, replacement) =
            line.split_once('\t')
                .ok_or_else(|| RecognizerError::RuleLoad {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: "expected 'pattern<TAB>replacement'".to_string(),
                })?;

        let pattern = Regex::new(pattern).map_err(|e| RecognizerError::RuleLoad {
            path: path.to_path_buf(),
            line: line_no,
            reason: e.to_string(),
        })?;

        Ok(RewriteRule {
            pattern,
            replacement: replacement.to_string(),
        })
    }
}
