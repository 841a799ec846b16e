// File: src/core/memory.rs
//! An in-process engine backend for dry runs and tests.
//!
//! It stores tokens, enforces duplicate rules, builds consonant-vowel
//! combinations and keeps learned words. Lookups are exact; there is no
//! segmentation of longer input.

use crate::config::EngineOption;
use crate::core::engine::{
    EngineArray, EngineBackend, LearnStatus, Status, TOKEN_BUFFERED, VARNAM_ERROR,
    VARNAM_INVALID_CONFIG, VARNAM_MISUSE, VARNAM_STORAGE_ERROR, VARNAM_SUCCESS,
};
use crate::core::types::{MatchType, RawToken, SchemeDetails, TokenType, Word};
use crate::persistence::{load_from_disk, save_to_disk, LearnedWords, SchemeSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine-owned result array.
#[derive(Debug, Clone)]
pub struct MemoryArray<T>(Vec<T>);

impl<T: Clone> EngineArray for MemoryArray<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.0.get(index).cloned()
    }
}

pub struct MemoryEngine {
    scheme_file: PathBuf,
    snapshot: SchemeSnapshot,
    next_id: i32,
    /// Changes not yet written to `scheme_file`.
    dirty: bool,
    use_dead_consonants: bool,
    ignore_duplicates: bool,
    suggestions: Option<(PathBuf, LearnedWords)>,
    last_error: String,
}

impl MemoryEngine {
    pub fn details(&self) -> &SchemeDetails {
        &self.snapshot.details
    }

    pub fn token_count(&self) -> usize {
        self.snapshot.tokens.len()
    }

    pub fn has_unflushed_changes(&self) -> bool {
        self.dirty
    }

    pub fn uses_dead_consonants(&self) -> bool {
        self.use_dead_consonants
    }

    /// How often `word` was learned, if suggestions are enabled.
    pub fn learned_confidence(&self, word: &str) -> Option<u32> {
        let (_, learned) = self.suggestions.as_ref()?;
        learned.words.get(word).copied()
    }

    fn fail(&mut self, status: Status, message: impl Into<String>) -> Status {
        self.last_error = message.into();
        status
    }

    fn succeed(&mut self) -> Status {
        self.last_error.clear();
        VARNAM_SUCCESS
    }

    fn find(&self, pattern: &str, tag: &str) -> Option<&RawToken> {
        self.snapshot
            .tokens
            .iter()
            .find(|t| t.pattern == pattern && t.tag == tag)
    }

    fn push(&mut self, mut token: RawToken) {
        token.id = self.next_id;
        self.next_id += 1;
        self.snapshot.tokens.push(token);
        self.dirty = true;
    }

    fn persist(&mut self) -> Status {
        if let Err(e) = save_to_disk(&self.snapshot, &self.scheme_file) {
            return self.fail(
                VARNAM_STORAGE_ERROR,
                format!("Failed to write '{}': {}", self.scheme_file.display(), e),
            );
        }
        if let Some((path, learned)) = &self.suggestions {
            if let Err(e) = save_to_disk(learned, path) {
                let message = format!("Failed to write '{}': {}", path.display(), e);
                return self.fail(VARNAM_STORAGE_ERROR, message);
            }
        }
        self.dirty = false;
        self.succeed()
    }

    fn confidence(&self, text: &str) -> u32 {
        self.learned_confidence(text).unwrap_or(0)
    }
}

fn parent_exists(path: &Path) -> bool {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
        _ => true,
    }
}

/// "ka" carries an inherent "a" that a following vowel sign replaces.
fn consonant_stem(pattern: &str) -> &str {
    match pattern.strip_suffix('a') {
        Some(stem) if !stem.is_empty() => stem,
        _ => pattern,
    }
}

fn join(base: &str, sign: &str) -> String {
    if base.is_empty() {
        String::new()
    } else {
        format!("{}{}", base, sign)
    }
}

impl EngineBackend for MemoryEngine {
    type TokenArray = MemoryArray<RawToken>;
    type WordArray = MemoryArray<Word>;

    fn init(scheme_file: &Path) -> Result<Self, String> {
        let snapshot = if scheme_file.exists() {
            load_from_disk::<SchemeSnapshot>(scheme_file)
                .map_err(|e| format!("Failed to load '{}': {}", scheme_file.display(), e))?
        } else if parent_exists(scheme_file) {
            SchemeSnapshot::default()
        } else {
            return Err(format!(
                "Directory of '{}' does not exist",
                scheme_file.display()
            ));
        };
        let next_id = snapshot.tokens.iter().map(|t| t.id).max().unwrap_or(0) + 1;

        Ok(Self {
            scheme_file: scheme_file.to_path_buf(),
            snapshot,
            next_id,
            dirty: false,
            use_dead_consonants: false,
            ignore_duplicates: false,
            suggestions: None,
            last_error: String::new(),
        })
    }

    fn set_scheme_details(&mut self, details: &SchemeDetails) -> Status {
        let code = &details.lang_code;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return self.fail(
                VARNAM_MISUSE,
                format!("Language code '{}' should be a two letter ISO 639-1 code", code),
            );
        }
        if details.identifier.is_empty() {
            return self.fail(VARNAM_MISUSE, "Scheme identifier cannot be empty");
        }
        self.snapshot.details = details.clone();
        self.dirty = true;
        self.succeed()
    }

    fn create_token(
        &mut self,
        pattern: &str,
        value1: &str,
        value2: &str,
        value3: &str,
        tag: &str,
        token_type: i32,
        match_type: i32,
        flags: i32,
    ) -> Status {
        if pattern.is_empty() || value1.is_empty() {
            return self.fail(VARNAM_MISUSE, "Pattern and value1 are required");
        }
        if TokenType::from_code(token_type).is_err() || MatchType::from_code(match_type).is_err() {
            return self.fail(
                VARNAM_MISUSE,
                format!("Invalid token type {} or match type {}", token_type, match_type),
            );
        }
        if self.find(pattern, tag).is_some() {
            if self.ignore_duplicates {
                return self.succeed();
            }
            return self.fail(
                VARNAM_ERROR,
                format!("Token '{}' with tag '{}' already exists", pattern, tag),
            );
        }

        self.push(RawToken {
            id: 0,
            token_type,
            match_type,
            tag: tag.to_string(),
            pattern: pattern.to_string(),
            value1: value1.to_string(),
            value2: value2.to_string(),
            value3: value3.to_string(),
        });

        if flags & TOKEN_BUFFERED == 0 {
            return self.persist();
        }
        self.succeed()
    }

    fn generate_cv_combinations(&mut self) -> Status {
        let consonant = TokenType::Consonant.code();
        let vowel = TokenType::Vowel.code();
        let possibility = MatchType::Possibility.code();

        let mut generated = Vec::new();
        for c in self.snapshot.tokens.iter().filter(|t| t.token_type == consonant) {
            for v in self.snapshot.tokens.iter().filter(|t| t.token_type == vowel) {
                // A vowel with no sign form (the inherent "a") cannot combine.
                if v.value2.is_empty() || v.tag != c.tag {
                    continue;
                }
                let match_type = if c.match_type == possibility || v.match_type == possibility {
                    possibility
                } else {
                    MatchType::Exact.code()
                };
                generated.push(RawToken {
                    id: 0,
                    token_type: TokenType::ConsonantVowel.code(),
                    match_type,
                    tag: c.tag.clone(),
                    pattern: format!("{}{}", consonant_stem(&c.pattern), v.pattern),
                    value1: join(&c.value1, &v.value2),
                    value2: join(&c.value2, &v.value2),
                    value3: join(&c.value3, &v.value2),
                });
            }
        }

        for token in generated {
            if self.find(&token.pattern, &token.tag).is_none() {
                self.push(token);
            }
        }
        self.succeed()
    }

    fn config(&mut self, option: &EngineOption) -> Status {
        match option {
            EngineOption::UseDeadConsonants(on) => self.use_dead_consonants = *on,
            EngineOption::IgnoreDuplicateToken(on) => self.ignore_duplicates = *on,
            EngineOption::EnableSuggestions(path) => {
                let learned = if path.exists() {
                    match load_from_disk::<LearnedWords>(path) {
                        Ok(learned) => learned,
                        Err(e) => {
                            return self.fail(
                                VARNAM_INVALID_CONFIG,
                                format!("Cannot open suggestions '{}': {}", path.display(), e),
                            )
                        }
                    }
                } else if parent_exists(path) {
                    LearnedWords::default()
                } else {
                    return self.fail(
                        VARNAM_INVALID_CONFIG,
                        format!("Directory of '{}' does not exist", path.display()),
                    );
                };
                self.suggestions = Some((path.clone(), learned));
            }
        }
        self.succeed()
    }

    fn flush_buffer(&mut self) -> Status {
        self.persist()
    }

    fn get_all_tokens(&mut self, token_type: i32, out: &mut Option<Self::TokenArray>) -> Status {
        if TokenType::from_code(token_type).is_err() {
            return self.fail(VARNAM_MISUSE, format!("Invalid token type {}", token_type));
        }
        let tokens = self
            .snapshot
            .tokens
            .iter()
            .filter(|t| t.token_type == token_type)
            .cloned()
            .collect();
        *out = Some(MemoryArray(tokens));
        self.succeed()
    }

    /// Exact pattern lookup. Values come back in declaration order with their
    /// learned confidence attached; nothing is ranked.
    fn transliterate(&mut self, input: &str, out: &mut Option<Self::WordArray>) -> Status {
        let mut words: Vec<Word> = Vec::new();
        for token in self.snapshot.tokens.iter().filter(|t| t.pattern == input) {
            for value in [&token.value1, &token.value2, &token.value3] {
                if !value.is_empty() && !words.iter().any(|w| w.text() == value.as_str()) {
                    words.push(Word::new(value.as_str(), self.confidence(value)));
                }
            }
        }
        *out = Some(MemoryArray(words));
        self.succeed()
    }

    fn reverse_transliterate(&mut self, input: &str, out: &mut String) -> Status {
        let found = self
            .snapshot
            .tokens
            .iter()
            .find(|t| t.value1 == input || t.value2 == input || t.value3 == input)
            .map(|t| t.pattern.clone());
        match found {
            Some(pattern) => {
                *out = pattern;
                self.succeed()
            }
            None => self.fail(
                VARNAM_ERROR,
                format!("Cannot reverse transliterate '{}'", input),
            ),
        }
    }

    fn learn(&mut self, word: &str) -> Status {
        let word = word.trim();
        if word.is_empty() {
            return self.fail(VARNAM_MISUSE, "Nothing to learn");
        }
        if word.chars().any(char::is_whitespace) {
            return self.fail(
                VARNAM_ERROR,
                format!("Cannot learn '{}': a word cannot contain whitespace", word),
            );
        }
        match self.suggestions.as_mut() {
            Some((_, learned)) => {
                *learned.words.entry(word.to_string()).or_insert(0) += 1;
                self.dirty = true;
                self.succeed()
            }
            None => self.fail(
                VARNAM_ERROR,
                "Suggestions are not enabled. Set ENABLE_SUGGESTIONS before learning",
            ),
        }
    }

    fn learn_from_file(
        &mut self,
        path: &Path,
        status: &mut LearnStatus,
        on_word: &mut dyn FnMut(&str, Status),
    ) -> Status {
        if self.suggestions.is_none() {
            return self.fail(
                VARNAM_ERROR,
                "Suggestions are not enabled. Set ENABLE_SUGGESTIONS before learning",
            );
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                return self.fail(
                    VARNAM_ERROR,
                    format!("Couldn't open '{}': {}", path.display(), e),
                )
            }
        };

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            status.total_words += 1;
            let rc = self.learn(line);
            if rc != VARNAM_SUCCESS {
                status.failed += 1;
            }
            on_word(line, rc);
        }
        self.succeed()
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }
}
