// File: src/core/engine.rs
use crate::config::EngineOption;
use crate::core::types::{RawToken, SchemeDetails, Token, TokenType, Word};
use crate::error::{EngineError, EngineResult};
use crate::logging::EventLog;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Status code returned by every engine call.
pub type Status = i32;

pub const VARNAM_SUCCESS: Status = 0;
pub const VARNAM_MISUSE: Status = 1;
pub const VARNAM_MEMORY_ERROR: Status = 2;
pub const VARNAM_ERROR: Status = 3;
pub const VARNAM_STORAGE_ERROR: Status = 5;
pub const VARNAM_INVALID_CONFIG: Status = 6;

/// `create_token` flag: keep the token in the engine's write buffer until
/// `flush_buffer` is called.
pub const TOKEN_BUFFERED: i32 = 1;

/// An array owned by the engine. Its length is read first, then elements are
/// fetched by index.
pub trait EngineArray {
    type Item;

    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters filled in by `learn_from_file`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearnStatus {
    pub total_words: usize,
    pub failed: usize,
}

impl LearnStatus {
    pub fn learned(&self) -> usize {
        self.total_words.saturating_sub(self.failed)
    }
}

/// The raw transliteration engine contract.
///
/// Calls return a status code; `last_error` describes the most recent failure
/// and is only meaningful until the next call.
pub trait EngineBackend: Sized {
    type TokenArray: EngineArray<Item = RawToken>;
    type WordArray: EngineArray<Item = Word>;

    /// Opens (or creates) the scheme file.
    fn init(scheme_file: &Path) -> Result<Self, String>;

    fn set_scheme_details(&mut self, details: &SchemeDetails) -> Status;

    #[allow(clippy::too_many_arguments)]
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
    ) -> Status;

    fn generate_cv_combinations(&mut self) -> Status;

    fn config(&mut self, option: &EngineOption) -> Status;

    fn flush_buffer(&mut self) -> Status;

    fn get_all_tokens(&mut self, token_type: i32, out: &mut Option<Self::TokenArray>) -> Status;

    fn transliterate(&mut self, input: &str, out: &mut Option<Self::WordArray>) -> Status;

    fn reverse_transliterate(&mut self, input: &str, out: &mut String) -> Status;

    fn learn(&mut self, word: &str) -> Status;

    /// Learns every word in `path`, calling `on_word` once per word with its
    /// status. A bad word does not stop the batch.
    fn learn_from_file(
        &mut self,
        path: &Path,
        status: &mut LearnStatus,
        on_word: &mut dyn FnMut(&str, Status),
    ) -> Status;

    fn last_error(&self) -> String;
}

/// Typed access to an engine handle.
///
/// Every wrapper turns a non-zero status into [`EngineError::Rejected`],
/// reading the engine's last error inside the same call.
pub struct SchemeEngine<B: EngineBackend> {
    handle: Option<B>,
    scheme_file: Option<PathBuf>,
    log: EventLog,
}

impl<B: EngineBackend> SchemeEngine<B> {
    /// A facade with no handle. Every operation fails with
    /// [`EngineError::NotInitialized`] until [`SchemeEngine::open`] succeeds.
    pub fn uninitialized() -> Self {
        Self {
            handle: None,
            scheme_file: None,
            log: EventLog::disabled(),
        }
    }

    pub fn init(scheme_file: impl AsRef<Path>) -> EngineResult<Self> {
        let mut engine = Self::uninitialized();
        engine.open(scheme_file)?;
        Ok(engine)
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Acquires the handle. Failure is fatal for the compilation.
    pub fn open(&mut self, scheme_file: impl AsRef<Path>) -> EngineResult<()> {
        let path = scheme_file.as_ref();
        self.log.record(format!("-> init {}", path.display()));
        let handle = B::init(path).map_err(|message| EngineError::FatalIo {
            path: path.to_path_buf(),
            message,
        })?;
        self.handle = Some(handle);
        self.scheme_file = Some(path.to_path_buf());
        Ok(())
    }

    /// Releases the handle. Dropping the facade does the same.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            self.log.record("-> close");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn scheme_file(&self) -> Option<&Path> {
        self.scheme_file.as_deref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.handle.as_ref()
    }

    fn handle(&mut self) -> EngineResult<&mut B> {
        self.handle.as_mut().ok_or(EngineError::NotInitialized)
    }

    fn call(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut B) -> Status,
    ) -> EngineResult<()> {
        self.log.record(format!("-> {}", operation));
        let handle = self.handle()?;
        let status = f(&mut *handle);
        check(handle, operation, status)
    }

    pub fn set_scheme_details(&mut self, details: &SchemeDetails) -> EngineResult<()> {
        self.call("set_scheme_details", |h| h.set_scheme_details(details))
    }

    pub fn create_token(&mut self, token: &Token) -> EngineResult<()> {
        self.log.record(format!("   token {}", token.key()));
        self.call("create_token", |h| {
            h.create_token(
                token.pattern.as_str(),
                token.value1.as_str(),
                token.value2_str(),
                token.value3_str(),
                token.tag_str(),
                token.token_type.code(),
                token.match_type.code(),
                TOKEN_BUFFERED,
            )
        })
    }

    /// Asks the engine to build consonant-vowel tokens. No retry, no dedupe.
    pub fn generate_combinations(&mut self) -> EngineResult<()> {
        self.call("generate_cv_combinations", |h| h.generate_cv_combinations())
    }

    pub fn configure(&mut self, option: EngineOption) -> EngineResult<()> {
        self.log.record(format!("   option {}", option.name()));
        self.call("config", |h| h.config(&option))
    }

    pub fn flush(&mut self) -> EngineResult<()> {
        self.call("flush_buffer", |h| h.flush_buffer())
    }

    /// Streams all tokens of one type. The query borrows the facade, so no other
    /// engine call can invalidate the array while it is read; each element is
    /// copied into an owned [`Token`].
    pub fn query_tokens(&mut self, token_type: TokenType) -> EngineResult<TokenQuery<'_, B>> {
        let mut out = None;
        self.call("get_all_tokens", |h| h.get_all_tokens(token_type.code(), &mut out))?;
        let array = out.ok_or_else(|| {
            EngineError::rejected("get_all_tokens", VARNAM_ERROR, "engine returned no array")
        })?;
        let len = array.len();
        Ok(TokenQuery {
            array,
            len,
            index: 0,
            _engine: PhantomData,
        })
    }

    pub fn transliterate(&mut self, input: &str) -> EngineResult<Vec<Word>> {
        let mut out = None;
        self.call("transliterate", |h| h.transliterate(input, &mut out))?;
        let Some(words) = out else {
            return Ok(Vec::new());
        };
        let len = words.len();
        (0..len)
            .map(|i| {
                words
                    .get(i)
                    .ok_or_else(|| missing_element("transliterate", i, len))
            })
            .collect()
    }

    pub fn reverse_transliterate(&mut self, input: &str) -> EngineResult<String> {
        let mut out = String::new();
        self.call("reverse_transliterate", |h| h.reverse_transliterate(input, &mut out))?;
        Ok(out)
    }

    pub fn learn(&mut self, word: &str) -> EngineResult<()> {
        self.call("learn", |h| h.learn(word))
    }

    pub fn learn_from_file(
        &mut self,
        path: &Path,
        on_word: &mut dyn FnMut(&str, Status),
    ) -> EngineResult<LearnStatus> {
        let mut status = LearnStatus::default();
        self.call("learn_from_file", |h| h.learn_from_file(path, &mut status, on_word))?;
        Ok(status)
    }
}

impl<B: EngineBackend> Drop for SchemeEngine<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn missing_element(operation: &'static str, index: usize, len: usize) -> EngineError {
    EngineError::rejected(
        operation,
        VARNAM_ERROR,
        format!("array of length {} has no element at {}", len, index),
    )
}

fn check<B: EngineBackend>(handle: &B, operation: &'static str, status: Status) -> EngineResult<()> {
    if status == VARNAM_SUCCESS {
        Ok(())
    } else {
        Err(EngineError::rejected(operation, status, handle.last_error()))
    }
}

/// Finite, single-pass sequence of tokens read out of an engine array.
pub struct TokenQuery<'e, B: EngineBackend> {
    array: B::TokenArray,
    len: usize,
    index: usize,
    _engine: PhantomData<&'e mut B>,
}

impl<B: EngineBackend> Iterator for TokenQuery<'_, B> {
    type Item = EngineResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let index = self.index;
        match self.array.get(index) {
            Some(raw) => {
                self.index += 1;
                Some(Token::try_from(raw).map_err(EngineError::from))
            }
            None => {
                // the rest of the array cannot be trusted
                self.index = self.len;
                Some(Err(missing_element("get_all_tokens", index, self.len)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (0, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEngine;
    use crate::core::types::TokenDeclaration;

    fn open() -> (tempfile::TempDir, SchemeEngine<MemoryEngine>) {
        let dir = tempfile::tempdir().unwrap();
        let engine = SchemeEngine::init(dir.path().join("ml.vst")).unwrap();
        (dir, engine)
    }

    fn token(ty: TokenType, pattern: &str, value: &str) -> Token {
        TokenDeclaration::new(ty, pattern, value).validate().unwrap()
    }

    // ========== TEST: uninitialized handle ==========
    #[test]
    fn test_uninitialized_facade_refuses_calls() {
        let mut engine: SchemeEngine<MemoryEngine> = SchemeEngine::uninitialized();

        let err = engine.create_token(&token(TokenType::Vowel, "a", "അ")).unwrap_err();

        assert!(matches!(err, EngineError::NotInitialized));
        assert!(err.is_fatal());
        assert!(engine.flush().is_err());
        assert!(engine.query_tokens(TokenType::Vowel).is_err());
    }

    #[test]
    fn test_closed_facade_refuses_calls() {
        let (_dir, mut engine) = open();
        engine.close();
        assert!(!engine.is_initialized());
        assert!(matches!(engine.learn("വീട്"), Err(EngineError::NotInitialized)));
    }

    #[test]
    fn test_init_failure_is_fatal_io() {
        let result = SchemeEngine::<MemoryEngine>::init("/nonexistent-dir/ml.vst");
        match result {
            Err(EngineError::FatalIo { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent-dir/ml.vst"))
            }
            _ => panic!("expected FatalIo"),
        }
    }

    // ========== TEST: error translation ==========
    #[test]
    fn test_rejection_carries_engine_message() {
        let (_dir, mut engine) = open();
        let ka = token(TokenType::Consonant, "ka", "ക");
        engine.create_token(&ka).unwrap();

        let err = engine.create_token(&ka).unwrap_err();

        match err {
            EngineError::Rejected {
                operation,
                code,
                message,
            } => {
                assert_eq!(operation, "create_token");
                assert_eq!(code, VARNAM_ERROR);
                assert!(message.contains("ka"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ignore_duplicate_option_accepts_duplicates() {
        let (_dir, mut engine) = open();
        engine.configure(EngineOption::IgnoreDuplicateToken(true)).unwrap();
        let ka = token(TokenType::Consonant, "ka", "ക");

        engine.create_token(&ka).unwrap();
        engine.create_token(&ka).unwrap();
    }

    // ========== TEST: query_tokens ==========
    #[test]
    fn test_query_round_trips_tokens() {
        // GIVEN a token with every field set
        let (_dir, mut engine) = open();
        let original = TokenDeclaration::new(TokenType::Vowel, "aa", "ആ")
            .value("ാ")
            .value("ാാ")
            .tag("long")
            .possibility()
            .validate()
            .unwrap();
        engine.create_token(&original).unwrap();
        engine.create_token(&token(TokenType::Consonant, "ka", "ക")).unwrap();

        // WHEN vowels are queried
        let vowels: Vec<Token> = engine
            .query_tokens(TokenType::Vowel)
            .unwrap()
            .collect::<EngineResult<_>>()
            .unwrap();

        // THEN the token comes back unchanged; the memory engine normalizes nothing
        assert_eq!(vowels, vec![original]);
    }

    #[test]
    fn test_query_is_single_pass() {
        let (_dir, mut engine) = open();
        engine.create_token(&token(TokenType::Number, "1", "൧")).unwrap();
        engine.create_token(&token(TokenType::Number, "2", "൨")).unwrap();

        let mut query = engine.query_tokens(TokenType::Number).unwrap();
        assert_eq!(query.size_hint().1, Some(2));
        assert!(query.next().is_some());
        assert!(query.next().is_some());
        assert!(query.next().is_none());
        assert!(query.next().is_none());
    }

    #[test]
    fn test_reverse_transliterate_and_transliterate() {
        let (_dir, mut engine) = open();
        engine.create_token(&token(TokenType::Consonant, "ka", "ക")).unwrap();

        assert_eq!(engine.reverse_transliterate("ക").unwrap(), "ka");
        let words = engine.transliterate("ka").unwrap();
        assert_eq!(words[0].text(), "ക");
        assert!(engine.reverse_transliterate("ഖ").is_err());
    }

    /// Claims two elements but only hands out the first.
    struct ShortArray<T>(T);

    impl<T: Clone> EngineArray for ShortArray<T> {
        type Item = T;

        fn len(&self) -> usize {
            2
        }

        fn get(&self, index: usize) -> Option<T> {
            (index == 0).then(|| self.0.clone())
        }
    }

    struct ShortEngine;

    impl EngineBackend for ShortEngine {
        type TokenArray = ShortArray<RawToken>;
        type WordArray = ShortArray<Word>;

        fn init(_: &Path) -> Result<Self, String> {
            Ok(ShortEngine)
        }
        fn set_scheme_details(&mut self, _: &SchemeDetails) -> Status {
            VARNAM_SUCCESS
        }
        fn create_token(
            &mut self,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
            _: i32,
            _: i32,
            _: i32,
        ) -> Status {
            VARNAM_SUCCESS
        }
        fn generate_cv_combinations(&mut self) -> Status {
            VARNAM_SUCCESS
        }
        fn config(&mut self, _: &EngineOption) -> Status {
            VARNAM_SUCCESS
        }
        fn flush_buffer(&mut self) -> Status {
            VARNAM_SUCCESS
        }
        fn get_all_tokens(&mut self, _: i32, out: &mut Option<Self::TokenArray>) -> Status {
            let ka = token(TokenType::Consonant, "ka", "ക");
            *out = Some(ShortArray(RawToken::from_token(0, &ka)));
            VARNAM_SUCCESS
        }
        fn transliterate(&mut self, _: &str, out: &mut Option<Self::WordArray>) -> Status {
            *out = Some(ShortArray(Word::new("ക", 0)));
            VARNAM_SUCCESS
        }
        fn reverse_transliterate(&mut self, _: &str, _: &mut String) -> Status {
            VARNAM_SUCCESS
        }
        fn learn(&mut self, _: &str) -> Status {
            VARNAM_SUCCESS
        }
        fn learn_from_file(
            &mut self,
            _: &Path,
            _: &mut LearnStatus,
            _: &mut dyn FnMut(&str, Status),
        ) -> Status {
            VARNAM_SUCCESS
        }
        fn last_error(&self) -> String {
            String::new()
        }
    }

    #[test]
    fn test_missing_array_element_is_an_error() {
        let mut engine = SchemeEngine::<ShortEngine>::init("short.vst").unwrap();

        let results: Vec<EngineResult<Token>> =
            engine.query_tokens(TokenType::Consonant).unwrap().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(EngineError::Rejected { operation, code, .. }) => {
                assert_eq!(*operation, "get_all_tokens");
                assert_eq!(*code, VARNAM_ERROR);
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = engine.transliterate("ka").unwrap_err();
        assert!(err.to_string().contains("no element at 1"));
    }

    #[test]
    fn test_commands_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("engine.log");
        let mut engine = SchemeEngine::<MemoryEngine>::init(dir.path().join("ml.vst"))
            .unwrap()
            .with_log(EventLog::to_file(&log_path));

        engine.flush().unwrap();
        drop(engine);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("-> flush_buffer"));
        assert!(log.contains("-> close"));
    }
}
