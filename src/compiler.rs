// File: src/compiler.rs
use crate::config::{CompilerConfig, EngineOption};
use crate::core::context::{CompilationReport, CompilationSession};
use crate::core::engine::{EngineBackend, LearnStatus, SchemeEngine};
use crate::core::types::{SchemeDetails, Token, TokenDeclaration, TokenType};
use crate::error::EngineResult;
use crate::learning;
use crate::logging::EventLog;
use std::path::Path;

/// Drives one scheme compilation: every declaration goes through the session
/// for validation, then to the engine. Anything that fails after `init` is
/// recorded as a diagnostic so the whole scheme gets checked in one pass.
pub struct SchemeCompiler<B: EngineBackend> {
    session: CompilationSession,
    engine: SchemeEngine<B>,
}

impl<B: EngineBackend> SchemeCompiler<B> {
    /// Opens the engine and applies the configured options. An engine that
    /// cannot be opened aborts the run.
    pub fn init(scheme_file: impl AsRef<Path>, config: &CompilerConfig) -> EngineResult<Self> {
        let log = EventLog::from_config(config.log_file.as_deref());
        let mut engine = SchemeEngine::uninitialized().with_log(log);
        engine.open(scheme_file)?;

        let mut compiler = Self {
            session: CompilationSession::new(),
            engine,
        };
        for option in config.engine_options() {
            compiler.configure(option);
        }
        Ok(compiler)
    }

    pub fn session(&self) -> &CompilationSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CompilationSession {
        &mut self.session
    }

    pub fn engine(&self) -> &SchemeEngine<B> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SchemeEngine<B> {
        &mut self.engine
    }

    /// Runs `f` with `expression` as the current expression and restores the
    /// previous one afterwards, whatever `f` recorded.
    pub fn with_expression<R>(
        &mut self,
        expression: impl Into<String>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.session.current_expression().map(str::to_string);
        self.session.set_current_expression(expression);
        let mut scope = CompilerScope {
            compiler: self,
            previous,
        };
        f(&mut *scope.compiler)
    }

    /// Validates and creates one token. Returns whether the engine accepted it.
    /// A token the engine refuses does not stay in the session table.
    #[track_caller]
    pub fn declare_token(&mut self, decl: TokenDeclaration) -> bool {
        let Ok(token) = self.session.check_token(decl) else {
            return false;
        };
        let key = token.key();
        let previous = self.session.insert_token(token.clone());
        if self.create(&token) {
            true
        } else {
            self.session.forget_token(&key, previous);
            false
        }
    }

    #[track_caller]
    fn create(&mut self, token: &Token) -> bool {
        match self.engine.create_token(token) {
            Ok(()) => true,
            Err(e) => {
                self.session.record_error(e.to_string());
                false
            }
        }
    }

    #[track_caller]
    pub fn set_scheme_details(&mut self, details: &SchemeDetails) -> bool {
        let result = self.engine.set_scheme_details(details);
        self.absorb(result)
    }

    #[track_caller]
    pub fn configure(&mut self, option: EngineOption) -> bool {
        let result = self.engine.configure(option);
        self.absorb(result)
    }

    #[track_caller]
    pub fn generate_combinations(&mut self) -> bool {
        let result = self.engine.generate_combinations();
        self.absorb(result)
    }

    #[track_caller]
    pub fn learn(&mut self, word: &str) -> bool {
        learning::learn_word(&mut self.engine, &mut self.session, word)
    }

    #[track_caller]
    pub fn learn_from_file(&mut self, path: &Path) -> Option<LearnStatus> {
        learning::learn_from_file(&mut self.engine, &mut self.session, path)
    }

    /// All tokens of one type held by the engine. Tokens the engine returns in
    /// a malformed state are reported and skipped.
    #[track_caller]
    pub fn tokens(&mut self, token_type: TokenType) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut problems = Vec::new();
        match self.engine.query_tokens(token_type) {
            Ok(query) => {
                for item in query {
                    match item {
                        Ok(token) => tokens.push(token),
                        Err(e) => problems.push(e.to_string()),
                    }
                }
            }
            Err(e) => problems.push(e.to_string()),
        }
        for problem in problems {
            self.session.record_error(problem);
        }
        tokens
    }

    #[track_caller]
    fn absorb(&mut self, result: EngineResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.session.record_error(e.to_string());
                false
            }
        }
    }

    /// Ends the run. Buffered tokens are flushed only when no error was
    /// recorded; the engine handle is released either way.
    #[track_caller]
    pub fn finish(self) -> CompilationReport {
        let Self {
            mut session,
            mut engine,
        } = self;
        if !session.has_errors() {
            if let Err(e) = engine.flush() {
                session.record_error(e.to_string());
            }
        }
        engine.close();
        session.report()
    }
}

/// Restores the expression that was current before
/// [`SchemeCompiler::with_expression`], also when `f` unwinds.
struct CompilerScope<'c, B: EngineBackend> {
    compiler: &'c mut SchemeCompiler<B>,
    previous: Option<String>,
}

impl<B: EngineBackend> Drop for CompilerScope<'_, B> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => self.compiler.session.set_current_expression(previous),
            None => self.compiler.session.clear_current_expression(),
        }
    }
}
