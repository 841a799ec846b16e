// File: src/core/context.rs
use crate::core::diagnostics::{format_diagnostic, Severity, SourceLocation};
use crate::core::types::{Token, TokenDeclaration, TokenKey};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Diagnostics and in-flight token state for one scheme compilation.
///
/// Each compilation owns its own session, so several can run in one process.
#[derive(Debug, Default)]
pub struct CompilationSession {
    error_count: usize,
    warning_count: usize,
    tokens: HashMap<TokenKey, Token>,
    current_expression: Option<String>,
    current_tag: Option<String>,
    /// Scheme source position set by the driver. When unset, diagnostics
    /// point at the Rust call site.
    location: Option<SourceLocation>,
    error_messages: Vec<String>,
    warning_messages: Vec<String>,
}

impl CompilationSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn record_error(&mut self, message: impl AsRef<str>) {
        let line = self.format(Severity::Error, message.as_ref());
        self.error_messages.push(line);
        self.error_count += 1;
    }

    #[track_caller]
    pub fn record_warning(&mut self, message: impl AsRef<str>) {
        let line = self.format(Severity::Warning, message.as_ref());
        self.warning_messages.push(line);
        self.warning_count += 1;
    }

    #[track_caller]
    fn format(&self, severity: Severity, message: &str) -> String {
        let location = match &self.location {
            Some(location) => location.clone(),
            None => SourceLocation::caller(),
        };
        format_diagnostic(
            severity,
            &location,
            self.current_expression.as_deref(),
            message,
        )
    }

    pub fn set_current_expression(&mut self, expression: impl Into<String>) {
        self.current_expression = Some(expression.into());
    }

    pub fn clear_current_expression(&mut self) {
        self.current_expression = None;
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.current_expression.as_deref()
    }

    /// Sets the current expression until the returned scope is dropped; the
    /// previous expression (usually none) is restored on every exit path.
    pub fn expression(&mut self, expression: impl Into<String>) -> ExpressionScope<'_> {
        let previous = self.current_expression.replace(expression.into());
        ExpressionScope {
            session: self,
            previous,
        }
    }

    pub fn with_expression<R>(
        &mut self,
        expression: impl Into<String>,
        f: impl FnOnce(&mut CompilationSession) -> R,
    ) -> R {
        let mut scope = self.expression(expression);
        f(&mut *scope)
    }

    /// Tag applied to declarations that do not name one.
    pub fn set_current_tag(&mut self, tag: impl Into<String>) {
        self.current_tag = Some(tag.into());
    }

    pub fn clear_current_tag(&mut self) {
        self.current_tag = None;
    }

    pub fn current_tag(&self) -> Option<&str> {
        self.current_tag.as_deref()
    }

    pub fn set_location(&mut self, location: SourceLocation) {
        self.location = Some(location);
    }

    pub fn clear_location(&mut self) {
        self.location = None;
    }

    /// Validates a declaration and keeps it in the local token table.
    ///
    /// A violation is recorded as exactly one error and returned; the token is
    /// not stored. Re-registering a key replaces the earlier token.
    #[track_caller]
    pub fn register_token(&mut self, decl: TokenDeclaration) -> Result<TokenKey, ValidationError> {
        let token = self.check_token(decl)?;
        let key = token.key();
        self.insert_token(token);
        Ok(key)
    }

    /// Validates a declaration without storing it. The current tag fills in a
    /// missing tag; a violation is recorded as one error.
    #[track_caller]
    pub fn check_token(&mut self, mut decl: TokenDeclaration) -> Result<Token, ValidationError> {
        if decl.tag.is_none() {
            decl.tag = self.current_tag.clone();
        }
        decl.validate().map_err(|err| {
            self.record_error(err.to_string());
            err
        })
    }

    /// Stores a validated token, returning the one it replaced.
    pub fn insert_token(&mut self, token: Token) -> Option<Token> {
        self.tokens.insert(token.key(), token)
    }

    /// Takes `key` out of the table, putting back `previous` when there was one.
    pub fn forget_token(&mut self, key: &TokenKey, previous: Option<Token>) {
        match previous {
            Some(token) => {
                self.tokens.insert(key.clone(), token);
            }
            None => {
                self.tokens.remove(key);
            }
        }
    }

    pub fn token(&self, key: &TokenKey) -> Option<&Token> {
        self.tokens.get(key)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    pub fn warning_messages(&self) -> &[String] {
        &self.warning_messages
    }

    pub fn report(&self) -> CompilationReport {
        CompilationReport {
            errors: self.error_count,
            warnings: self.warning_count,
            error_messages: self.error_messages.clone(),
            warning_messages: self.warning_messages.clone(),
        }
    }
}

/// Guard returned by [`CompilationSession::expression`].
pub struct ExpressionScope<'s> {
    session: &'s mut CompilationSession,
    previous: Option<String>,
}

impl Deref for ExpressionScope<'_> {
    type Target = CompilationSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for ExpressionScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for ExpressionScope<'_> {
    fn drop(&mut self) {
        self.session.current_expression = self.previous.take();
    }
}

/// End-of-run diagnostics, handed to whatever renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationReport {
    pub errors: usize,
    pub warnings: usize,
    pub error_messages: Vec<String>,
    pub warning_messages: Vec<String>,
}

impl CompilationReport {
    pub fn succeeded(&self) -> bool {
        self.errors == 0
    }

    /// Non-zero iff errors were recorded. Warnings never fail a run.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TokenType;

    // ========== TEST: error attribution ==========
    #[test]
    fn test_error_carries_active_expression() {
        // GIVEN a session with an active expression
        let mut session = CompilationSession::new();
        session.set_current_expression("consonants");

        // WHEN an error is recorded
        session.record_error("bad value");

        // THEN the line names the expression
        assert_eq!(session.error_count(), 1);
        assert!(session.error_messages()[0].contains("In expression consonants. bad value"));
    }

    #[test]
    fn test_cleared_expression_does_not_leak() {
        let mut session = CompilationSession::new();
        session.set_current_expression("vowels");
        session.record_error("first");
        session.clear_current_expression();
        session.record_error("second");

        assert!(session.error_messages()[0].contains("vowels"));
        assert!(!session.error_messages()[1].contains("vowels"));
        assert!(!session.error_messages()[1].contains("In expression"));
    }

    #[test]
    fn test_scope_restores_on_drop() {
        let mut session = CompilationSession::new();
        {
            let mut scope = session.expression("symbols");
            scope.record_warning("inside");
        }
        session.record_warning("outside");

        assert_eq!(session.current_expression(), None);
        assert!(session.warning_messages()[0].contains("In expression symbols."));
        assert!(!session.warning_messages()[1].contains("symbols"));
    }

    #[test]
    fn test_nested_scopes_restore_outer_expression() {
        let mut session = CompilationSession::new();
        session.with_expression("outer", |s| {
            s.with_expression("inner", |s| s.record_error("deep"));
            assert_eq!(s.current_expression(), Some("outer"));
        });
        assert_eq!(session.current_expression(), None);
        assert!(session.error_messages()[0].contains("inner"));
    }

    #[test]
    fn test_counts_increment_once_per_call() {
        let mut session = CompilationSession::new();
        for i in 0..3 {
            session.record_error(format!("e{}", i));
        }
        session.record_warning("w");

        assert_eq!(session.error_count(), 3);
        assert_eq!(session.warning_count(), 1);
        assert_eq!(session.error_messages().len(), 3);
        assert!(session.error_messages()[2].ends_with("e2"));
    }

    #[test]
    fn test_warnings_use_warning_label() {
        let mut session = CompilationSession::new();
        session.set_location(SourceLocation::new("ml.scheme", 4));
        session.record_warning("deprecated");
        assert_eq!(session.warning_messages()[0], "ml.scheme:4 : WARNING: deprecated");
        assert_eq!(session.error_count(), 0);
    }

    #[test]
    fn test_default_location_is_call_site() {
        let mut session = CompilationSession::new();
        session.record_error("here");
        assert!(session.error_messages()[0].contains("context.rs:"));
    }

    // ========== TEST: register_token ==========
    #[test]
    fn test_register_token_with_empty_value_records_error() {
        let mut session = CompilationSession::new();

        let result = session.register_token(TokenDeclaration::new(TokenType::Consonant, "ka", ""));

        assert!(result.is_err());
        assert_eq!(session.error_count(), 1);
        assert!(session.error_messages()[0].contains("ka"));
        assert_eq!(session.token_count(), 0);
    }

    #[test]
    fn test_register_over_length_token_counts_one_error() {
        let mut session = CompilationSession::new();
        let long = "x".repeat(31);

        let result = session.register_token(
            TokenDeclaration::new(TokenType::Symbol, long.clone(), long).value("y".repeat(40)),
        );

        assert!(result.is_err());
        assert_eq!(session.error_count(), 1);
    }

    #[test]
    fn test_register_token_stores_by_key() {
        let mut session = CompilationSession::new();
        let key = session
            .register_token(TokenDeclaration::new(TokenType::Vowel, "a", "അ"))
            .unwrap();

        let token = session.token(&key).unwrap();
        assert_eq!(token.value1.as_str(), "അ");
        assert_eq!(session.error_count(), 0);
    }

    #[test]
    fn test_register_same_key_overwrites_silently() {
        let mut session = CompilationSession::new();
        session
            .register_token(TokenDeclaration::new(TokenType::Vowel, "a", "അ"))
            .unwrap();
        let key = session
            .register_token(TokenDeclaration::new(TokenType::Vowel, "a", "ആ"))
            .unwrap();

        assert_eq!(session.token_count(), 1);
        assert_eq!(session.token(&key).unwrap().value1.as_str(), "ആ");
        assert_eq!(session.warning_count() + session.error_count(), 0);
    }

    #[test]
    fn test_forget_token_puts_back_the_replaced_one() {
        let mut session = CompilationSession::new();
        let first = session
            .check_token(TokenDeclaration::new(TokenType::Consonant, "ka", "ക"))
            .unwrap();
        let second = session
            .check_token(TokenDeclaration::new(TokenType::Consonant, "ka", "ഖ"))
            .unwrap();
        let key = first.key();

        assert_eq!(session.insert_token(first.clone()), None);
        let previous = session.insert_token(second);
        session.forget_token(&key, previous);
        assert_eq!(session.token(&key), Some(&first));

        session.forget_token(&key, None);
        assert_eq!(session.token_count(), 0);
    }

    #[test]
    fn test_current_tag_applies_to_untagged_declarations() {
        let mut session = CompilationSession::new();
        session.set_current_tag("chillu");
        let tagged = session
            .register_token(TokenDeclaration::new(TokenType::DeadConsonant, "n", "ൻ"))
            .unwrap();
        let explicit = session
            .register_token(TokenDeclaration::new(TokenType::DeadConsonant, "l", "ൽ").tag("other"))
            .unwrap();
        session.clear_current_tag();
        let plain = session
            .register_token(TokenDeclaration::new(TokenType::Consonant, "ka", "ക"))
            .unwrap();

        assert_eq!(tagged.tag, "chillu");
        assert_eq!(explicit.tag, "other");
        assert_eq!(plain.tag, "");
    }

    #[test]
    fn test_report_exit_code() {
        let mut session = CompilationSession::new();
        session.record_warning("only a warning");
        assert_eq!(session.report().exit_code(), 0);

        session.record_error("now an error");
        let report = session.report();
        assert_eq!(report.exit_code(), 1);
        assert!(report.to_json().unwrap().contains("now an error"));
    }
}
