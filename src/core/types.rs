// File: src/core/types.rs
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length, in bytes, of any token field. The engine keeps every field
/// in a fixed `char` buffer of this size.
pub const VARNAM_SYMBOL_MAX: usize = 30;

/// The kind of grapheme a token describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    Vowel,
    Consonant,
    DeadConsonant,
    ConsonantVowel,
    Number,
    Symbol,
    Anusvara,
    Visarga,
    Virama,
    Other,
    NonJoiner,
}

impl TokenType {
    pub const ALL: [TokenType; 11] = [
        TokenType::Vowel,
        TokenType::Consonant,
        TokenType::DeadConsonant,
        TokenType::ConsonantVowel,
        TokenType::Number,
        TokenType::Symbol,
        TokenType::Anusvara,
        TokenType::Visarga,
        TokenType::Virama,
        TokenType::Other,
        TokenType::NonJoiner,
    ];

    /// Numeric code used on the engine boundary.
    pub fn code(self) -> i32 {
        match self {
            TokenType::Vowel => 1,
            TokenType::Consonant => 2,
            TokenType::DeadConsonant => 3,
            TokenType::ConsonantVowel => 4,
            TokenType::Number => 5,
            TokenType::Symbol => 6,
            TokenType::Anusvara => 7,
            TokenType::Visarga => 8,
            TokenType::Virama => 9,
            TokenType::Other => 10,
            TokenType::NonJoiner => 11,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, ValidationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or(ValidationError::UnknownTokenType(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchType {
    /// The pattern must match exactly.
    #[default]
    Exact,
    /// The pattern is one candidate among several.
    Possibility,
}

impl MatchType {
    pub fn code(self) -> i32 {
        match self {
            MatchType::Exact => 1,
            MatchType::Possibility => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(MatchType::Exact),
            2 => Ok(MatchType::Possibility),
            other => Err(ValidationError::UnknownMatchType(other)),
        }
    }
}

/// A non-empty string of at most `VARNAM_SYMBOL_MAX` bytes.
///
/// Over-length input is rejected, never truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if value.len() > VARNAM_SYMBOL_MAX {
            return Err(ValidationError::SymbolTooLong {
                value,
                max: VARNAM_SYMBOL_MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated grapheme mapping, ready to be sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub match_type: MatchType,
    pub tag: Option<Symbol>,
    pub pattern: Symbol,
    pub value1: Symbol,
    pub value2: Option<Symbol>,
    pub value3: Option<Symbol>,
}

impl Token {
    pub fn key(&self) -> TokenKey {
        TokenKey {
            pattern: self.pattern.as_str().to_string(),
            tag: self.tag_str().to_string(),
        }
    }

    pub fn tag_str(&self) -> &str {
        self.tag.as_ref().map_or("", Symbol::as_str)
    }

    pub fn value2_str(&self) -> &str {
        self.value2.as_ref().map_or("", Symbol::as_str)
    }

    pub fn value3_str(&self) -> &str {
        self.value3.as_ref().map_or("", Symbol::as_str)
    }
}

/// Identifies a token inside a compilation session: its pattern plus tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub pattern: String,
    pub tag: String,
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            write!(f, "{}", self.pattern)
        } else {
            write!(f, "{} [{}]", self.pattern, self.tag)
        }
    }
}

/// An unvalidated token as written in a scheme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDeclaration {
    pub token_type: TokenType,
    pub match_type: MatchType,
    pub pattern: String,
    pub values: Vec<String>,
    pub tag: Option<String>,
}

impl TokenDeclaration {
    pub fn new(token_type: TokenType, pattern: impl Into<String>, value1: impl Into<String>) -> Self {
        Self {
            token_type,
            match_type: MatchType::Exact,
            pattern: pattern.into(),
            values: vec![value1.into()],
            tag: None,
        }
    }

    /// Adds an orthographic variant.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn possibility(mut self) -> Self {
        self.match_type = MatchType::Possibility;
        self
    }

    /// Checks every field and builds the token. Reports the first violation only.
    pub fn validate(&self) -> Result<Token, ValidationError> {
        let pattern = self.field("pattern", &self.pattern)?;
        if self.values.len() > 3 {
            return Err(ValidationError::TooManyValues {
                pattern: self.pattern.clone(),
                count: self.values.len(),
            });
        }

        let value1 = match self.values.first() {
            Some(v) => self.field("value1", v)?,
            None => self.field("value1", "")?,
        };
        let value2 = self.optional_field("value2", self.values.get(1))?;
        let value3 = self.optional_field("value3", self.values.get(2))?;
        let tag = self.optional_field("tag", self.tag.as_ref())?;

        Ok(Token {
            token_type: self.token_type,
            match_type: self.match_type,
            tag,
            pattern,
            value1,
            value2,
            value3,
        })
    }

    fn field(&self, field: &'static str, value: &str) -> Result<Symbol, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Empty {
                field,
                pattern: self.pattern.clone(),
            });
        }
        if value.len() > VARNAM_SYMBOL_MAX {
            return Err(ValidationError::TooLong {
                field,
                pattern: self.pattern.clone(),
                value: value.to_string(),
                max: VARNAM_SYMBOL_MAX,
            });
        }
        Ok(Symbol(value.to_string()))
    }

    // Empty optional fields are treated as absent.
    fn optional_field(
        &self,
        field: &'static str,
        value: Option<&String>,
    ) -> Result<Option<Symbol>, ValidationError> {
        match value {
            Some(v) if !v.is_empty() => self.field(field, v).map(Some),
            _ => Ok(None),
        }
    }
}

/// A token record as the engine hands it back: numeric codes and raw strings,
/// empty where a field is unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawToken {
    pub id: i32,
    pub token_type: i32,
    pub match_type: i32,
    pub tag: String,
    pub pattern: String,
    pub value1: String,
    pub value2: String,
    pub value3: String,
}

impl RawToken {
    pub fn from_token(id: i32, token: &Token) -> Self {
        Self {
            id,
            token_type: token.token_type.code(),
            match_type: token.match_type.code(),
            tag: token.tag_str().to_string(),
            pattern: token.pattern.to_string(),
            value1: token.value1.to_string(),
            value2: token.value2_str().to_string(),
            value3: token.value3_str().to_string(),
        }
    }
}

impl TryFrom<RawToken> for Token {
    type Error = ValidationError;

    fn try_from(raw: RawToken) -> Result<Self, Self::Error> {
        let token_type = TokenType::from_code(raw.token_type)?;
        let match_type = MatchType::from_code(raw.match_type)?;
        let mut decl = TokenDeclaration::new(token_type, raw.pattern, raw.value1);
        decl.match_type = match_type;
        decl.values.push(raw.value2);
        decl.values.push(raw.value3);
        if !raw.tag.is_empty() {
            decl.tag = Some(raw.tag);
        }
        decl.validate()
    }
}

/// A transliteration result produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    text: String,
    confidence: u32,
}

impl Word {
    pub fn new(text: impl Into<String>, confidence: u32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> u32 {
        self.confidence
    }
}

/// Scheme metadata stored by the engine alongside the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemeDetails {
    pub lang_code: String,
    pub identifier: String,
    pub display_name: String,
    pub author: String,
    pub compiled_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_builds_token() {
        let token = TokenDeclaration::new(TokenType::Consonant, "ka", "ക")
            .value("ക്ക")
            .tag("ka")
            .validate()
            .unwrap();

        assert_eq!(token.pattern.as_str(), "ka");
        assert_eq!(token.value1.as_str(), "ക");
        assert_eq!(token.value2_str(), "ക്ക");
        assert_eq!(token.value3, None);
        assert_eq!(token.tag_str(), "ka");
        assert_eq!(token.match_type, MatchType::Exact);
    }

    #[test]
    fn test_empty_value1_is_rejected() {
        let err = TokenDeclaration::new(TokenType::Consonant, "ka", "")
            .validate()
            .unwrap_err();

        assert!(matches!(err, ValidationError::Empty { field: "value1", .. }));
        assert!(err.to_string().contains("ka"));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        let err = TokenDeclaration::new(TokenType::Vowel, "", "അ")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Empty { field: "pattern", .. }));
    }

    #[test]
    fn test_length_is_counted_in_bytes() {
        // Ten three-byte characters fill the buffer exactly.
        let exact = "ക".repeat(10);
        assert!(TokenDeclaration::new(TokenType::Other, "x", exact.clone())
            .validate()
            .is_ok());

        let over = format!("{}a", exact);
        let err = TokenDeclaration::new(TokenType::Other, "x", over)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "value1", max: 30, .. }));
    }

    #[test]
    fn test_over_length_value_names_its_token() {
        let err = TokenDeclaration::new(TokenType::Consonant, "ka", "ക".repeat(11))
            .validate()
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("token 'ka' has a value1 '{}' longer than 30 bytes", "ക".repeat(11))
        );
    }

    #[test]
    fn test_bare_symbol_errors_do_not_invent_a_token() {
        assert_eq!(Symbol::new("").unwrap_err(), ValidationError::EmptySymbol);
        assert!(matches!(
            Symbol::new("x".repeat(31)),
            Err(ValidationError::SymbolTooLong { max: 30, .. })
        ));
    }

    #[test]
    fn test_over_length_tag_is_rejected() {
        let err = TokenDeclaration::new(TokenType::Vowel, "a", "അ")
            .tag("t".repeat(31))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "tag", .. }));
    }

    #[test]
    fn test_at_most_three_values() {
        let err = TokenDeclaration::new(TokenType::Vowel, "a", "1")
            .value("2")
            .value("3")
            .value("4")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooManyValues { count: 4, .. }));
    }

    #[test]
    fn test_token_type_codes() {
        for ty in TokenType::ALL {
            assert_eq!(TokenType::from_code(ty.code()).unwrap(), ty);
        }
        assert!(TokenType::from_code(0).is_err());
        assert!(MatchType::from_code(3).is_err());
    }

    #[test]
    fn test_raw_token_conversion_drops_empty_fields() {
        let raw = RawToken {
            id: 7,
            token_type: 1,
            match_type: 2,
            tag: String::new(),
            pattern: "aa".into(),
            value1: "ആ".into(),
            value2: "ാ".into(),
            value3: String::new(),
        };
        let token = Token::try_from(raw).unwrap();

        assert_eq!(token.token_type, TokenType::Vowel);
        assert_eq!(token.match_type, MatchType::Possibility);
        assert_eq!(token.tag, None);
        assert_eq!(token.value2_str(), "ാ");
        assert_eq!(token.value3, None);
    }

    #[test]
    fn test_symbol_deserialization_validates() {
        let ok: Symbol = serde_json::from_str("\"ka\"").unwrap();
        assert_eq!(ok.as_str(), "ka");
        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
    }

    #[test]
    fn test_token_key_display() {
        let token = TokenDeclaration::new(TokenType::Vowel, "i", "ഇ")
            .tag("vowels")
            .validate()
            .unwrap();
        assert_eq!(token.key().to_string(), "i [vowels]");
    }
}
