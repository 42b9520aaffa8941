//! JSON token model shared by the encoder and decoder.
//!
//! The decoder pulls tokens through [`JsonTokenSource`]; the encoder pushes
//! them into a [`JsonWriter`]. Both sides speak in the same token set so a
//! [`TokenBuffer`](crate::json::TokenBuffer) can sit in between.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::error::{ConvertError, Result};

/// A single JSON token.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// Start of a `new Name(...)` constructor.
    StartConstructor(String),
    EndConstructor,
    PropertyName(String),
    String(String),
    Integer(i64),
    /// An integer outside the `i64` range, kept as its decimal text.
    BigInteger(String),
    Float(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Comment(String),
    Null,
}

impl JsonToken {
    /// Short name of the token type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonToken::StartObject => "StartObject",
            JsonToken::EndObject => "EndObject",
            JsonToken::StartArray => "StartArray",
            JsonToken::EndArray => "EndArray",
            JsonToken::StartConstructor(_) => "StartConstructor",
            JsonToken::EndConstructor => "EndConstructor",
            JsonToken::PropertyName(_) => "PropertyName",
            JsonToken::String(_) => "String",
            JsonToken::Integer(_) => "Integer",
            JsonToken::BigInteger(_) => "BigInteger",
            JsonToken::Float(_) => "Float",
            JsonToken::Boolean(_) => "Boolean",
            JsonToken::Date(_) => "Date",
            JsonToken::Bytes(_) => "Bytes",
            JsonToken::Comment(_) => "Comment",
            JsonToken::Null => "Null",
        }
    }

    /// Whether this token is a primitive value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            JsonToken::String(_)
                | JsonToken::Integer(_)
                | JsonToken::BigInteger(_)
                | JsonToken::Float(_)
                | JsonToken::Boolean(_)
                | JsonToken::Date(_)
                | JsonToken::Bytes(_)
                | JsonToken::Null
        )
    }

    /// The XML text for a scalar token. `Null` has no text.
    ///
    /// Floats use the shortest form that reads back to the same value, with
    /// `INF`, `-INF` and `NaN` for the non-finite ones. Dates are RFC 3339 and
    /// bytes are base64.
    pub fn to_xml_value(&self) -> Result<Option<String>> {
        let text = match self {
            JsonToken::String(s) => s.clone(),
            JsonToken::Integer(i) => i.to_string(),
            JsonToken::BigInteger(digits) => digits.clone(),
            JsonToken::Float(f) => format_float(*f),
            JsonToken::Boolean(b) => b.to_string(),
            JsonToken::Date(date) => date.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            JsonToken::Bytes(bytes) => BASE64_STANDARD.encode(bytes),
            JsonToken::Null => return Ok(None),
            other => return Err(other.unexpected("getting an XML string value")),
        };
        Ok(Some(text))
    }

    /// Builds the error for this token appearing where it is not allowed.
    pub fn unexpected(&self, context: &'static str) -> ConvertError {
        ConvertError::UnexpectedToken {
            token: self.type_name(),
            context,
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

/// A pull reader of JSON tokens.
pub trait JsonTokenSource {
    /// Returns the next token, or `None` once the input is exhausted.
    fn next_token(&mut self) -> Result<Option<JsonToken>>;
}

impl<S: JsonTokenSource + ?Sized> JsonTokenSource for &mut S {
    fn next_token(&mut self) -> Result<Option<JsonToken>> {
        (**self).next_token()
    }
}

/// A push writer of JSON tokens.
pub trait JsonWriter {
    fn write_start_object(&mut self) -> Result<()>;
    fn write_end_object(&mut self) -> Result<()>;
    fn write_start_array(&mut self) -> Result<()>;
    fn write_end_array(&mut self) -> Result<()>;
    fn write_property_name(&mut self, name: &str) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;

    /// Writes a comment. Writers for formats without comments drop it.
    fn write_comment(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Holds the current token of a [`JsonTokenSource`].
///
/// The decoder reads one token at a time and inspects it before deciding what
/// to do, which is all the lookahead it ever needs.
pub struct TokenCursor<S> {
    source: S,
    current: Option<JsonToken>,
}

impl<S: JsonTokenSource> TokenCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: None,
        }
    }

    /// Advances to the next token. Returns `false` at end of input.
    pub fn read(&mut self) -> Result<bool> {
        self.current = self.source.next_token()?;
        Ok(self.current.is_some())
    }

    /// Advances and fails if the input ends.
    pub fn read_and_assert(&mut self, context: &'static str) -> Result<&JsonToken> {
        if !self.read()? {
            return Err(ConvertError::UnexpectedToken {
                token: "end of input",
                context,
            });
        }
        self.token(context)
    }

    /// The current token, failing if there is none.
    pub fn token(&self, context: &'static str) -> Result<&JsonToken> {
        self.current.as_ref().ok_or(ConvertError::UnexpectedToken {
            token: "end of input",
            context,
        })
    }

    /// The current token, if any.
    pub fn current(&self) -> Option<&JsonToken> {
        self.current.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
