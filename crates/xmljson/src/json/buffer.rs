use std::collections::VecDeque;

use serde_json::Value;

use crate::error::Result;
use crate::json::token::{JsonToken, JsonTokenSource, JsonWriter};
use crate::json::value::{ValueTokens, ValueWriter};

/// An in-memory token list.
///
/// Written to as a [`JsonWriter`] and read back as a [`JsonTokenSource`]. Unlike
/// [`ValueWriter`] it keeps comments, so encoding into a buffer and decoding
/// from it loses nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: VecDeque<JsonToken>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes a JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut source = ValueTokens::new(value);
        let mut buffer = Self::new();
        while let Some(token) = source.next_token()? {
            buffer.push(token);
        }
        Ok(buffer)
    }

    pub fn push(&mut self, token: JsonToken) {
        self.tokens.push_back(token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The buffered tokens, front first.
    pub fn tokens(&self) -> impl Iterator<Item = &JsonToken> {
        self.tokens.iter()
    }

    /// Replays the structural and string tokens into a [`Value`]. Comments are dropped.
    pub fn to_value(&self) -> Result<Value> {
        let mut writer = ValueWriter::new();
        for token in &self.tokens {
            match token {
                JsonToken::StartObject => writer.write_start_object()?,
                JsonToken::EndObject => writer.write_end_object()?,
                JsonToken::StartArray => writer.write_start_array()?,
                JsonToken::EndArray => writer.write_end_array()?,
                JsonToken::PropertyName(name) => writer.write_property_name(name)?,
                JsonToken::String(s) => writer.write_string(s)?,
                JsonToken::Null => writer.write_null()?,
                JsonToken::Comment(_) => {}
                other => return Err(other.unexpected("replaying tokens into a JSON value")),
            }
        }
        writer.into_value()
    }
}

impl From<Vec<JsonToken>> for TokenBuffer {
    fn from(tokens: Vec<JsonToken>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }
}

impl JsonTokenSource for TokenBuffer {
    fn next_token(&mut self) -> Result<Option<JsonToken>> {
        Ok(self.tokens.pop_front())
    }
}

impl JsonWriter for TokenBuffer {
    fn write_start_object(&mut self) -> Result<()> {
        self.push(JsonToken::StartObject);
        Ok(())
    }

    fn write_end_object(&mut self) -> Result<()> {
        self.push(JsonToken::EndObject);
        Ok(())
    }

    fn write_start_array(&mut self) -> Result<()> {
        self.push(JsonToken::StartArray);
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<()> {
        self.push(JsonToken::EndArray);
        Ok(())
    }

    fn write_property_name(&mut self, name: &str) -> Result<()> {
        self.push(JsonToken::PropertyName(name.to_string()));
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.push(JsonToken::String(value.to_string()));
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.push(JsonToken::Null);
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.push(JsonToken::Comment(text.to_string()));
        Ok(())
    }
}
