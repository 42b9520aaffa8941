//! Adapters between the token model and `serde_json::Value`.

use serde_json::{Map, Number, Value};

use crate::error::{ConvertError, Result};
use crate::json::token::{JsonToken, JsonTokenSource, JsonWriter};

/// Walks a borrowed [`Value`] and yields its tokens in document order.
///
/// Object members come out in map order, which is insertion order with the
/// `preserve_order` feature of serde_json.
pub struct ValueTokens<'a> {
    pending: Option<&'a Value>,
    stack: Vec<Frame<'a>>,
}

enum Frame<'a> {
    Object(serde_json::map::Iter<'a>),
    Array(std::slice::Iter<'a, Value>),
}

impl<'a> ValueTokens<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            pending: Some(value),
            stack: Vec::new(),
        }
    }

    fn open(&mut self, value: &'a Value) -> JsonToken {
        match value {
            Value::Null => JsonToken::Null,
            Value::Bool(b) => JsonToken::Boolean(*b),
            Value::Number(n) => number_token(n),
            Value::String(s) => JsonToken::String(s.clone()),
            Value::Array(items) => {
                self.stack.push(Frame::Array(items.iter()));
                JsonToken::StartArray
            }
            Value::Object(map) => {
                self.stack.push(Frame::Object(map.iter()));
                JsonToken::StartObject
            }
        }
    }
}

impl JsonTokenSource for ValueTokens<'_> {
    fn next_token(&mut self) -> Result<Option<JsonToken>> {
        if let Some(value) = self.pending.take() {
            return Ok(Some(self.open(value)));
        }
        let token = match self.stack.last_mut() {
            None => return Ok(None),
            Some(Frame::Object(members)) => match members.next() {
                Some((key, value)) => {
                    self.pending = Some(value);
                    JsonToken::PropertyName(key.clone())
                }
                None => {
                    self.stack.pop();
                    JsonToken::EndObject
                }
            },
            Some(Frame::Array(items)) => match items.next() {
                Some(item) => self.open(item),
                None => {
                    self.stack.pop();
                    JsonToken::EndArray
                }
            },
        };
        Ok(Some(token))
    }
}

fn number_token(n: &Number) -> JsonToken {
    if let Some(i) = n.as_i64() {
        JsonToken::Integer(i)
    } else if n.is_u64() {
        JsonToken::BigInteger(n.to_string())
    } else {
        JsonToken::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

enum Container {
    Object {
        map: Map<String, Value>,
        key: Option<String>,
    },
    Array(Vec<Value>),
}

/// Builds a [`Value`] from [`JsonWriter`] calls.
///
/// Comments have no place in a `Value` and are dropped.
#[derive(Default)]
pub struct ValueWriter {
    stack: Vec<Container>,
    root: Option<Value>,
}

impl ValueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished value. `Null` if nothing was written.
    pub fn into_value(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(ConvertError::WriterState("unclosed object or array"));
        }
        Ok(self.root.unwrap_or(Value::Null))
    }

    fn check_value_slot(&self) -> Result<()> {
        match self.stack.last() {
            None if self.root.is_some() => {
                Err(ConvertError::WriterState("a root value was already written"))
            }
            Some(Container::Object { key: None, .. }) => Err(ConvertError::WriterState(
                "value written in an object without a property name",
            )),
            _ => Ok(()),
        }
    }

    fn push_value(&mut self, value: Value) -> Result<()> {
        self.check_value_slot()?;
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Container::Array(items)) => items.push(value),
            Some(Container::Object { map, key }) => {
                if let Some(key) = key.take() {
                    map.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

impl JsonWriter for ValueWriter {
    fn write_start_object(&mut self) -> Result<()> {
        self.check_value_slot()?;
        self.stack.push(Container::Object {
            map: Map::new(),
            key: None,
        });
        Ok(())
    }

    fn write_end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Container::Object { map, key: None }) => self.push_value(Value::Object(map)),
            Some(Container::Object { .. }) => {
                Err(ConvertError::WriterState("property name without a value"))
            }
            _ => Err(ConvertError::WriterState("end of object without a matching start")),
        }
    }

    fn write_start_array(&mut self) -> Result<()> {
        self.check_value_slot()?;
        self.stack.push(Container::Array(Vec::new()));
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Container::Array(items)) => self.push_value(Value::Array(items)),
            _ => Err(ConvertError::WriterState("end of array without a matching start")),
        }
    }

    fn write_property_name(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Container::Object { key: key @ None, .. }) => {
                *key = Some(name.to_string());
                Ok(())
            }
            Some(Container::Object { .. }) => Err(ConvertError::WriterState(
                "property name written while another awaits its value",
            )),
            _ => Err(ConvertError::WriterState(
                "property name written outside an object",
            )),
        }
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.push_value(Value::String(value.to_string()))
    }

    fn write_null(&mut self) -> Result<()> {
        self.push_value(Value::Null)
    }
}
