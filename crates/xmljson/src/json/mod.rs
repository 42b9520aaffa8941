//! JSON side of the converter: the token model and its adapters.

mod buffer;
pub mod token;
pub mod value;

pub use buffer::TokenBuffer;
pub use token::{JsonToken, JsonTokenSource, JsonWriter, TokenCursor};
pub use value::{ValueTokens, ValueWriter};
