//! Translation file codecs.

use std::fmt::Debug;

use serde_json::Value;

use crate::error::StoreError;

/// Output options passed to [`Codec::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub pretty: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Decodes and encodes one file syntax.
pub trait Codec: Debug + Send + Sync {
    /// File extensions without the leading dot. The first one is used for new files.
    fn extensions(&self) -> &[&'static str];

    /// Decodes raw bytes into a nested document.
    ///
    /// # Errors
    /// - The bytes are not valid for this syntax
    fn decode(&self, bytes: &[u8]) -> Result<Value, StoreError>;

    /// # Errors
    /// - The document cannot be represented in this syntax
    fn encode(&self, document: &Value, options: FormatOptions) -> Result<Vec<u8>, StoreError>;
}

/// JSON files. Unicode and slashes are written unescaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, document: &Value, options: FormatOptions) -> Result<Vec<u8>, StoreError> {
        let mut bytes = if options.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn decode_blank_file_as_empty_document() {
        assert_that!(JsonCodec.decode(b"  \n").unwrap(), eq(&json!({})));
    }

    #[rstest]
    fn decode_invalid_json_fails() {
        assert_that!(JsonCodec.decode(b"{ nope"), err(anything()));
    }

    #[rstest]
    fn encode_keeps_unicode_and_order() {
        let document = json!({ "z": "Grüße", "a": "a/b" });

        let compact = JsonCodec.encode(&document, FormatOptions { pretty: false }).unwrap();

        assert_that!(String::from_utf8(compact).unwrap(), eq("{\"z\":\"Grüße\",\"a\":\"a/b\"}\n"));
    }

    #[rstest]
    fn encode_pretty_by_default() {
        let bytes = JsonCodec.encode(&json!({ "a": "1" }), FormatOptions::default()).unwrap();

        assert_that!(String::from_utf8(bytes).unwrap(), eq("{\n  \"a\": \"1\"\n}\n"));
    }
}
