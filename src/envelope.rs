//! Request and response bodies exchanged between stubs and handlers.
//!
//! ```text
//! request:  {"args": [2, 3], "kwargs": {}}
//! response: {"data": 5}
//! ```

use crate::types::{Kwargs, Value};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RequestEnvelope {
    /// Positional arguments in call order, receiver excluded.
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Kwargs,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub data: Value,
}

/// Serialize a body, optionally wrapping the JSON text in a JSON string as
/// older peers expect.
pub fn encode<T: Serialize>(body: &T, double_encoded: bool) -> serde_json::Result<Vec<u8>> {
    if double_encoded {
        serde_json::to_vec(&serde_json::to_string(body)?)
    } else {
        serde_json::to_vec(body)
    }
}

/// Deserialize a body sent with or without the extra string layer.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::String(inner) => serde_json::from_str(&inner),
        value => serde_json::from_value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_layout() {
        let req = RequestEnvelope {
            args: vec![json!(2), json!(3)],
            kwargs: Kwargs::new(),
        };
        assert_eq!(
            String::from_utf8(encode(&req, false).unwrap()).unwrap(),
            r#"{"args":[2,3],"kwargs":{}}"#
        );
    }

    #[test]
    fn missing_fields_default() {
        let req: RequestEnvelope = decode(br#"{"kwargs":{"a":1}}"#).unwrap();
        assert!(req.args.is_empty());
        assert_eq!(req.kwargs["a"], json!(1));

        let req: RequestEnvelope = decode(b"{}").unwrap();
        assert_eq!(req, RequestEnvelope::default());
    }

    #[test]
    fn legacy_double_encoding_is_accepted() {
        let req = RequestEnvelope {
            args: vec![json!("x")],
            kwargs: Kwargs::new(),
        };
        let bytes = encode(&req, true).unwrap();
        assert_eq!(bytes.first(), Some(&b'"'));
        assert_eq!(decode::<RequestEnvelope>(&bytes).unwrap(), req);
    }

    #[test]
    fn rejects_non_envelopes() {
        assert!(decode::<RequestEnvelope>(b"[1,2]").is_err());
        assert!(decode::<RequestEnvelope>(b"not json").is_err());
        assert!(decode::<ResponseEnvelope>(br#""still not json""#).is_err());
    }
}
