//! Response body decoding.

use serde::de::DeserializeOwned;

/// Longest body excerpt kept on a decode error.
const SNIPPET_LEN: usize = 256;

/// Decode a JSON body. A body that does not match `T` keeps a short
/// excerpt for diagnostics.
pub async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ResponseError> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await.map_err(ResponseError::Read)?;
    decode(status, &bytes)
}

fn decode<T: DeserializeOwned>(status: u16, bytes: &[u8]) -> Result<T, ResponseError> {
    serde_json::from_slice(bytes).map_err(|source| ResponseError::Decode {
        status,
        snippet: snippet(bytes),
        source,
    })
}

fn snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

/// Body read or decode failure.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("reading response body: {0}")]
    Read(#[source] reqwest::Error),

    #[error("unexpected body for status {status}: {source}")]
    Decode {
        status: u16,
        snippet: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Items {
        items: Vec<String>,
    }

    #[test]
    fn test_decode_ok() {
        let items: Items = decode(200, br#"{"items": ["a"]}"#).unwrap();
        assert_eq!(items.items, vec!["a"]);
    }

    #[test]
    fn test_decode_error_keeps_snippet() {
        let err = decode::<Items>(200, b"<html>gateway</html>").unwrap_err();
        match err {
            ResponseError::Decode { status, snippet, .. } => {
                assert_eq!(status, 200);
                assert_eq!(snippet, "<html>gateway</html>");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(SNIPPET_LEN * 2);
        let cut = snippet(body.as_bytes());
        assert_eq!(cut.len(), SNIPPET_LEN + 3);
        assert!(cut.ends_with("..."));
    }
}
