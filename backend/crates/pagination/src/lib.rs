//! Opaque cursor and pagination envelope primitives.
//!
//! Listing endpoints return a [`Page`] envelope whose `next_cursor` token is
//! an opaque, URL-safe string. Clients echo the token back verbatim; the
//! payload encoded inside it is a private contract between the server and
//! itself and may change between releases.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

/// Errors raised when decoding a client-supplied cursor token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// Token is not valid URL-safe base64.
    #[error("cursor is not valid base64: {message}")]
    Encoding { message: String },
    /// Token decoded but the payload did not match the expected shape.
    #[error("cursor payload is malformed: {message}")]
    Payload { message: String },
}

impl CursorError {
    fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }
}

/// Opaque pagination cursor.
///
/// Wraps a serialisable payload (typically a sort key plus a row id) in a
/// URL-safe base64 token.
///
/// # Examples
/// ```
/// use pagination::Cursor;
///
/// let cursor = Cursor::encode(&("2024-01-01T00:00:00Z", 42)).expect("encode");
/// let (ts, id): (String, u64) = cursor.decode().expect("decode");
/// assert_eq!(id, 42);
/// assert!(ts.starts_with("2024"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Encode a payload into an opaque token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Payload`] when the payload cannot be
    /// serialised to JSON.
    pub fn encode<T: Serialize>(payload: &T) -> Result<Self, CursorError> {
        let json = serde_json::to_vec(payload).map_err(|e| CursorError::payload(e.to_string()))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode the token back into its payload.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Encoding`] for invalid base64 and
    /// [`CursorError::Payload`] when the decoded bytes do not deserialise
    /// into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|e| CursorError::encoding(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| CursorError::payload(e.to_string()))
    }

    /// Construct a cursor from a raw token received from a client.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bound applied to client-requested page sizes.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when the client does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A validated page request: clamped limit plus an optional cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    cursor: Option<Cursor>,
}

impl PageRequest {
    /// Build a request, clamping the limit into `1..=MAX_PAGE_SIZE`.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageRequest, MAX_PAGE_SIZE};
    ///
    /// assert_eq!(PageRequest::new(Some(0), None).limit(), 1);
    /// assert_eq!(PageRequest::new(Some(500), None).limit(), MAX_PAGE_SIZE);
    /// assert_eq!(PageRequest::new(None, None).limit(), 20);
    /// ```
    pub fn new(limit: Option<u32>, cursor: Option<Cursor>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { limit, cursor }
    }

    /// The clamped page size.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The cursor to resume from, if any.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination envelope returned by listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The page of items, in listing order.
    pub items: Vec<T>,
    /// Token for the next page; `None` when this page is the last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// A page with a continuation token.
    pub fn with_next(items: Vec<T>, next_cursor: Cursor) -> Self {
        Self {
            items,
            next_cursor: Some(next_cursor),
        }
    }

    /// Map the item type while preserving the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }

    /// Build an absolute link to the next page by appending the cursor to
    /// `base` as a `cursor` query parameter.
    pub fn next_link(&self, base: &Url) -> Option<Url> {
        self.next_cursor.as_ref().map(|cursor| {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("cursor", cursor.as_str());
            url
        })
    }
}
