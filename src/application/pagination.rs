//! Cursor pagination over the approved-recency ordering.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PlaqueCursorPayload {
    created_on: OffsetDateTime,
    id: Uuid,
}

/// Position in the `(created_on DESC, id DESC)` ordering of plaques.
///
/// The cursor stores the order key of the last row served, so plaques approved
/// after it was issued sort before it and never shift the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaqueCursor {
    created_on: OffsetDateTime,
    id: Uuid,
}

impl PlaqueCursor {
    pub fn new(created_on: OffsetDateTime, id: Uuid) -> Self {
        Self { created_on, id }
    }

    pub fn created_on(&self) -> OffsetDateTime {
        self.created_on
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = PlaqueCursorPayload {
            created_on: self.created_on,
            id: self.id,
        };
        match serde_json::to_vec(&payload) {
            Ok(serialized) => URL_SAFE_NO_PAD.encode(serialized),
            // Two plain fields cannot fail to serialize; fall back to the bare id.
            Err(_) => URL_SAFE_NO_PAD.encode(self.id.as_bytes()),
        }
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor.trim())
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: PlaqueCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            created_on: payload.created_on,
            id: payload.id,
        })
    }

    /// True when `(created_on, id)` sorts strictly after this cursor in the
    /// descending listing order.
    pub fn precedes(&self, created_on: OffsetDateTime, id: Uuid) -> bool {
        (created_on, id) < (self.created_on, self.id)
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
