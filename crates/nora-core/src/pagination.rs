// ABOUTME: Keyset pagination types shared by every list endpoint
// ABOUTME: Cursors are opaque base64 tokens naming the last row a client has seen
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::limits::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Row a cursor points at: lists are ordered by `(created_at, id)` descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    /// Creation time of the row, millisecond precision
    pub created_at: DateTime<Utc>,
    /// Row id, compared as text when timestamps tie
    pub id: String,
}

/// Opaque pagination token handed to clients as `next_cursor`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Cursor pointing at the row created at `created_at` with `id`
    #[must_use]
    pub fn new(created_at: DateTime<Utc>, id: &str) -> Self {
        let raw = format!("{}:{id}", created_at.timestamp_millis());
        Self(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Row this cursor points at, or `None` for a token we never issued
    #[must_use]
    pub fn position(&self) -> Option<CursorPosition> {
        let raw = String::from_utf8(URL_SAFE_NO_PAD.decode(&self.0).ok()?).ok()?;
        let (millis, id) = raw.split_once(':')?;
        Some(CursorPosition {
            created_at: DateTime::from_timestamp_millis(millis.parse().ok()?)?,
            id: id.to_owned(),
        })
    }

    /// Token as sent to clients
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// Rows in list order
    pub items: Vec<T>,
    /// Pass back as `?cursor=` to fetch the following page
    pub next_cursor: Option<Cursor>,
    /// Whether rows remain after this page
    pub has_more: bool,
    /// Number of items in this page, not in the whole list
    pub count: usize,
}

impl<T> CursorPage<T> {
    /// Page holding `items`
    #[must_use]
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>, has_more: bool) -> Self {
        Self {
            count: items.len(),
            items,
            next_cursor,
            has_more,
        }
    }

    /// Build a page from a query that fetched `limit + 1` rows
    ///
    /// The surplus row is dropped; its presence alone means another page
    /// exists, and the next cursor points at the last row kept.
    #[must_use]
    pub fn from_lookahead<F>(mut rows: Vec<T>, limit: usize, cursor_of: F) -> Self
    where
        F: Fn(&T) -> Cursor,
    {
        if rows.len() <= limit {
            return Self::new(rows, None, false);
        }
        rows.truncate(limit);
        let next = rows.last().map(cursor_of);
        Self::new(rows, next, true)
    }
}

/// Where a list query starts and how many rows it may return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Return rows strictly after this one
    pub cursor: Option<Cursor>,
    /// Always within `1..=MAX_PAGE_SIZE`
    pub limit: usize,
}

impl PaginationParams {
    /// Missing limits use the default page size; out-of-range ones are clamped
    #[must_use]
    pub fn new(cursor: Option<Cursor>, limit: Option<usize>) -> Self {
        let limit = limit.map_or(DEFAULT_PAGE_SIZE, |n| n.clamp(1, MAX_PAGE_SIZE));
        Self { cursor, limit }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }

    #[test]
    fn test_cursor_points_back_at_its_row() {
        let cursor = Cursor::new(at(1_735_689_600_123), "8f14e45f-ceea-467f-a0e6-8e3bd8a5c1e2");
        let position = cursor.position().unwrap_or_else(|| panic!("cursor should decode"));

        assert_eq!(position.created_at, at(1_735_689_600_123));
        assert_eq!(position.id, "8f14e45f-ceea-467f-a0e6-8e3bd8a5c1e2");
    }

    #[test]
    fn test_foreign_tokens_have_no_position() {
        assert!(Cursor::from("not base64 at all!".to_owned()).position().is_none());
        assert!(Cursor::from(URL_SAFE_NO_PAD.encode("12345")).position().is_none());
        assert!(Cursor::from(URL_SAFE_NO_PAD.encode("soon:abc")).position().is_none());
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PaginationParams::new(None, Some(0)).limit, 1);
        assert_eq!(PaginationParams::new(None, Some(10_000)).limit, MAX_PAGE_SIZE);
        assert_eq!(PaginationParams::default().limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_from_lookahead_row() {
        let ts = at(1_700_000_000_000);
        let page = CursorPage::from_lookahead(vec![1, 2, 3], 2, |n| Cursor::new(ts, &n.to_string()));

        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more);
        assert_eq!(page.count, 2);
        let next = page.next_cursor.and_then(|c| c.position());
        assert_eq!(next.map(|p| p.id).as_deref(), Some("2"));

        let last = CursorPage::from_lookahead(vec![1], 2, |n| Cursor::new(ts, &n.to_string()));
        assert!(!last.has_more);
        assert!(last.next_cursor.is_none());
    }
}
