/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Pagination arguments as sent by clients: `?numItems=25&cursor=...`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub num_items: Option<usize>,
    pub cursor: Option<String>,
}

/// Resolved pagination window. The cursor is opaque to clients; it holds the
/// insertion position of the last record already returned, so records added
/// or removed between fetches never shift the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub num_items: usize,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn new(num_items: usize, cursor: Option<String>) -> Self {
        Self { num_items, cursor }
    }

    /// Position to resume after. Unparseable cursors restart from the beginning.
    pub fn after(&self) -> Option<i64> {
        self.cursor.as_deref().and_then(|c| c.parse::<i64>().ok())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: Vec<T>,
    pub is_done: bool,
    pub continue_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page.into_iter().map(f).collect(),
            is_done: self.is_done,
            continue_cursor: self.continue_cursor,
        }
    }
}

/// Response body for create operations.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: uuid::Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_positions() {
        assert_eq!(PageRequest::new(10, None).after(), None);
        assert_eq!(PageRequest::new(10, Some("30".into())).after(), Some(30));
        assert_eq!(PageRequest::new(10, Some("garbage".into())).after(), None);
    }
}
