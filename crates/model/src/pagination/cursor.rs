use serde::{Deserialize, Serialize};

/// Position of a page in an offset-paginated scan.
///
/// Not a server resource: it is a plain value the caller may persist and
/// later hand back to resume a scan at the same offset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: usize,
    pub page_size: usize,
}

impl PageCursor {
    pub fn first(page_size: usize) -> Self {
        PageCursor {
            offset: 0,
            page_size,
        }
    }

    pub fn at(offset: usize, page_size: usize) -> Self {
        PageCursor { offset, page_size }
    }

    /// Cursor for the page following this one, or `None` once the next
    /// offset no longer fits in a `usize`.
    pub fn advance(&self) -> Option<Self> {
        let offset = self.offset.checked_add(self.page_size)?;
        Some(PageCursor {
            offset,
            page_size: self.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_by_page_size() {
        let cursor = PageCursor::first(2).advance().and_then(|c| c.advance());
        assert_eq!(cursor, Some(PageCursor::at(4, 2)));
    }

    #[test]
    fn test_advance_past_usize_max_is_none() {
        assert_eq!(PageCursor::at(usize::MAX, 1).advance(), None);
        assert_eq!(PageCursor::at(usize::MAX - 1, 1).advance(), Some(PageCursor::at(usize::MAX, 1)));
    }

    #[test]
    fn test_cursor_survives_serialization() {
        let cursor = PageCursor::at(300, 100);
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, r#"{"offset":300,"page_size":100}"#);
        let restored: PageCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cursor);
    }
}
