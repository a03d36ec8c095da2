//! Lazy, paged iteration over catalog entries.

use std::collections::VecDeque;

use super::{Catalog, Entry};
use crate::error::Result;

/// Iterator over entries, newest timestamp first.
///
/// Pages are fetched with keyset pagination on `(timestamp, entryId)`, so
/// inserts made while iterating never shift or repeat rows already returned.
/// Entries without a timestamp sort last. After the first error the iterator
/// yields that error and then ends.
pub struct Entries {
    catalog: Catalog,
    page_size: usize,
    buffer: VecDeque<Entry>,
    cursor: Option<(String, i64)>,
    exhausted: bool,
}

impl Entries {
    pub(crate) fn new(catalog: Catalog, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let page = self
            .catalog
            .entries_page(self.cursor.as_ref(), self.page_size)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some((last.timestamp.clone().unwrap_or_default(), last.entry_id));
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for Entries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
