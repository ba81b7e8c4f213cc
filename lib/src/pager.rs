//! Offset/limit selection over a sequence of row blocks.
//!
//! `limit` bounds the rows that are counted towards the reported result size,
//! `export_limit` the rows that are actually handed out. Blocks that lie
//! completely before the offset are skipped without being looked at, and no
//! block is pulled once the limit is used up.

use std::ops::Range;
use std::sync::Arc;

/// Anything that knows how many rows it holds.
pub trait RowCount {
    fn num_rows(&self) -> usize;
}

impl<T: RowCount + ?Sized> RowCount for Arc<T> {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }
}

impl<T: RowCount + ?Sized> RowCount for &T {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }
}

const UNBOUNDED: u64 = u64::MAX;

/// Offset, limit and export limit of a request; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: Option<u64>,
    pub export_limit: Option<u64>,
}

impl PageWindow {
    pub fn new(offset: u64, limit: Option<u64>, export_limit: Option<u64>) -> Self {
        PageWindow {
            offset,
            limit,
            export_limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Effective limit on exported rows, never larger than the limit.
    pub fn effective_export_limit(&self) -> Option<u64> {
        match (self.limit, self.export_limit) {
            (Some(l), Some(e)) => Some(l.min(e)),
            (l, None) => l,
            (None, e) => e,
        }
    }
}

/// A block together with the contiguous rows of it that are to be exported.
#[derive(Debug, Clone)]
pub struct PageSlice<B> {
    pub block: B,
    pub rows: Range<usize>,
}

/// Iterator returned by [`paginate`].
pub struct Pager<I> {
    blocks: I,
    offset: u64,
    limit: u64,
    export_limit: u64,
    total: u64,
    done: bool,
}

/// Select the rows of `blocks` that fall into `window`.
///
/// Errors from the block source are passed through and end the iteration.
pub fn paginate<I, B, E>(window: PageWindow, blocks: I) -> Pager<I::IntoIter>
where
    I: IntoIterator<Item = Result<B, E>>,
    B: RowCount,
{
    let limit = window.limit.unwrap_or(UNBOUNDED);
    let export_limit = window.effective_export_limit().unwrap_or(UNBOUNDED);
    Pager {
        blocks: blocks.into_iter(),
        offset: window.offset,
        limit,
        export_limit,
        total: 0,
        done: limit == 0,
    }
}

fn reduce_limit(limit: &mut u64, by: u64) {
    if *limit != UNBOUNDED {
        *limit = limit.saturating_sub(by);
    }
}

impl<I> Pager<I> {
    /// Rows counted so far; the full counted size once the pager is exhausted.
    pub fn total_counted(&self) -> u64 {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<I, B, E> Iterator for Pager<I>
where
    I: Iterator<Item = Result<B, E>>,
    B: RowCount,
{
    type Item = Result<PageSlice<B>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let block = match self.blocks.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(block)) => block,
            };
            let n = block.num_rows() as u64;
            if n <= self.offset {
                self.offset -= n;
                continue;
            }
            let begin = self.offset;
            let num_exported = self.export_limit.min(n - begin);
            let num_counted = self.limit.min(n - begin);
            self.total += num_counted;
            self.offset = 0;
            reduce_limit(&mut self.limit, num_counted);
            reduce_limit(&mut self.export_limit, num_counted);
            // checked here rather than before pulling so that a satisfied
            // limit never fetches another block
            if self.limit == 0 {
                self.done = true;
            }
            if num_exported > 0 {
                let rows = begin as usize..(begin + num_exported) as usize;
                return Some(Ok(PageSlice { block, rows }));
            }
        }
        None
    }
}
