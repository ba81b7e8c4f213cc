//! Row iteration shared by the serializers.

use std::sync::Arc;

use crate::cancellation::CancellationHandle;
use crate::errors::Result;
use crate::pager::{PageSlice, PageWindow, Pager, paginate};
use crate::result::{BlockIter, QueryResult, ResultBlock, VariableToColumnMap};

/// Walks the exported rows of a result, block by block.
pub(crate) struct RowCursor {
    pager: Pager<BlockIter>,
    current: Option<PageSlice<Arc<ResultBlock>>>,
    columns: VariableToColumnMap,
}

impl RowCursor {
    /// Every block handed out is checked to have the columns `columns` refers to.
    pub(crate) fn new(
        window: PageWindow,
        result: QueryResult,
        columns: VariableToColumnMap,
    ) -> Self {
        RowCursor {
            pager: paginate(window, result.blocks()),
            current: None,
            columns,
        }
    }

    /// Rows counted towards the result size; complete once `next_row` returned `None`.
    pub(crate) fn total_counted(&self) -> u64 {
        self.pager.total_counted()
    }

    pub(crate) fn next_row(&mut self) -> Option<Result<(Arc<ResultBlock>, usize)>> {
        loop {
            if let Some(slice) = &mut self.current {
                if let Some(row) = slice.rows.next() {
                    return Some(Ok((Arc::clone(&slice.block), row)));
                }
                self.current = None;
            }
            match self.pager.next()? {
                Ok(slice) => {
                    let num_columns = slice.block.table.num_columns();
                    if let Err(e) = self.columns.check_columns(num_columns) {
                        return Some(Err(e));
                    }
                    self.current = Some(slice);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Format-specific framing of a row-based result.
pub(crate) trait RowFormatter: Send {
    fn header(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>>;

    /// Called once all rows are done with the number of counted rows.
    fn footer(&mut self, _counted_rows: u64) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Formatters that emit several items per row check for cancellation themselves.
    fn checks_cancellation(&self) -> bool {
        false
    }
}

enum Stage {
    Header,
    Rows,
    Done,
}

/// Drives a [`RowFormatter`] over a [`RowCursor`], yielding output pieces.
pub(crate) struct FramedRows<F> {
    cursor: RowCursor,
    formatter: F,
    cancellation: CancellationHandle,
    stage: Stage,
}

impl<F: RowFormatter> FramedRows<F> {
    pub(crate) fn new(cursor: RowCursor, formatter: F, cancellation: CancellationHandle) -> Self {
        FramedRows {
            cursor,
            formatter,
            cancellation,
            stage: Stage::Header,
        }
    }

    fn next_row_piece(&mut self) -> Option<Result<Vec<u8>>> {
        let (block, row) = match self.cursor.next_row()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        let piece = self.formatter.row(&block, row);
        if piece.is_ok() && !self.formatter.checks_cancellation() {
            if let Err(e) = self.cancellation.check("exporting result rows") {
                return Some(Err(e));
            }
        }
        Some(piece)
    }
}

impl<F: RowFormatter> Iterator for FramedRows<F> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let piece = match self.stage {
            Stage::Header => {
                self.stage = Stage::Rows;
                self.formatter.header()
            }
            Stage::Rows => match self.next_row_piece() {
                Some(piece) => piece,
                None => {
                    self.stage = Stage::Done;
                    self.formatter.footer(self.cursor.total_counted())
                }
            },
            Stage::Done => return None,
        };
        if piece.is_err() {
            self.stage = Stage::Done;
        }
        Some(piece)
    }
}
