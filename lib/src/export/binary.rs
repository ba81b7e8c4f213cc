//! Raw octet stream: the encoded words of every bound column, back to back.

use valueid::ENCODED_SIZE;

use crate::errors::Result;
use crate::export::rows::RowFormatter;
use crate::result::ResultBlock;

pub(crate) struct BinaryRows {
    columns: Vec<usize>,
}

impl BinaryRows {
    /// Selected variables that have no column are skipped entirely.
    pub(crate) fn new(columns: &[Option<usize>]) -> Self {
        BinaryRows {
            columns: columns.iter().flatten().copied().collect(),
        }
    }
}

impl RowFormatter for BinaryRows {
    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.columns.len() * ENCODED_SIZE);
        for &column in &self.columns {
            out.extend_from_slice(&block.table.get(row, column).to_bytes());
        }
        Ok(out)
    }
}
