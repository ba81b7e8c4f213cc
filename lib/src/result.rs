//! Result tables as handed over by query execution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use valueid::TaggedValue;

use crate::errors::{ExportError, Result};
use crate::local_vocab::LocalVocab;
use crate::pager::RowCount;

/// Row-major table of encoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdTable {
    num_columns: usize,
    num_rows: usize,
    cells: Vec<TaggedValue>,
}

impl IdTable {
    pub fn new(num_columns: usize) -> Self {
        IdTable {
            num_columns,
            num_rows: 0,
            cells: Vec::new(),
        }
    }

    pub fn from_rows<I, R>(num_columns: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[TaggedValue]>,
    {
        let mut table = IdTable::new(num_columns);
        for row in rows {
            table.push_row(row.as_ref())?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: &[TaggedValue]) -> Result<()> {
        if row.len() != self.num_columns {
            return Err(ExportError::Execution(format!(
                "row has {} columns, table has {}",
                row.len(),
                self.num_columns
            )));
        }
        self.cells.extend_from_slice(row);
        self.num_rows += 1;
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn row(&self, row: usize) -> &[TaggedValue] {
        &self.cells[row * self.num_columns..(row + 1) * self.num_columns]
    }

    pub fn get(&self, row: usize, column: usize) -> TaggedValue {
        self.cells[row * self.num_columns + column]
    }
}

/// One block of result rows and the local vocab its values were built against.
#[derive(Debug, Clone)]
pub struct ResultBlock {
    pub table: IdTable,
    pub local_vocab: Arc<LocalVocab>,
}

impl ResultBlock {
    pub fn new(table: IdTable, local_vocab: Arc<LocalVocab>) -> Self {
        ResultBlock { table, local_vocab }
    }
}

impl RowCount for ResultBlock {
    fn num_rows(&self) -> usize {
        self.table.num_rows()
    }
}

pub type BlockIter = Box<dyn Iterator<Item = Result<Arc<ResultBlock>>> + Send>;

/// A complete query result: one materialized block or a one-shot sequence of blocks.
pub enum QueryResult {
    Materialized(Arc<ResultBlock>),
    Lazy(BlockIter),
}

impl QueryResult {
    pub fn materialized(block: ResultBlock) -> Self {
        QueryResult::Materialized(Arc::new(block))
    }

    pub fn lazy<I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = Result<Arc<ResultBlock>>>,
        I::IntoIter: Send + 'static,
    {
        QueryResult::Lazy(Box::new(blocks.into_iter()))
    }

    pub fn is_fully_materialized(&self) -> bool {
        matches!(self, QueryResult::Materialized(_))
    }

    /// The blocks of this result in order; a materialized result has exactly one.
    pub fn blocks(self) -> BlockIter {
        match self {
            QueryResult::Materialized(block) => Box::new(std::iter::once(Ok(block))),
            QueryResult::Lazy(blocks) => blocks,
        }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryResult::Materialized(b) => f
                .debug_tuple("Materialized")
                .field(&b.table.num_rows())
                .finish(),
            QueryResult::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// Maps output variables (`?x`) to the column holding their values.
#[derive(Debug, Clone, Default)]
pub struct VariableToColumnMap {
    columns: HashMap<String, usize>,
}

fn normalize_variable(var: &str) -> String {
    if var.starts_with('?') || var.starts_with('$') {
        format!("?{}", &var[1..])
    } else {
        format!("?{}", var)
    }
}

impl VariableToColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: &str, column: usize) {
        self.columns.insert(normalize_variable(variable), column);
    }

    /// Column of `variable`; `None` if the variable is not bound by the result.
    pub fn column_of(&self, variable: &str) -> Option<usize> {
        self.columns.get(&normalize_variable(variable)).copied()
    }

    /// Fails if a variable refers to a column past the first `num_columns`.
    pub fn check_columns(&self, num_columns: usize) -> Result<()> {
        let out_of_range = self
            .columns
            .iter()
            .filter(|(_, column)| **column >= num_columns)
            .min_by_key(|(variable, _)| variable.as_str());
        match out_of_range {
            Some((variable, column)) => Err(ExportError::Execution(format!(
                "variable {} is mapped to column {}, but the result has {} columns",
                variable, column, num_columns
            ))),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, usize)> for VariableToColumnMap {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        let mut map = VariableToColumnMap::new();
        for (var, col) in iter {
            map.insert(var.as_ref(), col);
        }
        map
    }
}
