//! CSV and TSV for SELECT results.

use std::sync::Arc;

use crate::decode::{DecodeOptions, id_to_string_and_type};
use crate::errors::Result;
use crate::export::rows::RowFormatter;
use crate::result::ResultBlock;
use crate::util::{escape_for_csv, escape_for_tsv};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub(crate) fn separator(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    pub(crate) fn escape(self, field: String) -> String {
        match self {
            Delimiter::Comma => escape_for_csv(field),
            Delimiter::Tab => escape_for_tsv(field),
        }
    }

    fn decode_options(self) -> DecodeOptions {
        match self {
            Delimiter::Comma => DecodeOptions::content_only(),
            Delimiter::Tab => DecodeOptions::default(),
        }
    }
}

pub(crate) struct DelimitedRows {
    delimiter: Delimiter,
    variables: Vec<String>,
    columns: Vec<Option<usize>>,
    vocabulary: Arc<dyn Vocabulary>,
}

impl DelimitedRows {
    pub(crate) fn new(
        delimiter: Delimiter,
        variables: Vec<String>,
        columns: Vec<Option<usize>>,
        vocabulary: Arc<dyn Vocabulary>,
    ) -> Self {
        DelimitedRows {
            delimiter,
            variables,
            columns,
            vocabulary,
        }
    }
}

impl RowFormatter for DelimitedRows {
    fn header(&mut self) -> Result<Vec<u8>> {
        let names: Vec<&str> = self
            .variables
            .iter()
            .map(|v| match self.delimiter {
                Delimiter::Comma => v.strip_prefix('?').unwrap_or(v),
                Delimiter::Tab => v.as_str(),
            })
            .collect();
        let mut line = names.join(&self.delimiter.separator().to_string());
        line.push('\n');
        Ok(line.into_bytes())
    }

    fn row(&mut self, block: &ResultBlock, row: usize) -> Result<Vec<u8>> {
        let delimiter = self.delimiter;
        let mut line = String::new();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                line.push(delimiter.separator());
            }
            let Some(column) = *column else {
                continue;
            };
            let decoded = id_to_string_and_type(
                self.vocabulary.as_ref(),
                block.table.get(row, column),
                &block.local_vocab,
                delimiter.decode_options(),
                |s| delimiter.escape(s),
            )?;
            if let Some((text, _)) = decoded {
                line.push_str(&text);
            }
        }
        line.push('\n');
        Ok(line.into_bytes())
    }
}
