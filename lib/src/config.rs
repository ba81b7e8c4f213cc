//! Tunables for exporting results, loadable from and storable to JSON.

use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;

use crate::consts::{
    DEFAULT_BLANK_NODE_BLOCK_SIZE, DEFAULT_BLOCK_ROWS, DEFAULT_MAX_QUERY_CHARS,
    DEFAULT_MIN_CHUNK_BYTES,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct ExportConfig {
    /// Output pieces are buffered until a chunk holds at least this many bytes.
    pub min_chunk_bytes: usize,
    /// The query text echoed in the JSON envelope is cut to this many characters.
    pub max_query_chars: usize,
    pub blank_node_block_size: u64,
    /// Rows per result block when loading input files.
    pub block_rows: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            blank_node_block_size: DEFAULT_BLANK_NODE_BLOCK_SIZE,
            block_rows: DEFAULT_BLOCK_ROWS,
        }
    }
}

impl ExportConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.blank_node_block_size == Some(0) {
            return Err("blank_node_block_size must be positive".to_string());
        }
        if self.block_rows == Some(0) {
            return Err("block_rows must be positive".to_string());
        }
        Ok(())
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    /// Load a config; missing fields take their defaults.
    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: ExportConfig = serde_json::from_reader(reader)?;
        if config.blank_node_block_size == 0 || config.block_rows == 0 {
            return Err(anyhow::anyhow!(
                "blank_node_block_size and block_rows must be positive"
            ));
        }
        Ok(config)
    }

    /// Prints the config in a readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Minimum chunk size: {} bytes", self.min_chunk_bytes);
        println!("  Query echo length: {} chars", self.max_query_chars);
        println!("  Blank node block size: {}", self.blank_node_block_size);
        println!("  Rows per block: {}", self.block_rows);
    }
}
