//! Concurrent allocation of blank node ids in blocks.
//!
//! The id space `[min_index, MAX_INDEX]` is cut into blocks of a fixed size.
//! A [`BlankNodeManager`] hands out randomly chosen free blocks; each request
//! works through a [`LocalBlankNodeManager`] that issues ids from its own
//! blocks without locking and returns them when dropped.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use valueid::{MAX_INDEX, TaggedValue};

use crate::consts::DEFAULT_BLANK_NODE_BLOCK_SIZE;
use crate::errors::Result;

/// A contiguous range of ids owned by one local manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBlock {
    pub block_index: u64,
    pub start_index: u64,
    /// Next id to hand out; ids `start_index..next_index` have been issued.
    pub next_index: u64,
}

#[derive(Debug)]
struct State {
    used_blocks: HashSet<u64>,
    rng: StdRng,
}

/// Process-wide registry of used id blocks.
#[derive(Debug)]
pub struct BlankNodeManager {
    min_index: u64,
    block_size: u64,
    total_blocks: u64,
    state: RwLock<State>,
}

impl BlankNodeManager {
    pub fn new(min_index: u64) -> Self {
        Self::with_block_size(min_index, DEFAULT_BLANK_NODE_BLOCK_SIZE)
    }

    pub fn with_block_size(min_index: u64, block_size: u64) -> Self {
        Self::with_seed(min_index, block_size, rand::random())
    }

    /// Deterministic block choice, for tests.
    pub fn with_seed(min_index: u64, block_size: u64, seed: u64) -> Self {
        assert!(block_size > 0, "block size must be positive");
        assert!(min_index <= MAX_INDEX, "min_index {} is out of range", min_index);
        let total_blocks = (MAX_INDEX - min_index + 1) / block_size;
        BlankNodeManager {
            min_index,
            block_size,
            total_blocks,
            state: RwLock::new(State {
                used_blocks: HashSet::new(),
                rng: StdRng::seed_from_u64(seed),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn min_index(&self) -> u64 {
        self.min_index
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn num_used_blocks(&self) -> usize {
        self.read().used_blocks.len()
    }

    pub fn is_block_used(&self, block_index: u64) -> bool {
        self.read().used_blocks.contains(&block_index)
    }

    /// Claim a random free block.
    ///
    /// # Panics
    ///
    /// If 1/256th of all blocks are already in use; random probing is only
    /// cheap while the space is sparsely occupied.
    pub fn allocate_block(&self) -> IdBlock {
        let used = self.num_used_blocks() as u64;
        if used >= self.total_blocks / 256 {
            error!(
                "blank node manager is saturated: {} of {} blocks in use",
                used, self.total_blocks
            );
            panic!(
                "too many blank node blocks in use ({} of {})",
                used, self.total_blocks
            );
        }
        let mut guard = self.write();
        let State { used_blocks, rng } = &mut *guard;
        loop {
            let block_index = rng.random_range(0..self.total_blocks);
            if used_blocks.insert(block_index) {
                let start_index = self.min_index + block_index * self.block_size;
                debug!("allocated blank node block {} at {}", block_index, start_index);
                return IdBlock {
                    block_index,
                    start_index,
                    next_index: start_index,
                };
            }
        }
    }

    /// Return a block to the free set; `false` if it was not in use.
    pub fn release_block(&self, block_index: u64) -> bool {
        self.write().used_blocks.remove(&block_index)
    }
}

/// Issues blank node ids for one request from blocks it claims on demand.
#[derive(Debug)]
pub struct LocalBlankNodeManager {
    manager: Arc<BlankNodeManager>,
    blocks: Vec<IdBlock>,
}

impl LocalBlankNodeManager {
    pub fn new(manager: Arc<BlankNodeManager>) -> Self {
        LocalBlankNodeManager {
            manager,
            blocks: Vec::new(),
        }
    }

    /// A fresh id; consecutive within a block, distinct across all live managers.
    pub fn next_id(&mut self) -> u64 {
        let block_size = self.manager.block_size();
        let exhausted = self
            .blocks
            .last()
            .is_none_or(|b| b.next_index == b.start_index + block_size);
        if exhausted {
            let block = self.manager.allocate_block();
            self.blocks.push(block);
        }
        let n = self.blocks.len();
        let block = &mut self.blocks[n - 1];
        let id = block.next_index;
        block.next_index += 1;
        id
    }

    /// A fresh id wrapped as a `BlankNodeIndex` value.
    pub fn next_blank_node(&mut self) -> Result<TaggedValue> {
        Ok(TaggedValue::from_blank_node_index(self.next_id())?)
    }

    /// Whether `index` was issued by this manager.
    pub fn owns_index(&self, index: u64) -> bool {
        self.blocks
            .iter()
            .any(|b| b.start_index <= index && index < b.next_index)
    }

    pub fn blocks(&self) -> &[IdBlock] {
        &self.blocks
    }
}

impl Drop for LocalBlankNodeManager {
    fn drop(&mut self) {
        for block in &self.blocks {
            if !self.manager.release_block(block.block_index) {
                error!(
                    "blank node block {} was released twice",
                    block.block_index
                );
                if !std::thread::panicking() {
                    panic!("blank node block {} was not in use", block.block_index);
                }
            }
        }
    }
}
