//! Nested rectangular blocks owned by tags.
//!
//! Blocks live in a per-sheet [`BlockArena`] and point at their parent by
//! index. The root block covers a sheet's used range and has no parent.

use crate::grid::{Axis, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// Which way a block grows when its content is repeated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    None,
    Rows,
    Cols,
}

impl Direction {
    /// Axis edits happen along. Blocks without a direction behave like rows.
    pub fn axis(self) -> Axis {
        match self {
            Direction::Cols => Axis::Cols,
            Direction::None | Direction::Rows => Axis::Rows,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub parent: Option<BlockId>,
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
    pub direction: Direction,
}

impl Block {
    pub fn rect(&self) -> Rect {
        Rect {
            top: self.top,
            bottom: self.bottom,
            left: self.left,
            right: self.right,
        }
    }
}

#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block. Its columns are clamped to the parent's, and reversed
    /// bounds are normalized.
    pub fn new_block(
        &mut self,
        parent: Option<BlockId>,
        left: usize,
        right: usize,
        top: usize,
        bottom: usize,
        direction: Direction,
    ) -> BlockId {
        let (mut left, mut right) = (left.min(right), left.max(right));
        if let Some(parent) = parent.map(|id| &self.blocks[id.0]) {
            left = left.clamp(parent.left, parent.right);
            right = right.clamp(parent.left, parent.right);
        }
        self.blocks.push(Block {
            parent,
            left,
            right,
            top: top.min(bottom),
            bottom: top.max(bottom),
            direction,
        });
        BlockId(self.blocks.len() - 1)
    }

    pub fn new_root(&mut self, rect: Rect) -> BlockId {
        self.new_block(None, rect.left, rect.right, rect.top, rect.bottom, Direction::None)
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Move the block's far edges while an edit is in progress.
    pub fn grow(&mut self, id: BlockId, rows: isize, cols: isize) {
        let block = &mut self.blocks[id.0];
        block.bottom = block.bottom.saturating_add_signed(rows).max(block.top);
        block.right = block.right.saturating_add_signed(cols).max(block.left);
    }

    /// Number of ancestors; the root is at depth 0.
    pub fn depth(&self, id: BlockId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).parent;
        }
        depth
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
