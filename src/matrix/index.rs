//! Index tables: variable columns and expression row offsets.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{CanonError, Result};
use crate::linop::{LinOp, VarId};

/// Mapping from variable IDs to their first column in the output matrix.
#[derive(Debug, Clone, Default)]
pub struct IdToCol {
    cols: HashMap<VarId, usize>,
}

impl IdToCol {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (variable_id, column) pairs, rejecting repeated ids.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (VarId, usize)>) -> Result<Self> {
        let mut table = IdToCol::new();
        for (id, col) in pairs {
            table.insert(id, col)?;
        }
        Ok(table)
    }

    /// Build from host-style entries whose keys are decimal variable ids.
    pub fn from_named<'s>(entries: impl IntoIterator<Item = (&'s str, usize)>) -> Result<Self> {
        let mut table = IdToCol::new();
        for (name, col) in entries {
            let raw: u64 = name
                .parse()
                .map_err(|_| CanonError::InvalidVariableName(name.to_string()))?;
            table.insert(VarId::new(raw), col)?;
        }
        Ok(table)
    }

    /// Register a variable's first column. A repeated id is rejected and
    /// leaves the table unchanged.
    pub fn insert(&mut self, id: VarId, col: usize) -> Result<()> {
        if self.cols.contains_key(&id) {
            return Err(CanonError::DuplicateVariable(id));
        }
        self.cols.insert(id, col);
        Ok(())
    }

    /// Column of a variable, if known.
    pub fn get(&self, id: VarId) -> Option<usize> {
        self.cols.get(&id).copied()
    }

    /// Column of a variable referenced while lowering root `expr`.
    pub fn resolve_column(&self, id: VarId, expr: usize) -> Result<usize> {
        self.get(id)
            .ok_or(CanonError::UnknownVariable { id, expr })
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Iterate over (variable_id, column) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, usize)> + '_ {
        self.cols.iter().map(|(id, col)| (*id, *col))
    }

    /// Fail if the column ranges `[col, col + width)` of two variables overlap.
    ///
    /// Variables missing from the table are ignored.
    pub fn validate_ranges(&self, widths: &BTreeMap<VarId, usize>) -> Result<()> {
        let mut ranges: Vec<(usize, usize, VarId)> = widths
            .iter()
            .filter(|(_, width)| **width > 0)
            .filter_map(|(id, width)| self.get(*id).map(|col| (col, *width, *id)))
            .collect();
        ranges.sort();

        for pair in ranges.windows(2) {
            let (col, width, first) = pair[0];
            let (next_col, _, second) = pair[1];
            if col + width > next_col {
                return Err(CanonError::OverlappingColumns { first, second });
            }
        }
        Ok(())
    }

    /// Number of columns spanned by the given variables: `max(col + width)`.
    pub fn column_count(&self, widths: &BTreeMap<VarId, usize>) -> usize {
        widths
            .iter()
            .filter_map(|(id, width)| self.get(*id).map(|col| col + width))
            .max()
            .unwrap_or(0)
    }
}

/// How row offsets were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetMode {
    /// Roots stacked one after another from row 0.
    Contiguous,
    /// Caller-supplied offset per root.
    Explicit,
}

impl OffsetMode {
    /// Short name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetMode::Contiguous => "contiguous",
            OffsetMode::Explicit => "explicit",
        }
    }
}

/// Starting row of each root expression.
#[derive(Debug, Clone)]
pub struct RowOffsets {
    offsets: Vec<usize>,
    mode: OffsetMode,
}

impl RowOffsets {
    /// Stack roots contiguously in order, each taking its flattened size.
    pub fn contiguous(roots: &[Arc<LinOp>]) -> Self {
        let mut offsets = Vec::with_capacity(roots.len());
        let mut next = 0;
        for root in roots {
            offsets.push(next);
            next += root.shape().size();
        }
        RowOffsets {
            offsets,
            mode: OffsetMode::Contiguous,
        }
    }

    /// Use caller-supplied offsets.
    pub fn explicit(offsets: &[usize]) -> Self {
        RowOffsets {
            offsets: offsets.to_vec(),
            mode: OffsetMode::Explicit,
        }
    }

    /// Starting row of root `expr_index`.
    pub fn resolve_row(&self, expr_index: usize) -> Result<usize> {
        self.offsets
            .get(expr_index)
            .copied()
            .ok_or(CanonError::IndexOutOfRange {
                index: expr_index,
                len: self.offsets.len(),
            })
    }

    /// How the offsets were obtained.
    pub fn mode(&self) -> OffsetMode {
        self.mode
    }

    /// Number of offsets in the table.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
