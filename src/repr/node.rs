//! Per-node codes: sentinels, heap-index arithmetic, surrogate status.
//!
//! A tree is stored as parallel flat arrays indexed as a left-balanced
//! binary heap. The `feature_indices` array doubles as the node-state
//! marker: non-negative values are split feature indices, negative values
//! are the sentinels below.

/// Slot is allocated but holds no node.
pub const NODE_NON_EXISTING: i32 = -1;

/// Leaf scheduled for expansion on the next statistics pass.
pub const IN_PROCESS_LEAF: i32 = -2;

/// Terminal leaf.
pub const FINISHED_LEAF: i32 = -3;

/// Unused surrogate slot.
pub const SURR_NON_EXISTING: i32 = -1;

/// Decoded state of a node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Internal node splitting on the given feature index.
    Split(usize),
    /// Leaf awaiting expansion.
    InProcessLeaf,
    /// Terminal leaf.
    FinishedLeaf,
    /// Unused slot.
    NonExisting,
}

impl NodeKind {
    /// Decode a `feature_indices` entry.
    #[inline]
    pub fn from_code(code: i32) -> Self {
        match code {
            IN_PROCESS_LEAF => NodeKind::InProcessLeaf,
            FINISHED_LEAF => NodeKind::FinishedLeaf,
            NODE_NON_EXISTING => NodeKind::NonExisting,
            f => {
                debug_assert!(f >= 0, "unknown node code {f}");
                NodeKind::Split(f as usize)
            }
        }
    }

    /// True for either leaf sentinel.
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::InProcessLeaf | NodeKind::FinishedLeaf)
    }
}

// =============================================================================
// Heap arithmetic
// =============================================================================

/// Child taken when the split condition holds.
#[inline]
pub fn true_child(node: usize) -> usize {
    2 * node + 1
}

/// Child taken when the split condition fails.
#[inline]
pub fn false_child(node: usize) -> usize {
    2 * node + 2
}

/// Parent of a non-root node.
#[inline]
pub fn parent(node: usize) -> usize {
    debug_assert!(node > 0, "root has no parent");
    (node - 1) / 2
}

/// Number of slots in a tree of the given depth (depth is 1-based).
#[inline]
pub fn n_nodes_for_depth(depth: u16) -> usize {
    (1usize << depth) - 1
}

// =============================================================================
// Surrogate status codec
// =============================================================================

/// Decoded surrogate status.
///
/// The stored code packs the feature type into the magnitude (1 =
/// categorical, 2 = continuous) and the split direction into the sign:
/// positive means `x <= t` agrees with the primary true branch, negative
/// means the reverse split `x > t` agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurrStatus {
    pub is_categorical: bool,
    pub is_reverse: bool,
}

impl SurrStatus {
    /// Encode into the signed status code.
    #[inline]
    pub fn encode(self) -> i32 {
        let magnitude = if self.is_categorical { 1 } else { 2 };
        if self.is_reverse {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Decode a status code; `None` for zero (unset slot).
    #[inline]
    pub fn decode(code: i32) -> Option<Self> {
        match code {
            0 => None,
            c => Some(SurrStatus {
                is_categorical: c.abs() == 1,
                is_reverse: c < 0,
            }),
        }
    }
}
