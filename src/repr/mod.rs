//! Tree representation: per-node codes and the flat-array store.

pub mod node;
pub mod tree;

pub use node::{
    false_child, parent, true_child, NodeKind, SurrStatus, FINISHED_LEAF, IN_PROCESS_LEAF,
    NODE_NON_EXISTING, SURR_NON_EXISTING,
};
pub use tree::{DecisionTree, SurrogateSplit, TreeError};
