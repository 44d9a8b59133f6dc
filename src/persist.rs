//! Flat binary serialization of a tree.
//!
//! The payload is the scalar header followed by every node array, little
//! endian, with no framing or padding; array lengths are implied by the
//! header:
//!
//! ```text
//! Offset  Size            Field
//! ------  ----            -----
//! 0       2               tree_depth (u16)
//! 2       2               n_y_labels (u16)
//! 4       2               max_n_surr (u16)
//! 6       1               is_regression (u8, 0|1)
//! 7       1               impurity_type (u8)
//! 8       4*n             feature_indices (i32)
//! .       8*n             feature_thresholds (f64)
//! .       1*n             is_categorical (u8)
//! .       8*2n            nonnull_split_count (f64)
//! .       4*n*s           surr_indices (i32)
//! .       8*n*s           surr_thresholds (f64)
//! .       4*n*s           surr_status (i32)
//! .       4*n*s           surr_agreement (i32)
//! .       8*n*labels      predictions (f64)
//! ```
//!
//! with `n = 2^tree_depth - 1` and `s = max_n_surr`. The signed surrogate
//! status convention survives the round trip unchanged.

use thiserror::Error;

use crate::repr::node::n_nodes_for_depth;
use crate::repr::tree::DecisionTree;
use crate::training::impurity::ImpurityKind;

/// Size of the scalar header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Depths above this would overflow the node-count arithmetic long before
/// any realistic tree reaches them.
const MAX_DEPTH: u16 = 48;

/// Errors raised while decoding a serialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer truncated: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after the tree payload")]
    TrailingBytes(usize),

    #[error("tree depth {0} is out of range")]
    InvalidDepth(u16),

    #[error("unknown impurity code {0}")]
    InvalidImpurity(u8),

    #[error("invalid boolean flag {0}")]
    InvalidFlag(u8),
}

// =============================================================================
// Encoding
// =============================================================================

/// Serialize a tree into the flat layout.
pub fn to_bytes(tree: &DecisionTree) -> Vec<u8> {
    let arrays = tree.raw_arrays();
    let n_nodes = tree.n_nodes();
    let n_surr = n_nodes * tree.max_n_surr() as usize;
    let capacity = HEADER_SIZE
        + n_nodes * (4 + 8 + 1 + 16)
        + n_surr * (4 + 8 + 4 + 4)
        + arrays.predictions.len() * 8;
    let mut out = Vec::with_capacity(capacity);

    out.extend_from_slice(&tree.depth().to_le_bytes());
    out.extend_from_slice(&tree.n_y_labels().to_le_bytes());
    out.extend_from_slice(&tree.max_n_surr().to_le_bytes());
    out.push(u8::from(tree.is_regression()));
    out.push(tree.impurity_kind().to_code());

    write_i32s(&mut out, arrays.feature_indices);
    write_f64s(&mut out, arrays.feature_thresholds);
    out.extend_from_slice(arrays.is_categorical);
    write_f64s(&mut out, arrays.nonnull_split_count);
    write_i32s(&mut out, arrays.surr_indices);
    write_f64s(&mut out, arrays.surr_thresholds);
    write_i32s(&mut out, arrays.surr_status);
    write_i32s(&mut out, arrays.surr_agreement);
    write_f64s(&mut out, arrays.predictions);

    out
}

fn write_i32s(out: &mut Vec<u8>, values: &[i32]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_f64s(out: &mut Vec<u8>, values: &[f64]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Deserialize a tree from the flat layout.
pub fn from_bytes(bytes: &[u8]) -> Result<DecisionTree, DecodeError> {
    let mut reader = Reader { bytes, offset: 0 };

    let tree_depth = reader.read_u16()?;
    let n_y_labels = reader.read_u16()?;
    let max_n_surr = reader.read_u16()?;
    let is_regression = match reader.read_u8()? {
        0 => false,
        1 => true,
        flag => return Err(DecodeError::InvalidFlag(flag)),
    };
    let impurity_code = reader.read_u8()?;
    let impurity = ImpurityKind::from_code(impurity_code)
        .ok_or(DecodeError::InvalidImpurity(impurity_code))?;
    if tree_depth == 0 || tree_depth > MAX_DEPTH {
        return Err(DecodeError::InvalidDepth(tree_depth));
    }

    let n_nodes = n_nodes_for_depth(tree_depth);
    let n_surr = n_nodes * max_n_surr as usize;
    let n_labels = if is_regression {
        n_y_labels as usize
    } else {
        n_y_labels as usize + 1
    };

    let feature_indices = reader.read_i32s(n_nodes)?;
    let feature_thresholds = reader.read_f64s(n_nodes)?;
    let is_categorical = reader.read_u8s(n_nodes)?;
    let nonnull_split_count = reader.read_f64s(n_nodes * 2)?;
    let surr_indices = reader.read_i32s(n_surr)?;
    let surr_thresholds = reader.read_f64s(n_surr)?;
    let surr_status = reader.read_i32s(n_surr)?;
    let surr_agreement = reader.read_i32s(n_surr)?;
    let predictions = reader.read_f64s(n_nodes * n_labels)?;

    let remaining = bytes.len() - reader.offset;
    if remaining != 0 {
        return Err(DecodeError::TrailingBytes(remaining));
    }

    Ok(DecisionTree::from_parts(
        tree_depth,
        n_y_labels,
        max_n_surr,
        is_regression,
        impurity,
        feature_indices,
        feature_thresholds,
        is_categorical,
        nonnull_split_count,
        surr_indices,
        surr_thresholds,
        surr_status,
        surr_agreement,
        predictions,
    ))
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        let remaining = self.bytes.len() - self.offset;
        if remaining < n {
            return Err(DecodeError::Truncated { needed: n - remaining, remaining });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u8s(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(count)?.to_vec())
    }

    fn read_i32s(&mut self, count: usize) -> Result<Vec<i32>, DecodeError> {
        let bytes = self.take(count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn read_f64s(&mut self, count: usize) -> Result<Vec<f64>, DecodeError> {
        let bytes = self.take(count * 8)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|chunk| {
                f64::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ])
            })
            .collect())
    }
}
