use crate::codec;
use crate::error::{Result, VectorStoreError};
use crate::index::VectorIndex;
use crate::types::Neighbor;
use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Exact nearest-neighbor index under squared Euclidean distance.
///
/// Vectors live in one row-major `N x D` matrix; row `i` is position `i`.
/// Search scans every row and keeps the `k` best in a bounded max-heap, so a
/// query costs O(N·D + N log k).
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    vectors: Array2<f32>,
}

impl FlatL2Index {
    fn from_rows(dimension: usize, count: usize, values: Vec<f32>) -> Result<Self> {
        let vectors = Array2::from_shape_vec((count, dimension), values)
            .map_err(|e| VectorStoreError::corrupt(format!("matrix shape error: {e}")))?;
        Ok(Self { vectors })
    }
}

impl VectorIndex for FlatL2Index {
    fn build(embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = embeddings
            .first()
            .map(Vec::len)
            .ok_or(VectorStoreError::EmptyInput)?;

        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let count = embeddings.len();
        let values: Vec<f32> = embeddings.into_iter().flatten().collect();
        let index = Self::from_rows(dimension, count, values)?;
        log::debug!("Built flat L2 index: {count} vectors, dimension {dimension}");
        Ok(index)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension() {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut best: BinaryHeap<Ranked> = BinaryHeap::with_capacity(k);
        for (position, row) in self.vectors.outer_iter().enumerate() {
            let candidate = Ranked(Neighbor::new(position, squared_l2(row, query)));
            if best.len() < k {
                best.push(candidate);
            } else if let Some(mut worst) = best.peek_mut() {
                if candidate < *worst {
                    *worst = candidate;
                }
            }
        }

        Ok(best.into_sorted_vec().into_iter().map(|r| r.0).collect())
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let values: Vec<f32> = self.vectors.iter().copied().collect();
        codec::encode(self.dimension(), self.len(), &values)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (dimension, count, values) = codec::decode(bytes)?;
        if count == 0 {
            return Err(VectorStoreError::corrupt("artifact holds zero vectors"));
        }
        Self::from_rows(dimension, count, values)
    }
}

fn squared_l2(row: ArrayView1<'_, f32>, query: &[f32]) -> f32 {
    row.iter()
        .zip(query)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

/// Heap entry ordered by [`Neighbor::rank_cmp`]; the heap top is the worst kept hit.
struct Ranked(Neighbor);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}
