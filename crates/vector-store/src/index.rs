use crate::error::Result;
use crate::types::Neighbor;

/// Nearest-neighbor index over embeddings addressed by position.
///
/// Positions are the order in which embeddings were passed to [`VectorIndex::build`].
/// Implementations never expose the stored vectors, only distance-ranked search,
/// so an approximate structure can replace the exact one without touching callers.
pub trait VectorIndex: Send + Sync + Sized {
    /// Build from embeddings in position order.
    ///
    /// Fails with `EmptyInput` on an empty sequence and `DimensionMismatch` when
    /// any two embeddings differ in length.
    fn build(embeddings: Vec<Vec<f32>>) -> Result<Self>;

    /// Up to `k` nearest neighbors, nearest first, ties broken by lower position.
    ///
    /// `k` larger than [`VectorIndex::len`] returns every stored position; `k == 0`
    /// returns nothing.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Number of stored embeddings
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality every stored embedding shares
    fn dimension(&self) -> usize;

    /// Serialize into the vector-index artifact
    fn to_bytes(&self) -> Vec<u8>;

    /// Decode a vector-index artifact; any inconsistency is `CorruptData`
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}
