use std::cmp::Ordering;

/// One search hit: a stored position and its squared Euclidean distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    #[must_use]
    pub const fn new(position: usize, distance: f32) -> Self {
        Self { position, distance }
    }

    /// Total order used for ranking: nearer first, then lower position.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}
