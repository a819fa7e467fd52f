//! Genetic k-means speciation.

mod distance;
mod kmeans;

pub use distance::{gene_vec, DistanceMetric, GeneVec, ManhattanDistance};
pub use kmeans::{centroid, Speciation};

/// A cluster of genomes sharing a centroid. Members are indices into the
/// population's genome arena and are rebuilt by k-means each generation.
#[derive(Debug, Clone)]
pub struct Species {
    pub id: usize,
    pub centroid: GeneVec,
    pub members: Vec<usize>,
}
