use crate::genome::Genome;

/// Sparse gene vector: `(innovation id, weight)` pairs in ascending id
/// order. Genomes and species centroids share this shape.
pub type GeneVec = Vec<(usize, f64)>;

pub fn gene_vec(genome: &Genome) -> GeneVec {
    genome
        .genes
        .iter()
        .map(|g| (g.innovation, g.weight))
        .collect()
}

/// Distance between two gene vectors; genes missing on one side count as
/// weight zero.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &[(usize, f64)], b: &[(usize, f64)]) -> f64;
}

/// Manhattan distance over innovation-aligned weights, with separate
/// coefficients for matching genes, disjoint genes (inside the other
/// vector's innovation span) and excess genes (beyond it). The default
/// coefficients of 1 reduce it to a plain Manhattan distance.
#[derive(Debug, Clone, Copy)]
pub struct ManhattanDistance {
    pub matching_coef: f64,
    pub disjoint_coef: f64,
    pub excess_coef: f64,
}

impl Default for ManhattanDistance {
    fn default() -> Self {
        ManhattanDistance {
            matching_coef: 1.0,
            disjoint_coef: 1.0,
            excess_coef: 1.0,
        }
    }
}

impl DistanceMetric for ManhattanDistance {
    fn distance(&self, a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
        let mut total = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (ia, wa) = a[i];
            let (ib, wb) = b[j];
            if ia == ib {
                total += self.matching_coef * (wa - wb).abs();
                i += 1;
                j += 1;
            } else if ia < ib {
                total += self.disjoint_coef * wa.abs();
                i += 1;
            } else {
                total += self.disjoint_coef * wb.abs();
                j += 1;
            }
        }
        // whatever remains lies beyond the other vector's innovation span
        for &(_, w) in &a[i..] {
            total += self.excess_coef * w.abs();
        }
        for &(_, w) in &b[j..] {
            total += self.excess_coef * w.abs();
        }
        total
    }
}
