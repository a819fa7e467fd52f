use std::collections::HashSet;

use crate::genome::{ConnectionGene, ConnectionGenes};
use crate::graph::EdgeCycleTest;

/// Accumulates proposed genes for one child genome.
///
/// Tracks the `(source, target)` pairs already admitted so duplicates are
/// rejected, and, when the model is acyclic, keeps a source-sorted pair list
/// so secondary genes can be cycle-tested before admission. The builder is
/// cleared and reused across calls to amortise its allocations.
pub struct GeneListBuilder {
    genes: Vec<ConnectionGene>,
    pairs: HashSet<(usize, usize)>,
    sorted_pairs: Vec<(usize, usize)>,
    cycle_test: EdgeCycleTest,
    acyclic: bool,
}

impl GeneListBuilder {
    pub fn new() -> Self {
        GeneListBuilder {
            genes: Vec::new(),
            pairs: HashSet::new(),
            sorted_pairs: Vec::new(),
            cycle_test: EdgeCycleTest::new(),
            acyclic: false,
        }
    }

    pub fn begin(&mut self, acyclic: bool) {
        self.genes.clear();
        self.pairs.clear();
        self.sorted_pairs.clear();
        self.acyclic = acyclic;
    }

    /// Admits a gene whose structure is already known to be consistent with
    /// the accumulated set (it comes from the primary parent, or matches a
    /// pair the primary parent carries). Duplicate pairs are still rejected.
    pub fn add(&mut self, gene: ConnectionGene) -> bool {
        if !self.pairs.insert((gene.source, gene.target)) {
            return false;
        }
        self.push(gene);
        true
    }

    /// Admits a gene taken from the secondary parent only if its pair is new
    /// and, for acyclic models, it does not close a cycle.
    pub fn try_add_secondary(&mut self, gene: ConnectionGene) -> bool {
        if self.pairs.contains(&(gene.source, gene.target)) {
            return false;
        }
        if self.acyclic
            && self
                .cycle_test
                .would_cycle(&self.sorted_pairs, gene.source, gene.target)
        {
            return false;
        }
        self.pairs.insert((gene.source, gene.target));
        self.push(gene);
        true
    }

    fn push(&mut self, gene: ConnectionGene) {
        if self.acyclic {
            let pair = (gene.source, gene.target);
            let at = self.sorted_pairs.partition_point(|&p| p < pair);
            self.sorted_pairs.insert(at, pair);
        }
        self.genes.push(gene);
    }

    /// Finishes the child: the accumulated genes sorted by innovation id.
    pub fn take(&mut self) -> ConnectionGenes {
        ConnectionGenes::from_vec(std::mem::take(&mut self.genes))
    }
}

impl Default for GeneListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(innovation: usize, source: usize, target: usize) -> ConnectionGene {
        ConnectionGene {
            innovation,
            source,
            target,
            weight: 1.0,
        }
    }

    #[test]
    fn duplicate_pairs_are_rejected() {
        let mut b = GeneListBuilder::new();
        b.begin(false);
        assert!(b.add(gene(0, 1, 2)));
        // same pair under a different innovation id
        assert!(!b.add(gene(9, 1, 2)));
        assert!(!b.try_add_secondary(gene(9, 1, 2)));
        assert_eq!(b.take().len(), 1);
    }

    #[test]
    fn secondary_gene_closing_a_cycle_is_dropped() {
        let mut b = GeneListBuilder::new();
        b.begin(true);
        b.add(gene(0, 1, 5));
        b.add(gene(1, 5, 6));
        assert!(!b.try_add_secondary(gene(2, 6, 1)));
        assert!(b.try_add_secondary(gene(3, 1, 6)));
        let genes = b.take();
        assert_eq!(genes.len(), 3);
        // reuse after take
        b.begin(true);
        assert!(b.try_add_secondary(gene(2, 6, 1)));
    }

    #[test]
    fn output_is_sorted_by_innovation_id() {
        let mut b = GeneListBuilder::new();
        b.begin(false);
        b.add(gene(5, 1, 2));
        b.add(gene(1, 2, 3));
        b.add(gene(3, 1, 3));
        let ids: Vec<usize> = b.take().iter().map(|g| g.innovation).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
