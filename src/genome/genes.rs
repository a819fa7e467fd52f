use serde::{Deserialize, Serialize};

/// One connection gene. Node ids are implicit in the source and target; the
/// innovation id identifies the `(source, target)` structure across the whole
/// population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub innovation: usize,
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

/// A genome's connectivity: connection genes in strictly ascending innovation
/// id order, no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGenes(Vec<ConnectionGene>);

impl ConnectionGenes {
    pub fn from_vec(mut genes: Vec<ConnectionGene>) -> Self {
        genes.sort_unstable_by_key(|g| g.innovation);
        debug_assert!(
            genes.windows(2).all(|w| w[0].innovation < w[1].innovation),
            "duplicate innovation id in gene array"
        );
        ConnectionGenes(genes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ConnectionGene] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> &ConnectionGene {
        &self.0[idx]
    }

    pub fn contains_pair(&self, source: usize, target: usize) -> bool {
        self.0.iter().any(|g| g.source == source && g.target == target)
    }

    /// Fills `buf` with the `(source, target)` pairs sorted by source id
    /// (ties by target), the layout the edge cycle test walks.
    pub fn fill_sorted_pairs(&self, buf: &mut Vec<(usize, usize)>) {
        buf.clear();
        buf.extend(self.0.iter().map(|g| (g.source, g.target)));
        buf.sort_unstable();
    }

    /// Largest node id referenced by any gene.
    pub fn max_node_id(&self) -> Option<usize> {
        self.0.iter().map(|g| g.source.max(g.target)).max()
    }
}

impl<'a> IntoIterator for &'a ConnectionGenes {
    type Item = &'a ConnectionGene;
    type IntoIter = std::slice::Iter<'a, ConnectionGene>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
