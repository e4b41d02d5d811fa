// ============================================================
// Layer 4 — Atom Mask Generator
// ============================================================
// Chooses which atoms are hidden from the model in masked
// self-supervised ("BERT-style") pretraining.
//
// Output convention: one u8 per atom, aligned with atom index.
//   1 = visible
//   0 = masked, the model must predict this atom's vocab index
//
// Policies:
//
//   cluster      Pop atoms from the unprocessed set one at a time.
//                Each popped atom forms a cluster with its direct
//                neighbours; with probability p / cluster_size the
//                whole cluster is masked and the neighbours leave
//                the set. Dividing by the cluster size keeps the
//                per-atom masking rate close to p in dense regions.
//
//   correlation  I.i.d. mask with probability p, then a number of
//                passes that copy a random neighbour's value onto
//                a random atom, pulling neighbours towards agreement.
//
//   random       I.i.d. Bernoulli(p) per atom.
//
// Every policy guarantees at least one 0 whenever the molecule
// has at least one atom.

use std::collections::BTreeSet;

use rand::Rng;

use crate::domain::config::MaskPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskGenerator {
    pub policy:             MaskPolicy,
    pub probability:        f64,
    /// Neighbour-copy passes for the correlation policy; None = number of atoms.
    pub correlation_passes: Option<usize>,
}

impl MaskGenerator {
    pub fn new(policy: MaskPolicy, probability: f64) -> Self {
        Self { policy, probability, correlation_passes: None }
    }

    pub fn with_correlation_passes(mut self, passes: Option<usize>) -> Self {
        self.correlation_passes = passes;
        self
    }

    /// Generate a mask for a molecule whose adjacency is `neighbors`.
    pub fn generate<R: Rng + ?Sized>(&self, neighbors: &[Vec<usize>], rng: &mut R) -> Vec<u8> {
        let num_atoms = neighbors.len();
        if num_atoms == 0 {
            return Vec::new();
        }

        let mut mask = match self.policy {
            MaskPolicy::Cluster     => self.cluster(neighbors, rng),
            MaskPolicy::Correlation => self.correlation(neighbors, rng),
            MaskPolicy::Random      => self.bernoulli(num_atoms, rng),
        };

        if mask.iter().all(|&m| m == 1) {
            let atom = rng.gen_range(0..num_atoms);
            match self.policy {
                MaskPolicy::Cluster => mask_cluster(&mut mask, atom, &neighbors[atom]),
                _ => mask[atom] = 0,
            }
        }

        mask
    }

    fn bernoulli<R: Rng + ?Sized>(&self, num_atoms: usize, rng: &mut R) -> Vec<u8> {
        (0..num_atoms)
            .map(|_| if rng.gen::<f64>() > self.probability { 1 } else { 0 })
            .collect()
    }

    fn cluster<R: Rng + ?Sized>(&self, neighbors: &[Vec<usize>], rng: &mut R) -> Vec<u8> {
        let mut mask = vec![1u8; neighbors.len()];
        let mut remaining: BTreeSet<usize> = (0..neighbors.len()).collect();

        while let Some(atom) = remaining.pop_first() {
            let cluster_size = 1 + neighbors[atom].len();
            if rng.gen::<f64>() < self.probability / cluster_size as f64 {
                mask_cluster(&mut mask, atom, &neighbors[atom]);
                for n in &neighbors[atom] {
                    remaining.remove(n);
                }
            }
        }

        mask
    }

    fn correlation<R: Rng + ?Sized>(&self, neighbors: &[Vec<usize>], rng: &mut R) -> Vec<u8> {
        let num_atoms = neighbors.len();
        let mut mask = self.bernoulli(num_atoms, rng);

        let passes = self.correlation_passes.unwrap_or(num_atoms);
        for _ in 0..passes {
            let atom = rng.gen_range(0..num_atoms);
            // single-atom fragments have no neighbours
            if neighbors[atom].is_empty() {
                continue;
            }
            let nbr = neighbors[atom][rng.gen_range(0..neighbors[atom].len())];
            mask[atom] = mask[nbr];
        }

        mask
    }
}

fn mask_cluster(mask: &mut [u8], atom: usize, neighbors: &[usize]) {
    mask[atom] = 0;
    for &n in neighbors {
        mask[n] = 0;
    }
}
