// ============================================================
// Layer 4 — Feature Generators
// ============================================================
// Pure functions `&str -> Vec<f64>` that compute auxiliary
// per-molecule features, looked up by name from a fixed
// registry:
//
//   morgan        2048-bit hashed circular fingerprint, radius 2
//   morgan_count  same environments, counted instead of set
//   rdkit_2d      fixed-order vector of graph descriptors
//
// The circular fingerprint follows the Morgan scheme over the
// AtomGraph: every atom starts with an identifier hashed from
// its element, degree, aromaticity and charge; each round
// rehashes an atom's identifier together with the sorted
// identifiers of its neighbours. All identifiers from rounds
// 0..=radius are folded into the bit vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::data::smiles::AtomGraph;
use crate::domain::error::{DataError, DataResult};

/// A feature generator: SMILES in, feature vector out.
pub type FeaturesGenerator = fn(&str) -> Vec<f64>;

pub const MORGAN_NUM_BITS: usize = 2048;
pub const MORGAN_RADIUS: usize   = 2;

/// Names accepted by `resolve`, in registry order.
pub const GENERATOR_NAMES: [&str; 3] = ["morgan", "morgan_count", "rdkit_2d"];

/// Descriptor names, aligned with the output of `rdkit_2d_features`.
pub const DESCRIPTOR_NAMES: [&str; 23] = [
    "num_atoms", "num_bonds", "num_ring_closures", "num_fragments",
    "num_aromatic_atoms", "num_heteroatoms", "num_halogens", "num_charged_atoms",
    "num_double_bonds", "num_triple_bonds", "mean_degree", "max_degree",
    "fraction_aromatic",
    "count_C", "count_N", "count_O", "count_S", "count_P",
    "count_F", "count_Cl", "count_Br", "count_I", "count_B",
];

const COUNTED_ELEMENTS: [&str; 10] = ["C", "N", "O", "S", "P", "F", "Cl", "Br", "I", "B"];

/// Look up a generator by name.
pub fn resolve(name: &str) -> DataResult<FeaturesGenerator> {
    match name {
        "morgan"       => Ok(morgan_fingerprint),
        "morgan_count" => Ok(morgan_count_fingerprint),
        "rdkit_2d"     => Ok(rdkit_2d_features),
        other => Err(DataError::UnsupportedFeaturesGenerator(other.to_string())),
    }
}

/// Run every named generator and concatenate the outputs in order.
pub fn generate(names: &[String], smiles: &str) -> DataResult<Vec<f64>> {
    let mut features = Vec::new();
    for name in names {
        let generator = resolve(name)?;
        features.extend(generator(smiles));
    }
    Ok(features)
}

// ─── Morgan fingerprints ──────────────────────────────────────────────────────
pub fn morgan_fingerprint(smiles: &str) -> Vec<f64> {
    circular_fingerprint(smiles, MORGAN_RADIUS, MORGAN_NUM_BITS, false)
}

pub fn morgan_count_fingerprint(smiles: &str) -> Vec<f64> {
    circular_fingerprint(smiles, MORGAN_RADIUS, MORGAN_NUM_BITS, true)
}

fn hash_of<T: Hash>(value: T) -> u64 {
    let mut h = DefaultHasher::new();
    value.hash(&mut h);
    h.finish()
}

fn circular_fingerprint(smiles: &str, radius: usize, num_bits: usize, use_counts: bool) -> Vec<f64> {
    let graph = AtomGraph::parse(smiles);
    let mut bits = vec![0.0; num_bits];

    let mut ids: Vec<u64> = graph
        .atoms()
        .iter()
        .enumerate()
        .map(|(i, a)| hash_of((&a.element, graph.degree(i), a.aromatic, a.charged)))
        .collect();

    let fold = |ids: &[u64], bits: &mut [f64]| {
        for &id in ids {
            let slot = (id % num_bits as u64) as usize;
            if use_counts {
                bits[slot] += 1.0;
            } else {
                bits[slot] = 1.0;
            }
        }
    };

    fold(&ids, &mut bits);
    for round in 1..=radius {
        ids = (0..ids.len())
            .map(|i| {
                let mut env: Vec<u64> = graph.neighbors()[i].iter().map(|&n| ids[n]).collect();
                env.sort_unstable();
                hash_of((round, ids[i], env))
            })
            .collect();
        fold(&ids, &mut bits);
    }

    bits
}

// ─── Graph descriptors ────────────────────────────────────────────────────────
pub fn rdkit_2d_features(smiles: &str) -> Vec<f64> {
    let graph = AtomGraph::parse(smiles);
    let atoms = graph.atoms();
    let n     = atoms.len();

    let elements: Vec<String> = atoms.iter().map(|a| a.canonical_element()).collect();
    let count = |pred: &dyn Fn(usize) -> bool| (0..n).filter(|&i| pred(i)).count() as f64;

    let aromatic   = count(&|i| atoms[i].aromatic);
    let hetero     = count(&|i| !matches!(elements[i].as_str(), "C" | "H" | "*" | ""));
    let halogens   = count(&|i| matches!(elements[i].as_str(), "F" | "Cl" | "Br" | "I"));
    let charged    = count(&|i| atoms[i].charged);
    let max_degree = (0..n).map(|i| graph.degree(i)).max().unwrap_or(0) as f64;
    let mean_degree = if n == 0 { 0.0 } else { 2.0 * graph.num_bonds() as f64 / n as f64 };
    let frac_arom   = if n == 0 { 0.0 } else { aromatic / n as f64 };

    let mut out = vec![
        n as f64,
        graph.num_bonds() as f64,
        graph.ring_closures() as f64,
        graph.fragments() as f64,
        aromatic,
        hetero,
        halogens,
        charged,
        graph.double_bonds() as f64,
        graph.triple_bonds() as f64,
        mean_degree,
        max_degree,
        frac_arom,
    ];
    out.extend(
        COUNTED_ELEMENTS
            .iter()
            .map(|el| elements.iter().filter(|e| e.as_str() == *el).count() as f64),
    );
    out
}
