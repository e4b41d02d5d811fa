// ============================================================
// Layer 4 — Molecule Dataset
// ============================================================
// An ordered collection of MoleculeDatapoints plus the state
// shared across them:
//   - the fitted feature scaler
//   - flags derived from the first datapoint (self-supervised,
//     feature width); datasets are assumed homogeneous
//   - a seeded RNG for shuffling and mask regeneration
//
// Self-supervised datasets are initialised in bulk by
// bert_init once the corpus-wide vocabulary exists. Each
// datapoint is an independent task: it gets its own copy of the
// config and its own RNG seeded from the dataset RNG, so the
// rayon and sequential paths produce identical masks.
//
// Implements burn's Dataset trait so a DataLoader can index it.

use std::sync::Arc;

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuildError};

use crate::data::{datapoint::MoleculeDatapoint, scaler::StandardScaler};
use crate::domain::{
    config::DataConfig,
    error::{DataError, DataResult},
    labels::Targets,
    traits::Vocabulary,
};
use crate::infra::vocab_store::AtomVocab;

/// Replacement for NaN features after scaling.
const SCALER_NAN_TOKEN: f64 = 0.0;

/// What `MoleculeDataset::targets` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetTargets {
    /// One entry per datapoint.
    PerDatapoint(Vec<Targets>),
    /// Per-datapoint features plus every datapoint's atom vocabulary
    /// targets concatenated in dataset order.
    SelfSupervised {
        features: Vec<Option<Vec<f64>>>,
        vocab:    Vec<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct MoleculeDataset {
    data:            Vec<MoleculeDatapoint>,
    scaler:          Option<StandardScaler>,
    self_supervised: bool,
    features_size:   Option<usize>,
    rng:             StdRng,
}

impl MoleculeDataset {
    /// Create a dataset with an entropy-seeded RNG.
    pub fn new(data: Vec<MoleculeDatapoint>) -> Self {
        Self::from_parts(data, StdRng::from_entropy())
    }

    /// Create a dataset whose shuffles and masks are reproducible.
    pub fn with_seed(data: Vec<MoleculeDatapoint>, seed: u64) -> Self {
        Self::from_parts(data, StdRng::seed_from_u64(seed))
    }

    fn from_parts(data: Vec<MoleculeDatapoint>, rng: StdRng) -> Self {
        let self_supervised = data.first().is_some_and(|d| d.is_self_supervised());
        let features_size   = data.first().and_then(|d| d.features.as_ref()).map(Vec::len);
        Self { data, scaler: None, self_supervised, features_size, rng }
    }

    // ── Self-supervised initialisation ───────────────────────────────────────

    /// Determine the vocabulary if needed, then build every datapoint's
    /// atom targets and first mask.
    ///
    /// Records `vocab` and `features_size` into `config` when they are not
    /// already set. `vocab_output_size` always describes the vocabulary
    /// that was built or loaded here.
    pub fn bert_init(&mut self, config: &mut DataConfig) -> DataResult<()> {
        if !self.data.is_empty() && !self.self_supervised {
            return Err(DataError::NotSelfSupervised("bert_init"));
        }

        if config.vocab.is_none() {
            tracing::debug!("Determining vocab");
            let checkpoint = config.checkpoint_paths.as_ref().and_then(|p| p.first());
            let vocab = match checkpoint {
                Some(path) => AtomVocab::load(path)?,
                None       => AtomVocab::build(&self.smiles())?,
            };
            config.vocab_output_size = Some(vocab.output_size());
            config.vocab = Some(Arc::new(vocab) as Arc<dyn Vocabulary>);
        }
        if config.vocab_output_size.is_none() {
            config.vocab_output_size = config.vocab.as_ref().map(|v| v.output_size());
        }
        tracing::debug!("Vocab/Output size = {:?}", config.vocab_output_size);

        if config.features_size.is_none() {
            config.features_size = self.features_size;
        }

        let seeds: Vec<u64> = (0..self.data.len()).map(|_| self.rng.gen()).collect();
        let shared: &DataConfig = config;

        if shared.sequential {
            init_sequential(&mut self.data, shared, &seeds)?;
        } else {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(shared.num_workers).build();
            init_on_pool(&mut self.data, shared, &seeds, pool)?;
        }

        tracing::debug!("Finished initializing targets and masks for {} molecules", self.data.len());
        Ok(())
    }

    // ── Bulk accessors ───────────────────────────────────────────────────────

    pub fn compound_names(&self) -> Option<Vec<String>> {
        self.data.first()?.compound_name.as_ref()?;
        Some(
            self.data
                .iter()
                .map(|d| d.compound_name.clone().unwrap_or_default())
                .collect(),
        )
    }

    pub fn smiles(&self) -> Vec<String> {
        self.data.iter().map(|d| d.smiles.clone()).collect()
    }

    pub fn features(&self) -> Option<Vec<&[f64]>> {
        self.data.first()?.features.as_ref()?;
        Some(self.data.iter().map(|d| d.features.as_deref().unwrap_or(&[])).collect())
    }

    /// Per-datapoint targets, or the self-supervised features/vocab pair.
    pub fn targets(&self) -> DataResult<DatasetTargets> {
        if !self.self_supervised {
            return Ok(DatasetTargets::PerDatapoint(
                self.data.iter().map(|d| d.targets.clone()).collect(),
            ));
        }

        let mut features = Vec::with_capacity(self.data.len());
        let mut vocab    = Vec::new();
        for d in &self.data {
            let bt = d.bert_targets()?;
            features.push(bt.features.map(<[f64]>::to_vec));
            vocab.extend_from_slice(bt.vocab);
        }
        Ok(DatasetTargets::SelfSupervised { features, vocab })
    }

    pub fn num_tasks(&self) -> Option<usize> {
        self.data.first().map(|d| d.num_tasks)
    }

    /// All atom masks concatenated in dataset order.
    pub fn mask(&self) -> DataResult<Vec<u8>> {
        if !self.self_supervised {
            return Err(DataError::NotSelfSupervised("mask"));
        }
        let mut out = Vec::new();
        for d in &self.data {
            out.extend_from_slice(d.mask().ok_or(DataError::MaskNotInitialized)?);
        }
        Ok(out)
    }

    // ── Reordering ───────────────────────────────────────────────────────────

    /// Permute the datapoints in place, reseeding first when `seed` is given.
    ///
    /// Self-supervised datapoints that have been through bert_init get a
    /// fresh mask afterwards.
    pub fn shuffle(&mut self, seed: Option<u64>) -> DataResult<()> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.data.shuffle(&mut self.rng);

        if self.self_supervised {
            for d in self.data.iter_mut().filter(|d| d.is_bert_initialized()) {
                d.recreate_mask(&mut self.rng)?;
            }
        }
        Ok(())
    }

    /// Shuffle, then split into `num_chunks` datasets of at most
    /// `ceil(len / num_chunks)` datapoints. Trailing chunks may be short
    /// or empty.
    pub fn chunk(&mut self, num_chunks: usize, seed: Option<u64>) -> DataResult<Vec<MoleculeDataset>> {
        if num_chunks == 0 {
            return Err(DataError::InvalidArgument("num_chunks must be at least 1".into()));
        }
        self.shuffle(seed)?;

        let total     = self.data.len();
        let chunk_len = total.div_ceil(num_chunks);

        let chunks = (0..num_chunks)
            .map(|i| {
                let start = (i * chunk_len).min(total);
                let end   = ((i + 1) * chunk_len).min(total);
                MoleculeDataset::with_seed(self.data[start..end].to_vec(), self.rng.gen())
            })
            .collect();
        Ok(chunks)
    }

    // ── Normalisation ────────────────────────────────────────────────────────

    /// Standardise every feature vector in place and return the scaler used.
    ///
    /// A given `scaler` is adopted as-is; otherwise a previously fitted one
    /// is reused, or a new one is fitted over all feature vectors. Returns
    /// `None` when no datapoint carries features.
    pub fn normalize_features(&mut self, scaler: Option<StandardScaler>) -> DataResult<Option<StandardScaler>> {
        if self.data.iter().all(|d| d.features.is_none()) {
            return Ok(None);
        }

        let scaler = match (scaler, &self.scaler) {
            (Some(given), _)     => given,
            (None, Some(fitted)) => fitted.clone(),
            (None, None) => {
                let rows: Vec<Vec<f64>> = self.data.iter().filter_map(|d| d.features.clone()).collect();
                StandardScaler::fit(&rows, SCALER_NAN_TOKEN)?
            }
        };
        self.scaler = Some(scaler.clone());

        for d in &mut self.data {
            if let Some(f) = d.features.as_mut() {
                *f = scaler.transform(f)?;
            }
        }
        Ok(Some(scaler))
    }

    // ── Target injection ─────────────────────────────────────────────────────

    /// Assign targets positionally (unsupervised pretraining feedback).
    pub fn set_targets(&mut self, targets: Vec<Targets>) -> DataResult<()> {
        if targets.len() != self.data.len() {
            return Err(DataError::LengthMismatch { expected: self.data.len(), actual: targets.len() });
        }
        for (d, t) in self.data.iter_mut().zip(targets) {
            d.set_targets(t);
        }
        Ok(())
    }

    // ── Plain accessors ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MoleculeDatapoint> {
        self.data.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MoleculeDatapoint> {
        self.data.iter()
    }

    pub fn datapoints(&self) -> &[MoleculeDatapoint] {
        &self.data
    }

    pub fn into_datapoints(self) -> Vec<MoleculeDatapoint> {
        self.data
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn features_size(&self) -> Option<usize> {
        self.features_size
    }

    pub fn is_self_supervised(&self) -> bool {
        self.self_supervised
    }
}

/// One task per datapoint on `pool`; sequential when the pool could not be built.
fn init_on_pool(
    data:   &mut [MoleculeDatapoint],
    config: &DataConfig,
    seeds:  &[u64],
    pool:   Result<ThreadPool, ThreadPoolBuildError>,
) -> DataResult<()> {
    match pool {
        Ok(pool) => pool.install(|| {
            data.par_iter_mut()
                .zip(seeds.par_iter())
                .try_for_each(|(d, &seed)| {
                    let snapshot = config.clone();
                    d.bert_init(&snapshot, &mut StdRng::seed_from_u64(seed))
                })
        }),
        Err(e) => {
            tracing::warn!("Cannot build bert_init worker pool ({e}); initialising sequentially");
            init_sequential(data, config, seeds)
        }
    }
}

fn init_sequential(data: &mut [MoleculeDatapoint], config: &DataConfig, seeds: &[u64]) -> DataResult<()> {
    for (d, &seed) in data.iter_mut().zip(seeds) {
        d.bert_init(config, &mut StdRng::seed_from_u64(seed))?;
    }
    Ok(())
}

// ─── Burn Dataset Trait Implementation ────────────────────────────────────────
impl Dataset<MoleculeDatapoint> for MoleculeDataset {
    fn get(&self, index: usize) -> Option<MoleculeDatapoint> {
        self.data.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
