// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Orchestrates the full preprocessing pipeline in order:
//
//   Step 1: Load CSV records           (Layer 4 - data)
//   Step 2: Load precomputed features  (Layer 4 - data)
//   Step 3: Build datapoints           (Layer 4 - data)
//   Step 4: Build / load vocabulary    (Layer 6 - infra)
//   Step 5: Initialise atom targets    (Layer 4 - data)
//   Step 6: Split train/validation     (Layer 4 - data)
//   Step 7: Normalise features         (Layer 4 - data)
//   Step 8: Chunk for workers          (Layer 4 - data)
//   Step 9: Save artifacts             (Layer 6 - infra)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    datapoint::MoleculeDatapoint,
    dataset::MoleculeDataset,
    loader::{load_features, CsvLoader},
    splitter::split_train_val,
};
use crate::domain::{
    config::{DataConfig, DatasetType},
    error::DataError,
    traits::{RecordSource, Vocabulary},
};
use crate::infra::{artifacts::ArtifactStore, vocab_store::AtomVocab};

// ─── Preparation Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub data_path:          PathBuf,
    pub output_dir:         PathBuf,
    /// CSV of precomputed features, one row per molecule
    pub features_path:      Option<PathBuf>,
    pub use_compound_names: bool,
    pub max_rows:           Option<usize>,
    pub train_fraction:     f64,
    /// Number of worker shards for the training set; 1 = no chunking
    pub num_chunks:         usize,
    pub seed:               Option<u64>,
    pub data:               DataConfig,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_path:          PathBuf::from("data/molecules.csv"),
            output_dir:         PathBuf::from("prepared"),
            features_path:      None,
            use_compound_names: false,
            max_rows:           None,
            train_fraction:     0.8,
            num_chunks:         1,
            seed:               None,
            data:               DataConfig::default(),
        }
    }
}

/// What a preparation run produced; written to summary.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareSummary {
    pub dataset_type:         DatasetType,
    pub num_molecules:        usize,
    pub num_skipped:          usize,
    pub num_train:            usize,
    pub num_val:              usize,
    pub num_tasks:            Option<usize>,
    pub features_size:        Option<usize>,
    pub vocab_output_size:    Option<usize>,
    /// Fraction of training atoms hidden by the current masks
    pub masked_atom_fraction: Option<f64>,
    pub chunk_sizes:          Vec<usize>,
}

// ─── PrepareUseCase ───────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    /// Execute the full preprocessing pipeline end to end
    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg      = &self.config;
        let mut data = cfg.data.clone();
        let store    = ArtifactStore::new(&cfg.output_dir)?;

        // ── Step 1: Load raw records ──────────────────────────────────────────
        let records = CsvLoader::new(&cfg.data_path)
            .with_max_rows(cfg.max_rows)
            .load_all()
            .with_context(|| format!("Cannot load molecules from '{}'", cfg.data_path.display()))?;

        // ── Step 2: Precomputed features ──────────────────────────────────────
        let features = match &cfg.features_path {
            Some(path) => {
                let rows = load_features(path)
                    .with_context(|| format!("Cannot load features from '{}'", path.display()))?;
                if rows.len() < records.len() {
                    bail!(
                        "Features file '{}' has {} rows but {} molecules were loaded",
                        path.display(),
                        rows.len(),
                        records.len()
                    );
                }
                Some(rows)
            }
            None => None,
        };

        // ── Step 3: Build datapoints ──────────────────────────────────────────
        // Rows with bad labels or no SMILES are skipped; configuration
        // errors abort the run.
        let mut datapoints = Vec::with_capacity(records.len());
        let mut skipped    = 0;
        for (row, record) in records.iter().enumerate() {
            let row_features = features.as_ref().map(|f| f[row].clone());
            match MoleculeDatapoint::new(record, &data, row_features, cfg.use_compound_names) {
                Ok(dp) => datapoints.push(dp),
                Err(e @ (DataError::InvalidTarget { .. } | DataError::MissingSmiles)) => {
                    tracing::warn!("Skipping row {}: {}", row + 1, e);
                    skipped += 1;
                }
                Err(e) => return Err(e).context("Cannot build molecule datapoints"),
            }
        }
        tracing::info!("Built {} datapoints ({} skipped)", datapoints.len(), skipped);

        let num_molecules = datapoints.len();
        let mut dataset = match cfg.seed {
            Some(seed) => MoleculeDataset::with_seed(datapoints, seed),
            None       => MoleculeDataset::new(datapoints),
        };

        // ── Steps 4-5: Vocabulary and atom targets ────────────────────────────
        // A vocabulary built here is saved so fine-tuning can reuse it via
        // --checkpoint-path.
        if data.is_self_supervised() {
            if data.vocab.is_none() && data.checkpoint_paths.is_none() {
                let vocab = AtomVocab::build(&dataset.smiles())?;
                vocab.save(store.dir())?;
                data.vocab = Some(Arc::new(vocab) as Arc<dyn Vocabulary>);
            }
            dataset.bert_init(&mut data).context("Cannot initialise atom targets")?;
        } else if data.features_size.is_none() {
            data.features_size = dataset.features_size();
        }

        let num_tasks = dataset.num_tasks();

        // ── Step 6: Train / validation split ──────────────────────────────────
        let (mut train, mut val) = split_train_val(dataset, cfg.train_fraction, cfg.seed)?;
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // ── Step 7: Normalise features with the training scaler ───────────────
        let scaler = train.normalize_features(None)?;
        if let Some(scaler) = &scaler {
            val.normalize_features(Some(scaler.clone()))?;
            store.save_scaler(scaler)?;
            tracing::info!("Normalised {} features", scaler.num_features());
        }

        // ── Step 8: Chunk for parallel workers ────────────────────────────────
        // Chunking reshuffles and redraws every mask, so the masked fraction
        // is measured on the chunks handed to workers.
        let chunks = if cfg.num_chunks > 1 {
            train.chunk(cfg.num_chunks, cfg.seed)?
        } else {
            vec![train.clone()]
        };
        let chunk_sizes: Vec<usize> = chunks.iter().map(MoleculeDataset::len).collect();
        let masked_atom_fraction = masked_fraction(&chunks)?;

        // ── Step 9: Save artifacts ────────────────────────────────────────────
        store.save_config(&data)?;

        let summary = PrepareSummary {
            dataset_type:      data.dataset_type,
            num_molecules,
            num_skipped:       skipped,
            num_train:         train.len(),
            num_val:           val.len(),
            num_tasks,
            features_size:     data.features_size,
            vocab_output_size: data.vocab_output_size,
            masked_atom_fraction,
            chunk_sizes,
        };
        store.save_summary(&summary)?;

        tracing::info!("Prepared data written to '{}'", store.dir().display());
        Ok(summary)
    }
}

/// Share of atoms hidden across `datasets`; None unless they are self-supervised.
fn masked_fraction(datasets: &[MoleculeDataset]) -> Result<Option<f64>> {
    if !datasets.iter().any(MoleculeDataset::is_self_supervised) {
        return Ok(None);
    }
    let (mut hidden, mut total) = (0usize, 0usize);
    for ds in datasets.iter().filter(|d| d.is_self_supervised()) {
        let mask = ds.mask()?;
        hidden += mask.iter().filter(|&&m| m == 0).count();
        total  += mask.len();
    }
    Ok(Some(hidden as f64 / total.max(1) as f64))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datapoint::tests::bert_config;
    use crate::domain::config::MaskPolicy;
    use crate::infra::{artifacts::SUMMARY_FILE, vocab_store::VOCAB_FILE};
    use std::fs;

    const MOLECULES: &str = "\
smiles,logp,active
CCO,-0.31,0
c1ccccc1,2.13,
CC(=O)O,-0.17,0
CCN,,1
CCCCCC,3.9,0
c1ccncc1,0.65,1
CC(C)O,0.05,
not-a-number-row,abc,1
OCCO,-1.36,0
CCCl,1.4,1
";

    fn setup() -> (tempfile::TempDir, PrepareConfig) {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("molecules.csv");
        fs::write(&data, MOLECULES).unwrap();
        let cfg = PrepareConfig {
            data_path:  data,
            output_dir: dir.path().join("out"),
            seed:       Some(7),
            ..PrepareConfig::default()
        };
        (dir, cfg)
    }

    #[test]
    fn test_supervised_with_generated_features() {
        let (_dir, mut cfg) = setup();
        cfg.data.features_generator = Some(vec!["rdkit_2d".into()]);
        cfg.num_chunks = 3;

        let summary = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.num_molecules, 9);
        assert_eq!(summary.num_skipped, 1);
        assert_eq!(summary.num_train + summary.num_val, 9);
        assert_eq!(summary.num_tasks, Some(2));
        assert!(summary.features_size.unwrap() > 0);
        assert_eq!(summary.chunk_sizes.iter().sum::<usize>(), summary.num_train);
        assert_eq!(summary.chunk_sizes.len(), 3);

        let store = ArtifactStore::new(&cfg.output_dir).unwrap();
        assert_eq!(store.load_scaler().unwrap().num_features(), summary.features_size.unwrap());
        assert!(cfg.output_dir.join(SUMMARY_FILE).exists());
    }

    #[test]
    fn test_self_supervised_writes_vocab() {
        let (_dir, mut cfg) = setup();
        cfg.data.dataset_type = DatasetType::SelfSupervised;
        cfg.data.mask_policy  = MaskPolicy::Random;

        let summary = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.num_skipped, 0);
        assert_eq!(summary.num_tasks, Some(1));
        assert!(summary.masked_atom_fraction.unwrap() > 0.0);
        assert!(cfg.output_dir.join(VOCAB_FILE).exists());

        let saved = ArtifactStore::new(&cfg.output_dir).unwrap().load_config().unwrap();
        assert_eq!(saved.vocab_output_size, summary.vocab_output_size);
        assert!(saved.vocab_output_size.unwrap() > 2);
    }

    #[test]
    fn test_masked_fraction_tracks_chunk_masks() {
        let data = ["CCO", "CCCCN", "c1ccccc1", "CC(=O)OC", "OCCO", "CCCl"]
            .iter()
            .map(|s| MoleculeDatapoint::new(&[*s], &bert_config(MaskPolicy::Random), None, false).unwrap())
            .collect();
        let mut train = MoleculeDataset::with_seed(data, 3);
        train.bert_init(&mut bert_config(MaskPolicy::Random)).unwrap();

        let chunks = train.chunk(3, Some(9)).unwrap();
        let fraction = masked_fraction(&chunks).unwrap().unwrap();

        // chunks hold clones of the parent's regenerated masks
        let mask = train.mask().unwrap();
        let expected = mask.iter().filter(|&&m| m == 0).count() as f64 / mask.len() as f64;
        assert!((fraction - expected).abs() < 1e-12);

        let supervised = MoleculeDataset::new(Vec::new());
        assert_eq!(masked_fraction(&[supervised]).unwrap(), None);
    }

    #[test]
    fn test_self_supervised_reuses_checkpoint_vocab() {
        let (dir, mut cfg) = setup();
        let vocab_dir = dir.path().join("pretrained");
        let vocab = AtomVocab::build(&["CCO", "c1ccccc1"]).unwrap();
        vocab.save(&vocab_dir).unwrap();

        cfg.data.dataset_type     = DatasetType::SelfSupervised;
        cfg.data.checkpoint_paths = Some(vec![vocab_dir]);

        let summary = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.vocab_output_size, Some(vocab.output_size()));
        assert!(!cfg.output_dir.join(VOCAB_FILE).exists());
    }

    #[test]
    fn test_conflicting_feature_sources_abort() {
        let (dir, mut cfg) = setup();
        let feats = dir.path().join("features.csv");
        fs::write(&feats, format!("f0\n{}", "1.0\n".repeat(10))).unwrap();
        cfg.features_path = Some(feats);
        cfg.data.features_generator = Some(vec!["morgan".into()]);

        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_short_features_file_is_rejected() {
        let (dir, mut cfg) = setup();
        let feats = dir.path().join("features.csv");
        fs::write(&feats, "f0\n1.0\n2.0\n").unwrap();
        cfg.features_path = Some(feats);

        let err = PrepareUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("rows"));
    }
}
