// ============================================================
// Layer 6 — Atom Vocabulary Store
// ============================================================
// Builds, saves and loads the atom vocabulary used as the
// prediction target in masked self-supervised pretraining.
//
// Each atom is keyed by its SMILES token and heavy-atom degree:
//   "CCO" → C_1, C_2, O_1
//
// The vocabulary is stored as a HuggingFace WordLevel tokenizer
// JSON so it can be inspected and reused by other tooling. The
// JSON is written directly rather than going through a trainer;
// special tokens get fixed ids:
//   [PAD] = 0
//   [UNK] = 1   (atoms never seen while building)
//
// Ordering is deterministic: most frequent key first, ties
// broken alphabetically, so the same corpus always yields the
// same ids.
//
// A checkpoint path may be a directory containing vocab.json or
// the JSON file itself.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use tokenizers::Tokenizer;

use crate::data::smiles::AtomGraph;
use crate::domain::{
    error::{DataError, DataResult},
    traits::{AtomIndices, Vocabulary},
};

pub const VOCAB_FILE: &str = "vocab.json";
pub const PAD_TOKEN: &str  = "[PAD]";
pub const UNK_TOKEN: &str  = "[UNK]";

const PAD_ID: u32 = 0;
const UNK_ID: u32 = 1;

pub struct AtomVocab {
    tokenizer: Tokenizer,
}

impl fmt::Debug for AtomVocab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomVocab")
            .field("output_size", &self.output_size())
            .finish()
    }
}

impl AtomVocab {
    /// Build a vocabulary from every atom key in `corpus`.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> DataResult<Self> {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for smiles in corpus {
            let graph = AtomGraph::parse(smiles.as_ref());
            for atom in 0..graph.num_atoms() {
                *freq.entry(graph.atom_key(atom)).or_insert(0) += 1;
            }
        }

        let mut keys: Vec<(String, usize)> = freq.into_iter().collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut vocab = serde_json::json!({
            PAD_TOKEN: PAD_ID,
            UNK_TOKEN: UNK_ID,
        });
        let mut next_id = UNK_ID + 1;
        for (key, _) in &keys {
            if vocab.get(key).is_none() {
                vocab[key] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        tracing::info!(
            "Built atom vocabulary: {} keys from {} molecules",
            next_id,
            corpus.len()
        );
        Self::from_json(&tokenizer_json(vocab))
    }

    /// Load a vocabulary from a file or from `<dir>/vocab.json`.
    pub fn load(path: &Path) -> DataResult<Self> {
        let file = resolve_vocab_path(path);
        let bytes = std::fs::read(&file)?;
        let tokenizer = Tokenizer::from_bytes(&bytes).map_err(|e| {
            DataError::Vocab(format!("cannot load vocabulary from '{}': {e}", file.display()))
        })?;
        tracing::info!("Loaded atom vocabulary from '{}'", file.display());
        Ok(Self { tokenizer })
    }

    /// Write the vocabulary to `<dir>/vocab.json` and return that path.
    pub fn save(&self, dir: &Path) -> DataResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(VOCAB_FILE);
        self.tokenizer
            .save(&path, true)
            .map_err(|e| DataError::Vocab(format!("cannot write '{}': {e}", path.display())))?;
        tracing::debug!("Saved atom vocabulary to '{}'", path.display());
        Ok(path)
    }

    /// Vocabulary index of an atom key; unknown keys map to [UNK].
    pub fn index_of(&self, key: &str) -> usize {
        self.tokenizer.token_to_id(key).unwrap_or(UNK_ID) as usize
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn from_json(json: &serde_json::Value) -> DataResult<Self> {
        let bytes = serde_json::to_vec(json)?;
        let tokenizer = Tokenizer::from_bytes(bytes)
            .map_err(|e| DataError::Vocab(format!("cannot build tokenizer: {e}")))?;
        Ok(Self { tokenizer })
    }
}

impl Vocabulary for AtomVocab {
    fn smiles_to_indices(&self, smiles: &str) -> DataResult<AtomIndices> {
        let graph = AtomGraph::parse(smiles);
        let targets = (0..graph.num_atoms())
            .map(|atom| self.index_of(&graph.atom_key(atom)))
            .collect();
        Ok((targets, graph.into_neighbors()))
    }

    fn output_size(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }
}

fn resolve_vocab_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(VOCAB_FILE)
    } else {
        path.to_path_buf()
    }
}

/// WordLevel tokenizer JSON in the format `Tokenizer::from_bytes` expects.
fn tokenizer_json(vocab: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": PAD_ID, "content": PAD_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": UNK_ID, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {
            "type": "WhitespaceSplit"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    })
}
