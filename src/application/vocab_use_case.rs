// ============================================================
// Layer 2 — VocabUseCase
// ============================================================
// Builds the atom vocabulary for a molecule table on its own,
// so one vocabulary can be shared by several pretraining and
// fine-tuning runs through --checkpoint-path.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::loader::CsvLoader;
use crate::domain::traits::{RecordSource, Vocabulary};
use crate::infra::vocab_store::AtomVocab;

pub struct VocabUseCase {
    data_path:          PathBuf,
    output_dir:         PathBuf,
    use_compound_names: bool,
    max_rows:           Option<usize>,
}

impl VocabUseCase {
    pub fn new(
        data_path:          impl Into<PathBuf>,
        output_dir:         impl Into<PathBuf>,
        use_compound_names: bool,
        max_rows:           Option<usize>,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            output_dir: output_dir.into(),
            use_compound_names,
            max_rows,
        }
    }

    /// Build and save the vocabulary; returns the file path and output size.
    pub fn execute(&self) -> Result<(PathBuf, usize)> {
        let records = CsvLoader::new(&self.data_path)
            .with_max_rows(self.max_rows)
            .load_all()
            .with_context(|| format!("Cannot load molecules from '{}'", self.data_path.display()))?;

        let column = usize::from(self.use_compound_names);
        let smiles: Vec<&str> = records
            .iter()
            .filter_map(|r| r.get(column).map(String::as_str))
            .collect();

        let vocab = AtomVocab::build(&smiles)?;
        let path  = vocab.save(&self.output_dir)?;
        Ok((path, vocab.output_size()))
    }
}
