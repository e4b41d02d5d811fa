// ============================================================
// Layer 4 — CSV Record Loader
// ============================================================
// Reads a molecule table into raw string records, one per row:
//
//   smiles,solubility,toxicity          ← header, skipped
//   CCO,0.52,                           ← empty field = missing label
//   c1ccccc1,,1
//
// Rows stay untyped here; MoleculeDatapoint::new decides which
// column is the name, which is the SMILES and how labels parse.
//
// Parsing goes through the csv crate, so quoted fields may
// contain commas ("aspirin, USP"). Fields are trimmed, rows may
// have different lengths, and blank rows are skipped.
//
// Also reads precomputed feature tables (one numeric row per
// molecule, same order as the molecule table).

use std::{fs::File, path::{Path, PathBuf}};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::{
    error::{DataError, DataResult},
    traits::RecordSource,
};

/// Loads records from a comma-separated file with a header row.
/// Implements the RecordSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    path:     PathBuf,
    max_rows: Option<usize>,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), max_rows: None }
    }

    /// Stop after `max_rows` data rows.
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvLoader {
    fn load_all(&self) -> DataResult<Vec<Vec<String>>> {
        let limit = self.max_rows.unwrap_or(usize::MAX);

        let mut records = Vec::new();
        for record in data_records(&self.path)? {
            if records.len() == limit {
                break;
            }
            let record = record?;
            records.push(record.iter().map(str::to_string).collect());
        }

        tracing::info!("Loaded {} records from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

/// Read a numeric feature table (header row skipped). Empty cells become NaN
/// so the scaler can treat them as missing.
pub fn load_features(path: &Path) -> DataResult<Vec<Vec<f64>>> {
    let rows = data_records(path)?
        .enumerate()
        .map(|(row, record)| {
            record?
                .iter()
                .enumerate()
                .map(|(column, field)| parse_feature(field, row, column))
                .collect::<DataResult<Vec<f64>>>()
        })
        .collect::<DataResult<Vec<_>>>()?;

    tracing::debug!("Loaded {} feature rows from '{}'", rows.len(), path.display());
    Ok(rows)
}

fn parse_feature(field: &str, row: usize, column: usize) -> DataResult<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field.parse().map_err(|_| {
        DataError::InvalidArgument(format!("non-numeric feature '{field}' at row {row}, column {column}"))
    })
}

/// Non-blank records after the header.
fn data_records(path: &Path) -> DataResult<impl Iterator<Item = DataResult<StringRecord>>> {
    let file = File::open(path)?;
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    Ok(reader
        .into_records()
        .map(|r| r.map_err(DataError::from))
        .filter(|r| !matches!(r, Ok(rec) if rec.iter().all(str::is_empty))))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_skips_header_and_blank_lines() {
        let f = write_file("smiles,a,b\nCCO, 0.5,\n\n  \nc1ccccc1,,1\n");
        let records = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(records, vec![
            vec!["CCO".to_string(), "0.5".into(), "".into()],
            vec!["c1ccccc1".to_string(), "".into(), "1".into()],
        ]);
    }

    #[test]
    fn test_quoted_field_with_comma() {
        let f = write_file("name,smiles,y\n\"aspirin, USP\",CC(=O)Oc1ccccc1C(=O)O,1.0\n");
        let records = CsvLoader::new(f.path()).load_all().unwrap();
        assert_eq!(records, vec![vec![
            "aspirin, USP".to_string(),
            "CC(=O)Oc1ccccc1C(=O)O".into(),
            "1.0".into(),
        ]]);
    }

    #[test]
    fn test_max_rows() {
        let f = write_file("smiles,y\nC,1\nCC,2\nCCC,3\n");
        let records = CsvLoader::new(f.path()).with_max_rows(Some(2)).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "CC");
    }

    #[test]
    fn test_header_only_file() {
        let f = write_file("smiles,y\n");
        assert!(CsvLoader::new(f.path()).load_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvLoader::new(dir.path().join("none.csv")).load_all().unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }

    #[test]
    fn test_load_features() {
        let f = write_file("f0,f1\n1.5,2\n,3\n");
        let rows = load_features(f.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![1.5, 2.0]);
        assert!(rows[1][0].is_nan());
        assert_eq!(rows[1][1], 3.0);
    }

    #[test]
    fn test_load_features_rejects_text() {
        let f = write_file("f0\nabc\n");
        assert!(matches!(load_features(f.path()), Err(DataError::InvalidArgument(_))));
    }
}
