//! CSV import of audited yearly production figures.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::info;

use crate::store::{ProductionStore, StoreError, YearlyRecord};

/// Column header expected by [`read_csv`].
pub const HEADER: &str = "year,category,value_gwh";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    InvalidRow { line: usize, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Imports a CSV file; see [`read_csv`].
///
/// # Errors
///
/// Returns an `ImportError` if the file cannot be opened, or as [`read_csv`].
pub fn import_csv<S>(store: &S, path: &Path) -> Result<usize, ImportError>
where
    S: ProductionStore + ?Sized,
{
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let count = read_csv(store, file)?;
    info!(path = %path.display(), rows = count, "historical production imported");
    Ok(count)
}

/// Reads `year,category,value_gwh` rows and upserts them into `store`.
///
/// All rows are checked first, then written as one batch: either every row
/// is recorded or none is. Returns the number of rows recorded.
///
/// # Errors
///
/// Returns an `ImportError` on malformed CSV, a blank category, a negative
/// or non-finite value, or a store failure.
pub fn read_csv<S>(store: &S, reader: impl Read) -> Result<usize, ImportError>
where
    S: ProductionStore + ?Sized,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in rdr.deserialize::<YearlyRecord>().enumerate() {
        let row = record?;
        // header is line 1
        let line = index + 2;
        if row.category.is_empty() {
            return Err(ImportError::InvalidRow {
                line,
                message: "category must not be blank".to_string(),
            });
        }
        if !row.value_gwh.is_finite() || row.value_gwh < 0.0 {
            return Err(ImportError::InvalidRow {
                line,
                message: format!("value_gwh must be >= 0, got {}", row.value_gwh),
            });
        }
        rows.push(row);
    }

    store.upsert_yearly_values(&rows)?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn imports_rows_and_replaces_duplicates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let csv = "\
year,category,value_gwh
2022, Production cantonale brute ,10500.5
2023,Production cantonale brute,10800
2023,Installations photovoltaïques,120.25
2023,Production cantonale brute,10900
";
        assert_eq!(read_csv(&store, csv.as_bytes()).unwrap(), 4);

        let values = store
            .values_in_range("Production cantonale brute", 2000, 2030)
            .unwrap();
        let pairs: Vec<(i32, f64)> = values.iter().map(|v| (v.year, v.value_gwh)).collect();
        assert_eq!(pairs, vec![(2022, 10500.5), (2023, 10900.0)]);
        assert_eq!(store.max_year().unwrap(), Some(2023));
    }

    #[test]
    fn negative_value_aborts_before_writing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let csv = "year,category,value_gwh\n2022,Installations biogaz,4\n2023,Installations biogaz,-1\n";
        let err = read_csv(&store, csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidRow { line: 3, .. }), "{err}");
        assert_eq!(store.max_year().unwrap(), None);
    }

    #[test]
    fn non_numeric_value_is_a_csv_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let csv = "year,category,value_gwh\n2022,Installations biogaz,lots\n";
        assert!(matches!(
            read_csv(&store, csv.as_bytes()),
            Err(ImportError::Csv(_))
        ));
    }

    #[test]
    fn imports_from_file() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "{HEADER}\n2021,Installations éoliennes,96.0").expect("write csv");
        assert_eq!(import_csv(&store, file.path()).unwrap(), 1);
        let values = store
            .values_for_year(2021, &["Installations éoliennes"])
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value_gwh, 96.0);
    }

    #[test]
    fn missing_file_names_the_path() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_csv(&store, Path::new("/nonexistent/history.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/history.csv"));
    }
}
