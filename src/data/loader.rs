use crate::data::{strip_version, FeatureTable, DEFAULT_CONDITION_COLUMN};
use crate::error::{PipelineError, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Csv,
    Tsv,
    GzippedCsv,
    GzippedTsv,
}

impl FileFormat {
    /// Detect file format from path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str());
        let stem = path.file_stem().and_then(|s| s.to_str());

        match (ext, stem) {
            (Some("gz"), Some(stem)) => {
                if stem.ends_with(".csv") {
                    Ok(FileFormat::GzippedCsv)
                } else if stem.ends_with(".tsv") || stem.ends_with(".txt") {
                    Ok(FileFormat::GzippedTsv)
                } else {
                    Err(PipelineError::MalformedInput(
                        "cannot determine format of gzipped file".into(),
                    ))
                }
            }
            (Some("csv"), _) => Ok(FileFormat::Csv),
            (Some("tsv"), _) | (Some("txt"), _) => Ok(FileFormat::Tsv),
            _ => Err(PipelineError::MalformedInput(format!(
                "unsupported file format: {:?}",
                path
            ))),
        }
    }

    /// Get delimiter character
    pub fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv | FileFormat::GzippedCsv => b',',
            FileFormat::Tsv | FileFormat::GzippedTsv => b'\t',
        }
    }

    /// Check if format is gzipped
    pub fn is_gzipped(&self) -> bool {
        matches!(self, FileFormat::GzippedCsv | FileFormat::GzippedTsv)
    }
}

/// Table loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Name of the label column; when unset, `Pacient_Condition` if present,
    /// otherwise the trailing column
    pub condition_column: Option<String>,
    /// Whether to strip version suffixes from gene headers
    pub strip_versions: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            condition_column: None,
            strip_versions: true,
        }
    }
}

/// Loader for samples x genes expression tables
pub struct TableLoader {
    config: LoaderConfig,
}

impl TableLoader {
    /// Create new loader with default config
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create new loader with custom config
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load a feature table from file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<FeatureTable> {
        let path = path.as_ref();
        info!("Loading feature table from {:?}", path);

        let format = FileFormat::from_path(path)?;
        debug!("Detected file format: {:?}", format);

        let file = File::open(path)?;
        let table = if format.is_gzipped() {
            self.parse_table(BufReader::new(GzDecoder::new(file)), format)?
        } else {
            self.parse_table(BufReader::new(file), format)?
        };

        info!(
            "Loaded {} samples x {} genes",
            table.n_samples(),
            table.n_genes()
        );
        Ok(table)
    }

    /// Parse a table from any reader
    pub fn parse_table<R: Read>(&self, reader: R, format: FileFormat) -> Result<FeatureTable> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.len() < 3 {
            return Err(PipelineError::MalformedInput(format!(
                "expected a sample column, at least one gene column and a condition column, got {} columns",
                headers.len()
            )));
        }

        let condition_idx = match &self.config.condition_column {
            Some(name) => headers.iter().position(|h| h == name).ok_or_else(|| {
                PipelineError::MalformedInput(format!("missing condition column: {}", name))
            })?,
            None => headers
                .iter()
                .position(|h| h == DEFAULT_CONDITION_COLUMN)
                .unwrap_or(headers.len() - 1),
        };
        if condition_idx == 0 {
            return Err(PipelineError::MalformedInput(
                "condition column cannot be the sample id column".into(),
            ));
        }

        let gene_cols: Vec<usize> = (1..headers.len()).filter(|&i| i != condition_idx).collect();
        let genes: Vec<String> = gene_cols
            .iter()
            .map(|&i| {
                if self.config.strip_versions {
                    strip_version(&headers[i]).to_string()
                } else {
                    headers[i].clone()
                }
            })
            .collect();
        debug!("Condition column: {}", headers[condition_idx]);

        let mut samples = Vec::new();
        let mut rows = Vec::new();
        let mut conditions = Vec::new();

        for (line, result) in csv_reader.records().enumerate() {
            let record = result?;
            // header is line 1
            let line = line + 2;

            let sample = record.get(0).unwrap_or_default().to_string();
            let row = gene_cols
                .iter()
                .map(|&i| {
                    let raw = record.get(i).unwrap_or_default().trim();
                    raw.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| {
                            PipelineError::MalformedInput(format!(
                                "line {}: non-numeric value {:?} in column {}",
                                line, raw, headers[i]
                            ))
                        })
                })
                .collect::<Result<Vec<f64>>>()?;

            samples.push(sample);
            rows.push(row);
            conditions.push(record.get(condition_idx).unwrap_or_default().to_string());
        }

        FeatureTable::new(samples, genes, rows, conditions)
    }
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    const TABLE: &str = "\
sample_id,ENSG0001.4,ENSG0002.1,ENSG0003,Pacient_Condition
S1,1.0,1.0,0.0,healthy
S2,1.0,1.2,1.0,healthy
S3,1.0,2.0,0.0,sick
S4,1.0,2.1,1.0,sick
";

    #[test]
    fn test_file_format_detection() {
        assert_eq!(FileFormat::from_path("data.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path("data.tsv").unwrap(), FileFormat::Tsv);
        assert_eq!(FileFormat::from_path("data.csv.gz").unwrap(), FileFormat::GzippedCsv);
        assert_eq!(FileFormat::from_path("data.tsv.gz").unwrap(), FileFormat::GzippedTsv);
        assert!(FileFormat::from_path("data.parquet").is_err());
    }

    #[test]
    fn test_parse_strips_versions() {
        let loader = TableLoader::new();
        let table = loader.parse_table(Cursor::new(TABLE), FileFormat::Csv).unwrap();

        assert_eq!(table.n_samples(), 4);
        assert_eq!(table.genes(), &["ENSG0001", "ENSG0002", "ENSG0003"]);
        assert_eq!(table.conditions()[2], "sick");
        let column = table.project(&["ENSG0002".to_string()]).unwrap();
        assert_eq!(column.get(3, 0), 2.1);
    }

    #[test]
    fn test_named_condition_column() {
        let data = "id,label,G1,G2\nS1,a,1,2\nS2,b,3,4\n";
        let loader = TableLoader::with_config(LoaderConfig {
            condition_column: Some("label".into()),
            strip_versions: false,
        });
        let table = loader.parse_table(Cursor::new(data), FileFormat::Csv).unwrap();

        assert_eq!(table.genes(), &["G1", "G2"]);
        assert_eq!(table.conditions(), &["a", "b"]);
    }

    #[test]
    fn test_default_condition_column_found_by_name() {
        let data = "id,G1,Pacient_Condition,G2\nS1,1,a,2\nS2,3,b,4\n";
        let table = TableLoader::new()
            .parse_table(Cursor::new(data), FileFormat::Csv)
            .unwrap();

        assert_eq!(table.genes(), &["G1", "G2"]);
        assert_eq!(table.conditions(), &["a", "b"]);
    }

    #[test]
    fn test_trailing_column_fallback() {
        let data = "id,G1,G2,status\nS1,1,2,a\n";
        let table = TableLoader::new()
            .parse_table(Cursor::new(data), FileFormat::Csv)
            .unwrap();
        assert_eq!(table.conditions(), &["a"]);
    }

    #[test]
    fn test_missing_condition_column() {
        let loader = TableLoader::with_config(LoaderConfig {
            condition_column: Some("Pacient_Condition".into()),
            ..LoaderConfig::default()
        });
        let result = loader.parse_table(Cursor::new("id,G1,G2\nS1,1,a\n"), FileFormat::Csv);
        assert!(matches!(result, Err(PipelineError::MalformedInput(_))));
    }

    #[test]
    fn test_non_numeric_value() {
        let loader = TableLoader::new();
        let result = loader.parse_table(
            Cursor::new("id,G1,G2,cond\nS1,1,oops,a\n"),
            FileFormat::Csv,
        );
        match result {
            Err(PipelineError::MalformedInput(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_load_gzipped_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tsv.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"id\tG1.2\tG2\tcond\nS1\t0.5\t1.5\thealthy\nS2\t2.5\t3.5\tsick\n")
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = TableLoader::new().load(&path).unwrap();
        assert_eq!(table.genes(), &["G1", "G2"]);
        assert_eq!(table.project(&["G1".to_string()]).unwrap().get(1, 0), 2.5);
    }
}
