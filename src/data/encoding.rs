use crate::error::{PipelineError, Result};
use std::collections::HashMap;

/// Dense integer codec for condition labels.
///
/// Codes are assigned in first-occurrence order of the label column, so the
/// same column always yields the same codes.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    /// Label for each code
    labels: Vec<String>,
    /// Code for each label
    codes: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Fit the codec on a label column and return it with the coded column
    pub fn fit_transform<S: AsRef<str>>(column: &[S]) -> Result<(Self, Vec<usize>)> {
        if column.is_empty() {
            return Err(PipelineError::Encoding("label column is empty".into()));
        }

        let mut encoder = Self {
            labels: Vec::new(),
            codes: HashMap::new(),
        };
        let coded = column
            .iter()
            .map(|label| encoder.insert(label.as_ref()))
            .collect();

        Ok((encoder, coded))
    }

    fn insert(&mut self, label: &str) -> usize {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.labels.len();
        self.labels.push(label.to_string());
        self.codes.insert(label.to_string(), code);
        code
    }

    /// Code of a label seen during fitting
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    /// Label behind a code
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Number of distinct labels
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Labels in code order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_occurrence_order() {
        let column = ["sick", "healthy", "sick", "unknown", "healthy"];
        let (encoder, coded) = LabelEncoder::fit_transform(&column).unwrap();

        assert_eq!(encoder.labels(), &["sick", "healthy", "unknown"]);
        assert_eq!(coded, vec![0, 1, 0, 2, 1]);
        assert_eq!(encoder.n_classes(), 3);
    }

    #[test]
    fn test_empty_column_fails() {
        let column: Vec<String> = Vec::new();
        assert!(matches!(
            LabelEncoder::fit_transform(&column),
            Err(PipelineError::Encoding(_))
        ));
    }

    #[test]
    fn test_unknown_label() {
        let (encoder, _) = LabelEncoder::fit_transform(&["a", "b"]).unwrap();
        assert_eq!(encoder.encode("c"), None);
        assert_eq!(encoder.decode(2), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip(column in prop::collection::vec("[a-e]", 1..60)) {
            let (encoder, coded) = LabelEncoder::fit_transform(&column).unwrap();

            for (label, &code) in column.iter().zip(&coded) {
                prop_assert!(code < encoder.n_classes());
                prop_assert_eq!(encoder.decode(code), Some(label.as_str()));
                prop_assert_eq!(encoder.encode(label), Some(code));
            }
        }
    }
}
