use std::path::Path;
use anyhow::{Context, Result};

/// Ensure the parent directory of an output file exists
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    match path.as_ref().parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))
        }
        _ => Ok(()),
    }
}

/// Format duration as human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

/// Format number with commas
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Seeded randomness
pub mod random {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Create RNG with fixed seed
    pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }
}

/// Configuration checks
pub mod validation {
    use crate::error::{PipelineError, Result};
    use std::fmt::Display;

    /// Validate that value is positive
    pub fn positive<T: PartialOrd + Default + Display>(value: T, name: &str) -> Result<()> {
        if value <= T::default() {
            return Err(PipelineError::InvalidConfig(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30.0s");
        assert_eq!(format_duration(90.0), "1.5m");
        assert_eq!(format_duration(3600.0), "1.0h");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(7), "7");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_seeded_rng() {
        let a: Vec<u32> = (0..4).map(|_| random::seeded_rng(42).gen()).collect();
        let mut rng = random::seeded_rng(42);
        let first: u32 = rng.gen();
        assert!(a.iter().all(|&v| v == first));
        assert_ne!(first, random::seeded_rng(43).gen::<u32>());
    }

    #[test]
    fn test_validation() {
        assert!(validation::positive(1usize, "value").is_ok());
        assert!(validation::positive(0usize, "value").is_err());
        assert!(validation::positive(0.5, "value").is_ok());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("report.json");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("nested").is_dir());
        ensure_parent_dir("report.json").unwrap();
    }
}
