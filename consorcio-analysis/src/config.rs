use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tamanho mínimo {min_length} inválido (mínimo 2)")]
    MinLengthTooSmall { min_length: u32 },

    #[error("ocupação mínima {value} fora do intervalo [0, 1]")]
    OccupiedFractionOutOfRange { value: f64 },
}

/// Parameters of the endpoint-opportunity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSearch {
    pub min_length: u32,
    pub min_occupied_fraction: f64,
    /// Longest interval considered; bounds the search cost. Below
    /// `min_length` nothing qualifies.
    pub max_span: u32,
}

impl Default for EdgeSearch {
    fn default() -> Self {
        Self {
            min_length: 5,
            min_occupied_fraction: 0.5,
            max_span: 50,
        }
    }
}

impl EdgeSearch {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length < 2 {
            return Err(ConfigError::MinLengthTooSmall {
                min_length: self.min_length,
            });
        }
        if !(0.0..=1.0).contains(&self.min_occupied_fraction) {
            return Err(ConfigError::OccupiedFractionOutOfRange {
                value: self.min_occupied_fraction,
            });
        }
        Ok(())
    }
}

/// Caller-facing configuration, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_length: u32,
    pub min_occupied_fraction: f64,
    pub max_span: u32,
    /// Rows shown by reports; analyzers always rank everything.
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let edges = EdgeSearch::default();
        Self {
            min_length: edges.min_length,
            min_occupied_fraction: edges.min_occupied_fraction,
            max_span: edges.max_span,
            top_n: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Não foi possível ler {:?}", path))?;
        let config: AnalysisConfig = serde_json::from_str(&json)
            .with_context(|| format!("JSON inválido em {:?}", path))?;
        config.edge_search().validate()?;
        Ok(config)
    }

    pub fn edge_search(&self) -> EdgeSearch {
        EdgeSearch {
            min_length: self.min_length,
            min_occupied_fraction: self.min_occupied_fraction,
            max_span: self.max_span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.min_length, 5);
        assert!((config.min_occupied_fraction - 0.5).abs() < 1e-12);
        assert_eq!(config.max_span, 50);
        assert_eq!(config.top_n, 10);
        assert!(config.edge_search().validate().is_ok());
    }

    #[test]
    fn test_min_length_too_small() {
        let search = EdgeSearch {
            min_length: 1,
            ..EdgeSearch::default()
        };
        assert_eq!(
            search.validate(),
            Err(ConfigError::MinLengthTooSmall { min_length: 1 })
        );
    }

    #[test]
    fn test_fraction_out_of_range() {
        for value in [-0.1, 1.01, f64::NAN] {
            let search = EdgeSearch {
                min_occupied_fraction: value,
                ..EdgeSearch::default()
            };
            assert!(matches!(
                search.validate(),
                Err(ConfigError::OccupiedFractionOutOfRange { .. })
            ));
        }
        let edge = EdgeSearch {
            min_occupied_fraction: 1.0,
            ..EdgeSearch::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_max_span_below_min_length_is_valid() {
        let search = EdgeSearch {
            min_length: 10,
            max_span: 9,
            ..EdgeSearch::default()
        };
        assert_eq!(search.validate(), Ok(()));
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consorcio.json");
        std::fs::write(&path, r#"{ "min_length": 8, "top_n": 3 }"#).unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.min_length, 8);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.max_span, 50);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consorcio.json");
        std::fs::write(&path, r#"{ "min_occupied_fraction": 1.5 }"#).unwrap();
        assert!(AnalysisConfig::load(&path).is_err());
    }
}
