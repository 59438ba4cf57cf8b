//! Hash rate measurement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashRateUnit {
    #[serde(rename = "H/s")]
    Hashes,
    #[serde(rename = "GH/s")]
    GigaHashes,
    #[default]
    #[serde(rename = "TH/s")]
    TeraHashes,
    #[serde(rename = "PH/s")]
    PetaHashes,
}

impl HashRateUnit {
    fn terahash_factor(self) -> f64 {
        match self {
            Self::Hashes => 1e-12,
            Self::GigaHashes => 1e-3,
            Self::TeraHashes => 1.0,
            Self::PetaHashes => 1e3,
        }
    }
}

impl std::fmt::Display for HashRateUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hashes => f.write_str("H/s"),
            Self::GigaHashes => f.write_str("GH/s"),
            Self::TeraHashes => f.write_str("TH/s"),
            Self::PetaHashes => f.write_str("PH/s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashRate {
    pub value: f64,
    #[serde(default)]
    pub unit: HashRateUnit,
}

impl HashRate {
    #[must_use]
    pub fn terahashes(value: f64) -> Self {
        Self {
            value,
            unit: HashRateUnit::TeraHashes,
        }
    }

    /// Value normalized to TH/s, the unit rules compare against.
    #[must_use]
    pub fn as_terahashes(&self) -> f64 {
        self.value * self.unit.terahash_factor()
    }
}

impl std::fmt::Display for HashRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_normalize_to_terahashes() {
        let rate = HashRate {
            value: 1.5,
            unit: HashRateUnit::PetaHashes,
        };
        assert!((rate.as_terahashes() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn should_default_unit_to_terahashes_when_deserializing() {
        let rate: HashRate = serde_json::from_str(r#"{"value": 90.0}"#).unwrap();
        assert_eq!(rate, HashRate::terahashes(90.0));
        assert_eq!(rate.to_string(), "90.00 TH/s");
    }

    #[test]
    fn should_use_symbolic_unit_names_in_json() {
        let json = serde_json::to_value(HashRate {
            value: 500.0,
            unit: HashRateUnit::GigaHashes,
        })
        .unwrap();
        assert_eq!(json["unit"], "GH/s");
    }
}
