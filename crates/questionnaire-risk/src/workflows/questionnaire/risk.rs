use super::normalizer::risk_lookup_key;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// Relative slack allowed between a stored score and `weight * level`.
const SCORE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, thiserror::Error)]
pub enum RiskProfileError {
    #[error("risk id '{0}' is not a number")]
    InvalidRiskId(String),
    #[error("{field} must be a finite number, found {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("risk score {score} does not equal response weight {weight} x risk level {level}")]
    InconsistentScore { weight: f64, level: f64, score: f64 },
    #[error("risk id {risk_id} lists response '{response}' more than once with different weights")]
    ConflictingEntry { risk_id: f64, response: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Precomputed weighting for one response to one scored question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskEntry {
    response_weight: f64,
    risk_level: f64,
    risk_score: f64,
}

impl RiskEntry {
    /// Accepts a stored triple; the score must already equal `weight * level`.
    pub fn new(
        response_weight: f64,
        risk_level: f64,
        risk_score: f64,
    ) -> Result<Self, RiskProfileError> {
        finite("response weight", response_weight)?;
        finite("risk level", risk_level)?;
        finite("risk score", risk_score)?;

        let expected = response_weight * risk_level;
        if (expected - risk_score).abs() > SCORE_TOLERANCE * expected.abs().max(1.0) {
            return Err(RiskProfileError::InconsistentScore {
                weight: response_weight,
                level: risk_level,
                score: risk_score,
            });
        }

        Ok(Self {
            response_weight,
            risk_level,
            risk_score,
        })
    }

    /// Table-build constructor: computes the score once.
    pub fn from_weights(response_weight: f64, risk_level: f64) -> Result<Self, RiskProfileError> {
        Self::new(response_weight, risk_level, response_weight * risk_level)
    }

    pub fn response_weight(&self) -> f64 {
        self.response_weight
    }

    pub fn risk_level(&self) -> f64 {
        self.risk_level
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), RiskProfileError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RiskProfileError::NonFinite { field, value })
    }
}

/// Risk id bits, with `-0.0` folded onto `0.0` so both address the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RiskIdKey(u64);

impl RiskIdKey {
    fn new(risk_id: f64) -> Self {
        if risk_id == 0.0 {
            Self(0.0_f64.to_bits())
        } else {
            Self(risk_id.to_bits())
        }
    }
}

/// Immutable `(risk id, response) -> RiskEntry` lookup.
#[derive(Debug, Clone, Default)]
pub struct RiskProfileTable {
    profiles: HashMap<RiskIdKey, HashMap<String, RiskEntry>>,
}

impl RiskProfileTable {
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, RiskProfileError>
    where
        I: IntoIterator<Item = (f64, &'a str, RiskEntry)>,
    {
        let mut profiles: HashMap<RiskIdKey, HashMap<String, RiskEntry>> = HashMap::new();
        for (risk_id, response, entry) in entries {
            finite("risk id", risk_id)?;
            let responses = profiles.entry(RiskIdKey::new(risk_id)).or_default();
            let key = risk_lookup_key(response);
            match responses.get(&key) {
                Some(existing) if *existing != entry => {
                    return Err(RiskProfileError::ConflictingEntry {
                        risk_id,
                        response: key,
                    });
                }
                Some(_) => {}
                None => {
                    responses.insert(key, entry);
                }
            }
        }

        Ok(Self { profiles })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RiskProfileError> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    /// Risk profile JSON: risk id -> response text -> weights. Response keys
    /// are re-derived with the lookup key function so curly quotes or stray
    /// casing in the file cannot break joins.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, RiskProfileError> {
        let document: BTreeMap<String, BTreeMap<String, StoredRiskEntry>> =
            serde_json::from_reader(reader)?;

        let mut entries = Vec::new();
        for (raw_id, responses) in &document {
            let risk_id = raw_id
                .trim()
                .parse::<f64>()
                .map_err(|_| RiskProfileError::InvalidRiskId(raw_id.clone()))?;
            for (response, stored) in responses {
                let entry =
                    RiskEntry::new(stored.response_weight, stored.risk_level, stored.risk_score)?;
                entries.push((risk_id, response.as_str(), entry));
            }
        }

        Self::from_entries(entries)
    }

    pub fn contains_risk_id(&self, risk_id: f64) -> bool {
        self.profiles.contains_key(&RiskIdKey::new(risk_id))
    }

    pub fn lookup(&self, risk_id: f64, response: &str) -> Option<RiskEntry> {
        self.profiles
            .get(&RiskIdKey::new(risk_id))
            .and_then(|responses| responses.get(&risk_lookup_key(response)))
            .copied()
    }

    /// Number of scored questions.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct StoredRiskEntry {
    #[serde(rename = "Response Weights")]
    response_weight: f64,
    #[serde(rename = "Risk Level")]
    risk_level: f64,
    risk_score: f64,
}
