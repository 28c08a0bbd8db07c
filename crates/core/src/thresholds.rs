//! Warning/danger threshold definitions.
//!
//! [`Thresholds`] is an immutable snapshot of the per-metric threshold
//! pairs. Updates replace the whole value; nothing mutates a snapshot in
//! place. A metric that is absent from a snapshot is simply not evaluated.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reading::Metric;

/// Warning and danger levels for one metric. Valid pairs satisfy
/// `warning < danger`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning: f64,
    pub danger: f64,
}

impl ThresholdPair {
    pub fn new(warning: f64, danger: f64) -> Self {
        Self { warning, danger }
    }

    /// Check the pair is usable for `metric`.
    pub fn validate(&self, metric: Metric) -> Result<(), CoreError> {
        if !self.warning.is_finite() || !self.danger.is_finite() {
            return Err(CoreError::NonFiniteThreshold(metric));
        }
        if self.warning >= self.danger {
            return Err(CoreError::InvertedThresholds {
                metric,
                warning: self.warning,
                danger: self.danger,
            });
        }
        Ok(())
    }
}

/// Metric → threshold pair mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds {
    pairs: BTreeMap<Metric, ThresholdPair>,
}

impl Thresholds {
    /// Build a snapshot from pairs without completeness checks.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Metric, ThresholdPair)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<&ThresholdPair> {
        self.pairs.get(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &ThresholdPair)> {
        self.pairs.iter().map(|(m, p)| (*m, p))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Require every metric to be present with a valid pair.
    pub fn validate_complete(&self) -> Result<(), CoreError> {
        for metric in Metric::ALL {
            let pair = self.get(metric).ok_or(CoreError::MissingMetric(metric))?;
            pair.validate(metric)?;
        }
        Ok(())
    }

    /// Drop every invalid pair, returning why each one was dropped.
    pub fn retain_valid(&mut self) -> Vec<CoreError> {
        let mut rejected = Vec::new();
        self.pairs.retain(|metric, pair| match pair.validate(*metric) {
            Ok(()) => true,
            Err(e) => {
                rejected.push(e);
                false
            }
        });
        rejected
    }

    /// Metrics with no thresholds in this snapshot.
    pub fn missing_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| !self.pairs.contains_key(m))
            .collect()
    }
}

impl TryFrom<HashMap<String, ThresholdPair>> for Thresholds {
    type Error = CoreError;

    /// Parse a wire mapping keyed by metric name. Unknown metric names,
    /// missing metrics and invalid pairs are all rejected.
    fn try_from(raw: HashMap<String, ThresholdPair>) -> Result<Self, Self::Error> {
        let mut pairs = BTreeMap::new();
        for (name, pair) in raw {
            let metric: Metric = name.parse()?;
            pairs.insert(metric, pair);
        }
        let thresholds = Self { pairs };
        thresholds.validate_complete()?;
        Ok(thresholds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn wire(pairs: &[(&str, f64, f64)]) -> HashMap<String, ThresholdPair> {
        pairs
            .iter()
            .map(|(name, w, d)| (name.to_string(), ThresholdPair::new(*w, *d)))
            .collect()
    }

    fn full_wire() -> HashMap<String, ThresholdPair> {
        wire(&[
            ("temperature", 28.0, 35.0),
            ("humidity", 60.0, 80.0),
            ("co2", 800.0, 1500.0),
            ("pm25", 35.0, 75.0),
        ])
    }

    #[test]
    fn complete_mapping_is_accepted() {
        let thresholds = Thresholds::try_from(full_wire()).unwrap();
        assert_eq!(thresholds.len(), 4);
        assert_eq!(
            thresholds.get(Metric::Co2),
            Some(&ThresholdPair::new(800.0, 1500.0))
        );
    }

    #[test]
    fn missing_metric_is_rejected() {
        let mut raw = full_wire();
        raw.remove("pm25");
        assert_matches!(
            Thresholds::try_from(raw),
            Err(CoreError::MissingMetric(Metric::Pm25))
        );
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let mut raw = full_wire();
        raw.insert("voc".into(), ThresholdPair::new(1.0, 2.0));
        assert_matches!(
            Thresholds::try_from(raw),
            Err(CoreError::UnknownMetric(name)) if name == "voc"
        );
    }

    #[test]
    fn inverted_pair_is_rejected() {
        let mut raw = full_wire();
        raw.insert("co2".into(), ThresholdPair::new(1500.0, 800.0));
        assert_matches!(
            Thresholds::try_from(raw),
            Err(CoreError::InvertedThresholds {
                metric: Metric::Co2,
                ..
            })
        );
    }

    #[test]
    fn equal_pair_is_rejected() {
        assert!(ThresholdPair::new(10.0, 10.0).validate(Metric::Humidity).is_err());
    }

    #[test]
    fn nan_pair_is_rejected() {
        assert_matches!(
            ThresholdPair::new(f64::NAN, 10.0).validate(Metric::Humidity),
            Err(CoreError::NonFiniteThreshold(Metric::Humidity))
        );
    }

    #[test]
    fn retain_valid_drops_unusable_pairs() {
        let mut thresholds = Thresholds::from_pairs([
            (Metric::Temperature, ThresholdPair::new(30.0, 30.0)),
            (Metric::Co2, ThresholdPair::new(1500.0, 800.0)),
            (Metric::Pm25, ThresholdPair::new(35.0, 75.0)),
        ]);

        let rejected = thresholds.retain_valid();

        assert_eq!(rejected.len(), 2);
        assert_eq!(thresholds.len(), 1);
        assert!(thresholds.get(Metric::Co2).is_none());
        assert_eq!(
            thresholds.missing_metrics(),
            vec![Metric::Temperature, Metric::Humidity, Metric::Co2]
        );
    }

    #[test]
    fn partial_snapshot_reports_missing_metrics() {
        let thresholds =
            Thresholds::from_pairs([(Metric::Co2, ThresholdPair::new(800.0, 1500.0))]);
        assert_eq!(
            thresholds.missing_metrics(),
            vec![Metric::Temperature, Metric::Humidity, Metric::Pm25]
        );
        assert!(thresholds.get(Metric::Pm25).is_none());
    }

    #[test]
    fn serializes_as_plain_map() {
        let thresholds = Thresholds::try_from(full_wire()).unwrap();
        let json = serde_json::to_value(&thresholds).unwrap();
        assert_eq!(json["co2"]["warning"], 800.0);
        assert_eq!(json["pm25"]["danger"], 75.0);

        let back: Thresholds = serde_json::from_value(json).unwrap();
        assert_eq!(back, thresholds);
    }
}
