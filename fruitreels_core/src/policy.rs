use serde::{Deserialize, Serialize};

/// One credit band of the suppression curve. `max_credits == None` means
/// open-ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SuppressionBand {
    pub min_credits: u64,
    pub max_credits: Option<u64>,
    pub probability: f64,
}

impl SuppressionBand {
    fn contains(&self, credits: u64) -> bool {
        credits >= self.min_credits && self.max_credits.map_or(true, |max| credits <= max)
    }
}

/// Probability of discarding a winning draw, as a function of the post-stake
/// credit balance. Balances outside every band are never suppressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuppressionPolicy(pub Vec<SuppressionBand>);

impl SuppressionPolicy {
    /// 0 below 40, 0.3 for 40..=60, 0.6 above 60.
    pub fn house_default() -> Self {
        Self(vec![
            SuppressionBand {
                min_credits: 40,
                max_credits: Some(60),
                probability: 0.3,
            },
            SuppressionBand {
                min_credits: 61,
                max_credits: None,
                probability: 0.6,
            },
        ])
    }

    /// A policy that lets every win stand.
    pub fn disabled() -> Self {
        Self(Vec::new())
    }

    pub fn probability(&self, credits: u64) -> f64 {
        self.0
            .iter()
            .find(|band| band.contains(credits))
            .map_or(0.0, |band| band.probability.clamp(0.0, 1.0))
    }
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self::house_default()
    }
}
