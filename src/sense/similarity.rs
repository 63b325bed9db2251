//! Similarity between sparse neighbor-weight vectors

use crate::error::{Error, Result};
use crate::sense::Context;
use std::fmt;
use std::str::FromStr;

/// How closely two contexts agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextSimilarity {
    /// Cosine of the angle between the two weight vectors
    #[default]
    Cosine,
    /// Always 0, which makes disambiguation pick the first sense
    Dummy,
}

impl ContextSimilarity {
    /// Score two contexts. Cosine is 0 when either vector is empty or all zero.
    pub fn similarity<N: Ord>(self, left: &Context<N>, right: &Context<N>) -> f64 {
        match self {
            ContextSimilarity::Dummy => 0.0,
            ContextSimilarity::Cosine => {
                let (small, large) = if left.len() <= right.len() {
                    (left, right)
                } else {
                    (right, left)
                };

                let dot: f64 = small
                    .iter()
                    .filter_map(|(key, a)| large.get(key).map(|b| a * b))
                    .sum();
                if dot == 0.0 {
                    return 0.0;
                }

                let norm_left = left.values().map(|w| w * w).sum::<f64>().sqrt();
                let norm_right = right.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm_left == 0.0 || norm_right == 0.0 {
                    return 0.0;
                }

                dot / (norm_left * norm_right)
            }
        }
    }
}

impl fmt::Display for ContextSimilarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextSimilarity::Cosine => "cosine",
            ContextSimilarity::Dummy => "dummy",
        })
    }
}

impl FromStr for ContextSimilarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(ContextSimilarity::Cosine),
            "dummy" => Ok(ContextSimilarity::Dummy),
            other => Err(Error::invalid_configuration(
                "similarity",
                format!("unknown context similarity '{}'", other),
            )),
        }
    }
}
