//! Node weighting schemes for Chinese Whispers

use crate::error::{require_positive_weight, Error, Result};
use std::fmt;
use std::str::FromStr;

/// How much a neighbor's vote counts toward its label.
///
/// Every scheme rejects zero, negative and non-finite edge weights with
/// [`Error::InvalidWeight`]. [`NodeWeighting::Log`] also rejects weights of
/// `1/e` and below, whose score would not be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeWeighting {
    /// Every vote is worth 1
    #[default]
    Top,
    /// The edge weight itself
    Linear,
    /// `1 + ln(weight)`; defined for weights above `1/e`
    Log,
    /// Number of the node's neighbors currently holding the same label
    Label,
}

impl NodeWeighting {
    /// Score of one vote.
    ///
    /// `votes` is how many neighbors of the node currently carry the label
    /// being scored.
    pub fn weight(self, edge_weight: f64, votes: usize) -> Result<f64> {
        let edge_weight = require_positive_weight(edge_weight)?;

        Ok(match self {
            NodeWeighting::Top => 1.0,
            NodeWeighting::Linear => edge_weight,
            NodeWeighting::Log => {
                let score = 1.0 + edge_weight.ln();
                if score <= 0.0 {
                    return Err(Error::InvalidWeight {
                        weight: edge_weight,
                    });
                }
                score
            }
            NodeWeighting::Label => votes as f64,
        })
    }
}

impl fmt::Display for NodeWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeWeighting::Top => "top",
            NodeWeighting::Linear => "linear",
            NodeWeighting::Log => "log",
            NodeWeighting::Label => "label",
        };
        f.write_str(name)
    }
}

impl FromStr for NodeWeighting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(NodeWeighting::Top),
            "linear" | "lin" => Ok(NodeWeighting::Linear),
            "log" => Ok(NodeWeighting::Log),
            "label" => Ok(NodeWeighting::Label),
            other => Err(Error::invalid_configuration(
                "weighting",
                format!("unknown node weighting '{}'", other),
            )),
        }
    }
}
