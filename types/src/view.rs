//! Display projections of candidates. Built on demand, never persisted.

use std::fmt;

use serde::Serialize;

use crate::{Candidate, Points, ShortCode};

/// A candidate as seen by one participant (their allocation) or in the result
/// listing (the aggregate total).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    /// 1-based position in the poll's candidate list.
    pub index: usize,
    pub text: String,
    pub short_code: ShortCode,
    pub points: Points,
}

impl View {
    #[must_use]
    pub fn new(index: usize, candidate: &Candidate, points: Points) -> Self {
        Self {
            index,
            text: candidate.text().to_string(),
            short_code: candidate.short_code().clone(),
            points,
        }
    }

    /// Button label form: `2. Dune`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}. {}", self.index, self.text)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} - **{}**", self.index, self.text, self.points)
    }
}

/// One view per line.
#[must_use]
pub fn format_views(views: &[View]) -> String {
    views
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
