use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Advisory summary size. Only ever rendered into the prompt; the model's
/// output is not truncated to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Brief,
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 4] = [
        SummaryLength::Brief,
        SummaryLength::Short,
        SummaryLength::Medium,
        SummaryLength::Long,
    ];

    pub fn target_words(self) -> u32 {
        match self {
            SummaryLength::Brief => 50,
            SummaryLength::Short => 100,
            SummaryLength::Medium => 250,
            SummaryLength::Long => 500,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SummaryLength::Brief => "brief",
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (~{} words)", self.label(), self.target_words())
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let wanted = input.trim().to_ascii_lowercase();
        SummaryLength::ALL
            .into_iter()
            .find(|length| length.label() == wanted)
            .ok_or_else(|| format!("unknown summary length: {input} (expected brief, short, medium or long)"))
    }
}
