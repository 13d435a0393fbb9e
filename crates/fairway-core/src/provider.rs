use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical provider identifiers used in receipts, credit ledgers, and
/// stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Directory,
    Apollo,
    Hunter,
    Jina,
    Perplexity,
    Firecrawl,
}

impl ProviderId {
    pub const ALL: [Self; 6] = [
        Self::Directory,
        Self::Apollo,
        Self::Hunter,
        Self::Jina,
        Self::Perplexity,
        Self::Firecrawl,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Apollo => "apollo",
            Self::Hunter => "hunter",
            Self::Jina => "jina",
            Self::Perplexity => "perplexity",
            Self::Firecrawl => "firecrawl",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "directory" => Ok(Self::Directory),
            "apollo" => Ok(Self::Apollo),
            "hunter" => Ok(Self::Hunter),
            "jina" => Ok(Self::Jina),
            "perplexity" => Ok(Self::Perplexity),
            "firecrawl" => Ok(Self::Firecrawl),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}
