pub mod flat;
pub mod ivf;

use crate::domain::ports::vector_index::VectorIndex;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Flat,
    Ivf,
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" | "exact" => Ok(IndexKind::Flat),
            "ivf" | "ivfflat" => Ok(IndexKind::Ivf),
            _ => Err(format!("Unknown index kind: {s}")),
        }
    }
}

pub fn build_index(kind: IndexKind, config: ivf::IvfConfig) -> Box<dyn VectorIndex> {
    match kind {
        IndexKind::Flat => Box::new(flat::FlatIndex::new()),
        IndexKind::Ivf => Box::new(ivf::IvfIndex::new(config)),
    }
}
