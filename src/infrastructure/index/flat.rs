use crate::domain::ports::vector_index::VectorIndex;
use std::collections::BTreeSet;

/// Exact index: every stored id is a candidate.
#[derive(Debug, Default)]
pub struct FlatIndex {
    ids: BTreeSet<String>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, id: &str, _vector: &[f32]) {
        self.ids.insert(id.to_string());
    }

    fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    fn candidates(&self, _query: &[f32]) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}
