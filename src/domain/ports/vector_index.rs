/// In-process index used to prune candidates before exact scoring.
///
/// `candidates` may return a superset of the true neighbours but, for the
/// index to be usable under a threshold contract, must never drop ids when the
/// index holds fewer vectors than its approximation kicks in at.
pub trait VectorIndex: Send + Sync {
    fn insert(&mut self, id: &str, vector: &[f32]);
    fn remove(&mut self, id: &str) -> bool;
    fn candidates(&self, query: &[f32]) -> Vec<String>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self) -> &'static str;
}
