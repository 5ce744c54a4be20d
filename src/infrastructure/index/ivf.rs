//! Inverted-file index over cosine similarity.
//!
//! Vectors are partitioned into `lists` clusters by a spherical k-means coarse
//! quantizer. A query only visits the `probes` clusters whose centroids are
//! closest to it. Until the index holds `min_train_size` vectors it is not
//! trained and returns every id, so small corpora are always scanned exactly.
//! Once trained, the quantizer is kept until removals shrink the index below
//! half of `min_train_size`.

use crate::domain::ports::vector_index::VectorIndex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfConfig {
    pub lists: usize,
    pub probes: usize,
    pub min_train_size: usize,
    pub iterations: usize,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            lists: 100,
            probes: 10,
            min_train_size: 1000,
            iterations: 10,
        }
    }
}

pub struct IvfIndex {
    config: IvfConfig,
    /// Unit-normalised copies, keyed by id. BTreeMap keeps training deterministic.
    vectors: BTreeMap<String, Vec<f32>>,
    centroids: Vec<Vec<f32>>,
    assignments: BTreeMap<String, usize>,
    lists: Vec<BTreeSet<String>>,
    train_runs: u64,
}

impl IvfIndex {
    pub fn new(config: IvfConfig) -> Self {
        let config = IvfConfig {
            lists: config.lists.max(1),
            probes: config.probes.max(1),
            ..config
        };
        Self {
            config,
            vectors: BTreeMap::new(),
            centroids: Vec::new(),
            assignments: BTreeMap::new(),
            lists: Vec::new(),
            train_runs: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(BTreeSet::len).collect()
    }

    fn normalize(vector: &[f32]) -> Vec<f32> {
        let norm = vector
            .iter()
            .map(|x| (*x as f64) * (*x as f64))
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return vector.to_vec();
        }
        vector.iter().map(|x| (*x as f64 / norm) as f32).collect()
    }

    fn dot(a: &[f32], b: &[f32]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum()
    }

    fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, c) in centroids.iter().enumerate() {
            let score = Self::dot(c, vector);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }

    /// Farthest-point seeding: start from the first vector in id order, then
    /// repeatedly take the vector least similar to every seed chosen so far.
    fn seed_centroids(&self, k: usize) -> Vec<Vec<f32>> {
        let points: Vec<&Vec<f32>> = self.vectors.values().collect();
        let mut seeds: Vec<Vec<f32>> = vec![points[0].clone()];
        let mut closest: Vec<f64> = points.iter().map(|p| Self::dot(p, points[0])).collect();

        while seeds.len() < k {
            let mut pick = 0;
            for (i, sim) in closest.iter().enumerate() {
                if *sim < closest[pick] {
                    pick = i;
                }
            }
            let seed = points[pick].clone();
            for (i, p) in points.iter().enumerate() {
                closest[i] = closest[i].max(Self::dot(p, &seed));
            }
            seeds.push(seed);
        }
        seeds
    }

    fn train(&mut self) {
        let n = self.vectors.len();
        let k = self.config.lists.min(n);
        if k == 0 {
            return;
        }

        let mut centroids = self.seed_centroids(k);

        let dim = centroids[0].len();
        for _ in 0..self.config.iterations {
            let mut sums = vec![vec![0.0_f64; dim]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for v in self.vectors.values() {
                let c = Self::nearest_centroid(&centroids, v);
                counts[c] += 1;
                for (s, x) in sums[c].iter_mut().zip(v.iter()) {
                    *s += *x as f64;
                }
            }
            for (i, sum) in sums.into_iter().enumerate() {
                // Empty clusters keep their previous centroid.
                if counts[i] == 0 {
                    continue;
                }
                let mean: Vec<f32> = sum.iter().map(|s| (*s / counts[i] as f64) as f32).collect();
                centroids[i] = Self::normalize(&mean);
            }
        }

        self.lists = vec![BTreeSet::new(); centroids.len()];
        self.assignments.clear();
        for (id, v) in &self.vectors {
            let c = Self::nearest_centroid(&centroids, v);
            self.lists[c].insert(id.clone());
            self.assignments.insert(id.clone(), c);
        }
        self.centroids = centroids;
        self.train_runs += 1;
        debug!(
            run = self.train_runs,
            vectors = n,
            lists = self.centroids.len(),
            "Trained IVF coarse quantizer"
        );
    }

    fn reset_training(&mut self) {
        self.centroids.clear();
        self.lists.clear();
        self.assignments.clear();
    }
}

impl VectorIndex for IvfIndex {
    fn insert(&mut self, id: &str, vector: &[f32]) {
        self.remove(id);
        let normalized = Self::normalize(vector);
        if self.is_trained() {
            let c = Self::nearest_centroid(&self.centroids, &normalized);
            self.lists[c].insert(id.to_string());
            self.assignments.insert(id.to_string(), c);
            self.vectors.insert(id.to_string(), normalized);
        } else {
            self.vectors.insert(id.to_string(), normalized);
            if self.vectors.len() >= self.config.min_train_size {
                self.train();
            }
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.vectors.remove(id).is_none() {
            return false;
        }
        if let Some(c) = self.assignments.remove(id) {
            self.lists[c].remove(id);
        }
        if self.is_trained() && self.vectors.len() < self.config.min_train_size / 2 {
            self.reset_training();
        }
        true
    }

    fn candidates(&self, query: &[f32]) -> Vec<String> {
        if !self.is_trained() {
            return self.vectors.keys().cloned().collect();
        }
        let query = Self::normalize(query);
        let mut ranked: Vec<(usize, f64)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, Self::dot(c, &query)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(self.config.probes)
            .flat_map(|(i, _)| self.lists[i].iter().cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn name(&self) -> &'static str {
        "ivf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(lists: usize, probes: usize, min_train_size: usize) -> IvfConfig {
        IvfConfig {
            lists,
            probes,
            min_train_size,
            iterations: 5,
        }
    }

    /// Points spread around one of four axis directions in 4-d space.
    fn clustered(n: usize) -> Vec<(String, Vec<f32>)> {
        (0..n)
            .map(|i| {
                let axis = i % 4;
                let mut v = vec![0.05_f32 * ((i / 4) % 3) as f32; 4];
                v[axis] = 1.0;
                (format!("id-{i:04}"), v)
            })
            .collect()
    }

    #[test]
    fn test_untrained_returns_everything() {
        let mut idx = IvfIndex::new(config(4, 1, 100));
        for (id, v) in clustered(20) {
            idx.insert(&id, &v);
        }
        assert!(!idx.is_trained());
        assert_eq!(idx.candidates(&[1.0, 0.0, 0.0, 0.0]).len(), 20);
    }

    #[test]
    fn test_trains_at_min_size_and_partitions() {
        let mut idx = IvfIndex::new(config(4, 1, 40));
        for (id, v) in clustered(40) {
            idx.insert(&id, &v);
        }
        assert!(idx.is_trained());
        assert_eq!(idx.list_sizes().iter().sum::<usize>(), 40);

        let hits = idx.candidates(&[1.0, 0.0, 0.0, 0.0]);
        assert!(hits.len() < 40);
        // Every axis-0 point (i % 4 == 0) lands in the probed list.
        for i in (0..40).step_by(4) {
            assert!(hits.contains(&format!("id-{i:04}")));
        }
    }

    #[test]
    fn test_probing_all_lists_is_exhaustive() {
        let mut idx = IvfIndex::new(config(4, 4, 10));
        for (id, v) in clustered(30) {
            idx.insert(&id, &v);
        }
        assert_eq!(idx.candidates(&[0.0, 1.0, 0.0, 0.0]).len(), 30);
    }

    #[test]
    fn test_remove_keeps_lists_consistent_and_untrains() {
        let mut idx = IvfIndex::new(config(4, 1, 12));
        let points = clustered(12);
        for (id, v) in &points {
            idx.insert(id, v);
        }
        assert!(idx.is_trained());
        assert!(idx.remove("id-0000"));
        assert!(!idx.remove("id-0000"));
        assert_eq!(idx.len(), 11);
        assert!(!idx.is_trained());
        assert!(!idx.candidates(&[1.0, 0.0, 0.0, 0.0]).contains(&"id-0000".to_string()));
        assert_eq!(idx.candidates(&[1.0, 0.0, 0.0, 0.0]).len(), 11);
    }

    #[test]
    fn test_reinsert_moves_vector() {
        let mut idx = IvfIndex::new(config(4, 1, 8));
        for (id, v) in clustered(8) {
            idx.insert(&id, &v);
        }
        idx.insert("id-0000", &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(idx.len(), 8);
        assert!(idx.candidates(&[0.0, 0.0, 0.0, 1.0]).contains(&"id-0000".to_string()));
        assert_eq!(idx.list_sizes().iter().sum::<usize>(), 8);
    }

    #[test]
    fn test_churn_at_training_size_does_not_retrain() {
        let data = clustered(10);
        let mut index = IvfIndex::new(config(4, 1, data.len()));
        for (id, v) in &data {
            index.insert(id, v);
        }
        assert!(index.is_trained());
        assert_eq!(index.train_runs, 1);

        for (id, v) in data.iter().take(5) {
            assert!(index.remove(id));
            assert!(index.is_trained());
            index.insert(id, v);
        }
        assert_eq!(index.train_runs, 1);
        assert_eq!(index.list_sizes().iter().sum::<usize>(), data.len());
    }

    #[test]
    fn test_training_dropped_below_half_and_redone_at_size() {
        let data = clustered(10);
        let min = data.len();
        let mut index = IvfIndex::new(config(4, 1, min));
        for (id, v) in &data {
            index.insert(id, v);
        }

        let removed: Vec<_> = data.iter().take(min / 2 + 1).collect();
        for (id, _) in &removed {
            index.remove(id);
        }
        assert!(!index.is_trained());
        assert_eq!(index.candidates(&data[0].1).len(), min - removed.len());

        for (id, v) in &removed {
            index.insert(id, v);
        }
        assert!(index.is_trained());
        assert_eq!(index.train_runs, 2);
    }
}
