/// Cosine similarity, i.e. `1 - cosine_distance(a, b)`.
///
/// Returns `None` when the score is undefined: mismatched lengths, empty
/// input, or a zero-norm side. Accumulates in f64 to keep 1536-dim sums stable.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    // Rounding can push identical vectors a hair past 1.0.
    Some((dot / denom).clamp(-1.0, 1.0))
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    cosine_similarity(a, b).map(|s| 1.0 - s)
}

/// Validate that `vector` can take part in a similarity comparison against a
/// corpus of the given dimensionality.
pub fn validate_vector(vector: &[f32], dimension: usize) -> Result<(), String> {
    if vector.len() != dimension {
        return Err(format!(
            "Vector has dimension {} but corpus dimension is {dimension}",
            vector.len()
        ));
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(format!("Vector component {pos} is not finite"));
    }
    Ok(())
}

/// Like [`validate_vector`], but also rejects zero-norm vectors, which have no
/// direction to compare against.
pub fn validate_query_vector(vector: &[f32], dimension: usize) -> Result<(), String> {
    validate_vector(vector, dimension)?;
    if vector.iter().all(|x| *x == 0.0) {
        return Err("Query vector has zero norm".to_string());
    }
    Ok(())
}
