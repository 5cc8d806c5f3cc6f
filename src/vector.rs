// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Vector math over embedding vectors.
//!
//! Similarity is a best-effort ranking signal, never a fatal condition:
//! malformed or mismatched inputs score 0.0 instead of erroring.

/// Scale a vector to unit L2 norm.
///
/// A zero vector is returned unchanged (the norm is floored at 1.0 to avoid
/// division by zero).
pub fn normalize(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    vec.iter().map(|v| v / norm).collect()
}

/// Cosine similarity in [-1.0, 1.0].
///
/// Returns 0.0 when either input is empty or has zero magnitude. Vectors of
/// different lengths are compared over the shorter length: embeddings from
/// different model versions stay comparable, with reduced fidelity.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..len {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vector_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "Expected 1.0, got {}", sim);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn test_cosine_empty_input_is_zero() {
        let v = vec![1.0, 2.0];
        let empty: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&v, &empty), 0.0);
        assert_eq!(cosine_similarity(&empty, &v), 0.0);
        assert_eq!(cosine_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_is_negative_one() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6, "Expected -1.0, got {}", sim);
    }

    #[test]
    fn test_cosine_truncates_to_shorter_length() {
        // Extra dimensions on the longer vector are ignored entirely.
        let short = vec![1.0, 0.0];
        let long = vec![1.0, 0.0, 99.0, -3.0];
        let sim = cosine_similarity(&short, &long);
        assert!((sim - 1.0).abs() < 1e-6, "Expected 1.0, got {}", sim);
    }

    #[test]
    fn test_normalize_unit_norm() {
        let v = vec![3.0, 4.0];
        let n = normalize(&v);
        let norm: f32 = n.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let v = vec![0.5, -2.0, 7.25];
        let once = normalize(&v);
        let twice = normalize(&once);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(normalize(&zero), zero);
    }
}
