/// Guard against dividing by zero when every token is masked out.
const MASK_EPSILON: f32 = 1e-9;

/// Collapse per-token vectors into one fixed-length vector by
/// averaging the positions whose attention-mask flag is set:
/// `sum(token * mask) / max(sum(mask), epsilon)`.
///
/// Purely numeric; no model binding, so it can be exercised without
/// loading weights.
pub fn mean_pool(token_vectors: &[Vec<f32>], mask: &[u32]) -> Vec<f32> {
    let dimensions = token_vectors.first().map(Vec::len).unwrap_or(0);
    let mut pooled = vec![0f32; dimensions];
    let mut mask_sum = 0f32;

    for (vector, &flag) in token_vectors.iter().zip(mask) {
        if flag == 0 {
            continue;
        }
        mask_sum += 1.0;
        for (total, value) in pooled.iter_mut().zip(vector) {
            *total += value;
        }
    }

    let denominator = mask_sum.max(MASK_EPSILON);
    for value in &mut pooled {
        *value /= denominator;
    }

    pooled
}
