use std::collections::HashSet;
use std::hash::Hash;

/// Returns the indices that would sort `values` in ascending order
///
/// The sort is stable, so tied values keep their input order.
pub fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

pub fn select_indices<T: Copy>(indices: &[usize], data: &[T]) -> Vec<T> {
    indices.iter().map(|i| data[*i]).collect()
}

/// Inverse of `select_indices`: writes `sorted[k]` back to position `indices[k]`
pub fn scatter_indices<T: Copy + Default>(indices: &[usize], sorted: &[T]) -> Vec<T> {
    let mut data = vec![T::default(); sorted.len()];
    for (value, &i) in sorted.iter().zip(indices) {
        data[i] = *value;
    }
    data
}

/// Running maximum from the first element onward
pub fn cumulative_max(values: &mut [f64]) {
    let mut current = f64::NEG_INFINITY;
    for value in values.iter_mut() {
        current = current.max(*value);
        *value = current;
    }
}

/// Running minimum from the last element backward
pub fn reverse_cumulative_min(values: &mut [f64]) {
    let mut current = f64::INFINITY;
    for value in values.iter_mut().rev() {
        current = current.min(*value);
        *value = current;
    }
}

/// Clips every value into [0, 1]
pub fn clip_unit(values: &mut [f64]) {
    for value in values.iter_mut() {
        *value = value.clamp(0.0, 1.0);
    }
}

/// Percentage of `found` within `total`, zero when `total` is empty
pub fn percent(found: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * found as f64 / total as f64
    }
}

/// Intersection of two sets, cloned into a new set
pub fn intersect<I: Eq + Hash + Clone>(left: &HashSet<I>, right: &HashSet<I>) -> HashSet<I> {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    small
        .iter()
        .filter(|id| large.contains(*id))
        .cloned()
        .collect()
}
