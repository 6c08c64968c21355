//! Greedy farthest-point sampling (greedy k-center).

use std::time::Instant;

use log::debug;

use crate::device::PairwiseDistance;
use crate::distance::min_argmax;

/// Marks a selected row in the min-distance buffer. It is below every real
/// distance, so `min` keeps it and the arg-max never returns the row again.
const SELECTED: f32 = -1.0;
const LOG_INTERVAL: usize = 1000;

/// Stateful farthest-point sampler over a working matrix.
///
/// Row 0 is always the first center. Each following step picks the row with the
/// largest distance to its nearest center so far, lowest index first on ties.
/// Every prefix of the produced sequence is itself a valid coreset, so callers may
/// stop iterating at any point.
pub struct FarthestPointSampler<'a> {
    backend: Box<dyn PairwiseDistance + 'a>,
    min_distances: Vec<f32>,
    distances: Vec<f32>,
    selected: Vec<usize>,
    start: Instant,
}

impl<'a> FarthestPointSampler<'a> {
    /// Create a sampler. Nothing is computed until the first call to `next`.
    pub fn new(backend: Box<dyn PairwiseDistance + 'a>) -> Self {
        let num = backend.num_rows();
        Self {
            backend,
            min_distances: vec![0.0; num],
            distances: vec![0.0; num],
            selected: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Indices selected so far, in selection order.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    /// Distance from every row to its nearest selected row, `0.0` for selected rows.
    ///
    /// The selection loop folds a center into its buffer lazily, on the step after
    /// it was chosen. This folds the latest center in on a copy, so the result
    /// always covers every index in [`selected`](Self::selected). Empty before the
    /// first center is chosen.
    pub fn min_distances(&self) -> Vec<f32> {
        let Some(&last) = self.selected.last() else {
            return Vec::new();
        };
        let mut distances = vec![0.0; self.min_distances.len()];
        self.backend.distances_to(last, &mut distances);
        self.min_distances
            .iter()
            .zip(distances)
            .map(|(&m, d)| if m == SELECTED { 0.0 } else { m.min(d) })
            .collect()
    }

    fn select(&mut self, index: usize) -> usize {
        self.min_distances[index] = SELECTED;
        self.selected.push(index);

        let iter = self.selected.len();
        if iter % LOG_INTERVAL == 0 {
            let elapsed = self.start.elapsed().as_secs_f32();
            debug!(
                "selected {} points, {:.1} it/s",
                iter,
                iter as f32 / elapsed.max(f32::EPSILON)
            );
        }
        index
    }
}

impl Iterator for FarthestPointSampler<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let num = self.min_distances.len();
        let Some(&last) = self.selected.last() else {
            if num == 0 {
                return None;
            }
            self.start = Instant::now();
            self.backend.distances_to(0, &mut self.min_distances);
            return Some(self.select(0));
        };
        if self.selected.len() == num {
            return None;
        }

        self.backend.distances_to(last, &mut self.distances);
        let farthest = min_argmax(&mut self.min_distances, &self.distances);
        Some(self.select(farthest))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.min_distances.len() - self.selected.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FarthestPointSampler<'_> {}
