use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Spatial clustering collaborator: assigns a label in `[0, k)` per point.
#[cfg_attr(test, mockall::automock)]
pub trait SpatialClusterer: Send + Sync {
    fn cluster(&self, points: &[(f64, f64)], k: usize) -> Vec<usize>;
}

/// Seeded Lloyd's k-means over 2-D coordinates.
///
/// The fixed seed keeps partitioning reproducible across runs, which the
/// dispatch transcript depends on.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub seed: u64,
    pub max_iter: usize,
}

impl KMeans {
    pub fn new(seed: u64) -> Self {
        Self { seed, max_iter: 100 }
    }
}

impl SpatialClusterer for KMeans {
    fn cluster(&self, points: &[(f64, f64)], k: usize) -> Vec<usize> {
        if points.is_empty() || k == 0 {
            return Vec::new();
        }
        if points.len() <= k {
            return (0..points.len()).collect();
        }

        // Farthest-point seeding: the first centroid is drawn from the rng,
        // the rest maximise distance to the centroids chosen so far. This
        // keeps well-separated clumps in separate clusters for any seed.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids: Vec<(f64, f64)> = vec![points[rng.gen_range(0..points.len())]];
        while centroids.len() < k {
            let farthest = points
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    let da = min_sq_dist(**a, &centroids);
                    let db = min_sq_dist(**b, &centroids);
                    da.total_cmp(&db)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            centroids.push(points[farthest]);
        }
        let mut labels = vec![0usize; points.len()];

        for _ in 0..self.max_iter {
            let mut changed = false;
            for (i, p) in points.iter().enumerate() {
                let nearest = nearest_centroid(*p, &centroids);
                if labels[i] != nearest {
                    labels[i] = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![(0.0f64, 0.0f64, 0usize); k];
            for (i, p) in points.iter().enumerate() {
                let s = &mut sums[labels[i]];
                s.0 += p.0;
                s.1 += p.1;
                s.2 += 1;
            }
            for (c, (sx, sy, n)) in centroids.iter_mut().zip(sums) {
                // Empty clusters keep their previous centroid.
                if n > 0 {
                    *c = (sx / n as f64, sy / n as f64);
                }
            }

            if !changed {
                break;
            }
        }
        labels
    }
}

fn min_sq_dist(p: (f64, f64), centroids: &[(f64, f64)]) -> f64 {
    centroids
        .iter()
        .map(|c| (p.0 - c.0).powi(2) + (p.1 - c.1).powi(2))
        .fold(f64::INFINITY, f64::min)
}

fn nearest_centroid(p: (f64, f64), centroids: &[(f64, f64)]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = (p.0 - c.0).powi(2) + (p.1 - c.1).powi(2);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}
