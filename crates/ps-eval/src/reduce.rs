//! Dimensionality reduction via principal components.

use ps_types::{EvalError, PsResult};

const POWER_ITERATIONS: usize = 60;

/// Principal-component projection computed with power iteration and
/// deflation. Small component counts only; the sweep caps at
/// `min(7, n_samples)` components.
#[derive(Debug, Clone)]
pub struct Pca {
    pub mean: Vec<f32>,
    pub components: Vec<Vec<f32>>,
}

impl Pca {
    /// Fit the projection on `rows`.
    ///
    /// Requesting more components than `min(samples, features)` is a
    /// per-candidate failure, not a crash.
    pub fn fit(rows: &[Vec<f32>], n_components: usize) -> PsResult<Self> {
        let samples = rows.len();
        let dim = rows.first().map_or(0, Vec::len);
        let available = samples.min(dim);
        if n_components == 0 || n_components > available {
            return Err(EvalError::ComponentOverflow {
                components: n_components,
                available,
            }
            .into());
        }

        let mean = column_means(rows, dim);
        let mut centered: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| row.iter().zip(&mean).map(|(v, m)| v - m).collect())
            .collect();

        let mut components = Vec::with_capacity(n_components);
        for _ in 0..n_components {
            let component = dominant_direction(&centered);
            // Deflate: remove this direction before extracting the next.
            for row in centered.iter_mut() {
                let projection = dot(row, &component);
                for (value, basis) in row.iter_mut().zip(&component) {
                    *value -= projection * basis;
                }
            }
            components.push(component);
        }

        Ok(Self { mean, components })
    }

    /// Project rows onto the fitted components.
    pub fn transform(&self, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        rows.iter()
            .map(|row| {
                let centered: Vec<f32> =
                    row.iter().zip(&self.mean).map(|(v, m)| v - m).collect();
                self.components
                    .iter()
                    .map(|component| dot(&centered, component))
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(rows: &[Vec<f32>], n_components: usize) -> PsResult<Vec<Vec<f32>>> {
        let pca = Self::fit(rows, n_components)?;
        Ok(pca.transform(rows))
    }
}

fn column_means(rows: &[Vec<f32>], dim: usize) -> Vec<f32> {
    let mut means = vec![0.0f32; dim];
    for row in rows {
        for (acc, value) in means.iter_mut().zip(row) {
            *acc += value;
        }
    }
    let n = rows.len() as f32;
    for acc in means.iter_mut() {
        *acc /= n;
    }
    means
}

/// Leading eigenvector of `XᵀX` by power iteration. The starting vector is
/// fixed so the projection is deterministic.
fn dominant_direction(rows: &[Vec<f32>]) -> Vec<f32> {
    let dim = rows[0].len();
    let mut v: Vec<f32> = (0..dim)
        .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    normalize(&mut v);

    for _ in 0..POWER_ITERATIONS {
        // w = Xᵀ (X v), one pass over the rows.
        let mut w = vec![0.0f32; dim];
        for row in rows {
            let scale = dot(row, &v);
            for (acc, value) in w.iter_mut().zip(row) {
                *acc += scale * value;
            }
        }
        if norm(&w) <= f32::EPSILON {
            // Remaining variance is zero; keep the current direction.
            break;
        }
        normalize(&mut w);
        v = w;
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

fn normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > f32::EPSILON {
        for value in v.iter_mut() {
            *value /= n;
        }
    }
}
