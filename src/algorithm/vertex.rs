//! # Vertex enumeration
//!
//! The double description method of Motzkin et al. converts the inequality description of a
//! polyhedral cone `{z >= 0 : H z >= 0}` into its extreme rays. Halfspaces are added one at a
//! time; rays on the wrong side are dropped and every adjacent pair of rays on opposite sides is
//! combined into a new ray on the hyperplane.
//!
//! Polyhedra `{y >= 0 : A y >= b}` are handled by homogenization: the vertices are the extreme
//! rays of `{(y, t) >= 0 : A y - b t >= 0}` with `t > 0`, scaled to `t = 1`.
use index_utils::remove_indices;
use tracing::debug;

/// Values with an absolute value below this are treated as zero.
const TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug)]
struct Ray {
    values: Vec<f64>,
    /// For each constraint processed so far, whether the ray lies on its hyperplane.
    tight: Vec<bool>,
}

impl Ray {
    fn unit(dimension: usize, index: usize) -> Self {
        let mut values = vec![0_f64; dimension];
        values[index] = 1_f64;
        let tight = (0..dimension).map(|i| i != index).collect();

        Self { values, tight }
    }

    fn dot(&self, halfspace: &[f64]) -> f64 {
        self.values.iter().zip(halfspace).map(|(x, h)| x * h).sum()
    }

    /// Scale such that the largest absolute value is one, zeroing tiny values.
    fn normalize(&mut self) {
        let largest = self.values.iter().fold(0_f64, |largest, value| largest.max(value.abs()));
        if largest > 0_f64 {
            for value in &mut self.values {
                *value /= largest;
                if value.abs() < TOLERANCE {
                    *value = 0_f64;
                }
            }
        }
    }
}

/// Whether two rays are adjacent in the current cone.
///
/// Combinatorial test: no third ray lies on all hyperplanes that both lie on, and they share
/// enough hyperplanes to span a two dimensional face.
fn adjacent(rays: &[Ray], first: usize, second: usize, dimension: usize) -> bool {
    let common = rays[first].tight.iter()
        .zip(&rays[second].tight)
        .map(|(&a, &b)| a && b)
        .collect::<Vec<_>>();
    if common.iter().filter(|&&c| c).count() + 2 < dimension {
        return false;
    }

    !rays.iter().enumerate().any(|(index, ray)| {
        index != first && index != second
            && common.iter().zip(&ray.tight).all(|(&c, &t)| !c || t)
    })
}

/// Extreme rays of the cone `{z >= 0 : h z >= 0 for all h in halfspaces}`.
///
/// # Arguments
///
/// * `dimension`: Length of `z`.
/// * `halfspaces`: Rows `h`, each of length `dimension`.
///
/// # Return value
///
/// One representative of each extreme ray, scaled to a largest absolute value of one.
#[must_use]
pub fn extreme_rays(dimension: usize, halfspaces: &[Vec<f64>]) -> Vec<Vec<f64>> {
    debug_assert!(halfspaces.iter().all(|h| h.len() == dimension));

    let mut rays = (0..dimension).map(|index| Ray::unit(dimension, index)).collect::<Vec<_>>();
    for halfspace in halfspaces {
        let products = rays.iter()
            .map(|ray| {
                let product = ray.dot(halfspace);
                if product.abs() < TOLERANCE { 0_f64 } else { product }
            })
            .collect::<Vec<_>>();

        let positive = (0..rays.len()).filter(|&i| products[i] > 0_f64).collect::<Vec<_>>();
        let negative = (0..rays.len()).filter(|&i| products[i] < 0_f64).collect::<Vec<_>>();

        let mut created = Vec::new();
        for &p in &positive {
            for &n in &negative {
                if !adjacent(&rays, p, n, dimension) {
                    continue;
                }

                let values = rays[n].values.iter()
                    .zip(&rays[p].values)
                    .map(|(&vn, &vp)| products[p] * vn - products[n] * vp)
                    .collect();
                let mut tight = rays[p].tight.iter()
                    .zip(&rays[n].tight)
                    .map(|(&a, &b)| a && b)
                    .collect::<Vec<_>>();
                tight.push(true);
                let mut ray = Ray { values, tight };
                ray.normalize();
                created.push(ray);
            }
        }

        for (ray, &product) in rays.iter_mut().zip(&products) {
            ray.tight.push(product == 0_f64);
        }
        remove_indices(&mut rays, &negative);
        rays.extend(created);
    }

    debug!(dimension, halfspaces = halfspaces.len(), rays = rays.len(), "enumerated extreme rays");
    rays.into_iter()
        .map(|mut ray| {
            ray.normalize();
            ray.values
        })
        .collect()
}

/// Vertices of the polyhedron `{y >= 0 : A y >= b}`.
///
/// # Arguments
///
/// * `rows`: The rows of `A`, each of length `dimension`.
/// * `rhs`: The vector `b`.
///
/// # Return value
///
/// The vertices, the directions of unboundedness are not reported.
#[must_use]
pub fn vertices(dimension: usize, rows: &[Vec<f64>], rhs: &[f64]) -> Vec<Vec<f64>> {
    debug_assert_eq!(rows.len(), rhs.len());

    let halfspaces = rows.iter().zip(rhs)
        .map(|(row, &b)| {
            let mut halfspace = row.clone();
            halfspace.push(-b);
            halfspace
        })
        .collect::<Vec<_>>();

    extreme_rays(dimension + 1, &halfspaces).into_iter()
        .filter(|ray| ray[dimension] > TOLERANCE)
        .map(|ray| {
            let t = ray[dimension];
            ray[..dimension].iter().map(|value| value / t).collect()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn sorted(mut points: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        points.sort_by(|a, b| a.partial_cmp(b).unwrap());
        points
    }

    #[test]
    fn orthant() {
        let rays = sorted(extreme_rays(3, &[]));
        assert_eq!(rays, vec![vec![0_f64, 0_f64, 1_f64], vec![0_f64, 1_f64, 0_f64], vec![1_f64, 0_f64, 0_f64]]);
    }

    #[test]
    fn cut_orthant() {
        // x - y >= 0 within the nonnegative quadrant
        let rays = sorted(extreme_rays(2, &[vec![1_f64, -1_f64]]));
        assert_eq!(rays, vec![vec![1_f64, 0_f64], vec![1_f64, 1_f64]]);
    }

    #[test]
    fn square_corner() {
        // x + y >= 1, x <= 2, y <= 2
        let rows = vec![vec![1_f64, 1_f64], vec![-1_f64, 0_f64], vec![0_f64, -1_f64]];
        let points = sorted(vertices(2, &rows, &[1_f64, -2_f64, -2_f64]));

        let expected = [[0_f64, 1_f64], [0_f64, 2_f64], [1_f64, 0_f64], [2_f64, 0_f64], [2_f64, 2_f64]];
        assert_eq!(points.len(), expected.len());
        for (point, expected) in points.iter().zip(expected) {
            assert_abs_diff_eq!(point[0], expected[0], epsilon = 1e-9);
            assert_abs_diff_eq!(point[1], expected[1], epsilon = 1e-9);
        }
    }

    #[test]
    fn unbounded() {
        // x + 2y >= 2 has vertices (0, 1) and (2, 0) and two directions
        let points = sorted(vertices(2, &[vec![1_f64, 2_f64]], &[2_f64]));
        assert_eq!(points.len(), 2);
        assert_abs_diff_eq!(points[0][1], 1_f64, epsilon = 1e-9);
        assert_abs_diff_eq!(points[1][0], 2_f64, epsilon = 1e-9);
    }

    #[test]
    fn empty() {
        // x <= -1
        assert!(vertices(1, &[vec![-1_f64]], &[1_f64]).is_empty());
    }
}
