//! Log-density oracles for gradient free and gradient based step methods

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::DVector;

use crate::point::{Point, VarId};

/// Gradient of the log density, per variable
pub type Gradient = BTreeMap<VarId, DVector<f64>>;

/// Joint log density of the model, up to an additive constant.
///
/// Implementations must be deterministic. Any non-finite value is a valid
/// answer (e.g. `-inf` outside the support); step methods treat it as a
/// rejection rather than an error.
pub trait LogDensity: Send + Sync {
    /// Log density at `point`
    fn ln_f(&self, point: &Point) -> f64;
}

impl<F> LogDensity for F
where
    F: Fn(&Point) -> f64 + Send + Sync,
{
    fn ln_f(&self, point: &Point) -> f64 {
        self(point)
    }
}

/// Joint log density together with its gradient.
///
/// The gradient only needs entries for the variables the calling step method
/// updates; missing entries are read as a zero gradient.
pub trait GradientLogDensity: Send + Sync {
    /// Log density and gradient at `point`
    fn ln_f_with_gradient(&self, point: &Point) -> (f64, Gradient);
}

impl<F> GradientLogDensity for F
where
    F: Fn(&Point) -> (f64, Gradient) + Send + Sync,
{
    fn ln_f_with_gradient(&self, point: &Point) -> (f64, Gradient) {
        self(point)
    }
}

/// Use a gradient oracle where only the density is needed.
#[derive(Debug)]
pub struct DensityOnly<G>(pub Arc<G>);

impl<G> Clone for DensityOnly<G> {
    fn clone(&self) -> Self {
        DensityOnly(Arc::clone(&self.0))
    }
}

impl<G: GradientLogDensity> LogDensity for DensityOnly<G> {
    fn ln_f(&self, point: &Point) -> f64 {
        self.0.ln_f_with_gradient(point).0
    }
}

/// Flatten the entries of `gradient` for `ids`, zero filling missing variables.
pub(crate) fn flatten_gradient(gradient: &Gradient, point: &Point, ids: &[VarId]) -> DVector<f64> {
    let data: Vec<f64> = ids
        .iter()
        .flat_map(|id| {
            let len = point.get(id).map_or(0, |v| v.len());
            match gradient.get(id) {
                Some(g) if g.len() == len => g.iter().copied().collect::<Vec<f64>>(),
                _ => vec![0.0; len],
            }
        })
        .collect();
    DVector::from_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_oracles() {
        let ln_f = |p: &Point| -0.5 * p.scalar("x").unwrap().powi(2);
        let p = Point::new().with_scalar("x", 2.0);
        assert::close(ln_f.ln_f(&p), -2.0, 1E-12);
    }

    #[test]
    fn density_only_drops_the_gradient() {
        let grad = |p: &Point| {
            let x = p.scalar("x").unwrap();
            let mut g = Gradient::new();
            g.insert("x".to_owned(), DVector::from_element(1, -x));
            (-0.5 * x * x, g)
        };
        let p = Point::new().with_scalar("x", 1.0);
        assert::close(DensityOnly(Arc::new(grad)).ln_f(&p), -0.5, 1E-12);
    }

    #[test]
    fn missing_gradient_entries_are_zero() {
        let p = Point::new()
            .with_scalar("x", 1.0)
            .with("y", DVector::from_element(2, 0.0));
        let mut g = Gradient::new();
        g.insert("x".to_owned(), DVector::from_element(1, 3.0));
        let flat = flatten_gradient(&g, &p, &["x".to_owned(), "y".to_owned()]);
        assert_eq!(flat.as_slice(), &[3.0, 0.0, 0.0]);
    }
}
