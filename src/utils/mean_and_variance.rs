use num_traits::Float;

/// Running mean and variance (Welford's algorithm)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanAndVariance<T: Float> {
    /// Mean of given data
    pub mean: T,
    /// Sum of squared deviations from the mean
    m2: T,
    /// Number of data encountered
    pub count: usize,
}

impl<T: Float> Default for MeanAndVariance<T> {
    fn default() -> Self {
        Self {
            mean: T::zero(),
            m2: T::zero(),
            count: 0,
        }
    }
}

impl<T: Float> MeanAndVariance<T> {
    /// Add a single value
    pub fn push(&mut self, x: T) {
        self.count += 1;
        let n = T::from(self.count).unwrap_or_else(T::infinity);
        let delta = x - self.mean;
        self.mean = self.mean + delta / n;
        self.m2 = self.m2 + delta * (x - self.mean);
    }

    /// Create a new MeanAndVariance with `values` added
    pub fn update(&self, values: &[T]) -> Self {
        values.iter().fold(*self, |mut acc, &x| {
            acc.push(x);
            acc
        })
    }

    /// Calculate mean and variance for given slice `values`
    pub fn from_values(values: &[T]) -> Self {
        MeanAndVariance::default().update(values)
    }

    /// Population variance, zero for fewer than two values
    pub fn variance(&self) -> T {
        if self.count < 2 {
            T::zero()
        } else {
            self.m2 / T::from(self.count).unwrap_or_else(T::infinity)
        }
    }

    /// Determine the standard deviation
    pub fn std(&self) -> T {
        self.variance().sqrt()
    }
}

impl<T: Float> std::iter::FromIterator<T> for MeanAndVariance<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut acc, x| {
            acc.push(x);
            acc
        })
    }
}
