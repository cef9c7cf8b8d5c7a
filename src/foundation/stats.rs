/// Mean and population standard deviation of one metric over a directory comparison.
///
/// With zero samples both values are NaN; callers report that case instead of writing zeros.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Summary {
    pub fn empty() -> Self {
        Self {
            mean: f64::NAN,
            std: f64::NAN,
            count: 0,
        }
    }

    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::empty();
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;

        Self {
            mean,
            std: var.sqrt(),
            count: samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/stats.rs"]
mod tests;
