//! Two-moment statistics.
//!
//! Mean and variance are kept with Welford's update, which also runs in
//! reverse to remove an element, so the window slides without re-summing.

use crate::online::OnlineOp;
use num_traits::ToPrimitive;

/// Snapshot of the window statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stat2 {
    /// Number of elements.
    pub count: usize,
    /// Sum of the values.
    pub sum: f64,
    /// Arithmetic mean; `NaN` when empty.
    pub mean: f64,
    /// Sample variance; `NaN` with fewer than two elements.
    pub variance: f64,
}

impl Stat2 {
    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Online count, sum, mean and variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat2Op {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl Stat2Op {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if self.count <= 1 {
            *self = Self::default();
            return;
        }
        let remaining = (self.count - 1) as f64;
        let mean = (self.mean * self.count as f64 - x) / remaining;
        self.m2 -= (x - mean) * (x - self.mean);
        self.m2 = self.m2.max(0.0);
        self.mean = mean;
        self.sum -= x;
        self.count -= 1;
    }
}

fn as_f64<V: ToPrimitive>(value: &V) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl<K, V: ToPrimitive> OnlineOp<K, V> for Stat2Op {
    type Output = Stat2;

    fn result(&self) -> Stat2 {
        Stat2 {
            count: self.count,
            sum: self.sum,
            mean: if self.count == 0 { f64::NAN } else { self.mean },
            variance: if self.count < 2 {
                f64::NAN
            } else {
                self.m2 / (self.count - 1) as f64
            },
        }
    }

    fn on_next(&mut self, old_previous: Option<(&K, &V)>, new_next: Option<(&K, &V)>) {
        if let Some((_, value)) = old_previous {
            self.remove(as_f64(value));
        }
        if let Some((_, value)) = new_next {
            self.add(as_f64(value));
        }
    }

    fn on_previous(&mut self, new_previous: Option<(&K, &V)>, old_next: Option<(&K, &V)>) {
        if let Some((_, value)) = old_next {
            self.remove(as_f64(value));
        }
        if let Some((_, value)) = new_previous {
            self.add(as_f64(value));
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(op: &mut Stat2Op, values: &[f64]) {
        for v in values {
            OnlineOp::<i32, f64>::on_next(op, None, Some((&0, v)));
        }
    }

    fn result(op: &Stat2Op) -> Stat2 {
        OnlineOp::<i32, f64>::result(op)
    }

    #[test]
    fn test_mean_and_variance() {
        let mut op = Stat2Op::new();
        feed(&mut op, &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = result(&op);
        assert_eq!(stats.count, 8);
        assert_eq!(stats.sum, 40.0);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
        assert!((stats.std_dev() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_removal_matches_fresh_window() {
        let mut sliding = Stat2Op::new();
        feed(&mut sliding, &[1.0, 2.0, 3.0]);
        OnlineOp::<i32, f64>::on_next(&mut sliding, Some((&0, &1.0)), Some((&0, &10.0)));

        let mut fresh = Stat2Op::new();
        feed(&mut fresh, &[2.0, 3.0, 10.0]);

        let (a, b) = (result(&sliding), result(&fresh));
        assert_eq!(a.count, b.count);
        assert!((a.mean - b.mean).abs() < 1e-12);
        assert!((a.variance - b.variance).abs() < 1e-9);
    }

    #[test]
    fn test_small_windows() {
        let mut op = Stat2Op::new();
        assert!(result(&op).mean.is_nan());
        feed(&mut op, &[3.0]);
        assert_eq!(result(&op).mean, 3.0);
        assert!(result(&op).variance.is_nan());
        OnlineOp::<i32, f64>::on_previous(&mut op, None, Some((&0, &3.0)));
        assert_eq!(result(&op).count, 0);
    }
}
