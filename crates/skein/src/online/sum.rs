//! Moving sum and simple moving average.

use crate::online::OnlineOp;
use num_traits::{Num, ToPrimitive};

/// Running sum of the window values.
#[derive(Debug, Clone, Copy)]
pub struct MovingSum<V> {
    sum: V,
}

impl<V: Num + Copy> MovingSum<V> {
    /// Creates an empty sum.
    pub fn new() -> Self {
        Self { sum: V::zero() }
    }
}

impl<V: Num + Copy> Default for MovingSum<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Num + Copy> OnlineOp<K, V> for MovingSum<V> {
    type Output = V;

    fn result(&self) -> V {
        self.sum
    }

    fn on_next(&mut self, old_previous: Option<(&K, &V)>, new_next: Option<(&K, &V)>) {
        if let Some((_, value)) = old_previous {
            self.sum = self.sum - *value;
        }
        if let Some((_, value)) = new_next {
            self.sum = self.sum + *value;
        }
    }

    fn on_previous(&mut self, new_previous: Option<(&K, &V)>, old_next: Option<(&K, &V)>) {
        if let Some((_, value)) = old_next {
            self.sum = self.sum - *value;
        }
        if let Some((_, value)) = new_previous {
            self.sum = self.sum + *value;
        }
    }

    fn reset(&mut self) {
        self.sum = V::zero();
    }
}

/// Simple moving average as `f64`.
///
/// Values that do not convert to `f64` contribute `NaN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sma {
    sum: f64,
    count: usize,
}

impl Sma {
    /// Creates an empty average.
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn remove(&mut self, value: f64) {
        self.sum -= value;
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.sum = 0.0;
        }
    }
}

fn as_f64<V: ToPrimitive>(value: &V) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl<K, V: ToPrimitive> OnlineOp<K, V> for Sma {
    type Output = f64;

    /// `NaN` over an empty window.
    fn result(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
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
