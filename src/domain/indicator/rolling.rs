//! Fixed-capacity rolling window with O(1) running aggregates.
//!
//! Values are kept in a ring buffer. The running sum and sum of squares are
//! accumulated relative to a shift value (the newest sample at the last
//! resync), which keeps the variance of near-constant windows exact. Once
//! per full rotation the aggregates are recomputed from the buffer, so drift
//! stays bounded while the amortized cost per push remains O(1).

#[derive(Debug, Clone)]
pub struct RollingWindow {
    data: Vec<f64>,
    head: usize,
    len: usize,
    shift: f64,
    shifted_sum: f64,
    shifted_sum_sq: f64,
    nonzero: usize,
    pushes_since_resync: usize,
}

impl RollingWindow {
    /// Panics if `capacity` is zero; periods are validated before windows are built.
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rolling window capacity must be positive");
        RollingWindow {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
            shift: 0.0,
            shifted_sum: 0.0,
            shifted_sum_sq: 0.0,
            nonzero: 0,
            pushes_since_resync: 0,
        }
    }

    /// Push a value, evicting and returning the oldest one when full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.len == 0 {
            self.shift = value;
        }

        let evicted = if self.is_full() {
            let old = self.data[self.head];
            let d = old - self.shift;
            self.shifted_sum -= d;
            self.shifted_sum_sq -= d * d;
            if old != 0.0 {
                self.nonzero -= 1;
            }
            Some(old)
        } else {
            self.len += 1;
            None
        };

        self.data[self.head] = value;
        let d = value - self.shift;
        self.shifted_sum += d;
        self.shifted_sum_sq += d * d;
        if value != 0.0 {
            self.nonzero += 1;
        }
        self.head = (self.head + 1) % self.capacity();

        if evicted.is_some() {
            self.pushes_since_resync += 1;
            if self.pushes_since_resync >= self.capacity() {
                self.resync(value);
            }
        }

        evicted
    }

    fn resync(&mut self, shift: f64) {
        self.shift = shift;
        self.shifted_sum = 0.0;
        self.shifted_sum_sq = 0.0;
        for &v in &self.data[..self.len] {
            let d = v - shift;
            self.shifted_sum += d;
            self.shifted_sum_sq += d * d;
        }
        self.pushes_since_resync = 0;
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Sum of the held values. Exactly zero when every held value is zero.
    pub fn sum(&self) -> f64 {
        if self.nonzero == 0 {
            return 0.0;
        }
        self.shifted_sum + self.shift * self.len as f64
    }

    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        if self.nonzero == 0 {
            return Some(0.0);
        }
        Some(self.shift + self.shifted_sum / self.len as f64)
    }

    /// Sum of squared deviations from the mean, clamped at zero.
    pub fn sum_sq_dev(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let n = self.len as f64;
        (self.shifted_sum_sq - self.shifted_sum * self.shifted_sum / n).max(0.0)
    }

    /// Oldest-to-newest iteration over the held values.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.capacity();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).map(move |i| self.data[(start + i) % cap])
    }
}
