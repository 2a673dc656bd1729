//! Scales
//!
//! - `BandScale`: discrete keys → evenly spaced bands (x axis)
//! - `LinearScale`: continuous domain → pixel range (y axis)
//! - `ticks`: "nice" tick values for a linear domain

/// Categorical scale mapping keys to bands of equal width
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale<K> {
    domain: Vec<K>,
    range: (f64, f64),
    padding_inner: f64,
    padding_outer: f64,
    align: f64,
    step: f64,
    bandwidth: f64,
    /// Start of each band, parallel to `domain`
    positions: Vec<f64>,
}

impl<K: PartialEq + Clone> BandScale<K> {
    /// Empty scale over `range` with no padding and centred alignment
    pub fn new(range: (f64, f64)) -> Self {
        let mut scale = Self {
            domain: Vec::new(),
            range,
            padding_inner: 0.0,
            padding_outer: 0.0,
            align: 0.5,
            step: 0.0,
            bandwidth: 0.0,
            positions: Vec::new(),
        };
        scale.rescale();
        scale
    }

    /// Builder method: same inner and outer padding, as a fraction of step
    pub fn padding(mut self, padding: f64) -> Self {
        self.padding_inner = padding.clamp(0.0, 1.0);
        self.padding_outer = padding.max(0.0);
        self.rescale();
        self
    }

    /// Replace the domain; repeated keys keep their first position
    pub fn set_domain<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        self.domain.clear();
        for key in keys {
            if !self.domain.contains(&key) {
                self.domain.push(key);
            }
        }
        self.rescale();
    }

    pub fn domain(&self) -> &[K] {
        &self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Start of the band for `key`, or `None` outside the domain
    pub fn position(&self, key: &K) -> Option<f64> {
        self.domain
            .iter()
            .position(|k| k == key)
            .map(|i| self.positions[i])
    }

    fn rescale(&mut self) {
        let n = self.domain.len() as f64;
        let (r0, r1) = self.range;
        let reverse = r1 < r0;
        let (mut start, stop) = if reverse { (r1, r0) } else { (r0, r1) };

        self.step =
            (stop - start) / (n - self.padding_inner + self.padding_outer * 2.0).max(1.0);
        start += (stop - start - self.step * (n - self.padding_inner)) * self.align;
        self.bandwidth = self.step * (1.0 - self.padding_inner);

        self.positions = (0..self.domain.len())
            .map(|i| start + self.step * i as f64)
            .collect();
        if reverse {
            self.positions.reverse();
        }
    }
}

/// Linear scale from a two-value domain to a two-value range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// Scale over `range` with the unit domain
    pub fn new(range: (f64, f64)) -> Self {
        Self {
            domain: (0.0, 1.0),
            range,
        }
    }

    pub fn set_domain(&mut self, d0: f64, d1: f64) {
        self.domain = (d0, d1);
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map a domain value into the range
    ///
    /// A collapsed domain (`d0 == d1`) maps everything to the middle of the
    /// range; a NaN domain maps everything to NaN.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;

        let t = if span.is_nan() {
            f64::NAN
        } else if span == 0.0 {
            0.5
        } else {
            (value - d0) / span
        };

        r0 + t * (r1 - r0)
    }

    /// Roughly `count` human-friendly values spanning the domain
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count)
    }
}

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = 1.4142135623730951; // sqrt(2)

/// Round half up, matching the tick rounding of common chart libraries
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Integer tick bounds and increment; a negative increment means
/// "divide by |inc|" to keep fractional ticks exact
fn tick_params(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let scale = 10f64.powf(-power) / factor;
        i1 = round_half_up(start * scale);
        i2 = round_half_up(stop * scale);
        if i1 / scale < start {
            i1 += 1.0;
        }
        if i2 / scale > stop {
            i2 -= 1.0;
        }
        inc = -scale;
    } else {
        let scale = 10f64.powf(power) * factor;
        i1 = round_half_up(start / scale);
        i2 = round_half_up(stop / scale);
        if i1 * scale < start {
            i1 += 1.0;
        }
        if i2 * scale > stop {
            i2 -= 1.0;
        }
        inc = scale;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_params(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Nice tick values between `start` and `stop` (either order)
///
/// Returns nothing for a non-finite domain and a single tick for a
/// collapsed one.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 0 || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }

    let reverse = stop < start;
    let (i1, i2, inc) = if reverse {
        tick_params(stop, start, count as f64)
    } else {
        tick_params(start, stop, count as f64)
    };
    if !(i2 >= i1) {
        return Vec::new();
    }

    let n = (i2 - i1 + 1.0) as usize;
    let value = |i: f64| if inc < 0.0 { i / -inc } else { i * inc };

    if reverse {
        (0..n).map(|i| value(i2 - i as f64)).collect()
    } else {
        (0..n).map(|i| value(i1 + i as f64)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_band_two_keys_padded() {
        let mut x = BandScale::new((0.0, 680.0)).padding(0.2);
        x.set_domain([100_i64, 200]);

        // step = 680 / 2.2, outer padding split evenly on both sides
        let step = 680.0 / 2.2;
        assert!(approx(x.step(), step));
        assert!(approx(x.bandwidth(), step * 0.8));
        assert!(approx(x.position(&100).unwrap(), step * 0.2));
        assert!(approx(x.position(&200).unwrap(), step * 1.2));

        let right_gap = 680.0 - (x.position(&200).unwrap() + x.bandwidth());
        assert!(approx(right_gap, x.position(&100).unwrap()));
    }

    #[test]
    fn test_band_preserves_order_and_dedupes() {
        let mut x = BandScale::new((0.0, 100.0));
        x.set_domain([3_i64, 1, 3, 2]);
        assert_eq!(x.domain(), &[3, 1, 2]);
        assert!(x.position(&3).unwrap() < x.position(&1).unwrap());
        assert!(x.position(&1).unwrap() < x.position(&2).unwrap());
        assert!(x.position(&9).is_none());
    }

    #[test]
    fn test_band_reversed_range() {
        let mut x = BandScale::new((100.0, 0.0));
        x.set_domain(["a", "b"]);
        assert!(x.position(&"a").unwrap() > x.position(&"b").unwrap());
    }

    #[test]
    fn test_linear_maps_inverted_range() {
        let mut y = LinearScale::new((480.0, 0.0));
        y.set_domain(0.0, 50.0);
        assert!(approx(y.apply(0.0), 480.0));
        assert!(approx(y.apply(50.0), 0.0));
        assert!(approx(y.apply(10.0), 384.0));
    }

    #[test]
    fn test_linear_collapsed_domain_maps_to_middle() {
        let mut y = LinearScale::new((480.0, 0.0));
        y.set_domain(0.0, 0.0);
        assert!(approx(y.apply(0.0), 240.0));
    }

    #[test]
    fn test_linear_nan_domain() {
        let mut y = LinearScale::new((480.0, 0.0));
        y.set_domain(0.0, f64::NAN);
        assert!(y.apply(10.0).is_nan());
        assert!(y.ticks(10).is_empty());
    }

    #[test]
    fn test_ticks_by_fives() {
        let values = ticks(0.0, 50.0, 10);
        let expected: Vec<f64> = (0..=10).map(|i| i as f64 * 5.0).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_ticks_stop_inside_domain() {
        let values = ticks(0.0, 99.0, 10);
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&90.0));
        assert_eq!(values.len(), 10);
    }

    #[test]
    fn test_ticks_fractional() {
        let values = ticks(0.0, 1.0, 10);
        assert_eq!(values.len(), 11);
        assert_eq!(values[3], 0.3);
    }

    #[test]
    fn test_ticks_degenerate() {
        assert_eq!(ticks(0.0, 0.0, 10), vec![0.0]);
        assert!(ticks(0.0, 10.0, 0).is_empty());
        assert!(ticks(0.0, f64::INFINITY, 10).is_empty());
    }

    #[test]
    fn test_ticks_reversed() {
        assert_eq!(ticks(10.0, 0.0, 2), vec![10.0, 5.0, 0.0]);
    }
}
