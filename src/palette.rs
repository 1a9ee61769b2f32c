/// Ordered list of RGB colour stops spread evenly over `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    stops: Vec<[u8; 3]>,
}

/// Deep water blue -> foam grey -> sea green -> sand -> sunset red.
const BEACH_STOPS: [[u8; 3]; 9] = [
    [0x00, 0x42, 0x9d],
    [0x5d, 0x6a, 0xb3],
    [0x96, 0x96, 0xbf],
    [0xcb, 0xc6, 0xb5],
    [0x3f, 0xff, 0x2c],
    [0xfd, 0xcd, 0x44],
    [0xff, 0x99, 0x4d],
    [0xfb, 0x5d, 0x4a],
    [0xe9, 0x00, 0x2c],
];

impl Palette {
    /// Returns `None` for an empty stop list.
    pub fn new(stops: Vec<[u8; 3]>) -> Option<Self> {
        if stops.is_empty() {
            None
        } else {
            Some(Self { stops })
        }
    }

    /// Default palette for the density field.
    pub fn beach() -> Self {
        Self { stops: BEACH_STOPS.to_vec() }
    }

    /// Colour for `t`, clamped to `[0, 1]`, interpolated linearly between the
    /// two nearest stops. NaN maps to the first stop.
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let last = self.stops.len() - 1;
        if last == 0 {
            return self.stops[0];
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * last as f64;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = pos - lo as f64;
        let (a, b) = (self.stops[lo], self.stops[hi]);
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
    }

    pub fn sample_rgba(&self, t: f64) -> [u8; 4] {
        let [r, g, b] = self.sample(t);
        [r, g, b, 255]
    }
}
