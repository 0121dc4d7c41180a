use plotters::style::RGBColor;

/// Fill for countries without data.
pub const NO_DATA: RGBColor = RGBColor(0xd0, 0xd0, 0xd0);

// ColorBrewer "Reds", light to dark.
const REDS: [RGBColor; 9] = [
    RGBColor(0xff, 0xf5, 0xf0),
    RGBColor(0xfe, 0xe0, 0xd2),
    RGBColor(0xfc, 0xbb, 0xa1),
    RGBColor(0xfc, 0x92, 0x72),
    RGBColor(0xfb, 0x6a, 0x4a),
    RGBColor(0xef, 0x3b, 0x2c),
    RGBColor(0xcb, 0x18, 0x1d),
    RGBColor(0xa5, 0x0f, 0x15),
    RGBColor(0x67, 0x00, 0x0d),
];

/// Linear map from `[min, max]` onto the Reds ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousScale {
    pub min: f64,
    pub max: f64,
}

impl ContinuousScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` in the domain, clamped to `[0, 1]`. A degenerate
    /// domain puts everything mid-ramp.
    pub fn position(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if !span.is_finite() || span <= 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> RGBColor {
        ramp(self.position(value))
    }
}

/// Colour at `t` in `[0, 1]` along the ramp.
pub fn ramp(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (REDS.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(REDS.len() - 1);
    let frac = scaled - lower as f64;

    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (REDS[lower], REDS[upper]);
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
