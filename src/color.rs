//! 8-bit color space conversions used by analysis and correction.
//!
//! Conversions match the OpenCV 8-bit conventions the rest of the pipeline
//! assumes: Lab lightness is scaled to 0..255 (L * 255 / 100) with a/b offset
//! by 128, and HSV stores hue as 0..180 with saturation/value in 0..255.

const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let c = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > 0.008856 {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// Convert an RGB pixel to 8-bit Lab (L scaled to 0..255, a/b offset by 128)
pub fn rgb_to_lab(p: [u8; 3]) -> [u8; 3] {
    let r = srgb_to_linear(p[0]);
    let g = srgb_to_linear(p[1]);
    let b = srgb_to_linear(p[2]);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / XN;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / ZN;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (bb + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Convert an 8-bit Lab pixel back to RGB
pub fn lab_to_rgb(p: [u8; 3]) -> [u8; 3] {
    let l = p[0] as f32 * 100.0 / 255.0;
    let a = p[1] as f32 - 128.0;
    let bb = p[2] as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - bb / 200.0;

    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * ZN;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875992 * y + 0.041556 * z;
    let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}

/// Convert an RGB pixel to 8-bit HSV (H in 0..180, S/V in 0..255)
pub fn rgb_to_hsv(p: [u8; 3]) -> [u8; 3] {
    let r = p[0] as f32;
    let g = p[1] as f32;
    let b = p[2] as f32;

    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { delta / v * 255.0 } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    ]
}

/// Convert an 8-bit HSV pixel back to RGB
pub fn hsv_to_rgb(p: [u8; 3]) -> [u8; 3] {
    let h = p[0] as f32 * 2.0;
    let s = p[1] as f32 / 255.0;
    let v = p[2] as f32;

    if s == 0.0 {
        let v = v.round().clamp(0.0, 255.0) as u8;
        return [v, v, v];
    }

    let sector = (h / 60.0).floor();
    let f = h / 60.0 - sector;
    let p0 = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as i32 % 6 {
        0 => (v, t, p0),
        1 => (q, v, p0),
        2 => (p0, v, t),
        3 => (p0, q, v),
        4 => (t, p0, v),
        _ => (v, p0, q),
    };

    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_extremes() {
        assert_eq!(rgb_to_lab([0, 0, 0])[0], 0);
        assert_eq!(rgb_to_lab([255, 255, 255])[0], 255);
    }

    #[test]
    fn test_lab_gray_is_neutral() {
        let lab = rgb_to_lab([128, 128, 128]);
        // Neutral gray carries no chroma
        assert!((lab[1] as i32 - 128).abs() <= 1);
        assert!((lab[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_lab_roundtrip_close() {
        for &p in &[[12u8, 200, 64], [250, 10, 130], [90, 90, 90]] {
            let back = lab_to_rgb(rgb_to_lab(p));
            for c in 0..3 {
                assert!(
                    (back[c] as i32 - p[c] as i32).abs() <= 3,
                    "channel {} drifted: {:?} -> {:?}",
                    c,
                    p,
                    back
                );
            }
        }
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn test_hsv_roundtrip_exact_on_gray() {
        for v in [0u8, 31, 127, 255] {
            assert_eq!(hsv_to_rgb(rgb_to_hsv([v, v, v])), [v, v, v]);
        }
    }
}
