//! Contrast-limited adaptive histogram equalization over a single 8-bit
//! plane. Tile-local mappings with clipped histograms keep noise from being
//! amplified uniformly; bilinear interpolation between neighboring tile
//! mappings removes visible tile seams.

use crate::error::{FrameError, Result};

/// CLAHE filter with a fixed tile grid and clip limit
#[derive(Debug, Clone)]
pub struct Clahe {
    clip_limit: f64,
    grid_cols: u32,
    grid_rows: u32,
}

impl Clahe {
    /// Create a filter with the given clip limit and an 8x8 tile grid
    pub fn new(clip_limit: f64) -> Self {
        Self::with_grid(clip_limit, 8, 8)
    }

    pub fn with_grid(clip_limit: f64, grid_cols: u32, grid_rows: u32) -> Self {
        Self {
            clip_limit,
            grid_cols: grid_cols.max(1),
            grid_rows: grid_rows.max(1),
        }
    }

    /// Equalize `plane` (row-major, `width` x `height`) in place
    pub fn apply(&self, plane: &mut [u8], width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || plane.len() != (width * height) as usize {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "plane size {} does not match {}x{}",
                    plane.len(),
                    width,
                    height
                ),
            }
            .into());
        }

        let cols = self.grid_cols.min(width);
        let rows = self.grid_rows.min(height);
        let tile_w = (width + cols - 1) / cols;
        let tile_h = (height + rows - 1) / rows;

        // One 256-entry lookup table per tile
        let mut tables = vec![[0u8; 256]; (cols * rows) as usize];
        for ty in 0..rows {
            for tx in 0..cols {
                let x0 = tx * tile_w;
                let y0 = ty * tile_h;
                let x1 = (x0 + tile_w).min(width);
                let y1 = (y0 + tile_h).min(height);
                tables[(ty * cols + tx) as usize] =
                    self.tile_mapping(plane, width, x0, y0, x1, y1);
            }
        }

        let original = plane.to_vec();
        for y in 0..height {
            for x in 0..width {
                let v = original[(y * width + x) as usize];

                // Position relative to tile centers, for bilinear blending
                let fx = (x as f64 / tile_w as f64 - 0.5).clamp(0.0, (cols - 1) as f64);
                let fy = (y as f64 / tile_h as f64 - 0.5).clamp(0.0, (rows - 1) as f64);
                let tx0 = fx.floor() as u32;
                let ty0 = fy.floor() as u32;
                let tx1 = (tx0 + 1).min(cols - 1);
                let ty1 = (ty0 + 1).min(rows - 1);
                let wx = fx - tx0 as f64;
                let wy = fy - ty0 as f64;

                let m00 = tables[(ty0 * cols + tx0) as usize][v as usize] as f64;
                let m10 = tables[(ty0 * cols + tx1) as usize][v as usize] as f64;
                let m01 = tables[(ty1 * cols + tx0) as usize][v as usize] as f64;
                let m11 = tables[(ty1 * cols + tx1) as usize][v as usize] as f64;

                let top = m00 * (1.0 - wx) + m10 * wx;
                let bottom = m01 * (1.0 - wx) + m11 * wx;
                let blended = top * (1.0 - wy) + bottom * wy;

                plane[(y * width + x) as usize] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(())
    }

    /// Clipped-histogram equalization mapping for one tile
    fn tile_mapping(
        &self,
        plane: &[u8],
        width: u32,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    ) -> [u8; 256] {
        let mut histogram = [0u64; 256];
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[plane[(y * width + x) as usize] as usize] += 1;
            }
        }

        let area = ((x1 - x0) * (y1 - y0)) as u64;
        if area == 0 {
            let mut identity = [0u8; 256];
            for (i, slot) in identity.iter_mut().enumerate() {
                *slot = i as u8;
            }
            return identity;
        }

        // Clip each bin and redistribute the excess evenly
        let clip = ((self.clip_limit * area as f64 / 256.0) as u64).max(1);
        let mut excess = 0u64;
        for bin in histogram.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let bonus = excess / 256;
        for bin in histogram.iter_mut() {
            *bin += bonus;
        }
        // Spread the residual across the whole range, not the low bins,
        // so flat regions keep a near-identity mapping
        let mut leftover = excess % 256;
        if leftover > 0 {
            let step = (256 / leftover).max(1) as usize;
            let mut i = 0usize;
            while leftover > 0 && i < 256 {
                histogram[i] += 1;
                leftover -= 1;
                i += step;
            }
        }

        let mut mapping = [0u8; 256];
        let mut cdf = 0u64;
        for (i, &count) in histogram.iter().enumerate() {
            cdf += count;
            mapping[i] = ((cdf as f64 * 255.0) / area as f64).round().clamp(0.0, 255.0) as u8;
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stddev(plane: &[u8]) -> f64 {
        let n = plane.len() as f64;
        let mean = plane.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = plane
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        var.sqrt()
    }

    #[test]
    fn test_rejects_mismatched_plane() {
        let clahe = Clahe::new(2.0);
        let mut plane = vec![0u8; 10];
        assert!(clahe.apply(&mut plane, 4, 4).is_err());
        assert!(clahe.apply(&mut plane, 0, 0).is_err());
    }

    #[test]
    fn test_flat_plane_stays_near_flat() {
        let clahe = Clahe::new(2.0);
        let mut plane = vec![100u8; 64 * 64];
        clahe.apply(&mut plane, 64, 64).unwrap();
        // Identical tiles produce identical mappings, and the clipped
        // histogram keeps the mapping close to identity on flat input
        let first = plane[0];
        assert!(plane.iter().all(|&v| v == first));
        assert!(
            (first as i32 - 100).abs() <= 12,
            "flat value drifted too far: {}",
            first
        );
    }

    #[test]
    fn test_boosts_low_contrast() {
        let clahe = Clahe::new(3.0);
        let mut plane = Vec::with_capacity(64 * 64);
        for y in 0..64u32 {
            for x in 0..64u32 {
                // Narrow band around mid-gray
                plane.push((110 + ((x + y) % 20)) as u8);
            }
        }
        let before = stddev(&plane);
        clahe.apply(&mut plane, 64, 64).unwrap();
        let after = stddev(&plane);
        assert!(after > before, "contrast should increase: {} -> {}", before, after);
    }

    #[test]
    fn test_preserves_plane_length() {
        let clahe = Clahe::new(2.0);
        let mut plane = (0..=255u8).cycle().take(100 * 50).collect::<Vec<_>>();
        clahe.apply(&mut plane, 100, 50).unwrap();
        assert_eq!(plane.len(), 100 * 50);
    }
}
