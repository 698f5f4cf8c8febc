//! Synthetic pixel data for the simulated camera.
//!
//! The scene is a smooth colour field: red ramps left to right, green ramps
//! top to bottom, blue ramps along the diagonal. Light frames carry the scene
//! plus noise; dark frames carry only a bias level plus noise.

/// Bias level of a dark frame, roughly 2% of full scale.
const DARK_BIAS: i32 = 1_310;

/// Simple pseudo-random number generator (LCG) for reproducible noise.
/// Uses the same algorithm as glibc for predictable cross-platform behavior.
#[inline]
fn prng(seed: u64) -> u64 {
    seed.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fffffff
}

/// Scene value for channel `c` (0 = R, 1 = G, 2 = B) at `(x, y)`.
fn scene(x: usize, y: usize, c: usize, w: usize, h: usize) -> i32 {
    let value = match c {
        0 => x * 60_000 / w.max(1),
        1 => y * 60_000 / h.max(1),
        _ => (x + y) * 60_000 / (w + h).max(1),
    };
    value as i32 + 2_000
}

fn sample(x: usize, y: usize, c: usize, w: usize, h: usize, seed: u64, light: bool) -> u16 {
    let idx = ((y * w + x) * 3 + c) as u64;
    let noise = (prng(seed ^ idx) & 0x3FF) as i32 - 512;
    let base = if light { scene(x, y, c, w, h) } else { DARK_BIAS };
    (base + noise).clamp(0, 65_535) as u16
}

/// Single-plane bayer mosaic (RGGB at zero offset).
///
/// `offset_x` / `offset_y` shift the colour filter phase the way a sensor's
/// bayer offsets do.
pub fn bayer_frame(
    width: u32,
    height: u32,
    offset_x: u8,
    offset_y: u8,
    sequence: u64,
    light: bool,
) -> Vec<u16> {
    let w = width as usize;
    let h = height as usize;
    let seed = sequence.wrapping_mul(2654435761);
    let mut buffer = Vec::with_capacity(w * h);

    for y in 0..h {
        for x in 0..w {
            let px = (x + offset_x as usize) % 2;
            let py = (y + offset_y as usize) % 2;
            let channel = match (px, py) {
                (0, 0) => 0,
                (1, 1) => 2,
                _ => 1,
            };
            buffer.push(sample(x, y, channel, w, h, seed, light));
        }
    }
    buffer
}

/// Three interleaved channels (R, G, B) per pixel.
pub fn rgb_frame(width: u32, height: u32, sequence: u64, light: bool) -> Vec<u16> {
    let w = width as usize;
    let h = height as usize;
    let seed = sequence.wrapping_mul(2654435761);
    let mut buffer = Vec::with_capacity(w * h * 3);

    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                buffer.push(sample(x, y, c, w, h, seed, light));
            }
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizes() {
        assert_eq!(bayer_frame(64, 48, 0, 0, 1, true).len(), 64 * 48);
        assert_eq!(rgb_frame(64, 48, 1, true).len(), 64 * 48 * 3);
    }

    #[test]
    fn test_dark_frame_stays_near_bias() {
        let frame = bayer_frame(32, 32, 0, 0, 7, false);
        assert!(frame.iter().all(|&v| (v as i32 - DARK_BIAS).abs() <= 512));
    }

    #[test]
    fn test_frames_vary_with_sequence() {
        assert_ne!(rgb_frame(16, 16, 1, true), rgb_frame(16, 16, 2, true));
        assert_eq!(rgb_frame(16, 16, 3, true), rgb_frame(16, 16, 3, true));
    }

    #[test]
    fn test_bayer_offset_changes_phase() {
        let rggb = bayer_frame(64, 64, 0, 0, 0, true);
        let grbg = bayer_frame(64, 64, 1, 0, 0, true);
        assert_ne!(rggb, grbg);
    }
}
