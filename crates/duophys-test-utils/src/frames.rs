//! Synthetic frame-time streams for driving the adaptive optimizer.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// `count` frame deltas in seconds at a constant `fps`.
pub fn steady_frames(fps: f32, count: usize) -> Vec<f32> {
    vec![1.0 / fps; count]
}

/// `count` frame deltas around `fps`, each off by up to `jitter` of the
/// nominal delta. Always positive. The same `seed` gives the same stream.
pub fn jittered_frames(fps: f32, jitter: f32, count: usize, seed: u64) -> Vec<f32> {
    let nominal = 1.0 / fps;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let offset: f32 = rng.gen_range(-jitter..=jitter);
            (nominal * (1.0 + offset)).max(nominal * 0.01)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_frames_are_constant() {
        let frames = steady_frames(30.0, 4);
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|dt| (dt - 1.0 / 30.0).abs() < 1e-6));
    }

    #[test]
    fn jitter_stays_in_band() {
        let frames = jittered_frames(60.0, 0.2, 200, 7);
        let nominal = 1.0 / 60.0;
        assert!(
            frames
                .iter()
                .all(|dt| *dt >= nominal * 0.8 - 1e-6 && *dt <= nominal * 1.2 + 1e-6)
        );
        assert_eq!(frames, jittered_frames(60.0, 0.2, 200, 7));
    }
}
