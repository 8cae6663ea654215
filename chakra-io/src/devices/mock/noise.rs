//! Seeded Gaussian noise for the simulated drive and sensors
//!
//! Each simulated device draws from its own stream so that adding a sensor
//! reading does not shift the wheel slip sequence of a seeded run.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Which device a noise stream belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseStream {
    Drive = 0,
    Color = 1,
    Ultrasonic = 2,
}

#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Stream for one device; seed 0 draws from entropy
    pub fn for_stream(seed: u64, stream: NoiseStream) -> Self {
        let rng = match seed {
            0 => SmallRng::from_entropy(),
            s => SmallRng::seed_from_u64(s.wrapping_mul(31).wrapping_add(stream as u64)),
        };
        Self { rng }
    }

    /// Multiplicative wheel slip factor centred on 1
    pub fn slip_factor(&mut self, stddev: f64) -> f64 {
        1.0 + self.gaussian(stddev)
    }

    /// `value` plus zero-mean noise
    pub fn perturb(&mut self, value: f64, stddev: f64) -> f64 {
        value + self.gaussian(stddev)
    }

    fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev <= 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }
}
