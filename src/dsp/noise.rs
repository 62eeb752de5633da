//! Colored noise generation
//!
//! White noise comes from a PCG32 generator; pink and brown are shaped from
//! it. All filter state lives in the generator instance, so two generators
//! never interfere with each other.

use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Paul Kellet's pink filter: (pole, white gain) for states s0..s5
const PINK_POLES: [(f32, f32); 6] = [
    (0.99886, 0.0555179),
    (0.99332, 0.0750759),
    (0.96900, 0.1538520),
    (0.86650, 0.3104856),
    (0.55000, 0.5329522),
    (-0.7616, -0.0168980),
];

/// Direct white contribution to the pink sum
const PINK_DIRECT_GAIN: f32 = 0.5362;

/// White gain feeding s6, which enters the sum one sample late
const PINK_S6_GAIN: f32 = 0.115926;

/// Pink output scale, keeps the sum within roughly [-1, 1]
const PINK_OUTPUT_SCALE: f32 = 0.11;

/// Brown integrator: b = (b + step * w) / leak
const BROWN_STEP: f32 = 0.02;
const BROWN_LEAK: f32 = 1.02;

/// Makeup gain for the integrator's attenuation
const BROWN_OUTPUT_SCALE: f32 = 3.5;

// ============================================================================
// Noise Type
// ============================================================================

/// Noise color. Index order matches the `noiseType` choice parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    White,
    #[default]
    Pink,
    Brown,
}

impl NoiseType {
    pub const NAMES: [&'static str; 3] = ["white", "pink", "brown"];

    /// Unknown indices fall back to pink, the layer's default color.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => NoiseType::White,
            2 => NoiseType::Brown,
            _ => NoiseType::Pink,
        }
    }

    pub fn index(self) -> usize {
        match self {
            NoiseType::White => 0,
            NoiseType::Pink => 1,
            NoiseType::Brown => 2,
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// White/pink/brown noise source
#[derive(Debug, Clone)]
pub struct ColoredNoiseGenerator {
    rng: Pcg32,
    dist: Uniform<f32>,
    pink: [f32; 7],
    brown: f32,
}

impl ColoredNoiseGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self::from_rng(Pcg32::from_entropy())
    }

    /// Deterministic generator, used by tests and offline renders
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(Pcg32::seed_from_u64(seed))
    }

    fn from_rng(rng: Pcg32) -> Self {
        Self {
            rng,
            dist: Uniform::new_inclusive(-1.0, 1.0),
            pink: [0.0; 7],
            brown: 0.0,
        }
    }

    /// Next sample of the requested color
    #[inline]
    pub fn next(&mut self, noise_type: NoiseType) -> f32 {
        match noise_type {
            NoiseType::White => self.white(),
            NoiseType::Pink => self.pink(),
            NoiseType::Brown => self.brown(),
        }
    }

    /// Uniform sample in [-1, 1]
    #[inline]
    pub fn white(&mut self) -> f32 {
        self.dist.sample(&mut self.rng)
    }

    /// Paul Kellet's refined pink filter
    pub fn pink(&mut self) -> f32 {
        let white = self.white();

        for (state, &(pole, gain)) in self.pink.iter_mut().zip(PINK_POLES.iter()) {
            *state = pole * *state + white * gain;
        }

        let sum: f32 = self.pink.iter().sum();
        let pink = sum + white * PINK_DIRECT_GAIN;
        self.pink[6] = white * PINK_S6_GAIN;

        pink * PINK_OUTPUT_SCALE
    }

    /// Leaky-integrated white noise, hard-clamped to [-1, 1]
    pub fn brown(&mut self) -> f32 {
        let white = self.white();
        self.brown = (self.brown + BROWN_STEP * white) / BROWN_LEAK;
        (self.brown * BROWN_OUTPUT_SCALE).clamp(-1.0, 1.0)
    }

    /// Clear the pink and brown filter state (the random stream continues)
    pub fn reset(&mut self) {
        self.pink = [0.0; 7];
        self.brown = 0.0;
    }
}

impl Default for ColoredNoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}
