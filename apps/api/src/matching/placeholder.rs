//! Placeholder sub-scores.
//!
//! `experience_match_score` and `culture_fit_score` carry no signal: the
//! heuristic has no experience or culture data to compare. They exist so the
//! match report keeps its shape. The source is injected so tests (and anyone
//! who wants reproducible output) can pin the values.

use std::str::FromStr;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderMode {
    #[default]
    Random,
    Fixed,
}

impl FromStr for PlaceholderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(PlaceholderMode::Random),
            "fixed" => Ok(PlaceholderMode::Fixed),
            other => Err(format!("unknown placeholder mode '{other}'")),
        }
    }
}

/// Supplies the two placeholder sub-scores, each in `[0, 100]`.
pub trait PlaceholderSource: Send + Sync {
    fn experience(&self) -> f64;
    fn culture_fit(&self) -> f64;
}

/// Constant placeholders.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlaceholders {
    pub experience: f64,
    pub culture_fit: f64,
}

impl Default for FixedPlaceholders {
    fn default() -> Self {
        Self {
            experience: 50.0,
            culture_fit: 50.0,
        }
    }
}

impl PlaceholderSource for FixedPlaceholders {
    fn experience(&self) -> f64 {
        self.experience.clamp(0.0, 100.0)
    }

    fn culture_fit(&self) -> f64 {
        self.culture_fit.clamp(0.0, 100.0)
    }
}

/// Pseudo-random placeholders: experience in `[60, 100)`, culture fit in `[70, 100)`.
pub struct RandomPlaceholders {
    rng: Mutex<StdRng>,
}

impl RandomPlaceholders {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn sample(&self, low: f64, high: f64) -> f64 {
        // A poisoned lock still holds a usable RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(low..high)
    }
}

impl PlaceholderSource for RandomPlaceholders {
    fn experience(&self) -> f64 {
        self.sample(60.0, 100.0)
    }

    fn culture_fit(&self) -> f64 {
        self.sample(70.0, 100.0)
    }
}

/// Builds the configured source.
pub fn placeholder_source(mode: PlaceholderMode, seed: Option<u64>) -> Box<dyn PlaceholderSource> {
    match (mode, seed) {
        (PlaceholderMode::Fixed, _) => Box::new(FixedPlaceholders::default()),
        (PlaceholderMode::Random, Some(seed)) => Box::new(RandomPlaceholders::seeded(seed)),
        (PlaceholderMode::Random, None) => Box::new(RandomPlaceholders::from_entropy()),
    }
}
