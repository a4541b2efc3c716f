//! Random-variate sources for interarrival times, service times, and
//! branch draws.
//!
//! The engine treats every source as opaque: it asks for the next sample
//! and never inspects the distribution. The built-in variants cover the
//! common arrival/service shapes; [`Distribution::Custom`] accepts any
//! closure over the replication's RNG.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::Arc;

/// A real-valued sample source.
#[derive(Clone)]
pub enum Distribution {
    /// Always the same value.
    Constant(f64),
    /// Uniform over `[low, high)`.
    Uniform {
        /// Lowest possible value.
        low: f64,
        /// Highest possible value.
        high: f64,
    },
    /// Exponential with the given rate (mean `1 / rate`).
    Exponential {
        /// Events per time unit.
        rate: f64,
    },
    /// Triangular over `[low, high]` with the given mode.
    Triangular {
        /// Lowest possible value.
        low: f64,
        /// Most likely value.
        mode: f64,
        /// Highest possible value.
        high: f64,
    },
    /// User-supplied sampler over the replication RNG.
    Custom(Arc<dyn Fn(&mut ChaCha8Rng) -> f64 + Send + Sync>),
}

impl Distribution {
    /// Draw the next sample.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> f64 {
        match self {
            Distribution::Constant(value) => *value,
            Distribution::Uniform { low, high } => {
                if high <= low {
                    *low
                } else {
                    rng.gen_range(*low..*high)
                }
            }
            Distribution::Exponential { rate } => {
                // Inverse transform; 1 - u keeps the argument in (0, 1].
                let u = 1.0 - rng.gen::<f64>();
                -u.ln() / rate
            }
            Distribution::Triangular { low, mode, high } => {
                let u = rng.gen::<f64>();
                let span = high - low;
                if span <= 0.0 {
                    return *low;
                }
                let cut = (mode - low) / span;
                if u < cut {
                    low + (u * span * (mode - low)).sqrt()
                } else {
                    high - ((1.0 - u) * span * (high - mode)).sqrt()
                }
            }
            Distribution::Custom(sampler) => sampler(rng),
        }
    }

    /// Check parameters, returning a human-readable reason on failure.
    ///
    /// Called during network validation so malformed parameters surface as
    /// configuration errors instead of bad samples mid-run.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Distribution::Constant(value) => {
                if !value.is_finite() {
                    return Err(format!("constant value {value} is not finite"));
                }
                if *value < 0.0 {
                    return Err(format!("constant value {value} is negative"));
                }
            }
            Distribution::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err("uniform bounds must be finite".into());
                }
                if *low < 0.0 {
                    return Err(format!("uniform low bound {low} is negative"));
                }
                if high < low {
                    return Err(format!("uniform bounds inverted ({low} > {high})"));
                }
            }
            Distribution::Exponential { rate } => {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(format!("exponential rate {rate} must be positive"));
                }
            }
            Distribution::Triangular { low, mode, high } => {
                if !low.is_finite() || !mode.is_finite() || !high.is_finite() {
                    return Err("triangular parameters must be finite".into());
                }
                if *low < 0.0 {
                    return Err(format!("triangular low bound {low} is negative"));
                }
                if !(low <= mode && mode <= high) {
                    return Err(format!(
                        "triangular parameters out of order ({low}, {mode}, {high})"
                    ));
                }
                if high <= low {
                    return Err("triangular range is empty".into());
                }
            }
            Distribution::Custom(_) => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Constant(value) => write!(f, "Constant({value})"),
            Distribution::Uniform { low, high } => write!(f, "Uniform({low}, {high})"),
            Distribution::Exponential { rate } => write!(f, "Exponential(rate = {rate})"),
            Distribution::Triangular { low, mode, high } => {
                write!(f, "Triangular({low}, {mode}, {high})")
            }
            Distribution::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_constant_is_constant() {
        let mut rng = rng();
        let dist = Distribution::Constant(2.5);
        for _ in 0..10 {
            assert_eq!(dist.sample(&mut rng), 2.5);
        }
    }

    #[test]
    fn test_uniform_stays_in_bounds() {
        let mut rng = rng();
        let dist = Distribution::Uniform {
            low: 1.0,
            high: 4.0,
        };
        for _ in 0..1000 {
            let s = dist.sample(&mut rng);
            assert!((1.0..4.0).contains(&s), "sample {s} out of bounds");
        }
    }

    #[test]
    fn test_exponential_is_non_negative() {
        let mut rng = rng();
        let dist = Distribution::Exponential { rate: 2.0 };
        for _ in 0..1000 {
            assert!(dist.sample(&mut rng) >= 0.0);
        }
    }

    #[test]
    fn test_triangular_stays_in_bounds() {
        let mut rng = rng();
        let dist = Distribution::Triangular {
            low: 2.0,
            mode: 3.0,
            high: 6.0,
        };
        for _ in 0..1000 {
            let s = dist.sample(&mut rng);
            assert!((2.0..=6.0).contains(&s), "sample {s} out of bounds");
        }
    }

    #[test]
    fn test_custom_uses_replication_rng() {
        let mut rng = rng();
        let dist = Distribution::Custom(Arc::new(|rng: &mut ChaCha8Rng| {
            if rng.gen::<bool>() {
                1.0
            } else {
                2.0
            }
        }));
        let s = dist.sample(&mut rng);
        assert!(s == 1.0 || s == 2.0);
    }

    #[test]
    fn test_validate_rejects_negative_delays() {
        // A delay that can only ever be negative is a configuration error,
        // caught before the first event is scheduled.
        assert!(Distribution::Constant(-1.0).validate().is_err());
        assert!(Distribution::Uniform {
            low: -1.0,
            high: 2.0
        }
        .validate()
        .is_err());
        assert!(Distribution::Triangular {
            low: -1.0,
            mode: 0.5,
            high: 2.0
        }
        .validate()
        .is_err());
        assert!(Distribution::Constant(0.0).validate().is_ok());
        assert!(Distribution::Uniform {
            low: 0.0,
            high: 2.0
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(Distribution::Constant(f64::NAN).validate().is_err());
        assert!(Distribution::Uniform {
            low: 2.0,
            high: 1.0
        }
        .validate()
        .is_err());
        assert!(Distribution::Exponential { rate: 0.0 }.validate().is_err());
        assert!(Distribution::Triangular {
            low: 0.0,
            mode: 3.0,
            high: 2.0
        }
        .validate()
        .is_err());
        assert!(Distribution::Uniform {
            low: 1.0,
            high: 1.0
        }
        .validate()
        .is_ok());
    }
}
