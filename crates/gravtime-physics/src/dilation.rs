//! Gravitational time dilation (weak-field approximation)
//!
//! For a clock at altitude `h` above a body of radius `R` and Schwarzschild
//! radius `Rs`:
//!
//! ```text
//! factor(r)  = sqrt(1 - Rs / r)
//! time_ratio = factor(R) / factor(R + h)
//! dilated    = reference * time_ratio
//! ```

use bigdecimal::BigDecimal;
use num_traits::One;

use gravtime_core::{PhysicalConstants, DILATED_TIME_SCALE, TIME_FACTOR_SCALE};
use gravtime_precision::{Evaluated, Evaluator, Expr};

/// Computes proper time at altitude relative to the reference surface
#[derive(Clone, Debug)]
pub struct DilationCalculator<E> {
    evaluator: E,
    constants: PhysicalConstants,
}

impl<E: Evaluator> DilationCalculator<E> {
    pub fn new(evaluator: E, constants: PhysicalConstants) -> Self {
        DilationCalculator {
            evaluator,
            constants,
        }
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// `sqrt(1 - Rs / r)`
    fn rate_factor(&self, radius: Expr) -> Expr {
        (Expr::num(1u64) - Expr::from(&self.constants.schwarzschild_radius) / radius).sqrt()
    }

    fn ratio_expr(&self, altitude: u64) -> Expr {
        let surface = self.rate_factor(Expr::from(&self.constants.planet_radius));
        let at_altitude =
            self.rate_factor(Expr::from(&self.constants.planet_radius) + Expr::from(altitude));
        surface / at_altitude
    }

    /// Proper time at `altitude` for `reference_time` elapsed at the surface.
    ///
    /// Rounded to 10 fraction digits. Returns `reference_time` unchanged if
    /// evaluation fails.
    pub fn dilate(&self, altitude: u64, reference_time: &BigDecimal) -> Evaluated {
        let expr = Expr::from(reference_time) * self.ratio_expr(altitude);
        self.evaluator
            .evaluate_or(&expr, DILATED_TIME_SCALE, reference_time)
    }

    /// The time ratio alone, rounded to 15 fraction digits; `1` on failure
    pub fn time_ratio(&self, altitude: u64) -> Evaluated {
        self.evaluator.evaluate_or(
            &self.ratio_expr(altitude),
            TIME_FACTOR_SCALE,
            &BigDecimal::one(),
        )
    }
}
