//! Bang-bang feedback controller for the producer rate
//!
//! The controller looks only at the sign of `occupancy - threshold` and moves
//! the producer rate one fixed step in the opposite direction. The result is
//! kept inside a band around the consumer rate so the producer can neither
//! be throttled to zero nor run away from the consumer.

use super::{Rate, RateError};

/// Which way a control step moved the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Occupancy was above the threshold
    Decrease,
    /// Occupancy was at or below the threshold
    Increase,
}

/// Outcome of one control step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    pub direction: Direction,
    /// Producer rate before the step
    pub previous: Rate,
    /// Producer rate to apply
    pub target: Rate,
}

impl ControlDecision {
    /// Whether the step changed the producer rate at all
    pub fn is_change(&self) -> bool {
        self.previous.permits_per_second() != self.target.permits_per_second()
    }
}

/// Fixed-step threshold controller
///
/// # Example
///
/// ```
/// use queuepilot::{Controller, Direction, Rate};
///
/// let controller = Controller::new(1.0).unwrap();
/// let producer = Rate::per_second(10.0).unwrap();
/// let consumer = Rate::per_second(10.0).unwrap();
///
/// let decision = controller.step(producer, consumer, 20, 5);
/// assert_eq!(decision.direction, Direction::Decrease);
/// assert_eq!(decision.target.permits_per_second(), 9.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Controller {
    step: f64,
}

impl Controller {
    /// Create a controller moving `step` permits/second per tick
    ///
    /// # Errors
    ///
    /// Returns [`RateError::InvalidStep`] unless `step` is positive and finite.
    pub fn new(step: f64) -> Result<Self, RateError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(RateError::InvalidStep(step));
        }
        Ok(Controller { step })
    }

    pub fn step_size(&self) -> f64 {
        self.step
    }

    /// Compute the producer rate for the next period
    ///
    /// Above the threshold the rate drops by one step but not below half the
    /// consumer rate; otherwise it rises by one step but not above twice the
    /// consumer rate. The target always lands inside
    /// `[consumer / 2, consumer * 2]`.
    pub fn step(
        &self,
        producer: Rate,
        consumer: Rate,
        occupancy: usize,
        threshold: usize,
    ) -> ControlDecision {
        let current = producer.permits_per_second();
        let floor = consumer.permits_per_second() / 2.0;
        let ceiling = consumer.permits_per_second() * 2.0;

        let (direction, target) = if occupancy > threshold {
            (Direction::Decrease, (current - self.step).max(floor))
        } else {
            (Direction::Increase, (current + self.step).min(ceiling))
        };
        let target = target.clamp(floor, ceiling);

        // floor > 0 for any valid consumer rate, so only an interval overflow
        // at the very bottom of the range can fail here
        let target = Rate::per_second(target).unwrap_or(consumer);

        ControlDecision {
            direction,
            previous: producer,
            target,
        }
    }
}
