//! The animation started by the fist trigger.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParams {
    #[serde(with = "secs")]
    pub duration: Duration,
    /// Vertical lift reached at the end of the animation (marker units).
    pub height: f64,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(1),
            height: 0.05,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationState {
    #[default]
    Idle,
    Animating {
        start: Duration,
    },
}

/// At most one animation in flight: triggers while animating are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractionStateMachine {
    params: AnimationParams,
    state: AnimationState,
}

impl InteractionStateMachine {
    pub fn new(params: AnimationParams) -> Self {
        Self {
            params,
            state: AnimationState::Idle,
        }
    }

    pub fn params(&self) -> &AnimationParams {
        &self.params
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Start the animation at `now`. Returns `false` if one is already
    /// running.
    pub fn trigger(&mut self, now: Duration) -> bool {
        self.advance(now);
        match self.state {
            AnimationState::Idle => {
                log::info!("animation started");
                self.state = AnimationState::Animating { start: now };
                true
            }
            AnimationState::Animating { .. } => false,
        }
    }

    /// Model offset at `now`: a linear lift along +y while animating, zero
    /// otherwise.
    pub fn current_offset(&mut self, now: Duration) -> Vector3<f64> {
        self.advance(now);
        match self.state {
            AnimationState::Idle => Vector3::zeros(),
            AnimationState::Animating { start } => {
                let elapsed = now.saturating_sub(start).as_secs_f64();
                let progress = elapsed / self.params.duration.as_secs_f64();
                Vector3::new(0.0, self.params.height * progress, 0.0)
            }
        }
    }

    fn advance(&mut self, now: Duration) {
        if let AnimationState::Animating { start } = self.state {
            if now.saturating_sub(start) >= self.params.duration {
                log::debug!("animation finished");
                self.state = AnimationState::Idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn idle_offset_is_zero() {
        let mut m = InteractionStateMachine::default();
        assert_eq!(m.current_offset(ms(500)), Vector3::zeros());
        assert_eq!(m.state(), AnimationState::Idle);
    }

    #[test]
    fn lift_is_linear_then_returns_to_idle() {
        let mut m = InteractionStateMachine::default();
        assert!(m.trigger(ms(2000)));
        assert_eq!(m.current_offset(ms(2000)), Vector3::zeros());
        assert_relative_eq!(m.current_offset(ms(2250)).y, 0.0125, epsilon = 1e-12);
        assert_relative_eq!(m.current_offset(ms(2999)).y, 0.04995, epsilon = 1e-12);
        assert_eq!(m.current_offset(ms(3000)), Vector3::zeros());
        assert_eq!(m.state(), AnimationState::Idle);
    }

    #[test]
    fn trigger_while_animating_does_not_restart() {
        let mut m = InteractionStateMachine::default();
        assert!(m.trigger(ms(0)));
        assert!(!m.trigger(ms(600)));
        assert_eq!(m.state(), AnimationState::Animating { start: ms(0) });
        // Once the first run is over a new trigger starts a fresh one.
        assert!(m.trigger(ms(1000)));
        assert_eq!(m.state(), AnimationState::Animating { start: ms(1000) });
    }

    #[test]
    fn params_use_seconds_in_json() {
        let p: AnimationParams = serde_json::from_str(r#"{"duration": 0.5}"#).unwrap();
        assert_eq!(p.duration, ms(500));
        assert_eq!(p.height, 0.05);
    }
}
