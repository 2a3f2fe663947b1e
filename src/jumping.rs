//! Jump configuration and the jump cooldown governor.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::secs;

/// Configuration for jumping.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Upward velocity change applied by a jump (scaled by body mass).
    pub impulse: f32,

    /// Minimum time between two jumps, in seconds.
    pub cooldown: f32,

    /// Largest tilt (radians) at which a jump is still allowed.
    pub max_tilt: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            impulse: 9.0,
            cooldown: 0.5,
            max_tilt: 0.05,
        }
    }
}

/// Decides when the character may jump.
///
/// Touching ground and being allowed to jump are separate facts: after a jump
/// the governor stays closed until the cooldown has run out *and* a later step
/// finds the character supported, so one support-enter event cannot be
/// farmed for repeated jumps.
#[derive(Reflect, Debug, Clone)]
pub struct JumpGovernor {
    can_jump: bool,
    cooldown: Timer,
}

impl Default for JumpGovernor {
    fn default() -> Self {
        Self::new(JumpConfig::default().cooldown)
    }
}

impl JumpGovernor {
    /// A closed governor whose cooldown starts now.
    pub fn new(cooldown_secs: f32) -> Self {
        Self {
            can_jump: false,
            cooldown: Timer::new(secs(cooldown_secs), TimerMode::Once),
        }
    }

    pub fn can_jump(&self) -> bool {
        self.can_jump
    }

    /// Time since the last jump (saturates at the cooldown).
    pub fn since_last_jump(&self) -> Duration {
        self.cooldown.elapsed()
    }

    /// Consume a jump if one is wanted and allowed.
    ///
    /// Returns `true` when the caller should apply the jump impulse.
    pub fn try_jump(&mut self, want_jump: bool, tilt: f32, max_tilt: f32) -> bool {
        if !(want_jump && self.can_jump && tilt < max_tilt) {
            return false;
        }
        self.can_jump = false;
        self.cooldown.reset();
        true
    }

    /// Advance the cooldown by one step.
    pub fn tick(&mut self, delta: Duration, supported: bool) {
        if self.can_jump {
            return;
        }
        if !self.cooldown.finished() {
            self.cooldown.tick(delta);
        } else if supported {
            self.can_jump = true;
        }
    }

    /// Withdraw eligibility, e.g. when the feet leave every support.
    pub fn revoke(&mut self) {
        self.can_jump = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(50);

    fn ready_governor() -> JumpGovernor {
        let mut governor = JumpGovernor::new(0.5);
        for _ in 0..11 {
            governor.tick(STEP, true);
        }
        assert!(governor.can_jump());
        governor
    }

    #[test]
    fn starts_closed() {
        let governor = JumpGovernor::default();
        assert!(!governor.can_jump());
    }

    #[test]
    fn opens_after_cooldown_when_supported() {
        let mut governor = JumpGovernor::new(0.5);
        for _ in 0..10 {
            governor.tick(STEP, true);
            assert!(!governor.can_jump());
        }
        governor.tick(STEP, true);
        assert!(governor.can_jump());
    }

    #[test]
    fn stays_closed_in_the_air_after_cooldown() {
        let mut governor = JumpGovernor::new(0.5);
        for _ in 0..30 {
            governor.tick(STEP, false);
        }
        assert!(!governor.can_jump());

        governor.tick(STEP, true);
        assert!(governor.can_jump());
    }

    #[test]
    fn jump_requires_want_and_low_tilt() {
        let mut governor = ready_governor();

        assert!(!governor.try_jump(false, 0.0, 0.05));
        assert!(!governor.try_jump(true, 0.06, 0.05));
        assert!(governor.can_jump());

        assert!(governor.try_jump(true, 0.01, 0.05));
        assert!(!governor.can_jump());
        assert_eq!(governor.since_last_jump(), Duration::ZERO);
    }

    #[test]
    fn held_jump_does_not_repeat_within_cooldown() {
        let mut governor = ready_governor();
        assert!(governor.try_jump(true, 0.0, 0.05));

        // 450ms of held jump on the ground
        for _ in 0..9 {
            governor.tick(STEP, true);
            assert!(!governor.try_jump(true, 0.0, 0.05));
        }
    }

    #[test]
    fn revoke_closes_an_open_governor() {
        let mut governor = ready_governor();
        governor.revoke();
        assert!(!governor.can_jump());

        // Cooldown already ran out, so the next supported step reopens it.
        governor.tick(STEP, true);
        assert!(governor.can_jump());
    }
}
