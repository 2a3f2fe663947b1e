//! Ground support bookkeeping.
//!
//! The foot sensor reports every volume it starts or stops overlapping.
//! [`SupportState`] turns that stream into two counters, one for all
//! supporting volumes and one for the subset that are animated platforms.
//! Counters rather than booleans are the source of truth so a character
//! straddling two platform edges is neither double counted nor dropped when
//! it leaves one of them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SupportError;

/// Overlap counters maintained from foot sensor trigger events.
#[derive(Reflect, Debug, Clone, Default, PartialEq)]
pub struct SupportState {
    support_count: u32,
    animated_support_count: u32,
    /// Every volume currently entered, with whether it was animated on entry.
    ///
    /// An exit must match one of these, and it decrements the animated
    /// counter only if that contact was counted as animated, so a platform
    /// that changes motion kind mid-contact cannot unbalance the counters.
    contacts: Vec<(Entity, bool)>,
}

/// What an enter or exit did to the support state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportChange {
    /// First supporting volume entered.
    Landed,
    /// Last supporting volume left.
    Left,
    /// First animated volume entered while already supported.
    AnimatedGained,
    /// Last animated volume left while still supported elsewhere.
    AnimatedLost,
    /// Counters moved without changing either flag.
    Unchanged,
}

impl SupportChange {
    /// Whether the character's inertia must be re-selected.
    pub fn changes_inertia(self) -> bool {
        !matches!(self, SupportChange::Unchanged)
    }
}

impl SupportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of volumes currently under the feet.
    pub fn support_count(&self) -> u32 {
        self.support_count
    }

    /// Number of animated volumes currently under the feet.
    pub fn animated_support_count(&self) -> u32 {
        self.animated_support_count
    }

    /// Standing on anything jumpable.
    pub fn on_support(&self) -> bool {
        self.support_count > 0
    }

    /// Standing on at least one moving platform.
    pub fn on_animated(&self) -> bool {
        self.animated_support_count > 0
    }

    /// Record the feet entering `other`.
    pub fn enter(&mut self, other: Entity, animated: bool) -> SupportChange {
        let was_supported = self.on_support();
        self.contacts.push((other, animated));
        self.support_count += 1;

        let mut gained_animated = false;
        if animated {
            self.animated_support_count += 1;
            gained_animated = self.animated_support_count == 1;
        }

        if !was_supported {
            SupportChange::Landed
        } else if gained_animated {
            SupportChange::AnimatedGained
        } else {
            SupportChange::Unchanged
        }
    }

    /// Record the feet leaving `other`.
    ///
    /// An exit for a volume that was never entered leaves the state
    /// untouched and reports [`SupportError::UnmatchedExit`].
    pub fn exit(&mut self, other: Entity) -> Result<SupportChange, SupportError> {
        let Some(index) = self.contacts.iter().position(|(e, _)| *e == other) else {
            return Err(SupportError::UnmatchedExit { other });
        };
        let (_, animated) = self.contacts.swap_remove(index);
        self.support_count -= 1;

        let mut lost_animated = false;
        if animated {
            self.animated_support_count -= 1;
            lost_animated = self.animated_support_count == 0;
        }

        Ok(if !self.on_support() {
            SupportChange::Left
        } else if lost_animated {
            SupportChange::AnimatedLost
        } else {
            SupportChange::Unchanged
        })
    }
}

/// Principal inertia values swapped in as support changes.
///
/// Near infinite values pin the body upright, small values let it tip or
/// follow a rotating platform. The defaults are tuning, not a contract.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaConfig {
    /// Pitch/roll inertia while supported ("planted feet").
    pub xz_supported: f32,
    /// Pitch/roll inertia in the air or when fallen.
    pub xz_airborne: f32,
    /// Yaw inertia on static ground and in the air.
    pub y_static: f32,
    /// Yaw inertia on a moving platform, small so the body turns with it.
    pub y_animated: f32,
}

impl Default for InertiaConfig {
    fn default() -> Self {
        Self {
            xz_supported: 999_999.0,
            xz_airborne: 9.0,
            y_static: 999.0,
            y_animated: 0.01,
        }
    }
}

impl InertiaConfig {
    /// Principal inertia (x, y, z) for the given support state.
    pub fn select(&self, support: &SupportState) -> Vec3 {
        if support.on_support() {
            let y = if support.on_animated() {
                self.y_animated
            } else {
                self.y_static
            };
            Vec3::new(self.xz_supported, y, self.xz_supported)
        } else {
            Vec3::new(self.xz_airborne, self.y_static, self.xz_airborne)
        }
    }

    /// Inertia a freshly spawned character starts with.
    pub fn initial(&self) -> Vec3 {
        Vec3::new(self.xz_supported, self.y_animated, self.xz_supported)
    }
}
