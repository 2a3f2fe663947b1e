//! Movement intent components.
//!
//! Intents represent the desired movement direction from player input or AI.
//! The controller systems read these intents every fixed step; input
//! handlers write them whenever keys change.

use bevy::prelude::*;

/// One of the four locomotion keys.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkKey {
    Forward,
    Back,
    Left,
    Right,
}

impl WalkKey {
    fn index(self) -> usize {
        match self {
            WalkKey::Forward => 0,
            WalkKey::Back => 1,
            WalkKey::Left => 2,
            WalkKey::Right => 3,
        }
    }

    fn opposite(self) -> WalkKey {
        match self {
            WalkKey::Forward => WalkKey::Back,
            WalkKey::Back => WalkKey::Forward,
            WalkKey::Left => WalkKey::Right,
            WalkKey::Right => WalkKey::Left,
        }
    }

    /// Local axis contribution, `-Z` forward and `+X` right.
    fn axis_value(self) -> f32 {
        match self {
            WalkKey::Forward | WalkKey::Left => -1.0,
            WalkKey::Back | WalkKey::Right => 1.0,
        }
    }

    fn is_depth(self) -> bool {
        matches!(self, WalkKey::Forward | WalkKey::Back)
    }
}

/// Movement intent for walking and jumping.
///
/// Keys along one axis follow last-key-wins: pressing S while W is held
/// walks backward, and releasing S then hands the axis back to W instead of
/// zeroing it.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use upright_character_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.press(WalkKey::Forward);
/// intent.press(WalkKey::Back);
/// assert_eq!(intent.local_direction(), Vec3::Z);
///
/// intent.release(WalkKey::Back);
/// assert_eq!(intent.local_direction(), Vec3::NEG_Z);
/// ```
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    held: [bool; 4],
    /// Current local direction, components in {-1, 0, 1}.
    direction: Vec3,
    /// Held jump intent. Holding keeps jumping whenever allowed.
    want_jump: bool,
    /// Disabled intents ignore input and report no movement.
    enabled: bool,
}

impl Default for MovementIntent {
    fn default() -> Self {
        Self {
            held: [false; 4],
            direction: Vec3::ZERO,
            want_jump: false,
            enabled: true,
        }
    }
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A walk key went down.
    pub fn press(&mut self, key: WalkKey) {
        if !self.enabled {
            return;
        }
        self.held[key.index()] = true;
        self.set_axis(key, key.axis_value());
    }

    /// A walk key went up.
    pub fn release(&mut self, key: WalkKey) {
        self.held[key.index()] = false;
        let opposite = key.opposite();
        let value = if self.held[opposite.index()] {
            opposite.axis_value()
        } else {
            0.0
        };
        self.set_axis(key, value);
    }

    fn set_axis(&mut self, key: WalkKey, value: f32) {
        if key.is_depth() {
            self.direction.z = value;
        } else {
            self.direction.x = value;
        }
    }

    pub fn is_held(&self, key: WalkKey) -> bool {
        self.held[key.index()]
    }

    /// Local walk direction, not normalized.
    pub fn local_direction(&self) -> Vec3 {
        if self.enabled {
            self.direction
        } else {
            Vec3::ZERO
        }
    }

    pub fn is_walking(&self) -> bool {
        self.local_direction() != Vec3::ZERO
    }

    /// Set the held jump state.
    pub fn set_want_jump(&mut self, want: bool) {
        self.want_jump = want && self.enabled;
    }

    pub fn want_jump(&self) -> bool {
        self.want_jump && self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or suspend input, e.g. while a text prompt has focus.
    ///
    /// Suspending clears everything held, so keys released while suspended
    /// cannot leave the character walking.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    /// Clear all movement and jump intent.
    pub fn clear(&mut self) {
        self.held = [false; 4];
        self.direction = Vec3::ZERO;
        self.want_jump = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== MovementIntent Tests ====================

    #[test]
    fn movement_intent_new() {
        let intent = MovementIntent::new();
        assert_eq!(intent.local_direction(), Vec3::ZERO);
        assert!(!intent.want_jump());
        assert!(intent.is_enabled());
    }

    #[test]
    fn single_keys_map_to_local_axes() {
        let mut intent = MovementIntent::new();
        intent.press(WalkKey::Forward);
        intent.press(WalkKey::Right);
        assert_eq!(intent.local_direction(), Vec3::new(1.0, 0.0, -1.0));

        intent.release(WalkKey::Forward);
        intent.release(WalkKey::Right);
        assert_eq!(intent.local_direction(), Vec3::ZERO);
    }

    #[test]
    fn releasing_opposite_key_restores_held_key() {
        let mut intent = MovementIntent::new();
        intent.press(WalkKey::Forward);
        intent.press(WalkKey::Back);
        assert_eq!(intent.local_direction().z, 1.0);

        intent.release(WalkKey::Back);
        assert_eq!(intent.local_direction().z, -1.0);
        assert!(intent.is_walking());
    }

    #[test]
    fn releasing_first_key_keeps_last_key() {
        let mut intent = MovementIntent::new();
        intent.press(WalkKey::Left);
        intent.press(WalkKey::Right);
        intent.release(WalkKey::Left);
        assert_eq!(intent.local_direction().x, 1.0);
    }

    #[test]
    fn axes_are_independent() {
        let mut intent = MovementIntent::new();
        intent.press(WalkKey::Forward);
        intent.press(WalkKey::Left);
        intent.release(WalkKey::Left);
        assert_eq!(intent.local_direction(), Vec3::NEG_Z);
    }

    // ==================== Enable/Jump Tests ====================

    #[test]
    fn want_jump_follows_held_state() {
        let mut intent = MovementIntent::new();
        intent.set_want_jump(true);
        assert!(intent.want_jump());
        intent.set_want_jump(false);
        assert!(!intent.want_jump());
    }

    #[test]
    fn disabled_intent_ignores_input() {
        let mut intent = MovementIntent::new();
        intent.press(WalkKey::Forward);
        intent.set_want_jump(true);

        intent.set_enabled(false);
        assert_eq!(intent.local_direction(), Vec3::ZERO);
        assert!(!intent.want_jump());

        intent.press(WalkKey::Right);
        intent.set_want_jump(true);
        assert!(!intent.is_walking());

        intent.set_enabled(true);
        assert!(!intent.is_walking());
        assert!(!intent.is_held(WalkKey::Forward));
    }
}
