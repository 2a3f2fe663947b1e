//! State marker components.
//!
//! These components mirror the controller's support and recovery state so
//! other systems can filter on them. They are added and removed by
//! [`sync_state_markers`](crate::systems::sync_state_markers).

use bevy::prelude::*;

/// Marker component indicating the foot sensor overlaps supporting ground.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use upright_character_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character stands on a moving platform.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct OnMovingPlatform;

/// Marker component present while the character is being re-levelled.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct GettingUp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_components() {
        let mut world = World::new();
        let entity = world.spawn((Grounded, OnMovingPlatform)).id();

        assert!(world.get::<Grounded>(entity).is_some());
        assert!(world.get::<OnMovingPlatform>(entity).is_some());
        assert!(world.get::<Airborne>(entity).is_none());
        assert!(world.get::<GettingUp>(entity).is_none());
    }
}
