//! Trigger events and the foot sensor.
//!
//! Backends translate their engine's sensor contacts into [`TriggerEvent`]s,
//! in engine order. The support classifier only looks at events involving a
//! [`FootSensor`].

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Enter,
    Exit,
}

/// A trigger volume started or stopped overlapping another collider.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: TriggerKind,
    pub a: Entity,
    pub b: Entity,
}

impl TriggerEvent {
    pub fn enter(a: Entity, b: Entity) -> Self {
        Self {
            kind: TriggerKind::Enter,
            a,
            b,
        }
    }

    pub fn exit(a: Entity, b: Entity) -> Self {
        Self {
            kind: TriggerKind::Exit,
            a,
            b,
        }
    }
}

/// Trigger volume under a character that detects what it stands on.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FootSensor {
    /// The character body this sensor reports for.
    pub owner: Entity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_constructor_keeps_engine_order() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let event = TriggerEvent::enter(a, b);

        assert_eq!(event.kind, TriggerKind::Enter);
        assert_eq!((event.a, event.b), (a, b));
    }

    #[test]
    fn exit_constructor() {
        let event = TriggerEvent::exit(Entity::from_raw(4), Entity::from_raw(5));
        assert_eq!(event.kind, TriggerKind::Exit);
    }
}
