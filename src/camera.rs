//! Camera rig.
//!
//! A [`CameraRig`] sits on the camera entity and follows a character in one
//! of two modes. Whatever the mode, the only thing it hands the controller
//! is a [`CameraPose`] on the character: world-space yaw and pitch. The
//! controller never learns which rig is active.
//!
//! Both modes keep their yaw in world space and add the character's own yaw
//! change every frame. A body spun by a rotating platform or by upright
//! recovery therefore carries the view with it instead of letting it swim.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::str::FromStr;

use bevy::prelude::*;

use crate::error::ConfigError;

pub const DEFAULT_ORBIT_DISTANCE: f32 = 10.0;
pub const DEFAULT_ORBIT_PITCH: f32 = -0.5;

const FIRST_PERSON_PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
const ORBIT_PITCH_MIN: f32 = -1.5;
const ORBIT_PITCH_MAX: f32 = 0.2;

/// World-space view angles published on the character.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[reflect(Component)]
pub struct CameraPose {
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraPose {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Direction the camera looks in.
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum CameraMode {
    /// Attached to the character at eye height.
    FirstPerson { yaw: f32, pitch: f32 },
    /// Orbiting the character at `distance`.
    Orbit { yaw: f32, pitch: f32, distance: f32 },
}

impl Default for CameraMode {
    fn default() -> Self {
        Self::orbit(0.0)
    }
}

impl CameraMode {
    pub fn first_person(yaw: f32) -> Self {
        CameraMode::FirstPerson { yaw, pitch: 0.0 }
    }

    pub fn orbit(yaw: f32) -> Self {
        CameraMode::Orbit {
            yaw,
            pitch: DEFAULT_ORBIT_PITCH,
            distance: DEFAULT_ORBIT_DISTANCE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CameraMode::FirstPerson { .. } => "first_person",
            CameraMode::Orbit { .. } => "orbit",
        }
    }

    pub fn pose(&self) -> CameraPose {
        match *self {
            CameraMode::FirstPerson { yaw, pitch } | CameraMode::Orbit { yaw, pitch, .. } => {
                CameraPose { yaw, pitch }
            }
        }
    }

    /// Apply pointer look, in radians.
    pub fn look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        match self {
            CameraMode::FirstPerson { yaw, pitch } => {
                *yaw = wrap_angle(*yaw + delta_yaw);
                *pitch = (*pitch + delta_pitch).clamp(-FIRST_PERSON_PITCH_LIMIT, FIRST_PERSON_PITCH_LIMIT);
            }
            CameraMode::Orbit { yaw, pitch, .. } => {
                *yaw = wrap_angle(*yaw + delta_yaw);
                *pitch = (*pitch + delta_pitch).clamp(ORBIT_PITCH_MIN, ORBIT_PITCH_MAX);
            }
        }
    }

    /// Carry the view along with a change of the character's yaw.
    pub fn follow_body_yaw(&mut self, delta: f32) {
        match self {
            CameraMode::FirstPerson { yaw, .. } | CameraMode::Orbit { yaw, .. } => {
                *yaw = wrap_angle(*yaw + delta);
            }
        }
    }

    /// The other mode, looking the same way.
    pub fn toggled(&self) -> Self {
        match *self {
            CameraMode::FirstPerson { yaw, .. } => Self::orbit(yaw),
            CameraMode::Orbit { yaw, .. } => Self::first_person(yaw),
        }
    }

    /// Camera transform for a target at `target`.
    pub fn camera_transform(&self, target: Vec3, eye_height: f32) -> Transform {
        let rotation = self.pose().rotation();
        match *self {
            CameraMode::FirstPerson { .. } => {
                Transform::from_translation(target + Vec3::Y * eye_height).with_rotation(rotation)
            }
            CameraMode::Orbit { distance, .. } => {
                Transform::from_translation(target + rotation * Vec3::Z * distance)
                    .with_rotation(rotation)
            }
        }
    }
}

impl FromStr for CameraMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_person" | "first-person" | "fps" => Ok(Self::first_person(0.0)),
            "orbit" | "arc" | "third_person" | "third-person" => Ok(Self::orbit(0.0)),
            _ => Err(ConfigError::UnsupportedCamera(s.to_string())),
        }
    }
}

/// Camera component following a character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CameraRig {
    pub target: Entity,
    pub mode: CameraMode,
    /// Eye height above the character center in first-person mode.
    pub eye_height: f32,
    /// Radians of look per pixel of pointer motion.
    pub sensitivity: f32,
    last_body_yaw: Option<f32>,
}

impl CameraRig {
    pub fn new(target: Entity, mode: CameraMode) -> Self {
        Self {
            target,
            mode,
            eye_height: 0.7,
            sensitivity: 0.003,
            last_body_yaw: None,
        }
    }

    /// Build a rig from a mode name such as `"orbit"` or `"first_person"`.
    pub fn from_mode_name(target: Entity, name: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(target, name.parse()?))
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Pointer motion in pixels; moving right turns right, moving down looks down.
    pub fn look(&mut self, pointer_delta: Vec2) {
        self.mode.look(
            -pointer_delta.x * self.sensitivity,
            -pointer_delta.y * self.sensitivity,
        );
    }

    /// Switch between first-person and orbit, keeping the view direction.
    pub fn toggle(&mut self) {
        self.mode = self.mode.toggled();
        info!("camera switched to {}", self.mode.name());
    }

    /// Feed the character's current yaw; the mode follows its change.
    pub fn track_body_yaw(&mut self, body_yaw: f32) {
        if let Some(last) = self.last_body_yaw {
            self.mode.follow_body_yaw(wrap_angle(body_yaw - last));
        }
        self.last_body_yaw = Some(body_yaw);
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Move every rig with its target and publish the pose on the target.
///
/// A rig whose target has no transform is a configuration error.
pub fn update_camera_rigs(
    mut rigs: Query<(&mut CameraRig, &mut Transform)>,
    mut targets: Query<(&Transform, Option<&mut CameraPose>), Without<CameraRig>>,
) -> Result<(), BevyError> {
    for (mut rig, mut camera_transform) in &mut rigs {
        let Ok((target, pose)) = targets.get_mut(rig.target) else {
            return Err(ConfigError::CameraTargetMissing(rig.target).into());
        };

        let (body_yaw, _, _) = target.rotation.to_euler(EulerRot::YXZ);
        rig.track_body_yaw(body_yaw);

        *camera_transform = rig.mode.camera_transform(target.translation, rig.eye_height);
        if let Some(mut pose) = pose {
            *pose = rig.mode.pose();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes() {
        assert!(matches!(
            "first_person".parse::<CameraMode>(),
            Ok(CameraMode::FirstPerson { .. })
        ));
        assert!(matches!("Orbit".parse::<CameraMode>(), Ok(CameraMode::Orbit { .. })));
        assert!(matches!("arc".parse::<CameraMode>(), Ok(CameraMode::Orbit { .. })));
    }

    #[test]
    fn unknown_mode_is_fatal_config_error() {
        let err = "isometric".parse::<CameraMode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedCamera(ref name) if name == "isometric"));
        assert!(CameraRig::from_mode_name(Entity::from_raw(1), "isometric").is_err());
    }

    #[test]
    fn toggle_preserves_yaw() {
        let mut rig = CameraRig::new(Entity::from_raw(1), CameraMode::first_person(1.25));
        rig.toggle();
        assert!(matches!(rig.mode, CameraMode::Orbit { .. }));
        assert_eq!(rig.mode.pose().yaw, 1.25);

        rig.toggle();
        assert_eq!(rig.mode, CameraMode::first_person(1.25));
    }

    #[test]
    fn body_rotation_carries_the_view() {
        let mut rig = CameraRig::new(Entity::from_raw(1), CameraMode::orbit(0.5));
        rig.track_body_yaw(0.0);
        rig.track_body_yaw(0.2);
        assert!((rig.mode.pose().yaw - 0.7).abs() < 1e-6);
    }

    #[test]
    fn body_yaw_wraparound_is_a_small_change() {
        let mut rig = CameraRig::new(Entity::from_raw(1), CameraMode::first_person(0.0));
        rig.track_body_yaw(PI - 0.05);
        rig.track_body_yaw(-PI + 0.05);
        assert!((rig.mode.pose().yaw - 0.1).abs() < 1e-5);
    }

    #[test]
    fn first_person_pitch_is_clamped() {
        let mut mode = CameraMode::first_person(0.0);
        mode.look(0.0, 10.0);
        assert!(mode.pose().pitch < FRAC_PI_2);
    }

    #[test]
    fn orbit_camera_sits_behind_and_above_target() {
        let mode = CameraMode::orbit(0.0);
        let transform = mode.camera_transform(Vec3::ZERO, 0.7);
        assert!(transform.translation.z > 0.0);
        assert!(transform.translation.y > 0.0);
        assert!((transform.translation.length() - DEFAULT_ORBIT_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn pose_forward_matches_yaw() {
        let pose = CameraPose {
            yaw: FRAC_PI_2,
            pitch: 0.0,
        };
        assert!((pose.forward() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn rig_publishes_pose_on_target() {
        let mut app = App::new();
        app.add_systems(Update, update_camera_rigs);

        let target = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), CameraPose::default()))
            .id();
        app.world_mut().spawn((
            Transform::default(),
            CameraRig::new(target, CameraMode::first_person(0.4)),
        ));

        app.update();

        let pose = app.world().get::<CameraPose>(target).unwrap();
        assert!((pose.yaw - 0.4).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn rig_without_target_is_fatal() {
        let mut app = App::new();
        app.add_systems(Update, update_camera_rigs);
        app.world_mut().spawn((
            Transform::default(),
            CameraRig::new(Entity::from_raw(999), CameraMode::orbit(0.0)),
        ));
        app.update();
    }
}
