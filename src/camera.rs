use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

use crate::config::EyeConfig;

/// Scales normalized mouse drag distances into orbit angle changes.
pub const PAN_SENSITIVITY: f32 = 4.0;

/// Distance the camera moves toward or away from its target per wheel notch.
pub const ZOOM_STEP: f32 = 0.5;

/// The camera never zooms closer to its target than this.
pub const MIN_RADIUS: f32 = ZOOM_STEP;

/// `phi` is nudged by this amount away from exactly ±π/2 so the view direction
/// never lines up with the world up axis.
pub const POLE_EPSILON: f32 = 1.0e-4;

/// A camera that orbits around a target point at a fixed distance.
///
/// The camera position is given in spherical coordinates around `look_at`:
/// `theta` is the azimuth around the world up (+Y) axis measured from +X,
/// `phi` is the elevation above the XZ plane and `r` is the orbit radius. Like
/// the rest of the renderer the camera assumes a right-handed system with +Z
/// coming out of the screen.
///
/// The following transforms points from local space to clip space:
///  `V_clip = M_projection * M_view * M_model * M_local`
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Azimuth angle in radians.
    theta: f32,
    /// Elevation angle in radians.
    phi: f32,
    /// Distance from the camera to `look_at`.
    r: f32,
    /// The point the camera orbits and faces.
    look_at: Vec3,
    /// The vertical field of view in radians.
    fov_y: f32,
    /// Fragments closer than `z_near` are clipped.
    z_near: f32,
    /// Fragments further than `z_far` are clipped.
    z_far: f32,
    /// Ratio of the viewport width to its height.
    aspect: f32,
    viewport_width: f32,
    viewport_height: f32,
    /// Cached world space camera position, refreshed by `recompute`.
    position: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl OrbitCamera {
    /// The world space direction considered straight up.
    pub const WORLD_UP: Vec3 = Vec3::Y;

    /// Create a new orbit camera from the `EYE` configuration with a viewport
    /// of the given size in pixels.
    pub fn new(
        eye: &EyeConfig,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Result<Self, CameraError> {
        if !(eye.r > 0.0) {
            return Err(CameraError::InvalidRadius(eye.r));
        }

        if !(eye.fov > 0.0 && eye.fov < 180.0) {
            return Err(CameraError::InvalidFieldOfView(eye.fov));
        }

        if !(eye.near_plane > 0.0 && eye.far_plane > eye.near_plane) {
            return Err(CameraError::InvalidClipPlanes {
                near: eye.near_plane,
                far: eye.far_plane,
            });
        }

        if viewport_width == 0 || viewport_height == 0 {
            return Err(InvalidCameraSize(viewport_width, viewport_height).into());
        }

        let mut camera = Self {
            theta: eye.theta,
            phi: eye.phi,
            r: eye.r,
            look_at: eye.look_at,
            fov_y: eye.fov.to_radians(),
            z_near: eye.near_plane,
            z_far: eye.far_plane,
            aspect: viewport_width as f32 / viewport_height as f32,
            viewport_width: viewport_width as f32,
            viewport_height: viewport_height as f32,
            position: Vec3::ZERO,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };

        camera.nudge_off_pole();
        camera.recompute();
        camera.update_projection();

        Ok(camera)
    }

    /// Rebuild the camera position and view matrix from the current orbit
    /// angles and radius.
    ///
    /// Start with +X, spin it `theta` radians around the world up axis, then
    /// tilt it `phi` radians toward the up axis around the horizontal axis
    /// perpendicular to it. Scaling by `r` and offsetting by `look_at` gives
    /// the camera position.
    pub fn recompute(&mut self) {
        let azimuth = Quat::from_axis_angle(Self::WORLD_UP, self.theta) * Vec3::X;
        let tilt_axis = azimuth.cross(Self::WORLD_UP).normalize();
        let direction = (Quat::from_axis_angle(tilt_axis, self.phi) * azimuth).normalize();

        self.position = direction * self.r + self.look_at;
        self.view = Mat4::look_at_rh(self.position, self.look_at, Self::WORLD_UP);
    }

    /// Orbit the camera by a normalized mouse drag distance. `dx` and `dy` are
    /// fractions of the viewport width and height.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.theta += dx * PAN_SENSITIVITY;
        self.phi += dy * PAN_SENSITIVITY / 4.0;

        self.nudge_off_pole();
        self.recompute();
    }

    /// Move the camera one step away from its target when `direction` is
    /// positive, or one step closer when it is negative. Zooming closer than
    /// `MIN_RADIUS` is ignored.
    pub fn zoom(&mut self, direction: f32) {
        if direction > 0.0 {
            self.r += ZOOM_STEP;
        } else if direction < 0.0 && self.r - ZOOM_STEP >= MIN_RADIUS {
            self.r -= ZOOM_STEP;
        } else {
            return;
        }

        self.recompute();
    }

    /// Resize the camera's viewport.
    pub fn set_viewport_size(
        &mut self,
        new_width: u32,
        new_height: u32,
    ) -> Result<(), InvalidCameraSize> {
        if new_width > 0 && new_height > 0 {
            self.aspect = new_width as f32 / new_height as f32;
            self.viewport_width = new_width as f32;
            self.viewport_height = new_height as f32;
            self.update_projection();
            Ok(())
        } else {
            Err(InvalidCameraSize(new_width, new_height))
        }
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
    }

    fn nudge_off_pole(&mut self) {
        if self.phi == FRAC_PI_2 {
            self.phi = FRAC_PI_2 - POLE_EPSILON;
        } else if self.phi == -FRAC_PI_2 {
            self.phi = -FRAC_PI_2 + POLE_EPSILON;
        }
    }

    /// Get the camera's view matrix, which transforms world space to view
    /// space.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Get the camera's perspective projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Get the camera's view projection matrix. The view projection matrix will
    /// transform points from world space to clip space.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Get the position of the camera in world space.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the point the camera orbits around.
    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn radius(&self) -> f32 {
        self.r
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Get the camera viewport width in pixels.
    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Get the camera viewport height in pixels.
    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera orbit radius must be larger than zero but was {0}")]
    InvalidRadius(f32),
    #[error("camera field of view must be between 0 and 180 degrees but was {0}")]
    InvalidFieldOfView(f32),
    #[error("camera clip planes must satisfy 0 < near < far but near was {near} and far was {far}")]
    InvalidClipPlanes { near: f32, far: f32 },
    #[error(transparent)]
    InvalidSize(#[from] InvalidCameraSize),
}

#[derive(Debug, Error)]
#[error("camera viewport width and height must be larger than zero but width was {} and height was {}", .0, .1)]
pub struct InvalidCameraSize(u32, u32);
