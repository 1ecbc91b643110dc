use iced::mouse;
use nalgebra::{Matrix4, Point3, Vector3};

use crate::math::orbit_angles;

const MOUSE_SENSITIVITY: f32 = 0.5;
const ZOOM_SENSITIVITY: f32 = 1.0;
const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 20.0;
const MAX_PITCH: f32 = 89.0;
/// Fraction of the remaining orbit covered per frame
const DAMPING_FACTOR: f32 = 0.05;
const SETTLE_EPSILON: f32 = 1e-3;

/// Maps nalgebra's OpenGL clip space (z in -1..1) to wgpu's (z in 0..1).
#[rustfmt::skip]
const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

#[derive(Clone, Debug)]
pub(crate) struct Camera {
    pub(crate) eye: Point3<f32>,
    pub(crate) target: Point3<f32>,
    pub(crate) up: Vector3<f32>,
}

impl Camera {
    pub(crate) fn build_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }
}

/// Orbits the camera around the origin: drag to rotate, scroll to zoom.
///
/// Input moves the target orbit; [`CameraController::step`] eases the current
/// orbit toward it once per frame.
#[derive(Debug)]
pub(crate) struct CameraController {
    pub(crate) distance: f32,
    /// Degrees
    pub(crate) yaw: f32,
    /// Degrees
    pub(crate) pitch: f32,
    target_distance: f32,
    target_yaw: f32,
    target_pitch: f32,
}

impl CameraController {
    /// Starts the orbit at `eye`, looking at the origin.
    pub(crate) fn looking_from(eye: Point3<f32>) -> Self {
        let (yaw, pitch, distance) = orbit_angles(&eye.coords);
        let distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
        let pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
        Self {
            distance,
            yaw,
            pitch,
            target_distance: distance,
            target_yaw: yaw,
            target_pitch: pitch,
        }
    }

    pub(crate) fn update_camera(&self, camera: &mut Camera) {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();

        let x = self.distance * pitch_rad.cos() * yaw_rad.sin();
        let y = self.distance * pitch_rad.sin();
        let z = self.distance * pitch_rad.cos() * yaw_rad.cos();

        camera.eye = Point3::new(x, y, z);
        camera.target = Point3::origin();
        camera.up = Vector3::y();
    }

    /// Whether a button drives the orbit.
    pub(crate) fn is_orbit_button(button: mouse::Button) -> bool {
        button == mouse::Button::Left
    }

    pub(crate) fn process_mouse_motion(&mut self, delta_x: f32, delta_y: f32) {
        self.target_yaw -= delta_x * MOUSE_SENSITIVITY;
        self.target_pitch += delta_y * MOUSE_SENSITIVITY;

        self.target_pitch = self.target_pitch.clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub(crate) fn process_scroll(&mut self, delta: f32) {
        self.target_distance -= delta * ZOOM_SENSITIVITY;
        self.target_distance = self.target_distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Moves the orbit one damping step toward its target.
    ///
    /// Returns `true` while the camera is still moving.
    pub(crate) fn step(&mut self) -> bool {
        let mut moving = false;
        for (current, target) in [
            (&mut self.yaw, self.target_yaw),
            (&mut self.pitch, self.target_pitch),
            (&mut self.distance, self.target_distance),
        ] {
            let remaining = target - *current;
            if remaining.abs() < SETTLE_EPSILON {
                *current = target;
            } else {
                *current += remaining * DAMPING_FACTOR;
                moving = true;
            }
        }
        moving
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Projection {
    pub(crate) aspect: f32,
    /// Vertical field of view, degrees
    pub(crate) fovy: f32,
    pub(crate) znear: f32,
    pub(crate) zfar: f32,
}

impl Projection {
    pub(crate) fn build_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX
            * Matrix4::new_perspective(self.aspect, self.fovy.to_radians(), self.znear, self.zfar)
    }

    /// Follows the widget's bounds; degenerate sizes keep the last aspect.
    pub(crate) fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CameraUniform {
    pub(crate) view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub(crate) fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub(crate) fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.build_projection_matrix() * camera.build_view_matrix()).into();
    }
}
