//! Custom shader widget for the cube viewport.
//!
//! The application hands the widget a snapshot of cubie instances each frame;
//! the widget owns the orbit camera state and turns mouse drags and wheel
//! events into damped camera motion, requesting frames until it settles.

use iced::widget::shader::{self, wgpu};
use iced::{Point, Rectangle, Size, event, mouse, window};
use nalgebra::{Point3, Vector3};

use crate::Message;
use crate::camera::{Camera, CameraController, Projection};
use crate::renderer::{InstanceRaw, Renderer};

/// Scene snapshot handed to the GPU for one frame.
#[derive(Debug, Clone)]
pub(crate) struct CubePrimitive {
    pub(crate) instances: Vec<InstanceRaw>,
    pub(crate) camera: Camera,
    pub(crate) projection: Projection,
}

impl shader::Primitive for CubePrimitive {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        storage: &mut shader::Storage,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        let scale = viewport.scale_factor() as f32;
        let physical_bounds = Rectangle {
            x: bounds.x * scale,
            y: bounds.y * scale,
            width: bounds.width * scale,
            height: bounds.height * scale,
        };

        if !storage.has::<Renderer>() {
            log::debug!("creating cube renderer for {format:?}");
            storage.store(Renderer::new(
                device,
                format,
                physical_bounds,
                viewport.physical_size(),
            ));
        }
        let Some(renderer) = storage.get_mut::<Renderer>() else {
            return;
        };
        renderer.resize(device, physical_bounds, viewport.physical_size());
        renderer.update_instances(device, queue, &self.instances);
        renderer.update_camera(queue, &self.camera, &self.projection);
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        storage: &shader::Storage,
        target: &wgpu::TextureView,
        _clip_bounds: &Rectangle<u32>,
    ) {
        if let Some(renderer) = storage.get::<Renderer>() {
            renderer.render(encoder, target);
        }
    }
}

/// Internal state managed by the shader widget
pub(crate) struct CubeShaderState {
    camera: Camera,
    camera_controller: CameraController,
    projection: Projection,
    mouse_pressed: bool,
    last_mouse_pos: Option<Point>,
}

/// The shader program drawing the current cube instances.
pub(crate) struct CubeShaderProgram {
    instances: Vec<InstanceRaw>,
}

impl CubeShaderProgram {
    pub(crate) fn new(instances: Vec<InstanceRaw>) -> Self {
        Self { instances }
    }
}

impl shader::Program<Message> for CubeShaderProgram {
    type State = CubeShaderState;
    type Primitive = CubePrimitive;

    fn update(
        &self,
        state: &mut Self::State,
        event: shader::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
        shell: &mut iced::advanced::Shell<'_, Message>,
    ) -> (event::Status, Option<Message>) {
        let status = match event {
            shader::Event::Mouse(mouse_event) => {
                handle_mouse_event(state, mouse_event, bounds, cursor)
            }
            shader::Event::RedrawRequested(_) => {
                if state.camera_controller.step() {
                    state.camera_controller.update_camera(&mut state.camera);
                    shell.request_redraw(window::RedrawRequest::NextFrame);
                }
                event::Status::Ignored
            }
            _ => event::Status::Ignored,
        };

        // Input only moves the orbit target; frames ease the camera after it.
        if status == event::Status::Captured {
            shell.request_redraw(window::RedrawRequest::NextFrame);
        }

        (status, None)
    }

    fn draw(
        &self,
        state: &Self::State,
        _cursor: mouse::Cursor,
        bounds: Rectangle,
    ) -> Self::Primitive {
        let mut projection = state.projection;
        projection.resize(bounds.width, bounds.height);

        CubePrimitive {
            instances: self.instances.clone(),
            camera: state.camera.clone(),
            projection,
        }
    }
}

/// Left-drag orbits, the wheel zooms; both only inside the viewport.
fn handle_mouse_event(
    state: &mut CubeShaderState,
    mouse_event: mouse::Event,
    bounds: Rectangle,
    cursor: mouse::Cursor,
) -> event::Status {
    match mouse_event {
        mouse::Event::CursorMoved { .. } => {
            let Some(position) = cursor.position_in(bounds) else {
                state.last_mouse_pos = None;
                return event::Status::Ignored;
            };
            let dragged = match state.last_mouse_pos {
                Some(last_pos) if state.mouse_pressed => {
                    state
                        .camera_controller
                        .process_mouse_motion(position.x - last_pos.x, position.y - last_pos.y);
                    true
                }
                _ => false,
            };
            state.last_mouse_pos = Some(position);
            if dragged {
                return event::Status::Captured;
            }
        }
        mouse::Event::ButtonPressed(button) => {
            if CameraController::is_orbit_button(button) && cursor.position_in(bounds).is_some() {
                state.mouse_pressed = true;
                return event::Status::Captured;
            }
        }
        mouse::Event::ButtonReleased(button) => {
            if CameraController::is_orbit_button(button) && state.mouse_pressed {
                state.mouse_pressed = false;
                return event::Status::Captured;
            }
        }
        mouse::Event::WheelScrolled { delta } => {
            if cursor.position_in(bounds).is_some() {
                let scroll_delta = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y,
                    mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
                };
                state.camera_controller.process_scroll(scroll_delta);
                return event::Status::Captured;
            }
        }
        mouse::Event::CursorEntered | mouse::Event::CursorLeft => {}
    }

    event::Status::Ignored
}

impl Default for CubeShaderState {
    fn default() -> Self {
        let eye = Point3::new(5.0, 5.0, 7.0);
        let mut camera = Camera {
            eye,
            target: Point3::origin(),
            up: Vector3::y(),
        };

        let camera_controller = CameraController::looking_from(eye);
        camera_controller.update_camera(&mut camera);

        let initial = Size::new(800.0, 600.0);
        let projection = Projection {
            aspect: initial.width / initial.height,
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
        };

        Self {
            camera,
            camera_controller,
            projection,
            mouse_pressed: false,
            last_mouse_pos: None,
        }
    }
}
