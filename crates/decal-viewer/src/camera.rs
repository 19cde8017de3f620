use glam::{Mat4, Vec3};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub const FOV_Y_DEG: f32 = 60.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;

/// Free-flying perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Radians around +Y; zero looks down -Z.
    pub yaw: f32,
    /// Radians above the horizon.
    pub pitch: f32,
    pub aspect: f32,
    pub proj: Mat4,
}

impl Camera {
    pub fn new(position: Vec3, forward: Vec3, aspect: f32) -> Self {
        let forward = forward.normalize_or_zero();
        let mut camera = Self {
            position,
            yaw: (-forward.x).atan2(-forward.z),
            pitch: forward.y.clamp(-1.0, 1.0).asin(),
            aspect,
            proj: Mat4::IDENTITY,
        };
        camera.set_aspect(aspect);
        camera
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(1e-3);
        self.proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), self.aspect, NEAR, FAR);
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize_or_zero()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view()
    }
}

#[derive(Default)]
struct MoveKeys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

/// WASD flight plus mouse look while the right button or Space is held.
pub struct CameraController {
    keys: MoveKeys,
    look_button: bool,
    look_key: bool,
    last_mouse: Option<(f64, f64)>,
    pub speed: f32,
    pub sensitivity: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            keys: MoveKeys::default(),
            look_button: false,
            look_key: false,
            last_mouse: None,
            speed: 50.0,
            sensitivity: 0.003,
        }
    }

    pub fn is_looking(&self) -> bool {
        self.look_button || self.look_key
    }

    /// Updates key and mouse state; returns whether the event was consumed.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &mut Camera) -> bool {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.look_button = *state == ElementState::Pressed;
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                let PhysicalKey::Code(code) = event.physical_key else {
                    return false;
                };
                match code {
                    KeyCode::KeyW => self.keys.forward = pressed,
                    KeyCode::KeyS => self.keys.back = pressed,
                    KeyCode::KeyA => self.keys.left = pressed,
                    KeyCode::KeyD => self.keys.right = pressed,
                    KeyCode::KeyE => self.keys.up = pressed,
                    KeyCode::KeyQ => self.keys.down = pressed,
                    KeyCode::Space => self.look_key = pressed,
                    _ => return false,
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let xy = (position.x, position.y);
                if let (Some(last), true) = (self.last_mouse, self.is_looking()) {
                    let dx = (xy.0 - last.0) as f32 * self.sensitivity;
                    let dy = (xy.1 - last.1) as f32 * self.sensitivity;
                    camera.yaw -= dx;
                    camera.pitch = (camera.pitch - dy).clamp(-1.55, 1.55);
                }
                self.last_mouse = Some(xy);
                false
            }
            _ => false,
        }
    }

    pub fn last_mouse(&self) -> Option<(f64, f64)> {
        self.last_mouse
    }

    /// Integrates held movement keys over `dt` seconds.
    pub fn update(&self, camera: &mut Camera, dt: f32) {
        let f = camera.forward();
        let r = camera.right();
        let mut dir = Vec3::ZERO;
        if self.keys.forward {
            dir += f;
        }
        if self.keys.back {
            dir -= f;
        }
        if self.keys.right {
            dir += r;
        }
        if self.keys.left {
            dir -= r;
        }
        if self.keys.up {
            dir += Vec3::Y;
        }
        if self.keys.down {
            dir -= Vec3::Y;
        }
        camera.position += dir.normalize_or_zero() * self.speed * dt;
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_forward_is_preserved() {
        let cam = Camera::new(Vec3::new(150.0, 20.0, 0.0), -Vec3::X, 16.0 / 9.0);
        assert!((cam.forward() - -Vec3::X).length() < 1e-5);
        assert!((cam.right() - -Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn view_proj_centres_the_look_target() {
        let cam = Camera::new(Vec3::new(150.0, 20.0, 0.0), -Vec3::X, 1.0);
        let clip = cam.view_proj() * glam::Vec4::new(0.0, 20.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-4);
        assert!((clip.y / clip.w).abs() < 1e-4);
    }
}
