//! The model viewer: one window, one model, spinning in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::camera::Camera;
use crate::geometry::GeometryError;
use crate::gpu::{GpuContext, GpuError};
use crate::lightmap_pass::{LightmapDraw, LightmapPass, Material};
use crate::mesh::Mesh;
use crate::scene::ModelScene;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("failed to load model: {0}")]
    Geometry(#[from] GeometryError),
}

/// Viewer settings.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Radians per second about each part's Y axis.
    pub spin_speed: f32,
    /// Initial translation of the model.
    pub model_offset: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub clear_color: wgpu::Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Lightmap Viewer".to_string(),
            width: 1024,
            height: 768,
            spin_speed: 0.2 * std::f32::consts::PI,
            model_offset: Vec3::new(0.0, -400.0, -1000.0),
            fov_degrees: 45.0,
            near: 1.0,
            far: 10000.0,
            clear_color: wgpu::Color {
                r: 0.05,
                g: 0.05,
                b: 0.08,
                a: 1.0,
            },
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn spin_speed(mut self, radians_per_second: f32) -> Self {
        self.spin_speed = radians_per_second;
        self
    }

    pub fn model_offset(mut self, offset: Vec3) -> Self {
        self.model_offset = offset;
        self
    }

    pub fn fov(mut self, degrees: f32) -> Self {
        self.fov_degrees = degrees;
        self
    }

    pub fn clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn camera(&self) -> Camera {
        Camera::new()
            .with_fov(self.fov_degrees)
            .with_clip(self.near, self.far)
    }
}

/// Opens a window and shows the model at `path` until it is closed.
pub fn run_viewer(config: ViewerConfig, path: impl AsRef<Path>) -> Result<(), ViewerError> {
    let path = path.as_ref().to_path_buf();

    // Fail before opening a window if the model is unreadable.
    let scene = ModelScene::load(&path, config.model_offset)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    log::info!("viewing {:?}", path);

    let mut app = ViewerApp {
        config,
        path,
        pending_scene: Some(scene),
        running: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct ViewerApp {
    config: ViewerConfig,
    path: PathBuf,
    pending_scene: Option<ModelScene>,
    running: Option<Running>,
    error: Option<ViewerError>,
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    pass: LightmapPass,
    camera: Camera,
    scene: ModelScene,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    spin_speed: f32,
    clear_color: wgpu::Color,
    last_frame: Instant,
}

impl ViewerApp {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, ViewerError> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let gpu = GpuContext::new(window.clone())?;
        let pass = LightmapPass::new(&gpu);

        let scene = match self.pending_scene.take() {
            Some(scene) => scene,
            None => ModelScene::load(&self.path, self.config.model_offset)?,
        };

        let meshes = scene.parts.iter().map(|p| p.geometry.upload(&gpu)).collect();
        let materials = scene
            .parts
            .iter()
            .map(|p| {
                log::debug!("{:?} material: {:?}", p.material.kind, p.material.diffuse);
                let (diffuse, lightmap) = p.material.load(&gpu);
                pass.create_material(&gpu, diffuse.as_ref(), lightmap.as_ref())
            })
            .collect();

        Ok(Running {
            window,
            gpu,
            pass,
            camera: self.config.camera(),
            scene,
            meshes,
            materials,
            spin_speed: self.config.spin_speed,
            clear_color: self.config.clear_color,
            last_frame: Instant::now(),
        })
    }
}

impl Running {
    fn frame(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.scene.update(dt, self.spin_speed);

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                return;
            }
            Err(e) => {
                log::error!("failed to get surface texture: {}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws: Vec<LightmapDraw> = self
            .scene
            .parts
            .iter()
            .zip(&self.meshes)
            .zip(&self.materials)
            .map(|((part, mesh), material)| LightmapDraw {
                mesh,
                transform: part.transform,
                material,
            })
            .collect();

        self.pass.prepare(&self.gpu, &self.camera, &draws);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Lightmap Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lightmap Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.pass.render(&mut render_pass, &draws);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                running.frame();
                running.window.request_redraw();
            }
            _ => (),
        }
    }
}
