mod egui_host;
mod frame;
mod input;
mod timing;

use crate::assets::TextureLoader;
use crate::config::{self, AppConfig};
use crate::objects::{
    build_ball, build_cage, build_lights, build_room, BallHandle, CageHandle, LightManager,
    ParamListener,
};
use crate::params::{Choice, ParamChange, SceneParams};
use crate::render::{OrbitControls, PerspectiveCamera, RenderContext};
use crate::scene::SceneGraph;
use crate::ui::{self, ControlPanel};
use egui_host::EguiHost;
use frame::{FrameClock, SceneTicker};
use input::{scroll_steps, InputState};
use timing::FrameTiming;

use glam::Vec3;
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const CAMERA_START: Vec3 = Vec3::new(1.0, 1.0, 10.0);
const CAMERA_FOV_DEGREES: f32 = 75.0;
const CAMERA_NEAR: f32 = 0.1;
const CAMERA_FAR: f32 = 100.0;
const ORBIT_MIN_DISTANCE: f32 = 3.0;
const ORBIT_MAX_DISTANCE: f32 = 15.0;
const ORBIT_MAX_POLAR_ANGLE: f32 = PI / 2.0;

/// Everything in the scene plus the state that drives it.
struct Stage {
    scene: SceneGraph,
    params: SceneParams,
    panel: ControlPanel,
    loader: TextureLoader,
    cage: CageHandle,
    ball: BallHandle,
    lights: LightManager,
    ticker: SceneTicker,
}

impl Stage {
    fn build(config: &AppConfig) -> Self {
        let params = config.params.clone();
        let mut scene = SceneGraph::new();
        let mut panel = ControlPanel::new("Options");
        panel.start_open(config.options_open);
        let mut loader = TextureLoader::new(config.assets_dir.clone());

        let room = build_room(&mut scene, &mut loader);
        let cage = build_cage(&mut scene, &mut loader, &mut panel, &params);
        let ball = build_ball(&mut scene, &mut loader, &mut panel, &params);
        let lights = build_lights(&mut scene, &mut panel, &params);
        let ticker = SceneTicker::new(ball.node());

        log::info!(
            "Built scene: {} nodes, {} textures queued from {}",
            scene.len(),
            loader.len(),
            loader.root().display()
        );
        log::debug!(
            "Room floor {:?}, walls {:?}, cage {:?}, ball {:?}, {} light {:?}, ambient {:?}",
            room.floor,
            room.walls,
            cage.node(),
            ball.node(),
            lights.kind().label(),
            lights.active(),
            lights.ambient()
        );

        Self {
            scene,
            params,
            panel,
            loader,
            cage,
            ball,
            lights,
            ticker,
        }
    }

    /// Store each change and fan it out to every object.
    fn apply_changes(&mut self, changes: Vec<ParamChange>) {
        for change in changes {
            let stored = self.params.apply(change);
            log::debug!("Parameter changed: {:?}", stored);
            let listeners: [&mut dyn ParamListener; 3] =
                [&mut self.cage, &mut self.ball, &mut self.lights];
            for listener in listeners {
                listener.on_param_change(&stored, &self.params, &mut self.scene);
            }
        }
    }
}

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    stage: Stage,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    input: InputState,
    clock: FrameClock,
    timing: FrameTiming,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let [width, height] = config.window_size;
        let mut camera = PerspectiveCamera::new(
            CAMERA_START,
            CAMERA_FOV_DEGREES,
            1.0,
            CAMERA_NEAR,
            CAMERA_FAR,
        );
        camera.set_viewport(width, height);
        let controls = OrbitControls::new(
            ORBIT_MIN_DISTANCE,
            ORBIT_MAX_DISTANCE,
            ORBIT_MAX_POLAR_ANGLE,
        );

        Self {
            stage: Stage::build(&config),
            timing: FrameTiming::new(config.window_title.clone(), Instant::now()),
            config,
            window: None,
            render: None,
            egui: None,
            camera,
            controls,
            input: InputState::default(),
            clock: FrameClock::new(),
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        self.camera.set_viewport(new_size.width, new_size.height);
        if let Some(render) = &mut self.render {
            render.resize(new_size, scale_factor);
        }
    }

    fn pointer_captured_by_ui(&self) -> bool {
        self.egui
            .as_ref()
            .is_some_and(|egui| egui.wants_pointer_input())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(render), Some(egui)) =
            (self.window.clone(), self.render.as_mut(), self.egui.as_mut())
        else {
            return;
        };
        let frame_start = Instant::now();
        let stage = &mut self.stage;

        let finished = stage.loader.poll();
        render.upload_textures(&mut stage.loader, &finished);
        if stage.loader.loading_mut().take_loaded_signal() {
            log::info!(
                "All textures loaded ({} failed)",
                stage.loader.loading().failed()
            );
        }

        let mut changes = Vec::new();
        let overlay = egui.run_ui(&window, |ctx| {
            changes = stage.panel.show(ctx, &stage.params);
            ui::loading_overlay(ctx, stage.loader.loading());
        });
        stage.apply_changes(changes);

        let t = self.clock.elapsed();
        stage
            .ticker
            .advance(&mut stage.scene, &mut self.controls, &mut self.camera, t);

        if let Err(err) = render.render(&stage.scene, &self.camera, overlay) {
            log::error!("Rendering failed: {}", err);
            event_loop.exit();
            return;
        }

        self.timing
            .update(&window, Instant::now(), frame_start.elapsed());
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        let render = match pollster::block_on(RenderContext::new(window.clone())) {
            Ok(render) => render,
            Err(err) => {
                log::error!("Failed to initialise renderer: {}", err);
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();
        self.camera.set_viewport(size.width, size.height);
        log::info!(
            "Window ready at {}x{} (scale {:.2}, scene target {}x{})",
            size.width,
            size.height,
            render.scale_factor(),
            render.render_size().width,
            render.render_size().height
        );

        self.egui = Some(EguiHost::new(&window));
        self.render = Some(render);
        self.clock = FrameClock::new();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (self.egui.as_mut(), self.window.as_ref()) {
            (Some(egui), Some(window)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                self.handle_resize(new_size, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.window.as_ref().map(|window| window.inner_size()) {
                    self.handle_resize(size, scale_factor);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((dx, dy)) = self.input.handle_cursor(position.x, position.y) {
                    let height = self
                        .render
                        .as_ref()
                        .map(|render| render.surface_size().height)
                        .unwrap_or(1);
                    self.controls.rotate_by_pixels(dx, dy, height as f32);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                if pressed && (consumed || self.pointer_captured_by_ui()) {
                    return;
                }
                self.input.handle_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed && !self.pointer_captured_by_ui() {
                    self.controls.zoom(scroll_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("cagebox");
    log::info!("   Drag to orbit, scroll to zoom, ESC or close window to exit");

    let config = config::load_from_env();
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).expect("Event loop error");

    log::info!("Goodbye");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Axis, BoxMaterial, LightKind};
    use crate::scene::{Light, Material, SceneNode};

    fn stage(name: &str) -> Stage {
        let config = AppConfig {
            assets_dir: std::env::temp_dir()
                .join(format!("cagebox_stage_{}_{}", name, std::process::id())),
            ..AppConfig::default()
        };
        Stage::build(&config)
    }

    fn ball_tint(stage: &Stage) -> [f32; 3] {
        match stage
            .scene
            .get(stage.ball.node())
            .and_then(SceneNode::as_mesh)
            .map(|mesh| &mesh.material)
        {
            Some(Material::Matcap(material)) => material.color,
            other => panic!("ball has no matcap material: {other:?}"),
        }
    }

    fn active_light(stage: &Stage) -> &SceneNode {
        stage.scene.get(stage.lights.active()).unwrap()
    }

    #[test]
    fn color_change_reaches_light_and_ball() {
        let mut stage = stage("color");
        stage.apply_changes(vec![ParamChange::Color([0.9, 0.1, 0.3])]);

        assert_eq!(stage.params.color, [0.9, 0.1, 0.3]);
        assert_eq!(ball_tint(&stage), [0.9, 0.1, 0.3]);
        let light = active_light(&stage).as_light().unwrap();
        assert_eq!(light.color(), [0.9, 0.1, 0.3]);
    }

    #[test]
    fn changes_are_stored_before_fan_out() {
        let mut stage = stage("fan_out");
        let cage_material = |stage: &Stage| {
            stage
                .scene
                .get(stage.cage.node())
                .and_then(SceneNode::as_mesh)
                .map(|mesh| mesh.material.clone())
        };
        let before = cage_material(&stage);

        stage.apply_changes(vec![
            ParamChange::Material(BoxMaterial::Wood),
            ParamChange::LightAxis(Axis::X, 42.0),
            ParamChange::LightAxis(Axis::Z, 2.0),
        ]);

        assert_eq!(stage.params.material, BoxMaterial::Wood);
        assert!(before.is_some());
        assert_ne!(cage_material(&stage), before);
        assert_eq!(active_light(&stage).transform.position, Vec3::new(10.0, 5.0, 2.0));
    }

    #[test]
    fn light_swap_goes_home_with_current_color() {
        let mut stage = stage("swap");
        stage.apply_changes(vec![
            ParamChange::Color([0.0, 1.0, 0.0]),
            ParamChange::LightAxis(Axis::Y, 12.0),
            ParamChange::Light(LightKind::Point),
        ]);

        assert_eq!(stage.lights.kind(), LightKind::Point);
        let node = active_light(&stage);
        assert_eq!(node.transform.position, stage.params.light_position());
        assert_eq!(node.transform.position, Vec3::new(5.0, 5.0, 5.0));
        assert!(matches!(
            node.as_light(),
            Some(Light::Point { color, cast_shadow: true, .. }) if *color == [0.0, 1.0, 0.0]
        ));
        assert_eq!(ball_tint(&stage), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_change_list_leaves_scene_untouched() {
        let mut stage = stage("idle");
        let before: Vec<SceneNode> = stage.scene.iter().map(|(_, node)| node.clone()).collect();
        stage.apply_changes(Vec::new());
        let after: Vec<SceneNode> = stage.scene.iter().map(|(_, node)| node.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(stage.params, SceneParams::default());
    }
}
