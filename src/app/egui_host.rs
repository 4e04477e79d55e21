use winit::event::WindowEvent;
use winit::window::Window;

use crate::render::OverlayFrame;

pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Self {
            context,
            winit_state,
        }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// True while the pointer is over (or dragging) an egui widget.
    pub fn wants_pointer_input(&self) -> bool {
        self.context.wants_pointer_input() || self.context.is_pointer_over_area()
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> OverlayFrame
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = self.context.pixels_per_point();
        let primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        OverlayFrame {
            primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }
}
