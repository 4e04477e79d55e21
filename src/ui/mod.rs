//! Options panel: a retained list of controls that builders register, drawn
//! with egui every frame.

use crate::assets::LoadingManager;
use crate::params::{Axis, Choice, ParamChange, SceneParams};

/// Which `SceneParams` field a control edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Material,
    Cage,
    Matcap,
    Light,
    Color,
    LightAxis(Axis),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub label: &'static str,
    pub binding: Binding,
}

/// Controls drawn together, optionally under a collapsible folder.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlGroup {
    pub folder: Option<&'static str>,
    pub controls: Vec<Control>,
}

impl ControlGroup {
    pub fn add(&mut self, label: &'static str, binding: Binding) -> &mut Self {
        self.controls.push(Control { label, binding });
        self
    }
}

pub struct ControlPanel {
    title: String,
    start_open: bool,
    groups: Vec<ControlGroup>,
}

impl ControlPanel {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            start_open: false,
            groups: Vec::new(),
        }
    }

    /// Whether the window starts expanded. Collapsed unless set.
    pub fn start_open(&mut self, open: bool) -> &mut Self {
        self.start_open = open;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Register a top-level control.
    pub fn add(&mut self, label: &'static str, binding: Binding) -> &mut Self {
        match self.groups.last_mut() {
            Some(group) if group.folder.is_none() => {
                group.add(label, binding);
            }
            _ => {
                self.groups.push(ControlGroup {
                    folder: None,
                    controls: vec![Control { label, binding }],
                });
            }
        }
        self
    }

    /// Named folder, created on first use.
    pub fn folder(&mut self, name: &'static str) -> &mut ControlGroup {
        let index = match self
            .groups
            .iter()
            .position(|group| group.folder == Some(name))
        {
            Some(index) => index,
            None => {
                self.groups.push(ControlGroup {
                    folder: Some(name),
                    controls: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    #[cfg(test)]
    pub fn groups(&self) -> &[ControlGroup] {
        &self.groups
    }

    #[cfg(test)]
    pub fn find(&self, label: &str) -> Option<&Control> {
        self.groups
            .iter()
            .flat_map(|group| group.controls.iter())
            .find(|control| control.label == label)
    }

    /// Draw the panel and return the edits made this
    /// frame, in panel order. Nothing is applied to `params` here.
    pub fn show(&self, ctx: &egui::Context, params: &SceneParams) -> Vec<ParamChange> {
        let mut draft = params.clone();
        egui::Window::new(self.title())
            .default_open(self.start_open)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-8.0, 8.0))
            .show(ctx, |ui| {
                for group in &self.groups {
                    match group.folder {
                        Some(folder) => {
                            egui::CollapsingHeader::new(folder)
                                .default_open(true)
                                .show(ui, |ui| draw_controls(ui, &group.controls, &mut draft));
                        }
                        None => draw_controls(ui, &group.controls, &mut draft),
                    }
                }
            });
        SceneParams::diff(params, &draft)
    }
}

fn draw_controls(ui: &mut egui::Ui, controls: &[Control], draft: &mut SceneParams) {
    for control in controls {
        match control.binding {
            Binding::Material => choice_combo(ui, control.label, &mut draft.material),
            Binding::Cage => choice_combo(ui, control.label, &mut draft.cage),
            Binding::Matcap => choice_combo(ui, control.label, &mut draft.matcap),
            Binding::Light => choice_combo(ui, control.label, &mut draft.light),
            Binding::Color => {
                ui.horizontal(|ui| {
                    let mut color = draft.color;
                    if ui.color_edit_button_rgb(&mut color).changed() {
                        draft.color = color;
                    }
                    ui.label(control.label);
                });
            }
            Binding::LightAxis(axis) => {
                let range = axis.range();
                let mut value = draft.axis(axis);
                let response = ui.add(
                    egui::Slider::new(&mut value, range.min..=range.max)
                        .step_by(range.step)
                        .text(control.label),
                );
                if response.changed() {
                    *draft.axis_mut(axis) = value;
                }
            }
        }
    }
}

fn choice_combo<K: Choice>(ui: &mut egui::Ui, label: &str, value: &mut K) {
    egui::ComboBox::from_label(label)
        .selected_text(value.label())
        .show_ui(ui, |ui| {
            for option in K::ALL {
                ui.selectable_value(value, *option, option.label());
            }
        });
}

/// Centered spinner shown until every queued texture has finished.
pub fn loading_overlay(ctx: &egui::Context, loading: &LoadingManager) {
    if loading.is_loaded() {
        return;
    }
    let (done, total) = loading.progress();
    egui::Area::new(egui::Id::new("loading_overlay"))
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .interactable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new().size(24.0));
                ui.label(format!("Loading textures {done}/{total}"));
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_panel() -> ControlPanel {
        let mut panel = ControlPanel::new("Options");
        panel.add("Material", Binding::Material);
        panel.add("Cage Style", Binding::Cage);
        panel
            .folder("Light Position")
            .add("X", Binding::LightAxis(Axis::X))
            .add("Y", Binding::LightAxis(Axis::Y));
        panel.add("Ball Style", Binding::Matcap);
        panel
            .folder("Light Position")
            .add("Z", Binding::LightAxis(Axis::Z));
        panel
    }

    #[test]
    fn folders_collect_controls_registered_later() {
        let panel = sample_panel();
        let groups = panel.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].controls.len(), 2);
        assert_eq!(groups[1].folder, Some("Light Position"));
        assert_eq!(
            groups[1]
                .controls
                .iter()
                .map(|control| control.label)
                .collect::<Vec<_>>(),
            vec!["X", "Y", "Z"]
        );
        assert_eq!(groups[2].controls[0].binding, Binding::Matcap);
    }

    #[test]
    fn find_looks_inside_folders() {
        let panel = sample_panel();
        assert_eq!(
            panel.find("Z").map(|control| control.binding),
            Some(Binding::LightAxis(Axis::Z))
        );
        assert!(panel.find("Light color").is_none());
    }

    #[test]
    fn untouched_panel_emits_no_changes() {
        let panel = sample_panel();
        let params = SceneParams::default();
        let ctx = egui::Context::default();
        let mut emitted = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            emitted = panel.show(ctx, &params);
            loading_overlay(ctx, &LoadingManager::default());
        });
        assert!(emitted.is_empty());
        assert_eq!(panel.title(), "Options");
    }

    #[test]
    fn open_panel_settles_on_stored_slider_values() {
        let mut panel = sample_panel();
        panel.add("Light color", Binding::Color).start_open(true);
        let mut params = SceneParams::default();
        params.apply(ParamChange::LightAxis(Axis::X, -9.9));
        params.apply(ParamChange::LightAxis(Axis::Y, 1.7));
        params.apply(ParamChange::Color([0.2, 0.4, 0.6]));

        let ctx = egui::Context::default();
        for frame in 0..3 {
            let mut emitted = Vec::new();
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                emitted = panel.show(ctx, &params);
            });
            assert!(emitted.is_empty(), "frame {frame}: {emitted:?}");
        }
        assert_eq!(params.light_x, -9.9);
    }
}
