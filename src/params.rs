//! UI-adjustable scene parameters.
//!
//! `SceneParams` is the single source of truth for every control on the
//! options panel. Widgets read from it, builders read from it, and every
//! mutation goes through [`SceneParams::apply`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An enumerated parameter with a fixed list of legal values.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxMaterial {
    Wood,
    Iron,
    Bricks,
}

impl Choice for BoxMaterial {
    const ALL: &'static [Self] = &[Self::Wood, Self::Iron, Self::Bricks];

    fn label(self) -> &'static str {
        match self {
            Self::Wood => "Wood",
            Self::Iron => "Iron",
            Self::Bricks => "Bricks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CageStyle {
    #[serde(rename = "ALS")]
    Als,
    Wire,
    Wire2,
    Cross,
    Bars,
}

impl Choice for CageStyle {
    const ALL: &'static [Self] = &[Self::Als, Self::Wire, Self::Wire2, Self::Cross, Self::Bars];

    fn label(self) -> &'static str {
        match self {
            Self::Als => "ALS",
            Self::Wire => "Wire",
            Self::Wire2 => "Wire2",
            Self::Cross => "Cross",
            Self::Bars => "Bars",
        }
    }
}

/// Ball skin, numbered '1'..'8' on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatcapStyle {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
}

impl Choice for MatcapStyle {
    const ALL: &'static [Self] = &[
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Directional,
    Hemisphere,
    Point,
}

impl LightKind {
    pub fn casts_shadow(self) -> bool {
        !matches!(self, Self::Hemisphere)
    }
}

impl Choice for LightKind {
    const ALL: &'static [Self] = &[Self::Directional, Self::Hemisphere, Self::Point];

    fn label(self) -> &'static str {
        match self {
            Self::Directional => "directional",
            Self::Hemisphere => "hemisphere",
            Self::Point => "point",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    pub fn range(self) -> AxisRange {
        match self {
            Axis::X => AxisRange::new(-10.0, 10.0, 0.1),
            Axis::Y => AxisRange::new(1.5, 15.0, 0.1),
            Axis::Z => AxisRange::new(0.0, 10.0, 0.1),
        }
    }
}

/// Bounds and step of a continuous slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
    pub step: f64,
}

impl AxisRange {
    pub const fn new(min: f32, max: f32, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Clamp into range and snap to the nearest step counted from `min`.
    ///
    /// Uses the same f64 arithmetic as `egui::Slider`, so a stored value is
    /// a fixed point of the slider and an idle slider never reports a change.
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let (min, max) = (self.min as f64, self.max as f64);
        let value = (value as f64).clamp(min, max);
        (min + ((value - min) / self.step).round() * self.step) as f32
    }
}

/// Light position every light variant is installed at.
pub const LIGHT_HOME_POSITION: [f32; 3] = [5.0, 5.0, 5.0];

/// One stored parameter update, as emitted by the options panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Material(BoxMaterial),
    Cage(CageStyle),
    Matcap(MatcapStyle),
    Light(LightKind),
    Color([f32; 3]),
    LightAxis(Axis, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneParams {
    pub material: BoxMaterial,
    pub cage: CageStyle,
    pub matcap: MatcapStyle,
    pub light: LightKind,
    pub color: [f32; 3],
    #[serde(rename = "lightX")]
    pub light_x: f32,
    #[serde(rename = "lightY")]
    pub light_y: f32,
    #[serde(rename = "lightZ")]
    pub light_z: f32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            material: BoxMaterial::Iron,
            cage: CageStyle::Als,
            matcap: MatcapStyle::Three,
            light: LightKind::Directional,
            color: [1.0, 1.0, 1.0],
            light_x: LIGHT_HOME_POSITION[0],
            light_y: LIGHT_HOME_POSITION[1],
            light_z: LIGHT_HOME_POSITION[2],
        }
    }
}

impl SceneParams {
    /// Store a change and return it as it was stored (clamped, snapped).
    pub fn apply(&mut self, change: ParamChange) -> ParamChange {
        match change {
            ParamChange::Material(material) => {
                self.material = material;
                change
            }
            ParamChange::Cage(cage) => {
                self.cage = cage;
                change
            }
            ParamChange::Matcap(matcap) => {
                self.matcap = matcap;
                change
            }
            ParamChange::Light(kind) => {
                // A fresh light is always installed at the home position.
                self.light = kind;
                self.light_x = LIGHT_HOME_POSITION[0];
                self.light_y = LIGHT_HOME_POSITION[1];
                self.light_z = LIGHT_HOME_POSITION[2];
                change
            }
            ParamChange::Color(color) => {
                self.color = clamp_color(color);
                ParamChange::Color(self.color)
            }
            ParamChange::LightAxis(axis, value) => {
                let value = axis.range().clamp(value);
                *self.axis_mut(axis) = value;
                ParamChange::LightAxis(axis, value)
            }
        }
    }

    pub fn axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.light_x,
            Axis::Y => self.light_y,
            Axis::Z => self.light_z,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut f32 {
        match axis {
            Axis::X => &mut self.light_x,
            Axis::Y => &mut self.light_y,
            Axis::Z => &mut self.light_z,
        }
    }

    pub fn light_position(&self) -> Vec3 {
        Vec3::new(self.light_x, self.light_y, self.light_z)
    }

    /// Bring externally supplied values back inside their legal ranges.
    pub fn sanitized(mut self) -> Self {
        self.color = clamp_color(self.color);
        for axis in Axis::ALL {
            let value = axis.range().clamp(self.axis(axis));
            *self.axis_mut(axis) = value;
        }
        self
    }

    /// Changes that turn `before` into `after`, in panel order.
    pub fn diff(before: &SceneParams, after: &SceneParams) -> Vec<ParamChange> {
        let mut changes = Vec::new();
        if before.material != after.material {
            changes.push(ParamChange::Material(after.material));
        }
        if before.cage != after.cage {
            changes.push(ParamChange::Cage(after.cage));
        }
        if before.matcap != after.matcap {
            changes.push(ParamChange::Matcap(after.matcap));
        }
        if before.light != after.light {
            changes.push(ParamChange::Light(after.light));
        }
        if before.color != after.color {
            changes.push(ParamChange::Color(after.color));
        }
        for axis in Axis::ALL {
            if before.axis(axis) != after.axis(axis) {
                changes.push(ParamChange::LightAxis(axis, after.axis(axis)));
            }
        }
        changes
    }
}

fn clamp_color(color: [f32; 3]) -> [f32; 3] {
    color.map(|channel| {
        if channel.is_finite() {
            channel.clamp(0.0, 1.0)
        } else {
            1.0
        }
    })
}
