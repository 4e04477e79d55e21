//! Scene object builders. Each builder adds its nodes to the scene, registers
//! its controls on the options panel and returns a handle that keeps the
//! nodes in sync with later parameter changes.

pub mod ball;
pub mod cage;
pub mod lights;
pub mod room;

use crate::params::{ParamChange, SceneParams};
use crate::scene::SceneGraph;

pub use ball::{build_ball, BallHandle};
pub use cage::{build_cage, CageHandle};
pub use lights::{build_lights, LightManager};
pub use room::build_room;

/// Reacts to a stored parameter change by mutating existing scene nodes.
pub trait ParamListener {
    /// `change` has already been applied to `params`.
    fn on_param_change(&mut self, change: &ParamChange, params: &SceneParams, scene: &mut SceneGraph);
}
