pub mod hidden;
pub mod revealer;
pub mod perception_curve;
pub mod distance_curve;
pub mod profile;
pub mod fog_comp;

pub use self::{
    hidden::*,
    revealer::*,
    perception_curve::*,
    distance_curve::*,
    profile::*,
    fog_comp::*,
};
