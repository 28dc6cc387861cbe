/// Fog of War Visibility Engine
///
/// 觀察者（revealer）投射視錐，決定每個隱藏物件本 tick 是否可見

pub mod comp;
pub mod vision;
pub mod fog;
pub mod config;
pub mod msg;
pub mod tick;

// Re-export commonly used types
pub use crate::comp::*;
pub use crate::vision::*;
pub use crate::fog::*;
pub use crate::msg::FogEvent;
pub use crate::config::{FogSetting, ManagerSetting, Validate, ValidationIssue};
pub use crate::tick::FogOfWarSystem;
