pub mod validation;
pub mod fog_config;

pub use self::{
    validation::{Validate, ValidationIssue},
    fog_config::*,
};
