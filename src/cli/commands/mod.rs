//! Command implementations

pub mod add;
pub mod completions;
pub mod new;
pub mod rm;
pub mod run;
pub mod show;
pub mod validate;
