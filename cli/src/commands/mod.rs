pub mod list;
pub mod plan;
pub mod reset;
pub mod run;
pub mod status;
pub mod validate;
