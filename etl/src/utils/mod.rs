pub mod glob;
pub mod paths;
