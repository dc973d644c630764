pub mod asset;
pub mod clip;
pub mod evaluator;
pub mod loader;
pub mod mesh;
pub mod rig;
