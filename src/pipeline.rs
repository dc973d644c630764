pub mod baker;
pub mod cancel;
pub mod device;
pub mod kernel;
pub mod layout;
pub mod packer;
pub mod sampler;
