pub mod capture_provider;
pub mod encoder;
pub mod renderer;
