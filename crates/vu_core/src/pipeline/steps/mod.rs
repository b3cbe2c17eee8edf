//! The pipeline stages.

mod enhance;
mod extract;
mod interpolate;
mod mux;

pub use enhance::EnhanceStep;
pub use extract::ExtractStep;
pub use interpolate::InterpolateStep;
pub use mux::MuxStep;
