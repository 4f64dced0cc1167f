mod color;
mod status;
mod webhook;

pub use color::*;
pub use status::*;
pub use webhook::*;
