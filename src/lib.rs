//! Full-page screenshot service: drives a headless browser through a fixed sequence of
//! phases and stitches viewport tiles into one PNG.

pub mod api;
pub mod screenshot;
pub mod utils;
