pub mod engine;
pub mod indicators;
pub mod signals;


pub use engine::*;
pub use indicators::*;
pub use signals::*;
