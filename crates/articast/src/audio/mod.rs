pub mod duration;

pub use duration::{estimate_duration, AudioError};
