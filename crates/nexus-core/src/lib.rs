pub mod ambient;
pub mod constants;
pub mod error;
pub mod field;
pub mod insight;
pub mod pcm;
pub mod playback;
pub mod power;
pub mod voice;

pub use error::{CoreError, Result};
pub use power::*;
