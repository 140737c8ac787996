pub mod preferences;

pub use preferences::{Preferences, DEFAULT_THEME};
