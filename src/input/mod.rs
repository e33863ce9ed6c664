//! Input handling: loading the user's job preferences

pub mod file_detector;
pub mod preferences;
pub mod text_extractor;

pub use preferences::PreferenceStore;
