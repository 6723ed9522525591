//! Preset files, command-line preset options, and the value parsers they
//! share.

pub mod args;
pub mod duration;
pub mod file;

pub use args::PresetArgs;
pub use duration::parse_duration;
pub use file::PresetFile;
