//! YAML helpers shared by config, scene and metadata loading

pub mod diagnostics;

pub use diagnostics::{parse_value, YamlSyntaxError};
