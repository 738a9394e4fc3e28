// Configuration management module
// TOML settings, performance modes and interactive setup

pub mod interactive;
pub mod mode;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use mode::{ModeProfile, PerformanceMode, PromptStyle};
pub use settings::{
    Config, ConfigError, DEFAULT_FAQ_ACCEPTANCE_THRESHOLD, DEFAULT_FAQ_CANDIDACY_THRESHOLD,
    DocumentsConfig, OllamaConfig, PathsConfig, RetrievalConfig,
};

/// Resolve the configuration directory, preferring an explicit override
#[inline]
pub fn get_config_dir(
    override_dir: Option<&std::path::Path>,
) -> Result<std::path::PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Config::default_dir(),
    }
}
