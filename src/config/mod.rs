// Configuration management module
// TOML settings stored in the base directory, plus the interactive setup

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DEFAULT_MATCH_THRESHOLD, EmbeddingConfig, IndexingConfig, ProviderKind,
    SearchConfig,
};

/// Resolve the base directory: an explicit override wins over `~/.content-rag`
#[inline]
pub fn resolve_base_dir(
    override_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => Config::default_base_dir(),
    }
}
