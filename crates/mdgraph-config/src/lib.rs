//! Configuration management for mdgraph.
//!
//! Parses `mdgraph.toml` files with serde and discovers them in the current
//! directory or its parents. Command line overrides are applied during load
//! via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` expands to the value of VAR and errors if it is unset
//! - `${VAR:-default}` falls back to `default` when VAR is unset
//!
//! Expanded fields:
//! - `diagrams.tool`
//! - `diagrams.url_prefix`
//! - `diagrams.source_dir`
//! - `diagrams.image_dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdgraph.toml";

/// Output formats accepted in `diagrams.formats`.
pub const SUPPORTED_FORMATS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "pdf"];

/// Command line settings that override configuration file values.
///
/// Only `Some` values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the diagram tool program.
    pub tool: Option<String>,
    /// `Some(false)` disables diagram rendering even when a tool is configured.
    pub render_enabled: Option<bool>,
    /// Override the image URL prefix.
    pub url_prefix: Option<String>,
    /// Override the numbering pass.
    pub numbering_enabled: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagram settings as written in TOML.
    diagrams: DiagramsConfigRaw,
    /// Code block settings.
    pub code: CodeConfig,
    /// Table settings.
    pub tables: TablesConfig,
    /// Numbering pass settings.
    pub numbering: NumberingConfig,

    /// Resolved diagram settings (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[diagrams]` section before path resolution.
#[derive(Debug, Default, Deserialize)]
struct DiagramsConfigRaw {
    source_dir: Option<String>,
    image_dir: Option<String>,
    url_prefix: Option<String>,
    tool: Option<String>,
    formats: Option<Vec<String>>,
    source_ext: Option<String>,
    class_prefix: Option<String>,
}

/// Resolved diagram settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramsConfig {
    /// Directory holding diagram sources and their hash sidecars.
    pub source_dir: PathBuf,
    /// Directory holding rendered images.
    pub image_dir: PathBuf,
    /// Prefix for image URLs in the generated HTML.
    pub url_prefix: String,
    /// Layout program. `None` disables rendering.
    pub tool: Option<String>,
    /// Output formats, lowercase.
    pub formats: Vec<String>,
    /// Extension of written source files.
    pub source_ext: String,
    /// Prefix for the language class on figures.
    pub class_prefix: String,
}

impl DiagramsConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            source_dir: base.join("graph/src"),
            image_dir: base.join("graph/img"),
            url_prefix: "graph/img/".to_owned(),
            tool: None,
            formats: vec!["svg".to_owned()],
            source_ext: "dot".to_owned(),
            class_prefix: String::new(),
        }
    }
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

/// `[code]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodeConfig {
    /// Prefix for the language class.
    pub class_prefix: String,
    /// Put the language class on `<pre>` instead of `<code>`.
    pub class_on_pre: bool,
}

/// `[tables]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TablesConfig {
    /// Class template for aligned header cells, `%%` replaced by the alignment.
    pub align_class_template: Option<String>,
}

/// `[numbering]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NumberingConfig {
    /// Run the numbering pass.
    pub enabled: bool,
    /// Label prefix for figures.
    pub figure_label: String,
    /// Label prefix for code listings.
    pub listing_label: String,
    /// Label prefix for tables.
    pub table_label: String,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            figure_label: "Fig.".to_owned(),
            listing_label: "List".to_owned(),
            table_label: "Table".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Explicit config file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path, e.g. `diagrams.tool`.
        field: String,
        /// Error message.
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration with optional CLI settings.
    ///
    /// Loads `config_path` when given, otherwise searches for `mdgraph.toml`
    /// in the current directory and its parents. Without a file, defaults
    /// relative to the current directory are used. CLI settings are applied
    /// last and take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` does not exist, or if
    /// reading, parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Whether diagrams are rendered with an external tool.
    #[must_use]
    pub fn render_enabled(&self) -> bool {
        self.diagrams_resolved.tool.is_some()
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(tool) = &settings.tool {
            self.diagrams_resolved.tool = Some(tool.clone());
        }
        if settings.render_enabled == Some(false) {
            self.diagrams_resolved.tool = None;
        }
        if let Some(url_prefix) = &settings.url_prefix {
            self.diagrams_resolved.url_prefix.clone_from(url_prefix);
        }
        if let Some(enabled) = settings.numbering_enabled {
            self.numbering.enabled = enabled;
        }
    }

    /// Search for the config file in the current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Default config with directories relative to `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            diagrams: DiagramsConfigRaw::default(),
            code: CodeConfig::default(),
            tables: TablesConfig::default(),
            numbering: NumberingConfig::default(),
            diagrams_resolved: DiagramsConfig::with_base(base),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_diagrams()?;
        self.validate_tables()?;
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams_resolved;

        if let Some(tool) = &diagrams.tool {
            require_non_empty(tool, "diagrams.tool")?;
        }

        if diagrams.formats.is_empty() {
            return Err(ConfigError::Validation(
                "diagrams.formats must list at least one format".to_owned(),
            ));
        }
        if let Some(unknown) = diagrams
            .formats
            .iter()
            .find(|f| !SUPPORTED_FORMATS.contains(&f.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "diagrams.formats: unsupported format '{unknown}' (expected one of {})",
                SUPPORTED_FORMATS.join(", ")
            )));
        }

        require_non_empty(&diagrams.source_ext, "diagrams.source_ext")?;
        if diagrams.source_ext.contains(['/', '\\', '.']) {
            return Err(ConfigError::Validation(
                "diagrams.source_ext must be a bare extension".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_tables(&self) -> Result<(), ConfigError> {
        if let Some(template) = &self.tables.align_class_template
            && !template.contains("%%")
        {
            return Err(ConfigError::Validation(
                "tables.align_class_template must contain %%".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let raw = &mut self.diagrams;
        for (value, field) in [
            (&mut raw.tool, "diagrams.tool"),
            (&mut raw.url_prefix, "diagrams.url_prefix"),
            (&mut raw.source_dir, "diagrams.source_dir"),
            (&mut raw.image_dir, "diagrams.image_dir"),
        ] {
            if let Some(current) = value.as_deref() {
                *value = Some(expand::expand_env(current, field)?);
            }
        }
        Ok(())
    }

    /// Resolve relative directories against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = DiagramsConfig::with_base(config_dir);
        let raw = &self.diagrams;

        self.diagrams_resolved = DiagramsConfig {
            source_dir: raw
                .source_dir
                .as_ref()
                .map_or(defaults.source_dir, |d| config_dir.join(d)),
            image_dir: raw
                .image_dir
                .as_ref()
                .map_or(defaults.image_dir, |d| config_dir.join(d)),
            url_prefix: raw.url_prefix.clone().unwrap_or(defaults.url_prefix),
            tool: raw.tool.clone(),
            formats: raw.formats.as_ref().map_or(defaults.formats, |formats| {
                formats.iter().map(|f| f.trim().to_lowercase()).collect()
            }),
            source_ext: raw.source_ext.clone().unwrap_or(defaults.source_ext),
            class_prefix: raw.class_prefix.clone().unwrap_or(defaults.class_prefix),
        };
    }
}
