//! `mdgraph convert` command implementation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdgraph_cache::FileRenderCache;
use mdgraph_config::{CliSettings, Config};
use mdgraph_diagrams::{CommandTool, DiagramHandler, ImageFormat};
use mdgraph_renderer::{
    CodeBlockOptions, ConversionResult, Converter, NumberingLabels, RenderFailure, TableHandler,
};

use crate::error::CliError;
use crate::output::Diagnostics;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown file to convert, `-` for stdin.
    input: PathBuf,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdgraph.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Diagram layout program (overrides config).
    #[arg(long, env = "MDGRAPH_TOOL")]
    tool: Option<String>,

    /// Leave diagrams as code blocks instead of rendering them.
    #[arg(long)]
    no_render: bool,

    /// Prefix for image URLs (overrides config).
    #[arg(long)]
    url_prefix: Option<String>,

    /// Disable heading, figure and table numbering.
    #[arg(long)]
    no_numbering: bool,

    /// Enable verbose output (cache and tool logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// Render failures are reported but do not fail the command; the
    /// document is still written with the figures in place.
    pub(crate) fn execute(self, diagnostics: &Diagnostics) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            tool: self.tool,
            render_enabled: self.no_render.then_some(false),
            url_prefix: self.url_prefix,
            numbering_enabled: self.no_numbering.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }
        if config.render_enabled() {
            tracing::info!(
                tool = config.diagrams_resolved.tool.as_deref().unwrap_or_default(),
                "Diagram rendering enabled"
            );
        } else {
            tracing::info!("Diagram rendering disabled, diagrams stay code blocks");
        }

        let markdown = read_input(&self.input)?;
        let mut converter = build_converter(&config)?;
        let result = converter.convert(&markdown)?;

        report(diagnostics, &result);

        match &self.output {
            Some(path) => std::fs::write(path, &result.html)?,
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(result.html.as_bytes())?;
                stdout.flush()?;
            }
        }

        Ok(())
    }
}

/// Read the document from a file, or stdin for `-`.
fn read_input(input: &Path) -> Result<String, CliError> {
    let mut text = String::new();
    let result = if input == Path::new("-") {
        std::io::stdin().read_to_string(&mut text).map(|_| ())
    } else {
        std::fs::read_to_string(input).map(|content| text = content)
    };
    result.map_err(|source| CliError::Input {
        path: input.display().to_string(),
        source,
    })?;
    Ok(text)
}

/// Assemble the converter and its handlers from configuration.
fn build_converter(config: &Config) -> Result<Converter, CliError> {
    let code_options = CodeBlockOptions {
        class_prefix: config.code.class_prefix.clone(),
        class_on_pre: config.code.class_on_pre,
        transform: None,
    };

    let mut converter = Converter::new().with_code_options(code_options.clone());

    if let Some(template) = &config.tables.align_class_template {
        converter = converter.with_handler(TableHandler::new().with_align_class(template.clone()));
    }

    converter = if config.numbering.enabled {
        converter.with_numbering(NumberingLabels {
            figure: config.numbering.figure_label.clone(),
            listing: config.numbering.listing_label.clone(),
            table: config.numbering.table_label.clone(),
        })
    } else {
        converter.without_numbering()
    };

    let diagrams = &config.diagrams_resolved;
    let cache = FileRenderCache::new(&diagrams.source_dir, &diagrams.image_dir)
        .with_source_ext(diagrams.source_ext.clone());
    let mut handler = DiagramHandler::new(cache)
        .formats(parse_formats(&diagrams.formats)?)
        .url_prefix(diagrams.url_prefix.clone())
        .class_prefix(diagrams.class_prefix.clone())
        .code_options(code_options);
    if let Some(tool) = &diagrams.tool {
        handler = handler.tool(CommandTool::new(tool));
    }

    Ok(converter.with_handler(handler))
}

fn parse_formats(names: &[String]) -> Result<Vec<ImageFormat>, CliError> {
    names
        .iter()
        .map(|name| {
            ImageFormat::parse(name)
                .ok_or_else(|| CliError::Validation(format!("Unsupported image format: {name}")))
        })
        .collect()
}

fn report(diagnostics: &Diagnostics, result: &ConversionResult) {
    for warning in &result.warnings {
        diagnostics.warning(warning);
    }
    for failure in &result.failures {
        diagnostics.failure(&failure_message(failure));
        diagnostics.tool_output(&failure.output);
    }
}

fn failure_message(failure: &RenderFailure) -> String {
    match failure.status {
        Some(code) => format!(
            "Failed to render {}.{} (exit code {code})",
            failure.key, failure.format
        ),
        None => format!("Failed to render {}.{}", failure.key, failure.format),
    }
}
