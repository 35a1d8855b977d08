//! External diagram layout tool.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::format::ImageFormat;

/// Diagram tool failure.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The program exited with a non-zero code.
    #[error("{program} exited with code {code}: {output}")]
    Exit {
        program: String,
        code: i32,
        output: String,
    },
    /// The program was terminated by a signal.
    #[error("{program} was terminated: {output}")]
    Killed { program: String, output: String },
}

impl ToolError {
    /// Exit code, when the program exited on its own.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => Some(*code),
            Self::Spawn { .. } | Self::Killed { .. } => None,
        }
    }

    /// Captured program output, or the spawn error message.
    #[must_use]
    pub fn output(&self) -> String {
        match self {
            Self::Spawn { source, .. } => source.to_string(),
            Self::Exit { output, .. } | Self::Killed { output, .. } => output.clone(),
        }
    }
}

/// Renders a diagram source file to an image.
pub trait DiagramTool {
    /// Render `source` to `output` in the given format.
    ///
    /// Blocks until the tool finishes.
    fn render(&self, source: &Path, format: ImageFormat, output: &Path) -> Result<(), ToolError>;
}

/// [`DiagramTool`] running a Graphviz-compatible command line program.
///
/// Invoked as `<program> -T<format> -o <output> <source>`.
#[derive(Debug, Clone)]
pub struct CommandTool {
    program: PathBuf,
}

impl CommandTool {
    /// Create a tool running `program` (a name looked up in `PATH` or a path).
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DiagramTool for CommandTool {
    fn render(&self, source: &Path, format: ImageFormat, output: &Path) -> Result<(), ToolError> {
        let program = self.program.display().to_string();
        tracing::debug!(
            program = %program,
            format = format.as_str(),
            source = %source.display(),
            "Running diagram tool"
        );

        let result = Command::new(&self.program)
            .arg(format!("-T{}", format.as_str()))
            .arg("-o")
            .arg(output)
            .arg(source)
            .output()
            .map_err(|error| ToolError::Spawn {
                program: program.clone(),
                source: error,
            })?;

        if result.status.success() {
            return Ok(());
        }

        let mut captured = String::from_utf8_lossy(&result.stderr).into_owned();
        captured.push_str(&String::from_utf8_lossy(&result.stdout));
        let output = captured.trim().to_owned();

        Err(match result.status.code() {
            Some(code) => ToolError::Exit {
                program,
                code,
                output,
            },
            None => ToolError::Killed { program, output },
        })
    }
}
