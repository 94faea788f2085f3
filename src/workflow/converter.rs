use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::config::{ConverterSettings, ResizeTool};
use crate::error_codes::CodedError;

const INTERMEDIATE_FILE_NAME: &str = "resized_sprite.png";

/// Turns a raw generated image into the final sprite at `dest`.
pub trait ImageConverter {
    fn convert(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Resize with `sips`/`magick`, then encode with `cwebp`.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    settings: ConverterSettings,
    work_dir: PathBuf,
}

struct ToolOutput {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Resize,
    Encode,
}

impl Stage {
    fn failure(self, message: String) -> CodedError {
        match self {
            Self::Resize => CodedError::resize_failed(message),
            Self::Encode => CodedError::encode_failed(message),
        }
    }
}

impl ExternalConverter {
    pub fn new(settings: ConverterSettings, work_dir: PathBuf) -> Self {
        Self { settings, work_dir }
    }

    pub fn intermediate_path(&self) -> PathBuf {
        self.work_dir.join(INTERMEDIATE_FILE_NAME)
    }
}

impl ImageConverter for ExternalConverter {
    fn convert(&self, source: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("failed to create work directory {}", self.work_dir.display()))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let intermediate = self.intermediate_path();

        let args = resize_args(
            self.settings.resize_tool,
            self.settings.target_size,
            source,
            &intermediate,
        );
        run_tool(Stage::Resize, &self.settings.resize_program, &args)?;

        let args = encode_args(self.settings.quality, &intermediate, dest);
        run_tool(Stage::Encode, &self.settings.encode_program, &args)?;

        if let Err(error) = fs::remove_file(&intermediate) {
            tracing::warn!(path = %intermediate.display(), %error, "could not remove intermediate file");
        }
        Ok(())
    }
}

pub fn resize_args(tool: ResizeTool, target_size: u32, source: &Path, out: &Path) -> Vec<String> {
    let source = source.display().to_string();
    let out = out.display().to_string();
    match tool {
        ResizeTool::Sips => vec![
            "-Z".to_owned(),
            target_size.to_string(),
            source,
            "--out".to_owned(),
            out,
        ],
        ResizeTool::Magick => vec![
            source,
            "-resize".to_owned(),
            format!("{target_size}x{target_size}"),
            out,
        ],
    }
}

pub fn encode_args(quality: u8, source: &Path, dest: &Path) -> Vec<String> {
    vec![
        "-q".to_owned(),
        quality.to_string(),
        source.display().to_string(),
        "-o".to_owned(),
        dest.display().to_string(),
    ]
}

fn run_tool(stage: Stage, program: &str, args: &[String]) -> Result<()> {
    tracing::debug!(program, args = %args.join(" "), "running {:?} step", stage);
    let output = spawn_and_wait(program, args).map_err(|error| {
        let message = if error.kind() == ErrorKind::NotFound {
            format!("{program} executable not found; install it or set the converter program in artgen.yaml")
        } else {
            format!("failed to run {program} (args='{}'): {error}", args.join(" "))
        };
        stage.failure(message)
    })?;

    if !output.status.success() {
        let diagnostic = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        return Err(stage
            .failure(format!(
                "{program} exited with {} (args='{}'): {diagnostic}",
                output.status,
                args.join(" ")
            ))
            .into());
    }
    Ok(())
}

fn spawn_and_wait(program: &str, args: &[String]) -> std::io::Result<ToolOutput> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
