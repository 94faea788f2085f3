use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use artgen::catalog::{load_catalog, render_entry, render_listing, Catalog};
use artgen::config::{require_api_key, ArtConfig, API_KEY_ENV};
use artgen::error_codes::{find_coded_error, CodedError};
use artgen::workflow::art::{edit_art, existing_sprite, generate_art, ArtContext};
use artgen::workflow::converter::ExternalConverter;
use artgen::workflow::gemini_client::GeminiClient;

const USAGE_EXAMPLES: &str = "\
Examples:
  artgen iron_dagger                             Generate/regenerate from prompt
  artgen --edit iron_dagger \"remove the cloak\"   Edit existing image
  artgen --list                                  List all available prompts
  artgen --list weapons                          List prompts in category
  artgen --info iron_dagger                      Show prompt for item

Environment:
  GEMINI_API_KEY          API key for image generation (required for generate/edit)
  ARTGEN_GENERATE_MODEL   Override the text-to-image model
  ARTGEN_EDIT_MODEL       Override the image edit model
  RUST_LOG                Log filter (default: warn)";

#[derive(Debug, Parser)]
#[command(name = "artgen", version)]
#[command(about = "Generate, regenerate, or edit game art from the prompt catalog")]
#[command(after_help = USAGE_EXAMPLES)]
#[command(group(ArgGroup::new("mode").args(["id", "edit", "list", "info"])))]
struct Cli {
    /// Item id to generate or regenerate
    id: Option<String>,
    /// Edit the existing sprite for ID with a text instruction
    #[arg(long, num_args = 2, value_names = ["ID", "INSTRUCTION"])]
    edit: Option<Vec<String>>,
    /// List catalog prompts, optionally restricted to one category
    #[arg(long, num_args = 0..=1, value_name = "CATEGORY")]
    list: Option<Option<String>>,
    /// Show the catalog entry for ID
    #[arg(long, value_name = "ID")]
    info: Option<String>,
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    project: Option<PathBuf>,
    /// Config file (defaults to <project>/artgen.yaml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Emit JSON for --list, --info and errors
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Debug logging on stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug)]
enum Mode {
    Generate { id: String },
    Edit { id: String, instruction: String },
    List { category: Option<String> },
    Info { id: String },
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        if let Some(values) = &self.edit {
            let [id, instruction] = values.as_slice() else {
                return None;
            };
            return Some(Mode::Edit {
                id: id.clone(),
                instruction: instruction.clone(),
            });
        }
        if let Some(category) = &self.list {
            return Some(Mode::List {
                category: category.clone(),
            });
        }
        if let Some(id) = &self.info {
            return Some(Mode::Info { id: id.clone() });
        }
        self.id.clone().map(|id| Mode::Generate { id })
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    init_tracing(cli.verbose);

    let Some(mode) = cli.mode() else {
        if cli.json {
            let error = CodedError::usage("expected an item id, --edit, --list or --info");
            report_error(&error.into(), true);
        } else {
            let _ = Cli::command().print_help();
            println!();
        }
        return ExitCode::FAILURE;
    };

    match run(&cli, mode) {
        Ok(code) => code,
        Err(error) => {
            report_error(&error, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,artgen=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli, mode: Mode) -> Result<ExitCode> {
    let project_root = match &cli.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let mut config = ArtConfig::load(&project_root, cli.config.as_deref())?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    tracing::debug!(
        catalog = %config.catalog_path.display(),
        sprites = %config.sprites_dir.display(),
        backups = %config.backup_dir.display(),
        "resolved configuration"
    );

    let catalog = load_catalog(&config.catalog_path)?;

    match mode {
        Mode::List { category } => {
            list_prompts(&catalog, category.as_deref(), cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Info { id } => {
            show_info(&catalog, &id, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Generate { id } => {
            catalog.require(&id)?;
            with_art_context(&config, |ctx| generate_art(ctx, &catalog, &id))?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Edit { id, instruction } => {
            let entry = catalog.require(&id)?;
            existing_sprite(&config.path_resolver(), entry)?;
            with_art_context(&config, |ctx| edit_art(ctx, &catalog, &id, &instruction))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn with_art_context<T>(
    config: &ArtConfig,
    action: impl FnOnce(&ArtContext<'_>) -> Result<T>,
) -> Result<T> {
    let api_key = require_api_key(std::env::var(API_KEY_ENV).ok())?;
    let generator = GeminiClient::new(&config.api, api_key)?;
    let converter = ExternalConverter::new(config.converter.clone(), config.work_dir.clone());
    let resolver = config.path_resolver();
    let ctx = ArtContext {
        resolver: &resolver,
        generator: &generator,
        converter: &converter,
        work_dir: &config.work_dir,
    };
    action(&ctx)
}

fn list_prompts(catalog: &Catalog, category: Option<&str>, as_json: bool) -> Result<()> {
    let listing = catalog.listing(category);
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("failed to serialize listing")?
        );
    } else {
        print!("{}", render_listing(&listing));
    }
    Ok(())
}

fn show_info(catalog: &Catalog, id: &str, as_json: bool) -> Result<()> {
    match catalog.get(id) {
        Some(entry) if as_json => println!(
            "{}",
            serde_json::to_string_pretty(entry).context("failed to serialize entry")?
        ),
        Some(entry) => print!("{}", render_entry(entry)),
        // Unknown ids are reported but do not change the exit status.
        None => report_error(&CodedError::unknown_id(id).into(), as_json),
    }
    Ok(())
}

fn report_error(error: &anyhow::Error, as_json: bool) {
    match find_coded_error(error) {
        Some(coded) if as_json => match serde_json::to_string_pretty(&coded.envelope()) {
            Ok(envelope) => eprintln!("{envelope}"),
            Err(_) => eprintln!("Error: {error:#}"),
        },
        Some(coded) => {
            eprintln!("Error: {error:#}");
            if let Some(hint) = &coded.hint {
                eprintln!("{hint}");
            }
        }
        None => eprintln!("Error: {error:#}"),
    }
}
