//! Gridplate - render spreadsheet templates from JSON data

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use gridplate_core::storage::{markdown_content, parse_workbook, write_workbook_content};
use gridplate_core::{Bindings, Renderer, RhaiEvaluator, TemplateConfig, load_config};
use log::info;
use std::env;
use std::path::{Path, PathBuf};

fn print_usage() {
    eprintln!("Usage: gridplate [OPTIONS] <TEMPLATE>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <TEMPLATE>                Template workbook to render (.grd)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --data <FILE>         JSON object whose keys become template variables");
    eprintln!("  -o, --output <FILE>       Write the result here (.md for Markdown, else .grd)");
    eprintln!("  -c, --config <FILE>       Load template syntax settings from TOML file");
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions");
    eprintln!("  --no-default-config       Skip the config.toml in the user config dir");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default)]
struct Options {
    template: Option<PathBuf>,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    functions: Option<PathBuf>,
    no_default_config: bool,
}

fn next_value(args: &[String], i: &mut usize, what: &str) -> PathBuf {
    *i += 1;
    if *i >= args.len() {
        eprintln!("Error: {} requires a file path", what);
        std::process::exit(1);
    }
    PathBuf::from(&args[*i])
}

fn parse_args(args: &[String]) -> Options {
    let mut opts = Options::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-d" | "--data" => opts.data = Some(next_value(args, &mut i, "--data")),
            "-o" | "--output" => opts.output = Some(next_value(args, &mut i, "--output")),
            "-c" | "--config" => opts.config = Some(next_value(args, &mut i, "--config")),
            "-f" | "--functions" => opts.functions = Some(next_value(args, &mut i, "--functions")),
            "--no-default-config" => opts.no_default_config = true,
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if opts.template.is_none() {
                    opts.template = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }
    opts
}

fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gridplate")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// An explicit `--config` wins; otherwise the user's config.toml, if present.
fn resolve_config(opts: &Options) -> TemplateConfig {
    let (config, warnings) = match (&opts.config, opts.no_default_config) {
        (Some(path), _) => load_config(path, true),
        (None, false) => match default_config_path() {
            Some(path) => load_config(&path, false),
            None => (TemplateConfig::default(), Vec::new()),
        },
        (None, true) => (TemplateConfig::default(), Vec::new()),
    };
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    config
}

fn load_evaluator(functions: Option<&Path>) -> Result<RhaiEvaluator> {
    let Some(path) = functions else {
        return Ok(RhaiEvaluator::new());
    };
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("reading functions file {}", path.display()))?;
    RhaiEvaluator::with_functions(&script)
        .with_context(|| format!("loading functions from {}", path.display()))
}

fn load_bindings(evaluator: &RhaiEvaluator, data: Option<&Path>) -> Result<Bindings> {
    let Some(path) = data else {
        return Ok(Bindings::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading data file {}", path.display()))?;
    evaluator
        .parse_json(&json)
        .with_context(|| format!("parsing data file {}", path.display()))
}

fn run(opts: Options) -> Result<()> {
    let Some(template) = opts.template.as_deref() else {
        print_usage();
        bail!("no template given");
    };

    let config = resolve_config(&opts);
    let evaluator = load_evaluator(opts.functions.as_deref())?;
    let bindings = load_bindings(&evaluator, opts.data.as_deref())?;

    let mut workbook = parse_workbook(template)
        .with_context(|| format!("reading template {}", template.display()))?;
    info!("rendering {} ({} sheets)", template.display(), workbook.sheets.len());
    Renderer::new(&config, &evaluator).render(&mut workbook, &bindings)?;

    let is_markdown = |path: &Path| {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"))
    };
    match opts.output {
        Some(path) => {
            let content = if is_markdown(&path) {
                markdown_content(&workbook)
            } else {
                write_workbook_content(&workbook)
            };
            std::fs::write(&path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Rendered to {}", path.display());
        }
        None => print!("{}", write_workbook_content(&workbook)),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let opts = parse_args(&args);
    if let Err(e) = run(opts) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
