use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::debug;

/// Generates a PDF letter from a plain-text letter file.
///
/// A letter file consists of free notes followed by four sections (config, address, subject and
/// body), each started by a line beginning with `//`.  The PDF is written next to the input with
/// the extension replaced by `.pdf`.
///
/// Configuration is read from `/etc/left/defaults.json` (Linux), the user's
/// `left/defaults.json` and every `--config` file, in that order; later files override earlier
/// ones field by field.
#[derive(Parser)]
#[command(name = "left", version)]
struct Cli {
    /// Custom config file read after the defaults; may be repeated.
    #[arg(long, value_name = "PATH")]
    config: Vec<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long, conflicts_with = "create")]
    dump_config: bool,

    /// Print a template for a new letter and exit.
    #[arg(long, conflicts_with = "file")]
    create: bool,

    /// Letter file to render.
    #[arg(value_name = "FILE", required_unless_present_any = ["dump_config", "create"])]
    file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> left::Result<()> {
    let search_paths = left::config::search_paths(&cli.config);
    debug!("Configuration search paths: {:?}", search_paths);
    let config = left::config::load(&search_paths)?;

    if cli.create {
        println!("{}", left::empty_letter(&config)?);
    } else if cli.dump_config {
        println!("{}", config.to_json_pretty()?);
    } else if let Some(file) = cli.file {
        let output = left::render(&file, &config)?;
        debug!("Wrote {}", output.display());
    }
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
