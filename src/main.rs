use clap::Parser;
use respimg::config::{self, ConfigOverrides};
use respimg::imaging::RustCodec;
use respimg::output;
use respimg::pipeline::{self, RunOptions};
use respimg::types::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "respimg")]
#[command(version)]
#[command(about = "Generate responsive image renditions and a JSON manifest")]
#[command(long_about = "\
Generate responsive image renditions and a JSON manifest

Every matching file in the input directory is written at every width in
every format, named {name}-{width}w.{ext}, next to an imageData.json that
lists each rendition and a tiny inline placeholder per image.

  photos/              web/
  ├── beach.png   ─▶   ├── beach-600w.jpg
  └── photo.jpg        ├── beach-600w.webp
                       ├── ...
                       └── imageData.json

Settings come from stock defaults, then respimg.toml in the input directory
(or --config), then these flags. Run 'respimg --gen-config' for a documented
config file.

Set RUST_LOG (e.g. RUST_LOG=respimg=debug) for diagnostic logging on stderr.")]
struct Cli {
    /// Input directory
    #[arg(short = 'd', long = "dir", default_value = "./")]
    dir: PathBuf,

    /// Output directory (created if absent)
    #[arg(short = 'o', long = "outdir", default_value = "./web")]
    outdir: PathBuf,

    /// Target widths, comma separated [default: 600,800,1200,1800,2400]
    #[arg(
        short = 'w',
        long,
        value_delimiter = ',',
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    widths: Option<Vec<u32>>,

    /// Encode quality, 1-100 [default: 80]
    #[arg(short = 'q', long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Output formats, comma separated: jpg, png, webp, avif, gif, tiff [default: jpg,webp]
    #[arg(short = 'f', long, value_delimiter = ',')]
    formats: Option<Vec<OutputFormat>>,

    /// Accepted input extensions, comma separated [default: .jpg,.jpeg,.avif,.webp,.png,.gif,.svg]
    #[arg(short = 'e', long = "ext", value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Files processed at once [default: 5]
    #[arg(
        short = 'j',
        long,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    jobs: Option<usize>,

    /// Config file [default: <dir>/respimg.toml when present]
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print a stock respimg.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            widths: self.widths.clone(),
            formats: self.formats.clone(),
            quality: self.quality,
            extensions: self.extensions.clone(),
            max_parallel: self.jobs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    init_logging();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load_config(cli.config.as_deref(), &cli.dir)?;
    cli.overrides().apply(&mut config);

    let options = RunOptions {
        input_dir: cli.dir.clone(),
        out_dir: cli.outdir.clone(),
        config,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_process_event(&event);
        }
    });
    let result = pipeline::run(&RustCodec::new(), &options, Some(tx));
    // The sender is gone once run returns, so the printer drains and exits.
    let _ = printer.join();

    let report = result?;
    output::print_summary(&report);
    Ok(())
}

/// Diagnostics go to stderr; stdout carries progress and the summary.
/// `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
