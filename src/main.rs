use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use backdrop::config::BackdropConfig;
use backdrop::engine::BackdropBuilder;
use backdrop::i18n::Language;
use backdrop::window::WindowMode;

/// Animated 3D backdrop with bloom.
#[derive(Parser, Debug)]
#[command(name = "backdrop", version)]
struct Args {
    /// JSON config file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial language (en-us or pt-br).
    #[arg(long, default_value = "en-us", value_parser = parse_language)]
    lang: Language,

    /// Render N frames without a window or GPU and print a summary.
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u64>,

    /// Cover the current monitor.
    #[arg(long)]
    fullscreen: bool,

    /// Fixed RNG seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_language(s: &str) -> Result<Language, String> {
    s.parse().map_err(|e: backdrop::Error| e.to_string())
}

fn run(args: Args) -> backdrop::Result<()> {
    let config = match &args.config {
        Some(path) => BackdropConfig::load(path)?,
        None => BackdropConfig::default(),
    };
    let mut builder = BackdropBuilder::new().with_config(config).with_language(args.lang);
    if args.fullscreen {
        builder = builder.with_mode(WindowMode::Borderless);
    }
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }

    match args.headless {
        Some(frames) => {
            let (backdrop, backend) = builder.run_headless(frames)?;
            let passes = backend.bloom_passes() + backend.base_passes();
            println!(
                "{} frames, {} passes, {} objects, text ready: {}, follow target: {:?}",
                backend.frames(),
                passes,
                backdrop.scene().len(),
                backdrop.intro().is_ready(),
                backdrop.follow().target(),
            );
            Ok(())
        }
        None => builder.run(),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
