use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{io::Write, path::PathBuf, time::Duration};
use tracing_subscriber::{fmt, EnvFilter};

use modelshot::background::{Background, BackgroundConfig};
use modelshot::export::render_export;
use modelshot::filters::{FilterKind, Preset};
use modelshot::models::{Asset, AspectRatio, Style, STOCK_MODELS};
use modelshot::session::Failure;
use modelshot::status::StatusTicker;
use modelshot::{synthesizer_for, view, Config, Studio};

#[derive(Parser)]
#[command(name = "modelshot")]
#[command(about = "Place a product on a model photo with Gemini, then filter and export the result")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the stock model photos
    Gallery,
    /// List styles and aspect ratios
    Options,
    /// Generate a new photo from a model and a product image
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Model photo: a file path or an http(s) URL
    #[arg(long, conflicts_with = "stock")]
    model: Option<String>,

    /// Use a stock model photo by gallery index
    #[arg(long)]
    stock: Option<usize>,

    /// Product photo file
    #[arg(long)]
    product: Option<PathBuf>,

    /// Creative brief
    #[arg(long, default_value = "")]
    prompt: String,

    #[arg(long, default_value = "studio")]
    style: Style,

    #[arg(long, default_value = "1:1")]
    ratio: AspectRatio,

    /// Quick preset applied before the individual sliders
    #[arg(long)]
    preset: Option<Preset>,

    #[arg(long)]
    brightness: Option<u16>,
    #[arg(long)]
    contrast: Option<u16>,
    #[arg(long)]
    saturation: Option<u16>,
    #[arg(long)]
    sepia: Option<u16>,
    #[arg(long)]
    grayscale: Option<u16>,

    /// Directory the exported image is written to
    #[arg(long, short, default_value = ".")]
    out: PathBuf,

    /// Disable the animated status line
    #[arg(long)]
    no_background: bool,
}

impl GenerateArgs {
    fn sliders(&self) -> [(FilterKind, Option<u16>); 5] {
        [
            (FilterKind::Brightness, self.brightness),
            (FilterKind::Contrast, self.contrast),
            (FilterKind::Saturation, self.saturation),
            (FilterKind::Sepia, self.sepia),
            (FilterKind::Grayscale, self.grayscale),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match Cli::parse().command {
        Commands::Gallery => {
            for (i, stock) in STOCK_MODELS.iter().enumerate() {
                println!("{i:>2}  {:<26} {}", stock.label, stock.url);
            }
            Ok(())
        }
        Commands::Options => {
            println!("Styles:");
            for style in Style::ALL {
                println!("  {:<11} {}", style.name(), style.scene());
            }
            println!("Aspect ratios: {}", AspectRatio::ALL.map(|r| r.as_str()).join(", "));
            Ok(())
        }
        Commands::Generate(args) => generate(args, &config).await,
    }
}

async fn generate(args: GenerateArgs, config: &Config) -> Result<()> {
    if config.demo_mode() {
        tracing::info!("No GEMINI_API_KEY set, running in demo mode");
    } else {
        tracing::info!("Using API key: {}", config.redacted_key());
    }

    let mut studio = Studio::new();
    studio.set_demo(config.demo_mode());
    if let Some(model) = &args.model {
        if model.starts_with("http://") || model.starts_with("https://") {
            studio.set_model_url(model.as_str());
        } else {
            let asset = Asset::from_path(model).await.with_context(|| format!("reading model photo {model}"))?;
            studio.set_model(asset);
        }
    } else if let Some(index) = args.stock {
        studio.select_stock_model(index)?;
    }
    if let Some(path) = &args.product {
        let asset = Asset::from_path(path).await.with_context(|| format!("reading product photo {}", path.display()))?;
        studio.set_product(asset);
    }
    studio.set_prompt(args.prompt.as_str());
    studio.set_style(args.style);
    studio.set_aspect_ratio(args.ratio);

    print!("{}", view::render(&studio, None));

    let pending = match studio.begin_generation() {
        Ok(pending) => pending,
        Err(e) => bail!("{e}"),
    };

    let client = reqwest::Client::new();
    let synthesizer = synthesizer_for(config, client.clone());
    let mut task = tokio::spawn(async move { pending.run(&client, synthesizer.as_ref()).await });

    let ticker = StatusTicker::start(config.status_interval);
    let background = (!args.no_background).then(|| Background::start(BackgroundConfig::default()));
    let mut redraw = tokio::time::interval(Duration::from_millis(120));

    let joined = loop {
        tokio::select! {
            joined = &mut task => break joined,
            _ = redraw.tick() => {
                let strip = background.as_ref().map(|b| b.snapshot().strip(24)).unwrap_or_default();
                eprint!("\r{strip} {:<40}", ticker.current());
                std::io::stderr().flush().ok();
            }
        }
    };
    ticker.stop();
    if let Some(background) = background {
        background.stop();
    }
    eprintln!();

    let outcome = match joined {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => {
            tracing::error!("❌ Generation failed: {}", e);
            Err(Failure::from(&e))
        }
        Err(e) => {
            tracing::error!("❌ Generation task ended abnormally: {}", e);
            Err(Failure::Unknown)
        }
    };
    studio.finish_generation(outcome);

    if let Some(failure) = studio.failure() {
        print!("{}", view::render(&studio, None));
        bail!(failure.message());
    }

    if let Some(preset) = args.preset {
        studio.apply_preset(preset);
    }
    for (kind, value) in args.sliders() {
        if let Some(value) = value {
            studio.set_filter(kind, value);
        }
    }

    let Some(result) = studio.result() else {
        bail!("Generation failed due to an unknown error.");
    };
    let exported = render_export(result, *studio.filters()).await?;
    let path = exported.save(&args.out).await?;

    print!("{}", view::render(&studio, None));
    println!("Saved {}x{} image to {}", exported.width, exported.height, path.display());
    Ok(())
}
