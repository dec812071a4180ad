use std::env;
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use tagboost_worker::{
    app::{self, ComponentRegistry},
    config::Config,
    evaluation::report::render_clip_report,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::from_env().context("failed to load configuration")?;

    let alpha = args.alpha.unwrap_or_else(|| config.alphas()[0]);
    let similarity_threshold = args
        .similarity_threshold
        .unwrap_or_else(|| config.similarity_thresholds()[0]);

    let registry =
        ComponentRegistry::build(config).context("failed to build component registry")?;
    let report = app::inspect_clip(&registry, &args.clip, alpha, similarity_threshold).await?;

    println!("{}", render_clip_report(&report));
    Ok(())
}

struct InspectArgs {
    clip: String,
    alpha: Option<f32>,
    similarity_threshold: Option<f32>,
}

fn parse_args() -> Result<InspectArgs> {
    let mut clip = None;
    let mut alpha = None;
    let mut similarity_threshold = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--clip" => {
                let value = args.next().context("--clip requires a filename argument")?;
                clip = Some(value);
            }
            "--alpha" => {
                let value = args.next().context("--alpha requires a value")?;
                let parsed = value
                    .parse::<f32>()
                    .context("--alpha must be a number between 0 and 1")?;
                alpha = Some(parsed);
            }
            "--sim-threshold" => {
                let value = args.next().context("--sim-threshold requires a value")?;
                let parsed = value
                    .parse::<f32>()
                    .context("--sim-threshold must be a number between 0 and 1")?;
                similarity_threshold = Some(parsed);
            }
            "--help" => {
                print_usage();
                process::exit(0);
            }
            _ => {
                bail!("unknown argument: {}", arg);
            }
        }
    }

    let clip = clip.ok_or_else(|| anyhow!("--clip is required"))?;

    Ok(InspectArgs {
        clip,
        alpha,
        similarity_threshold,
    })
}

fn print_usage() {
    eprintln!(
        "Usage: inspect_clip --clip <filename> [--alpha 0.5] [--sim-threshold 0.5]\n\
         Corpus paths and the boost strategy are taken from TAGBOOST_* environment variables."
    );
}
