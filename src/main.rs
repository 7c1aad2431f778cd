use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use release_tagger::cli::{run_release, ReleaseArgs};
use release_tagger::config;
use release_tagger::ui;

#[derive(clap::Parser)]
#[command(
    name = "release-tagger",
    about = "Compute the next release tag, stamp it into the build descriptor, tag and push",
    disable_version_flag = true
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Repository root folder")]
    root: Option<PathBuf>,

    #[arg(short, long, help = "Build descriptor path, relative to the root folder")]
    descriptor: Option<PathBuf>,

    #[arg(short, long, help = "Branch HEAD is expected to be on")]
    branch: Option<String>,

    #[arg(long, help = "Remote to push to")]
    remote: Option<String>,

    #[arg(long, help = "Create the tag locally without pushing")]
    no_push: bool,

    #[arg(long, help = "Compute the next tag without changing anything")]
    dry_run: bool,

    #[arg(
        short,
        long,
        help = "Append run outputs to this file (defaults to $GITHUB_OUTPUT)"
    )]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Print version information")]
    version: bool,
}

impl From<&Args> for ReleaseArgs {
    fn from(args: &Args) -> Self {
        ReleaseArgs {
            config_path: args.config.clone(),
            root: args.root.clone(),
            descriptor: args.descriptor.clone(),
            branch: args.branch.clone(),
            remote: args.remote.clone(),
            no_push: args.no_push,
            dry_run: args.dry_run,
            output: args.output.clone(),
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "release_tagger=info".into()),
    );

    // stdout carries the user-facing report
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("release-tagger {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing();

    let release_args = ReleaseArgs::from(&args);

    let config = match config::load_config(release_args.config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let scans: Vec<String> = config.enabled_scans().map(str::to_string).collect();
    let remote = release_args
        .remote
        .clone()
        .unwrap_or_else(|| config.remote.clone());

    ui::display_status("Computing next release tag...");

    match run_release(&release_args, config) {
        Ok(report) => {
            ui::display_warnings(&report.warnings);
            ui::display_outcome(&report.outcome, &remote, args.dry_run);
            ui::display_downstream_scans(
                scans.iter().map(String::as_str),
                &report.outcome.context.new_tag.to_string(),
            );
            if let Some(path) = &report.output_path {
                ui::display_status(&format!("Run outputs written to {}", path.display()));
            }
            Ok(())
        }
        Err(failure) => {
            ui::display_warnings(&failure.warnings);
            ui::display_failure(failure.state, &failure.error);
            std::process::exit(1);
        }
    }
}
