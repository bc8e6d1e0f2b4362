use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tubescribe::cli::{Cli, Commands};
use tubescribe::config::Config;
use tubescribe::transcribe::TranscriptionPipeline;
use tubescribe::{output, server, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().await?;

    init_tracing(&cli, config.logging.json);

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
            api_key,
        } => {
            warn_missing_dependencies(&config).await;

            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = dir;
            }
            let config = config.with_api_key(api_key);

            let pipeline = TranscriptionPipeline::new(&config)?;
            server::serve(&config, pipeline).await?;
        }
        Commands::Transcribe {
            url,
            api_key,
            output,
            format,
        } => {
            warn_missing_dependencies(&config).await;

            let config = config.with_api_key(api_key);
            let pipeline = TranscriptionPipeline::new(&config)?;

            tracing::info!(url = %url, "Starting transcription");

            let spinner = (!cli.quiet).then(|| {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {msg} [{elapsed_precise}]")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb.set_message("Transcribing...");
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            });

            let result = pipeline.transcribe_from_url(&url).await;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let result = result?;

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format).await?;
                    println!("Transcription saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format)?;
                }
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                config.display();
                println!();
                println!("Run `tubescribe config --init` to write a configuration file.");
                println!("The API key is read from ASSEMBLYAI_API_KEY and never stored.");
            }
        }
        Commands::Check => {
            let statuses = utils::check_dependencies(&config.media).await;
            for tool in &statuses {
                match &tool.version {
                    Some(version) => println!("{} {} ({})", style("✓").green(), tool.name, version),
                    None => println!(
                        "{} {} not found at '{}' - {}",
                        style("✗").red(),
                        tool.name,
                        tool.path,
                        tool.purpose
                    ),
                }
            }
            if statuses.iter().any(|t| !t.is_available()) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli, json: bool) {
    let default_filter = if cli.verbose {
        "tubescribe=debug,tower_http=debug"
    } else if cli.quiet {
        "tubescribe=warn"
    } else {
        "tubescribe=info,tower_http=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Missing tools are reported but never fatal
async fn warn_missing_dependencies(config: &Config) {
    let missing: Vec<_> = utils::check_dependencies(&config.media)
        .await
        .into_iter()
        .filter(|tool| !tool.is_available())
        .collect();

    if missing.is_empty() {
        return;
    }

    eprintln!("{}", style("⚠️  Dependency check warnings:").yellow());
    for tool in missing {
        eprintln!("   • {} - {}", tool.name, tool.purpose);
    }
    eprintln!("   (Continuing anyway - tools may be available)");
}
