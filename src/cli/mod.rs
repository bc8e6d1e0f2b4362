use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubescribe",
    about = "Transcribe YouTube videos through AssemblyAI and serve the article front end",
    version,
    long_about = "Fetches the audio track of a YouTube video with yt-dlp, re-encodes it to MP3 with ffmpeg when the download is not audio-typed, and transcribes it with AssemblyAI. Runs as an HTTP server or as a one-shot command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,

        /// Directory with the built front end (overrides config)
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,

        /// AssemblyAI API key
        #[arg(long, env = "ASSEMBLYAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Transcribe a single YouTube video
    Transcribe {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// AssemblyAI API key
        #[arg(long, env = "ASSEMBLYAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long, conflicts_with = "init")]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Check that yt-dlp and ffmpeg are available
    Check,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Title, thumbnail and transcript as plain text
    Text,
    /// Full result with metadata as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transcribe_args() {
        let cli = Cli::try_parse_from([
            "tubescribe",
            "transcribe",
            "https://youtu.be/dQw4w9WgXcQ",
            "--format",
            "json",
            "-o",
            "out.json",
            "--api-key",
            "k",
        ])
        .unwrap();

        match cli.command {
            Commands::Transcribe {
                url,
                api_key,
                output,
                format,
            } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(api_key.as_deref(), Some("k"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected transcribe"),
        }
    }

    #[test]
    fn test_serve_overrides_and_global_flags() {
        let cli = Cli::try_parse_from(["tubescribe", "serve", "-p", "8080", "--static-dir", "dist", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { port, static_dir, host, .. } => {
                assert_eq!(port, Some(8080));
                assert_eq!(static_dir, Some(PathBuf::from("dist")));
                assert!(host.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_config_show_and_init_conflict() {
        assert!(Cli::try_parse_from(["tubescribe", "config", "--show", "--init"]).is_err());
    }
}
