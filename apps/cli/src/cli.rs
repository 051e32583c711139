use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rapidupload")]
#[command(about = "Upload files through the RapidUpload backend", long_about = None)]
pub struct Cli {
    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "RAPIDUPLOAD_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// Bearer token for backend calls
    #[arg(long, env = "RAPIDUPLOAD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum simultaneous uploads (overrides the config file)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Confirm uploads in one bulk call at the end of the round
    #[arg(long)]
    pub batched: bool,

    /// Queue configuration file (TOML)
    #[arg(long, default_value = "rapidupload.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_files_and_overrides() {
        let cli = Cli::try_parse_from([
            "rapidupload",
            "--server",
            "https://api.example.com",
            "-j",
            "20",
            "--batched",
            "a.jpg",
            "b.png",
        ])
        .unwrap();
        assert_eq!(cli.files, [PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
        assert_eq!(cli.server, "https://api.example.com");
        assert_eq!(cli.concurrency, Some(20));
        assert!(cli.batched);
        assert_eq!(cli.timeout_secs, 30);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["rapidupload"]).is_err());
    }
}
