use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wizwam::download::{AudioCodec, DownloadOptions, Quality, VideoCodec};

#[derive(Parser, Debug)]
#[command(name = "wizwam")]
#[command(version, about = "Download media with yt-dlp from the terminal or a browser", long_about = None)]
pub struct Cli {
    /// Without a subcommand the web interface starts with default settings
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download one URL
    Download(DownloadArgs),
    /// Print metadata for a URL as JSON
    Info(InfoArgs),
    /// Run the web interface
    Web(WebArgs),
    /// List registered handlers
    Plugins,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    pub url: String,

    #[arg(short, long, value_enum)]
    pub quality: Option<Quality>,

    #[arg(long, value_enum)]
    pub video_codec: Option<VideoCodec>,

    #[arg(long, value_enum)]
    pub audio_codec: Option<AudioCodec>,

    /// Extract audio only
    #[arg(short, long)]
    pub audio_only: bool,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Downloader handler to use
    #[arg(long, default_value = wizwam::jobs::DEFAULT_HANDLER)]
    pub handler: String,

    /// Processor handler applied to the result; repeatable
    #[arg(long = "process", value_name = "NAME")]
    pub processors: Vec<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl DownloadArgs {
    pub fn options(&self) -> DownloadOptions {
        DownloadOptions {
            quality: self.quality,
            video_codec: self.video_codec,
            audio_codec: self.audio_codec,
            audio_only: self.audio_only.then_some(true),
            output_dir: self.output_dir.clone(),
            verbose: self.verbose,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    pub url: String,
}

#[derive(clap::Args, Debug, Default)]
pub struct WebArgs {
    /// Address to bind; defaults to `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind; must be free when given
    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub open_browser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["wizwam"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn download_flags() {
        let cli = Cli::try_parse_from([
            "wizwam",
            "download",
            "https://example.com/v",
            "--quality",
            "1080p",
            "--audio-codec",
            "opus",
            "--audio-only",
            "--process",
            "title-capitalizer",
            "--process",
            "other",
        ])
        .unwrap();

        let Some(Commands::Download(args)) = cli.command else {
            panic!("expected download");
        };
        let options = args.options();
        assert_eq!(options.quality, Some(Quality::P1080));
        assert_eq!(options.audio_codec, Some(AudioCodec::Opus));
        assert_eq!(options.audio_only, Some(true));
        assert_eq!(options.video_codec, None);
        assert_eq!(args.handler, "yt-dlp");
        assert_eq!(args.processors, vec!["title-capitalizer", "other"]);
    }

    #[test]
    fn rejects_unknown_quality() {
        assert!(Cli::try_parse_from(["wizwam", "download", "u", "--quality", "8k"]).is_err());
    }

    #[test]
    fn web_flags() {
        let cli = Cli::try_parse_from(["wizwam", "web", "--port", "9000", "--open-browser"]).unwrap();
        let Some(Commands::Web(args)) = cli.command else {
            panic!("expected web");
        };
        assert_eq!(args.port, Some(9000));
        assert!(args.open_browser);
        assert!(args.host.is_none());
    }
}
