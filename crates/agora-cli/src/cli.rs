use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "agora",
    about = "Agora: posts, threaded comments and live updates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Validate a configuration file and print the effective settings
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to $CONFIG_PATH)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override `http_server.address`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file (defaults to $CONFIG_PATH)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::parse_from(["agora", "serve", "--config", "agora.toml", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.config, Some(PathBuf::from("agora.toml")));
                assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_serve_without_flags() {
        let cli = Cli::parse_from(["agora", "serve"]);
        assert!(matches!(
            cli.command,
            Command::Serve(ServeArgs { config: None, bind: None })
        ));
    }

    #[test]
    fn parse_check_config() {
        let cli = Cli::parse_from(["agora", "check-config", "-c", "x.toml"]);
        match cli.command {
            Command::CheckConfig(args) => assert_eq!(args.config, Some(PathBuf::from("x.toml"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        assert!(Cli::try_parse_from(["agora", "serve", "--bind", "nowhere"]).is_err());
    }
}
