use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use agora_server::{logging, AgoraServer, ServiceConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServiceConfig> {
    ServiceConfig::resolve(path).context("failed to load configuration")
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.http_server.address = bind;
    }
    logging::init(config.env)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async move {
        let server = AgoraServer::new(config)?;
        let shutdown = server.shutdown_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        });
        server.serve().await?;
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    println!("{} Configuration is valid", "✓".green().bold());
    print!("{}", describe(&config));
    Ok(())
}

fn describe(config: &ServiceConfig) -> String {
    format!(
        "  Env: {}\n  Storage: {} (enforce references: {})\n  Address: {}\n  Timeout: {}s, idle {}s\n",
        config.env.to_string().cyan(),
        config.storage.kind.to_string().yellow(),
        config.storage.enforce_references,
        config.http_server.address.to_string().bold(),
        config.http_server.timeout_secs,
        config.http_server.idle_timeout_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn check_config_accepts_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "env = \"prod\"\n[http_server]\naddress = \"0.0.0.0:9000\"").unwrap();
        let args = CheckConfigArgs {
            config: Some(file.path().to_path_buf()),
        };
        assert!(cmd_check_config(args).is_ok());
    }

    #[test]
    fn check_config_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nkind = \"postgres\"").unwrap();
        let args = CheckConfigArgs {
            config: Some(file.path().to_path_buf()),
        };
        assert!(cmd_check_config(args).is_err());
    }

    #[test]
    fn describe_mentions_settings() {
        colored::control::set_override(false);
        let text = describe(&ServiceConfig::default());
        assert!(text.contains("Env: local"));
        assert!(text.contains("Storage: memory"));
        assert!(text.contains("127.0.0.1:8080"));
    }
}
