mod collector;
mod config;
mod deployer;
mod error;
mod lftp;
mod logger;
mod native;
mod runner;
mod script;
mod script_file;
mod sftp_client;
mod ssh_client;

use clap::{Parser, Subcommand, ValueEnum};
use config::DeployConfig;
use deployer::{Outcome, Transport};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skin-deploy", version, about = "Upload a built site skin to an SFTP host")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Skin directory under public/ (overrides SKIN_DIR)
    #[arg(long, global = true)]
    skin: Option<String>,

    /// How command scripts are executed
    #[arg(long, value_enum, global = true, default_value_t = TransportKind::Lftp)]
    transport: TransportKind,

    /// Transfer client program
    #[arg(long, global = true, env = "LFTP_BIN", default_value = "lftp")]
    lftp_bin: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity, then upload the skin (default)
    Deploy,
    /// Only check that an SFTP session can be opened
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransportKind {
    /// Run generated scripts through lftp
    Lftp,
    /// Execute scripts with the built-in SFTP client
    Native,
}

fn main() {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose);

    let mut cfg = DeployConfig::from_env().unwrap_or_else(|e| {
        error!("加载配置失败: {}", e);
        std::process::exit(1);
    });
    if let Some(skin) = cli.skin.filter(|s| !s.trim().is_empty()) {
        cfg.skin = skin;
    }

    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let transport: Box<dyn Transport> = match cli.transport {
        TransportKind::Lftp => Box::new(lftp::LftpTransport::new(
            runner::SystemRunner,
            cli.lftp_bin,
            workdir.clone(),
        )),
        TransportKind::Native => Box::new(native::NativeTransport),
    };

    match cli.command.unwrap_or(Commands::Deploy) {
        Commands::Deploy => match deployer::deploy_skin(&cfg, &workdir, transport.as_ref()) {
            Ok(Outcome::Uploaded(n)) => info!("部署完成，共上传 {} 个文件", n),
            Ok(Outcome::NothingToUpload) => {}
            Err(e) => {
                error!("部署失败: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Check => {
            if let Err(e) = deployer::check_connection(&cfg, transport.as_ref()) {
                error!("连接检查失败: {}", e);
                std::process::exit(1);
            }
        }
    }
}
