//! Console front ends for Huddle: the server, an interactive chat
//! client, and a small stress tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use huddle_core::client::ClientSession;
use huddle_core::config::DEFAULT_PORT;
use huddle_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use huddle_core::server::Dispatcher;
use huddle_core::Config;

#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Huddle server
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long)]
        bind: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<String>,
    },
    /// Connect to a server and chat interactively
    Chat {
        /// Server hostname
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Group to join
        #[arg(long, default_value = "default")]
        group: String,

        /// Group password
        #[arg(long, default_value = "default")]
        password: String,

        /// Nickname to chat under
        #[arg(long, default_value = "Anonymous")]
        nickname: String,
    },
    /// Open many sessions against a server and hammer it
    Stress {
        /// Server hostname
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of concurrent sessions
        #[arg(long, default_value_t = 10)]
        clients: usize,

        /// Send/read iterations per session
        #[arg(long, default_value_t = 10)]
        iterations: usize,

        /// Delay between actions in milliseconds
        #[arg(long, default_value_t = 10)]
        step_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;

    match args.command {
        Command::Serve { bind, config } => serve(bind, config).await,
        Command::Chat {
            host,
            port,
            group,
            password,
            nickname,
        } => chat(host, port, group, password, nickname).await,
        Command::Stress {
            host,
            port,
            clients,
            iterations,
            step_ms,
        } => stress(host, port, clients, iterations, step_ms).await,
    }
}

async fn serve(bind: Option<String>, config_path: Option<String>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {path}"))?,
        None => Config::default(),
    };
    if let Some(bind) = bind {
        config.server.bind_address = bind.parse().context("parsing bind address")?;
    }

    let dispatcher = Dispatcher::bind(config).await.context("starting server")?;
    println!("-- Server listening on {}.", dispatcher.local_addr()?);
    println!("-- Press Ctrl-C to shut down.");

    let handle = dispatcher.handle();
    let task = tokio::spawn(dispatcher.run());

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    println!("-- Shutting down server...");
    handle.stop();
    task.await??;
    println!("-- Server shut down.");
    Ok(())
}

async fn chat(
    host: String,
    port: u16,
    group: String,
    password: String,
    nickname: String,
) -> Result<()> {
    let mut session = ClientSession::new(host.clone(), port, group, &password, nickname)
        .context("invalid session parameters")?;
    println!("Connecting to {host}:{port}...");
    session.open().await.context("failed to connect")?;
    println!("Connected! Type '/help' for commands.\n");

    show_messages(&mut session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim_end() {
            "/help" => {
                println!("-- Help:");
                println!("-- Press ENTER at the prompt to refresh recent messages.");
                println!("-- '/lm' - List messages from all topics.");
                println!("-- '/lt' - List active topics.");
                println!("-- '/st TOPIC' - Set the active topic.");
                println!("-- '/quit' - Disconnect and exit.");
            }
            "" => show_messages(&mut session).await,
            "/lm" => match session.get_all_messages().await {
                Ok(listing) => {
                    println!("-- Showing ALL recent messages:\n{listing}");
                }
                Err(e) => warn!(error = %e, "could not list messages"),
            },
            "/lt" => match session.get_topics().await {
                Ok(topics) => println!("-- Active topics:\n{topics}"),
                Err(e) => warn!(error = %e, "could not list topics"),
            },
            "/quit" => break,
            line if line.starts_with("/st ") => {
                let topic = line.trim_start_matches("/st ").trim();
                match session.set_topic(topic).await {
                    Ok(()) => println!("-- New topic set."),
                    Err(e) => println!("-- Failed to set new topic: {e}"),
                }
            }
            message => {
                if let Err(e) = session.send_message(message).await {
                    println!("-- Failed to send message: {e}");
                }
                show_messages(&mut session).await;
            }
        }
    }

    println!("-- Disconnecting...");
    session.close().await.ok();
    println!("-- Disconnected.");
    Ok(())
}

async fn show_messages(session: &mut ClientSession) {
    match session.get_messages().await {
        Ok(listing) => {
            println!("-- Recent messages ({}):", session.current_topic());
            print!("{listing}");
        }
        Err(e) => warn!(error = %e, "could not refresh messages"),
    }
}

async fn stress(
    host: String,
    port: u16,
    clients: usize,
    iterations: usize,
    step_ms: u64,
) -> Result<()> {
    let step = std::time::Duration::from_millis(step_ms);

    info!(clients, "opening sessions");
    let mut sessions = Vec::with_capacity(clients);
    for i in 0..clients {
        let mut session = ClientSession::new(
            host.clone(),
            port,
            "default",
            "default",
            format!("Anonymous{i}"),
        )?;
        session.open().await.with_context(|| format!("opening session {i}"))?;
        sessions.push(session);
        tokio::time::sleep(step).await;
    }

    info!(iterations, "running actions");
    for _ in 0..iterations {
        for (i, session) in sessions.iter_mut().enumerate() {
            session
                .send_message(&format!("test{i}"))
                .await
                .with_context(|| format!("sending from session {i}"))?;
            tokio::time::sleep(step).await;
        }
        for session in sessions.iter_mut() {
            session.get_all_messages().await?;
            tokio::time::sleep(step).await;
        }
    }

    info!("closing sessions");
    for mut session in sessions {
        session.close().await.ok();
        tokio::time::sleep(step).await;
    }
    println!("-- Stress run complete.");
    Ok(())
}
