mod conn;
mod consts;
mod player;
mod room;
mod timer;
mod types;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use prompts::PromptBank;

use crate::consts::{PORT_FROM, PORT_TO};
use crate::room::{GameConfig, Room, RoomReq};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Port to bind; the first free port in the default range when omitted.
    #[clap(short, long)]
    port: Option<u16>,

    /// Newline-delimited file of prompts not yet handed out.
    #[clap(long, default_value = "unused_prompts.txt")]
    prompts: String,

    /// File that drawn prompts get appended to.
    #[clap(long, default_value = "used_prompts.txt")]
    used_prompts: String,

    #[clap(long)]
    drawing_secs: Option<u32>,
    #[clap(long)]
    guessing_secs: Option<u32>,
    #[clap(long)]
    voting_secs: Option<u32>,
    #[clap(long)]
    min_players: Option<usize>,
    #[clap(long)]
    max_players: Option<usize>,
    #[clap(long)]
    rounds: Option<u32>,

    /// Store explicitly submitted blank guesses instead of rejecting them.
    #[clap(long)]
    accept_blank_guesses: bool,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        let mut config = GameConfig::default();
        if let Some(secs) = self.drawing_secs {
            config.drawing_secs = secs;
        }
        if let Some(secs) = self.guessing_secs {
            config.guessing_secs = secs;
        }
        if let Some(secs) = self.voting_secs {
            config.voting_secs = secs;
        }
        if let Some(n) = self.min_players {
            config.min_players = n;
        }
        if let Some(n) = self.max_players {
            config.max_players = n;
        }
        if let Some(n) = self.rounds {
            config.rounds = n;
        }
        config.accept_blank_guesses = self.accept_blank_guesses;
        config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let prompt_bank = match PromptBank::load(&args.prompts, &args.used_prompts).await {
        Ok(bank) => bank,
        Err(err) => {
            error!(%err, "failed to load the prompt bank");
            std::process::exit(1);
        }
    };
    info!(prompts = prompt_bank.len(), "prompt bank loaded");

    let listener = match bind_available(args.port).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, "failed to bind a listen port");
            std::process::exit(1);
        }
    };
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    let mut room = Room::new(args.game_config(), prompt_bank);
    let room_tx = room.handle();
    tokio::spawn(async move { room.run().await });

    while let Ok((stream, addr)) = listener.accept().await {
        let room_tx = room_tx.clone();
        tokio::spawn(async move {
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws_stream) => {
                    info!(%addr, "websocket connected");
                    let _ = room_tx.send(RoomReq::Connect { ws_stream }).await;
                }
                Err(err) => warn!(%addr, %err, "websocket handshake failed"),
            }
        });
    }
}

/// Binds the requested port, or scans the default range for a free one.
async fn bind_available(preferred: Option<u16>) -> std::io::Result<TcpListener> {
    if let Some(port) = preferred {
        return TcpListener::bind(("0.0.0.0", port)).await;
    }
    let mut last_err = None;
    for port in PORT_FROM..PORT_TO {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrInUse, "no free port in range")
    }))
}
