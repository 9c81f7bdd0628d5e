//! deskrelay CLI — tail and publish realtime helpdesk messages.
//!
//! Usage:
//! ```bash
//! # Tail notifications and a ticket's chat room
//! deskrelay listen --url wss://helpdesk.example.com/ws --token $JWT \
//!     --destination /topic/notifications --ticket 42
//!
//! # Send a chat message into a ticket room
//! deskrelay send --url wss://helpdesk.example.com/ws --token $JWT \
//!     --ticket 42 --sender agent-1 --content "on it"
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use deskrelay_client::{ClientConfig, ConnectionManager, NotificationObserver, WsTransport};
use deskrelay_core::destination;
use deskrelay_core::message::{ChatEvent, Notification};
use deskrelay_core::transport::StaticToken;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "listen" => cmd_listen(&args[2..]).await,
        "send" => cmd_send(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("deskrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("deskrelay {}", env!("CARGO_PKG_VERSION"));
    println!("Tail and publish realtime helpdesk messages\n");
    println!("USAGE:");
    println!("    deskrelay <COMMAND>\n");
    println!("COMMANDS:");
    println!("    listen     Connect and print incoming messages");
    println!("    send       Send a chat message into a ticket room");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("LISTEN FLAGS:");
    println!("    --url <URL>            Broker WebSocket URL        [required]");
    println!("    --token <JWT>          Bearer token                [required]");
    println!("    --destination <DEST>   Destination to subscribe    [repeatable]");
    println!("    --ticket <ID>          Follow a ticket's chat and status topics");
    println!("    --user <NAME>          Follow a user's notification queue\n");
    println!("SEND FLAGS:");
    println!("    --url, --token         As above                    [required]");
    println!("    --ticket <ID>          Target ticket               [required]");
    println!("    --sender <NAME>        Sender name                 [required]");
    println!("    --content <TEXT>       Message text                [required]");
}

struct PrintingObserver;

impl NotificationObserver for PrintingObserver {
    fn on_notification(&self, notification: &Notification) {
        println!(
            "[notification] {} {}",
            notification.kind.as_deref().unwrap_or("?"),
            serde_json::to_string(notification).unwrap_or_default()
        );
    }
}

async fn connect(url: &str, token: &str) -> Result<ConnectionManager, String> {
    let manager = ConnectionManager::new(
        Arc::new(WsTransport),
        Arc::new(StaticToken::new(token)),
        ClientConfig::new(url),
    );
    manager
        .connect(
            Arc::new(|| tracing::info!("connected")),
            Arc::new(|e| tracing::warn!(error = %e, "connection error")),
        )
        .await
        .map_err(|e| e.to_string())?;
    Ok(manager)
}

async fn cmd_listen(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let token = parse_flag(args, "--token").ok_or("--token is required")?;

    let mut destinations = parse_multi(args, "--destination");
    if let Some(ticket) = parse_flag(args, "--ticket") {
        let id: i64 = ticket.parse().map_err(|_| "--ticket must be a number")?;
        destinations.push(destination::ticket_chat(id));
        destinations.push(destination::ticket_status(id));
    }
    if let Some(user) = parse_flag(args, "--user") {
        destinations.push(destination::user_notifications(&user));
    }
    if destinations.is_empty() {
        destinations.push(destination::BROADCAST_NOTIFICATIONS.to_string());
    }

    let manager = connect(&url, &token).await?;
    manager.add_observer(Arc::new(PrintingObserver));

    for dest in &destinations {
        manager
            .subscribe(
                dest,
                Arc::new(|msg| println!("[{}] {:?}", msg.destination, msg.body)),
            )
            .map_err(|e| e.to_string())?;
        println!("Subscribed to {dest}");
    }

    println!("Listening — press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
    manager.disconnect();
    Ok(())
}

async fn cmd_send(args: &[String]) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let token = parse_flag(args, "--token").ok_or("--token is required")?;
    let ticket: i64 = parse_flag(args, "--ticket")
        .ok_or("--ticket is required")?
        .parse()
        .map_err(|_| "--ticket must be a number")?;
    let sender = parse_flag(args, "--sender").ok_or("--sender is required")?;
    let content = parse_flag(args, "--content").ok_or("--content is required")?;

    let manager = connect(&url, &token).await?;
    let message = ChatEvent::Chat { sender, content, timestamp: None };
    manager
        .send(&destination::chat_send(ticket), &message)
        .map_err(|e| e.to_string())?;
    println!("Sent to ticket {ticket}");
    manager.disconnect();
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn parse_multi(args: &[String], flag: &str) -> Vec<String> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| a.as_str() == flag)
        .filter_map(|(i, _)| args.get(i + 1).cloned())
        .collect()
}
