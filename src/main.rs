use std::sync::Arc;

use assessly::console::{self, CommandError, ConsoleCommand};
use assessly::{AuthSignal, HttpSyncBackend, SessionController, StaticCredentials, SyncConfig};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assessly", about = "Assessly session gate and identity sync console")]
struct Cli {
    /// Backend base URL; overrides `ASSESSLY_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token the stand-in provider hands out on each sync.
    #[arg(long, env = "ASSESSLY_SESSION_TOKEN")]
    session_token: Option<String>,

    /// Location requested at startup.
    #[arg(long, default_value = "/")]
    path: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SyncConfig::from_env().expect("invalid sync configuration");
    if let Some(api_url) = cli.api_url.as_deref() {
        config = config.with_api_url(api_url).expect("invalid --api-url");
    }
    let backend = HttpSyncBackend::new(&config).expect("sync client init failed");
    tracing::info!(endpoint = backend.endpoint(), "identity sync endpoint configured");

    let credentials = StaticCredentials::new(cli.session_token);
    let controller = SessionController::new(Arc::new(credentials), Arc::new(backend), config.request_timeout);

    let signal = AuthSignal::new();
    let (nav_tx, nav_rx) = mpsc::channel(16);
    let (updates_tx, mut updates_rx) = watch::channel(controller.snapshot());
    let status_rx = updates_tx.subscribe();
    let driver = tokio::spawn(controller.run(signal.subscribe(), nav_rx, updates_tx));

    let printer_auth = signal.subscribe();
    let printer = tokio::spawn(async move {
        while updates_rx.changed().await.is_ok() {
            let update = updates_rx.borrow_and_update().clone();
            let identity = printer_auth.borrow().identity().cloned();
            println!("{}", console::render_update(&update, identity.as_ref()));
        }
    });

    let _ = nav_tx.send(cli.path).await;
    // No persisted provider session: resolve the bootstrap state as signed out.
    signal.sign_out();

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match console::parse_command(&line) {
            Ok(ConsoleCommand::SignIn(identity)) => {
                if let Err(e) = signal.sign_in(identity) {
                    eprintln!("{e}");
                }
            }
            Ok(ConsoleCommand::SignOut) => {
                signal.sign_out();
            }
            Ok(ConsoleCommand::Open(path)) => {
                if nav_tx.send(path).await.is_err() {
                    break;
                }
            }
            Ok(ConsoleCommand::Status) => {
                let update = status_rx.borrow().clone();
                let identity = signal.current().identity().cloned();
                println!("{}", console::render_update(&update, identity.as_ref()));
            }
            Ok(ConsoleCommand::Help) => println!("{}", console::HELP),
            Ok(ConsoleCommand::Quit) => break,
            Err(CommandError::Empty) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    drop(signal);
    let _ = driver.await;
    let _ = printer.await;
}
