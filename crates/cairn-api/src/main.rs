//! Cairn entry point.
//!
//! Binary name: `cairn`. `cairn serve` runs the HTTP server; `cairn
//! chat` is the terminal client against a running server.

mod cli;
mod http;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, otel } => {
            if let Err(e) = cairn_observe::tracing_setup::init_tracing(otel) {
                eprintln!("warning: tracing init failed: {e}");
            }

            let state = AppState::init().await?;

            if let Some(token) = cli::account::ensure_local_account(&state.db_pool).await? {
                println!();
                println!(
                    "  {} API token created (save it -- only its hash is stored):",
                    console::style("🔑").bold()
                );
                println!();
                println!("  {}", console::style(&token).yellow().bold());
                println!();
            }

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} cairn listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {} database: {}",
                console::style("·").dim(),
                console::style(state.database_path().display()).dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let tracker = state.pipeline.tracker().clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            // Let detached completion writes finish before exit.
            tracker.close();
            tracker.wait().await;
            cairn_observe::tracing_setup::shutdown_tracing();

            println!("\n  Server stopped.");
        }

        Commands::Chat {
            server,
            token,
            conversation,
            domain,
            discovery,
        } => {
            cli::chat::run(server, token, conversation, domain, discovery).await?;
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
