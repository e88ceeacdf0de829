//! `hotbed dev`: serve the project with hot updates.
//!
//! Loads the layered configuration, binds the HTTP server, watches the root
//! and turns every file event into an update decision until Ctrl+C.

use crate::cli::DevArgs;
use crate::dev::{DevState, FileWatcher, SharedState, build_router, find_available_port};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use hotbed_config::{load_dev_config, search_for_workspace_root};
use hotbed_core::FileEvent;
use std::time::{Duration, Instant};
use tokio::signal;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Execute the dev command.
pub async fn execute(args: DevArgs) -> Result<()> {
    let started = Instant::now();

    let config = load_dev_config(&args.root, &args.overrides())?;
    let workspace_root = search_for_workspace_root(&config.root, config.workspace_root_depth);
    tracing::debug!(
        root = %config.root.display(),
        workspace = %workspace_root.display(),
        "configuration loaded"
    );

    let listener = find_available_port(&config.host, config.port)?;
    listener
        .set_nonblocking(true)
        .context("failed to configure the server socket")?;
    let listener = tokio::net::TcpListener::from_std(listener)
        .context("failed to hand the server socket to tokio")?;
    let address = listener.local_addr()?;
    let server_url = format!("http://{}:{}", config.host, address.port());

    let state = DevState::new(config, workspace_root)?.shared();

    let (watcher, mut change_rx) = FileWatcher::new(
        state.config.root.clone(),
        state.config.watch_ignore.clone(),
        state.config.debounce_ms,
    )?;

    let app = build_router(state.clone());
    let mut server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    ui::print_banner(&server_url, watcher.root(), started.elapsed());
    if state.config.open {
        open_browser(&server_url);
    }

    loop {
        tokio::select! {
            Some(event) = change_rx.recv() => {
                handle_file_event(&state, &event);
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                break;
            }

            joined = &mut server_handle => {
                state.server.shutdown();
                return match joined {
                    Ok(Ok(())) => Err(CliError::Server("server stopped unexpectedly".into())),
                    Ok(Err(e)) => Err(CliError::Server(e.to_string())),
                    Err(e) => Err(CliError::Server(format!("server task failed: {e}"))),
                };
            }
        }
    }

    // Closing every client ends the open event streams.
    state.server.shutdown();
    drop(watcher);
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle)
        .await
        .is_err()
    {
        server_handle.abort();
    }

    ui::success("Development server stopped");
    Ok(())
}

/// Feed one debounced event to the module server and report the outcome.
fn handle_file_event(state: &SharedState, event: &FileEvent) {
    let shown = event
        .path
        .strip_prefix(state.root())
        .unwrap_or(&event.path)
        .display()
        .to_string();

    let decision = state.server.handle_file_event(event);
    match ui::describe_decision(&decision) {
        Some(summary) => ui::success(&format!("{shown}: {summary}")),
        None => ui::debug(&format!("{shown}: not used by any module")),
    }
}

/// Open the server URL in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}
