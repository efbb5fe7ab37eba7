//! Session watch command

use std::sync::Arc;

use colored::Colorize;
use tokio::sync::Notify;

use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::client::SESSION_EXPIRED_MESSAGE;
use crate::error::Result;
use crate::session::SessionWatchdog;
use crate::token;

/// Block until the session expires or Ctrl-C, logging out on expiry.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;

    let Some(secs) = token::seconds_until_expiry(ctx.session.token().as_deref()) else {
        println!("{} Token has no expiry, nothing to watch", "○".dimmed());
        return Ok(());
    };

    let expired = Arc::new(Notify::new());
    let watchdog = SessionWatchdog::new(ctx.session.clone());
    let signal = expired.clone();
    watchdog.watch(move || signal.notify_one());

    if secs > 0 {
        println!("Watching session, expires in {}s (Ctrl-C to stop)", secs);
    }

    tokio::select! {
        _ = expired.notified() => {
            ctx.session.logout()?;
            ctx.client.gateway().set_token(None).await;
            println!("{} {}", "⚠".yellow(), SESSION_EXPIRED_MESSAGE);
        }
        _ = tokio::signal::ctrl_c() => {
            watchdog.stop();
            println!("Stopped watching");
        }
    }

    Ok(())
}
