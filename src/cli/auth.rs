//! Login and logout commands

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::client::AuthApi;
use crate::error::Result;

/// Run the login command
pub async fn login(
    opts: &GlobalOptions,
    username: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;

    let username = match username {
        Some(u) => u,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()?,
    };

    println!("{}", "Logging in...".cyan());
    let login = ctx.client.login(&username, &password).await?;

    let name = login
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| username.clone());
    ctx.session.login(login.token, login.user, remember)?;

    println!("{} Logged in as {}", "✓".green(), name.bold());
    if let Some(message) = login.message {
        println!("  {}", message.dimmed());
    }
    if remember {
        println!(
            "  Session saved to {}",
            ctx.config.session_path()?.display().to_string().cyan()
        );
    } else {
        println!(
            "  {}",
            "Session not remembered; pass --remember to keep it for later commands".dimmed()
        );
    }

    Ok(())
}

/// Run the logout command
pub async fn logout(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let was_logged_in = ctx.session.token().is_some();

    ctx.session.logout()?;
    ctx.client.gateway().set_token(None).await;

    if was_logged_in {
        println!("{} Logged out", "✓".green());
    } else {
        println!("{} No active session", "○".dimmed());
    }
    Ok(())
}
