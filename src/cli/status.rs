//! Status command implementation

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::{Config, Endpoints};
use crate::error::Result;
use crate::output::json;
use crate::session::{FileStorage, SessionStore};
use crate::token;

#[derive(Debug, Serialize)]
struct StatusReport {
    environment: String,
    api_url: String,
    auth_api_url: String,
    upload_api_url: String,
    session_path: String,
    logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    remembered: bool,
    /// Seconds until the token expires; absent for never-expiring tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
}

/// Run the status command to display session and configuration status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    let session_path = config.session_path()?;
    let session = SessionStore::init(std::sync::Arc::new(FileStorage::new(session_path.clone())));
    let endpoints = config.endpoints();
    let token = session.token();

    let report = StatusReport {
        environment: format!("{:?}", config.environment).to_lowercase(),
        api_url: endpoints.api_url.clone(),
        auth_api_url: endpoints.auth_api_url.clone(),
        upload_api_url: endpoints.upload_api_url.clone(),
        session_path: session_path.display().to_string(),
        logged_in: token.is_some(),
        user: session.user().map(|u| u.display_name().to_string()),
        remembered: session.is_persisted(),
        expires_in: token::seconds_until_expiry(token.as_deref()),
    };

    match opts.format {
        OutputFormat::Json => println!("{}", json::format_json(&report)?),
        OutputFormat::Table => print_report(&report, &endpoints),
    }
    Ok(())
}

fn print_report(report: &StatusReport, endpoints: &Endpoints) {
    println!("{}\n", "catatkeu Status".bold());

    println!("Environment: {}", report.environment.cyan());
    println!("Records API: {}", endpoints.api_url.cyan());
    println!("Auth API:    {}", endpoints.auth_api_url.cyan());
    println!("Upload API:  {}", endpoints.upload_api_url.cyan());
    println!();

    if !report.logged_in {
        println!("{} Not logged in", "✗".red());
        println!("  → Run 'catatkeu login --remember' to start a session");
        println!();
        return;
    }

    match &report.user {
        Some(user) => println!("{} Logged in as {}", "✓".green(), user.bold()),
        None => println!("{} Logged in", "✓".green()),
    }

    match report.expires_in {
        Some(secs) => println!(
            "{} Token valid (expires in {})",
            "✓".green(),
            format_remaining(secs)
        ),
        None => println!("{} Token has no expiry", "○".dimmed()),
    }

    if report.remembered {
        println!("{} Session stored at {}", "○".dimmed(), report.session_path);
    }
    println!();
}

/// `1h 5m`, or `42s` under a minute
fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        return format!("{}s", secs);
    }
    format!("{}h {}m", secs / 3600, (secs / 60) % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(42), "42s");
        assert_eq!(format_remaining(3_900), "1h 5m");
        assert_eq!(format_remaining(59 * 60), "0h 59m");
        assert_eq!(format_remaining(-5), "0s");
    }
}
