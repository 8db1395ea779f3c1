//! authgate - terminal front end for the authgate session client.
//!
//! Signs in against the configured backend, keeps the session in the
//! configured durable store, and issues authenticated requests with it.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authgate_core::api::{Credentials, Registration};
use authgate_core::nav::LOGIN_PATH;
use authgate_core::{open_store, App, AuthOutcome, Config, MemoryNavigator, Navigator, Role};

const USAGE: &str = "\
Usage: authgate <command>

Commands:
  login [email]             Sign in and store the session
  register [email] [role]   Create an account (USER, ADMIN, STUDENT, UNIVERSITY)
  logout                    Clear the stored session
  whoami                    Show the signed-in user
  health                    Check whether the backend is up
  get <path>                GET an API path with the stored session";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // RUST_LOG wins; otherwise warn, or debug for the core when debugging
    let default = if debug { "warn,authgate_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let (file_layer, guard) = match std::env::var("AUTHGATE_LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "authgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_email(arg: Option<&String>, last: Option<&str>) -> Result<String> {
    if let Some(email) = arg {
        return Ok(email.clone());
    }
    let label = match last {
        Some(last) => format!("Email [{}]: ", last),
        None => "Email: ".to_string(),
    };
    let email = prompt(&label)?;
    match (email.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Email required"),
        (false, _) => Ok(email),
    }
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password required");
    }
    Ok(password)
}

fn report(outcome: AuthOutcome) {
    match outcome {
        AuthOutcome::Authenticated(user) => {
            println!("Signed in as {} <{}> ({})", user.full_name, user.email, user.role)
        }
        AuthOutcome::Superseded => println!("Sign-in was superseded"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load().context("Failed to load config")?;
    let _log_guard = init_tracing(config.debug);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let passphrase = std::env::var("AUTHGATE_PASSPHRASE").ok();
    let store = open_store(&config, passphrase.as_deref())?;
    let navigator = Arc::new(MemoryNavigator::default());
    let app = App::new(config.clone(), store, navigator.clone())?;
    info!(command = %command, "authgate starting");

    match command.as_str() {
        "login" => {
            let email = prompt_email(args.get(1), config.last_email.as_deref())?;
            let password = prompt_password()?;
            let outcome = app.actions.login(&Credentials::new(&email, password)).await?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            report(outcome);
        }
        "register" => {
            let email = prompt_email(args.get(1), None)?;
            let role = args
                .get(2)
                .map(|r| r.to_ascii_uppercase().parse::<Role>())
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            let full_name = prompt("Full name (optional): ")?;
            let password = prompt_password()?;
            let registration = Registration {
                email,
                password,
                full_name: (!full_name.is_empty()).then_some(full_name),
                role,
            };
            report(app.actions.register(&registration).await?);
        }
        "logout" => {
            app.actions.logout();
            println!("Signed out");
        }
        "whoami" => match app.session.user() {
            Some(user) if app.guard.check_auth() => {
                println!("{} <{}>", user.full_name, user.email);
                println!("Role: {}", user.role);
            }
            _ => println!("Not signed in"),
        },
        "health" => {
            if app.api.health().await {
                println!("{}: UP", config.api_url);
            } else {
                bail!("{}: DOWN", config.api_url);
            }
        }
        "get" => {
            let Some(path) = args.get(1) else {
                bail!("Usage: authgate get <path>");
            };
            match app.api.get::<serde_json::Value>(path).await {
                Ok(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                Err(e) if navigator.current_location() == LOGIN_PATH => {
                    bail!("{} (session cleared, run `authgate login`)", e)
                }
                Err(e) => return Err(e.into()),
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", command);
        }
    }

    Ok(())
}
