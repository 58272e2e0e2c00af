use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use sirine_client::{
    ClientConfig, ClientError, Env, SirineClient,
    confirm::{ConfirmDialog, DialogOptions, DialogVariant, PasswordPrompt},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("terminal input failed: {0}")]
    Io(#[from] io::Error),
    #[error("prompt task failed: {0}")]
    Prompt(#[from] tokio::task::JoinError),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Parser, Debug)]
#[command(name = "sirine", about = "Sirine Go session client")]
struct Cli {
    /// Overrides SIRINE_API_BASE_URL.
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a NIP or e-mail address.
    Login {
        identifier: String,
        /// Password for non-interactive use. Without it the password is
        /// read from the terminal with echo off.
        #[arg(long, env = "SIRINE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, default_value_t = false)]
        remember_me: bool,
    },
    Logout {
        /// Skip the confirmation prompt.
        #[arg(long, short, default_value_t = false)]
        yes: bool,
    },
    /// Fetch the signed-in user from the server.
    Whoami,
    /// Show the locally stored session without contacting the server.
    Status,
    /// Show where a navigation to PATH ends up for the current session.
    Guard { path: String },
    ForgotPassword { nip_or_email: String },
    ResetPassword {
        token: String,
    },
    ChangePassword,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // 1. Configuration (fail-fast on missing production settings)
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let mut config = ClientConfig::load()?;
    if let Some(base) = cli.api_base_url {
        config.api_base_url = base;
    }

    // 2. Logging, format selected by environment
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sirine_client=info,sirine=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .init();
        }
    }

    tracing::debug!(env = ?config.env, api = %config.api_base_url, "Client starting");

    // 3. Client assembly (restores the persisted session)
    let client = SirineClient::from_config(config)?;

    match cli.command {
        Command::Login {
            identifier,
            password,
            remember_me,
        } => {
            let password = match password {
                Some(password) => password,
                None => ask_password("Password").await?,
            };
            let payload = client.auth.login(&identifier, &password, remember_me).await?;
            println!("Signed in as {} ({})", payload.user.full_name, payload.user.role);
            if payload.require_password_change {
                println!("Password change required before continuing.");
            }
            println!("Landing page: {}", client.navigate(client.auth.dashboard_route()).location);
        }
        Command::Logout { yes } => {
            if !yes && !ask_confirm("Keluar dari aplikasi?").await? {
                return Err(CliError::Cancelled);
            }
            client.auth.logout().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = client.auth.fetch_current_user().await?;
            println!("{}", serde_json::to_string_pretty(&user).map_err(ClientError::from)?);
        }
        Command::Status => {
            let session = client.session.snapshot();
            match &session.user {
                Some(user) if session.is_authenticated() => {
                    println!("Signed in: {} ({}, NIP {})", user.full_name, user.role, user.nip);
                    println!("Dashboard: {}", client.auth.dashboard_route());
                    if session.requires_password_change() {
                        println!("Password change required");
                    }
                }
                _ => println!("Not signed in"),
            }
        }
        Command::Guard { path } => {
            let navigation = client.navigate(&path);
            for hop in &navigation.hops {
                println!("{hop}");
            }
            let route = client.routes.resolve(&navigation.location);
            println!("=> {} [{}]", navigation.location, route.document_title());
        }
        Command::ForgotPassword { nip_or_email } => {
            let message = client.auth.forgot_password(&nip_or_email).await?;
            println!("{message}");
        }
        Command::ResetPassword { token } => {
            let new_password = ask_password("Password baru").await?;
            let message = client.auth.reset_password(&token, &new_password).await?;
            println!("{message}");
        }
        Command::ChangePassword => {
            let current = ask_password("Password saat ini").await?;
            let new_password = ask_password("Password baru").await?;
            let message = client.auth.change_password(&current, &new_password).await?;
            println!("{message}");
        }
    }

    Ok(())
}

/// Renders a confirmation dialog on the terminal.
async fn ask_confirm(message: &str) -> Result<bool, CliError> {
    let options = DialogOptions::new("Konfirmasi", message).variant(DialogVariant::Warning);
    let (responder, outcome) = ConfirmDialog::open(options);

    let answer = tokio::task::spawn_blocking(move || -> io::Result<()> {
        let options = responder.options();
        let line = read_line(&format!(
            "{}: {} [y/N] ",
            options.title, options.message
        ))?;
        responder.answer(matches!(line.trim(), "y" | "Y" | "ya" | "yes"));
        Ok(())
    });
    answer.await??;

    Ok(outcome.await.is_confirmed())
}

/// Renders a password prompt on the controlling terminal with echo off.
/// Blank input cancels.
async fn ask_password(label: &str) -> Result<String, CliError> {
    let (responder, outcome) = PasswordPrompt::open(DialogOptions::new(label, ""));

    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let line = rpassword::prompt_password(format!("{}: ", responder.options().title))?;
        responder.submit(line.trim_end_matches(['\r', '\n']));
        Ok(())
    })
    .await??;

    outcome.await.ok_or(CliError::Cancelled)
}

fn read_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
