use anyhow::{Context, Result};
use dialoguer::Password;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use h2petrons_client::auth::SqliteTokenStore;
use h2petrons_client::config::{self, Command, LogFormat};
use h2petrons_client::models::RegisterRequest;
use h2petrons_client::transport::ReqwestTransport;
use h2petrons_client::{ApiClient, ApiError, RequestOptions, SessionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = config::Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level; stdout is reserved for output
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    tracing::debug!(
        api_url = %config.api_base_url,
        token_db = %config.token_db_file.display(),
        "Configuration loaded"
    );

    let store = Arc::new(SqliteTokenStore::open(&config.token_db_file)?);
    let transport = Arc::new(ReqwestTransport::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    let api = Arc::new(ApiClient::new(&config.api_base_url, transport, store)?);
    let session = SessionManager::new(api);

    run(command, &session).await
}

async fn run(command: Command, session: &SessionManager) -> Result<()> {
    let api = session.api();

    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => Password::new()
                    .with_prompt("Password")
                    .interact()
                    .context("Failed to read password")?,
            };
            let user = session.login(&username, &password).await?;
            print_json(&user)?;
        }

        Command::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .context("Failed to read password")?,
            };
            let request = RegisterRequest {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            let user = session.register(&request).await?;
            print_json(&user)?;
        }

        Command::Logout => {
            session.logout().await;
            eprintln!("Logged out");
        }

        Command::Whoami => match session.check_auth_status().await {
            Some(user) => {
                print_json(&json!({
                    "user": user,
                    "ui": session.visibility().await,
                }))?;
            }
            None => anyhow::bail!("Not logged in"),
        },

        Command::Status => {
            print_json(&json!({
                "api_url": api.base_url(),
                "authenticated": api.is_authenticated().await,
                "has_refresh_token": api.auth_manager().has_refresh_token().await,
            }))?;
        }

        Command::Get { path, query } => {
            let path = if path.starts_with('/') {
                path
            } else {
                format!("/{}", path)
            };
            let response = api.send(&path, RequestOptions::get().query(query)).await?;

            if !response.is_success() {
                return Err(ApiError::from_response(&response, "Request failed").into());
            }

            match response.json::<serde_json::Value>() {
                Ok(body) => print_json(&body)?,
                Err(_) => println!("{}", response.text()),
            }
        }

        Command::Research(list) => print_json(&api.list_research(&list.to_query()).await?)?,
        Command::News(list) => print_json(&api.list_news(&list.to_query()).await?)?,
        Command::Events(list) => print_json(&api.community_events(&list.to_query()).await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
