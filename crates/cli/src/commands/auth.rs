//! Session commands.

use std::io::{BufRead, Write};

use secrecy::SecretString;
use smart_parking_client::{ApiClient, Registration};

use super::{CommandError, require_login};

/// Read a line from stdin after writing `prompt` to stderr.
#[allow(clippy::print_stderr)]
fn prompt(prompt: &str) -> Result<SecretString, CommandError> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub async fn login(
    client: &ApiClient,
    username: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => prompt("Password: ")?,
    };

    let user = client.login(username, &password).await?;
    tracing::info!(username = %user.username, "Logged in");
    println!(
        "Logged in as {}{}",
        user.username,
        if user.is_admin() { " (staff)" } else { "" }
    );
    Ok(())
}

pub async fn logout(client: &ApiClient) {
    client.logout().await;
    println!("Logged out.");
}

pub fn whoami(client: &ApiClient) -> Result<(), CommandError> {
    require_login(client)?;
    let user = client.session().user().ok_or(CommandError::NotLoggedIn)?;
    println!("{}", user.username);
    if !user.email.is_empty() {
        println!("  email: {}", user.email);
    }
    println!("  admin: {}", user.is_admin());
    Ok(())
}

pub async fn register(
    client: &ApiClient,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<(), CommandError> {
    let (password, password_confirmation) = match password {
        Some(password) => (
            SecretString::from(password.clone()),
            SecretString::from(password),
        ),
        None => (prompt("Password: ")?, prompt("Confirm password: ")?),
    };

    let registration = Registration {
        username,
        email,
        password,
        password_confirmation,
    };

    match client.register(&registration).await {
        Ok(_) => {
            println!(
                "Account {} created. Log in with `parking login {}`.",
                registration.username, registration.username
            );
            Ok(())
        }
        Err(e) => {
            if let Some(fields) = e.field_errors() {
                for (field, messages) in fields {
                    for message in messages {
                        println!("  {field}: {message}");
                    }
                }
            }
            Err(e.into())
        }
    }
}

pub async fn health(client: &ApiClient) -> Result<(), CommandError> {
    let status = client.test_connection().await;
    if status.connected {
        println!(
            "Connected to {} ({})",
            status.backend_url,
            status.status.as_deref().unwrap_or("unknown")
        );
    } else {
        println!(
            "Cannot reach {}: {}",
            status.backend_url,
            status.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
