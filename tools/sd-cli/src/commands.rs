//! Subcommand handlers.

use anyhow::{bail, Result};
use serde_json::Value;

use sd_session::{
    DirectoryResource, GateDecision, Navigator, ProfileForm, RegistrationForm, Session,
    SessionService,
};

use crate::Command;

/// Terminal stand-in for view navigation: tells the user where to go.
pub struct CliNavigator;

impl Navigator for CliNavigator {
    fn navigate(&self, path: &str) {
        eprintln!("Session expired. Sign in again to continue (login view: {}).", path);
        eprintln!("  sd-cli login --email <EMAIL>");
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_session(session: &Session) {
    println!("{} <{}>", session.full_name(), session.email());
    println!("  role: {}", session.role());
    if let Some(city) = session.city() {
        println!("  city: {}", city);
    }
}

pub async fn run(service: &SessionService, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = service.login(&email, &password).await?;
            println!("Signed in as {} ({})", session.full_name(), session.role());
            println!("Continue at {}", service.take_return_to());
        }
        Command::Register {
            full_name,
            email,
            password,
            confirm_password,
            city,
        } => {
            let form = RegistrationForm {
                full_name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                city,
            };
            let session = service.register(form).await?;
            println!("Account created. Signed in as {}", session.full_name());
        }
        Command::Logout => {
            service.logout();
            println!("Signed out");
        }
        Command::Whoami { refresh } => {
            let session = if refresh {
                Some(service.refresh_profile().await?)
            } else {
                service.current_session()
            };
            match session {
                Some(session) if session.is_authenticated() => print_session(&session),
                _ => println!("Not signed in"),
            }
        }
        Command::Status => {
            print_json(&serde_json::to_value(service.status())?)?;
        }
        Command::UpdateProfile {
            full_name,
            email,
            city,
            password,
            confirm_password,
        } => {
            let Some(current) = service.current_session() else {
                bail!("not signed in");
            };
            let password = password.unwrap_or_default();
            let form = ProfileForm {
                full_name: full_name.unwrap_or_else(|| current.full_name().to_string()),
                email: email.unwrap_or_else(|| current.email().to_string()),
                city: city
                    .or_else(|| current.city().map(str::to_string))
                    .unwrap_or_default(),
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
            };
            let session = service.update_profile_form(form).await?;
            println!("Profile updated");
            print_session(&session);
        }
        Command::Access { path } => match service.guard_path(&path) {
            GateDecision::Render => println!("render {}", path),
            GateDecision::Redirect { to, return_to } => {
                println!("redirect {} (return to {})", to, return_to)
            }
        },
        Command::Services { category, search } => {
            let mut filters = Vec::new();
            if let Some(category) = category.as_deref() {
                filters.push(("category", category));
            }
            if let Some(search) = search.as_deref() {
                filters.push(("search", search));
            }
            let services = service
                .client()
                .list(DirectoryResource::Services, &filters)
                .await?;
            print_json(&services)?;
        }
        Command::Categories => {
            let categories = service
                .client()
                .list(DirectoryResource::Categories, &[])
                .await?;
            print_json(&categories)?;
        }
        Command::Health => {
            print_json(&service.client().health_check().await?)?;
        }
    }
    Ok(())
}
