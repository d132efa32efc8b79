use std::{future::Future, path::Path, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AuthPage, AuthSession, FileUpload, HttpClientManager, NewPlacePage, PageError, PlacesContext,
    UpdatePlacePage, UserPlacesPage, UsersPage,
};
use shared::domain::{Place, PlaceId, UserId};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
struct Cli {
    /// Overrides the configured backend url.
    #[arg(long)]
    api_url: Option<String>,
    /// Acts as this user; pair with --token.
    #[arg(long, requires = "token")]
    user_id: Option<String>,
    #[arg(long, requires = "user_id")]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Users,
    Places {
        user_id: String,
    },
    Place {
        place_id: String,
    },
    Login {
        email: String,
        password: String,
    },
    Signup {
        name: String,
        email: String,
        password: String,
        #[arg(long)]
        image: PathBuf,
    },
    NewPlace {
        title: String,
        description: String,
        address: String,
        #[arg(long)]
        image: PathBuf,
    },
    UpdatePlace {
        place_id: String,
        title: String,
        description: String,
    },
    DeletePlace {
        place_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_settings();
    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let base_url = config::normalize_api_base_url(
        cli.api_url.as_deref().unwrap_or(&settings.api_base_url),
    )?;

    let session = AuthSession::new();
    if let (Some(user_id), Some(token)) = (cli.user_id, cli.token) {
        session.login(UserId::new(user_id), token, None);
    }
    let ctx = PlacesContext::new(base_url, session);

    match cli.command {
        Command::Users => {
            let mut page = UsersPage::new(&ctx);
            let http = page.http().clone();
            let users = until_interrupted(&http, page.load()).await?;
            for user in users {
                println!(
                    "{}\t{}\t{} place(s)",
                    user.id,
                    user.name,
                    user.places.count()
                );
            }
        }
        Command::Places { user_id } => {
            let mut page = UserPlacesPage::new(&ctx, UserId::new(user_id));
            let http = page.http().clone();
            let places = until_interrupted(&http, page.load()).await?;
            if places.is_empty() {
                println!("No places found. Maybe create one?");
            }
            for place in places {
                print_place(place);
            }
        }
        Command::Place { place_id } => {
            let mut page = UpdatePlacePage::new(&ctx, PlaceId::new(place_id));
            let http = page.http().clone();
            let place = until_interrupted(&http, page.load()).await?;
            print_place(place);
        }
        Command::Login { email, password } => {
            let page = AuthPage::new(&ctx);
            fill(
                &page,
                &[("email", email.as_str()), ("password", password.as_str())],
                |p, id, v| p.input(id, v),
            )?;
            let user_id = until_interrupted(page.http(), page.submit()).await?;
            print_session(&ctx, &user_id);
        }
        Command::Signup {
            name,
            email,
            password,
            image,
        } => {
            let mut page = AuthPage::new(&ctx);
            page.switch_mode();
            fill(
                &page,
                &[
                    ("name", name.as_str()),
                    ("email", email.as_str()),
                    ("password", password.as_str()),
                ],
                |p, id, v| p.input(id, v),
            )?;
            page.pick_image(Some(read_image(&image).await?));
            let user_id = until_interrupted(page.http(), page.submit()).await?;
            print_session(&ctx, &user_id);
        }
        Command::NewPlace {
            title,
            description,
            address,
            image,
        } => {
            let page = NewPlacePage::new(&ctx);
            fill(
                &page,
                &[
                    ("title", title.as_str()),
                    ("description", description.as_str()),
                    ("address", address.as_str()),
                ],
                |p, id, v| p.input(id, v),
            )?;
            page.pick_image(Some(read_image(&image).await?));
            let place = until_interrupted(page.http(), page.submit()).await?;
            print_place(&place);
        }
        Command::UpdatePlace {
            place_id,
            title,
            description,
        } => {
            let mut page = UpdatePlacePage::new(&ctx, PlaceId::new(place_id));
            let http = page.http().clone();
            until_interrupted(&http, page.load()).await?;
            fill(
                &page,
                &[("title", title.as_str()), ("description", description.as_str())],
                |p, id, v| p.input(id, v),
            )?;
            let next = until_interrupted(&http, page.submit()).await?;
            println!("updated; continue at {next}");
        }
        Command::DeletePlace { place_id } => {
            let mut page = UserPlacesPage::new(&ctx, ctx_user(&ctx)?);
            let http = page.http().clone();
            let message = until_interrupted(&http, page.delete_place(&PlaceId::new(place_id)))
                .await?;
            println!("{message}");
        }
    }

    Ok(())
}

/// Runs a page operation, tearing the page's requests down on Ctrl-C.
async fn until_interrupted<T>(
    http: &HttpClientManager,
    operation: impl Future<Output = Result<T, PageError>>,
) -> Result<T> {
    tokio::select! {
        result = operation => result.map_err(|err| match http.error() {
            Some(message) if !err.is_cancelled() => anyhow!(message),
            _ => anyhow!(err),
        }),
        _ = tokio::signal::ctrl_c() => {
            warn!("cli: interrupted, cancelling in-flight requests");
            http.teardown();
            Err(anyhow!("interrupted"))
        }
    }
}

/// Feeds each value through the page's validators and names every field
/// that was rejected.
fn fill<P>(
    page: &P,
    values: &[(&str, &str)],
    input: impl Fn(&P, &str, &str) -> bool,
) -> Result<()> {
    let rejected: Vec<&str> = values
        .iter()
        .filter(|(id, value)| !input(page, *id, *value))
        .map(|(id, _)| *id)
        .collect();
    if rejected.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("invalid value for: {}", rejected.join(", ")))
    }
}

fn ctx_user(ctx: &PlacesContext) -> Result<UserId> {
    ctx.session()
        .user_id()
        .ok_or_else(|| anyhow!("this command needs --user-id and --token"))
}

async fn read_image(path: &Path) -> Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image '{}'", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => return Err(anyhow!("only .jpg, .jpeg and .png images are accepted")),
    };
    Ok(FileUpload {
        filename,
        mime_type: Some(mime_type.to_string()),
        bytes,
    })
}

fn print_place(place: &Place) {
    println!("{}\t{}", place.id, place.title);
    println!("  {}", place.address);
    println!("  {}", place.description);
    if let Some(location) = place.location {
        println!("  at {:.6},{:.6}", location.lat, location.lng);
    }
}

fn print_session(ctx: &PlacesContext, user_id: &UserId) {
    let token = ctx.session().token().unwrap_or_default();
    println!("logged in as user_id={user_id}");
    println!("token={token}");
}
