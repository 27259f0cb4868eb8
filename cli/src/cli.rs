//! Command-line surface for the myFlix client.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use myflix_core::{
    AppContext, ClientConfig, Credentials, LoggingConfig, LoginForm, MovieListView, Notice,
    ProfileView, Registration, RegistrationForm, Route, Screen, ServiceError, UserPatch,
};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// myFlix CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "myflix", version, about = "Browse the myFlix catalog and manage favorites")]
pub struct Args {
    /// Config file path (toml/json). Missing file means defaults.
    #[arg(short, long, default_value = "myflix.toml")]
    pub config: PathBuf,

    /// Override the API base URL.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the session file.
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Log level override.
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account.
    Register {
        username: String,
        password: String,
        email: String,
        /// Birthday as YYYY-MM-DD.
        #[arg(long)]
        birthday: Option<NaiveDate>,
    },
    /// Log in and store the session.
    Login { username: String, password: String },
    /// End the session.
    Logout,
    /// List the catalog, marking favorites with `*`.
    Movies,
    /// Show one movie by title.
    Movie { title: String },
    /// Show a director by name.
    Director { name: String },
    /// Show a genre by name.
    Genre { name: String },
    /// Add a movie to favorites, or remove it if already there.
    Favorite { movie_id: String },
    /// Show the profile page.
    Profile,
    /// Edit profile fields.
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        birthday: Option<NaiveDate>,
    },
    /// List all users.
    Users,
    /// Delete the logged-in account.
    DeleteAccount,
}

/// Run the CLI with the given arguments.
pub fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load_or_default(&args.config)?;

    // Apply CLI overrides
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(path) = &args.session_file {
        config.session.path = Some(path.clone());
    }
    if config.session.path.is_none() {
        config.session.path = Some(default_session_file());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = Some(level.clone());
    }

    init_tracing(&config.logging);
    debug!(?config, "configuration loaded");

    let ctx = AppContext::from_config(&config);
    execute(&ctx, args.command)?;
    Ok(())
}

/// The CLI always persists the session so it survives between invocations.
fn default_session_file() -> PathBuf {
    std::env::temp_dir().join("myflix-session.json")
}

fn execute(ctx: &AppContext, command: Command) -> Result<(), ServiceError> {
    match command {
        Command::Register {
            username,
            password,
            email,
            birthday,
        } => {
            let registration = Registration {
                username,
                password,
                email,
                birthday,
            };
            report(
                RegistrationForm::new(ctx.clone()).submit(&registration),
                "Registration failed",
            )
        }
        Command::Login { username, password } => report(
            LoginForm::new(ctx.clone()).submit(&Credentials::new(username, password)),
            "Login failed",
        ),
        Command::Logout => {
            ctx.logout()?;
            println!("Logged out");
            Ok(())
        }
        Command::Movies => {
            let mut view = MovieListView::new(ctx.clone());
            match view.load()? {
                Screen::Ready(cards) => {
                    for card in cards {
                        let mark = if card.is_favorite { '*' } else { ' ' };
                        println!(
                            "{mark} {:<26} {:<28} {} / {}",
                            card.movie.id, card.movie.title, card.movie.genre.name,
                            card.movie.director.name
                        );
                    }
                    Ok(())
                }
                Screen::Redirect(route) => redirect(route),
            }
        }
        Command::Movie { title } => {
            let movie = ctx.api().get_movie(&title)?;
            println!("{} ({})", movie.title, movie.id);
            println!("  Genre:    {}", movie.genre.name);
            println!("  Director: {}", movie.director.name);
            println!("  {}", movie.description);
            Ok(())
        }
        Command::Director { name } => {
            let director = ctx.api().get_director(&name)?;
            let born = director.birth.as_deref().unwrap_or("?");
            match &director.death {
                Some(died) => println!("{} ({born}–{died})", director.name),
                None => println!("{} (born {born})", director.name),
            }
            println!("  {}", director.bio);
            Ok(())
        }
        Command::Genre { name } => {
            let genre = ctx.api().get_genre(&name)?;
            println!("{}: {}", genre.name, genre.description);
            Ok(())
        }
        Command::Favorite { movie_id } => report(
            MovieListView::new(ctx.clone()).toggle_favorite(&movie_id),
            "Could not update favorites",
        ),
        Command::Profile => {
            let mut view = ProfileView::new(ctx.clone());
            match view.load()? {
                Screen::Ready(profile) => {
                    println!("Username: {}", profile.user.username);
                    println!("Email:    {}", profile.user.email);
                    if let Some(birthday) = &profile.birthday {
                        println!("Birthday: {birthday}");
                    }
                    println!("Favorites:");
                    for movie in &profile.favorites {
                        println!("  {} ({})", movie.title, movie.id);
                    }
                    Ok(())
                }
                Screen::Redirect(route) => redirect(route),
            }
        }
        Command::Update {
            username,
            password,
            email,
            birthday,
        } => {
            let patch = UserPatch {
                username,
                password,
                email,
                birthday,
                favorite_movie_ids: None,
            };
            let mut view = ProfileView::new(ctx.clone());
            if let Screen::Redirect(route) = view.load()? {
                return redirect(route);
            }
            report(view.update(&patch), "Update failed")
        }
        Command::Users => {
            for user in ctx.api().list_users()? {
                println!("{:<20} {}", user.username, user.email);
            }
            Ok(())
        }
        Command::DeleteAccount => {
            let mut view = ProfileView::new(ctx.clone());
            if let Screen::Redirect(route) = view.load()? {
                return redirect(route);
            }
            report(view.delete_account(), "Could not delete account")
        }
    }
}

fn report(result: Result<Notice, ServiceError>, context: &str) -> Result<(), ServiceError> {
    match result {
        Ok(notice) => {
            println!("{notice}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", Notice::failure(context, &err));
            Err(err)
        }
    }
}

fn redirect(route: Route) -> Result<(), ServiceError> {
    debug!(?route, "redirected");
    eprintln!("Not logged in. Run `myflix login <username> <password>` first.");
    Err(ServiceError::NotLoggedIn)
}

fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("warn");
    let mut filter_str = base_level.to_string();

    for (module, level) in &config.filters {
        filter_str.push(',');
        filter_str.push_str(module);
        filter_str.push('=');
        filter_str.push_str(level);
    }

    let filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.format.as_deref().unwrap_or("pretty") {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        "compact" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init(),
    }
}
