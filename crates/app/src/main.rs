//! Portico - Student Portal Client - Main Entry Point
//!
//! Command line binary that wires the reqwest transport and the
//! file-backed session store into the API client.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use portico_application::{ApiClient, ClientConfig};
use portico_infrastructure::{FileTokenStore, ReqwestTransport};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "portico", version, about = "Student portal client", long_about = None)]
struct Cli {
    /// Base URL of the portal API
    #[arg(long, env = "PORTICO_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "PORTICO_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Session file (defaults to the user configuration directory)
    #[arg(long, env = "PORTICO_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and persist the session
    Login { username: String, password: String },
    /// Drop the stored session
    Logout,
    /// Show the student profile
    Profile,
    /// List library books
    Books {
        /// Filter by title or author
        #[arg(long)]
        search: Option<String>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one book
    Book { id: u64 },
    /// Borrow a book
    Borrow { id: u64 },
    /// Reserve a book
    Reserve { id: u64 },
    /// List active loans
    Loans,
    /// Return a borrowed book
    Return { loan_id: u64 },
    /// Renew a loan
    Renew { loan_id: u64 },
    /// List reservations
    Reservations,
    /// Cancel a reservation
    CancelReservation { reservation_id: u64 },
    /// List available courses
    Courses,
    /// List course registrations
    Registrations,
    /// Register for a course
    Register { course_id: u64 },
    /// Drop a course
    Drop { course_id: u64 },
    /// Show exam results
    Results,
    /// Show the class schedule
    Schedule,
    /// List notices
    Notices,
    /// List todos
    Todos,
    /// Create a todo from a JSON object
    CreateTodo { todo: String },
    /// Update a todo from a JSON object
    UpdateTodo { id: u64, updates: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing. Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        base_url = %cli.base_url,
        "portico v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = ClientConfig::new(&cli.base_url)?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }

    let session_file = match cli.session_file {
        Some(path) => path,
        None => FileTokenStore::default_path()
            .ok_or("no configuration directory available, pass --session-file")?,
    };

    let store = Arc::new(FileTokenStore::open(session_file).await);
    let transport = Arc::new(ReqwestTransport::new()?);
    let client = ApiClient::new(config, transport, store).with_session_expired_hook(|| {
        eprintln!("session expired, run `portico login` to sign in again");
    });

    match cli.command {
        Command::Login { username, password } => {
            let session = client.login(&username, &password).await?;
            let display_name = session
                .user
                .as_ref()
                .and_then(|user| user.get("username"))
                .and_then(Value::as_str)
                .unwrap_or(&username)
                .to_string();
            println!("logged in as {display_name}");
        }
        Command::Logout => {
            client.logout().await;
            println!("logged out");
        }
        Command::Profile => print_json(&client.student_profile().await?)?,
        Command::Books { search, category } => {
            let mut filters: Vec<(&str, &str)> = Vec::new();
            if let Some(search) = &search {
                filters.push(("search", search));
            }
            if let Some(category) = &category {
                filters.push(("category", category));
            }
            print_json(&client.books(&filters).await?)?;
        }
        Command::Book { id } => print_json(&client.book(id).await?)?,
        Command::Borrow { id } => print_json(&client.borrow_book(id).await?)?,
        Command::Reserve { id } => print_json(&client.reserve_book(id).await?)?,
        Command::Loans => print_json(&client.borrowed_books().await?)?,
        Command::Return { loan_id } => print_json(&client.return_book(loan_id).await?)?,
        Command::Renew { loan_id } => print_json(&client.renew_book(loan_id).await?)?,
        Command::Reservations => print_json(&client.my_reservations().await?)?,
        Command::CancelReservation { reservation_id } => {
            print_json(&client.cancel_reservation(reservation_id).await?)?;
        }
        Command::Courses => print_json(&client.courses().await?)?,
        Command::Registrations => print_json(&client.registered_courses().await?)?,
        Command::Register { course_id } => print_json(&client.register_course(course_id).await?)?,
        Command::Drop { course_id } => print_json(&client.drop_course(course_id).await?)?,
        Command::Results => print_json(&client.results().await?)?,
        Command::Schedule => print_json(&client.schedule().await?)?,
        Command::Notices => print_json(&client.notices().await?)?,
        Command::Todos => print_json(&client.todos().await?)?,
        Command::CreateTodo { todo } => {
            let todo: Value = serde_json::from_str(&todo)?;
            print_json(&client.create_todo(todo).await?)?;
        }
        Command::UpdateTodo { id, updates } => {
            let updates: Value = serde_json::from_str(&updates)?;
            print_json(&client.update_todo(id, updates).await?)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
