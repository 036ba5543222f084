//! `tasklist`: manage todo lists from the command line.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/tasklist/config.toml`).
//!
//! ```bash
//! # Sign in once and keep the token around
//! export TASKLIST_TOKEN=$(tasklist signin --email ann@example.com --password pw)
//!
//! tasklist lists
//! tasklist task-add --title "Buy milk" "2%" --due 2024-05-01T18:00
//! tasklist tasks --filter incomplete
//!
//! # Against a local tasklist-server
//! tasklist --base-url http://127.0.0.1:8080 lists
//! ```

use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use clap::{CommandFactory, Parser};
use tracing_appender::non_blocking::WorkerGuard;

use tasklist::api::ApiError;
use tasklist::api::http::HttpApi;
use tasklist::client::TodoClient;
use tasklist::config::{CliArgs, ClientConfig, Command};
use tasklist::due::{self, DueError};
use tasklist::session::Session;
use tasklist::store::tasks::{NewTask, TaskUpdate};
use tasklist::store::{FetchOutcome, StoreError};
use tasklist_proto::{ListId, Task, TaskId};

/// Errors reported to the user before exiting.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Due(#[from] DueError),

    #[error("not signed in: run `tasklist signin` and pass the token via --token or TASKLIST_TOKEN")]
    NotSignedIn,

    #[error("there are no lists yet: create one with `tasklist list-add`")]
    NoLists,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(command) = cli.command else {
        let _ = CliArgs::command().print_help();
        return ExitCode::SUCCESS;
    };

    tracing::info!(base_url = %config.base_url, "tasklist starting");
    match run(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs go to a file so they never mix with command output. Returns a
/// [`WorkerGuard`] that must be held until shutdown to flush buffered
/// entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasklist.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: ClientConfig) -> Result<(), CliError> {
    let session = config
        .token
        .clone()
        .map_or_else(Session::new, Session::with_token);
    let api = HttpApi::with_timeout(&config.base_url, session.clone(), config.timeout)?;
    let client = TodoClient::with_titles(api, session, config.titles);

    match command {
        Command::Signin { email, password } => {
            client.sign_in(&email, &password).await?;
            print_token(&client);
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            client.sign_up(&name, &email, &password).await?;
            print_token(&client);
        }
        Command::Whoami => {
            require_session(&client)?;
            println!("{}", client.user().await?.name);
        }
        Command::Lists => {
            require_session(&client)?;
            client.fetch_lists(false).await?;
            for list in client.lists().unwrap_or_default() {
                match list.detail.as_deref().filter(|d| !d.is_empty()) {
                    Some(detail) => println!("{}\t{}\t{detail}", list.id, list.title),
                    None => println!("{}\t{}", list.id, list.title),
                }
            }
        }
        Command::ListAdd { title, detail } => {
            let id = client.create_list(&title, detail.as_deref()).await?;
            println!("{id}");
        }
        Command::ListEdit { id, title, detail } => {
            client
                .update_list(&ListId::new(id), &title, detail.as_deref())
                .await?;
        }
        Command::ListRm { id } => {
            client.delete_list(&ListId::new(id)).await?;
        }
        Command::Tasks { list, filter } => {
            open_list(&client, list).await?;
            let tasks = client.filtered_tasks(filter);
            for task in &tasks {
                print_task(task);
            }
            println!("{} incomplete", client.incomplete_count());
        }
        Command::TaskAdd {
            list,
            title,
            detail,
            due,
            done,
        } => {
            open_list(&client, list).await?;
            let mut new = NewTask::new(detail).done(done);
            new.title = title;
            if let Some(due) = due {
                new = new.limit(due::parse_local_input(&due)?);
            }
            let id = client.create_task(new).await?;
            println!("{id}");
        }
        Command::TaskDone { list, id, undo } => {
            open_list(&client, list).await?;
            client
                .update_task(TaskUpdate::new(TaskId::new(id)).done(!undo))
                .await?;
        }
        Command::TaskEdit {
            list,
            id,
            title,
            detail,
            due,
            no_due,
        } => {
            open_list(&client, list).await?;
            let mut update = TaskUpdate::new(TaskId::new(id));
            update.title = title;
            update.detail = detail;
            if no_due {
                update = update.limit(None);
            } else if let Some(due) = due {
                update = update.limit(Some(due::parse_local_input(&due)?));
            }
            let task = client.update_task(update).await?;
            print_task(&task);
        }
        Command::TaskRm { list, id } => {
            open_list(&client, list).await?;
            client.delete_task(&TaskId::new(id)).await?;
        }
    }
    Ok(())
}

fn require_session(client: &TodoClient<HttpApi>) -> Result<(), CliError> {
    if client.session().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotSignedIn)
    }
}

/// Makes `list` (or the first list) current and loads its tasks.
async fn open_list(client: &TodoClient<HttpApi>, list: Option<String>) -> Result<(), CliError> {
    require_session(client)?;
    if let Some(id) = list {
        client.select_list(ListId::new(id)).await?;
        return Ok(());
    }
    if client.fetch_lists(false).await? == FetchOutcome::NoSession {
        return Err(CliError::NotSignedIn);
    }
    if client.current_list_id().is_none() {
        return Err(CliError::NoLists);
    }
    client.fetch_tasks(false).await?;
    Ok(())
}

fn print_token(client: &TodoClient<HttpApi>) {
    if let Some(token) = client.session().token() {
        println!("{token}");
    }
}

fn print_task(task: &Task) {
    let mark = if task.done { "x" } else { " " };
    let mut line = format!("[{mark}] {}\t{}", task.id, task.title);
    if let Some(limit) = task.limit {
        let remaining = due::time_remaining(limit, Utc::now());
        line.push_str(&format!("\t{} ({remaining})", due::format_display(limit)));
    }
    println!("{line}");
}
