use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskboard::board::{AddTarget, Board, BoardState, ContainerId, DragEvent, NewTask, Outcome};
use taskboard::client::TaskStoreClient;
use taskboard::config::{ServerConfig, DEFAULT_PORT};
use taskboard::models::{CreateProjectInput, Priority, ProjectId, TaskId};
use taskboard::{api, db};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Daily task board with project backlogs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the task API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Show the board for a day
    Board {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Add a task to the viewed day, or to a backlog with --backlog
    Add {
        content: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        backlog: bool,
        #[arg(long)]
        project: Option<i64>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// Move a task to another container (today, inbox-null, inbox-<id>, ai-chat-zone)
    Move {
        task_id: i64,
        to: String,
        /// Source container; defaults to where the task currently is
        #[arg(long)]
        from: Option<String>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Flip a task's completion
    Toggle {
        task_id: i64,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Delete a task
    Delete {
        task_id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Turn freeform text into tasks for a day
    Dump {
        text: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Create a project
    Project {
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
    },
}

/// Initialize tracing with output to stderr (client commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "taskboard=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Client commands print the board on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(!serving);

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        None => serve(DEFAULT_PORT).await?,
        Some(Commands::Board { date }) => {
            let board = open_board(date).await?;
            print_board(board.state());
        }
        Some(Commands::Add {
            content,
            date,
            backlog,
            project,
            priority,
        }) => {
            let mut board = open_board(date).await?;
            let target = if backlog {
                AddTarget::Backlog
            } else {
                AddTarget::Today
            };
            let new_task = NewTask {
                priority,
                project_id: project.map(ProjectId),
                ..NewTask::new(content, target)
            };
            let outcome = board.add_task(new_task).await?;
            finish(&board, outcome);
        }
        Some(Commands::Move {
            task_id,
            to,
            from,
            date,
        }) => {
            let mut board = open_board(date).await?;
            let id = TaskId(task_id);
            let source = match from {
                Some(from) => from.parse()?,
                None => current_container(board.state(), id)?,
            };
            let event = DragEvent::new(source, to.parse()?, id);
            let outcome = board.drop_task(event).await?;
            finish(&board, outcome);
        }
        Some(Commands::Toggle { task_id, date }) => {
            let mut board = open_board(date).await?;
            let outcome = board.toggle_task(TaskId(task_id)).await?;
            finish(&board, outcome);
        }
        Some(Commands::Delete { task_id, yes, date }) => {
            let mut board = open_board(date).await?;
            let outcome = board
                .delete_task(TaskId(task_id), |task| yes || confirm(&task.content))
                .await?;
            finish(&board, outcome);
        }
        Some(Commands::Dump { text, date }) => {
            let mut board = open_board(date).await?;
            board.set_brain_dump_text(text);
            let outcome = board.submit_brain_dump().await?;
            if let Some(error) = board.state().brain_dump().error() {
                eprintln!("{}", error);
            }
            finish(&board, outcome);
        }
        Some(Commands::Project {
            name,
            color,
            duration,
        }) => {
            let mut board = open_board(None).await?;
            let input = CreateProjectInput {
                name,
                color,
                default_duration_minutes: duration,
            };
            let outcome = board.create_project(&input).await?;
            finish(&board, outcome);
        }
    }

    Ok(())
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    if config.api_key.is_none() {
        tracing::warn!("TASKBOARD_API_KEY not set, API is unauthenticated");
    }
    let app = api::create_router_with_config(db, &config);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("taskboard server listening on http://127.0.0.1:{}/api", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn open_board(date: Option<NaiveDate>) -> anyhow::Result<Board<TaskStoreClient>> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let mut board = Board::new(TaskStoreClient::from_env(), date);
    if !board.reload().await? {
        anyhow::bail!("could not load the board from {}", board.store().base_url());
    }
    Ok(board)
}

fn current_container(state: &BoardState, id: TaskId) -> anyhow::Result<ContainerId> {
    state
        .task(id)
        .and_then(|task| state.registry().container_of(task))
        .ok_or_else(|| anyhow::anyhow!("task {} is not on the board", id))
}

fn confirm(content: &str) -> bool {
    print!("Delete \"{}\"? [y/N] ", content);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn finish(board: &Board<TaskStoreClient>, outcome: Outcome) {
    match outcome {
        Outcome::Unchanged => println!("Nothing to do."),
        Outcome::ContextSet(context) => {
            println!("Chat context: #{} {}", context.task_id, context.title)
        }
        Outcome::Applied => print_board(board.state()),
        Outcome::Reconciled => {
            println!("The server rejected the change; showing its current state.");
            print_board(board.state());
        }
        Outcome::Diverged => {
            println!("The server rejected the change and could not be reloaded.");
            print_board(board.state());
        }
        Outcome::Failed => println!("The server rejected the request."),
        Outcome::Superseded => println!("Superseded by a newer change."),
        Outcome::Cancelled => println!("Cancelled."),
    }
}

fn print_board(state: &BoardState) {
    for view in state.containers() {
        let mut heading = format!("{} [{}]", view.label, view.id);
        if let Some(project) = view.project {
            heading.push_str(&format!(" {}%", project.stats.progress_percent));
            if project.stats.is_rusting {
                heading.push_str(" (rusting)");
            }
        }
        println!("{}", heading);

        if !view.expanded {
            println!("  ({} hidden)", view.tasks.len());
            continue;
        }
        for task in &view.tasks {
            let mark = if task.is_completed { "x" } else { " " };
            println!(
                "  [{}] #{} {} ({})",
                mark,
                task.id,
                task.content,
                task.priority.as_str()
            );
        }
    }
}
