//! ultimate-todo - command-line client for the Ultimate Todo service
//!
//! Usage:
//!   ultimate-todo login --email <email> --password <password>
//!   ultimate-todo tasks add "Buy milk" --priority high
//!   ultimate-todo tasks done <id>
//!   ultimate-todo stats

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};

use ultimate_todo::client::TodoClient;
use ultimate_todo::config::SyncConfig;
use ultimate_todo::domain::{
    EntityId, Goal, GoalChanges, GoalDraft, GoalType, Patch, Priority, Task, TaskChanges,
    TaskDraft, Timestamp,
};
use ultimate_todo::error::SyncError;
use ultimate_todo::remote::AuthClient;
use ultimate_todo::telemetry::{LogFormat, init_tracing};

#[derive(Parser)]
#[command(name = "ultimate-todo")]
#[command(about = "Tasks and goals, synchronized with the Ultimate Todo service")]
struct Cli {
    /// Override the service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Manage tasks
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// Manage goals
    #[command(subcommand)]
    Goals(GoalCommand),
    /// Show completion statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List tasks, newest first
    List {
        /// Only tasks that are not completed
        #[arg(long)]
        pending: bool,
    },
    /// Add a task
    Add(TaskFields),
    /// Toggle completion
    Done { id: EntityId },
    /// Change fields of a task
    Update {
        id: EntityId,
        #[command(flatten)]
        fields: TaskUpdateFields,
    },
    /// Delete a task
    Delete { id: EntityId },
}

#[derive(Args)]
struct TaskFields {
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    /// low | medium | high
    #[arg(long)]
    priority: Option<Priority>,
    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    due: Option<Timestamp>,
}

#[derive(Args)]
struct TaskUpdateFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    #[arg(long)]
    clear_description: bool,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    priority: Option<Priority>,
    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
    due: Option<Timestamp>,
    #[arg(long)]
    clear_due: bool,
}

#[derive(Subcommand)]
enum GoalCommand {
    /// List goals, newest first
    List,
    /// Add a goal
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// daily | weekly | monthly | yearly
        #[arg(long = "type")]
        goal_type: Option<GoalType>,
        /// Target date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        target: Option<Timestamp>,
    },
    /// Toggle completion
    Done { id: EntityId },
    /// Rename a goal
    Rename { id: EntityId, title: String },
    /// Delete a goal
    Delete { id: EntityId },
}

fn parse_date(value: &str) -> Result<Timestamp, String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|error| error.to_string())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or("invalid time of day")?;
    Ok(Timestamp::from_datetime(Utc.from_utc_datetime(&midnight)))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(LogFormat::from_env());
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config = config.with_api_url(api_url);
    }
    let client = TodoClient::from_config(&config);

    match cli.command {
        Commands::Login { email, password } => {
            let auth = AuthClient::new(&config.api_url, config.request_timeout);
            let token = auth.login(&email, &password).await.context("Login failed")?;
            client.sign_in(token)?;
            println!("Signed in as {email}");
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let auth = AuthClient::new(&config.api_url, config.request_timeout);
            let token = auth
                .register(&name, &email, &password)
                .await
                .context("Registration failed")?;
            client.sign_in(token)?;
            println!("Registered and signed in as {email}");
        }
        Commands::Logout => {
            client.sign_out()?;
            println!("Signed out");
        }
        Commands::Tasks(command) => {
            sync_before(&client).await;
            run_tasks(&client, command).await?;
        }
        Commands::Goals(command) => {
            sync_before(&client).await;
            run_goals(&client, command).await?;
        }
        Commands::Stats { json } => {
            sync_before(&client).await;
            let stats = client.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
    }
    Ok(())
}

/// Shows cached data first, then brings it up to date if possible.
async fn sync_before(client: &TodoClient) {
    let (tasks, goals) = client.hydrate();
    tracing::debug!(tasks, goals, "Loaded cached collections");
    if let Err(error) = client.refresh().await {
        match error {
            SyncError::AuthenticationRequired => {
                eprintln!("warning: not signed in, showing cached data");
            }
            other => eprintln!("warning: could not refresh ({other}), showing cached data"),
        }
    }
}

async fn run_tasks(client: &TodoClient, command: TaskCommand) -> Result<()> {
    let tasks = client.tasks();
    match command {
        TaskCommand::List { pending } => {
            let now = Timestamp::now();
            for task in tasks.snapshot().iter().filter(|task| !pending || !task.is_completed) {
                println!("{}", format_task(task, now));
            }
        }
        TaskCommand::Add(fields) => {
            let mut draft = TaskDraft::new(fields.title);
            if let Some(description) = fields.description {
                draft = draft.description(description);
            }
            if let Some(category) = fields.category {
                draft = draft.category(category);
            }
            if let Some(priority) = fields.priority {
                draft = draft.priority(priority);
            }
            if let Some(due) = fields.due {
                draft = draft.due_date(due);
            }
            let task = tasks.create(draft).await.map_err(settled)?;
            println!("Created {}", format_task(&task, Timestamp::now()));
        }
        TaskCommand::Done { id } => {
            let task = tasks.toggle(&id).await.map_err(settled)?;
            println!("{}", format_task(&task, Timestamp::now()));
        }
        TaskCommand::Update { id, fields } => {
            let changes = TaskChanges {
                title: fields.title,
                description: patch(fields.description, fields.clear_description),
                is_completed: None,
                category: fields.category.map_or(Patch::Keep, Patch::Set),
                priority: fields.priority,
                due_date: patch(fields.due, fields.clear_due),
            };
            if changes.is_empty() {
                bail!("Nothing to update");
            }
            let task = tasks.update(&id, changes).await.map_err(settled)?;
            println!("Updated {}", format_task(&task, Timestamp::now()));
        }
        TaskCommand::Delete { id } => {
            tasks.delete(&id).await.map_err(settled)?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

async fn run_goals(client: &TodoClient, command: GoalCommand) -> Result<()> {
    let goals = client.goals();
    match command {
        GoalCommand::List => {
            for goal in goals.snapshot() {
                println!("{}", format_goal(&goal));
            }
        }
        GoalCommand::Add {
            title,
            description,
            goal_type,
            target,
        } => {
            let mut draft = GoalDraft::new(title);
            draft.description = description;
            if let Some(goal_type) = goal_type {
                draft = draft.goal_type(goal_type);
            }
            if let Some(target) = target {
                draft = draft.target_date(target);
            }
            let goal = goals.create(draft).await.map_err(settled)?;
            println!("Created {}", format_goal(&goal));
        }
        GoalCommand::Done { id } => {
            let goal = goals.toggle(&id).await.map_err(settled)?;
            println!("{}", format_goal(&goal));
        }
        GoalCommand::Rename { id, title } => {
            let changes = GoalChanges {
                title: Some(title),
                ..GoalChanges::default()
            };
            let goal = goals.update(&id, changes).await.map_err(settled)?;
            println!("Updated {}", format_goal(&goal));
        }
        GoalCommand::Delete { id } => {
            goals.delete(&id).await.map_err(settled)?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

/// Tells the user when a refused change was undone locally.
fn settled(error: SyncError) -> anyhow::Error {
    if error.was_rolled_back() {
        anyhow::Error::new(error).context("Change refused; local copy rolled back")
    } else {
        error.into()
    }
}

fn patch<T>(value: Option<T>, clear: bool) -> Patch<T> {
    match (value, clear) {
        (Some(value), _) => Patch::Set(value),
        (None, true) => Patch::Clear,
        (None, false) => Patch::Keep,
    }
}

fn format_task(task: &Task, now: Timestamp) -> String {
    let mark = if task.is_completed { "x" } else { " " };
    let mut line = format!("[{mark}] {}  {} ({})", task.id, task.title, task.priority);
    if let Some(category) = &task.category {
        line.push_str(&format!(" #{category}"));
    }
    if let Some(due) = &task.due_date {
        line.push_str(&format!(" due {}", due.as_datetime().format("%Y-%m-%d")));
        if task.is_overdue(now) {
            line.push_str(" OVERDUE");
        }
    }
    line
}

fn format_goal(goal: &Goal) -> String {
    let mark = if goal.is_completed { "x" } else { " " };
    format!("[{mark}] {}  {} ({})", goal.id, goal.title, goal.goal_type)
}

fn print_stats(stats: &ultimate_todo::domain::Stats) {
    let tasks = &stats.tasks;
    println!(
        "Tasks: {} total, {} completed, {} pending, {} overdue ({:.0}% done)",
        tasks.total,
        tasks.completed,
        tasks.pending,
        tasks.overdue,
        tasks.completion_rate * 100.0
    );
    for (priority, count) in &tasks.by_priority {
        println!("  {priority}: {count}");
    }
    for (category, count) in &tasks.by_category {
        println!("  #{category}: {count}");
    }
    let goals = &stats.goals;
    println!(
        "Goals: {} total, {} completed ({:.0}% done)",
        goals.total,
        goals.completed,
        goals.completion_rate * 100.0
    );
    for (goal_type, count) in &goals.by_type {
        println!("  {goal_type}: {count}");
    }
}
