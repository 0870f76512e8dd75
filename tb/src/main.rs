//! teamboard CLI entry point

use std::fs;
use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use teamboard::App;
use teamboard::cli::{Cli, Command, OutputFormat, get_log_path};
use teamboard::config::Config;
use teamboard::domain::TaskStatus;
use teamboard::events::EventStream;
use teamboard::resolver::TaskResolver;
use teamboard::service::{
    AssignTaskInput, CreateTaskInput, CreateTeamInput, MoveTaskInput, RegisterUserInput, UpdateTaskInput, UpdateTeamInput,
};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log.level.as_deref(), cli.log_stderr)
        .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Simulate { tasks, format }) => cmd_simulate(config, tasks, format).await,
        Some(Command::Config) => cmd_config(&config),
        None => cmd_simulate(config, 3, OutputFormat::Text).await,
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

/// Print every notification a stream yields until it ends; returns how many
fn watch<N>(mut stream: EventStream<N>, format: OutputFormat) -> JoinHandle<usize>
where
    N: Serialize + Send + 'static,
{
    tokio::spawn(async move {
        let label = stream.kind().to_string();
        let mut seen = 0;
        while let Some(notification) = stream.recv().await {
            seen += 1;
            let body = serde_json::to_string(&notification).unwrap_or_else(|e| format!("<unprintable: {}>", e));
            match format {
                OutputFormat::Text => println!("  {} {}", format!("[{}]", label).yellow(), body.dimmed()),
                OutputFormat::Json => println!("{{\"event\":\"{}\",\"payload\":{}}}", label, body),
            }
        }
        seen
    })
}

async fn cmd_simulate(config: Config, task_count: usize, format: OutputFormat) -> Result<()> {
    debug!(task_count, ?format, "cmd_simulate: called");
    let text = format == OutputFormat::Text;
    let app = App::new(config);

    // === Seed ===
    let setup = app.begin_request(None);
    let ann = app
        .users
        .register_user(
            &setup,
            RegisterUserInput {
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
            },
        )
        .await?;
    let bo = app
        .users
        .register_user(
            &setup,
            RegisterUserInput {
                name: "Bo".to_string(),
                email: "bo@example.com".to_string(),
            },
        )
        .await?;

    let as_ann = app.begin_request(Some(&ann.id));
    let core = app
        .teams
        .create_team(
            &as_ann,
            CreateTeamInput {
                name: "Core".to_string(),
                description: Some("Watched team".to_string()),
            },
        )
        .await?;
    let core = app
        .teams
        .update_team(
            &as_ann,
            UpdateTeamInput {
                id: core.id.clone(),
                assignees: vec![bo.id.clone()],
                ..Default::default()
            },
        )
        .await?;
    let other = app
        .teams
        .create_team(
            &as_ann,
            CreateTeamInput {
                name: "Other".to_string(),
                description: None,
            },
        )
        .await?;

    if text {
        println!("{} Watching team {} ({})", "✓".green(), core.name.cyan(), core.id.dimmed());
    }

    // === Watch ===
    let watchers = [
        watch(app.tasks.task_created(&core.id), format),
        watch(app.tasks.task_updated(&core.id), format),
        watch(app.tasks.task_deleted(&core.id), format),
    ];

    // === Mutate ===
    let due = (Utc::now() + ChronoDuration::days(7)).to_rfc3339();
    let mut created = Vec::new();
    for i in 0..task_count.max(1) {
        let assignee = if i % 2 == 0 { &ann.id } else { &bo.id };
        let task = app
            .tasks
            .create_task(
                &as_ann,
                CreateTaskInput {
                    title: format!("Task {}", i + 1),
                    description: None,
                    status: None,
                    due_date: due.clone(),
                    assigned_to: Some(assignee.clone()),
                    team_id: core.id.clone(),
                },
            )
            .await?;
        created.push(task);
    }

    // Not delivered to Core watchers
    app.tasks
        .create_task(
            &as_ann,
            CreateTaskInput {
                title: "Elsewhere".to_string(),
                due_date: due.clone(),
                team_id: other.id.clone(),
                ..Default::default()
            },
        )
        .await?;

    let first = &created[0];
    app.tasks
        .move_task(
            &as_ann,
            MoveTaskInput {
                id: first.id.clone(),
                status: TaskStatus::InProgress,
            },
        )
        .await?;
    app.tasks
        .update_task(
            &as_ann,
            UpdateTaskInput {
                id: first.id.clone(),
                description: Some("Picked up".to_string()),
                ..Default::default()
            },
        )
        .await?;
    app.tasks
        .assign_task(
            &as_ann,
            AssignTaskInput {
                id: first.id.clone(),
                assigned_to: Some(bo.id.clone()),
            },
        )
        .await?;
    if let Some(last) = created.last().filter(|_| created.len() > 1) {
        app.tasks.delete_task(&as_ann, &last.id).await?;
    }

    // === Resolve ===
    let query = app.begin_request(Some(&bo.id));
    let tasks = app.tasks.tasks_by_team(&query, &core.id, None).await?;
    let views = TaskResolver::new(&query).views(tasks).await?;
    let loaders = query.loaders();
    let memberships = app.teams.teams_for_actor(&query).await?;
    let assignees = app.users.assignees_by_team(&query, &core.id).await?;

    // Ends every stream so the watchers finish
    app.shutdown();
    let mut delivered = 0;
    for watcher in watchers {
        delivered += watcher.await.context("Watcher task failed")?;
    }

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "Board:".bold());
            for view in &views {
                let who = view.assigned_user.as_ref().map(|u| u.name.as_str()).unwrap_or("unassigned");
                println!("  {:<12} {:<12} {}", view.task.title, view.task.status.to_string(), who.cyan());
            }
            println!();
            for summary in &memberships {
                println!("  {} has {} member(s)", summary.team.name.cyan(), summary.member_count);
            }
            let names: Vec<&str> = assignees.iter().map(|a| a.name.as_str()).collect();
            println!("  Assignable in {}: {}", core.name, names.join(", "));
            println!();
            println!("Notifications delivered: {}", delivered.to_string().green());
            println!(
                "Bulk fetches: users={} teams={} tasks={} (for {} tasks)",
                loaders.users.dispatch_count(),
                loaders.teams.dispatch_count(),
                loaders.tasks.dispatch_count(),
                views.len()
            );
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "board": &views,
                "teams": &memberships,
                "assignees": &assignees,
                "delivered": delivered,
                "dispatches": {
                    "users": loaders.users.dispatch_count(),
                    "teams": loaders.teams.dispatch_count(),
                    "tasks": loaders.tasks.dispatch_count(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    info!(delivered, tasks = views.len(), "cmd_simulate: done");
    Ok(())
}
