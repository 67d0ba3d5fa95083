//! CLI module for the plannr command-line interface.
//!
//! Provides subcommands for working against a Plannr backend:
//! - `login` / `logout` / `whoami` - session management
//! - `projects list|show|create|edit|delete` - project CRUD
//! - `tasks add|set-status|remove` - task edits, saved with the parent project
//! - `config check` - validate configuration file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::auth::{AuthState, SessionEvent};
use crate::models::{EditableProject, Project, Task, TaskStatus};
use crate::notify::{NoticeKind, Notifier};
use crate::AppState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "plannr")]
#[command(author, version, about = "A fast, lightweight client for the Plannr project tracker", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "plannr.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (overrides the config file)
    #[arg(long, env = "PLANNR_API_URL")]
    pub api_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and persist the session locally
    Login {
        /// Account email
        email: String,
        /// Account password
        #[arg(short, long, env = "PLANNR_PASSWORD")]
        password: String,
    },

    /// Drop the local session (no backend call)
    Logout,

    /// Show the signed-in user's profile
    Whoami,

    /// Project management commands
    #[command(subcommand)]
    Projects(ProjectsCommands),

    /// Task commands; tasks always save with their parent project
    #[command(subcommand)]
    Tasks(TasksCommands),

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Projects subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// List all projects
    List,
    /// Show details for a specific project
    Show {
        /// Project id
        id: i64,
    },
    /// Create a new project
    Create {
        /// Project name
        #[arg(long)]
        name: String,
        /// Project description
        #[arg(long, default_value = "")]
        description: String,
        /// Initial task title (repeatable)
        #[arg(long = "task", value_name = "TITLE")]
        tasks: Vec<String>,
    },
    /// Edit an existing project
    Edit {
        /// Project id
        id: i64,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project
    Delete {
        /// Project id
        id: i64,
        /// Perform the deletion (without this flag, just shows what would be deleted)
        #[arg(long)]
        yes: bool,
    },
}

/// Tasks subcommands
#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// Add a task to a project
    Add {
        /// Project id
        project: i64,
        /// Task title
        title: String,
    },
    /// Change a task's status
    SetStatus {
        /// Project id
        project: i64,
        /// Task id
        task: i64,
        /// New status: pending, in_progress or completed
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Remove a task from a project
    Remove {
        /// Project id
        project: i64,
        /// Task id
        task: i64,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    raw.parse()
}

// ============================================================================
// Command Dispatch
// ============================================================================

/// Run a CLI command
pub async fn run_command(cli: &Cli, state: &AppState) -> Result<()> {
    let was_authenticated = state.session.is_authenticated();
    let mut events = state.session.subscribe();

    let result = dispatch(cli, state).await;

    // A 401 during the command dropped the session; mention it once the
    // command's own output is done. A failed login is not an expiry.
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired && was_authenticated {
            println!();
            println!("Session expired. Run 'plannr login <email>' to sign in again.");
            break;
        }
    }

    result
}

async fn dispatch(cli: &Cli, state: &AppState) -> Result<()> {
    match &cli.command {
        Commands::Login { email, password } => cmd_login(state, email, password).await,
        Commands::Logout => cmd_logout(state),
        Commands::Whoami => cmd_whoami(state),
        Commands::Projects(ProjectsCommands::List) => cmd_projects_list(state).await,
        Commands::Projects(ProjectsCommands::Show { id }) => cmd_projects_show(state, *id).await,
        Commands::Projects(ProjectsCommands::Create {
            name,
            description,
            tasks,
        }) => cmd_projects_create(state, name, description, tasks).await,
        Commands::Projects(ProjectsCommands::Edit {
            id,
            name,
            description,
        }) => cmd_projects_edit(state, *id, name.as_deref(), description.as_deref()).await,
        Commands::Projects(ProjectsCommands::Delete { id, yes }) => {
            cmd_projects_delete(state, *id, *yes).await
        }
        Commands::Tasks(TasksCommands::Add { project, title }) => {
            cmd_tasks_add(state, *project, title).await
        }
        Commands::Tasks(TasksCommands::SetStatus {
            project,
            task,
            status,
        }) => cmd_tasks_set_status(state, *project, *task, *status).await,
        Commands::Tasks(TasksCommands::Remove { project, task }) => {
            cmd_tasks_remove(state, *project, *task).await
        }
        Commands::Config(ConfigCommands::Check) => cmd_config_check(cli, state),
    }
}

// ============================================================================
// Session Commands
// ============================================================================

async fn cmd_login(state: &AppState, email: &str, password: &str) -> Result<()> {
    println!("Connecting to {}...", state.api.base_url());

    let result = state.auth.login(email, password).await;
    print_notices(&state.notices);

    let user = result.context("Login failed")?;
    println!();
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

fn cmd_logout(state: &AppState) -> Result<()> {
    state.auth.logout();
    print_notices(&state.notices);
    Ok(())
}

fn cmd_whoami(state: &AppState) -> Result<()> {
    match state.session.state() {
        AuthState::Anonymous => {
            bail!("Not signed in. Run 'plannr login <email>' first.")
        }
        AuthState::Authenticated { user: Some(user) } => {
            println!();
            println!("Name:       {}", user.name);
            println!("Email:      {}", user.email);
            println!("Milestone:  {}", user.milestone);
            println!();
            Ok(())
        }
        AuthState::Authenticated { user: None } => {
            println!();
            println!("Signed in, but no profile is stored locally.");
            println!("Sign in again to refresh it.");
            println!();
            Ok(())
        }
    }
}

/// Commands that talk to the project endpoints need a session up front.
fn require_auth(state: &AppState) -> Result<()> {
    if !state.session.is_authenticated() {
        bail!("Authentication required. Run 'plannr login <email>' first.");
    }
    Ok(())
}

// ============================================================================
// Project Commands
// ============================================================================

async fn cmd_projects_list(state: &AppState) -> Result<()> {
    require_auth(state)?;

    state
        .workspace
        .ensure_loaded()
        .await
        .context("Failed to fetch projects")?;

    let projects = state.workspace.projects();
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<8}  {:<24}  {:<40}  {:<8}",
        "ID", "NAME", "DESCRIPTION", "TASKS"
    );
    println!("{}", "-".repeat(86));

    for project in projects {
        println!(
            "{:<8}  {:<24}  {:<40}  {:<8}",
            project.id,
            truncate(&project.name, 24),
            truncate(&project.description, 40),
            project.tasks.len()
        );
    }

    println!();
    Ok(())
}

async fn cmd_projects_show(state: &AppState, id: i64) -> Result<()> {
    require_auth(state)?;
    let project = find_project(state, id).await?;

    println!();
    println!("=== Project: {} ===", project.name);
    println!();
    println!("ID:          {}", project.id);
    println!("Name:        {}", project.name);
    if !project.description.is_empty() {
        println!("Description: {}", project.description);
    }

    println!();
    if project.tasks.is_empty() {
        println!("No tasks added yet.");
    } else {
        println!("Tasks:");
        for task in &project.tasks {
            let id = task
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<8}  {:<40}  {}", id, truncate(&task.title, 40), task.status);
        }
    }
    println!();

    Ok(())
}

async fn cmd_projects_create(
    state: &AppState,
    name: &str,
    description: &str,
    tasks: &[String],
) -> Result<()> {
    require_auth(state)?;

    let mut draft = state.workspace.open_blank_editor();
    draft.set_name(name);
    draft.set_description(description);
    for title in tasks {
        draft.tasks_mut().push(Task::new(title));
    }

    let result = state.workspace.save(draft).await;
    print_notices(&state.notices);

    let project = result.context("Failed to create project")?;
    println!();
    println!("Created project {} (id {})", project.name, project.id);
    Ok(())
}

async fn cmd_projects_edit(
    state: &AppState,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    require_auth(state)?;

    if name.is_none() && description.is_none() {
        bail!("Nothing to change. Pass --name and/or --description.");
    }

    let project = find_project(state, id).await?;
    let mut edited = state.workspace.open_editor(&project);
    if let Some(name) = name {
        edited.set_name(name);
    }
    if let Some(description) = description {
        edited.set_description(description);
    }

    let result = state.workspace.save(edited).await;
    print_notices(&state.notices);
    result.context("Failed to save project")?;
    Ok(())
}

async fn cmd_projects_delete(state: &AppState, id: i64, yes: bool) -> Result<()> {
    require_auth(state)?;
    let project = find_project(state, id).await?;

    if !yes {
        println!(
            "This permanently deletes project '{}' (id {}) and its {} task(s).",
            project.name,
            project.id,
            project.tasks.len()
        );
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }

    let result = state.workspace.delete(id).await;
    print_notices(&state.notices);
    result.context("Failed to delete project")?;
    Ok(())
}

// ============================================================================
// Task Commands
// ============================================================================

async fn cmd_tasks_add(state: &AppState, project_id: i64, title: &str) -> Result<()> {
    require_auth(state)?;

    let project = find_project(state, project_id).await?;
    let mut edited = state.workspace.open_editor(&project);
    edited.tasks_mut().push(Task::new(title));

    save_tasks(state, edited).await
}

async fn cmd_tasks_set_status(
    state: &AppState,
    project_id: i64,
    task_id: i64,
    status: TaskStatus,
) -> Result<()> {
    require_auth(state)?;

    let project = find_project(state, project_id).await?;
    let mut edited = state.workspace.open_editor(&project);

    let task = edited
        .tasks_mut()
        .iter_mut()
        .find(|task| task.id == Some(task_id));
    match task {
        Some(task) => task.status = status,
        None => bail!("Task not found: {} (project {})", task_id, project_id),
    }

    save_tasks(state, edited).await
}

async fn cmd_tasks_remove(state: &AppState, project_id: i64, task_id: i64) -> Result<()> {
    require_auth(state)?;

    let project = find_project(state, project_id).await?;
    let mut edited = state.workspace.open_editor(&project);

    let before = edited.tasks().len();
    edited.tasks_mut().retain(|task| task.id != Some(task_id));
    if edited.tasks().len() == before {
        bail!("Task not found: {} (project {})", task_id, project_id);
    }

    save_tasks(state, edited).await
}

async fn save_tasks(state: &AppState, edited: EditableProject) -> Result<()> {
    let result = state.workspace.save(edited).await;
    print_notices(&state.notices);
    result.context("Failed to save project")?;
    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

fn cmd_config_check(cli: &Cli, state: &AppState) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("Defaults are used when no file is present.");
        println!("To create a custom configuration, write a plannr.toml next to the binary.");
        return Ok(());
    }

    println!("[OK] Configuration file is valid!");
    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("API:");
    println!("  Base URL:   {}", state.config.api.base_url);
    println!("  Timeout:    {}s", state.config.api.timeout_secs);
    println!();
    println!("Session:");
    println!(
        "  Data Dir:   {}",
        state.config.session.data_dir.display()
    );
    println!();
    println!("Logging:");
    println!("  Level:      {}", state.config.logging.level);
    println!();

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Fetch the list if needed and look a project up by id.
async fn find_project(state: &AppState, id: i64) -> Result<Project> {
    state
        .workspace
        .ensure_loaded()
        .await
        .context("Failed to fetch projects")?;

    match state.workspace.find(id) {
        Some(project) => Ok(project),
        None => bail!("Project not found: {}", id),
    }
}

/// Print pending notices with status markers.
fn print_notices(notices: &Notifier) {
    for notice in notices.drain() {
        let marker = match notice.kind {
            NoticeKind::Error => "[!!]",
            _ => "[OK]",
        };
        for (index, line) in notice.message.lines().enumerate() {
            if index == 0 {
                println!("{} {}", marker, line);
            } else {
                println!("     {}", line);
            }
        }
    }
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
