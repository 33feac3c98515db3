#![forbid(unsafe_code)]

use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};

use crate::board::{self, StatusBuckets};
use crate::config;
use crate::error::TaskboardError;
use crate::logging;
use crate::output::table::Table;
use crate::task::filter::TaskFilters;
use crate::task::model::{
    self, Project, ProjectStatus, Task, TaskPriority, TaskStatus, User, parse_date,
};
use crate::task::stats::DashboardStats;
use crate::task::storage::{ProjectStorage, TaskStorage};
use crate::task::team::team_members;
use crate::tui;
use crate::tui::widgets::status_icon;

#[derive(Debug, Parser)]
#[command(name = "taskboard", version, about = "Kanban task board for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    List(ListArgs),
    Show(ShowArgs),
    Add(AddArgs),
    Edit(EditArgs),
    Move(MoveArgs),
    #[command(alias = "remove")]
    Rm(RmArgs),
    Stats(JsonArgs),
    Team(JsonArgs),
    Project(ProjectArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only tasks in this status (TODO, IN_PROGRESS, COMPLETED)
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
    /// Only tasks with this priority
    #[arg(short = 'p', long = "priority")]
    pub priority: Option<String>,
    /// Only tasks in this project (ID or name)
    #[arg(long = "project")]
    pub project: Option<String>,
    /// Only tasks assigned to this user (ID, name or email)
    #[arg(short = 'a', long = "assignee")]
    pub assignee: Option<String>,
    /// Case-insensitive search over ID, title and description
    #[arg(short = 'q', long = "search")]
    pub search: Option<String>,
    /// Show detailed information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Task ID, ID prefix or title fragment
    pub pattern: String,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task title
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub title: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(short = 's', long = "status", default_value = "TODO")]
    pub status: String,
    #[arg(short = 'p', long = "priority", default_value = "MEDIUM")]
    pub priority: String,
    /// Project ID or name
    #[arg(long = "project")]
    pub project: Option<String>,
    /// Assignee display name
    #[arg(short = 'a', long = "assignee")]
    pub assignee: Option<String>,
    #[arg(long = "assignee-email", requires = "assignee")]
    pub assignee_email: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long = "due")]
    pub due: Option<String>,
    /// Import tasks from a YAML file
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,
}

/// Fields left out stay as they are. An empty value clears an optional field.
#[derive(Debug, Parser)]
pub struct EditArgs {
    /// Task ID, ID prefix or title fragment
    pub pattern: String,
    #[arg(short = 't', long = "title")]
    pub title: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
    #[arg(short = 'p', long = "priority")]
    pub priority: Option<String>,
    /// Project ID or name
    #[arg(long = "project")]
    pub project: Option<String>,
    /// Assignee display name
    #[arg(short = 'a', long = "assignee")]
    pub assignee: Option<String>,
    #[arg(long = "assignee-email", requires = "assignee")]
    pub assignee_email: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long = "due")]
    pub due: Option<String>,
}

impl EditArgs {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.project.is_none()
            && self.assignee.is_none()
            && self.due.is_none()
    }
}

#[derive(Debug, Parser)]
pub struct MoveArgs {
    /// Task ID, ID prefix or title fragment
    pub pattern: String,
    /// Target status (TODO, IN_PROGRESS, COMPLETED)
    pub status: String,
}

#[derive(Debug, Parser)]
pub struct RmArgs {
    /// Task ID, ID prefix or title fragment
    pub pattern: String,
}

#[derive(Debug, Parser)]
pub struct JsonArgs {
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub cmd: ProjectCmd,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCmd {
    List(JsonArgs),
    Add(ProjectAddArgs),
    Edit(ProjectEditArgs),
    Rm(RmArgs),
}

#[derive(Debug, Parser)]
pub struct ProjectAddArgs {
    pub name: String,
    #[arg(short = 'd', long = "description", default_value = "")]
    pub description: String,
    #[arg(short = 's', long = "status", default_value = "ACTIVE")]
    pub status: String,
}

#[derive(Debug, Parser)]
pub struct ProjectEditArgs {
    /// Project ID or name
    pub pattern: String,
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    /// ACTIVE, ON_HOLD or COMPLETED
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging follows the config file when it loads; a broken config is reported by the command.
    let log_cfg = config::load().map(|(c, _)| c.log).unwrap_or_default();
    let _log_guard = match logging::init(&log_cfg) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("warning: logging disabled: {e:#}");
            None
        }
    };

    let result = run(cli).await;
    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default().await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "taskboard", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => {
                let val = config::get_value_string(&get.key)?;
                match val {
                    Some(v) => {
                        println!("{v}");
                        Ok(ExitCode::SUCCESS)
                    }
                    None => anyhow::bail!(
                        "configuration key '{}' not found - use 'taskboard config list' to see available keys",
                        get.key
                    ),
                }
            }
        },
        Some(Commands::List(args)) => cmd_list(args).await,
        Some(Commands::Show(args)) => cmd_show(args).await,
        Some(Commands::Add(args)) => cmd_add(args).await,
        Some(Commands::Edit(args)) => cmd_edit(args).await,
        Some(Commands::Move(args)) => cmd_move(args).await,
        Some(Commands::Rm(args)) => cmd_rm(args).await,
        Some(Commands::Stats(args)) => cmd_stats(args).await,
        Some(Commands::Team(args)) => cmd_team(args).await,
        Some(Commands::Project(args)) => cmd_project(args).await,
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

async fn load_cfg() -> anyhow::Result<config::Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<config::Config> {
        let (cfg, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

struct Stores {
    tasks: TaskStorage,
    projects: ProjectStorage,
}

fn open_stores(cfg: &config::Config) -> anyhow::Result<Stores> {
    Ok(Stores {
        tasks: TaskStorage::new(config::expand_path(&cfg.store.tasks_dir)?),
        projects: ProjectStorage::new(config::expand_path(&cfg.store.projects_dir)?),
    })
}

async fn cmd_default() -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;

    if tui::is_tty() {
        crate::tui::app::run(cfg).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Non-TTY fallback: print the board once.
    let stores = open_stores(&cfg)?;
    let snapshot = board::snapshot_from(stores.tasks.list()?);
    let buckets = board::partition(&snapshot);
    print!("{}", render_board_text(&buckets, cfg.ui.icons));
    Ok(ExitCode::SUCCESS)
}

fn render_board_text(buckets: &StatusBuckets, icons: bool) -> String {
    let mut out = String::new();
    for (status, tasks) in buckets.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({})", status.label(), tasks.len());
        for t in tasks {
            let icon = if icons {
                format!("{} ", status_icon(t.status))
            } else {
                String::new()
            };
            let _ = writeln!(out, "  {icon}{}  [{}] {}", t.id, t.priority, t.title);
        }
    }
    out
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;

    let project_id = match args.project.as_deref() {
        Some(p) => Some(find_project_by_pattern(&stores.projects, p)?.id),
        None => None,
    };
    let filters = TaskFilters {
        project_id,
        status: args
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?,
        priority: args
            .priority
            .as_deref()
            .map(str::parse::<TaskPriority>)
            .transpose()?,
        assignee: args.assignee.clone(),
        search: args.search.clone(),
    };
    let tasks = filters.apply(stores.tasks.list()?);

    if args.json {
        let mut s = serde_json::to_string_pretty(&tasks)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(ExitCode::SUCCESS);
    }

    let projects = if args.verbose {
        stores.projects.list()?
    } else {
        Vec::new()
    };
    let today = model::today();

    let mut t = if args.verbose {
        Table::new([
            "TASK", "STATUS", "PRIORITY", "DUE", "PROJECT", "ASSIGNEE", "UPDATED", "TITLE",
        ])
    } else {
        Table::new(["TASK", "STATUS", "PRIORITY", "DUE", "TITLE"])
    };
    for task in &tasks {
        let mut id = task.id.clone();
        if cfg.ui.icons {
            id = format!("{} {}", status_icon(task.status), task.id);
        }
        let due = match task.due_date.as_deref() {
            Some(d) if task.is_overdue(today) => format!("{d}!"),
            Some(d) => d.to_owned(),
            None => "-".to_owned(),
        };
        if args.verbose {
            t.row([
                id,
                task.status.as_str().to_owned(),
                task.priority.as_str().to_owned(),
                due,
                project_name(&projects, task.project_id.as_deref()),
                task.assignee
                    .as_ref()
                    .map_or_else(|| "-".to_owned(), |u| u.name.clone()),
                format_updated(&task.updated_at),
                truncate(&task.title, 60),
            ]);
        } else {
            t.row([
                id,
                task.status.as_str().to_owned(),
                task.priority.as_str().to_owned(),
                due,
                truncate(&task.title, 60),
            ]);
        }
    }
    t.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_show(args: ShowArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let task = find_task_by_pattern(&stores.tasks, &args.pattern)?;

    if args.json {
        let mut s = serde_json::to_string_pretty(&task)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    let projects = stores.projects.list()?;
    print_task_details(&task, &projects);
    Ok(ExitCode::SUCCESS)
}

fn print_task_details(task: &Task, projects: &[Project]) {
    println!("Task: {} (ID: {})", task.title, task.id);
    println!("Status: {}", task.status.label());
    println!("Priority: {}", task.priority);
    if task.project_id.is_some() {
        println!(
            "Project: {}",
            project_name(projects, task.project_id.as_deref())
        );
    }
    if let Some(user) = &task.assignee {
        if user.email.is_empty() {
            println!("Assignee: {}", user.name);
        } else {
            println!("Assignee: {} <{}>", user.name, user.email);
        }
    }
    if let Some(due) = task.due_date.as_deref() {
        if task.is_overdue(model::today()) {
            println!("Due: {due} (overdue)");
        } else {
            println!("Due: {due}");
        }
    }
    println!("Created: {}", task.created_at);
    println!("Updated: {}", task.updated_at);

    if let Some(desc) = task.description.as_deref()
        && !desc.trim().is_empty()
    {
        println!("\nDescription:\n{desc}");
    }
}

async fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;

    if let Some(file) = args.file.as_deref() {
        let created = add_from_file(&stores, Path::new(file))?;
        for t in &created {
            println!("Added task {}: {}", t.id, t.title);
        }
        println!("Imported {} task(s)", created.len());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(title) = args.title.as_deref().filter(|t| !t.trim().is_empty()) else {
        anyhow::bail!("task title is required");
    };

    let mut task = Task::new(title.trim(), args.status.parse()?, args.priority.parse()?);
    task.description = args.description.clone();
    if let Some(p) = args.project.as_deref() {
        task.project_id = Some(find_project_by_pattern(&stores.projects, p)?.id);
    }
    if let Some(name) = args.assignee.as_deref() {
        let existing = stores.tasks.list()?;
        task.assignee = Some(resolve_assignee(
            &existing,
            name,
            args.assignee_email.as_deref().unwrap_or(""),
        ));
    }
    if let Some(due) = args.due.as_deref() {
        parse_date(due)?;
        task.due_date = Some(due.trim().to_owned());
    }

    stores.tasks.save(&task)?;
    tracing::info!(task_id = %task.id, "task added");
    println!("Added task {}: {}", task.id, task.title);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, serde::Deserialize)]
struct TaskFile {
    version: String,
    /// Default project (ID or name) for entries that do not set one.
    #[serde(default)]
    project: Option<String>,
    tasks: Vec<TaskFileEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct TaskFileEntry {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    assignee: Option<TaskFileAssignee>,
    #[serde(default)]
    due_date: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct TaskFileAssignee {
    name: String,
    #[serde(default)]
    email: String,
}

/// Validates every entry before writing any, so a bad file leaves the store untouched.
fn add_from_file(stores: &Stores, file: &Path) -> anyhow::Result<Vec<Task>> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read task file: {}", file.display()))?;
    let def: TaskFile = serde_yaml::from_str(&data)
        .with_context(|| format!("failed to parse YAML: {}", file.display()))?;

    if def.version.trim() != "1.0" {
        anyhow::bail!(
            "unsupported task file version: {} (expected 1.0)",
            def.version
        );
    }

    let mut known = stores.tasks.list()?;
    let mut created = Vec::new();
    for (i, entry) in def.tasks.into_iter().enumerate() {
        if entry.title.trim().is_empty() {
            anyhow::bail!("task #{} has no title", i + 1);
        }
        let status: TaskStatus = entry
            .status
            .as_deref()
            .map_or(Ok(TaskStatus::Todo), str::parse)?;
        let priority: TaskPriority = entry
            .priority
            .as_deref()
            .map_or(Ok(TaskPriority::default()), str::parse)?;

        let mut task = Task::new(entry.title.trim(), status, priority);
        task.description = entry.description;
        if let Some(p) = entry.project.as_deref().or(def.project.as_deref()) {
            task.project_id = Some(find_project_by_pattern(&stores.projects, p)?.id);
        }
        if let Some(a) = entry.assignee {
            let user = resolve_assignee(&known, &a.name, &a.email);
            task.assignee = Some(user);
        }
        if let Some(due) = entry.due_date {
            parse_date(&due)?;
            task.due_date = Some(due.trim().to_owned());
        }
        known.push(task.clone());
        created.push(task);
    }

    for task in &created {
        stores.tasks.save(task)?;
    }
    tracing::info!(count = created.len(), file = %file.display(), "tasks imported");
    Ok(created)
}

/// Reuses the identity of an existing assignee with the same email (or name, when no email is
/// given); otherwise mints a new user.
fn resolve_assignee(tasks: &[Task], name: &str, email: &str) -> User {
    let name = name.trim();
    let email = email.trim();
    let existing = tasks.iter().filter_map(|t| t.assignee.as_ref()).find(|u| {
        if email.is_empty() {
            u.name.eq_ignore_ascii_case(name)
        } else {
            u.email.eq_ignore_ascii_case(email)
        }
    });
    match existing {
        Some(u) => u.clone(),
        None => User {
            id: Task::new_id(),
            name: name.to_owned(),
            email: email.to_owned(),
        },
    }
}

async fn cmd_edit(args: EditArgs) -> anyhow::Result<ExitCode> {
    if args.is_empty() {
        anyhow::bail!(
            "nothing to change - pass at least one of --title, --description, --status, --priority, --project, --assignee, --due"
        );
    }
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let mut task = find_task_by_pattern(&stores.tasks, &args.pattern)?;

    if !apply_task_edit(&stores, &mut task, &args)? {
        println!("Task {} unchanged", task.id);
        return Ok(ExitCode::SUCCESS);
    }
    stores.tasks.save(&task)?;
    tracing::info!(task_id = %task.id, "task updated");
    println!("Updated task {}: {}", task.id, task.title);
    Ok(ExitCode::SUCCESS)
}

/// Applies the given fields to `task` and stamps `updated_at`. Returns whether anything changed.
fn apply_task_edit(stores: &Stores, task: &mut Task, args: &EditArgs) -> anyhow::Result<bool> {
    let before = task.clone();

    if let Some(title) = args.title.as_deref() {
        if title.trim().is_empty() {
            anyhow::bail!("task title cannot be empty");
        }
        title.trim().clone_into(&mut task.title);
    }
    if let Some(desc) = args.description.as_deref() {
        task.description = Some(desc.trim().to_owned()).filter(|d| !d.is_empty());
    }
    if let Some(status) = args.status.as_deref() {
        task.status = status.parse()?;
    }
    if let Some(priority) = args.priority.as_deref() {
        task.priority = priority.parse()?;
    }
    if let Some(p) = args.project.as_deref() {
        task.project_id = if p.trim().is_empty() {
            None
        } else {
            Some(find_project_by_pattern(&stores.projects, p)?.id)
        };
    }
    if let Some(name) = args.assignee.as_deref() {
        task.assignee = if name.trim().is_empty() {
            None
        } else {
            let existing = stores.tasks.list()?;
            Some(resolve_assignee(
                &existing,
                name,
                args.assignee_email.as_deref().unwrap_or(""),
            ))
        };
    }
    if let Some(due) = args.due.as_deref() {
        task.due_date = if due.trim().is_empty() {
            None
        } else {
            parse_date(due)?;
            Some(due.trim().to_owned())
        };
    }

    if *task == before {
        return Ok(false);
    }
    task.updated_at = model::now_rfc3339();
    Ok(true)
}

/// Applies the given fields to `project` and stamps `updated_at`. Returns whether anything changed.
fn apply_project_edit(project: &mut Project, args: &ProjectEditArgs) -> anyhow::Result<bool> {
    let before = project.clone();

    if let Some(name) = args.name.as_deref() {
        if name.trim().is_empty() {
            anyhow::bail!("project name cannot be empty");
        }
        name.trim().clone_into(&mut project.name);
    }
    if let Some(desc) = args.description.as_deref() {
        desc.trim().clone_into(&mut project.description);
    }
    if let Some(status) = args.status.as_deref() {
        project.status = status.parse()?;
    }

    if *project == before {
        return Ok(false);
    }
    project.updated_at = model::now_rfc3339();
    Ok(true)
}

async fn cmd_move(args: MoveArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let task = find_task_by_pattern(&stores.tasks, &args.pattern)?;
    let to: TaskStatus = args.status.parse()?;

    if task.status == to {
        println!("Task {} is already {}", task.id, to.label());
        return Ok(ExitCode::SUCCESS);
    }

    let updated = stores.tasks.update_status(&task.id, to)?;
    tracing::info!(task_id = %updated.id, from = %task.status, to = %to, "task moved");
    println!(
        "Moved {}: {} → {}",
        updated.id,
        task.status.label(),
        to.label()
    );
    Ok(ExitCode::SUCCESS)
}

async fn cmd_rm(args: RmArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let task = find_task_by_pattern(&stores.tasks, &args.pattern)?;
    stores.tasks.delete(&task.id)?;
    tracing::info!(task_id = %task.id, "task removed");
    println!("Removed task {}: {}", task.id, task.title);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_stats(args: JsonArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let stats = DashboardStats::collect(
        &stores.tasks.list()?,
        &stores.projects.list()?,
        model::today(),
    );

    if args.json {
        let mut s = serde_json::to_string_pretty(&stats)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut t = Table::new(["METRIC", "VALUE"]);
    t.row(["Total tasks".to_owned(), stats.total_tasks.to_string()]);
    t.row(["To do".to_owned(), stats.todo_tasks.to_string()]);
    t.row(["In progress".to_owned(), stats.in_progress_tasks.to_string()]);
    t.row(["Completed".to_owned(), stats.completed_tasks.to_string()]);
    t.row(["Pending".to_owned(), stats.pending_tasks.to_string()]);
    t.row(["Overdue".to_owned(), stats.overdue_tasks.to_string()]);
    t.row([
        "Completion".to_owned(),
        format!("{}%", stats.completion_percent()),
    ]);
    t.row(["Projects".to_owned(), stats.total_projects.to_string()]);
    t.row(["Active projects".to_owned(), stats.active_projects.to_string()]);
    t.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_team(args: JsonArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;
    let members = team_members(&stores.tasks.list()?);

    if args.json {
        let mut s = serde_json::to_string_pretty(&members)?;
        s.push('\n');
        print!("{s}");
        return Ok(ExitCode::SUCCESS);
    }

    if members.is_empty() {
        println!("No team members found.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut t = Table::new(["ID", "NAME", "EMAIL", "TASKS"]);
    for m in &members {
        t.row([
            m.id.clone(),
            m.name.clone(),
            if m.email.is_empty() {
                "-".to_owned()
            } else {
                m.email.clone()
            },
            m.tasks_count.to_string(),
        ]);
    }
    t.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_project(args: ProjectArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let stores = open_stores(&cfg)?;

    match args.cmd {
        ProjectCmd::List(list) => {
            let projects = stores.projects.list()?;
            if list.json {
                let mut s = serde_json::to_string_pretty(&projects)?;
                s.push('\n');
                print!("{s}");
                return Ok(ExitCode::SUCCESS);
            }
            if projects.is_empty() {
                println!("No projects found.");
                return Ok(ExitCode::SUCCESS);
            }
            let tasks = stores.tasks.list()?;
            let mut t = Table::new(["PROJECT", "STATUS", "TASKS", "NAME"]);
            for p in &projects {
                let count = tasks
                    .iter()
                    .filter(|task| task.project_id.as_deref() == Some(p.id.as_str()))
                    .count();
                t.row([
                    p.id.clone(),
                    p.status.as_str().to_owned(),
                    count.to_string(),
                    p.name.clone(),
                ]);
            }
            t.print()?;
        }
        ProjectCmd::Add(add) => {
            if add.name.trim().is_empty() {
                anyhow::bail!("project name is required");
            }
            let mut project = Project::new(add.name.trim(), add.description);
            project.status = add.status.parse::<ProjectStatus>()?;
            stores.projects.save(&project)?;
            tracing::info!(project_id = %project.id, "project added");
            println!("Added project {}: {}", project.id, project.name);
        }
        ProjectCmd::Edit(edit) => {
            if edit.name.is_none() && edit.description.is_none() && edit.status.is_none() {
                anyhow::bail!(
                    "nothing to change - pass at least one of --name, --description, --status"
                );
            }
            let mut project = find_project_by_pattern(&stores.projects, &edit.pattern)?;
            if apply_project_edit(&mut project, &edit)? {
                stores.projects.save(&project)?;
                tracing::info!(
                    project_id = %project.id,
                    status = project.status.as_str(),
                    "project updated"
                );
                println!("Updated project {}: {}", project.id, project.name);
            } else {
                println!("Project {} unchanged", project.id);
            }
        }
        ProjectCmd::Rm(rm) => {
            let project = find_project_by_pattern(&stores.projects, &rm.pattern)?;
            stores.projects.delete(&project.id)?;
            tracing::info!(project_id = %project.id, "project removed");
            println!("Removed project {}: {}", project.id, project.name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Exact ID first, then a unique ID-prefix or title-substring match.
fn find_task_by_pattern(storage: &TaskStorage, pattern: &str) -> anyhow::Result<Task> {
    if let Ok(task) = storage.load(pattern) {
        return Ok(task);
    }

    let p = pattern.trim().to_lowercase();
    if p.is_empty() {
        return Err(TaskboardError::TaskNotFound(pattern.to_owned()).into());
    }
    let mut matches: Vec<Task> = storage
        .list()?
        .into_iter()
        .filter(|t| t.id.starts_with(&p) || t.title.to_lowercase().contains(&p))
        .collect();

    match matches.len() {
        0 => Err(TaskboardError::TaskNotFound(pattern.to_owned()).into()),
        1 => Ok(matches.remove(0)),
        n => Err(TaskboardError::AmbiguousTask(format!("{pattern} ({n} matches)")).into()),
    }
}

fn find_project_by_pattern(storage: &ProjectStorage, pattern: &str) -> anyhow::Result<Project> {
    if let Ok(project) = storage.load(pattern) {
        return Ok(project);
    }

    let p = pattern.trim().to_lowercase();
    let projects = storage.list()?;
    if let Some(exact) = projects.iter().find(|pr| pr.name.to_lowercase() == p) {
        return Ok(exact.clone());
    }
    let mut matches: Vec<Project> = projects
        .into_iter()
        .filter(|pr| !p.is_empty() && pr.name.to_lowercase().contains(&p))
        .collect();
    if matches.len() == 1 {
        return Ok(matches.remove(0));
    }
    Err(TaskboardError::ProjectNotFound(pattern.to_owned()).into())
}

fn project_name(projects: &[Project], id: Option<&str>) -> String {
    let Some(id) = id else {
        return "-".to_owned();
    };
    projects
        .iter()
        .find(|p| p.id == id)
        .map_or_else(|| id.to_owned(), |p| p.name.clone())
}

fn format_updated(updated_at: &str) -> String {
    let Ok(t) = time::OffsetDateTime::parse(
        updated_at,
        &time::format_description::well_known::Rfc3339,
    ) else {
        return updated_at.to_owned();
    };
    let secs = (time::OffsetDateTime::now_utc() - t).whole_seconds().max(0);
    match secs {
        0..60 => "just now".to_owned(),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86_400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

fn cmd_version() -> ExitCode {
    println!("taskboard version {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("TASKBOARD_GIT_COMMIT") {
        println!("  commit: {commit}");
    }
    if let Some(date) = option_env!("TASKBOARD_BUILD_DATE") {
        println!("  built: {date}");
    }
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}
