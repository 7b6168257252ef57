use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use swarm_core::task::tasks_to_json;
use swarm_core::{NewTask, Status, Task, TaskManager, TaskUpdate};

#[derive(Parser)]
#[command(name = "swarm", version, about = "Local file-backed issue tracker")]
struct Cli {
    /// Working directory holding the store (defaults to the current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the task store, or report what an existing one is missing
    Init {
        /// Only check the store; report missing pieces without creating them
        #[arg(long)]
        check: bool,
    },
    /// Create a task (or a subtask with --parent)
    Create {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },
    /// List tasks, optionally filtered by status
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        json: bool,
        /// Keep printing fresh lists as the store changes
        #[arg(long)]
        watch: bool,
    },
    /// Show one task
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Update task fields
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_assignee")]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
    },
    /// Change a task's lifecycle status
    Status { id: String, status: String },
    /// Assign a task (moves open tasks to in-progress)
    Assign { id: String, assignee: String },
    /// Clear the assignee (moves in-progress/closed tasks back to open)
    Unassign { id: String },
    /// Delete a task; deleting a parent cascades to its subtasks
    Delete { id: String },
    /// Add or remove a dependency edge
    Depend {
        id: String,
        dependency: String,
        #[arg(long)]
        remove: bool,
    },
    /// Show what a task depends on, or what depends on it
    Deps {
        id: String,
        #[arg(long)]
        reverse: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let workdir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let manager = TaskManager::for_workdir(&workdir);

    match cli.command {
        Command::Init { check } => {
            if check {
                let missing = manager.check_initialization()?;
                if missing.is_empty() {
                    println!("store at {} is complete", manager.root().display());
                } else {
                    bail!(
                        "store at {} is missing: {}",
                        manager.root().display(),
                        missing.join(", ")
                    );
                }
            } else {
                manager.initialize()?;
                println!("initialized store at {}", manager.root().display());
            }
        }
        Command::Create {
            title,
            description,
            assignee,
            parent,
            depends_on,
        } => {
            let task = manager.create_task(NewTask {
                title,
                description,
                assignee,
                parent,
                depends_on,
            })?;
            println!("created {}", render_line(&task));
        }
        Command::List {
            status,
            json,
            watch,
        } => {
            let filter = status.as_deref().map(parse_status).transpose()?;
            if watch {
                let mut watcher = manager.watch_tasks(filter);
                loop {
                    let tasks = watcher.next_list()?;
                    print_tasks(&tasks, json);
                }
            } else {
                let tasks = manager.list_tasks(filter)?;
                print_tasks(&tasks, json);
            }
        }
        Command::Get { id, json } => {
            let task = manager
                .get_task(&id)?
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            if json {
                println!("{}", tasks_to_json(std::slice::from_ref(&task)));
            } else {
                println!("{}", render_line(&task));
                if !task.depends_on.is_empty() {
                    println!("depends on: {}", task.depends_on.join(", "));
                }
                if !task.description.is_empty() {
                    println!();
                    println!("{}", task.description);
                }
            }
        }
        Command::Update {
            id,
            title,
            description,
            assignee,
            clear_assignee,
        } => {
            let assignee = if clear_assignee {
                Some(None)
            } else {
                assignee.map(Some)
            };
            let task = manager
                .update_task(
                    &id,
                    TaskUpdate {
                        title,
                        description,
                        assignee,
                        depends_on: None,
                    },
                )?
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            println!("updated {}", render_line(&task));
        }
        Command::Status { id, status } => {
            let status = parse_status(&status)?;
            let task = manager
                .change_status(&id, status)?
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            println!("updated {}", render_line(&task));
        }
        Command::Assign { id, assignee } => {
            let task = manager
                .assign(&id, assignee)?
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            println!("updated {}", render_line(&task));
        }
        Command::Unassign { id } => {
            let task = manager
                .unassign(&id)?
                .ok_or_else(|| anyhow!("task {id} not found"))?;
            println!("updated {}", render_line(&task));
        }
        Command::Delete { id } => {
            if !manager.delete_task(&id)? {
                bail!("task {id} not found");
            }
            println!("deleted {id}");
        }
        Command::Depend {
            id,
            dependency,
            remove,
        } => {
            let task = if remove {
                manager.remove_dependency(&id, &dependency)?
            } else {
                manager.add_dependency(&id, &dependency)?
            };
            let task = task.ok_or_else(|| anyhow!("task {id} not found"))?;
            if task.depends_on.is_empty() {
                println!("{} has no dependencies", task.id);
            } else {
                println!("{} depends on: {}", task.id, task.depends_on.join(", "));
            }
        }
        Command::Deps { id, reverse } => {
            let tasks = if reverse {
                manager.dependents(&id)?
            } else {
                manager
                    .dependencies(&id)?
                    .ok_or_else(|| anyhow!("task {id} not found"))?
            };
            print_tasks(&tasks, false);
        }
    }
    Ok(())
}

fn parse_status(value: &str) -> Result<Status> {
    value.parse::<Status>().map_err(|err| anyhow!("{err}"))
}

fn render_line(task: &Task) -> String {
    let assignee = task.assignee.as_deref().unwrap_or("-");
    format!("{} | {} | {} | {}", task.id, task.status, assignee, task.title)
}

fn print_tasks(tasks: &[Task], json: bool) {
    if json {
        println!("{}", tasks_to_json(tasks));
        return;
    }
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        println!("{}", render_line(task));
    }
}
