use clap::Subcommand;
use focusloop_core::Database;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a task
    Add {
        /// Task title
        title: String,
        /// Estimated pomodoros to finish
        #[arg(long, default_value_t = 1)]
        estimate: u32,
    },
    /// List all tasks
    List,
    /// Mark a task as completed
    Done {
        /// Task id
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        TaskAction::Add { title, estimate } => {
            let task = db.insert_task(&title, estimate)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let tasks = db.list_tasks()?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Done { id } => {
            if !db.mark_task_done(&id)? {
                return Err(format!("no task with id {id}").into());
            }
            if let Some(task) = db.get_task(&id)? {
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
        }
    }
    Ok(())
}
