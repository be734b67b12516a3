//! Task-file container.
//!
//! A task file is a JSON array with exactly one element: the list of task
//! descriptors produced by the sampler.

use crate::{Result, Rl2Error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// `<result_folder>/<task>_<num_actions>_<num_tasks>.json`
pub fn task_file_path(
    result_folder: impl AsRef<Path>,
    task: &str,
    num_actions: usize,
    num_tasks: usize,
) -> PathBuf {
    result_folder
        .as_ref()
        .join(format!("{}_{}_{}.json", task, num_actions, num_tasks))
}

/// Write `tasks` wrapped in a single-element array, creating parent
/// directories if absent.
pub fn save_tasks<T: Serialize>(tasks: &[T], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(file, &[tasks])?;
    tracing::info!(path = %path.display(), num_tasks = tasks.len(), "Tasks saved");
    Ok(())
}

/// Read a task file written by [`save_tasks`].
pub fn load_tasks<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let container: serde_json::Value = serde_json::from_reader(std::io::BufReader::new(file))?;

    let inner = match container {
        serde_json::Value::Array(mut outer) if outer.len() == 1 => outer.remove(0),
        serde_json::Value::Array(outer) => {
            return Err(Rl2Error::TaskFile(format!(
                "{}: expected a single-element container, found {} elements",
                path.display(),
                outer.len()
            )))
        }
        _ => {
            return Err(Rl2Error::TaskFile(format!(
                "{}: top level is not an array",
                path.display()
            )))
        }
    };
    if !inner.is_array() {
        return Err(Rl2Error::TaskFile(format!(
            "{}: container element is not a task list",
            path.display()
        )));
    }

    let tasks: Vec<T> = serde_json::from_value(inner)?;
    if tasks.is_empty() {
        return Err(Rl2Error::TaskFile(format!("{}: no tasks", path.display())));
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_task_file_path() {
        assert_eq!(
            task_file_path("./experiments", "bandit", 5, 100),
            PathBuf::from("./experiments/bandit_5_100.json")
        );
    }

    #[test]
    fn test_save_wraps_in_single_element() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let tasks = vec![vec![0.1f32, 0.9], vec![0.5, 0.5]];

        save_tasks(&tasks, &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.as_array().unwrap().len(), 1);

        let loaded: Vec<Vec<f32>> = load_tasks(&path).unwrap();
        assert_eq!(loaded, tasks);
    }

    #[test]
    fn test_rejects_bare_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "[[0.1, 0.9], [0.5, 0.5]]").unwrap();

        let result: Result<Vec<Vec<f32>>> = load_tasks(&path);
        assert!(matches!(result, Err(Rl2Error::TaskFile(_))));
    }

    #[test]
    fn test_rejects_non_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{\"tasks\": []}").unwrap();

        let result: Result<Vec<Vec<f32>>> = load_tasks(&path);
        assert!(matches!(result, Err(Rl2Error::TaskFile(_))));
    }
}
