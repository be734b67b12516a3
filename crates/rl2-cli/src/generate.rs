//! Task-file generation.

use crate::args::GenerateArgs;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rl2::checkpoint::{save_tasks, task_file_path};
use std::path::PathBuf;

/// Sample `num_tasks` tasks and write `<result_folder>/<task>_<num_actions>_<num_tasks>.json`
pub fn generate(args: &GenerateArgs) -> Result<PathBuf> {
    if args.num_tasks == 0 || args.num_actions == 0 {
        anyhow::bail!("num_tasks and num_actions must be positive");
    }

    tracing::info!(
        task = %args.task,
        env_id = %args.task.env_id(args.num_actions),
        num_tasks = args.num_tasks,
        seed = args.seed,
        "Generating tasks"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let tasks = args
        .task
        .sample_tasks(args.num_actions, args.num_tasks, &mut rng);

    let path = task_file_path(
        &args.result_folder,
        args.task.as_str(),
        args.num_actions,
        args.num_tasks,
    );
    save_tasks(&tasks, &path).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rl2::checkpoint::load_tasks;
    use rl2_envs::{Task, TaskKind};

    #[test]
    fn test_generate_writes_task_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = GenerateArgs {
            num_actions: 4,
            num_tasks: 6,
            task: TaskKind::Bandit,
            result_folder: dir.path().join("experiments"),
            seed: 3,
        };

        let path = generate(&args).unwrap();
        assert_eq!(path, dir.path().join("experiments").join("bandit_4_6.json"));

        let tasks: Vec<Task> = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 6);
        assert!(tasks.iter().all(|t| t.num_actions() == Some(4)));
    }

    #[test]
    fn test_generate_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = GenerateArgs {
            num_actions: 5,
            num_tasks: 2,
            task: TaskKind::Nav2d,
            result_folder: dir.path().join("a"),
            seed: 1,
        };
        let first: Vec<Task> = load_tasks(generate(&args).unwrap()).unwrap();
        args.result_folder = dir.path().join("b");
        let second: Vec<Task> = load_tasks(generate(&args).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
