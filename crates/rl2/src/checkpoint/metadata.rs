//! Model checkpoint metadata and weight persistence.

use crate::config::Algorithm;
use crate::{Result, Rl2Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(feature = "torch")]
use std::time::Instant;

#[cfg(feature = "torch")]
use crate::policy::RecurrentPolicy;

/// Sidecar describing the policy stored in a `.pt` checkpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckpointMetadata {
    /// Algorithm the policy was trained with
    pub algo: Algorithm,
    /// Task family name, e.g. `bandit`
    pub task: String,
    /// Size of the discrete action space
    pub num_actions: usize,
    /// Width of the per-step policy input
    pub input_size: i64,
    /// GRU hidden size
    pub hidden_size: i64,
    /// Library version that wrote the checkpoint
    pub version: String,
    /// Seconds since the Unix epoch at save time
    pub timestamp: String,
}

impl CheckpointMetadata {
    pub fn new(
        algo: Algorithm,
        task: impl Into<String>,
        num_actions: usize,
        input_size: i64,
        hidden_size: i64,
    ) -> Self {
        Self {
            algo,
            task: task.into(),
            num_actions,
            input_size,
            hidden_size,
            version: crate::VERSION.to_string(),
            timestamp: unix_timestamp(),
        }
    }

    /// Check that a checkpoint described by `self` can be loaded where
    /// `expected` is required.
    pub fn check_compatible(&self, expected: &CheckpointMetadata) -> Result<()> {
        if self.algo != expected.algo {
            return Err(Rl2Error::Config(format!(
                "checkpoint was trained with {}, requested {}",
                self.algo, expected.algo
            )));
        }
        if self.task != expected.task {
            return Err(Rl2Error::Config(format!(
                "checkpoint was trained on task '{}', requested '{}'",
                self.task, expected.task
            )));
        }
        if self.num_actions != expected.num_actions {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![expected.num_actions],
                actual: vec![self.num_actions],
            });
        }
        if self.input_size != expected.input_size || self.hidden_size != expected.hidden_size {
            return Err(Rl2Error::ShapeMismatch {
                expected: vec![expected.input_size as usize, expected.hidden_size as usize],
                actual: vec![self.input_size as usize, self.hidden_size as usize],
            });
        }
        Ok(())
    }
}

/// `<out_folder>/<algo>_<task>.pt`
pub fn checkpoint_path(out_folder: impl AsRef<Path>, algo: Algorithm, task: &str) -> PathBuf {
    out_folder.as_ref().join(format!("{}_{}.pt", algo, task))
}

/// The `.json` sidecar next to a weights file
pub fn sidecar_path(weights: impl AsRef<Path>) -> PathBuf {
    weights.as_ref().with_extension("json")
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// Save the policy weights (initial hidden state included) and the sidecar.
/// Parent directories are created if absent.
#[cfg(feature = "torch")]
pub fn save_policy<P: RecurrentPolicy>(
    policy: &P,
    metadata: &CheckpointMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    let start_time = Instant::now();
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %path.display(), "Saving checkpoint");
    policy.var_store().save(path)?;

    let file = std::fs::File::create(sidecar_path(path))?;
    serde_json::to_writer_pretty(file, metadata)?;

    tracing::info!(elapsed = ?start_time.elapsed(), "Checkpoint saved");
    Ok(())
}

/// Load weights into `policy` after checking the sidecar against `expected`.
///
/// The policy's carried hidden state is reset to the restored initial value.
#[cfg(feature = "torch")]
pub fn load_policy<P: RecurrentPolicy>(
    policy: &mut P,
    path: impl AsRef<Path>,
    expected: &CheckpointMetadata,
) -> Result<CheckpointMetadata> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "Loading checkpoint");

    let meta_path = sidecar_path(path);
    let file = std::fs::File::open(&meta_path).map_err(|e| {
        Rl2Error::Config(format!(
            "missing checkpoint metadata {}: {}",
            meta_path.display(),
            e
        ))
    })?;
    let metadata: CheckpointMetadata = serde_json::from_reader(file)?;
    metadata.check_compatible(expected)?;

    policy.var_store_mut().load(path)?;
    policy.reset_state();

    tracing::info!(
        algo = %metadata.algo,
        task = %metadata.task,
        num_actions = metadata.num_actions,
        "Checkpoint restored"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bandit_meta() -> CheckpointMetadata {
        CheckpointMetadata::new(Algorithm::Reinforce, "bandit", 5, 8, 16)
    }

    #[test]
    fn test_paths() {
        let path = checkpoint_path("./saves/rl2", Algorithm::Ppo, "mdp");
        assert_eq!(path, PathBuf::from("./saves/rl2/ppo_mdp.pt"));
        assert_eq!(sidecar_path(&path), PathBuf::from("./saves/rl2/ppo_mdp.json"));
    }

    #[test]
    fn test_compatible_ignores_timestamp() {
        let mut saved = bandit_meta();
        saved.timestamp = "0".into();
        assert!(saved.check_compatible(&bandit_meta()).is_ok());
    }

    #[test]
    fn test_action_count_mismatch() {
        let saved = bandit_meta();
        let requested = CheckpointMetadata::new(Algorithm::Reinforce, "bandit", 3, 6, 16);

        match saved.check_compatible(&requested) {
            Err(Rl2Error::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![3]);
                assert_eq!(actual, vec![5]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_algorithm_mismatch() {
        let saved = bandit_meta();
        let requested = CheckpointMetadata::new(Algorithm::Ppo, "bandit", 5, 8, 16);
        assert!(matches!(
            saved.check_compatible(&requested),
            Err(Rl2Error::Config(_))
        ));
    }

    #[test]
    fn test_metadata_serialization() {
        let meta = bandit_meta();
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"algo\":\"reinforce\""));

        let restored: CheckpointMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, meta);
    }
}
