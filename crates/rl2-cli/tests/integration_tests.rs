use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("rl2").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("RL2 - meta-reinforcement learning"));
}

#[test]
fn test_cli_generate() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("rl2").unwrap();
    cmd.arg("generate")
        .args(["--task", "bandit", "--num_actions", "3", "--num_tasks", "4"])
        .arg("--result_folder")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("bandit_3_4.json"));

    let written = std::fs::read_to_string(dir.path().join("bandit_3_4.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0].as_array().unwrap().len(), 4);
}

#[test]
fn test_cli_invalid_task() {
    let mut cmd = Command::cargo_bin("rl2").unwrap();
    cmd.args(["generate", "--task", "gridworld"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid task"));
}

#[test]
#[cfg(feature = "torch")]
fn test_cli_train_then_eval() {
    let dir = tempfile::tempdir().unwrap();
    let common = [
        "--task",
        "bandit",
        "--num_actions",
        "5",
        "--num_tasks",
        "3",
        "--max_num_traj",
        "10",
        "--max_traj_len",
        "1",
        "--max_num_traj_eval",
        "5",
        "--algo",
        "reinforce",
        "--gamma",
        "0.99",
        "--hidden_size",
        "16",
    ];

    let train = Command::cargo_bin("rl2")
        .unwrap()
        .arg("train")
        .args(common)
        .arg("--out_folder")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Checkpoint saved to"));
    let train_stdout = String::from_utf8_lossy(&train.get_output().stdout).into_owned();

    // One summed reward per meta-training task, each at most max_num_traj
    let rewards_line = train_stdout
        .lines()
        .find_map(|line| line.strip_prefix("rewards: "))
        .expect("train prints its reward log");
    let train_rewards: Vec<f32> = serde_json::from_str(rewards_line).unwrap();
    assert_eq!(train_rewards.len(), 3);
    assert!(train_rewards.iter().all(|r| (0.0..=10.0).contains(r)));

    assert!(dir.path().join("reinforce_bandit.pt").exists());
    assert!(dir.path().join("reinforce_bandit.json").exists());

    let eval = Command::cargo_bin("rl2")
        .unwrap()
        .arg("eval")
        .args(common)
        .arg("--out_folder")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting evaluation"));
    let eval_stdout = String::from_utf8_lossy(&eval.get_output().stdout).into_owned();

    // Evaluation runs a single task: one reward, one action sequence
    let eval_rewards: Vec<f32> = eval_stdout
        .lines()
        .find_map(|line| serde_json::from_str(line).ok())
        .expect("eval prints its reward log");
    let eval_actions: Vec<Vec<i64>> = eval_stdout
        .lines()
        .find_map(|line| serde_json::from_str(line).ok())
        .expect("eval prints its action log");

    assert_eq!(eval_rewards.len(), 1);
    assert!((0.0..=5.0).contains(&eval_rewards[0]));
    assert_eq!(eval_actions.len(), 1);
    assert_eq!(eval_actions[0].len(), 5);
    assert!(eval_actions[0].iter().all(|a| (0..5).contains(a)));
}

#[test]
#[cfg(feature = "torch")]
fn test_cli_eval_without_checkpoint_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("rl2")
        .unwrap()
        .args(["eval", "--task", "bandit", "--hidden_size", "16"])
        .arg("--out_folder")
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
#[cfg(feature = "torch")]
fn test_cli_ppo_mini_batch_too_large() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("rl2")
        .unwrap()
        .args([
            "train",
            "--algo",
            "ppo",
            "--max_traj_len",
            "2",
            "--mini_batch_size",
            "4",
        ])
        .arg("--out_folder")
        .arg(dir.path())
        .assert()
        .failure();

    assert!(!dir.path().join("ppo_bandit.pt").exists());
}

#[test]
#[cfg(feature = "torch")]
fn test_cli_navigation_cannot_train() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("rl2")
        .unwrap()
        .args(["train", "--task", "2dnav"])
        .arg("--out_folder")
        .arg(dir.path())
        .assert()
        .failure();
}
