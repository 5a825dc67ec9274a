//! CLI tests: spawn the binary and check exit codes and output.

use std::fs;
use std::process::Command;

const SCORECARD: &str = "Group,Project Link,Video Link,Concept Score (10),Difficulty Level (10),Code Quality (10),Total (30),Position\n\
1,https://github.com/org/Submissions-C4/tree/Group_1/app,,,,,,\n\
2,https://github.com/org/Submissions-C4/blob/Group_2/build/app.zip,,,,,,\n\
3,https://github.com/org/Submissions-C4/commit/0123abc,,,,,,\n\
4,,,,,,,\n";

const SCORECARD_PATH: &str = "sheets/Outskill Eng Accelerator Score Card - C4.csv";

fn workspace() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(temp.path().join("sheets")).expect("sheets");
    fs::write(temp.path().join(SCORECARD_PATH), SCORECARD).expect("scorecard");
    temp
}

fn rankbot() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rankbot"));
    cmd.env_remove("RANK_BOT_BASE")
        .env_remove("RANK_BOT_MODEL")
        .env_remove("RANK_BOT_GIT_TIMEOUT")
        .env_remove("RANK_BOT_MAX_FILE_LINES")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn run_without_api_key_exits_with_failure() {
    let temp = workspace();
    let output = rankbot()
        .current_dir(temp.path())
        .env_remove("OPENROUTER_API_KEY")
        .args(["run", "--cohort", "c4"])
        .output()
        .expect("rankbot run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("OPENROUTER_API_KEY is not set"));
    assert!(!temp.path().join("c4_evaluation_report.md").exists());
    assert_eq!(
        fs::read_to_string(temp.path().join(SCORECARD_PATH)).expect("scorecard"),
        SCORECARD
    );
}

#[test]
fn inspect_prints_one_line_per_group() {
    let temp = workspace();
    let output = rankbot()
        .env("RANK_BOT_BASE", temp.path())
        .args(["inspect", "--cohort", "c4"])
        .output()
        .expect("rankbot inspect");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let kinds: Vec<&str> = stdout
        .lines()
        .skip(1)
        .map(|line| line.split_whitespace().nth(1).expect("kind column"))
        .collect();
    assert_eq!(kinds, vec!["branch", "archive", "commit", "none"]);
    assert!(stdout.contains("branch=Group_1 path=app"));
    assert!(stdout.contains("commit=0123abc path=/"));
}

#[test]
fn unknown_cohort_exits_with_failure() {
    let temp = workspace();
    let status = rankbot()
        .current_dir(temp.path())
        .args(["inspect", "--cohort", "c7"])
        .status()
        .expect("rankbot inspect");
    assert_eq!(status.code(), Some(1));
}
