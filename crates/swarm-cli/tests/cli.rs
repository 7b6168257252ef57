use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_swarm"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    bin()
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("run swarm")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn created_id(output: &Output) -> String {
    // "created <id> | <status> | <assignee> | <title>"
    let text = stdout(output);
    let line = text.lines().next().expect("created line");
    line.trim_start_matches("created ")
        .split(" | ")
        .next()
        .expect("id column")
        .to_string()
}

#[test]
fn init_creates_the_store_layout() {
    let temp = TempDir::new().expect("tempdir");
    let output = run(temp.path(), &["init"]);
    assert!(output.status.success());

    let root = temp.path().join(".swarm");
    assert!(root.join("version").is_file());
    assert!(root.join("lockfile").is_file());
    assert!(root.join("tasks").is_dir());
    for status in ["draft", "open", "in-progress", "closed"] {
        assert!(root.join("statuses").join(status).is_file());
    }
}

#[test]
fn init_check_reports_missing_store() {
    let temp = TempDir::new().expect("tempdir");
    let output = run(temp.path(), &["init", "--check"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing"));

    assert!(run(temp.path(), &["init"]).status.success());
    assert!(run(temp.path(), &["init", "--check"]).status.success());
}

#[test]
fn create_assign_unassign_round_trip() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);

    let output = run(
        temp.path(),
        &["create", "Fix login bug", "--assignee", "john.doe"],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("in-progress"));
    let id = created_id(&output);

    let output = run(temp.path(), &["unassign", &id]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("open"));

    let output = run(temp.path(), &["get", &id]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("| - | Fix login bug"));
}

#[test]
fn list_filters_by_status() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);
    run(temp.path(), &["create", "Open task"]);
    run(temp.path(), &["create", "Busy task", "--assignee", "a"]);

    let output = run(temp.path(), &["list", "--status", "open"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Open task"));
    assert!(!text.contains("Busy task"));
}

#[test]
fn list_json_is_machine_readable() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);
    run(temp.path(), &["create", "JSON task"]);

    let output = run(temp.path(), &["list", "--json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("valid json");
    assert_eq!(parsed[0]["title"], "JSON task");
    assert_eq!(parsed[0]["status"], "open");
}

#[test]
fn missing_task_exits_nonzero() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);

    let output = run(temp.path(), &["get", "no-such-task"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));

    assert!(!run(temp.path(), &["delete", "no-such-task"]).status.success());
}

#[test]
fn subtask_create_and_cascade_delete() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);
    let parent = created_id(&run(temp.path(), &["create", "Parent"]));
    let child = created_id(&run(
        temp.path(),
        &["create", "Child", "--parent", &parent],
    ));
    assert!(child.starts_with(&format!("{parent}/")));

    assert!(run(temp.path(), &["delete", &parent]).status.success());
    assert!(!run(temp.path(), &["get", &child]).status.success());
}

#[test]
fn depend_and_deps_commands() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);
    let a = created_id(&run(temp.path(), &["create", "A"]));
    let b = created_id(&run(temp.path(), &["create", "B"]));

    let output = run(temp.path(), &["depend", &b, &a]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(&a));

    let output = run(temp.path(), &["deps", &b]);
    assert!(stdout(&output).contains("A"));

    let output = run(temp.path(), &["deps", &a, "--reverse"]);
    assert!(stdout(&output).contains("B"));

    // Completing the cycle is rejected with a nonzero exit.
    let output = run(temp.path(), &["depend", &a, &b]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle"));
}

#[test]
fn status_command_moves_between_indexes() {
    let temp = TempDir::new().expect("tempdir");
    run(temp.path(), &["init"]);
    let id = created_id(&run(temp.path(), &["create", "Mover"]));

    assert!(run(temp.path(), &["status", &id, "closed"]).status.success());
    let closed =
        std::fs::read_to_string(temp.path().join(".swarm/statuses/closed")).expect("closed");
    assert!(closed.contains(&id));
    let open = std::fs::read_to_string(temp.path().join(".swarm/statuses/open")).expect("open");
    assert!(!open.contains(&id));

    assert!(!run(temp.path(), &["status", &id, "bogus"]).status.success());
}
