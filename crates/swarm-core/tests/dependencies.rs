use swarm_core::{NewTask, StoreError, TaskManager};
use tempfile::TempDir;

fn manager() -> (TempDir, TaskManager) {
    let temp = TempDir::new().expect("tempdir");
    let manager = TaskManager::new(temp.path().join(".swarm"));
    manager.initialize().expect("initialize");
    (temp, manager)
}

fn create(manager: &TaskManager, title: &str) -> String {
    manager
        .create_task(NewTask::new(title, ""))
        .expect("create")
        .id
}

#[test]
fn add_and_remove_dependency() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    let b = create(&manager, "B");

    let updated = manager
        .add_dependency(&b, &a)
        .expect("add")
        .expect("task exists");
    assert_eq!(updated.depends_on, vec![a.clone()]);

    // Adding the same dependency again is a no-op.
    let again = manager
        .add_dependency(&b, &a)
        .expect("add again")
        .expect("task exists");
    assert_eq!(again.depends_on, vec![a.clone()]);

    let removed = manager
        .remove_dependency(&b, &a)
        .expect("remove")
        .expect("task exists");
    assert!(removed.depends_on.is_empty());
}

#[test]
fn direct_self_dependency_is_rejected() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    assert!(matches!(
        manager.add_dependency(&a, &a),
        Err(StoreError::CircularDependency { .. })
    ));
}

#[test]
fn transitive_cycle_is_rejected_and_store_unchanged() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    let b = create(&manager, "B");
    let c = create(&manager, "C");
    manager.add_dependency(&b, &a).expect("b -> a");
    manager.add_dependency(&c, &b).expect("c -> b");

    let err = manager.add_dependency(&a, &c).expect_err("cycle");
    assert!(matches!(err, StoreError::CircularDependency { .. }));

    let a_task = manager.get_task(&a).expect("get").expect("exists");
    assert!(a_task.depends_on.is_empty());
}

#[test]
fn dependency_must_reference_an_existing_task() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    assert!(matches!(
        manager.add_dependency(&a, "missing-task"),
        Err(StoreError::InvalidInput(_))
    ));
}

#[test]
fn dependencies_resolve_to_full_tasks() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    let b = create(&manager, "B");
    let c = create(&manager, "C");
    manager.add_dependency(&c, &a).expect("c -> a");
    manager.add_dependency(&c, &b).expect("c -> b");

    let deps = manager
        .dependencies(&c)
        .expect("dependencies")
        .expect("task exists");
    let mut ids: Vec<&str> = deps.iter().map(|task| task.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![a.as_str(), b.as_str()];
    expected.sort();
    assert_eq!(ids, expected);

    assert!(manager.dependencies("missing-task").expect("dependencies").is_none());
}

#[test]
fn dependents_reverse_scan() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    let b = create(&manager, "B");
    let c = create(&manager, "C");
    manager.add_dependency(&b, &a).expect("b -> a");
    manager.add_dependency(&c, &a).expect("c -> a");

    let dependents = manager.dependents(&a).expect("dependents");
    let mut ids: Vec<&str> = dependents.iter().map(|task| task.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![b.as_str(), c.as_str()];
    expected.sort();
    assert_eq!(ids, expected);

    assert!(manager.dependents(&b).expect("dependents").is_empty());
}

#[test]
fn validate_reports_dangling_dependencies() {
    let (_temp, manager) = manager();
    let a = create(&manager, "A");
    let b = create(&manager, "B");
    manager.add_dependency(&a, &b).expect("a -> b");
    manager.delete_task(&b).expect("delete b");

    let report = manager.validate().expect("validate");
    assert!(!report.is_healthy());
    assert_eq!(report.dangling_dependencies, vec![format!("{a} -> {b}")]);
}
