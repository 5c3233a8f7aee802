//! End-to-end lifecycle tests over the public API.
//!
//! Real wall-clock runs complete in well under a second, so PB promotion
//! is made deterministic by seeding the history through imports: a huge
//! imported PB is always beaten, a zero-total PB never is.

use goldsplit_core::{AttemptMode, Config, Database, RunManager, SplitsDocument};
use std::io::Write;

fn seed(names: &[&str]) -> Config {
    Config {
        title: "Test Game".into(),
        category: "Any%".into(),
        split_names: names.iter().map(|s| s.to_string()).collect(),
    }
}

fn manager(names: &[&str]) -> RunManager {
    RunManager::with_database(Database::open_memory().unwrap(), &seed(names)).unwrap()
}

fn import_json(cumulative_times: &[&str]) -> SplitsDocument {
    let splits: Vec<String> = cumulative_times
        .iter()
        .map(|t| format!("{{\"time\": \"{t}\"}}"))
        .collect();
    let names: Vec<String> = cumulative_times
        .iter()
        .enumerate()
        .map(|(i, _)| format!("\"Split {i}\""))
        .collect();
    let json = format!(
        "{{
            \"title\": \"Imported\",
            \"category\": \"100%\",
            \"attempts\": 42,
            \"completed\": 7,
            \"split_names\": [{}],
            \"personal_best\": {{\"attempt\": 40, \"splits\": [{}]}}
        }}",
        names.join(", "),
        splits.join(", ")
    );
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_full_run_lifecycle() {
    let mut manager = manager(&["A", "B"]);
    assert_eq!(manager.mode(), AttemptMode::Idle);
    assert_eq!(manager.elapsed(), std::time::Duration::ZERO);

    manager.start();
    assert_eq!(manager.mode(), AttemptMode::Running);
    assert_eq!(manager.current_split(), 0);

    assert!(!manager.split().unwrap());
    assert_eq!(manager.current_split(), 1);
    assert!(manager.split().unwrap());
    assert_eq!(manager.mode(), AttemptMode::Completed);

    // First completed run: counters bumped, promoted unconditionally.
    assert_eq!(manager.attempts(), 1);
    assert_eq!(manager.completed_runs(), 1);
    let pb = manager.personal_best().unwrap();
    assert!(pb.completed && pb.is_pb);
    assert_eq!(pb.attempt, 1);
    assert_eq!(pb.splits.len(), 2);
    assert!(pb.splits.iter().all(|s| s.best_segment.is_some()));

    manager.reset().unwrap();
    assert_eq!(manager.mode(), AttemptMode::Idle);
    // Resetting a finished attempt does not record a second run.
    assert_eq!(manager.attempts(), 1);
}

#[test]
fn test_abandoned_run_consumes_an_attempt() {
    let mut manager = manager(&["A", "B"]);
    manager.start();
    manager.split().unwrap();
    manager.reset().unwrap();

    assert_eq!(manager.attempts(), 1);
    assert_eq!(manager.completed_runs(), 0);
    assert!(manager.personal_best().is_none());
}

#[test]
fn test_lifecycle_errors_surface_as_invalid_state() {
    let mut manager = manager(&["A"]);
    assert!(manager.split().is_err());
    assert!(manager.undo_split().is_err());

    manager.start();
    assert!(manager.undo_split().is_err());

    manager.split().unwrap();
    assert!(manager.split().is_err());
    assert!(manager.undo_split().is_err());
}

#[test]
fn test_real_run_beats_a_huge_imported_pb() {
    let mut manager = manager(&["A", "B"]);
    manager
        .import(&import_json(&["59:59.000", "119:58.000"]))
        .unwrap();
    assert_eq!(manager.attempts(), 42);
    assert_eq!(manager.personal_best().unwrap().attempt, 40);

    manager.start();
    manager.split().unwrap();
    manager.split().unwrap();

    // A sub-second run against a two-hour PB always promotes.
    let pb = manager.personal_best().unwrap();
    assert_eq!(pb.attempt, 43);
    assert_eq!(manager.attempts(), 43);
    assert_eq!(manager.completed_runs(), 8);
}

#[test]
fn test_real_run_never_beats_a_zero_total_pb() {
    let mut manager = manager(&["A", "B"]);
    manager.import(&import_json(&["0.000", "0.000"])).unwrap();

    manager.start();
    manager.split().unwrap();
    manager.split().unwrap();

    // Promotion requires a strictly smaller total; nothing beats zero.
    let pb = manager.personal_best().unwrap();
    assert_eq!(pb.attempt, 40);
    assert_eq!(manager.attempts(), 43);
}

#[test]
fn test_import_from_a_json_file() {
    let mut manager = manager(&["A"]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{{\"title\": \"From Disk\", \"category\": \"Any%\",
          \"attempts\": 3, \"completed\": 1,
          \"split_names\": [\"Only\"],
          \"personal_best\": {{\"attempt\": 2, \"splits\": [{{\"time\": \"1:05.250\"}}]}}}}"
    )
    .unwrap();

    manager.import_from_path(file.path()).unwrap();
    assert_eq!(manager.title(), "From Disk");
    let pb = manager.personal_best().unwrap();
    assert_eq!(
        pb.splits[0].duration,
        std::time::Duration::from_millis(65_250)
    );
}

#[test]
fn test_history_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goldsplit.db");

    {
        let db = Database::open_at(&path).unwrap();
        let mut manager = RunManager::with_database(db, &seed(&["A", "B"])).unwrap();
        manager.start();
        manager.split().unwrap();
        manager.split().unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let manager = RunManager::with_database(db, &seed(&["A", "B"])).unwrap();
    assert_eq!(manager.attempts(), 1);
    assert_eq!(manager.completed_runs(), 1);
    let pb = manager.personal_best().unwrap();
    assert_eq!(pb.splits.len(), 2);
    assert!(pb.splits.iter().all(|s| s.best_segment.is_some()));
}
