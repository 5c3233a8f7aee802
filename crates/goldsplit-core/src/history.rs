//! Read-only aggregation over the run history.
//!
//! Two derived facts are computed here: the current personal best (the
//! single `is_pb` row, whose absence is a normal state, not an error)
//! and the best segment per split index across all completed runs
//! ("gold splits"). Both are recomputed eagerly after any write that
//! could change them; the scan is O(total historical splits), which is
//! fine for a local history.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::time::Duration;

use crate::error::PersistenceError;
use crate::run::{Run, RunSplit};
use crate::storage::database::duration_from_ns;

/// Load the personal best: the single completed run with `is_pb` set,
/// with its splits ordered by index. `None` when no PB exists yet.
pub fn load_personal_best(conn: &Connection) -> Result<Option<Run>, PersistenceError> {
    let run = conn
        .query_row(
            "SELECT id, title, category, started_at, ended_at, completed, is_pb, attempt_num
             FROM runs
             WHERE is_pb = 1 AND completed = 1
             LIMIT 1",
            [],
            |row| {
                Ok(Run {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    category: row.get(2)?,
                    started_at: parse_datetime(row, 3)?,
                    ended_at: parse_datetime(row, 4)?,
                    completed: row.get(5)?,
                    is_pb: row.get(6)?,
                    attempt: row.get(7)?,
                    splits: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut run) = run else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT split_name, duration_ns FROM splits WHERE run_id = ?1 ORDER BY split_index",
    )?;
    let rows = stmt.query_map([run.id], |row| {
        Ok(RunSplit {
            name: row.get(0)?,
            duration: duration_from_ns(row.get(1)?),
            best_segment: None,
        })
    })?;
    for split in rows {
        run.splits.push(split?);
    }

    Ok(Some(run))
}

/// Minimum duration ever recorded at each split index across all
/// completed runs. Indices with no recorded data are `None`, never zero;
/// stored indices beyond `split_count` are ignored.
pub fn best_segments(
    conn: &Connection,
    split_count: usize,
) -> Result<Vec<Option<Duration>>, PersistenceError> {
    let mut best = vec![None; split_count];

    let mut stmt = conn.prepare(
        "SELECT s.split_index, MIN(s.duration_ns)
         FROM splits s JOIN runs r ON s.run_id = r.id
         WHERE r.completed = 1
         GROUP BY s.split_index",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;

    for row in rows {
        let (index, ns) = row?;
        let Ok(index) = usize::try_from(index) else {
            continue;
        };
        if index < split_count {
            best[index] = Some(duration_from_ns(ns));
        }
    }

    Ok(best)
}

/// Stitch the best-segment scan onto a loaded run, index-aligned.
/// Splits beyond the scanned range keep `None`.
pub fn annotate_best_segments(run: &mut Run, best: &[Option<Duration>]) {
    for (index, split) in run.splits.iter_mut().enumerate() {
        split.best_segment = best.get(index).copied().flatten();
    }
}

fn parse_datetime(row: &rusqlite::Row<'_>, index: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                index,
                "timestamp".to_string(),
                rusqlite::types::Type::Text,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::{Database, NewRun};
    use crate::storage::Config;

    fn setup(names: &[&str]) -> (Database, Vec<String>) {
        let db = Database::open_memory().unwrap();
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        db.load_or_seed_config(&Config {
            title: "Test Game".into(),
            category: "Any%".into(),
            split_names: names.clone(),
        })
        .unwrap();
        (db, names)
    }

    fn save(
        db: &mut Database,
        names: &[String],
        durations: &[Duration],
        completed: bool,
        attempt: u32,
    ) {
        let started_at: DateTime<Utc> = "2024-03-01T12:00:00Z".parse().unwrap();
        db.save_run(&NewRun {
            title: "Test Game",
            category: "Any%",
            started_at,
            ended_at: started_at + chrono::Duration::seconds(60),
            completed,
            attempts: attempt,
            completed_runs: if completed { attempt } else { 0 },
            durations,
            split_names: names,
        })
        .unwrap();
    }

    #[test]
    fn no_personal_best_is_a_normal_state() {
        let (db, _) = setup(&["A", "B"]);
        assert!(load_personal_best(db.conn()).unwrap().is_none());
    }

    #[test]
    fn personal_best_loads_with_ordered_splits() {
        let (mut db, names) = setup(&["A", "B"]);
        save(
            &mut db,
            &names,
            &[Duration::from_secs(10), Duration::from_secs(5)],
            true,
            1,
        );

        let pb = load_personal_best(db.conn()).unwrap().unwrap();
        assert!(pb.completed && pb.is_pb);
        assert_eq!(pb.attempt, 1);
        assert_eq!(pb.splits.len(), 2);
        assert_eq!(pb.splits[0].name, "A");
        assert_eq!(pb.splits[0].duration, Duration::from_secs(10));
        assert_eq!(pb.splits[1].name, "B");
        assert_eq!(pb.splits[1].duration, Duration::from_secs(5));
        assert_eq!(pb.total(), Duration::from_secs(15));
    }

    #[test]
    fn best_segments_are_cross_run_minima() {
        let (mut db, names) = setup(&["A", "B"]);
        save(
            &mut db,
            &names,
            &[Duration::from_secs(10), Duration::from_secs(5)],
            true,
            1,
        );
        // Slower overall, but faster on the second split.
        save(
            &mut db,
            &names,
            &[Duration::from_secs(14), Duration::from_secs(3)],
            true,
            2,
        );

        let best = best_segments(db.conn(), 2).unwrap();
        assert_eq!(
            best,
            vec![
                Some(Duration::from_secs(10)),
                Some(Duration::from_secs(3))
            ]
        );
    }

    #[test]
    fn best_segments_ignore_abandoned_runs() {
        let (mut db, names) = setup(&["A", "B"]);
        save(
            &mut db,
            &names,
            &[Duration::from_secs(10), Duration::from_secs(5)],
            true,
            1,
        );
        // An abandoned attempt with a faster first split must not count.
        save(&mut db, &names, &[Duration::from_secs(2)], false, 2);

        let best = best_segments(db.conn(), 2).unwrap();
        assert_eq!(best[0], Some(Duration::from_secs(10)));
    }

    #[test]
    fn best_segments_with_no_history_are_all_absent() {
        let (db, _) = setup(&["A", "B", "C"]);
        assert_eq!(best_segments(db.conn(), 3).unwrap(), vec![None, None, None]);
    }

    #[test]
    fn stored_indices_beyond_current_split_count_are_ignored() {
        let (mut db, names) = setup(&["A", "B", "C"]);
        save(
            &mut db,
            &names,
            &[
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
            ],
            true,
            1,
        );

        // The configuration later shrank to two splits.
        let best = best_segments(db.conn(), 2).unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0], Some(Duration::from_secs(1)));
        assert_eq!(best[1], Some(Duration::from_secs(2)));
    }

    #[test]
    fn annotation_is_index_aligned_and_absent_out_of_range() {
        let (mut db, names) = setup(&["A", "B"]);
        save(
            &mut db,
            &names,
            &[Duration::from_secs(10), Duration::from_secs(5)],
            true,
            1,
        );

        let mut pb = load_personal_best(db.conn()).unwrap().unwrap();
        // A shorter scan than the PB's split count leaves the tail absent.
        let best = best_segments(db.conn(), 1).unwrap();
        annotate_best_segments(&mut pb, &best);
        assert_eq!(pb.splits[0].best_segment, Some(Duration::from_secs(10)));
        assert_eq!(pb.splits[1].best_segment, None);
    }
}
