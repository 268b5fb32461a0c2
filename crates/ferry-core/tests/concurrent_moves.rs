//! Concurrent relocations of one issue through separate connections.
//!
//! Each thread opens its own connection to a file-backed store, the way two
//! processes would. Exactly one relocation may win; every loser must see
//! `AlreadyMoved` and leave nothing behind.

use std::sync::{Arc, Barrier};
use std::thread;

use ferry_core::db;
use ferry_core::db::store::{self, NewContainer, NewIssue};
use ferry_core::{AccessLevel, ContainerId, IssueId, MoveError, Relocator, Visibility};
use tempfile::TempDir;

const RACERS: usize = 4;

fn seed(dir: &TempDir) -> (IssueId, Vec<ContainerId>) {
    let conn = db::open_store(&db::store_path(dir.path())).expect("open store");
    let source = store::insert_container(
        &conn,
        &NewContainer {
            namespace: "acme",
            path: "old",
            name: "Old",
            visibility: Visibility::Private,
        },
    )
    .expect("source");
    store::set_member(&conn, source.id, "rita", AccessLevel::Reporter).expect("grant");

    let mut destinations = Vec::with_capacity(RACERS);
    for i in 0..RACERS {
        let dest = store::insert_container(
            &conn,
            &NewContainer {
                namespace: "acme",
                path: &format!("dest-{i}"),
                name: "",
                visibility: Visibility::Private,
            },
        )
        .expect("destination");
        store::set_member(&conn, dest.id, "rita", AccessLevel::Reporter).expect("grant");
        destinations.push(dest.id);
    }

    let issue = store::create_issue(
        &conn,
        &NewIssue {
            container_id: source.id,
            author: "alice",
            title: "Contended",
            description: "Refs #1",
        },
    )
    .expect("issue");

    (issue.id, destinations)
}

#[test]
fn only_one_concurrent_relocation_wins() {
    let dir = TempDir::new().expect("temp dir");
    let (issue_id, destinations) = seed(&dir);
    let barrier = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = destinations
        .iter()
        .copied()
        .map(|destination| {
            let path = db::store_path(dir.path());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = db::open_store(&path).expect("open store");
                barrier.wait();
                Relocator::default().relocate(&mut conn, "rita", issue_id, Some(destination))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one relocation commits");
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, MoveError::AlreadyMoved { .. }),
                "loser saw {err:?}"
            );
        }
    }

    let conn = db::open_store(&db::store_path(dir.path())).expect("reopen");
    let tombstone = store::get_issue(&conn, issue_id)
        .expect("query")
        .expect("exists");
    assert_eq!(tombstone.moved_to, Some(winners[0].moved.id));

    let created: usize = destinations
        .iter()
        .map(|d| store::list_issues(&conn, *d).expect("issues").len())
        .sum();
    assert_eq!(created, 1, "losers leave no partial issue behind");
}
