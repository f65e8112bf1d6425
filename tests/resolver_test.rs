//! Integration tests for the batch resolution engine
//!
//! These drive the resolver end to end with scripted in-process
//! providers and a real record source / store on disk.

mod common;

use common::{Script, ScriptedProvider};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use windrose::config::ResolverConfig;
use windrose::models::Coordinate;
use windrose::provider::Provider;
use windrose::resolver::{BatchResolver, RunOutcome};
use windrose::shutdown::{ShutdownCoordinator, Signal};
use windrose::source::RecordSource;
use windrose::store::ResultStore;

/// Write an input CSV with `count` records ids 1..=count.
fn write_input(dir: &Path, count: usize) -> PathBuf {
    let path = dir.join("addresses.csv");
    let mut content =
        String::from("id,Street Number/Street Name,Locality,State,Zip Code\n");
    for id in 1..=count {
        content.push_str(&format!("{id},MAIN,Homestead,FL,33033\n"));
    }
    fs::write(&path, content).unwrap();
    path
}

fn config(dir: &Path, input: &Path, burst_size: usize) -> ResolverConfig {
    ResolverConfig {
        input: input.to_path_buf(),
        store: dir.join("results.csv"),
        preload: false,
        burst_size,
        cooldown_ms: 0,
    }
}

#[tokio::test]
async fn test_full_run_records_every_provider_answer() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 2);
    let config = config(dir.path(), &input, 20);

    let answering = ScriptedProvider::new("A", Script::Answer(Coordinate::new(1.0, 1.0)));
    let empty = ScriptedProvider::new("B", Script::Empty);
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(answering), Box::new(empty)];

    let mut resolver = BatchResolver::new(
        &config,
        providers,
        ResultStore::new(),
        ShutdownCoordinator::new(),
    );
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed { processed: 2 });
    assert_eq!(outcome.exit_code(), 0);

    let saved = ResultStore::load(&config.store).unwrap();
    assert_eq!(saved.len(), 2);
    for id in ["1", "2"] {
        assert!(saved.is_resolved(id, "A"));
        assert!(saved.is_resolved(id, "B"));
        assert_eq!(
            saved.get_result(id, "A").unwrap().coordinate,
            Coordinate::new(1.0, 1.0)
        );
        // Zero candidates is an explicit no-result, never (0,0).
        assert!(saved.get_result(id, "B").is_none());
        assert_eq!(saved.get_entry(id).unwrap().discrepancy(), 0.0);
    }
    assert!(fs::read_to_string(&config.store).unwrap().contains("None,None"));
}

#[tokio::test]
async fn test_provider_isolation_on_failure() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 1);
    let config = config(dir.path(), &input, 20);

    let a = ScriptedProvider::new("A", Script::Answer(Coordinate::new(1.0, 1.0)));
    let b = ScriptedProvider::new("B", Script::Fail);
    let c = ScriptedProvider::new("C", Script::Answer(Coordinate::new(2.0, 2.0)));
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(a), Box::new(b), Box::new(c)];

    let mut resolver = BatchResolver::new(
        &config,
        providers,
        ResultStore::new(),
        ShutdownCoordinator::new(),
    );
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    // B failing on every call aborts neither the record nor the run.
    assert_eq!(outcome, RunOutcome::Completed { processed: 1 });

    let store = resolver.store();
    assert!(store.get_result("1", "A").is_some());
    assert!(store.get_result("1", "B").is_none());
    assert!(store.is_resolved("1", "B"));
    assert!(store.get_result("1", "C").is_some());

    // Discrepancy reflects only the present coordinates of A and C.
    let expected = Coordinate::new(1.0, 1.0).distance(&Coordinate::new(2.0, 2.0));
    assert!((store.get_entry("1").unwrap().discrepancy() - expected).abs() < 1e-12);
}

#[tokio::test]
async fn test_idempotent_resume_processes_nothing_new() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 3);
    let config = config(dir.path(), &input, 20);

    // First run: one provider answers, one answers with no result.
    let a = ScriptedProvider::new("A", Script::Answer(Coordinate::new(1.0, 1.0)));
    let b = ScriptedProvider::new("B", Script::Empty);
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(a), Box::new(b)];
    let mut resolver = BatchResolver::new(
        &config,
        providers,
        ResultStore::new(),
        ShutdownCoordinator::new(),
    );
    let mut source = RecordSource::open(&input).unwrap();
    let first = resolver.run(&mut source).await.unwrap();
    assert_eq!(first.processed(), 3);

    // Second run against the same input with the store preloaded:
    // every provider already answered (including the no-result one),
    // so not a single provider call is made.
    let a = ScriptedProvider::new("A", Script::Answer(Coordinate::new(9.0, 9.0)));
    let b = ScriptedProvider::new("B", Script::Empty);
    let a_calls = a.call_counter();
    let b_calls = b.call_counter();
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(a), Box::new(b)];

    let store = ResultStore::open(&config.store, true).unwrap();
    let mut resolver =
        BatchResolver::new(&config, providers, store, ShutdownCoordinator::new());
    let mut source = RecordSource::open(&input).unwrap();
    let second = resolver.run(&mut source).await.unwrap();

    assert_eq!(second, RunOutcome::Completed { processed: 0 });
    assert_eq!(a_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(b_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    // The first run's answers survived untouched.
    let store = ResultStore::load(&config.store).unwrap();
    assert_eq!(
        store.get_result("2", "A").unwrap().coordinate,
        Coordinate::new(1.0, 1.0)
    );
}

#[tokio::test]
async fn test_partially_resolved_record_still_counts() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 2);
    let config = config(dir.path(), &input, 20);

    // Record 1 already has A's answer; B still owes one.
    let mut preloaded = ResultStore::new();
    preloaded.set_result(
        "1",
        "A",
        Some(windrose::models::ResolvedLocation {
            address: "MAIN, Homestead, FL 33033".to_string(),
            coordinate: Coordinate::new(5.0, 5.0),
        }),
    );

    let a = ScriptedProvider::new("A", Script::Answer(Coordinate::new(1.0, 1.0)));
    let b = ScriptedProvider::new("B", Script::Answer(Coordinate::new(2.0, 2.0)));
    let a_calls = a.call_counter();
    let b_calls = b.call_counter();
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(a), Box::new(b)];

    let mut resolver =
        BatchResolver::new(&config, providers, preloaded, ShutdownCoordinator::new());
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    // Both records made at least one new call, so both count.
    assert_eq!(outcome.processed(), 2);
    assert_eq!(a_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(std::sync::atomic::Ordering::SeqCst), 2);

    // A's preloaded answer for record 1 was not overwritten.
    assert_eq!(
        resolver.store().get_result("1", "A").unwrap().coordinate,
        Coordinate::new(5.0, 5.0)
    );
}

#[tokio::test]
async fn test_burst_boundary_checkpoints_once() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 3);
    let config = config(dir.path(), &input, 2);
    let store_path = config.store.clone();

    // One provider call per record, so call ordinal == record number.
    // At record 3 the burst after record 2 must already have
    // checkpointed; at records 1 and 2 no checkpoint exists yet.
    let provider = ScriptedProvider::with_hook(
        "A",
        Script::Answer(Coordinate::new(1.0, 1.0)),
        move |call| match call {
            1 | 2 => assert!(
                !store_path.exists(),
                "no checkpoint may be written before the first burst boundary"
            ),
            3 => {
                let checkpoint = ResultStore::load(&store_path).unwrap();
                assert_eq!(checkpoint.len(), 2, "burst checkpoint holds records 1 and 2");
            }
            _ => panic!("unexpected call {call}"),
        },
    );
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(provider)];

    let mut resolver = BatchResolver::new(
        &config,
        providers,
        ResultStore::new(),
        ShutdownCoordinator::new(),
    );
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    assert_eq!(outcome.processed(), 3);
    // Final save covers the trailing partial burst.
    assert_eq!(ResultStore::load(&config.store).unwrap().len(), 3);
}

#[tokio::test]
async fn test_signal_between_records_drains_cleanly() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 5);
    let config = config(dir.path(), &input, 20);

    let shutdown = ShutdownCoordinator::new();
    let notifier = shutdown.clone();

    // The flag is raised while record 2 is in flight: record 2 still
    // completes, record 3 never starts.
    let provider = ScriptedProvider::with_hook(
        "A",
        Script::Answer(Coordinate::new(1.0, 1.0)),
        move |call| {
            if call == 2 {
                notifier.notify(Signal::Interrupt);
            }
        },
    );
    let calls = provider.call_counter();
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(provider)];

    let mut resolver = BatchResolver::new(&config, providers, ResultStore::new(), shutdown);
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            signal: Signal::Interrupt,
            processed: 2
        }
    );
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);

    // The checkpoint reflects exactly the two completed records.
    let saved = ResultStore::load(&config.store).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.is_resolved("1", "A"));
    assert!(saved.is_resolved("2", "A"));
    assert!(!saved.is_resolved("3", "A"));
}

#[tokio::test]
async fn test_pre_armed_signal_processes_no_records() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), 3);
    let config = config(dir.path(), &input, 20);

    let shutdown = ShutdownCoordinator::new();
    shutdown.notify(Signal::Terminate);

    let provider = ScriptedProvider::new("A", Script::Answer(Coordinate::new(1.0, 1.0)));
    let calls = provider.call_counter();
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(provider)];

    let mut resolver = BatchResolver::new(&config, providers, ResultStore::new(), shutdown);
    let mut source = RecordSource::open(&input).unwrap();
    let outcome = resolver.run(&mut source).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Interrupted {
            signal: Signal::Terminate,
            processed: 0
        }
    );
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    // Work is still saved on the way out.
    assert!(config.store.exists());
}
