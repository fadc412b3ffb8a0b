//! End-to-end harvest runs against a scripted source, on paused tokio time.
//!
//! Delays are asserted from the virtual instants at which the mock saw each
//! request, so the schedule is checked without waiting in real time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use sleepless_common::HarvestSettings;
use sleepless_harvest::testing::{distinct_posts, post_at, twin_cities_and_duluth, MockSource};
use sleepless_harvest::{resume_corpus, Harvester, RunEnd};
use sleepless_store::{encode_corpus, load_corpus, write_atomic, ActivityStore};

const SHORT: Duration = Duration::from_secs(60);
const LONG: Duration = Duration::from_secs(30 * 60);

fn harvester_with_store(
    source: Arc<MockSource>,
    dir: &Path,
    store: ActivityStore,
    target: usize,
) -> Harvester<Arc<MockSource>> {
    Harvester::builder()
        .source(source)
        .store(store)
        .sources(twin_cities_and_duluth())
        .query("coffee")
        .target(target)
        .settings(HarvestSettings::default())
        .corpus_path(dir.join("corpus.jsonl"))
        .snapshot_path(dir.join("snapshot.jsonl"))
        .build()
}

fn harvester(source: Arc<MockSource>, dir: &Path, target: usize) -> Harvester<Arc<MockSource>> {
    let store = ActivityStore::with_capacity_hint(target).unwrap();
    harvester_with_store(source, dir, store, target)
}

fn corpus_len(path: &Path) -> usize {
    let mut store = ActivityStore::with_capacity_hint(64).unwrap();
    load_corpus(&mut store, path).unwrap();
    store.post_count()
}

#[tokio::test(start_paused = true)]
async fn three_empty_polls_back_off_and_a_hit_restores_short_delay() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockSource::new()
            .then_empty()
            .then_empty()
            .then_empty()
            .then_posts(distinct_posts(1, 0))
            .then_posts(distinct_posts(1, 100)),
    );
    // user0 appears in both batches at different minutes, so both are new.
    let mut h = harvester(mock.clone(), dir.path(), 2);
    let (_tx, rx) = watch::channel(false);
    let report = h.run(rx).await.unwrap();

    assert_eq!(report.end, RunEnd::TargetReached);
    assert_eq!(report.polls, 5);
    // Gaps before polls 2..=5: short, short, long (after the third empty), short.
    assert_eq!(mock.gaps(), vec![SHORT, SHORT, LONG, SHORT]);
}

#[tokio::test(start_paused = true)]
async fn errors_count_toward_backoff() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockSource::new()
            .then_error("429 Too Many Requests")
            .then_error("timeout")
            .then_error("malformed")
            .then_posts(distinct_posts(1, 0)),
    );
    let mut h = harvester(mock.clone(), dir.path(), 1);
    let (_tx, rx) = watch::channel(false);
    h.run(rx).await.unwrap();

    assert_eq!(mock.gaps(), vec![SHORT, SHORT, LONG]);
}

#[tokio::test(start_paused = true)]
async fn first_poll_waits_the_short_delay() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockSource::new().then_posts(distinct_posts(1, 0)));
    let started = tokio::time::Instant::now();
    let mut h = harvester(mock.clone(), dir.path(), 1);
    let (_tx, rx) = watch::channel(false);
    h.run(rx).await.unwrap();

    assert_eq!(mock.calls()[0].0 - started, SHORT);
}

#[tokio::test(start_paused = true)]
async fn reaching_target_writes_full_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockSource::new()
            .then_posts(distinct_posts(3, 0))
            .then_posts(distinct_posts(3, 0)) // same authors and times: all duplicates
            .then_posts(distinct_posts(3, 50)),
    );
    let mut h = harvester(mock.clone(), dir.path(), 6);
    let (_tx, rx) = watch::channel(false);
    let report = h.run(rx).await.unwrap();

    assert_eq!(report.collected, 6);
    assert_eq!(report.polls, 3);
    assert_eq!(corpus_len(&dir.path().join("corpus.jsonl")), 6);
    assert!(!dir.path().join("snapshot.jsonl").exists());
}

#[tokio::test(start_paused = true)]
async fn periodic_save_happens_every_ten_polls() {
    let dir = tempfile::tempdir().unwrap();
    let mut mock = MockSource::new();
    for i in 0..12 {
        mock = mock.then_posts(vec![post_at("owl", i * 30)]);
    }
    let mock = Arc::new(mock);
    let mut h = harvester(mock.clone(), dir.path(), 12);
    let (_tx, rx) = watch::channel(false);
    let report = h.run(rx).await.unwrap();

    // One periodic save at poll 10, one final save at the target.
    assert_eq!(report.polls, 12);
    assert_eq!(report.saves, 2);
    assert_eq!(corpus_len(&dir.path().join("corpus.jsonl")), 12);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_backoff_flushes_to_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockSource::new()
            .then_posts(distinct_posts(4, 0))
            .then_empty()
            .then_empty()
            .then_empty(),
    );
    let mut h = harvester(mock.clone(), dir.path(), 1_000);
    let (tx, rx) = watch::channel(false);

    let run = tokio::spawn(async move {
        let report = h.run(rx).await.unwrap();
        (report, h)
    });

    // Four polls land at 60s, 120s, 180s and 240s; the fourth starts the
    // long cool-down. Ask for shutdown in the middle of it.
    tokio::time::sleep(Duration::from_secs(600)).await;
    tx.send(true).unwrap();
    let (report, h) = run.await.unwrap();

    assert_eq!(report.end, RunEnd::Shutdown);
    assert_eq!(report.polls, 4);
    assert_eq!(report.saves, 1);
    assert_eq!(h.store().post_count(), 4);
    assert_eq!(corpus_len(&dir.path().join("snapshot.jsonl")), 4);
    assert!(!dir.path().join("corpus.jsonl").exists());
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_from_corpus_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.jsonl");

    // First session: collect three posts.
    let first = Arc::new(MockSource::new().then_posts(distinct_posts(3, 0)));
    let mut h = harvester(first, dir.path(), 3);
    let (_tx, rx) = watch::channel(false);
    h.run(rx).await.unwrap();
    assert_eq!(corpus_len(&corpus), 3);

    // Second session reloads it; the remote side repeats one old post.
    let mut store = ActivityStore::with_capacity_hint(5).unwrap();
    let loaded = load_corpus(&mut store, &corpus).unwrap();
    assert_eq!(loaded.new, 3);

    let mut batch = distinct_posts(1, 0);
    batch.push(post_at("wren", 500));
    batch.push(post_at("lark", 501));
    let second = Arc::new(MockSource::new().then_posts(batch));
    let mut h = harvester_with_store(second, dir.path(), store, 5);
    let (_tx, rx) = watch::channel(false);
    let report = h.run(rx).await.unwrap();

    assert_eq!(report.collected, 5);
    assert_eq!(report.collected_this_run, 2);
    assert_eq!(corpus_len(&corpus), 5);
}

#[tokio::test(start_paused = true)]
async fn shutdown_snapshot_does_not_depend_on_corpus_save() {
    let dir = tempfile::tempdir().unwrap();
    // A corpus from an earlier session with unrelated content.
    let mut old = ActivityStore::with_capacity_hint(4).unwrap();
    old.ingest(post_at("heron", 0));
    let (bytes, _) = encode_corpus(&old).unwrap();
    write_atomic(&dir.path().join("corpus.jsonl"), &bytes).unwrap();

    let mock = Arc::new(MockSource::new().then_posts(distinct_posts(2, 0)));
    let mut h = harvester(mock, dir.path(), 100);
    let (tx, rx) = watch::channel(false);
    let run = tokio::spawn(async move { h.run(rx).await.unwrap() });

    tokio::time::sleep(Duration::from_secs(90)).await;
    tx.send(true).unwrap();
    let report = run.await.unwrap();

    assert_eq!(report.end, RunEnd::Shutdown);
    assert_eq!(corpus_len(&dir.path().join("snapshot.jsonl")), 2);
    // The primary corpus is left as the earlier session wrote it.
    assert_eq!(corpus_len(&dir.path().join("corpus.jsonl")), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_in_flight_search_drops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    // The first search starts at 60s and would answer at 180s.
    let mock = Arc::new(
        MockSource::new().then_posts_after(Duration::from_secs(120), distinct_posts(3, 0)),
    );
    let mut h = harvester(mock.clone(), dir.path(), 100);
    let (tx, rx) = watch::channel(false);
    let run = tokio::spawn(async move {
        let report = h.run(rx).await.unwrap();
        (report, h)
    });

    tokio::time::sleep(Duration::from_secs(90)).await;
    tx.send(true).unwrap();
    let (report, h) = run.await.unwrap();

    assert_eq!(report.end, RunEnd::Shutdown);
    assert_eq!(mock.calls().len(), 1);
    assert_eq!(report.polls, 0);
    assert_eq!(report.saves, 1);
    assert_eq!(h.store().post_count(), 0);
    let snapshot = dir.path().join("snapshot.jsonl");
    assert!(snapshot.exists());
    assert_eq!(corpus_len(&snapshot), 0);
}

#[tokio::test(start_paused = true)]
async fn damaged_corpus_survives_the_next_save() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.jsonl");
    let line = |author: &str, minutes: i64| serde_json::to_string(&post_at(author, minutes)).unwrap();
    let content = [
        line("heron", 0),
        "{\"author\": 7}".to_string(),
        line("egret", 10),
        line("ibis", 20),
    ]
    .join("\n");
    std::fs::write(&corpus, content + "\n").unwrap();

    let mut store = ActivityStore::with_capacity_hint(3).unwrap();
    let aside = resume_corpus(&mut store, &corpus, "run1").unwrap().unwrap();
    assert_eq!(store.post_count(), 1);

    let mock = Arc::new(MockSource::new().then_posts(distinct_posts(2, 0)));
    let mut h = harvester_with_store(mock, dir.path(), store, 3);
    let (_tx, rx) = watch::channel(false);
    let report = h.run(rx).await.unwrap();

    assert_eq!(report.end, RunEnd::TargetReached);
    assert_eq!(corpus_len(&corpus), 3);
    // The unread tail is still on disk under the set-aside name.
    let kept = std::fs::read_to_string(&aside).unwrap();
    assert!(kept.contains("egret"));
    assert!(kept.contains("ibis"));
}
