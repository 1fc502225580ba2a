use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use relay_core::{Advance, CycleError, FilterConfig, LoopSettings, PollLoop};
use relay_types::{
    AppendEvent, CheckpointPosition, CheckpointStore, CloseEvent, CreateEvent, EmittedRecord,
    Event, EventBatch, EventKind, EventSource, INodeType, RecordSink, RenameEvent, Scope,
    SinkError, SourceError, StoreError, UnlinkEvent, LAST_TX_ID_KEY,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

type Reply = Result<Option<EventBatch>, SourceError>;

#[derive(Default)]
struct ScriptedSource {
    open_errors: VecDeque<SourceError>,
    replies: VecDeque<Reply>,
    opened_at: Vec<CheckpointPosition>,
    polls: u32,
}

impl ScriptedSource {
    fn replying(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            ..Self::default()
        }
    }
}

impl EventSource for ScriptedSource {
    type Stream = CheckpointPosition;

    fn open_stream(&mut self, position: CheckpointPosition) -> Result<Self::Stream, SourceError> {
        self.opened_at.push(position);
        match self.open_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(position),
        }
    }

    fn poll(&mut self, _stream: &mut Self::Stream, _timeout: Duration) -> Reply {
        self.polls += 1;
        self.replies.pop_front().unwrap_or(Ok(None))
    }
}

#[derive(Default)]
struct RecordingSink {
    records: Vec<EmittedRecord>,
    fail: bool,
}

impl RecordSink for RecordingSink {
    fn emit(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Backend("downstream closed".to_string()));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<HashMap<String, String>>,
    fail_get: bool,
    fail_set: bool,
    writes: Mutex<u32>,
}

impl MemoryStore {
    fn with_checkpoint(value: &str) -> Self {
        let store = Self::default();
        store
            .state
            .lock()
            .unwrap()
            .insert(LAST_TX_ID_KEY.to_string(), value.to_string());
        store
    }

    fn checkpoint(&self) -> Option<String> {
        self.state.lock().unwrap().get(LAST_TX_ID_KEY).cloned()
    }

    fn writes(&self) -> u32 {
        *self.writes.lock().unwrap()
    }
}

impl CheckpointStore for MemoryStore {
    fn get(&self, scope: Scope) -> Result<HashMap<String, String>, StoreError> {
        assert_eq!(scope, Scope::Cluster);
        if self.fail_get {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    fn set(&self, state: &HashMap<String, String>, scope: Scope) -> Result<(), StoreError> {
        assert_eq!(scope, Scope::Cluster);
        if self.fail_set {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        *self.writes.lock().unwrap() += 1;
        *self.state.lock().unwrap() = state.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn create(path: &str) -> Event {
    Event::Create(CreateEvent {
        i_node_type: INodeType::File,
        path: path.to_string(),
        ctime: 1_700_000_000_000,
        replication: 3,
        owner_name: "hdfs".to_string(),
        group_name: "supergroup".to_string(),
        perms: "rw-r--r--".to_string(),
        symlink_target: None,
        overwrite: false,
        default_block_size: 134_217_728,
        erasure_coded: false,
    })
}

fn append(path: &str) -> Event {
    Event::Append(AppendEvent {
        path: path.to_string(),
        new_block: false,
    })
}

fn close(path: &str) -> Event {
    Event::Close(CloseEvent {
        path: path.to_string(),
        file_size: 42,
        timestamp: 1_700_000_000_500,
    })
}

fn batch(txid: i64, events: Vec<Event>) -> Reply {
    Ok(Some(EventBatch::new(txid, events)))
}

fn transient() -> Reply {
    Err(SourceError::Transient("connection reset".to_string()))
}

fn logs_filter() -> FilterConfig {
    FilterConfig::new("/logs").event_types("create,append")
}

fn build(
    source: ScriptedSource,
    store: MemoryStore,
    filter: FilterConfig,
) -> PollLoop<ScriptedSource, RecordingSink, MemoryStore> {
    PollLoop::new(
        source,
        RecordingSink::default(),
        store,
        LoopSettings::new(filter).poll_duration(Duration::from_millis(10)),
    )
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn first_cycle_emits_matching_events_and_checkpoints_batch_txid() {
    let source = ScriptedSource::replying(vec![batch(
        100,
        vec![create("/logs/a"), append("/other/b")],
    )]);
    let mut relay = build(source, MemoryStore::default(), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.previous, CheckpointPosition::Tip);
    assert_eq!(report.position, CheckpointPosition::After(100));
    assert_eq!(report.advance, Advance::Batch { txid: 100 });
    assert_eq!(report.emitted, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.persisted);

    let (source, sink, store) = relay.into_parts();
    assert_eq!(source.opened_at, vec![CheckpointPosition::Tip]);
    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0].event_type, EventKind::Create);
    assert_eq!(sink.records[0].event_path, "/logs/a");
    let body: serde_json::Value = serde_json::from_str(&sink.records[0].body).unwrap();
    assert_eq!(body["eventType"], "CREATE");
    assert_eq!(store.checkpoint().as_deref(), Some("100"));
}

#[test]
fn gap_resets_checkpoint_to_tip_without_emitting() {
    let source = ScriptedSource::replying(vec![Err(SourceError::Gap(
        "txid 10 pruned".to_string(),
    ))]);
    let mut relay = build(source, MemoryStore::with_checkpoint("10"), logs_filter());

    let report = relay.run_cycle().expect("gap is not cycle-fatal");

    assert_eq!(report.advance, Advance::GapReset);
    assert_eq!(report.position, CheckpointPosition::Tip);
    assert!(report.persisted);
    assert!(relay.sink().records.is_empty());
    assert_eq!(relay.store().checkpoint().as_deref(), Some("-1"));
}

#[test]
fn gap_at_open_takes_the_gap_path() {
    let mut source = ScriptedSource::default();
    source
        .open_errors
        .push_back(SourceError::Gap("txid 5 pruned".to_string()));
    let mut relay = build(source, MemoryStore::with_checkpoint("5"), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.advance, Advance::GapReset);
    assert_eq!(report.poll_attempts, 0);
    assert_eq!(relay.source().polls, 0);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("-1"));
}

#[test]
fn checkpoint_climbs_again_after_gap() {
    let source = ScriptedSource::replying(vec![
        batch(7, vec![create("/logs/one")]),
        Err(SourceError::Gap("pruned".to_string())),
        batch(250, vec![create("/logs/two")]),
        batch(260, vec![]),
    ]);
    let mut relay = build(source, MemoryStore::default(), logs_filter());

    let mut persisted = Vec::new();
    for _ in 0..4 {
        relay.run_cycle().expect("cycle");
        persisted.push(relay.store().checkpoint().unwrap());
    }

    assert_eq!(persisted, vec!["7", "-1", "250", "260"]);
    assert_eq!(
        relay.source().opened_at,
        vec![
            CheckpointPosition::Tip,
            CheckpointPosition::After(7),
            CheckpointPosition::Tip,
            CheckpointPosition::After(250),
        ]
    );
}

#[test]
fn sustained_transient_failure_is_fatal_after_four_polls() {
    let source = ScriptedSource::replying(vec![transient(), transient(), transient(), transient()]);
    let mut relay = build(source, MemoryStore::with_checkpoint("30"), logs_filter());

    let err = relay.run_cycle().expect_err("exhausted retries");

    assert!(matches!(err, CycleError::PollExhausted { attempts: 4, .. }));
    assert_eq!(relay.source().polls, 4);
    assert_eq!(relay.store().writes(), 0);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("30"));
}

#[test]
fn transient_failures_then_success_advance_normally() {
    let source = ScriptedSource::replying(vec![
        transient(),
        transient(),
        batch(31, vec![append("/logs/x")]),
    ]);
    let mut relay = build(source, MemoryStore::with_checkpoint("30"), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.poll_attempts, 3);
    assert_eq!(report.emitted, 1);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("31"));
}

#[test]
fn idle_poll_leaves_checkpoint_without_writing() {
    let source = ScriptedSource::replying(vec![Ok(None)]);
    let mut relay = build(source, MemoryStore::with_checkpoint("55"), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.advance, Advance::Idle);
    assert_eq!(report.position, CheckpointPosition::After(55));
    assert!(!report.persisted);
    assert_eq!(relay.store().writes(), 0);
}

#[test]
fn empty_batch_still_advances() {
    let source = ScriptedSource::replying(vec![batch(90, vec![])]);
    let mut relay = build(source, MemoryStore::with_checkpoint("80"), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.advance, Advance::Batch { txid: 90 });
    assert_eq!(report.emitted, 0);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("90"));
}

#[test]
fn checkpoint_write_failure_still_reports_advanced_position() {
    let source = ScriptedSource::replying(vec![batch(12, vec![create("/logs/a")])]);
    let store = MemoryStore {
        fail_set: true,
        ..MemoryStore::with_checkpoint("11")
    };
    let mut relay = build(source, store, logs_filter());

    let report = relay.run_cycle().expect("write failure is not fatal");

    assert_eq!(report.position, CheckpointPosition::After(12));
    assert!(!report.persisted);
    assert_eq!(relay.sink().records.len(), 1);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("11"));
}

#[test]
fn failed_write_replays_batch_on_next_cycle() {
    let source = ScriptedSource::replying(vec![
        batch(12, vec![create("/logs/a")]),
        batch(12, vec![create("/logs/a")]),
    ]);
    let store = MemoryStore {
        fail_set: true,
        ..MemoryStore::with_checkpoint("11")
    };
    let mut relay = build(source, store, logs_filter());

    relay.run_cycle().expect("first cycle");
    relay.run_cycle().expect("second cycle");

    // the durable position never moved, so the same events go out twice
    assert_eq!(relay.sink().records.len(), 2);
    assert_eq!(
        relay.source().opened_at,
        vec![CheckpointPosition::After(11), CheckpointPosition::After(11)]
    );
}

#[test]
fn unreadable_checkpoint_aborts_before_opening() {
    let store = MemoryStore {
        fail_get: true,
        ..MemoryStore::default()
    };
    let mut relay = build(ScriptedSource::default(), store, logs_filter());

    let err = relay.run_cycle().expect_err("load failure");

    assert!(matches!(err, CycleError::LoadCheckpoint(_)));
    assert!(relay.source().opened_at.is_empty());
}

#[test]
fn corrupt_checkpoint_fails_closed() {
    let mut relay = build(
        ScriptedSource::default(),
        MemoryStore::with_checkpoint("one hundred"),
        logs_filter(),
    );

    let err = relay.run_cycle().expect_err("corrupt value");

    assert!(matches!(err, CycleError::LoadCheckpoint(_)));
    assert!(relay.source().opened_at.is_empty());
    assert_eq!(relay.store().writes(), 0);
}

#[test]
fn unsupported_event_fails_the_cycle() {
    let source = ScriptedSource::replying(vec![Err(SourceError::UnsupportedEvent(
        "TRUNCATE".to_string(),
    ))]);
    let mut relay = build(source, MemoryStore::with_checkpoint("3"), logs_filter());

    let err = relay.run_cycle().expect_err("unknown kind");

    assert!(matches!(err, CycleError::UnsupportedEvent(ref kind) if kind == "TRUNCATE"));
    assert_eq!(relay.source().polls, 1);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("3"));
}

#[test]
fn open_failure_is_fatal_without_polling() {
    let mut source = ScriptedSource::default();
    source
        .open_errors
        .push_back(SourceError::Transient("refused".to_string()));
    let mut relay = build(source, MemoryStore::with_checkpoint("3"), logs_filter());

    let err = relay.run_cycle().expect_err("open failure");

    assert!(matches!(
        err,
        CycleError::OpenStream {
            position: CheckpointPosition::After(3),
            ..
        }
    ));
    assert_eq!(relay.source().polls, 0);
}

#[test]
fn sink_failure_leaves_checkpoint_untouched() {
    let source = ScriptedSource::replying(vec![batch(40, vec![create("/logs/a")])]);
    let mut relay = PollLoop::new(
        source,
        RecordingSink {
            fail: true,
            ..RecordingSink::default()
        },
        MemoryStore::with_checkpoint("39"),
        LoopSettings::new(logs_filter()),
    );

    let err = relay.run_cycle().expect_err("sink failure");

    assert!(matches!(err, CycleError::Sink(_)));
    assert_eq!(relay.store().writes(), 0);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("39"));
}

#[test]
fn unrelated_state_keys_survive_cycles() {
    let store = MemoryStore::with_checkpoint("1");
    store
        .state
        .lock()
        .unwrap()
        .insert("leader".to_string(), "node-2".to_string());
    let source = ScriptedSource::replying(vec![batch(2, vec![])]);
    let mut relay = build(source, store, logs_filter());

    relay.run_cycle().expect("cycle");

    let state = relay.store().state.lock().unwrap().clone();
    assert_eq!(state.get("leader").map(String::as_str), Some("node-2"));
    assert_eq!(state.get(LAST_TX_ID_KEY).map(String::as_str), Some("2"));
}

#[test]
fn regressed_batch_txid_is_accepted_as_is() {
    let source = ScriptedSource::replying(vec![batch(8, vec![])]);
    let mut relay = build(source, MemoryStore::with_checkpoint("10"), logs_filter());

    let report = relay.run_cycle().expect("cycle");

    assert_eq!(report.position, CheckpointPosition::After(8));
    assert_eq!(relay.store().checkpoint().as_deref(), Some("8"));
}

#[test]
fn filter_is_applied_in_batch_order() {
    let source = ScriptedSource::replying(vec![batch(
        500,
        vec![
            create("/data/a"),
            close("/data/a"),
            Event::Rename(RenameEvent {
                src_path: "/data/a".to_string(),
                dst_path: "/elsewhere/a".to_string(),
                timestamp: 1,
            }),
            Event::Rename(RenameEvent {
                src_path: "/elsewhere/b".to_string(),
                dst_path: "/data/b".to_string(),
                timestamp: 2,
            }),
            Event::Unlink(UnlinkEvent {
                path: "/data2/x".to_string(),
                timestamp: 3,
            }),
        ],
    )]);
    let filter = FilterConfig::new("/data").event_types("create, RENAME ,unlink");
    let mut relay = build(source, MemoryStore::default(), filter);

    let report = relay.run_cycle().expect("cycle");

    let emitted: Vec<(EventKind, &str)> = relay
        .sink()
        .records
        .iter()
        .map(|r| (r.event_type, r.event_path.as_str()))
        .collect();
    assert_eq!(
        emitted,
        vec![
            (EventKind::Create, "/data/a"),
            (EventKind::Rename, "/data/a"),
            (EventKind::Unlink, "/data2/x"),
        ]
    );
    assert_eq!(report.skipped, 2);
}

#[test]
fn step_does_not_touch_the_store() {
    let source = ScriptedSource::replying(vec![batch(70, vec![create("/logs/a")])]);
    let mut relay = build(source, MemoryStore::with_checkpoint("69"), logs_filter());

    let outcome = relay.step(CheckpointPosition::After(69)).expect("step");

    assert_eq!(outcome.position, CheckpointPosition::After(70));
    assert_eq!(outcome.emitted, 1);
    assert_eq!(relay.store().writes(), 0);
    assert_eq!(relay.store().checkpoint().as_deref(), Some("69"));
}
