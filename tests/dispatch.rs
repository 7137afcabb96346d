//! Bridge-level behavior against the in-memory host.

mod common;

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::json;
use snakei::attach;
use snakei::cache::{OperationSpec, ServiceSpec};
use snakei::host::memory::{MemoryArg, MemoryHost, Outcome};
use snakei::services::STANDARD_SERVICES;
use snakei::value::{Param, ReturnShape};
use snakei::{Bridge, BridgeConfig, BridgeError, CallResult, HostArg};

use common::{standard_bridge, standard_host};

#[test]
fn structured_results_round_trip() {
    let bridge = standard_bridge();
    let battery = bridge.call("miscinfo", "get_battery_info", vec![]).unwrap();
    assert_eq!(
        battery,
        CallResult::Structured(json!({
            "level": 87,
            "status": "charging",
            "temperature": 29.5,
            "plug_type": "usb"
        }))
    );
    let sensors = bridge.call("sensor", "get_sensor_list", vec![]).unwrap();
    let list = sensors.as_structured().and_then(|v| v.as_array()).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["type"], json!(1));
}

#[test]
fn null_is_not_an_error() {
    let bridge = standard_bridge();
    assert_eq!(bridge.call("location", "get_location", vec![]), Ok(CallResult::None));
    assert_eq!(bridge.call("androiddata", "get_data", vec![]), Ok(CallResult::None));
}

#[test]
fn host_exceptions_carry_their_description() {
    let bridge = standard_bridge();
    match bridge.call("miscinfo", "get_cell_info", vec![]) {
        Err(BridgeError::HostException { description }) => {
            assert!(!description.is_empty());
            assert!(description.contains("SecurityException"));
        }
        other => panic!("expected a host exception, got {other:?}"),
    }
    // the next call on the same thread sees a clean slate
    assert_eq!(bridge.call("miscinfo", "get_wifi_state", vec![]), Ok(CallResult::Int(3)));
    assert_eq!(bridge.host().stats().calls_with_pending_exception, 0);
}

#[test]
fn transients_released_exactly_once() {
    let bridge = standard_bridge();
    let host = Arc::clone(bridge.host());

    bridge
        .call("media", "microphone_record", vec![HostArg::Str("rec.3gp".into()), HostArg::Int(5)])
        .unwrap();
    let err = bridge
        .call("media", "microphone_record", vec![HostArg::Str("rec.3gp".into()), HostArg::Int(0)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::HostException { .. }));
    bridge
        .call("android", "popen_python", vec![HostArg::StrList(vec!["main.py".into(), "-v".into()])])
        .unwrap();

    let stats = host.stats();
    assert_eq!(host.live_locals(), 0);
    assert_eq!(stats.double_deletes, 0);
    assert_eq!(stats.locals_created, stats.locals_deleted);
}

#[test]
fn attach_is_idempotent_and_detached_at_thread_exit() {
    let bridge = standard_bridge();
    let host = Arc::clone(bridge.host());
    let before = host.stats();

    let worker = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || {
            assert!(!attach::is_attached(bridge.host()));
            bridge.call("media", "is_tts_speaking", vec![]).unwrap();
            bridge.call("media", "is_media_playing", vec![]).unwrap();
            assert!(attach::is_attached(bridge.host()));
        })
    };
    worker.join().unwrap();

    let after = host.stats();
    assert_eq!(after.attaches - before.attaches, 1);
    assert_eq!(after.detaches - before.detaches, 1);
}

#[test]
fn attach_failure_fails_only_that_call() {
    let bridge = standard_bridge();
    let host = Arc::clone(bridge.host());
    host.refuse_attach(true);
    let result = thread::spawn({
        let bridge = Arc::clone(&bridge);
        move || bridge.call("media", "is_tts_speaking", vec![])
    })
    .join()
    .unwrap();
    assert!(matches!(result, Err(BridgeError::Attach(_))));

    host.refuse_attach(false);
    // the main thread attached while the bridge was built
    assert_eq!(bridge.call("media", "is_tts_speaking", vec![]), Ok(CallResult::Bool(false)));
}

#[test]
fn lastknown_location_without_fixes_is_an_empty_structure() {
    let bridge = standard_bridge();
    let got = bridge.call("location", "get_lastknown_location", vec![]).unwrap();
    let providers = got.as_structured().and_then(|v| v.as_object()).unwrap();
    for provider in ["gps", "network", "fused"] {
        assert!(!providers.contains_key(provider));
    }
}

#[test]
fn geolocation_returns_at_most_the_requested_entries() {
    let bridge = standard_bridge();
    let args = vec![HostArg::Double(37.4219), HostArg::Double(-122.0841), HostArg::Int(1)];
    let got = bridge.call("location", "get_geolocation", args).unwrap();
    let entries = got.as_structured().and_then(|v| v.as_array()).unwrap();
    assert!(entries.len() <= 1);

    let bad = vec![HostArg::Double(137.0), HostArg::Double(0.0), HostArg::Int(1)];
    match bridge.call("location", "get_geolocation", bad) {
        Err(BridgeError::HostException { description }) => assert!(!description.is_empty()),
        other => panic!("expected a host exception, got {other:?}"),
    }
}

#[test]
fn reading_right_after_start_never_raises() {
    let bridge = standard_bridge();
    bridge.call("sensor", "start_sensing", vec![HostArg::Int(1)]).unwrap();
    match bridge.call("sensor", "get_acceleration", vec![]).unwrap() {
        CallResult::None | CallResult::Structured(_) => {}
        other => panic!("unexpected {other:?}"),
    }
    bridge.call("sensor", "stop_sensing", vec![HostArg::Int(1)]).unwrap();
}

#[test]
fn empty_speech_does_not_crash() {
    let bridge = standard_bridge();
    match bridge.call("media", "tts_speak", vec![HostArg::Str(String::new())]) {
        Ok(CallResult::None) => {}
        Err(BridgeError::HostException { description }) => assert!(!description.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_class_disables_only_that_service() {
    let host = standard_host();
    let lean = Arc::new(MemoryHost::new());
    lean.define_service("com/snakei/MediaService")
        .method("isTtsSpeaking", "()Z", |_| Outcome::Bool(true));
    let bridge = Bridge::new(lean, BridgeConfig::default(), &STANDARD_SERVICES).unwrap();

    assert_eq!(bridge.call("media", "is_tts_speaking", vec![]), Ok(CallResult::Bool(true)));
    assert!(matches!(
        bridge.call("media", "is_media_playing", vec![]),
        Err(BridgeError::OperationUnavailable { .. })
    ));
    assert!(matches!(
        bridge.call("location", "get_location", vec![]),
        Err(BridgeError::ServiceUnavailable { .. })
    ));

    let report = bridge.report();
    assert_eq!(report.available.len(), 1);
    assert!(report.unavailable.iter().any(|u| u.service == "location" && u.operation.is_none()));

    // the full host resolves everything it defines
    assert!(Bridge::new(host, BridgeConfig::default(), &STANDARD_SERVICES).is_ok());
}

#[test]
fn strict_init_fails_on_any_lookup_failure() {
    let config = BridgeConfig {
        strict_init: true,
        ..BridgeConfig::default()
    };
    let err = Bridge::new(standard_host(), config, &STANDARD_SERVICES).err().unwrap();
    // the fixture leaves most sensor readings undefined
    assert!(err.is_lookup());
}

#[test]
fn null_singleton_is_reported() {
    let host = standard_host();
    host.define_class("com/snakei/MediaService").getter(Outcome::Null);
    let bridge = Bridge::new(host, BridgeConfig::default(), &STANDARD_SERVICES).unwrap();
    assert_eq!(
        bridge.call("media", "is_tts_speaking", vec![]),
        Err(BridgeError::NullInstance {
            service: "media".into()
        })
    );
}

#[test]
fn lifecycle_starts_and_stops_services() {
    let bridge = standard_bridge();
    bridge.start_services().unwrap();
    bridge.stop_services().unwrap();
    let host = bridge.host();
    assert_eq!(host.calls_to("init").len(), 5);
    for method in ["start_location", "start_media", "start_data", "stop_location", "stop_media", "stop_data"] {
        assert_eq!(host.calls_to(method).len(), 1, "{method}");
    }
}

#[test]
fn concurrent_callers_leave_no_residue() {
    const THREADS: usize = 8;
    let bridge = standard_bridge();
    let host = Arc::clone(bridge.host());
    let before = host.stats();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for i in 0..50 {
                    match (t + i) % 4 {
                        0 => assert_eq!(
                            bridge.call("miscinfo", "get_wifi_state", vec![]),
                            Ok(CallResult::Int(3))
                        ),
                        1 => assert!(matches!(
                            bridge.call("miscinfo", "get_cell_info", vec![]),
                            Err(BridgeError::HostException { .. })
                        )),
                        2 => {
                            let duration = (i % 3) as i32 - 1;
                            let args = vec![HostArg::Str("rec.3gp".into()), HostArg::Int(duration)];
                            let got = bridge.call("media", "microphone_record", args);
                            assert_eq!(got.is_ok(), duration > 0, "{got:?}");
                        }
                        _ => assert_eq!(
                            bridge.call(
                                "android",
                                "popen_python",
                                vec![HostArg::StrList(vec!["main.py".into(), format!("--run={i}")])]
                            ),
                            Ok(CallResult::None)
                        ),
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let after = host.stats();
    assert_eq!(host.live_locals(), 0);
    assert_eq!(after.double_deletes, 0);
    assert_eq!(after.calls_with_pending_exception, 0);
    assert_eq!(after.attaches - before.attaches, THREADS);
    assert_eq!(after.detaches - before.detaches, THREADS);
}

const TEXT: &str = "()Ljava/lang/String;";

static ECHO_SERVICES: [ServiceSpec; 1] = [ServiceSpec {
    name: "echo",
    class: "com/example/EchoService",
    getter: Some("()Lcom/example/EchoService;"),
    operations: &[
        OperationSpec::instance("greeting", "greeting", TEXT, ReturnShape::String, &[]),
        OperationSpec::instance(
            "echo",
            "echo",
            "(Ljava/lang/String;)Ljava/lang/String;",
            ReturnShape::String,
            &[Param::str("text")],
        ),
        OperationSpec::instance("place", "place", TEXT, ReturnShape::Json, &[]),
    ],
}];

#[test]
fn strings_keep_their_text_across_the_boundary() {
    let host = Arc::new(MemoryHost::new());
    host.define_service("com/example/EchoService")
        .method("greeting", TEXT, |_| Outcome::Str("héllo 🌍 \0x".into()))
        .method("echo", "(Ljava/lang/String;)Ljava/lang/String;", |args| match args {
            [MemoryArg::Str(s)] => Outcome::Str(s.clone()),
            _ => Outcome::throw("java.lang.IllegalArgumentException"),
        })
        .method("place", TEXT, |_| Outcome::json(&json!({"locality": "Zürich", "name": "東京"})));
    let bridge = Bridge::new(Arc::clone(&host), BridgeConfig::default(), &ECHO_SERVICES).unwrap();

    assert_eq!(
        bridge.call("echo", "greeting", vec![]),
        Ok(CallResult::Str("héllo 🌍 \0x".into()))
    );
    let text = "Grüße, мир, 🐍";
    assert_eq!(
        bridge.call("echo", "echo", vec![HostArg::Str(text.into())]),
        Ok(CallResult::Str(text.into()))
    );
    assert_eq!(
        bridge.call("echo", "place", vec![]),
        Ok(CallResult::Structured(json!({"locality": "Zürich", "name": "東京"})))
    );
    assert_eq!(host.live_locals(), 0);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn script_log_messages_reach_the_subscriber() {
    let bridge = standard_bridge();
    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        bridge.call("androidlog", "log", vec![HostArg::Str("sensor loop started".into())])
    });
    assert_eq!(result, Ok(CallResult::None));

    let text = String::from_utf8(captured.0.lock().clone()).unwrap();
    let line = text.lines().find(|l| l.contains("sensor loop started")).unwrap();
    assert!(line.contains("INFO"), "{line}");
    assert!(line.contains("androidlog"), "{line}");
}
