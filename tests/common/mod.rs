//! Shared fixtures: a `MemoryHost` that imitates the snakei Java services.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use snakei::host::memory::{MemoryArg, MemoryHost, Outcome};
use snakei::services::STANDARD_SERVICES;
use snakei::{Bridge, BridgeConfig};

const JSON: &str = "()Ljava/lang/String;";

pub fn standard_host() -> Arc<MemoryHost> {
    let host = Arc::new(MemoryHost::new());
    let sensing: Arc<Mutex<HashSet<i32>>> = Arc::default();

    let (on, off) = (Arc::clone(&sensing), Arc::clone(&sensing));
    host.define_service("com/snakei/SensorService")
        .method("init", "(Landroid/content/Context;)V", |_| Outcome::Void)
        .method("start_sensing", "(I)V", move |args| {
            if let [MemoryArg::Int(t)] = args {
                on.lock().insert(*t);
            }
            Outcome::Void
        })
        .method("stop_sensing", "(I)V", move |args| {
            if let [MemoryArg::Int(t)] = args {
                off.lock().remove(t);
            }
            Outcome::Void
        })
        .method("getSensorList", JSON, |_| {
            Outcome::json(&json!([
                {"name": "LSM6DSO Accelerometer", "type": 1, "vendor": "STMicro", "power": 0.17},
                {"name": "TMD3702V Light", "type": 5, "vendor": "AMS", "power": 0.75}
            ]))
        })
        // no sample has arrived yet
        .method("getAcceleration", JSON, |_| Outcome::Null)
        .method("getLight", JSON, |_| Outcome::json(&json!({"time": 1700000000123_i64, "light": 212.0})))
        .method("getStepCounter", JSON, |_| Outcome::json(&json!({"time": 1700000000123_i64, "steps": 4212})));

    host.define_service("com/snakei/LocationService")
        .method("init", "(Landroid/content/Context;)V", |_| Outcome::Void)
        .method("start_location", "()V", |_| Outcome::Void)
        .method("stop_location", "()V", |_| Outcome::Void)
        .method("getLocation", JSON, |_| Outcome::Null)
        .method("getLastKnownLocation", JSON, |_| Outcome::json(&json!({})))
        .method("getGeoLocation", "(DDI)Ljava/lang/String;", |args| match args {
            [MemoryArg::Double(lat), MemoryArg::Double(lon), MemoryArg::Int(max)] => {
                if !(-90.0..=90.0).contains(lat) {
                    return Outcome::throw(format!("java.lang.IllegalArgumentException: latitude == {lat}"));
                }
                let address = json!({
                    "country_code": "US",
                    "locality": "Mountain View",
                    "postal_code": "94043",
                    "latitude": lat,
                    "longitude": lon,
                });
                let n = (*max).clamp(0, 1) as usize;
                Outcome::json(&json!(vec![address; n]))
            }
            _ => Outcome::throw("java.lang.IllegalArgumentException"),
        });

    host.define_service("com/snakei/MediaService")
        .method("init", "(Landroid/content/Context;)V", |_| Outcome::Void)
        .method("start_media", "()V", |_| Outcome::Void)
        .method("stop_media", "()V", |_| Outcome::Void)
        .method("ttsSpeak", "(Ljava/lang/String;)V", |_| Outcome::Void)
        .method("microphoneRecord", "(Ljava/lang/String;I)V", |args| match args {
            [MemoryArg::Str(_), MemoryArg::Int(d)] if *d <= 0 => {
                Outcome::throw(format!("java.lang.IllegalArgumentException: duration {d}"))
            }
            _ => Outcome::Void,
        })
        .method("isMediaPlaying", "()Z", |_| Outcome::Bool(false))
        .method("isTtsSpeaking", "()Z", |_| Outcome::Bool(false));

    host.define_service("com/snakei/MiscInfoService")
        .method("init", "(Landroid/content/Context;)V", |_| Outcome::Void)
        .method("isWifiEnabled", "()Z", |_| Outcome::Bool(true))
        .method("getWifiState", "()I", |_| Outcome::Int(3))
        .method("getBatteryInfo", JSON, |_| {
            Outcome::json(&json!({"level": 87, "status": "charging", "temperature": 29.5, "plug_type": "usb"}))
        })
        .method("getCellInfo", JSON, |_| {
            Outcome::throw("java.lang.SecurityException: ACCESS_FINE_LOCATION not granted")
        });

    host.define_service("com/snakei/DataService")
        .method("init", "(Landroid/content/Context;)V", |_| Outcome::Void)
        .method("start_data", "()V", |_| Outcome::Void)
        .method("stop_data", "()V", |_| Outcome::Void)
        .method("getMostRecentData", JSON, |_| Outcome::Null)
        .method("getAllData", JSON, |_| Outcome::json(&json!([])));

    host.define_class("com/snakei/OutputService")
        .static_method("toastMessage", "(Landroid/content/Context;Ljava/lang/String;)V", |_| Outcome::Void)
        .static_method("notifyMessage", "(Landroid/content/Context;Ljava/lang/String;)V", |_| Outcome::Void)
        .static_method("promptMessage", "(Landroid/content/Context;Ljava/lang/String;)Z", |_| Outcome::Bool(true))
        .static_method("vibrate", "(Landroid/content/Context;I)V", |_| Outcome::Void);

    host.define_class("com/snakei/PythonInterpreterService").static_method(
        "startService",
        "([Ljava/lang/String;Landroid/content/Context;)V",
        |_| Outcome::Void,
    );

    host
}

/// A bridge over `standard_host` with the application context set.
pub fn standard_bridge() -> Arc<Bridge<MemoryHost>> {
    let host = standard_host();
    let context = host.new_context();
    let bridge = Bridge::new(host, BridgeConfig::default(), &STANDARD_SERVICES).expect("bridge");
    bridge.set_context(context).expect("context");
    Arc::new(bridge)
}
