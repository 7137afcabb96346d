// src/services.rs
//! The standard Android service tables.
//!
//! Each table names the Java class, its `getInstance()` accessor and every
//! operation scripts (or the embedding app) may call on it.

use crate::cache::{OperationSpec as Op, ServiceSpec};
use crate::value::{Param, ReturnShape};

const JSON: &str = "()Ljava/lang/String;";
const INIT: &str = "(Landroid/content/Context;)V";
const CONTEXT: &[Param] = &[Param::context()];

const fn json(name: &'static str, method: &'static str) -> Op {
    Op::instance(name, method, JSON, ReturnShape::Json, &[])
}

const fn void(name: &'static str, method: &'static str) -> Op {
    Op::instance(name, method, "()V", ReturnShape::Void, &[])
}

const fn init() -> Op {
    Op::instance("init", "init", INIT, ReturnShape::Void, CONTEXT).lifecycle()
}

pub const SENSOR: ServiceSpec = ServiceSpec {
    name: "sensor",
    class: "com/snakei/SensorService",
    getter: Some("()Lcom/snakei/SensorService;"),
    operations: &[
        init(),
        Op::instance("start_sensing", "start_sensing", "(I)V", ReturnShape::Void, &[Param::int("sensor_type")]),
        Op::instance("stop_sensing", "stop_sensing", "(I)V", ReturnShape::Void, &[Param::int("sensor_type")]),
        json("get_sensor_list", "getSensorList"),
        json("get_acceleration", "getAcceleration"),
        json("get_ambient_temperature", "getAmbientTemperature"),
        json("get_game_rotation_vector", "getGameRotationVector"),
        json("get_geomagnetic_rotation_vector", "getGeomagneticRotationVector"),
        json("get_gravity", "getGravity"),
        json("get_gyroscope", "getGyroscope"),
        json("get_gyroscope_uncalibrated", "getGyroscopeUncalibrated"),
        json("get_heart_rate", "getHeartRate"),
        json("get_light", "getLight"),
        json("get_linear_acceleration", "getLinearAcceleration"),
        json("get_magnetic_field", "getMagneticField"),
        json("get_magnetic_field_uncalibrated", "getMagneticFieldUncalibrated"),
        json("get_pressure", "getPressure"),
        json("get_proximity", "getProximity"),
        json("get_relative_humidity", "getRelativeHumidity"),
        json("get_rotation_vector", "getRotationVector"),
        json("get_step_counter", "getStepCounter"),
    ],
};

pub const LOCATION: ServiceSpec = ServiceSpec {
    name: "location",
    class: "com/snakei/LocationService",
    getter: Some("()Lcom/snakei/LocationService;"),
    operations: &[
        init(),
        void("start_location", "start_location"),
        void("stop_location", "stop_location"),
        json("get_location", "getLocation"),
        json("get_lastknown_location", "getLastKnownLocation"),
        Op::instance(
            "get_geolocation",
            "getGeoLocation",
            "(DDI)Ljava/lang/String;",
            ReturnShape::Json,
            &[Param::double("latitude"), Param::double("longitude"), Param::int("max_results")],
        ),
    ],
};

pub const MEDIA: ServiceSpec = ServiceSpec {
    name: "media",
    class: "com/snakei/MediaService",
    getter: Some("()Lcom/snakei/MediaService;"),
    operations: &[
        init(),
        void("start_media", "start_media"),
        void("stop_media", "stop_media"),
        Op::instance("tts_speak", "ttsSpeak", "(Ljava/lang/String;)V", ReturnShape::Void, &[Param::str("text")]),
        Op::instance(
            "microphone_record",
            "microphoneRecord",
            "(Ljava/lang/String;I)V",
            ReturnShape::Void,
            &[Param::str("file_name"), Param::int("duration")],
        ),
        Op::instance("is_media_playing", "isMediaPlaying", "()Z", ReturnShape::Boolean, &[]),
        Op::instance("is_tts_speaking", "isTtsSpeaking", "()Z", ReturnShape::Boolean, &[]),
    ],
};

pub const MISCINFO: ServiceSpec = ServiceSpec {
    name: "miscinfo",
    class: "com/snakei/MiscInfoService",
    getter: Some("()Lcom/snakei/MiscInfoService;"),
    operations: &[
        init(),
        Op::instance("is_wifi_enabled", "isWifiEnabled", "()Z", ReturnShape::Boolean, &[]),
        Op::instance("get_wifi_state", "getWifiState", "()I", ReturnShape::Int, &[]),
        json("get_wifi_connection_info", "getWifiConnectionInfo"),
        json("get_wifi_scan_info", "getWifiScanInfo"),
        json("get_bluetooth_info", "getBluetoothInfo"),
        json("get_bluetooth_scan_info", "getBluetoothScanInfo"),
        json("get_network_info", "getNetworkInfo"),
        json("get_cellular_provider_info", "getCellularProviderInfo"),
        json("get_cell_info", "getCellInfo"),
        json("get_sim_info", "getSimInfo"),
        json("get_phone_info", "getPhoneInfo"),
        json("get_mode_settings", "getModeSettings"),
        json("get_display_info", "getDisplayInfo"),
        json("get_volume_info", "getVolumeInfo"),
        json("get_battery_info", "getBatteryInfo"),
    ],
};

pub const ANDROIDDATA: ServiceSpec = ServiceSpec {
    name: "androiddata",
    class: "com/snakei/DataService",
    getter: Some("()Lcom/snakei/DataService;"),
    operations: &[
        init(),
        void("start_data", "start_data").lifecycle(),
        void("stop_data", "stop_data").lifecycle(),
        json("get_data", "getMostRecentData"),
        json("get_all_data", "getAllData"),
    ],
};

pub const ANDROIDLOG: ServiceSpec = ServiceSpec {
    name: "androidlog",
    class: "com/snakei/OutputService",
    getter: None,
    operations: &[
        Op::native("log", ReturnShape::Void, &[Param::str("message")]),
        Op::static_call(
            "toast",
            "toastMessage",
            "(Landroid/content/Context;Ljava/lang/String;)V",
            ReturnShape::Void,
            &[Param::context(), Param::str("message")],
        ),
        Op::static_call(
            "notify",
            "notifyMessage",
            "(Landroid/content/Context;Ljava/lang/String;)V",
            ReturnShape::Void,
            &[Param::context(), Param::str("message")],
        ),
        Op::static_call(
            "prompt",
            "promptMessage",
            "(Landroid/content/Context;Ljava/lang/String;)Z",
            ReturnShape::Boolean,
            &[Param::context(), Param::str("message")],
        ),
        Op::static_call(
            "vibrate",
            "vibrate",
            "(Landroid/content/Context;I)V",
            ReturnShape::Void,
            &[Param::context(), Param::int("duration")],
        ),
    ],
};

pub const ANDROID: ServiceSpec = ServiceSpec {
    name: "android",
    class: "com/snakei/PythonInterpreterService",
    getter: None,
    operations: &[Op::static_call(
        "popen_python",
        "startService",
        "([Ljava/lang/String;Landroid/content/Context;)V",
        ReturnShape::Void,
        &[Param::str_list("args"), Param::context()],
    )],
};

pub static STANDARD_SERVICES: [ServiceSpec; 7] =
    [SENSOR, LOCATION, MEDIA, MISCINFO, ANDROIDDATA, ANDROIDLOG, ANDROID];

/// Lifecycle operations issued by `Bridge::start_services`, after every `init`.
pub const START_OPERATIONS: &[(&str, &str)] = &[
    ("location", "start_location"),
    ("media", "start_media"),
    ("androiddata", "start_data"),
];

/// Issued by `Bridge::stop_services`.
pub const STOP_OPERATIONS: &[(&str, &str)] = &[
    ("location", "stop_location"),
    ("media", "stop_media"),
    ("androiddata", "stop_data"),
];
