#![cfg(feature = "pyo3")]

mod common;

use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use snakei::py::exceptions::{BridgeError as PyBridgeError, HostError};
use snakei::py::script;

// every test rebinds the service modules in sys.modules
static SERIAL: Mutex<()> = const_mutex(());

fn with_modules<F>(f: F)
where
    F: FnOnce(Python<'_>, &PyDict),
{
    let _guard = SERIAL.lock();
    pyo3::prepare_freethreaded_python();
    let bridge = common::standard_bridge();
    Python::with_gil(|py| {
        snakei::py::install(py, Arc::clone(&bridge)).expect("install");
        let locals = PyDict::new(py);
        f(py, locals)
    });
}

#[test]
fn services_are_importable_and_callable() {
    with_modules(|py, locals| {
        py.run(
            r#"
import location, sensor, miscinfo, media, androiddata

assert location.get_lastknown_location() == {}
res = location.get_geolocation(37.4219, -122.0841, 1)
assert isinstance(res, list) and len(res) <= 1
assert res == location.get_geolocation(latitude=37.4219, longitude=-122.0841, max_results=1)
assert res == location.get_geolocation(37.4219, -122.0841, max_results=1)
assert res[0]["locality"] == "Mountain View"

sensor.start_sensing(sensor_type=1)
assert sensor.get_acceleration() is None
assert sensor.get_light()["light"] == 212.0
assert sensor.get_sensor_list()[1]["type"] == 5
sensor.stop_sensing(1)

battery = miscinfo.get_battery_info()
assert battery == {"level": 87, "status": "charging", "temperature": 29.5, "plug_type": "usb"}
assert isinstance(battery["level"], int) and isinstance(battery["temperature"], float)
assert miscinfo.is_wifi_enabled() is True
assert miscinfo.get_wifi_state() == 3

assert media.tts_speak("") is None
assert media.is_tts_speaking() is False
assert androiddata.get_data() is None
assert androiddata.get_all_data() == []
"#,
            None,
            Some(locals),
        )
        .unwrap();
    });
}

#[test]
fn host_exceptions_surface_as_host_error() {
    with_modules(|py, locals| {
        let err = py
            .run("import miscinfo\nmiscinfo.get_cell_info()\n", None, Some(locals))
            .unwrap_err();
        assert!(err.is_instance_of::<HostError>(py));
        assert!(err.value(py).to_string().contains("SecurityException"));

        py.run(
            r#"
import snakei, location
assert issubclass(snakei.HostError, Exception)
try:
    location.get_geolocation(137.0, 0.0, 1)
except snakei.HostError as e:
    assert str(e)
else:
    raise AssertionError("expected HostError")
"#,
            None,
            Some(locals),
        )
        .unwrap();
    });
}

#[test]
fn bad_arguments_raise_type_error() {
    with_modules(|py, locals| {
        let cases = [
            "location.get_geolocation(1.0)",
            "location.get_geolocation('north', 0.0, 1)",
            "location.get_geolocation(1.0, 2.0, 3, 4)",
            "location.get_geolocation(1.0, 2.0, limit=3)",
            "location.get_geolocation(1.0, 2.0, 3, latitude=1.0)",
            "sensor.start_sensing(True)",
            "sensor.start_sensing(1.5)",
            "media.tts_speak(42)",
            "android.popen_python([])",
            "android.popen_python('main.py')",
            "miscinfo.get_wifi_state(1)",
        ];
        py.run("import location, sensor, media, android, miscinfo", None, Some(locals))
            .unwrap();
        for case in cases {
            let err = py.run(case, None, Some(locals)).unwrap_err();
            assert!(err.is_instance_of::<PyTypeError>(py), "{case}: {err}");
        }
        // ints are accepted where floats are expected
        py.run("location.get_geolocation(37, -122, 1)", None, Some(locals)).unwrap();
    });
}

#[test]
fn output_and_process_operations() {
    with_modules(|py, locals| {
        py.run(
            r#"
import androidlog, android
androidlog.log("hello from a script")
androidlog.toast("hi")
androidlog.notify(message="done")
assert androidlog.prompt("continue?") is True
androidlog.vibrate(duration=200)
android.popen_python(["main.py", "--verbose"])
"#,
            None,
            Some(locals),
        )
        .unwrap();
    });
}

#[test]
fn lifecycle_operations_are_not_exposed() {
    with_modules(|py, locals| {
        py.run(
            r#"
import location, androiddata, sensor
assert not hasattr(location, "init")
assert not hasattr(androiddata, "start_data")
assert hasattr(location, "start_location")
assert hasattr(sensor, "get_gravity")
"#,
            None,
            Some(locals),
        )
        .unwrap();
    });
}

#[test]
fn diagnostics_module_reports_disabled_parts() {
    with_modules(|py, locals| {
        let err = py
            .run("import sensor\nsensor.get_gravity()\n", None, Some(locals))
            .unwrap_err();
        assert!(err.is_instance_of::<PyBridgeError>(py));

        py.run(
            r#"
import snakei
assert isinstance(snakei.version(), str)
assert issubclass(snakei.BridgeError, RuntimeError)
assert "location" in snakei.services()
missing = [(u["service"], u["operation"]) for u in snakei.unavailable()]
assert ("sensor", "get_gravity") in missing
assert all(u["reason"] for u in snakei.unavailable())
"#,
            None,
            Some(locals),
        )
        .unwrap();
    });
}

#[test]
fn scripts_run_in_main_and_log_failures() {
    with_modules(|py, _locals| {
        assert!(script::run_source(py, "import media\nmedia.tts_speak('')\n", "speak.py"));
        assert!(!script::run_source(py, "import miscinfo\nmiscinfo.get_cell_info()\n", "cell.py"));
        assert!(script::run_source(py, "import sys\nsys.exit(0)\n", "exit0.py"));
        assert!(!script::run_source(py, "import sys\nsys.exit(3)\n", "exit3.py"));
        assert!(!script::run_source(py, "def broken(:\n", "syntax.py"));
        assert!(!script::run_file(py, std::path::Path::new("/nonexistent/script.py")));
    });
}
