// src/logging.rs
//! Subscriber setup for the `logging` feature.
//!
//! On Android, formatted events go to logcat under the `snakei` tag at the
//! priority matching their level; elsewhere to stderr. Installing twice is
//! harmless: the second call reports `false`.

use std::os::raw::c_int;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::BridgeConfig;

/// Install a global subscriber filtered by `config.log_filter`.
pub fn init_logging(config: &BridgeConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    #[cfg(target_os = "android")]
    let builder = builder
        .with_ansi(false)
        .without_time()
        .with_writer(logcat::MakeLogcat);

    builder.try_init().is_ok()
}

/// `android_LogPriority` for a tracing level.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
fn priority(level: &Level) -> c_int {
    match *level {
        Level::TRACE => 2,
        Level::DEBUG => 3,
        Level::INFO => 4,
        Level::WARN => 5,
        Level::ERROR => 6,
    }
}

#[cfg(target_os = "android")]
mod logcat {
    use std::ffi::CString;
    use std::io;
    use std::os::raw::{c_char, c_int};

    use tracing::Metadata;
    use tracing_subscriber::fmt::MakeWriter;

    #[link(name = "log")]
    extern "C" {
        fn __android_log_write(prio: c_int, tag: *const c_char, text: *const c_char) -> c_int;
    }

    const TAG: &[u8] = b"snakei\0";

    pub struct MakeLogcat;

    pub struct Logcat {
        prio: c_int,
        buf: Vec<u8>,
    }

    impl<'a> MakeWriter<'a> for MakeLogcat {
        type Writer = Logcat;

        fn make_writer(&'a self) -> Self::Writer {
            Logcat {
                prio: super::priority(&tracing::Level::INFO),
                buf: Vec::new(),
            }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            Logcat {
                prio: super::priority(meta.level()),
                buf: Vec::new(),
            }
        }
    }

    impl io::Write for Logcat {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for Logcat {
        // one event per writer; emit it as one logcat line
        fn drop(&mut self) {
            while self.buf.last() == Some(&b'\n') {
                self.buf.pop();
            }
            self.buf.retain(|b| *b != 0);
            if let Ok(text) = CString::new(std::mem::take(&mut self.buf)) {
                unsafe {
                    __android_log_write(self.prio, TAG.as_ptr() as *const c_char, text.as_ptr());
                }
            }
        }
    }
}
