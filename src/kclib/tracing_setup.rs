use crate::cfg::get_log_folder;
use backtrace::Backtrace;
use std::{cell::RefCell, io, path::Path};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{writer::MakeWriterExt, Layer},
    prelude::*,
};

thread_local! {
    pub static BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

#[cfg(not(feature = "print_debug"))]
const STDOUT_LEVEL: Level = Level::INFO;
#[cfg(feature = "print_debug")]
const STDOUT_LEVEL: Level = Level::DEBUG;

/// Logs to stdout and, if `home_folder` is given, additionally to a daily rolling file in its
/// log folder. The returned guard flushes the file writer when dropped.
/// # Panics
/// In case tracing cannot be setup properly.
pub fn tracing_setup(home_folder: Option<&Path>) -> Option<WorkerGuard> {
    let stdout = Layer::new()
        .with_writer(io::stdout.with_max_level(STDOUT_LEVEL))
        .with_file(true)
        .with_line_number(true);
    let (file_layer, guard_flush_file) = if let Some(home_folder) = home_folder {
        let file_appender = tracing_appender::rolling::daily(get_log_folder(home_folder), "log");
        let (file_appender, guard_flush_file) = tracing_appender::non_blocking(file_appender);
        let file_layer = Layer::new()
            .with_writer(file_appender.with_max_level(Level::INFO))
            .with_line_number(true)
            .compact()
            .with_ansi(false)
            .with_file(true);
        (Some(file_layer), Some(guard_flush_file))
    } else {
        (None, None)
    };
    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout)
        .init();
    std::panic::set_hook(Box::new(|info| {
        let trace = Backtrace::new();
        tracing::error!("{info}");
        BACKTRACE.with(move |b| b.borrow_mut().replace(trace));
    }));
    guard_flush_file
}

use std::sync::Once;
static INIT: Once = Once::new();

pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .init();
    });
}
