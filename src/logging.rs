use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Once;
use tracing::{warn, Event, Level, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{
        format::{self, FormatEvent, FormatFields},
        FmtContext,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

// Log targets, one per stage
pub const COMPO_INGEST: &str = "compos_ingest";
pub const COMPO_TABLE: &str = "compos_table";
pub const BLOCK_REPETITION: &str = "block_repetition";
pub const GROUP_REPETITION: &str = "group_repetition";
pub const GROUP_PAIRING: &str = "group_pairing";
pub const LIST_ITEMS: &str = "list_items";
pub const DRAW: &str = "draw";

static INIT: Once = Once::new();

const STAGE_TARGETS: &[&str] = &[
    COMPO_INGEST,
    COMPO_TABLE,
    BLOCK_REPETITION,
    GROUP_REPETITION,
    GROUP_PAIRING,
    LIST_ITEMS,
    DRAW,
];

fn stage_filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    STAGE_TARGETS.iter().fold(
        EnvFilter::from_default_env().add_directive(Level::WARN.into()),
        |filter, target| match format!("{target}={level}").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        },
    )
}

// Compact one-line format for the file log: "LEVEL target: fields"
struct StageEventFormatter;

impl<S, N> FormatEvent<S, N> for StageEventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(writer, "{} {}: ", metadata.level(), metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}:", span.name())?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs a stderr subscriber. Stage targets log at info, or debug when
/// `debug` is set; `RUST_LOG` directives are honoured on top.
pub fn init_logging(debug: bool) {
    INIT.call_once(|| {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(stage_filter(debug));

        tracing_subscriber::registry().with(stderr_layer).init();
    });
}

/// Like [`init_logging`], and also writes every stage event to
/// `<log_dir>/compos-layout.log`. Keep the returned guard alive until exit.
///
/// Returns `None` when logging was already initialized; no file log is
/// attached in that case.
pub fn init_logging_with_dir(debug: bool, log_dir: PathBuf) -> io::Result<Option<WorkerGuard>> {
    if INIT.is_completed() {
        warn!(log_dir = %log_dir.display(), "Logging already initialized, not attaching a file log");
        return Ok(None);
    }
    std::fs::create_dir_all(&log_dir)?;

    let mut guard = None;
    INIT.call_once(|| {
        let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, "compos-layout.log");
        let (non_blocking_appender, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(StageEventFormatter)
            .with_writer(non_blocking_appender)
            .with_filter(stage_filter(true));

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(stage_filter(debug));

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .init();
    });

    Ok(guard)
}
