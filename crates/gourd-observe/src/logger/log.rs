use std::fs;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_appender::{non_blocking::WorkerGuard, rolling::RollingFileAppender};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::Layered, layer::SubscriberExt,
    reload,
};

use crate::logger::{
    config::{FileOutput, LoggerConfig},
    error::LoggerError,
    format::LoggerFormat,
    handle::LoggerHandle,
};

type Base = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Fully assembled subscriber: reloadable filter, console layer, optional file layer.
pub(crate) type Assembled = Layered<Vec<BoxedLayer>, Base>;

pub(crate) fn build(cfg: &LoggerConfig) -> Result<(Assembled, LoggerHandle), LoggerError> {
    let (filter, filter_handle) = reload::Layer::new(mk_filter(&cfg.level)?);

    let mut layers = vec![console_layer(cfg)?];
    let mut guard: Option<WorkerGuard> = None;
    if let Some(file) = &cfg.file {
        let (layer, g) = file_layer(cfg, file)?;
        layers.push(layer);
        guard = Some(g);
    }

    let subscriber = tracing_subscriber::registry().with(filter).with(layers);
    let handle = LoggerHandle::new(
        filter_handle,
        cfg.level.clone(),
        cfg.file.as_ref().map(|f| f.dir.clone()),
        guard,
    );
    Ok((subscriber, handle))
}

pub(crate) fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn console_layer(cfg: &LoggerConfig) -> Result<BoxedLayer, LoggerError> {
    let layer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer())
            .boxed(),
        LoggerFormat::Journald => mk_journald()?,
    };
    Ok(layer)
}

fn file_layer(
    cfg: &LoggerConfig,
    file: &FileOutput,
) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
    let fail = |reason: String| LoggerError::FileOutput {
        dir: file.dir.display().to_string(),
        reason,
    };

    fs::create_dir_all(&file.dir).map_err(|e| fail(e.to_string()))?;
    let appender = RollingFileAppender::builder()
        .rotation(file.rotation.as_rotation())
        .filename_prefix(&file.prefix)
        .filename_suffix("log")
        .build(&file.dir)
        .map_err(|e| fail(e.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(mk_timer())
        .boxed();
    Ok((layer, guard))
}

pub(crate) fn as_error(e: impl std::fmt::Display) -> LoggerError {
    let s = e.to_string();
    if s.contains("already been set") || s.contains("SetGlobalDefaultError") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(s)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald() -> Result<BoxedLayer, LoggerError> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?;
    Ok(journald.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald() -> Result<BoxedLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
