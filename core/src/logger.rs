//! Logger and tracing-subscriber initialization.
//!
//! The analysis layer logs through [`log`]; the orchestrator/cli layer
//! instruments itself with [`tracing`]. Both are wired up here, independent
//! of each other, the same way the two coexist upstream.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static INIT_INSTANT: OnceLock<Instant> = OnceLock::new();

fn init_instant() -> &'static Instant {
    INIT_INSTANT.get_or_init(Instant::now)
}

/// Seconds since the first call to [`init_logger`] or [`init_tracing`].
#[must_use]
pub fn uptime() -> u64 {
    init_instant().elapsed().as_secs()
}

/// Initializes the `log`-crate logger used by `mixcraft-analysis`.
///
/// If `RUST_LOG` isn't set, it's overridden to silence everything outside
/// `mixcraft` crates at `filter`.
///
/// # Panics
///
/// Must only be called once.
pub fn init_logger(filter: log::LevelFilter) {
    let now = init_instant();

    let mut env = String::new();
    match std::env::var("RUST_LOG") {
        Ok(e) => {
            std::env::set_var("RUST_LOG", &e);
            env = e;
        }
        Err(_) => std::env::set_var("RUST_LOG", format!("off,mixcraft={filter}")),
    }

    env_logger::Builder::new()
        .format(move |buf, record| {
            let mut style = buf.style();
            let level = match record.level() {
                log::Level::Debug => {
                    style.set_color(env_logger::fmt::Color::Blue);
                    "D"
                }
                log::Level::Trace => {
                    style.set_color(env_logger::fmt::Color::Magenta);
                    "T"
                }
                log::Level::Info => {
                    style.set_color(env_logger::fmt::Color::White);
                    "I"
                }
                log::Level::Warn => {
                    style.set_color(env_logger::fmt::Color::Yellow);
                    "W"
                }
                log::Level::Error => {
                    style.set_color(env_logger::fmt::Color::Red);
                    "E"
                }
            };
            writeln!(
                buf,
                "| {} | {: >9.3} | {: >35} @ {: <3} | {}",
                style.set_bold(true).value(level),
                buf.style().set_dimmed(true).value(now.elapsed().as_secs_f32()),
                buf.style().set_dimmed(true).value(record.file_static().unwrap_or("???")),
                buf.style().set_dimmed(true).value(record.line().unwrap_or(0)),
                record.args(),
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .parse_default_env()
        .init();

    if env.is_empty() {
        log::info!("Log Level (Flag) ... {filter}");
    } else {
        log::info!("Log Level (RUST_LOG) ... {env}");
    }
}

/// Builds the `tracing` subscriber used by the orchestrator and CLI,
/// honoring `RUST_LOG`/`MIXCRAFT_LOG` as an `EnvFilter` with `filter` as the
/// fallback directive.
///
/// Returns the subscriber rather than installing it, mirroring
/// `tracing::subscriber::set_global_default(init_tracing())`.
#[must_use]
pub fn init_tracing(filter: tracing::level_filters::LevelFilter) -> impl tracing::Subscriber {
    let _ = init_instant();

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(filter.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish()
}
