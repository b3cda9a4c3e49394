use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// True when systemd has connected stderr to the journal.
fn stderr_is_journal() -> bool {
  std::env::var_os("JOURNAL_STREAM").is_some() && !atty::is(atty::Stream::Stderr)
}

/// Install the global tracing subscriber.
///
/// Filters come from `RUST_LOG` on top of an `info` default. Output goes to
/// journald under systemd and to stderr otherwise, with ANSI colours only
/// when stderr is a terminal.
pub fn init_logging() {
  let filter = EnvFilter::from_default_env()
    .add_directive(tracing::Level::INFO.into());

  let journald = if stderr_is_journal() {
    tracing_journald::layer().ok()
  } else {
    None
  };

  let fmt = if journald.is_none() {
    Some(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr)),
    )
  } else {
    None
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(journald)
    .with(fmt)
    .init();
}
