//! `watch`: keep the session open and redraw the selection on a timer.

use std::io::IsTerminal;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use emsmon_core::{Session, SessionEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub async fn handle(session: &Session, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut events = session.events();
    session.start().await?;

    let color = output::should_color(global.color);
    let redraw_in_place = matches!(global.output, OutputFormat::Table | OutputFormat::Plain)
        && std::io::stdout().is_terminal();

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            _ = ticker.tick() => {
                let query = session.query();
                if query.store().topology().is_empty() {
                    continue;
                }
                let ids = util::selection_ids(&query, &args.selection);
                let groups = query.snapshot_for(&ids);
                let out = match output::render_readings(global.output, &groups, color) {
                    Ok(out) => out,
                    Err(e) => break Err(e),
                };
                if redraw_in_place && !global.quiet {
                    print!("{CLEAR_SCREEN}");
                }
                output::print_output(&out, global.quiet);
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Log(message)) => {
                    if !global.quiet {
                        eprintln!("[{}] {message}", chrono::Local::now().format("%H:%M:%S"));
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event receiver lagged");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    session.stop().await;
    result
}
