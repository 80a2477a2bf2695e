//! `snapshot`: print the selected point values once.

use std::time::Duration;

use emsmon_core::Session;

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    session: &Session,
    args: SnapshotArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.start().await?;
    let waited = util::wait_for_values(session, Duration::from_secs(args.wait)).await;
    session.stop().await;
    waited?;

    let query = session.query();
    let ids = util::selection_ids(&query, &args.selection);
    tracing::debug!(selected = ids.len(), "rendering snapshot");

    let groups = query.snapshot_for(&ids);
    let out = output::render_readings(global.output, &groups, output::should_color(global.color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
