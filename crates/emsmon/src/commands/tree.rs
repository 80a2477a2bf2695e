//! `tree`: print the device menu once.

use std::time::Duration;

use emsmon_core::Session;

use crate::cli::{GlobalOpts, TreeArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(session: &Session, args: TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    session.start().await?;
    let waited = util::wait_for_topology(session, Duration::from_secs(args.wait)).await;
    session.stop().await;
    waited?;

    let topology = session.store().topology();
    let out = output::render_tree(global.output, &topology, output::should_color(global.color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
