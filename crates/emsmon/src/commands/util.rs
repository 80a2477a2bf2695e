//! Shared helpers for command handlers.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use emsmon_core::{DeviceType, PointId, Query, Session, TopologyNode};

use crate::cli::SelectionArgs;
use crate::error::CliError;

/// Normalise a `--group` value: `bms` and `d_bms` both name the BMS group.
/// Anything else is passed through as a raw group key.
pub fn group_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if DeviceType::from_key(trimmed).is_some() {
        return trimmed.to_owned();
    }
    let prefixed = format!("d_{}", trimmed.to_ascii_lowercase());
    if DeviceType::from_key(&prefixed).is_some() {
        return prefixed;
    }
    trimmed.to_owned()
}

/// Tree node for a selection, or `None` for "everything".
pub fn selection_node(selection: &SelectionArgs) -> Option<TopologyNode> {
    if let Some(ref group) = selection.group {
        return Some(TopologyNode::Group(group_key(group)));
    }
    if let Some(id) = selection.device {
        return Some(TopologyNode::Device(PointId(id)));
    }
    selection.point.map(|id| TopologyNode::Point(PointId(id)))
}

/// Point ids to display for a selection, resolved against the current topology.
pub fn selection_ids(query: &Query, selection: &SelectionArgs) -> Vec<PointId> {
    match selection_node(selection) {
        Some(node) => query.children_of(&node),
        None => query.store().topology().all_point_ids(),
    }
}

/// Wait until `rx` has been bumped at least once, or the deadline passes.
async fn wait_for_bump(
    mut rx: watch::Receiver<u64>,
    deadline: Instant,
    what: &'static str,
    session: &Session,
    wait: Duration,
) -> Result<(), CliError> {
    match tokio::time::timeout_at(deadline, rx.wait_for(|v| *v > 0)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(CliError::Internal("session store dropped".into())),
        Err(_) => Err(CliError::NothingReceived {
            what,
            url: session.config().endpoint.base().to_string(),
            seconds: wait.as_secs(),
        }),
    }
}

/// Block until the first menu has been applied.
pub async fn wait_for_topology(session: &Session, wait: Duration) -> Result<(), CliError> {
    let deadline = Instant::now() + wait;
    let rx = session.store().subscribe_topology();
    wait_for_bump(rx, deadline, "device menu", session, wait).await
}

/// Block until the first menu and then the first value batch have arrived,
/// both within one overall `wait`.
pub async fn wait_for_values(session: &Session, wait: Duration) -> Result<(), CliError> {
    let deadline = Instant::now() + wait;
    let topology = session.store().subscribe_topology();
    let values = session.store().subscribe_values();
    wait_for_bump(topology, deadline, "device menu", session, wait).await?;
    wait_for_bump(values, deadline, "point values", session, wait).await
}
