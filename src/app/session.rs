//! Session persistence coordinator.
//!
//! Captures the live registry as a [`TabSnapshot`] list for the store and rebuilds
//! the registry from one at startup. Saves are issued after every close and at
//! shutdown; they are never coalesced, and the store applies them in order, so the
//! last one wins.

use crate::app::registry::TabRegistry;
use crate::domain::TabId;
use crate::engine::{ContentSurface, EngineController};
use crate::storage::models::TabSnapshot;
use crate::worker::StoreRequest;

/// Snapshot rows for the registry's tabs in order, positions sequential from 0 and
/// only the active tab marked active.
pub fn build_snapshot<S: ContentSurface>(registry: &TabRegistry<S>) -> Vec<TabSnapshot> {
    registry
        .tabs()
        .enumerate()
        .map(|(position, tab)| TabSnapshot {
            id: tab.id.to_string(),
            url: tab.url.clone(),
            title: tab.title.clone(),
            favicon: tab.favicon.clone(),
            position: i64::try_from(position).unwrap_or(i64::MAX),
            active: tab.is_active(),
        })
        .collect()
}

/// Store request persisting the current registry.
pub fn save_request<S: ContentSurface>(registry: &TabRegistry<S>) -> StoreRequest {
    let tabs = build_snapshot(registry);
    tracing::debug!(count = tabs.len(), "session snapshot built");
    StoreRequest::SaveTabSnapshot { tabs }
}

/// Recreates the tabs of `rows` in position order and activates the row marked
/// active, or the first row. An empty snapshot opens one default tab.
///
/// Returns the number of tabs opened.
pub fn restore<S, E>(registry: &mut TabRegistry<S>, engine: &mut E, rows: &[TabSnapshot]) -> usize
where
    S: ContentSurface,
    E: EngineController<Surface = S>,
{
    let _span = tracing::debug_span!("restore_session", rows = rows.len()).entered();

    if rows.is_empty() {
        tracing::debug!("empty snapshot, opening default tab");
        open_default(registry, engine);
        return 1;
    }

    let mut ordered: Vec<&TabSnapshot> = rows.iter().collect();
    ordered.sort_by_key(|row| row.position);

    let ids: Vec<TabId> = ordered
        .iter()
        .map(|row| registry.restore_tab(engine, row))
        .collect();

    let active = ordered
        .iter()
        .position(|row| row.active)
        .filter(|&index| index < ids.len())
        .unwrap_or(0);
    if let Some(id) = ids.get(active) {
        registry.switch_to(id);
    }

    tracing::info!(tabs = ids.len(), active, "session restored");
    ids.len()
}

/// Fallback when the snapshot is empty or could not be read.
pub fn open_default<S, E>(registry: &mut TabRegistry<S>, engine: &mut E)
where
    S: ContentSurface,
    E: EngineController<Surface = S>,
{
    registry.create_tab(engine, None);
}
