//! Metadata reconciler.
//!
//! Folds page-lifecycle signals into the tab record they address and decides when
//! a completed load becomes a history visit. Signals may arrive interleaved across
//! tabs, so every rule is last-write-wins on the tab record, and the internal-page
//! metadata (synthetic title, built-in icon) is re-asserted whenever an internal URL
//! is seen.
//!
//! Signals for tabs that no longer exist are dropped.

use crate::app::events::ShellEvent;
use crate::app::registry::{TabRegistry, TabSlot};
use crate::domain::{address, Tab, TabId, TabUpdate};
use crate::engine::{ContentSurface, LifecycleSignal, SurfaceSignal};
use crate::worker::{StoreClient, StoreRequest};

/// Sink for completed visits.
///
/// Recording is best-effort: implementations must not block and must not report
/// failure back into the reconciler.
pub trait VisitRecorder {
    fn record_visit(&mut self, url: &str, title: &str);
}

impl VisitRecorder for StoreClient {
    fn record_visit(&mut self, url: &str, title: &str) {
        self.submit(StoreRequest::RecordVisit {
            url: url.to_string(),
            title: title.to_string(),
        });
    }
}

/// Applies one signal. Returns `false` when the tab is unknown.
pub fn reconcile<S, R>(registry: &mut TabRegistry<S>, signal: SurfaceSignal, recorder: &mut R) -> bool
where
    S: ContentSurface,
    R: VisitRecorder + ?Sized,
{
    let SurfaceSignal { tab_id, signal } = signal;
    let Some(slot) = registry.slot_mut(&tab_id) else {
        tracing::debug!(tab_id = %tab_id, ?signal, "signal for closed tab discarded");
        return false;
    };

    let _span = tracing::trace_span!("reconcile", tab_id = %tab_id).entered();
    let events = apply(slot, signal, recorder);
    for event in events {
        registry.emit(event);
    }
    true
}

fn apply<S, R>(slot: &mut TabSlot<S>, signal: LifecycleSignal, recorder: &mut R) -> Vec<ShellEvent>
where
    S: ContentSurface,
    R: VisitRecorder + ?Sized,
{
    let id = slot.tab.id.clone();
    let tab = &mut slot.tab;
    let mut events = Vec::new();

    match signal {
        LifecycleSignal::LoadStarted => {
            tab.loading = true;
            tab.begin_navigation();
            events.push(loading(&id, true));
        }

        LifecycleSignal::LoadStopped => {
            tab.loading = false;
            events.push(loading(&id, false));

            let mut update = TabUpdate::url(tab.url.clone());
            if tab.is_internal() {
                tab.favicon = Some(address::APP_ICON_URL.to_string());
                update.favicon.clone_from(&tab.favicon);
            }
            events.push(ShellEvent::updated(&id, update));
        }

        LifecycleSignal::TitleChanged { title } => {
            if tab.is_internal() || title.is_empty() {
                return events;
            }
            tab.page_title = Some(title.clone());
            tab.title.clone_from(&title);
            events.push(ShellEvent::updated(&id, TabUpdate::title(title)));
        }

        LifecycleSignal::UrlChanged { url, same_page } => {
            if !same_page {
                tab.begin_navigation();
            }
            tab.url.clone_from(&url);
            slot.surface.navigated(&url, same_page);

            let mut update = TabUpdate::url(url);
            if tab.is_internal() {
                mark_internal(tab, &mut update);
            }
            events.push(ShellEvent::updated(&id, update));
        }

        LifecycleSignal::FaviconChanged { candidates } => {
            if tab.is_internal() {
                return events;
            }
            let resolved = address::pick_favicon(&candidates, &tab.url);
            tab.favicon_candidates = candidates;
            if let Some(favicon) = resolved {
                if tab.favicon.as_deref() != Some(favicon.as_str()) {
                    tab.favicon = Some(favicon.clone());
                    events.push(ShellEvent::updated(&id, TabUpdate::favicon(favicon)));
                }
            }
        }

        LifecycleSignal::LoadFinished { url, title } => {
            tab.url.clone_from(&url);
            let mut update = TabUpdate::url(url.clone());

            if tab.is_internal() {
                mark_internal(tab, &mut update);
                events.push(ShellEvent::updated(&id, update));
                return events;
            }

            if !title.is_empty() {
                tab.title.clone_from(&title);
                tab.page_title = Some(title.clone());
                update.title = Some(title.clone());
            }
            if let Some(favicon) = address::pick_favicon(&tab.favicon_candidates, &url) {
                tab.favicon = Some(favicon.clone());
                update.favicon = Some(favicon);
            }
            events.push(ShellEvent::updated(&id, update));

            let best_title = Some(title)
                .filter(|t| !t.is_empty())
                .or_else(|| tab.page_title.clone())
                .unwrap_or_else(|| url.clone());
            tracing::debug!(url = %url, "load finished, recording visit");
            recorder.record_visit(&url, &best_title);
        }
    }

    events
}

fn loading(id: &TabId, loading: bool) -> ShellEvent {
    ShellEvent::TabLoading { id: id.clone(), loading }
}

/// Re-asserts the synthetic title and built-in icon of an internal page.
fn mark_internal(tab: &mut Tab, update: &mut TabUpdate) {
    tab.title = address::internal_title(&tab.url).to_string();
    tab.favicon = Some(address::APP_ICON_URL.to_string());
    update.title = Some(tab.title.clone());
    update.favicon.clone_from(&tab.favicon);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::{NEW_TAB_URL, SETTINGS_URL};
    use crate::engine::{Bounds, BridgedEngine, BridgedSurface};

    #[derive(Default)]
    struct Visits(Vec<(String, String)>);

    impl VisitRecorder for Visits {
        fn record_visit(&mut self, url: &str, title: &str) {
            self.0.push((url.to_string(), title.to_string()));
        }
    }

    fn setup(url: &str) -> (BridgedEngine, TabRegistry<BridgedSurface>, TabId) {
        let mut engine = BridgedEngine::new();
        let mut registry = TabRegistry::new(Bounds::new(0, 90, 1200, 710), NEW_TAB_URL);
        let id = registry.create_tab(&mut engine, Some(url));
        registry.drain_events();
        (engine, registry, id)
    }

    fn send(
        registry: &mut TabRegistry<BridgedSurface>,
        id: &TabId,
        visits: &mut Visits,
        signal: LifecycleSignal,
    ) -> bool {
        reconcile(registry, SurfaceSignal::new(id.clone(), signal), visits)
    }

    fn navigate(registry: &mut TabRegistry<BridgedSurface>, id: &TabId, visits: &mut Visits, url: &str, title: &str) {
        send(registry, id, visits, LifecycleSignal::LoadStarted);
        send(
            registry,
            id,
            visits,
            LifecycleSignal::UrlChanged {
                url: url.into(),
                same_page: false,
            },
        );
        send(
            registry,
            id,
            visits,
            LifecycleSignal::LoadFinished {
                url: url.into(),
                title: title.into(),
            },
        );
        send(registry, id, visits, LifecycleSignal::LoadStopped);
    }

    #[test]
    fn finished_load_records_one_visit_and_updates_title() {
        let (_engine, mut registry, id) = setup(NEW_TAB_URL);
        let mut visits = Visits::default();

        navigate(&mut registry, &id, &mut visits, "https://example.com", "Example");

        assert_eq!(visits.0, vec![("https://example.com".to_string(), "Example".to_string())]);
        let tab = registry.get(&id).unwrap();
        assert_eq!(tab.title, "Example");
        assert_eq!(tab.favicon.as_deref(), Some("https://example.com/favicon.ico"));
        assert!(!tab.loading);
    }

    #[test]
    fn url_change_updates_address_immediately() {
        let (_engine, mut registry, id) = setup("https://a.test");
        let mut visits = Visits::default();

        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::UrlChanged {
                url: "https://a.test/#section".into(),
                same_page: true,
            },
        );

        assert_eq!(registry.get(&id).unwrap().url, "https://a.test/#section");
        assert!(visits.0.is_empty());
        let events = registry.drain_events();
        assert_eq!(
            events,
            vec![ShellEvent::updated(&id, TabUpdate::url("https://a.test/#section"))]
        );
    }

    #[test]
    fn internal_pages_keep_synthetic_metadata() {
        let (_engine, mut registry, id) = setup("https://a.test");
        let mut visits = Visits::default();

        navigate(&mut registry, &id, &mut visits, SETTINGS_URL, "settings.html");
        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::FaviconChanged {
                candidates: vec!["/evil.ico".into()],
            },
        );
        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::TitleChanged { title: "Other".into() },
        );

        let tab = registry.get(&id).unwrap();
        assert_eq!(tab.title, "Settings");
        assert_eq!(tab.favicon.as_deref(), Some(address::APP_ICON_URL));
        assert!(visits.0.is_empty());
    }

    #[test]
    fn favicon_candidates_resolve_against_page() {
        let (_engine, mut registry, id) = setup("https://a.test/docs/page.html");
        let mut visits = Visits::default();

        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::FaviconChanged {
                candidates: vec!["img/icon.png".into()],
            },
        );
        assert_eq!(
            registry.get(&id).unwrap().favicon.as_deref(),
            Some("https://a.test/docs/img/icon.png")
        );

        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::LoadFinished {
                url: "https://a.test/docs/page.html".into(),
                title: "Docs".into(),
            },
        );
        assert_eq!(
            registry.get(&id).unwrap().favicon.as_deref(),
            Some("https://a.test/docs/img/icon.png")
        );
    }

    #[test]
    fn untitled_load_falls_back_to_page_title_then_url() {
        let (_engine, mut registry, id) = setup("https://a.test");
        let mut visits = Visits::default();

        send(&mut registry, &id, &mut visits, LifecycleSignal::LoadStarted);
        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::TitleChanged { title: "Early".into() },
        );
        send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::LoadFinished {
                url: "https://a.test/".into(),
                title: String::new(),
            },
        );
        navigate(&mut registry, &id, &mut visits, "https://b.test/", "");

        assert_eq!(
            visits.0,
            vec![
                ("https://a.test/".to_string(), "Early".to_string()),
                ("https://b.test/".to_string(), "https://b.test/".to_string()),
            ]
        );
    }

    #[test]
    fn signals_for_closed_tabs_are_discarded() {
        let (mut engine, mut registry, id) = setup("https://a.test");
        registry.create_tab(&mut engine, None);
        registry.close_tab(&mut engine, &id);
        registry.drain_events();
        let mut visits = Visits::default();

        let applied = send(
            &mut registry,
            &id,
            &mut visits,
            LifecycleSignal::LoadFinished {
                url: "https://a.test".into(),
                title: "A".into(),
            },
        );

        assert!(!applied);
        assert!(visits.0.is_empty());
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn loading_flags_emit_events() {
        let (_engine, mut registry, id) = setup("https://a.test");
        let mut visits = Visits::default();

        send(&mut registry, &id, &mut visits, LifecycleSignal::LoadStarted);
        assert!(registry.get(&id).unwrap().loading);
        send(&mut registry, &id, &mut visits, LifecycleSignal::LoadStopped);

        let events = registry.drain_events();
        assert_eq!(events[0], ShellEvent::TabLoading { id: id.clone(), loading: true });
        assert_eq!(events[1], ShellEvent::TabLoading { id: id.clone(), loading: false });
    }
}
