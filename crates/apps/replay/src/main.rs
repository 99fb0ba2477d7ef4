mod script;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalog::{Catalog, CatalogProvider};
use clap::Parser;
use foundation::{EntryId, GeoPoint};
use interaction::metrics::Counter;
use interaction::{
    Changed, InteractionMode, InteractionState, InteractionStore, StateChange, ViewMode,
};
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use viewsync::{
    GlobeFocusAdapter, GlobeRenderer, GlobeView, NavigationCoordinator, ScrollRequest, ScrollSpy,
    SelectionOrigin, SyncConfig, VirtualList,
};

use crate::script::{Script, Step, Via, View};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replays a gesture script against the list/globe sync engine"
)]
struct Args {
    /// Catalog JSON: array of entries in presentation order
    #[arg(long)]
    catalog: PathBuf,

    /// Gesture script JSON
    #[arg(long)]
    script: PathBuf,

    /// Sync config JSON (defaults apply to missing keys)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();

    let catalog = Catalog::from_json_str(&read(&args.catalog)?).map_err(|e| e.to_string())?;
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_json_str(&read(path)?).map_err(|e| e.to_string())?,
        None => SyncConfig::default(),
    };
    let nav = &mut config.navigation;
    nav.scroll_delay_ms = env_var_u64("VIEWSYNC_SCROLL_DELAY_MS", nav.scroll_delay_ms);
    nav.settle_ms = env_var_u64("VIEWSYNC_SETTLE_MS", nav.settle_ms);
    nav.lock_ms = env_var_u64("VIEWSYNC_LOCK_MS", nav.lock_ms);
    config.validate().map_err(|e| e.to_string())?;

    let script = Script::from_json_str(&read(&args.script)?).map_err(|e| e.to_string())?;
    info!(
        entries = catalog.len(),
        steps = script.steps.len(),
        "replaying script"
    );

    // A paused clock auto-advances whenever every task is waiting on a timer,
    // so replays are deterministic and do not sleep for real.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|e| format!("start runtime: {e}"))?;
    let outcome = runtime.block_on(replay(Arc::new(catalog), config, script));
    debug!(
        active = ?outcome.state.active_item_id,
        scrolls = outcome.scroll_requests.len(),
        "replay outcome"
    );
    Ok(())
}

/// Final state of a replay and every scroll the list was asked to make.
#[derive(Debug)]
struct ReplayOutcome {
    state: InteractionState,
    scroll_requests: Vec<ScrollRequest>,
}

async fn replay(catalog: Arc<Catalog>, config: SyncConfig, script: Script) -> ReplayOutcome {
    let Script { list: layout, steps } = script;
    let store = InteractionStore::new();
    let start = Instant::now();
    let _printer = store.subscribe(move |change| print_change(start, change));

    let list = Arc::new(VirtualList::from_config(layout.client_height, &config.spy));
    list.set_items(layout.items(catalog.as_ref(), &store.snapshot()));
    // The timeline only shows entries passing the filters.
    let _relayout = {
        let list = Arc::clone(&list);
        let catalog = Arc::clone(&catalog);
        store.subscribe(move |change| {
            if change.changed.contains(Changed::FILTERS) {
                let items = layout.items(catalog.as_ref(), &change.state);
                debug!(shown = items.len(), "filters changed; relaying out list");
                list.set_items(items);
            }
        })
    };
    let events = list.observe();
    let _spy = ScrollSpy::new(Arc::clone(&store), list.clone(), config.spy.clone()).spawn(events);
    let coordinator = Arc::new(NavigationCoordinator::new(
        Arc::clone(&store),
        catalog.clone(),
        list.clone(),
        config.navigation.clone(),
    ));
    let _adapter = GlobeFocusAdapter::attach(
        &store,
        catalog.clone(),
        Arc::new(TracingRenderer),
        config.globe.clone(),
    );
    let globe = GlobeView::new(Arc::clone(&store), catalog, Arc::clone(&coordinator));
    tokio::task::yield_now().await;

    for (idx, step) in steps.into_iter().enumerate() {
        debug!(step = idx, ?step, "replay step");
        let outcome = match step {
            Step::Select { id, via } => {
                let id = EntryId::from(id);
                match via {
                    Via::Card => coordinator
                        .select(&id, SelectionOrigin::ListCard)
                        .map(|_| ()),
                    Via::Marker => globe.on_marker_click(&id).map(|_| ()),
                    Via::Tooltip => {
                        globe.on_marker_hover(Some(id));
                        globe.on_tooltip_click().map(|_| ())
                    }
                }
            }
            Step::ScrollTo { px } => {
                list.set_scroll_top(px);
                Ok(())
            }
            Step::WaitMs { ms } => {
                sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
            Step::Hover { id } => {
                globe.on_marker_hover(id.map(EntryId::from));
                Ok(())
            }
            Step::Explore => {
                coordinator.enter_explore();
                Ok(())
            }
            Step::Narrative => {
                coordinator.return_to_narrative();
                Ok(())
            }
            Step::View { view } => {
                store.set_view_mode(match view {
                    View::Timeline => ViewMode::Timeline,
                    View::Globe => ViewMode::Globe,
                });
                Ok(())
            }
            Step::ToggleFilter { tag } => {
                store.toggle_filter(&tag);
                Ok(())
            }
            Step::Country { country } => {
                store.set_active_country(country);
                Ok(())
            }
            Step::ClearFilters => {
                store.clear_filters();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(step = idx, "step skipped: {e}");
        }
        // Lets the spy react to whatever the step scrolled.
        tokio::task::yield_now().await;
    }

    while coordinator.is_in_flight() {
        sleep(Duration::from_millis(50)).await;
    }

    let metrics = store.metrics();
    info!(
        spy_writes = metrics.get(Counter::SpyWrites),
        spy_suppressed = metrics.get(Counter::SpySuppressed),
        navigations = metrics.get(Counter::NavigationsStarted),
        stale = metrics.get(Counter::StaleTransitions),
        "replay finished"
    );
    ReplayOutcome {
        state: store.snapshot(),
        scroll_requests: list.scroll_requests(),
    }
}

/// Globe stand-in that logs camera commands.
struct TracingRenderer;

impl GlobeRenderer for TracingRenderer {
    fn set_point_of_view(&self, point: GeoPoint, altitude: f64, duration: Duration) {
        info!(
            lat = point.lat,
            lng = point.lng,
            altitude,
            duration_ms = duration.as_millis() as u64,
            "globe point of view"
        );
    }

    fn set_auto_rotate(&self, enabled: bool) {
        info!(enabled, "globe auto-rotate");
    }
}

#[derive(Serialize)]
struct ChangeLine<'a> {
    t_ms: u64,
    revision: u64,
    changed: Vec<String>,
    mode: &'static str,
    view_mode: &'static str,
    active_item_id: Option<&'a str>,
    focus_point: Option<[f64; 2]>,
    scrolling: bool,
    locked: bool,
    filters: Vec<&'a str>,
    country: Option<&'a str>,
}

fn print_change(start: Instant, change: &StateChange) {
    let state = &change.state;
    let line = ChangeLine {
        t_ms: start.elapsed().as_millis() as u64,
        revision: change.revision,
        changed: change
            .changed
            .iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect(),
        mode: match state.mode {
            InteractionMode::Narrative => "narrative",
            InteractionMode::Explore => "explore",
        },
        view_mode: match state.view_mode {
            ViewMode::Timeline => "timeline",
            ViewMode::Globe => "globe",
        },
        active_item_id: state.active_item_id.as_ref().map(EntryId::as_str),
        focus_point: state.focus_point.map(|p| [p.lat, p.lng]),
        scrolling: state.is_scrolling_programmatically(),
        locked: state.is_active_item_locked(),
        filters: state.active_filters.iter().map(String::as_str).collect(),
        country: state.active_country.as_deref(),
    };
    match serde_json::to_string(&line) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("state change not printable: {e}"),
    }
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{Catalog, CatalogProvider};
    use foundation::EntryId;
    use pretty_assertions::assert_eq;
    use viewsync::SyncConfig;

    use super::replay;
    use crate::script::Script;

    const CATALOG: &str = include_str!("../data/catalog.json");

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_json_str(CATALOG).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn filtering_relayouts_the_list() {
        let script = Script::from_json_str(
            r#"{"steps": [
                {"op": "toggle_filter", "tag": "hiking"},
                {"op": "scroll_to", "px": 10},
                {"op": "wait_ms", "ms": 10}
            ]}"#,
        )
        .unwrap();
        let outcome = replay(catalog(), SyncConfig::default(), script).await;
        assert_eq!(
            outcome.state.active_item_id,
            Some(EntryId::from("chamonix-2021"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn filtered_out_selection_focuses_without_scrolling() {
        let script = Script::from_json_str(
            r#"{"steps": [
                {"op": "toggle_filter", "tag": "city"},
                {"op": "select", "id": "chamonix-2021", "via": "marker"},
                {"op": "wait_ms", "ms": 2500}
            ]}"#,
        )
        .unwrap();
        let catalog = catalog();
        let chamonix = catalog.point_of(&EntryId::from("chamonix-2021"));
        let outcome = replay(Arc::clone(&catalog), SyncConfig::default(), script).await;

        assert_eq!(outcome.state.focus_point, chamonix);
        assert_eq!(
            outcome.state.active_item_id,
            Some(EntryId::from("chamonix-2021"))
        );
        assert!(outcome.scroll_requests.is_empty());
        assert!(!outcome.state.suppresses_spy());
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_filters_restores_every_card() {
        let script = Script::from_json_str(
            r#"{"steps": [
                {"op": "country", "country": "Japan"},
                {"op": "clear_filters"},
                {"op": "select", "id": "paris-2020"},
                {"op": "wait_ms", "ms": 2500}
            ]}"#,
        )
        .unwrap();
        let outcome = replay(catalog(), SyncConfig::default(), script).await;
        let scrolled: Vec<&str> = outcome
            .scroll_requests
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(scrolled, vec!["paris-2020"]);
    }
}
