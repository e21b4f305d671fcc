// ── View loading ──
//
// One `Loader` per displayed list, each owning its own cancellation
// handle, and a `GroupedView` that reconciles only once every input has
// arrived, in whatever order they land.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;
use crate::expansion::ExpansionState;
use crate::model::{Building, Floor};
use crate::reconcile::{Groupable, Grouping, reconcile};

// ── LoadState ───────────────────────────────────────────────────────

/// What a view shows for one fetch.
#[derive(Debug)]
pub struct LoadState<T> {
    pub loading: bool,
    /// Last failure. Cancellation never lands here.
    pub error: Option<CoreError>,
    pub data: Option<Arc<T>>,
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
        }
    }
}

impl<T> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            error: self.error.clone(),
            data: self.data.clone(),
        }
    }
}

// ── Loader ──────────────────────────────────────────────────────────

/// Lowers `loading` when a load ends, even if its future is dropped.
struct LoadingGuard<'a, T>(&'a watch::Sender<LoadState<T>>);

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

/// Drives one fetch and publishes its [`LoadState`].
pub struct Loader<T> {
    name: &'static str,
    state: watch::Sender<LoadState<T>>,
    cancel: Mutex<CancellationToken>,
}

impl<T> Loader<T> {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(LoadState::default());
        Self {
            name,
            state,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn state(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<T>> {
        self.state.subscribe()
    }

    /// Abort the in-flight fetch, if any.
    pub fn cancel(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Swap in a fresh token, cancelling the previous fetch.
    fn next_token(&self) -> CancellationToken {
        let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    /// Run `fetch` with a fresh cancellation token.
    ///
    /// Starting a load clears the previous error. Success replaces the
    /// data. A failure records the error and keeps the previous data.
    /// Cancellation only lowers the loading flag.
    pub async fn load<F, Fut>(&self, fetch: F) -> Result<Arc<T>, CoreError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.next_token();
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let _guard = LoadingGuard(&self.state);

        match fetch(token).await {
            Ok(data) => {
                let data = Arc::new(data);
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = None;
                    s.data = Some(Arc::clone(&data));
                });
                Ok(data)
            }
            Err(err) if err.is_cancelled() => {
                debug!(view = self.name, "load cancelled");
                self.state.send_modify(|s| s.loading = false);
                Err(err)
            }
            Err(err) => {
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }
}

// ── GroupedView ─────────────────────────────────────────────────────

/// Items, buildings and floors feeding one building/floor tree.
///
/// Each setter may be called in any order and any number of times; the
/// grouping is rebuilt whenever all three inputs are present, and the
/// expand/collapse state is rebuilt with it.
pub struct GroupedView<T> {
    items: Option<Arc<Vec<T>>>,
    buildings: Option<Arc<Vec<Building>>>,
    floors: Option<Arc<Vec<Floor>>>,
    floor_default: bool,
    grouping: Option<Grouping<T>>,
    expansion: ExpansionState,
}

impl<T: Groupable + Clone> GroupedView<T> {
    pub fn new(floor_default: bool) -> Self {
        Self {
            items: None,
            buildings: None,
            floors: None,
            floor_default,
            grouping: None,
            expansion: ExpansionState::default(),
        }
    }

    pub fn set_items(&mut self, items: Arc<Vec<T>>) {
        self.items = Some(items);
        self.rerun();
    }

    pub fn set_buildings(&mut self, buildings: Arc<Vec<Building>>) {
        self.buildings = Some(buildings);
        self.rerun();
    }

    pub fn set_floors(&mut self, floors: Arc<Vec<Floor>>) {
        self.floors = Some(floors);
        self.rerun();
    }

    fn rerun(&mut self) {
        let (Some(items), Some(buildings), Some(floors)) =
            (&self.items, &self.buildings, &self.floors)
        else {
            return;
        };
        let grouping = reconcile(items, buildings, floors);
        self.expansion = ExpansionState::from_grouping(&grouping, self.floor_default);
        debug!(
            buildings = grouping.building_order.len(),
            items = grouping.item_count(),
            "grouping rebuilt"
        );
        self.grouping = Some(grouping);
    }

    /// `None` until every input has arrived.
    pub fn grouping(&self) -> Option<&Grouping<T>> {
        self.grouping.as_ref()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn expansion_mut(&mut self) -> &mut ExpansionState {
        &mut self.expansion
    }

    pub fn into_parts(self) -> Option<(Grouping<T>, ExpansionState)> {
        self.grouping.map(|g| (g, self.expansion))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{MacAddress, NetworkDevice};

    fn device(mac: &str, building: &str) -> NetworkDevice {
        NetworkDevice {
            mac: MacAddress::new(mac),
            building_id: Some(building.into()),
            floor_id: Some("F1".into()),
            ..NetworkDevice::default()
        }
    }

    #[tokio::test]
    async fn success_publishes_data() {
        let loader: Loader<Vec<u32>> = Loader::new("numbers");
        let data = loader.load(|_| async { Ok(vec![1, 2]) }).await.unwrap();
        assert_eq!(*data, vec![1, 2]);

        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.data.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failure_sets_error_and_keeps_data() {
        let loader: Loader<u32> = Loader::new("n");
        loader.load(|_| async { Ok(1) }).await.unwrap();
        let err = loader
            .load(|_| async {
                Err(CoreError::HttpStatus {
                    status: 500,
                    message: "boom".into(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));

        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(*state.data.unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_load_is_not_an_error() {
        let loader = Arc::new(Loader::<u32>::new("slow"));
        let task = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move {
                loader
                    .load(|token| async move {
                        token.cancelled().await;
                        Err(CoreError::Cancelled)
                    })
                    .await
            })
        };

        let mut rx = loader.subscribe();
        rx.wait_for(|s| s.loading).await.unwrap();
        loader.cancel();

        let result = task.await.unwrap();
        assert!(result.unwrap_err().is_cancelled());
        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn cancelled_reload_after_failure_leaves_no_error() {
        let loader: Loader<u32> = Loader::new("retry");
        loader
            .load(|_| async {
                Err(CoreError::HttpStatus {
                    status: 500,
                    message: "x".into(),
                })
            })
            .await
            .unwrap_err();
        assert!(loader.state().error.is_some());

        let err = loader
            .load(|_| async { Err(CoreError::Cancelled) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn dropped_load_lowers_the_flag() {
        let loader: Loader<u32> = Loader::new("abandoned");
        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            loader.load(|_| std::future::pending()),
        )
        .await;
        assert!(outcome.is_err());
        assert!(!loader.state().loading);
        assert!(loader.state().error.is_none());
    }

    #[test]
    fn grouping_waits_for_every_input() {
        let mut view = GroupedView::new(false);
        view.set_floors(Arc::new(vec![]));
        view.set_items(Arc::new(vec![device("aa", "B1")]));
        assert!(view.grouping().is_none());

        view.set_buildings(Arc::new(vec![]));
        assert_eq!(view.grouping().unwrap().item_count(), 1);
    }

    #[test]
    fn any_input_change_regroups_and_resets_toggles() {
        let mut view = GroupedView::new(false);
        view.set_buildings(Arc::new(vec![]));
        view.set_floors(Arc::new(vec![]));
        view.set_items(Arc::new(vec![device("aa", "B1")]));
        view.expansion_mut().toggle_floor("B1", "F1");
        assert!(view.expansion().is_floor_expanded("B1", "F1"));

        view.set_items(Arc::new(vec![device("aa", "B1"), device("bb", "B2")]));
        assert_eq!(view.grouping().unwrap().building_order, vec!["B1", "B2"]);
        assert!(!view.expansion().is_floor_expanded("B1", "F1"));
    }
}
