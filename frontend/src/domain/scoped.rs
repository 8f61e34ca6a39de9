//! Child collections keyed by parent id.
//!
//! Branches live under an institution, buses and routes under a branch, stops
//! under a route. Each parent gets its own controller whose screen is built
//! for that parent, so a child list is only ever filled by a request scoped to
//! it. Nothing is aggregated across parents.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pagination::PageRequest;

use crate::domain::EntityId;
use crate::domain::controller::{ControllerPorts, ListScreen, PageController};

type ScreenFactory<S> = Box<dyn Fn(&EntityId) -> S + Send + Sync>;

/// Lazily created page controllers, one per parent id.
pub struct ScopedControllers<S: ListScreen> {
    make_screen: ScreenFactory<S>,
    ports: ControllerPorts,
    page: PageRequest,
    children: Mutex<BTreeMap<EntityId, PageController<S>>>,
}

impl<S: ListScreen> ScopedControllers<S> {
    /// Build an empty map. `make_screen` builds the screen for one parent.
    pub fn new(
        ports: ControllerPorts,
        page: PageRequest,
        make_screen: impl Fn(&EntityId) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            make_screen: Box::new(make_screen),
            ports,
            page,
            children: Mutex::new(BTreeMap::new()),
        }
    }

    /// Controller for `parent`, created unmounted on first use.
    pub fn for_parent(&self, parent: &EntityId) -> PageController<S> {
        self.lock()
            .entry(parent.clone())
            .or_insert_with(|| {
                PageController::new((self.make_screen)(parent), self.ports.clone(), self.page)
            })
            .clone()
    }

    /// Controller for `parent` if one exists.
    pub fn get(&self, parent: &EntityId) -> Option<PageController<S>> {
        self.lock().get(parent).cloned()
    }

    /// Parents with a controller, in id order.
    pub fn parents(&self) -> Vec<EntityId> {
        self.lock().keys().cloned().collect()
    }

    /// Unmount and forget the controller for `parent`.
    pub fn evict(&self, parent: &EntityId) {
        if let Some(controller) = self.lock().remove(parent) {
            controller.unmount();
        }
    }

    /// Unmount every child controller.
    pub fn unmount_all(&self) {
        let children = std::mem::take(&mut *self.lock());
        for controller in children.into_values() {
            controller.unmount();
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<EntityId, PageController<S>>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
