//! Local item cache invalidation.
//!
//! After a stop report lands, the session patches the cached user data for
//! the item and marks derived views (continue watching, next up) stale so
//! the UI refetches them.

use std::collections::HashMap;
use std::fmt::Debug;

use parking_lot::{Mutex, RwLock};
use playsync_model::{ItemId, UserData};

/// Played state recomputed from the final stop position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedState {
    pub position_ticks: i64,
    pub played: bool,
    pub played_percentage: f64,
}

/// Cached views that depend on watch progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CachedView {
    Item(ItemId),
    Series(ItemId),
    RecentlyPlayed,
    NextUp,
    NextEpisode,
}

pub trait ItemCache: Send + Sync + Debug {
    fn apply_played_state(&self, item_id: &ItemId, state: &PlayedState);

    fn invalidate(&self, view: CachedView);
}

/// In-process cache of item user data.
#[derive(Debug, Default)]
pub struct MemoryItemCache {
    user_data: RwLock<HashMap<ItemId, UserData>>,
    invalidated: Mutex<Vec<CachedView>>,
}

impl MemoryItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item_id: ItemId, user_data: UserData) {
        self.user_data.write().insert(item_id, user_data);
    }

    pub fn user_data(&self, item_id: &ItemId) -> Option<UserData> {
        self.user_data.read().get(item_id).cloned()
    }

    /// Views invalidated since the last call.
    pub fn take_invalidated(&self) -> Vec<CachedView> {
        std::mem::take(&mut *self.invalidated.lock())
    }
}

impl ItemCache for MemoryItemCache {
    fn apply_played_state(&self, item_id: &ItemId, state: &PlayedState) {
        let mut user_data = self.user_data.write();
        let entry = user_data.entry(item_id.clone()).or_default();
        entry.playback_position_ticks = state.position_ticks;
        entry.played = state.played;
        entry.played_percentage = Some(state.played_percentage);
    }

    fn invalidate(&self, view: CachedView) {
        let mut invalidated = self.invalidated.lock();
        if !invalidated.contains(&view) {
            invalidated.push(view);
        }
    }
}
