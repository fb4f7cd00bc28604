use std::collections::BTreeMap;

use log::{debug, warn};
use pyramid::TileAddress;
use scene::{NodeId, RenderSurface};

use crate::transport::{LoadHandle, LoadPoll, TileLoadError, TileTransport};

/// Lifecycle of one cached tile.
///
/// A tile is `Loading` exactly once; after that it only toggles between
/// `Ready` and `Hidden`. Failed loads are removed from the registry
/// entirely so a later request can retry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileState {
    Loading,
    Ready,
    Hidden,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The tile is already cached (or in flight); no transport work started.
    AlreadyVisible,
    /// A new load was started.
    NowLoading,
}

#[derive(Debug)]
struct TileEntry {
    state: TileState,
    node: Option<NodeId>,
    handle: Option<LoadHandle>,
}

/// Result of one completion sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSweep {
    pub completed: Vec<TileAddress>,
    pub failed: Vec<(TileAddress, TileLoadError)>,
    /// True when this sweep brought the in-flight count to zero.
    pub settled: bool,
}

/// Cache of tile entries keyed by address, with the in-flight load counter.
///
/// Entries are kept in a `BTreeMap` for stable traversal order. There is no
/// eviction: hidden tiles persist for reuse for the session's lifetime.
#[derive(Debug)]
pub struct TileRegistry {
    base_path: String,
    entries: BTreeMap<TileAddress, TileEntry>,
    loading: u32,
}

impl TileRegistry {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            entries: BTreeMap::new(),
            loading: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loading_count(&self) -> u32 {
        self.loading
    }

    pub fn state(&self, address: TileAddress) -> Option<TileState> {
        self.entries.get(&address).map(|e| e.state)
    }

    pub fn node(&self, address: TileAddress) -> Option<NodeId> {
        self.entries.get(&address).and_then(|e| e.node)
    }

    /// Ensure a tile is visible, loading it if it has never been seen.
    ///
    /// At most one transport call is ever outstanding per address: a second
    /// request while the first is still loading takes the
    /// `AlreadyVisible` branch and starts nothing.
    pub fn request(
        &mut self,
        address: TileAddress,
        transport: &mut dyn TileTransport,
        surface: &mut dyn RenderSurface,
    ) -> RequestOutcome {
        if let Some(entry) = self.entries.get_mut(&address) {
            if entry.state == TileState::Hidden {
                entry.state = TileState::Ready;
                if let Some(node) = entry.node {
                    surface.set_node_visible(node, true);
                }
            }
            return RequestOutcome::AlreadyVisible;
        }

        let path = address.path(&self.base_path);
        debug!("loading {path}");
        let handle = transport.begin(address, path);
        self.entries.insert(
            address,
            TileEntry {
                state: TileState::Loading,
                node: None,
                handle: Some(handle),
            },
        );
        self.loading += 1;
        RequestOutcome::NowLoading
    }

    /// Hide a ready tile. Safe to call for addresses never requested.
    pub fn hide(&mut self, address: TileAddress, surface: &mut dyn RenderSurface) -> bool {
        match self.entries.get_mut(&address) {
            Some(entry) if entry.state == TileState::Ready => {
                entry.state = TileState::Hidden;
                if let Some(node) = entry.node {
                    surface.set_node_visible(node, false);
                }
                true
            }
            _ => false,
        }
    }

    /// Drive pending loads to completion.
    ///
    /// Per-tile failures are recorded and never interrupt the rest of the
    /// sweep. A late-arriving tile is still installed; the next resolution
    /// pass decides whether it stays visible.
    pub fn poll_loads(
        &mut self,
        transport: &mut dyn TileTransport,
        surface: &mut dyn RenderSurface,
    ) -> LoadSweep {
        let pending: Vec<(TileAddress, LoadHandle)> = self
            .entries
            .iter()
            .filter_map(|(addr, entry)| entry.handle.map(|h| (*addr, h)))
            .collect();

        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for (address, handle) in pending {
            match transport.poll(handle) {
                LoadPoll::Pending => {}
                LoadPoll::Ready(bitmap) => {
                    let node = surface.create_tile_node(address.level, address.origin(), &bitmap);
                    if let Some(entry) = self.entries.get_mut(&address) {
                        entry.state = TileState::Ready;
                        entry.node = Some(node);
                        entry.handle = None;
                    }
                    self.loading = self.loading.saturating_sub(1);
                    completed.push(address);
                }
                LoadPoll::Failed(err) => {
                    warn!("tile {address} failed: {err}");
                    self.entries.remove(&address);
                    self.loading = self.loading.saturating_sub(1);
                    failed.push((address, err));
                }
            }
        }

        let settled = self.loading == 0 && !(completed.is_empty() && failed.is_empty());
        LoadSweep {
            completed,
            failed,
            settled,
        }
    }
}
