use std::collections::BTreeMap;

use pyramid::TileAddress;
use scene::TileBitmap;

/// Identifies one in-flight tile load in a deterministic, stable way.
///
/// This is intentionally a small, copyable handle so completions can be
/// polled from the tick loop without heap allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLoadError {
    pub path: String,
    pub reason: String,
}

impl std::fmt::Display for TileLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to load {}: {}", self.path, self.reason)
    }
}

impl std::error::Error for TileLoadError {}

/// Completion state of one load, observed by polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPoll {
    Pending,
    Ready(TileBitmap),
    Failed(TileLoadError),
}

/// Asynchronous tile source.
///
/// `begin` starts a load and returns a handle; the core polls the handle
/// from its own tick, so completions never run concurrently with it.
/// Failure is a value (`LoadPoll::Failed`), never a fault that could halt
/// the loop. A polled handle that has completed is consumed.
pub trait TileTransport {
    fn begin(&mut self, address: TileAddress, path: String) -> LoadHandle;

    fn poll(&mut self, handle: LoadHandle) -> LoadPoll;
}

/// Deterministic in-memory transport.
///
/// Loads stay pending until the driver stages an outcome with `succeed` or
/// `fail`. Used by tests and by hosts that feed pre-decoded tiles.
#[derive(Debug, Default)]
pub struct ManualTransport {
    next_handle: u64,
    in_flight: BTreeMap<LoadHandle, (TileAddress, String)>,
    staged: BTreeMap<LoadHandle, Result<TileBitmap, String>>,
    begun: u64,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `begin` calls ever made.
    pub fn begun(&self) -> u64 {
        self.begun
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_loading(&self, address: TileAddress) -> bool {
        self.in_flight.values().any(|(a, _)| *a == address)
    }

    /// Stage a successful completion for `address`. Returns false if no load
    /// for that address is in flight.
    pub fn succeed(&mut self, address: TileAddress, bitmap: TileBitmap) -> bool {
        match self.handle_for(address) {
            Some(handle) => {
                self.staged.insert(handle, Ok(bitmap));
                true
            }
            None => false,
        }
    }

    /// Stage successful completions for everything in flight.
    pub fn succeed_all(&mut self, bitmap: &TileBitmap) {
        let handles: Vec<LoadHandle> = self.in_flight.keys().copied().collect();
        for handle in handles {
            self.staged.insert(handle, Ok(bitmap.clone()));
        }
    }

    /// Stage a failure for `address`.
    pub fn fail(&mut self, address: TileAddress, reason: impl Into<String>) -> bool {
        match self.handle_for(address) {
            Some(handle) => {
                self.staged.insert(handle, Err(reason.into()));
                true
            }
            None => false,
        }
    }

    fn handle_for(&self, address: TileAddress) -> Option<LoadHandle> {
        self.in_flight
            .iter()
            .find(|(_, (a, _))| *a == address)
            .map(|(h, _)| *h)
    }
}

impl TileTransport for ManualTransport {
    fn begin(&mut self, address: TileAddress, path: String) -> LoadHandle {
        self.next_handle += 1;
        self.begun += 1;
        let handle = LoadHandle(self.next_handle);
        self.in_flight.insert(handle, (address, path));
        handle
    }

    fn poll(&mut self, handle: LoadHandle) -> LoadPoll {
        let Some(outcome) = self.staged.remove(&handle) else {
            return LoadPoll::Pending;
        };
        let (_, path) = self
            .in_flight
            .remove(&handle)
            .unwrap_or((TileAddress::new(0, 0, 0), String::new()));
        match outcome {
            Ok(bitmap) => LoadPoll::Ready(bitmap),
            Err(reason) => LoadPoll::Failed(TileLoadError { path, reason }),
        }
    }
}
