//! Outbound interface to whatever presents the world.
//!
//! The streaming core never draws anything. It narrates chunk lifecycle to
//! a [`ProxyHost`]: one proxy per chunk, created at a fixed world placement,
//! fed mesh uploads, toggled active, and finally destroyed. The host has no
//! channel back into the core.

use glam::Vec3;
use rustc_hash::FxHashSet;

use crate::mesh::ChunkMesh;
use crate::world::position::ChunkPos;

pub trait ProxyHost {
    /// A chunk entered the world; its proxy sits at `placement`.
    fn create(&mut self, chunk: ChunkPos, placement: Vec3);
    /// A freshly built mesh for an existing proxy.
    fn upload(&mut self, chunk: ChunkPos, mesh: &ChunkMesh);
    fn activate(&mut self, chunk: ChunkPos);
    fn deactivate(&mut self, chunk: ChunkPos);
    /// The chunk left the world; the proxy and its mesh can be dropped.
    fn destroy(&mut self, chunk: ChunkPos);
}

/// Host that discards everything. Headless runs and benchmarks.
#[derive(Debug, Default)]
pub struct NullProxyHost;

impl ProxyHost for NullProxyHost {
    fn create(&mut self, _chunk: ChunkPos, _placement: Vec3) {}
    fn upload(&mut self, _chunk: ChunkPos, _mesh: &ChunkMesh) {}
    fn activate(&mut self, _chunk: ChunkPos) {}
    fn deactivate(&mut self, _chunk: ChunkPos) {}
    fn destroy(&mut self, _chunk: ChunkPos) {}
}

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Created { chunk: ChunkPos, placement: Vec3 },
    Uploaded { chunk: ChunkPos, vertices: usize },
    Activated { chunk: ChunkPos },
    Deactivated { chunk: ChunkPos },
    Destroyed { chunk: ChunkPos },
}

/// Host that records the full call sequence and tracks which proxies are
/// alive and active. Test suites assert against it.
#[derive(Debug, Default)]
pub struct RecordingProxyHost {
    events: Vec<HostEvent>,
    live: FxHashSet<ChunkPos>,
    active: FxHashSet<ChunkPos>,
}

impl RecordingProxyHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn live_proxies(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, chunk: ChunkPos) -> bool {
        self.live.contains(&chunk)
    }

    pub fn active_proxies(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, chunk: ChunkPos) -> bool {
        self.active.contains(&chunk)
    }

    pub fn uploads_for(&self, chunk: ChunkPos) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::Uploaded { chunk: c, .. } if *c == chunk))
            .count()
    }

    pub fn destroys_for(&self, chunk: ChunkPos) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::Destroyed { chunk: c } if *c == chunk))
            .count()
    }
}

impl ProxyHost for RecordingProxyHost {
    fn create(&mut self, chunk: ChunkPos, placement: Vec3) {
        self.live.insert(chunk);
        self.events.push(HostEvent::Created { chunk, placement });
    }

    fn upload(&mut self, chunk: ChunkPos, mesh: &ChunkMesh) {
        self.events.push(HostEvent::Uploaded {
            chunk,
            vertices: mesh.vertices.len(),
        });
    }

    fn activate(&mut self, chunk: ChunkPos) {
        self.active.insert(chunk);
        self.events.push(HostEvent::Activated { chunk });
    }

    fn deactivate(&mut self, chunk: ChunkPos) {
        self.active.remove(&chunk);
        self.events.push(HostEvent::Deactivated { chunk });
    }

    fn destroy(&mut self, chunk: ChunkPos) {
        self.live.remove(&chunk);
        self.active.remove(&chunk);
        self.events.push(HostEvent::Destroyed { chunk });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_host_tracks_a_chunk_lifecycle() {
        let mut host = RecordingProxyHost::new();
        let chunk = ChunkPos::new(3, 4);

        host.create(chunk, Vec3::new(48.0, 0.0, 64.0));
        host.upload(chunk, &ChunkMesh::new());
        host.activate(chunk);
        assert!(host.is_live(chunk));
        assert!(host.is_active(chunk));

        host.deactivate(chunk);
        assert!(host.is_live(chunk));
        assert!(!host.is_active(chunk));

        host.destroy(chunk);
        assert!(!host.is_live(chunk));
        assert_eq!(host.live_proxies(), 0);
        assert_eq!(host.destroys_for(chunk), 1);

        assert_eq!(
            host.events(),
            &[
                HostEvent::Created {
                    chunk,
                    placement: Vec3::new(48.0, 0.0, 64.0)
                },
                HostEvent::Uploaded { chunk, vertices: 0 },
                HostEvent::Activated { chunk },
                HostEvent::Deactivated { chunk },
                HostEvent::Destroyed { chunk },
            ]
        );
    }

    #[test]
    fn hosts_are_object_safe() {
        let mut host: Box<dyn ProxyHost> = Box::new(NullProxyHost);
        host.create(ChunkPos::new(0, 0), Vec3::ZERO);
        host.destroy(ChunkPos::new(0, 0));
    }
}
