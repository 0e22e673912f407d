use std::fmt;

use bitmask_enum::bitmask;

use crate::cache::{AccessKind, AccessOutcome, PhysAddr};

/// everything a single access did to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessEvent {
    pub addr: PhysAddr,
    pub kind: AccessKind,
    pub tag: u64,
    pub index: u64,
    pub way: usize,
    pub outcome: AccessOutcome,
    /// tag of the valid line a miss replaced
    pub evicted: Option<u64>,
}

/// side channel notified after every access. gets no handle to the cache.
pub trait AccessObserver {
    fn on_access(&mut self, event: &AccessEvent);
}

#[bitmask(u8)]
pub enum AccessMask {
    Read,
    Write,
}

impl From<AccessKind> for AccessMask {
    fn from(k: AccessKind) -> Self {
        match k {
            AccessKind::Read => AccessMask::Read,
            AccessKind::Write => AccessMask::Write,
        }
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::Read) {
            write!(f, "read")?;
            if self.contains(Self::Write) {
                write!(f, "/write")?;
            }
        } else if self.contains(Self::Write) {
            write!(f, "write")?;
        } else {
            write!(f, "nothing")?;
        }
        Ok(())
    }
}

/// traces accesses as `log::debug!` records under target `cache_sim::dbg`.
pub struct LogObserver {
    name: String,
    mask: AccessMask,
}

impl LogObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mask: AccessMask::all(),
        }
    }
    pub fn with_mask(self, mask: AccessMask) -> Self {
        Self { mask, ..self }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn traces(&self, kind: AccessKind) -> bool {
        self.mask.contains(AccessMask::from(kind))
    }
}

impl AccessObserver for LogObserver {
    fn on_access(&mut self, e: &AccessEvent) {
        if !self.traces(e.kind) {
            return;
        }
        log::debug!(
            target: "cache_sim::dbg",
            "[{}] dbg: {}: pa: {}, tag: {:#018x}, index: {}, hit: {}",
            self.name,
            e.kind,
            e.addr,
            e.tag,
            e.index,
            e.outcome.is_hit() as u8
        );
    }
}
