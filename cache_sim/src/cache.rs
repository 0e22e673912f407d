use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use thiserror::Error;

use crate::{
    geometry::Geometry,
    observer::{AccessEvent, AccessObserver, LogObserver},
};

pub const DEFAULT_DBG_NAME: &str = "AVDC";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PhysAddr(u64);

impl PhysAddr {
    pub fn new(v: u64) -> Self {
        Self(v)
    }
    pub fn inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u8)]
pub enum AccessKind {
    Read = 0,
    Write = 1,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AccessOutcome {
    Hit,
    Miss,
}

impl AccessOutcome {
    pub fn is_hit(self) -> bool {
        self == AccessOutcome::Hit
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("size ({size}), block size ({block_size}) and assoc ({assoc}) all have to be powers of two and > zero, with at least one set")]
    InvalidGeometry { size: u64, block_size: u64, assoc: u64 },
    #[error("cache is not configured")]
    NotConfigured,
    #[error("failed to allocate {lines} cache lines")]
    Allocation { lines: u64 },
    #[error("no cache level L{} (there are {})", .index + 1, .levels)]
    NoSuchLevel { index: usize, levels: usize },
}

/// hit/miss counters. only ever reset by [`Cache::reset_statistics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub reads: u64,
    pub read_misses: u64,
    pub writes: u64,
    pub write_misses: u64,
}

impl Statistics {
    pub fn record(&mut self, kind: AccessKind, outcome: AccessOutcome) {
        let miss = u64::from(!outcome.is_hit());
        match kind {
            AccessKind::Read => {
                self.reads += 1;
                self.read_misses += miss;
            }
            AccessKind::Write => {
                self.writes += 1;
                self.write_misses += miss;
            }
        }
    }
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
    pub fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }
}

#[derive(Clone, Copy, Default)]
struct Way {
    tag: u64,
    valid: bool,
    /// 0 is LRU, `assoc - 1` is MRU
    rank: usize,
}

/// the ways of one set.
struct Set<'a>(&'a mut [Way]);

impl Set<'_> {
    fn flush(&mut self) {
        for (rank, way) in self.0.iter_mut().enumerate() {
            *way = Way {
                tag: 0,
                valid: false,
                rank,
            };
        }
    }
    fn lookup(&self, tag: u64) -> Option<usize> {
        self.0.iter().position(|w| w.valid && w.tag == tag)
    }
    fn victim(&self) -> usize {
        self.0
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.rank)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
    /// makes `way` the MRU; younger ways age by one rank.
    fn promote(&mut self, way: usize) {
        let rank = self.0[way].rank;
        let mru = self.0.len() - 1;
        for w in self.0.iter_mut() {
            if w.rank > rank {
                w.rank -= 1;
            }
        }
        self.0[way].rank = mru;
    }
    /// returns the tag it replaced, if that line was valid.
    fn fill(&mut self, way: usize, tag: u64) -> Option<u64> {
        let line = &mut self.0[way];
        let evicted = line.valid.then_some(line.tag);
        line.tag = tag;
        line.valid = true;
        self.promote(way);
        evicted
    }
}

/// every line of the cache, set after set, in one allocation.
struct Lines {
    ways: Vec<Way>,
    assoc: usize,
}

impl Lines {
    fn alloc(geometry: &Geometry) -> Result<Self, CacheError> {
        let err = || CacheError::Allocation {
            lines: geometry.num_lines(),
        };
        let num_lines = usize::try_from(geometry.num_lines()).map_err(|_| err())?;
        let assoc = usize::try_from(geometry.assoc()).map_err(|_| err())?;
        let mut ways = Vec::new();
        ways.try_reserve_exact(num_lines).map_err(|_| err())?;
        ways.resize(num_lines, Way::default());
        let mut lines = Self { ways, assoc };
        lines.flush();
        Ok(lines)
    }
    fn set(&mut self, index: usize) -> Set<'_> {
        let base = index * self.assoc;
        Set(&mut self.ways[base..base + self.assoc])
    }
    fn sets(&self) -> impl Iterator<Item = &[Way]> {
        self.ways.chunks_exact(self.assoc)
    }
    fn flush(&mut self) {
        for ways in self.ways.chunks_exact_mut(self.assoc) {
            Set(ways).flush();
        }
    }
}

/// functional model of a set-associative cache with per-set LRU replacement.
pub struct Cache {
    geometry: Geometry,
    lines: Lines,
    stats: Statistics,
    dbg: Option<LogObserver>,
    observer: Option<Box<dyn AccessObserver + Send>>,
}

impl Cache {
    pub fn new(size: u64, block_size: u64, assoc: u64) -> Result<Self, CacheError> {
        let geometry = Geometry::new(size, block_size, assoc)?;
        let lines = Lines::alloc(&geometry)?;
        Ok(Self {
            geometry,
            lines,
            stats: Statistics::default(),
            dbg: None,
            observer: None,
        })
    }
    /// replaces the storage with a flushed one of the new shape.
    /// on error the cache is left untouched. statistics survive either way.
    pub fn resize(&mut self, size: u64, block_size: u64, assoc: u64) -> Result<(), CacheError> {
        let geometry = Geometry::new(size, block_size, assoc)?;
        let lines = Lines::alloc(&geometry)?;
        self.geometry = geometry;
        self.lines = lines;
        if let Some(dbg) = &self.dbg {
            log::debug!(target: "cache_sim::dbg", "[{}] dbg: resized to {geometry}", dbg.name());
        }
        Ok(())
    }
    pub fn access(&mut self, addr: PhysAddr, kind: AccessKind) -> AccessOutcome {
        let tag = self.geometry.tag_of(addr);
        let index = self.geometry.index_of(addr);
        // index is masked by `number_of_sets - 1`
        let mut set = self.lines.set(index as usize);
        let (way, outcome, evicted) = match set.lookup(tag) {
            Some(way) => {
                set.promote(way);
                (way, AccessOutcome::Hit, None)
            }
            None => {
                let way = set.victim();
                let evicted = set.fill(way, tag);
                (way, AccessOutcome::Miss, evicted)
            }
        };
        self.stats.record(kind, outcome);
        if self.dbg.is_some() || self.observer.is_some() {
            let event = AccessEvent {
                addr,
                kind,
                tag,
                index,
                way,
                outcome,
                evicted,
            };
            if let Some(dbg) = self.dbg.as_mut() {
                dbg.on_access(&event);
            }
            if let Some(observer) = self.observer.as_mut() {
                observer.on_access(&event);
            }
        }
        outcome
    }
    pub fn flush(&mut self) {
        self.lines.flush();
    }
    pub fn reset_statistics(&mut self) {
        self.stats = Statistics::default();
    }
    pub fn statistics(&self) -> Statistics {
        self.stats
    }
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            geometry: self.geometry,
            sets: self
                .lines
                .sets()
                .map(|s| {
                    s.iter()
                        .map(|w| LineView {
                            tag: w.tag,
                            valid: w.valid,
                            rank: w.rank,
                        })
                        .collect()
                })
                .collect(),
        }
    }
    /// toggles the built-in trace of every access through `log::debug!`.
    pub fn set_debug_logging(&mut self, enabled: bool, name: Option<&str>) {
        self.dbg = enabled.then(|| LogObserver::new(name.unwrap_or(DEFAULT_DBG_NAME)));
    }
    pub fn set_log_observer(&mut self, dbg: Option<LogObserver>) {
        self.dbg = dbg;
    }
    pub fn debug_logging(&self) -> bool {
        self.dbg.is_some()
    }
    pub fn set_observer(&mut self, observer: Option<Box<dyn AccessObserver + Send>>) {
        self.observer = observer;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub tag: u64,
    pub valid: bool,
    pub rank: usize,
}

/// read-only copy of the cache contents.
#[derive(Clone, Debug, Serialize)]
pub struct CacheSnapshot {
    pub geometry: Geometry,
    pub sets: Vec<Vec<LineView>>,
}

impl CacheSnapshot {
    pub fn valid_lines(&self) -> usize {
        self.sets.iter().flatten().filter(|l| l.valid).count()
    }
    pub fn contains(&self, tag: u64, index: u64) -> bool {
        self.sets
            .get(index as usize)
            .map_or(false, |s| s.iter().any(|l| l.valid && l.tag == tag))
    }
}

impl fmt::Display for CacheSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Internals")?;
        write!(f, "{}", self.geometry)?;
        for (index, set) in self.sets.iter().enumerate() {
            for (way, line) in set.iter().enumerate() {
                write!(
                    f,
                    "\nset {index:>4} way {way:>2}: tag: <{:#018x}> valid: {} lru: {}",
                    line.tag, line.valid as u8, line.rank
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "stat")]
impl Cache {
    pub fn stat_named(&self, name: &str) -> stat::CacheStat {
        stat::CacheStat::new(name, self.geometry, self.stats)
    }
}

#[cfg(feature = "stat")]
pub mod stat {
    use std::fmt;

    use super::{Geometry, Statistics};
    use crate::stat::*;

    #[derive(Clone)]
    pub struct CacheStat {
        name: String,
        geometry: Geometry,
        stats: Statistics,
    }

    impl CacheStat {
        pub fn new(name: &str, geometry: Geometry, stats: Statistics) -> Self {
            Self {
                name: name.to_owned(),
                geometry,
                stats,
            }
        }
    }

    impl Stat for CacheStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(CacheStatView { stat: self })
        }
    }

    pub struct CacheStatView<'a> {
        stat: &'a CacheStat,
    }

    impl StatView for CacheStatView<'_> {
        fn header(&self) -> String {
            format!(
                "{} ({}) (format: `# of access / # of miss (miss ratio)`)",
                self.stat.name, self.stat.geometry
            )
        }
        fn width(&self) -> usize {
            50
        }
    }

    impl fmt::Display for CacheStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = &self.stat.stats;
            macro_rules! output {
                ($name:expr, $all:expr, $miss:expr) => {{
                    let (all, miss) = ($all, $miss);
                    writeln!(
                        f,
                        "  {:>6}:{all:>12} /{miss:>12} ({})",
                        $name,
                        Ratio(ratio(miss, all))
                    )
                }};
            }
            output!("read", s.reads, s.read_misses)?;
            output!("write", s.writes, s.write_misses)?;
            output!("total", s.accesses(), s.misses())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use proptest::prelude::*;

    use super::*;
    use AccessKind::*;
    use AccessOutcome::*;

    /// address mapping to `index` with `tag` in a 1024/64/2 cache
    fn pa(tag: u64, index: u64) -> PhysAddr {
        PhysAddr::new((tag << 9) | (index << 6))
    }

    #[test]
    fn test_construct_flushed() {
        let c = Cache::new(1024, 64, 2).unwrap();
        let snap = c.snapshot();
        assert_eq!(8, snap.sets.len());
        assert!(snap.sets.iter().all(|s| s.len() == 2));
        assert_eq!(0, snap.valid_lines());
        for set in &snap.sets {
            assert_eq!(vec![0, 1], set.iter().map(|l| l.rank).collect::<Vec<_>>());
            assert!(set.iter().all(|l| l.tag == 0));
        }
        assert_eq!(Statistics::default(), c.statistics());
    }
    #[test]
    fn test_invalid_geometry() {
        assert_eq!(
            Some(CacheError::InvalidGeometry {
                size: 1024,
                block_size: 64,
                assoc: 3
            }),
            Cache::new(1024, 64, 3).err()
        );
    }
    #[test]
    fn test_allocation_failure() {
        assert_eq!(
            Some(CacheError::Allocation { lines: 1 << 62 }),
            Cache::new(1 << 62, 1, 1).err()
        );
    }
    #[test]
    fn test_two_way_scenario() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        let (a, b, z) = (pa(0x10, 3), pa(0x20, 3), pa(0x30, 3));
        assert_eq!(Miss, c.access(a, Read));
        assert_eq!(Miss, c.access(b, Read));
        assert_eq!(Hit, c.access(a, Read));
        // b is LRU now
        assert_eq!(Miss, c.access(z, Write));
        assert_eq!(Hit, c.access(a, Read));
        assert_eq!(Miss, c.access(b, Read));
        // b replaced z, a was touched more recently
        assert_eq!(Hit, c.access(a, Read));
        assert!(!c.snapshot().contains(0x30, 3));
        let s = c.statistics();
        assert_eq!(6, s.reads);
        assert_eq!(3, s.read_misses);
        assert_eq!(1, s.writes);
        assert_eq!(1, s.write_misses);
    }
    #[test]
    fn test_evicts_b_keeps_a() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        let (a, b, z) = (pa(1, 5), pa(2, 5), pa(3, 5));
        c.access(a, Read);
        c.access(b, Read);
        c.access(a, Read);
        assert_eq!(Miss, c.access(z, Read));
        assert_eq!(Hit, c.access(a, Read));
        assert!(!c.snapshot().contains(2, 5));
    }
    #[test]
    fn test_immediate_rehit() {
        let mut c = Cache::new(4096, 16, 1).unwrap();
        let addr = PhysAddr::new(0xdead_beef);
        assert_eq!(Miss, c.access(addr, Write));
        assert_eq!(Hit, c.access(addr, Read));
        // same block, other offset
        assert_eq!(Hit, c.access(PhysAddr::new(0xdead_bee0), Read));
    }
    #[test]
    fn test_lru_eviction_order_4way() {
        let mut c = Cache::new(4096, 64, 4).unwrap();
        let per_tag = 1u64 << c.geometry().tag_shift();
        let addrs: Vec<_> = (0..5).map(|t| PhysAddr::new(t * per_tag + 0x40)).collect();
        for a in &addrs {
            assert_eq!(Miss, c.access(*a, Read));
        }
        for a in &addrs[1..] {
            assert_eq!(Hit, c.access(*a, Read));
        }
        assert_eq!(Miss, c.access(addrs[0], Read));
        // a0 replaced a1, the oldest after the re-reads
        assert_eq!(Miss, c.access(addrs[1], Read));
    }
    #[test]
    fn test_flush_keeps_statistics() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(1, 1), Read);
        c.access(pa(1, 1), Read);
        c.flush();
        assert_eq!(0, c.snapshot().valid_lines());
        assert_eq!(Miss, c.access(pa(1, 1), Read));
        assert_eq!(3, c.statistics().reads);
        assert_eq!(2, c.statistics().read_misses);
    }
    #[test]
    fn test_reset_statistics_keeps_lines() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(1, 1), Write);
        c.reset_statistics();
        assert_eq!(Statistics::default(), c.statistics());
        assert_eq!(Hit, c.access(pa(1, 1), Read));
    }
    #[test]
    fn test_resize_invalidates_lines_keeps_statistics() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(1, 1), Read);
        c.access(pa(2, 1), Write);
        let before = c.statistics();
        c.resize(2048, 32, 4).unwrap();
        assert_eq!(before, c.statistics());
        assert_eq!(16, c.geometry().number_of_sets());
        assert_eq!(0, c.snapshot().valid_lines());
        assert_eq!(Miss, c.access(pa(1, 1), Read));
    }
    #[test]
    fn test_failed_resize_has_no_effect() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(7, 2), Read);
        let geometry = *c.geometry();
        assert!(c.resize(1024, 64, 6).is_err());
        assert!(c.resize(64, 64, 2).is_err());
        assert_eq!(geometry, *c.geometry());
        assert_eq!(Hit, c.access(pa(7, 2), Read));
    }
    #[test]
    fn test_failed_resize_allocation_has_no_effect() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(3, 4), Write);
        let geometry = *c.geometry();
        assert_eq!(
            Err(CacheError::Allocation { lines: 1 << 62 }),
            c.resize(1 << 62, 1, 1)
        );
        assert_eq!(geometry, *c.geometry());
        assert_eq!(1, c.snapshot().valid_lines());
        assert_eq!(Hit, c.access(pa(3, 4), Read));
        assert_eq!(2, c.statistics().accesses());
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<AccessEvent>>>);

    impl AccessObserver for Recorder {
        fn on_access(&mut self, event: &AccessEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    #[test]
    fn test_observer_sees_decomposition() {
        let mut c = Cache::new(1024, 64, 2).unwrap();
        let rec = Recorder::default();
        c.set_observer(Some(Box::new(rec.clone())));
        c.access(pa(0x11, 6), Read);
        c.access(pa(0x22, 6), Read);
        c.access(pa(0x33, 6), Write);
        let events = rec.0.lock().unwrap();
        assert_eq!(3, events.len());
        assert_eq!((0x11, 6, 0, Miss, None), {
            let e = events[0];
            (e.tag, e.index, e.way, e.outcome, e.evicted)
        });
        assert_eq!(1, events[1].way);
        assert_eq!(Some(0x11), events[2].evicted);
        assert_eq!(Write, events[2].kind);
    }
    #[test]
    fn test_debug_logging_does_not_change_results() {
        let trace: Vec<_> = (0..200u64)
            .map(|i| (PhysAddr::new((i * 0x1c0) % 0x3000), if i % 3 == 0 { Write } else { Read }))
            .collect();
        let mut plain = Cache::new(1024, 64, 2).unwrap();
        let mut traced = Cache::new(1024, 64, 2).unwrap();
        traced.set_debug_logging(true, Some("L1"));
        assert!(traced.debug_logging());
        for (a, k) in &trace {
            assert_eq!(plain.access(*a, *k), traced.access(*a, *k));
        }
        assert_eq!(plain.statistics(), traced.statistics());
        traced.set_debug_logging(false, None);
        assert!(!traced.debug_logging());
    }
    #[test]
    fn test_snapshot_display() {
        let mut c = Cache::new(256, 64, 2).unwrap();
        c.access(PhysAddr::new(0x1c0), Read);
        let s = c.snapshot().to_string();
        let mut lines = s.lines();
        assert_eq!(Some("Cache Internals"), lines.next());
        assert_eq!(Some("size: 256, assoc: 2, line-size: 64"), lines.next());
        assert_eq!(
            Some("set    1 way  0: tag: <0x0000000000000003> valid: 1 lru: 1"),
            lines.nth(2)
        );
    }

    #[cfg(feature = "stat")]
    #[test]
    fn test_stat_view() {
        use crate::stat::{Stat, StatView};

        let mut c = Cache::new(1024, 64, 2).unwrap();
        c.access(pa(1, 0), Read);
        c.access(pa(1, 0), Read);
        c.access(pa(2, 0), Write);
        let stat = c.stat_named("L1");
        let view = stat.view(80);
        assert!(view.header().starts_with("L1 (size: 1024, assoc: 2, line-size: 64)"));
        let body = view.to_string();
        let mut lines = body.lines();
        assert_eq!(Some("    read:           2 /           1 ( 50.000%)"), lines.next());
        assert_eq!(Some("   write:           1 /           1 (100.000%)"), lines.next());
        assert_eq!(Some("   total:           3 /           2 ( 66.667%)"), lines.next());
    }

    /// per-set list of tags, front is LRU
    struct Reference {
        sets: Vec<VecDeque<u64>>,
        assoc: usize,
    }

    impl Reference {
        fn new(g: &Geometry) -> Self {
            Self {
                sets: vec![VecDeque::new(); g.number_of_sets() as usize],
                assoc: g.assoc() as usize,
            }
        }
        fn access(&mut self, tag: u64, index: u64) -> AccessOutcome {
            let set = &mut self.sets[index as usize];
            if let Some(pos) = set.iter().position(|t| *t == tag) {
                set.remove(pos);
                set.push_back(tag);
                Hit
            } else {
                if set.len() == self.assoc {
                    set.pop_front();
                }
                set.push_back(tag);
                Miss
            }
        }
    }

    fn check_representation(c: &Cache) {
        let assoc = c.geometry().assoc() as usize;
        for set in c.snapshot().sets {
            let mut ranks: Vec<_> = set.iter().map(|l| l.rank).collect();
            ranks.sort_unstable();
            assert_eq!((0..assoc).collect::<Vec<_>>(), ranks);
            let mut tags: Vec<_> = set.iter().filter(|l| l.valid).map(|l| l.tag).collect();
            let n = tags.len();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(n, tags.len(), "duplicate valid tag in a set");
        }
    }

    fn geometry_params() -> impl Strategy<Value = (u64, u64, u64)> {
        (0u32..=6, 0u32..=3, 0u32..=4)
            .prop_map(|(b, a, s)| (1u64 << (b + a + s), 1u64 << b, 1u64 << a))
    }

    fn trace() -> impl Strategy<Value = Vec<(u64, bool)>> {
        prop::collection::vec((0u64..1 << 14, any::<bool>()), 0..400)
    }

    fn kind(write: bool) -> AccessKind {
        if write {
            Write
        } else {
            Read
        }
    }

    proptest! {
        #[test]
        fn prop_capacity_decomposition((size, block_size, assoc) in geometry_params()) {
            let g = Geometry::new(size, block_size, assoc).unwrap();
            prop_assert_eq!(size, g.number_of_sets() * g.assoc() * g.block_size());
        }

        #[test]
        fn prop_rejects_non_powers_of_two(size in 1u64..5000, block_size in 1u64..300, assoc in 1u64..20) {
            let valid = size.is_power_of_two() && block_size.is_power_of_two() && assoc.is_power_of_two()
                && size >= block_size * assoc;
            prop_assert_eq!(valid, Cache::new(size, block_size, assoc).is_ok());
        }

        #[test]
        fn prop_matches_reference_lru((size, block_size, assoc) in geometry_params(), t in trace()) {
            let mut c = Cache::new(size, block_size, assoc).unwrap();
            let g = *c.geometry();
            let mut r = Reference::new(&g);
            for (addr, write) in &t {
                let addr = PhysAddr::new(*addr);
                let expected = r.access(g.tag_of(addr), g.index_of(addr));
                prop_assert_eq!(expected, c.access(addr, kind(*write)));
            }
            check_representation(&c);
        }

        #[test]
        fn prop_statistics_consistent((size, block_size, assoc) in geometry_params(), t in trace()) {
            let mut c = Cache::new(size, block_size, assoc).unwrap();
            for (addr, write) in &t {
                c.access(PhysAddr::new(*addr), kind(*write));
            }
            let s = c.statistics();
            prop_assert_eq!(t.len() as u64, s.accesses());
            prop_assert!(s.read_misses <= s.reads);
            prop_assert!(s.write_misses <= s.writes);
        }

        #[test]
        fn prop_cold_start_misses((size, block_size, assoc) in geometry_params(), t in trace()) {
            let mut c = Cache::new(size, block_size, assoc).unwrap();
            c.access(PhysAddr::new(0), Read);
            c.flush();
            let mut seen = std::collections::HashSet::new();
            for (addr, write) in &t {
                let block = addr / block_size;
                let outcome = c.access(PhysAddr::new(*addr), kind(*write));
                if seen.insert(block) {
                    prop_assert_eq!(Miss, outcome);
                }
            }
        }

        #[test]
        fn prop_no_cross_set_interference((size, block_size, assoc) in geometry_params(), t in trace(), target in 0u64..16) {
            let mut full = Cache::new(size, block_size, assoc).unwrap();
            let mut alone = Cache::new(size, block_size, assoc).unwrap();
            let g = *full.geometry();
            let target = target % g.number_of_sets();
            for (addr, write) in &t {
                let addr = PhysAddr::new(*addr);
                let outcome = full.access(addr, kind(*write));
                if g.index_of(addr) == target {
                    prop_assert_eq!(alone.access(addr, kind(*write)), outcome);
                }
            }
            let (full, alone) = (full.snapshot(), alone.snapshot());
            prop_assert_eq!(&full.sets[target as usize], &alone.sets[target as usize]);
        }
    }
}
