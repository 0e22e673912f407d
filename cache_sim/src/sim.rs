use serde::Serialize;

use crate::{
    cache::{AccessKind, Cache, CacheError, CacheSnapshot, PhysAddr, Statistics},
    config::SimConfig,
    geometry::Geometry,
    observer::LogObserver,
    trace::TraceEvent,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

pub struct Level {
    name: String,
    cache: Cache,
}

impl Level {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

/// where an access was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Served {
    Level(usize),
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelReport {
    pub name: String,
    pub geometry: Geometry,
    pub statistics: Statistics,
}

/// chain of caches. level `i + 1` only sees the misses of level `i`.
#[derive(Default)]
pub struct Simulator {
    levels: Vec<Level>,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl Simulator {
    /// a simulator without any level. every operation but
    /// [`Simulator::push_level`] fails with [`CacheError::NotConfigured`].
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_config(config: &SimConfig) -> Result<Self, CacheError> {
        let mut sim = Self::new();
        for l in &config.levels {
            sim.push_level(&l.name, l.size, l.block_size, l.assoc)?;
            if l.debug {
                sim.set_level_debug_logging(sim.levels.len() - 1, true)?;
            }
        }
        Ok(sim)
    }
    pub fn push_level(
        &mut self,
        name: &str,
        size: u64,
        block_size: u64,
        assoc: u64,
    ) -> Result<(), CacheError> {
        let cache = Cache::new(size, block_size, assoc)?;
        log::info!("added cache level {name}: {}", cache.geometry());
        self.levels.push(Level {
            name: name.to_owned(),
            cache,
        });
        Ok(())
    }
    pub fn is_configured(&self) -> bool {
        !self.levels.is_empty()
    }
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
    fn no_such_level(&self, index: usize) -> CacheError {
        match self.levels.len() {
            0 => CacheError::NotConfigured,
            levels => CacheError::NoSuchLevel { index, levels },
        }
    }
    fn level_mut(&mut self, index: usize) -> Result<&mut Level, CacheError> {
        let err = self.no_such_level(index);
        self.levels.get_mut(index).ok_or(err)
    }
    pub fn access(&mut self, addr: PhysAddr, kind: AccessKind) -> Result<Served, CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        for (i, level) in self.levels.iter_mut().enumerate() {
            if level.cache.access(addr, kind).is_hit() {
                return Ok(Served::Level(i));
            }
        }
        Ok(Served::Memory)
    }
    /// replays `events` and returns how many were simulated.
    pub fn run(&mut self, events: impl IntoIterator<Item = TraceEvent>) -> Result<u64, CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        #[cfg(feature = "stat")]
        self.stat_builder.begin();
        let mut n = 0;
        for e in events {
            self.access(e.addr, e.kind)?;
            n += 1;
        }
        #[cfg(feature = "stat")]
        self.stat_builder.end(n);
        log::debug!("replayed {n} accesses");
        Ok(n)
    }
    /// resizes level `index`.
    pub fn resize_level(
        &mut self,
        index: usize,
        size: u64,
        block_size: u64,
        assoc: u64,
    ) -> Result<(), CacheError> {
        let level = self.level_mut(index)?;
        level.cache.resize(size, block_size, assoc)?;
        log::info!("resized cache level {}: {}", level.name, level.cache.geometry());
        Ok(())
    }
    pub fn flush(&mut self) -> Result<(), CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        self.levels.iter_mut().for_each(|l| l.cache.flush());
        Ok(())
    }
    pub fn reset_statistics(&mut self) -> Result<(), CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        self.levels.iter_mut().for_each(|l| l.cache.reset_statistics());
        #[cfg(feature = "stat")]
        {
            self.stat_builder = Default::default();
        }
        Ok(())
    }
    pub fn report(&self) -> Result<Vec<LevelReport>, CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        Ok(self
            .levels
            .iter()
            .map(|l| LevelReport {
                name: l.name.clone(),
                geometry: *l.cache.geometry(),
                statistics: l.cache.statistics(),
            })
            .collect())
    }
    pub fn snapshot(&self, index: usize) -> Result<CacheSnapshot, CacheError> {
        let level = self.levels.get(index).ok_or_else(|| self.no_such_level(index))?;
        Ok(level.cache.snapshot())
    }
    /// debug trace of level `index`, tagged with the level name.
    pub fn set_level_debug_logging(&mut self, index: usize, enabled: bool) -> Result<(), CacheError> {
        let level = self.level_mut(index)?;
        let name = level.name.clone();
        level.cache.set_debug_logging(enabled, Some(&name));
        Ok(())
    }
    pub fn set_debug_logging(&mut self, dbg: impl Fn(&str) -> Option<LogObserver>) -> Result<(), CacheError> {
        if self.levels.is_empty() {
            return Err(CacheError::NotConfigured);
        }
        for level in self.levels.iter_mut() {
            level.cache.set_log_observer(dbg(&level.name));
        }
        Ok(())
    }
}

#[cfg(feature = "stat")]
impl Simulator {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        if let Some(stat) = self.stat_builder.finish() {
            buf.push(Box::new(stat));
        }
        for l in &self.levels {
            buf.push(Box::new(l.cache.stat_named(&l.name)));
        }
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::{fmt, time};

    use crate::stat::*;

    #[derive(Default)]
    pub struct SimStatBuilder {
        begin: Option<time::Instant>,
        elapsed: time::Duration,
        events: u64,
        runs: u64,
    }

    impl SimStatBuilder {
        pub fn begin(&mut self) {
            self.begin = Some(time::Instant::now());
        }
        pub fn end(&mut self, events: u64) {
            if let Some(b) = self.begin.take() {
                self.elapsed += b.elapsed();
            }
            self.events += events;
            self.runs += 1;
        }
        /// `None` until a trace was replayed.
        pub fn finish(&self) -> Option<SimStat> {
            (self.runs > 0).then_some(SimStat {
                elapsed: self.elapsed,
                events: self.events,
            })
        }
    }

    #[derive(Clone, Copy)]
    pub struct SimStat {
        elapsed: time::Duration,
        events: u64,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(SimStatView { stat: *self })
        }
    }

    struct SimStatView {
        stat: SimStat,
    }

    impl StatView for SimStatView {
        fn header(&self) -> String {
            "simulation".to_owned()
        }
        fn width(&self) -> usize {
            40
        }
    }

    impl fmt::Display for SimStatView {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let SimStat { elapsed, events } = self.stat;
            writeln!(f, "  replayed accesses: {events}")?;
            writeln!(f, "  elapsed time: {elapsed:?}")?;
            let secs = elapsed.as_secs_f64();
            if secs > 0.0 {
                write!(f, "  {:.0} accesses/s", events as f64 / secs)
            } else {
                write!(f, "  - accesses/s")
            }
        }
    }
}
