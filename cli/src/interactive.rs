use std::io::{stdin, stdout, Write};

use anyhow::Result;
use cache_sim::{
    observer::{AccessMask, LogObserver},
    sim::{Served, Simulator},
    AccessKind, PhysAddr,
};

peg::parser!(grammar command() for str {
    rule number() -> u64
        = quiet!{"0" ['x' | 'X']} n:$(quiet!{['0'..='9'|'a'..='f'|'A'..='F']+}) {?
            u64::from_str_radix(n, 16).map_err(|_| "64-bit number")
        }
        / n:$(quiet!{['0'..='9']+}) {? n.parse().map_err(|_| "64-bit number") }
        / expected!("number")
    rule unit() -> u64
        = ['k' | 'K'] { 1 << 10 }
        / ['m' | 'M'] { 1 << 20 }
        / ['g' | 'G'] { 1 << 30 }
        / { 1 }
    rule size() -> u64
        = n:number() u:unit() {? n.checked_mul(u).ok_or("size within 64 bits") }
    rule addr() -> PhysAddr
        = n:number() { PhysAddr::new(n) }
    rule level() -> usize
        = ['L' | 'l'] n:$(['0'..='9']+) {?
            n.parse::<usize>().ok().and_then(|n| n.checked_sub(1)).ok_or("level counted from 1")
        }
    rule read() = "read" / "r"
    rule write() = "write" / "w"
    rule kind() -> AccessKind
        = write() { AccessKind::Write }
        / read() { AccessKind::Read }
    rule mask() -> AccessMask
        = "read" "s"? { AccessMask::Read }
        / "write" "s"? { AccessMask::Write }
    rule show_kind() -> ShowKind
        = "stat" "s"? { ShowKind::Stat }
        / "info" { ShowKind::Info }
        / "internals" l:(__ l:level() { l })? { ShowKind::Internals(l.unwrap_or(0)) }
    rule cmd() -> Command
        = ("exit" / "quit") { Command::Exit }
        / "flush" { Command::Flush }
        / "reset" { Command::ResetStat }
        / "resize" __ s:size() __ b:size() __ a:size() {
            Command::Resize { size: s, block_size: b, assoc: a }
        }
        / "show" __ k:show_kind() { Command::Show(k) }
        / "debug" __ "off" { Command::Debug(None) }
        / "debug" (__ "on")? m:(__ m:mask() { m })? {
            Command::Debug(Some(m.unwrap_or(AccessMask::all())))
        }
        / k:kind() __ a:addr() { Command::Access(k, a) }
    pub(crate) rule parse_command() -> Command
        = _ c:cmd() _ { c }
        / expected!("command")

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Access(AccessKind, PhysAddr),
    Flush,
    ResetStat,
    Resize {
        size: u64,
        block_size: u64,
        assoc: u64,
    },
    Show(ShowKind),
    /// `None` turns tracing off
    Debug(Option<AccessMask>),
    Exit,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShowKind {
    Stat,
    Info,
    Internals(usize),
}

fn show(sim: &Simulator, kind: ShowKind) -> Result<()> {
    match kind {
        #[cfg(feature = "stat")]
        ShowKind::Stat => {
            let width = crate::get_terminal_width().unwrap_or(60) as usize;
            println!("{}", sim.collect_stat().view(width));
        }
        #[cfg(not(feature = "stat"))]
        ShowKind::Stat => {
            for l in sim.report()? {
                println!("{}: {:?}", l.name, l.statistics);
            }
        }
        ShowKind::Info => {
            println!("Cache Info");
            for l in sim.levels() {
                println!("{}: {}", l.name(), l.cache().geometry());
            }
        }
        ShowKind::Internals(level) => {
            println!("{}", sim.snapshot(level)?);
        }
    }
    Ok(())
}

pub fn execute_interactive(sim: &mut Simulator) -> Result<()> {
    println!("entering interactive.");
    loop {
        print!("> ");
        stdout().flush()?;
        let mut str = String::new();
        if stdin().read_line(&mut str)? == 0 {
            break;
        }
        if str.trim().is_empty() {
            continue;
        }
        let parsed = match command::parse_command(&str) {
            Ok(p) => p,
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Access(kind, addr) => match sim.access(addr, kind)? {
                Served::Level(i) => {
                    let name = sim.levels()[i].name();
                    println!("{kind} {addr}: hit in {name}");
                }
                Served::Memory => println!("{kind} {addr}: miss"),
            },
            Command::Flush => {
                sim.flush()?;
                println!("flushed.");
            }
            Command::ResetStat => {
                sim.reset_statistics()?;
                println!("statistics reset.");
            }
            Command::Resize {
                size,
                block_size,
                assoc,
            } => match sim.resize_level(0, size, block_size, assoc) {
                Ok(()) => show(sim, ShowKind::Info)?,
                Err(e) => println!("{e}"),
            },
            Command::Show(kind) => {
                if let Err(e) = show(sim, kind) {
                    println!("{e}");
                }
            }
            Command::Debug(mask) => {
                sim.set_debug_logging(|name| mask.map(|m| LogObserver::new(name).with_mask(m)))?;
                match mask {
                    Some(m) => println!("tracing {m} accesses"),
                    None => println!("tracing disabled"),
                }
            }
            Command::Exit => break,
        }
    }
    println!("exiting interactive.");
    Ok(())
}
