use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{digit1, hex_digit1, space1},
    combinator::{all_consuming, map, map_res, value},
    sequence::{preceded, separated_pair},
    IResult,
};

use crate::cache::{AccessKind, PhysAddr};

/// size of one binary record: kind byte + little endian u64 address
pub const RECORD_LEN: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub addr: PhysAddr,
    pub kind: AccessKind,
}

impl TraceEvent {
    pub fn new(addr: u64, kind: AccessKind) -> Self {
        Self {
            addr: PhysAddr::new(addr),
            kind,
        }
    }
}

fn kind(i: &str) -> IResult<&str, AccessKind> {
    alt((
        value(
            AccessKind::Read,
            alt((tag_no_case("read"), tag_no_case("r"))),
        ),
        value(
            AccessKind::Write,
            alt((tag_no_case("write"), tag_no_case("w"))),
        ),
    ))(i)
}

fn addr(i: &str) -> IResult<&str, PhysAddr> {
    map(
        alt((
            map_res(preceded(tag_no_case("0x"), hex_digit1), |h: &str| {
                u64::from_str_radix(h, 16)
            }),
            map_res(digit1, |d: &str| d.parse::<u64>()),
        )),
        PhysAddr::new,
    )(i)
}

fn event(i: &str) -> IResult<&str, TraceEvent> {
    map(separated_pair(kind, space1, addr), |(kind, addr)| {
        TraceEvent { addr, kind }
    })(i)
}

/// parses `<r|w|read|write> <address>` lines. `#` starts a comment.
pub fn parse_text(src: &str) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (n, line) in src.lines().enumerate() {
        let body = line.split('#').next().unwrap_or_default().trim();
        if body.is_empty() {
            continue;
        }
        let (_, e) = all_consuming(event)(body).map_err(|_| {
            anyhow!(
                "failed to parse trace at line {}: expected `<r|w> <address>`, found {line:?}",
                n + 1
            )
        })?;
        events.push(e);
    }
    Ok(events)
}

pub fn parse_binary(bytes: &[u8]) -> Result<Vec<TraceEvent>> {
    let records = bytes.chunks_exact(RECORD_LEN);
    if !records.remainder().is_empty() {
        return Err(anyhow!(
            "truncated trace record at byte offset {}",
            bytes.len() - records.remainder().len()
        ));
    }
    records
        .enumerate()
        .map(|(i, rec)| -> Result<TraceEvent> {
            let kind = AccessKind::try_from(rec[0])
                .map_err(|e| anyhow!("trace record #{i} has an unknown kind: {e}"))?;
            let addr = u64::from_le_bytes(rec[1..].try_into()?);
            Ok(TraceEvent::new(addr, kind))
        })
        .collect()
}

pub fn encode_binary(events: &[TraceEvent]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(events.len() * RECORD_LEN);
    for e in events {
        buf.push(e.kind.into());
        buf.extend_from_slice(&e.addr.inner().to_le_bytes());
    }
    buf
}
