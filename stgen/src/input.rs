//! Raw instrumentation events
//!
//! [`RawEvent`] is the typed form of what an instrumentation front end
//! delivers: compute and memory operations, synchronization calls, context
//! switches and instruction counts. The replay front end reads them from a
//! line-oriented script:
//!
//! ```text
//! # comment
//! switch 1
//! iop
//! flop
//! write 0x1000 8
//! read 0x1000 4
//! sync barrier 0x80      # or a numeric code: sync 5 0x80
//! instr 1000
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hexadecimal.

use stgen_common::SyncType;

use crate::domain::{InputError, Tid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    Iop,
    Flop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    ContextSwitch(Tid),
    Comp(CompKind),
    Mem { kind: MemKind, addr: u64, bytes: u64 },
    /// Raw front-end code; validated when dispatched
    Sync { code: u8, addr: u64 },
    Instr(u64),
}

/// Parse one script line; blank and comment-only lines yield `None`
///
/// # Errors
/// Returns an error naming the line if it is not a valid event
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<RawEvent>, InputError> {
    let content = line.split_once('#').map_or(line, |(before, _)| before);
    let mut fields = content.split_whitespace();
    let Some(word) = fields.next() else {
        return Ok(None);
    };

    let mut field = |name: &'static str| {
        fields.next().ok_or(InputError::MissingField { line: line_no, field: name })
    };

    let event = match word.to_ascii_lowercase().as_str() {
        "switch" => {
            let tid = parse_number(line_no, field("thread id")?)?;
            let tid = u32::try_from(tid)
                .map_err(|_| InputError::InvalidNumber { line: line_no, value: tid.to_string() })?;
            RawEvent::ContextSwitch(Tid(tid))
        }
        "iop" => RawEvent::Comp(CompKind::Iop),
        "flop" => RawEvent::Comp(CompKind::Flop),
        "read" | "write" => {
            let kind = if word.eq_ignore_ascii_case("read") { MemKind::Read } else { MemKind::Write };
            let addr = parse_number(line_no, field("address")?)?;
            let bytes = parse_number(line_no, field("length")?)?;
            RawEvent::Mem { kind, addr, bytes }
        }
        "sync" => {
            let code = parse_sync_code(line_no, field("synchronization type")?)?;
            let addr = parse_number(line_no, field("address")?)?;
            RawEvent::Sync { code, addr }
        }
        "instr" => RawEvent::Instr(parse_number(line_no, field("instruction count")?)?),
        _ => return Err(InputError::UnknownEvent { line: line_no, word: word.to_string() }),
    };

    let rest: Vec<&str> = fields.collect();
    if !rest.is_empty() {
        return Err(InputError::TrailingInput { line: line_no, rest: rest.join(" ") });
    }
    Ok(Some(event))
}

/// Parse a whole script; line numbers start at 1
///
/// # Errors
/// Returns the first malformed line
pub fn parse_script(text: &str) -> Result<Vec<RawEvent>, InputError> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(event) = parse_line(idx + 1, line)? {
            events.push(event);
        }
    }
    Ok(events)
}

fn parse_number(line: usize, value: &str) -> Result<u64, InputError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| InputError::InvalidNumber { line, value: value.to_string() })
}

/// Names resolve to their code; numeric codes pass through unchecked
fn parse_sync_code(line: usize, value: &str) -> Result<u8, InputError> {
    if value.starts_with(|c: char| c.is_ascii_digit()) {
        let code = parse_number(line, value)?;
        return u8::try_from(code)
            .map_err(|_| InputError::InvalidNumber { line, value: value.to_string() });
    }
    SyncType::from_name(value)
        .map(SyncType::code)
        .ok_or(InputError::UnknownSyncName { line, name: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_skips_blank_and_comment_lines() {
        let script = "\
# two threads
switch 1
write 0x1000 8   # producer

switch 2
read 4096 4
";
        let events = parse_script(script).unwrap();
        assert_eq!(
            events,
            vec![
                RawEvent::ContextSwitch(Tid(1)),
                RawEvent::Mem { kind: MemKind::Write, addr: 0x1000, bytes: 8 },
                RawEvent::ContextSwitch(Tid(2)),
                RawEvent::Mem { kind: MemKind::Read, addr: 0x1000, bytes: 4 },
            ]
        );
    }

    #[test]
    fn test_sync_by_name_or_code() {
        assert_eq!(
            parse_line(1, "sync cond_wait 0x40").unwrap(),
            Some(RawEvent::Sync { code: 6, addr: 0x40 })
        );
        assert_eq!(
            parse_line(1, "sync 42 0x40").unwrap(),
            Some(RawEvent::Sync { code: 42, addr: 0x40 })
        );
        assert_eq!(
            parse_line(3, "sync yield 0x40"),
            Err(InputError::UnknownSyncName { line: 3, name: "yield".into() })
        );
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        assert_eq!(
            parse_line(7, "jump 1"),
            Err(InputError::UnknownEvent { line: 7, word: "jump".into() })
        );
        assert_eq!(
            parse_line(8, "read 0x10"),
            Err(InputError::MissingField { line: 8, field: "length" })
        );
        assert_eq!(
            parse_line(9, "write 0xzz 4"),
            Err(InputError::InvalidNumber { line: 9, value: "0xzz".into() })
        );
        assert_eq!(
            parse_line(10, "iop 3"),
            Err(InputError::TrailingInput { line: 10, rest: "3".into() })
        );
    }

    #[test]
    fn test_thread_id_must_fit_u32() {
        assert!(matches!(
            parse_line(2, "switch 0x100000000"),
            Err(InputError::InvalidNumber { line: 2, .. })
        ));
    }
}
