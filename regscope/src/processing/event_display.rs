use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::DecodeConfig;
use crate::decode::ContextEvent;
use crate::domain::Pid;
use crate::symbolization::MapsResolver;

/// One decoded event as written by `--json`, one object per line
#[derive(Debug, Serialize)]
pub struct EventJson {
    pub uuid: String,
    pub event_id: u32,
    pub ts: u64,
    pub host_pid: u32,
    pub host_tid: u32,
    pub pid: u32,
    pub tid: u32,
    pub uid: u32,
    pub comm: String,
    pub argnum: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regs: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backtrace: Vec<String>,
}

impl EventJson {
    #[must_use]
    pub fn from_event(event: &ContextEvent, config: &DecodeConfig) -> Self {
        let h = &event.header;
        Self {
            uuid: event.uuid(),
            event_id: h.event_id,
            ts: h.ts,
            host_pid: h.host_pid,
            host_tid: h.host_tid,
            pid: h.pid,
            tid: h.tid,
            uid: h.uid,
            comm: event.comm(),
            argnum: h.argnum,
            regs: event.registers().map(|regs| config.layout.register_map(regs)),
            backtrace: event.stackinfo.lines().map(|line| line.trim_start().to_string()).collect(),
        }
    }
}

/// Build the display line for one decoded event
///
/// Starts from the event summary, then adds at most one register section:
/// the configured register of interest resolved to `module + offset`, or the
/// full register map when the record was captured with `show_regs`. The
/// backtrace, when one was produced, comes last.
#[must_use]
pub fn describe(event: &ContextEvent, config: &DecodeConfig, resolver: &MapsResolver<'_>) -> String {
    let mut out = event.to_string();
    let regs = event.registers();

    if let Some(name) = &config.reg_name {
        if let Some(value) = regs.and_then(|regs| config.layout.value_of(name, regs)) {
            let symbol = resolver.resolve(event.pid(), value);
            out.push_str(&format!(", Reg {name}({symbol})"));
        }
    } else if event.options.show_regs {
        if let Some(regs) = regs {
            let map = config.layout.register_map(regs);
            let json = serde_json::to_string(&map).unwrap_or_default();
            out.push_str(", Regs:\n");
            out.push_str(&json);
        }
    }

    if !event.stackinfo.is_empty() {
        if event.options.show_regs {
            out.push_str("\nBacktrace:\n");
        } else {
            out.push_str(", Backtrace:\n");
        }
        out.push_str(&event.stackinfo);
    }

    out
}

/// Print the pids left stopped at the end of a session
pub fn display_stopped(pids: &[Pid]) {
    if pids.is_empty() {
        return;
    }
    let list: Vec<String> = pids.iter().map(ToString::to_string).collect();
    eprintln!("stopped: {}", list.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtraOptions;
    use crate::decode::{Payload, RegsBuf};
    use crate::symbolization::MmapArchive;
    use regscope_common::{ContextHeader, REG_ARM64_LR, REG_COUNT};
    use std::fs;

    fn event(payload: Option<Payload>, options: ExtraOptions) -> ContextEvent {
        let mut header = ContextHeader { event_id: 458, ts: 7, pid: 42, tid: 43, ..Default::default() };
        header.comm[..3].copy_from_slice(b"app");
        ContextEvent { sample_size: 56, header, payload, options, stackinfo: String::new() }
    }

    fn regs_payload() -> Payload {
        let mut regs = [0u64; REG_COUNT];
        regs[0] = 0x10;
        regs[REG_ARM64_LR] = 0x1500;
        Payload::Registers(RegsBuf { abi: 2, regs })
    }

    #[test]
    fn test_header_only() {
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new("/nonexistent", &archive);
        let event = event(None, ExtraOptions::default());

        assert_eq!(
            describe(&event, &DecodeConfig::default(), &resolver),
            "event_id:458 ts:7, host_pid:0, host_tid:0, Uid:0, pid:42, tid:43, Comm:app, argnum:0"
        );
    }

    #[test]
    fn test_register_of_interest() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("42")).unwrap();
        fs::write(root.path().join("42/maps"), "1000-2000 r-xp 0 00:00 0 /lib/libc.so\n").unwrap();
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new(root.path(), &archive);

        let config = DecodeConfig { reg_name: Some("lr".to_string()), ..DecodeConfig::default() };
        let options = ExtraOptions { unwind_stack: false, show_regs: true };
        let line = describe(&event(Some(regs_payload()), options), &config, &resolver);

        assert!(line.ends_with(", Reg lr(libc.so + 0x500)"), "{line}");
        assert!(!line.contains("Regs:"));
    }

    #[test]
    fn test_unknown_register_name_adds_nothing() {
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new("/nonexistent", &archive);
        let config = DecodeConfig { reg_name: Some("x30".to_string()), ..DecodeConfig::default() };
        let options = ExtraOptions { unwind_stack: false, show_regs: true };

        let line = describe(&event(Some(regs_payload()), options), &config, &resolver);
        assert!(line.ends_with("argnum:0"));
    }

    #[test]
    fn test_register_map_then_backtrace() {
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new("/nonexistent", &archive);
        let options = ExtraOptions { unwind_stack: false, show_regs: true };
        let mut event = event(Some(regs_payload()), options);
        event.stackinfo = "  #00 lr".to_string();

        let line = describe(&event, &DecodeConfig::default(), &resolver);
        let (_, tail) = line.split_once(", Regs:\n").unwrap();
        let (json, backtrace) = tail.split_once("\nBacktrace:\n").unwrap();

        let map: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(map["x0"], "0x10");
        assert_eq!(map["lr"], "0x1500");
        assert_eq!(backtrace, "  #00 lr");
    }

    #[test]
    fn test_json_shape() {
        let config = DecodeConfig::default();
        let bare = serde_json::to_value(EventJson::from_event(&event(None, ExtraOptions::default()), &config)).unwrap();
        assert!(bare.get("regs").is_none());
        assert!(bare.get("backtrace").is_none());

        let options = ExtraOptions { unwind_stack: false, show_regs: true };
        let mut event = event(Some(regs_payload()), options);
        event.stackinfo = "  #00 lr 0x1500\n  #01 x0 0x10".to_string();

        let value = serde_json::to_value(EventJson::from_event(&event, &config)).unwrap();
        assert_eq!(value["uuid"], "42_43");
        assert_eq!(value["comm"], "app");
        assert_eq!(value["regs"]["lr"], "0x1500");
        assert_eq!(value["backtrace"][1], "#01 x0 0x10");
    }

    #[test]
    fn test_backtrace_without_registers() {
        let archive = MmapArchive::new();
        let resolver = MapsResolver::new("/nonexistent", &archive);
        let options = ExtraOptions { unwind_stack: true, show_regs: false };
        let mut event = event(None, options);
        event.stackinfo = "  #00 pc".to_string();

        let line = describe(&event, &DecodeConfig::default(), &resolver);
        assert!(line.ends_with("argnum:0, Backtrace:\n  #00 pc"));
    }
}
