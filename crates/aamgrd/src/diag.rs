//! Operator diagnostics.
//!
//! A thin textual request/response surface over the registry: three request
//! kinds, each taking an optional port-name filter and returning formatted
//! text. Read-only under the shared lock.

use std::fmt::Write;

use crate::instance::Instance;
use crate::registry::AutoAttach;

/// Diagnostic request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    /// Discovered Auto-Attach server identity per port.
    Status,
    /// Per-instance I-SID/VLAN mapping table with resolved statuses.
    ShowIsid,
    /// Per-port transmit/receive/drop counters.
    Statistics,
}

/// A parsed diagnostic request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagRequest {
    /// What to dump.
    pub kind: DiagKind,
    /// Restrict output to one port, when given.
    pub port: Option<String>,
}

impl DiagRequest {
    /// Parses `status`, `show-isid`, or `statistics`, each with an optional
    /// port-name argument.
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();
        let kind = match words.next()? {
            "status" => DiagKind::Status,
            "show-isid" => DiagKind::ShowIsid,
            "statistics" => DiagKind::Statistics,
            _ => return None,
        };
        let port = words.next().map(str::to_string);
        if words.next().is_some() {
            return None;
        }
        Some(Self { kind, port })
    }
}

/// Formats a chassis or system identifier as colon-separated hex.
pub fn chassis_id_to_string(id: &[u8]) -> String {
    let mut out = String::with_capacity(id.len() * 3);
    for (i, byte) in id.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

fn print_element_status(out: &mut String, inst: &Instance) {
    let _ = writeln!(out, "LLDP: {}", inst.name());
    for server in inst.servers() {
        let id = if server.chassis_id.is_empty() {
            "<None>".to_string()
        } else {
            chassis_id_to_string(&server.chassis_id)
        };
        let descr = server.description.as_deref().unwrap_or("<None>");
        let system = chassis_id_to_string(&server.system_id);

        let _ = writeln!(out, "\tAuto Attach Primary Server Id: {}", id);
        let _ = writeln!(out, "\tAuto Attach Primary Server Descr: {}", descr);
        let _ = writeln!(out, "\tAuto Attach Primary Server System Id: {}", system);
    }
}

fn print_isid_status(out: &mut String, inst: &Instance) {
    let _ = writeln!(out, "LLDP: {}", inst.name());
    let _ = writeln!(out, "{:<8} {:<4} {:<11} {:<8}", "I-SID", "VLAN", "Source", "Status");
    let _ = writeln!(out, "-------- ---- ----------- --------");
    for entry in inst.entries_sorted() {
        let _ = writeln!(
            out,
            "{:<8} {:<4} {:<11} {:<11}",
            entry.isid, entry.vlan, "Switch", entry.status
        );
    }
}

fn print_stats(out: &mut String, inst: &Instance) {
    let c = inst.counters();
    let _ = writeln!(out, "Statistics: {}", inst.name());
    let _ = writeln!(out, "\ttx cnt: {}", c.tx);
    let _ = writeln!(out, "\trx cnt: {}", c.rx);
    let _ = writeln!(out, "\trx discarded cnt: {}", c.rx_discarded);
    let _ = writeln!(out, "\trx unrecognized cnt: {}", c.rx_unrecognized);
    let _ = writeln!(out, "\tageout cnt: {}", c.ageout);
    let _ = writeln!(out, "\tinsert cnt: {}", c.insert);
    let _ = writeln!(out, "\tdelete cnt: {}", c.delete);
    let _ = writeln!(out, "\tdrop cnt: {}", c.drop);
}

impl AutoAttach {
    /// Produces the formatted text for a diagnostic request.
    pub fn handle_diag(&self, req: &DiagRequest) -> String {
        let shared = self.shared.lock();
        let mut out = String::new();
        for inst in shared.instances.values() {
            if let Some(port) = &req.port {
                if inst.name() != port {
                    continue;
                }
            }
            match req.kind {
                DiagKind::Status => print_element_status(&mut out, inst),
                DiagKind::ShowIsid => print_isid_status(&mut out, inst),
                DiagKind::Statistics => print_stats(&mut out, inst),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AaConfig, OwnerKey};
    use aa_engine::{MemoryEngine, PortConfig};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn registry_with_port(name: &str) -> AutoAttach {
        let aa = AutoAttach::new(Arc::new(MemoryEngine::new()));
        aa.create_instance(
            &PortConfig::new(name, [0xaa, 0, 0, 0, 0, 1], 1500),
            &AaConfig { enable: true },
        );
        aa
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            DiagRequest::parse("status"),
            Some(DiagRequest {
                kind: DiagKind::Status,
                port: None
            })
        );
        assert_eq!(
            DiagRequest::parse("show-isid sw0p1"),
            Some(DiagRequest {
                kind: DiagKind::ShowIsid,
                port: Some("sw0p1".to_string())
            })
        );
        assert_eq!(
            DiagRequest::parse("statistics sw0p1"),
            Some(DiagRequest {
                kind: DiagKind::Statistics,
                port: Some("sw0p1".to_string())
            })
        );
        assert_eq!(DiagRequest::parse("bogus"), None);
        assert_eq!(DiagRequest::parse("status sw0p1 extra"), None);
        assert_eq!(DiagRequest::parse(""), None);
    }

    #[test]
    fn test_chassis_id_to_string() {
        assert_eq!(chassis_id_to_string(&[0xaa, 0x0b, 0xcc]), "aa:0b:cc");
        assert_eq!(chassis_id_to_string(&[]), "");
    }

    #[test]
    fn test_show_isid_lists_mappings() {
        let aa = registry_with_port("sw0p1");
        aa.register_mapping(OwnerKey::new(1), 100, 5);

        let out = aa.handle_diag(&DiagRequest::parse("show-isid").unwrap());
        assert!(out.contains("LLDP: sw0p1"));
        assert!(out.contains("I-SID"));
        assert!(out.contains("100"));
        assert!(out.contains("Switch"));
        assert!(out.contains("Pending"));
    }

    #[test]
    fn test_statistics_counts_transmits() {
        let aa = registry_with_port("sw0p1");
        aa.produce_frame("sw0p1", [0xaa, 0, 0, 0, 0, 1]);

        let out = aa.handle_diag(&DiagRequest::parse("statistics").unwrap());
        assert!(out.contains("Statistics: sw0p1"));
        assert!(out.contains("tx cnt: 1"));
        assert!(out.contains("rx cnt: 0"));
    }

    #[test]
    fn test_status_reports_discovered_server() {
        let aa = registry_with_port("sw0p1");
        let frame = aa_engine::status_frame([0xbb, 0, 0, 0, 0, 2], &[]);
        aa.consume_frame("sw0p1", &frame);

        let out = aa.handle_diag(&DiagRequest::parse("status").unwrap());
        assert!(out.contains("Auto Attach Primary Server Id: bb:00:00:00:00:02"));
    }

    #[test]
    fn test_port_filter() {
        let aa = registry_with_port("sw0p1");
        aa.create_instance(
            &PortConfig::new("sw0p2", [0xaa, 0, 0, 0, 0, 2], 1500),
            &AaConfig { enable: true },
        );

        let out = aa.handle_diag(&DiagRequest::parse("statistics sw0p2").unwrap());
        assert!(out.contains("Statistics: sw0p2"));
        assert!(!out.contains("Statistics: sw0p1"));

        // Filter naming no live port yields empty output, not an error.
        let out = aa.handle_diag(&DiagRequest::parse("statistics sw0p9").unwrap());
        assert!(out.is_empty());
    }
}
