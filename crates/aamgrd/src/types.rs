//! Type definitions for the Auto-Attach manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Auto-Attach mapping response status.
///
/// The numeric codes are exchanged with the Auto-Attach server on the wire
/// and must not be renumbered. Any code outside the enumeration maps to
/// [`Status::Undefined`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Mapping accepted and active on the server.
    Active,
    /// Rejected, no further detail.
    RejectGeneric,
    /// Rejected, Auto-Attach resources unavailable.
    RejectResourceUnavailable,
    /// Rejected, request invalid.
    RejectInvalid,
    /// Rejected, VLAN resources unavailable.
    RejectVlanResourceUnavailable,
    /// Rejected, VLAN application interaction issue.
    RejectVlanApplicationIssue,
    /// Awaiting a response from the server.
    #[default]
    Pending,
    /// Fallback for any code not in the enumeration.
    Undefined,
}

impl Status {
    /// Parses a wire status code.
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Status::Active,
            3 => Status::RejectGeneric,
            4 => Status::RejectResourceUnavailable,
            6 => Status::RejectInvalid,
            8 => Status::RejectVlanResourceUnavailable,
            9 => Status::RejectVlanApplicationIssue,
            255 => Status::Pending,
            _ => Status::Undefined,
        }
    }

    /// Returns the wire code. `Undefined` has no wire representation and
    /// encodes as 0.
    pub fn code(&self) -> u8 {
        match self {
            Status::Active => 2,
            Status::RejectGeneric => 3,
            Status::RejectResourceUnavailable => 4,
            Status::RejectInvalid => 6,
            Status::RejectVlanResourceUnavailable => 8,
            Status::RejectVlanApplicationIssue => 9,
            Status::Pending => 255,
            Status::Undefined => 0,
        }
    }

    /// Returns the display string used in diagnostics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::RejectGeneric => "Reject (Generic)",
            Status::RejectResourceUnavailable => "Reject (AA resources unavailable)",
            Status::RejectInvalid => "Reject (Invalid)",
            Status::RejectVlanResourceUnavailable => "Reject (VLAN resources unavailable)",
            Status::RejectVlanApplicationIssue => "Reject (Application interaction issue)",
            Status::Pending => "Pending",
            Status::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identity correlating a mapping with an external provisioning
/// record.
///
/// The token is supplied by the caller and only ever compared and hashed;
/// the manager never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey(u64);

impl OwnerKey {
    /// Wraps a caller-supplied token.
    pub const fn new(token: u64) -> Self {
        OwnerKey(token)
    }

    /// Returns the raw token.
    pub const fn token(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An I-SID/VLAN mapping tracked for one instance (or as a template).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Service instance identifier.
    pub isid: u64,
    /// VLAN the service maps to.
    pub vlan: u64,
    /// External identity of the mapping's owner.
    pub owner: OwnerKey,
    /// Last status reported by the server.
    pub status: Status,
}

impl MappingEntry {
    /// Creates a new entry with status `Pending`.
    pub fn new(owner: OwnerKey, isid: u64, vlan: u64) -> Self {
        Self {
            isid,
            vlan,
            owner,
            status: Status::Pending,
        }
    }
}

/// VLAN operation requested from the forwarding subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VlanOp {
    /// Configure the VLAN on the port.
    Add,
    /// Remove the VLAN from the port.
    Remove,
}

impl VlanOp {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            VlanOp::Add => "add",
            VlanOp::Remove => "remove",
        }
    }
}

/// A queued VLAN provisioning instruction for the forwarding subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningOp {
    /// Port the VLAN change applies to.
    pub port_name: String,
    /// VLAN to add or remove.
    pub vlan: u64,
    /// Requested operation.
    pub op: VlanOp,
}

impl ProvisioningOp {
    /// Creates a new provisioning operation.
    pub fn new(port_name: impl Into<String>, vlan: u64, op: VlanOp) -> Self {
        Self {
            port_name: port_name.into(),
            vlan,
            op,
        }
    }
}

/// Auto-Attach options read at instance-creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AaConfig {
    /// Gates whether an instance is created at all.
    pub enable: bool,
}

impl AaConfig {
    /// Field name for the enable option.
    pub const ENABLE: &'static str = "enable";

    /// Parses options from field-value pairs. Absent or unparsable options
    /// default to disabled.
    pub fn from_field_values(fvs: &[(String, String)]) -> Self {
        let enable = fvs
            .iter()
            .find(|(f, _)| f == Self::ENABLE)
            .map(|(_, v)| v == "true")
            .unwrap_or(false);
        Self { enable }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            Status::Active,
            Status::RejectGeneric,
            Status::RejectResourceUnavailable,
            Status::RejectInvalid,
            Status::RejectVlanResourceUnavailable,
            Status::RejectVlanApplicationIssue,
            Status::Pending,
        ] {
            assert_eq!(Status::from_code(status.code()), status);
        }
    }

    #[test]
    fn test_status_unknown_code_is_undefined() {
        assert_eq!(Status::from_code(0), Status::Undefined);
        assert_eq!(Status::from_code(5), Status::Undefined);
        assert_eq!(Status::from_code(7), Status::Undefined);
        assert_eq!(Status::from_code(42), Status::Undefined);
    }

    #[test]
    fn test_status_default_is_pending() {
        assert_eq!(Status::default(), Status::Pending);
        let entry = MappingEntry::new(OwnerKey::new(1), 100, 5);
        assert_eq!(entry.status, Status::Pending);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Active.to_string(), "Active");
        assert_eq!(Status::RejectGeneric.to_string(), "Reject (Generic)");
        assert_eq!(Status::Undefined.to_string(), "Undefined");
    }

    #[test]
    fn test_owner_key_identity() {
        assert_eq!(OwnerKey::new(7), OwnerKey::new(7));
        assert_ne!(OwnerKey::new(7), OwnerKey::new(8));
        assert_eq!(OwnerKey::new(7).token(), 7);
    }

    #[test]
    fn test_aa_config_from_field_values() {
        let on = vec![("enable".to_string(), "true".to_string())];
        assert!(AaConfig::from_field_values(&on).enable);

        let off = vec![("enable".to_string(), "false".to_string())];
        assert!(!AaConfig::from_field_values(&off).enable);

        let junk = vec![("enable".to_string(), "yes".to_string())];
        assert!(!AaConfig::from_field_values(&junk).enable);

        assert!(!AaConfig::from_field_values(&[]).enable);
    }

    #[test]
    fn test_vlan_op_as_str() {
        assert_eq!(VlanOp::Add.as_str(), "add");
        assert_eq!(VlanOp::Remove.as_str(), "remove");
    }
}
