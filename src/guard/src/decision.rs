/*
   Directory uniqueness guard
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use serde::Serialize;
use std::fmt;

// LDAP result codes (RFC 4511) handed back to the directory engine.
pub const LDAP_SUCCESS: u32 = 0;
pub const LDAP_UNAVAILABLE: u32 = 52;
pub const LDAP_UNWILLING_TO_PERFORM: u32 = 53;
pub const LDAP_ENTRY_ALREADY_EXISTS: u32 = 68;

/// Why a write was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectKind {
    /// The directory or the provisioning backend could not give an answer.
    /// Retrying later may succeed.
    ServiceUnavailable,
    /// The identifier is already taken. Retrying with the same identifier
    /// will fail again.
    DuplicateIdentifier,
    /// Objects of this class may not be created through this path at all.
    PolicyDisabled,
    /// A computer account add arrived without its credential attribute.
    MissingCredential,
}

impl RejectKind {
    pub fn ldap_result_code(&self) -> u32 {
        match self {
            RejectKind::ServiceUnavailable => LDAP_UNAVAILABLE,
            RejectKind::DuplicateIdentifier => LDAP_ENTRY_ALREADY_EXISTS,
            RejectKind::PolicyDisabled | RejectKind::MissingCredential => {
                LDAP_UNWILLING_TO_PERFORM
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RejectKind::ServiceUnavailable)
    }
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectKind::ServiceUnavailable => "service-unavailable",
            RejectKind::DuplicateIdentifier => "duplicate-identifier",
            RejectKind::PolicyDisabled => "policy-disabled",
            RejectKind::MissingCredential => "missing-credential",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "kebab-case")]
pub enum Decision {
    /// Forward the original write unchanged.
    Allow,
    Reject(RejectKind),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn ldap_result_code(&self) -> u32 {
        match self {
            Decision::Allow => LDAP_SUCCESS,
            Decision::Reject(kind) => kind.ldap_result_code(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Reject(kind) => write!(f, "reject ({})", kind),
        }
    }
}
