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
use crate::classifier::{classify, classify_provisioning};
use crate::decision::{Decision, RejectKind};
use crate::prober::DirectoryProber;
use crate::provision::Provisioner;
use crate::request::{Operation, WriteRequest};
use samguard_common::config::SamGuardConfig;
use samguard_common::constants::{
    BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID, DEFAULT_CREDENTIAL_ATTR, DEFAULT_IDENTIFIER_ATTR,
};
use tracing::instrument;

const CLASS_COMPUTER: &str = "computer";
const CLASS_GROUP: &str = "group";
const CLASS_USER: &str = "user";

/// Which attributes and control the interceptor looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    pub identifier_attribute: String,
    pub credential_attribute: String,
    pub bypass_oid: String,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        GuardPolicy {
            identifier_attribute: DEFAULT_IDENTIFIER_ATTR.to_string(),
            credential_attribute: DEFAULT_CREDENTIAL_ATTR.to_string(),
            bypass_oid: BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID.to_string(),
        }
    }
}

impl GuardPolicy {
    pub fn from_config(config: &SamGuardConfig) -> Self {
        GuardPolicy {
            identifier_attribute: config.get_identifier_attribute(),
            credential_attribute: config.get_credential_attribute(),
            bypass_oid: config.get_bypass_control_oid(),
        }
    }
}

/// Sits in front of the directory write path and decides, once per
/// request, whether the write may be forwarded.
pub struct Guard<P, V> {
    prober: P,
    provisioner: V,
    policy: GuardPolicy,
}

impl<P, V> Guard<P, V>
where
    P: DirectoryProber + Send + Sync,
    V: Provisioner + Send + Sync,
{
    pub fn new(prober: P, provisioner: V, policy: GuardPolicy) -> Self {
        Guard {
            prober,
            provisioner,
            policy,
        }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    #[instrument(level = "debug", skip_all, fields(operation = %req.operation, dn = req.dn.as_deref().unwrap_or("")))]
    pub async fn intercept(&self, req: &WriteRequest) -> Decision {
        if req.is_bypassed(&self.policy.bypass_oid) {
            return Decision::Allow;
        }

        // Refused whatever other classes come along, computer included.
        if req.has_object_class(CLASS_USER) || req.has_object_class(CLASS_GROUP) {
            error!("{} of user and group objects is disabled", req.operation);
            return Decision::Reject(RejectKind::PolicyDisabled);
        }
        if req.has_object_class(CLASS_COMPUTER) && req.operation == Operation::Add {
            return self.provision_computer(req).await;
        }

        let identifier = match req.first_value(&self.policy.identifier_attribute) {
            Some(v) if !v.is_empty() => v,
            _ => {
                debug!(
                    "No {} in request, nothing to check",
                    self.policy.identifier_attribute
                );
                return Decision::Allow;
            }
        };

        let result = self.prober.probe(identifier).await;
        let decision = classify(&result);
        match decision {
            Decision::Allow => {
                info!(
                    "{} {} is not in use",
                    self.policy.identifier_attribute,
                    String::from_utf8_lossy(identifier)
                );
            }
            Decision::Reject(kind) => {
                warn!(
                    "Refusing {} of {} {}: {} ({})",
                    req.operation,
                    self.policy.identifier_attribute,
                    String::from_utf8_lossy(identifier),
                    kind,
                    result
                );
            }
        }
        decision
    }

    async fn provision_computer(&self, req: &WriteRequest) -> Decision {
        let name = match req.first_value(&self.policy.identifier_attribute) {
            Some(v) if !v.is_empty() => v,
            _ => {
                debug!(
                    "Computer add without {}, passing it on",
                    self.policy.identifier_attribute
                );
                return Decision::Allow;
            }
        };
        let credential = match req.first_value(&self.policy.credential_attribute) {
            Some(v) => v,
            None => {
                error!(
                    "add of computer object without {}",
                    self.policy.credential_attribute
                );
                return Decision::Reject(RejectKind::MissingCredential);
            }
        };

        let outcome = self.provisioner.provision(name, credential).await;
        let decision = classify_provisioning(&outcome);
        match decision {
            Decision::Allow => info!(
                "Provisioned computer {}",
                String::from_utf8_lossy(name)
            ),
            Decision::Reject(kind) => warn!(
                "Refusing add of computer {}: {} ({})",
                String::from_utf8_lossy(name),
                kind,
                outcome
            ),
        }
        decision
    }
}
