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
use crate::filter;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope};
use samguard_common::endpoint::{DirectoryEndpoint, TlsMode};
use std::fmt;
use std::time::Duration;

// RFC 4511: request no attributes, only the DNs of matching entries.
const NO_ATTRS: &str = "1.1";

/// Outcome of a single directory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    NoMatch,
    Match(usize),
    ConnectionFailed(String),
    SearchFailed(String),
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::NoMatch => f.write_str("no match"),
            ProbeResult::Match(n) => write!(f, "{} matching entries", n),
            ProbeResult::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
            ProbeResult::SearchFailed(reason) => write!(f, "search failed: {}", reason),
        }
    }
}

#[async_trait]
pub trait DirectoryProber {
    /// Determine whether `identifier` already exists in the directory. The
    /// identifier is opaque bytes.
    async fn probe(&self, identifier: &[u8]) -> ProbeResult;
}

/// Probes an LDAP directory. Every call opens its own connection, binds
/// with the configured identity, runs one search and unbinds again.
pub struct LdapProber {
    endpoint: DirectoryEndpoint,
    attribute: String,
    timeout: Duration,
}

impl LdapProber {
    pub fn new(endpoint: DirectoryEndpoint, attribute: &str, timeout: Duration) -> Self {
        LdapProber {
            endpoint,
            attribute: attribute.to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &DirectoryEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Ldap, String> {
        let url = self.endpoint.url();
        debug!("Connecting to {}", url);

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.endpoint.tls_mode == TlsMode::StartTls)
            .set_no_tls_verify(!self.endpoint.tls_verify);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| format!("failed to connect to {}: {}", url, e))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        if self.endpoint.is_anonymous() {
            debug!("Using an anonymous bind");
            return Ok(ldap);
        }

        debug!("Binding as {}", self.endpoint.bind_dn);
        let res = ldap
            .with_timeout(self.timeout)
            .simple_bind(&self.endpoint.bind_dn, &self.endpoint.bind_password)
            .await
            .and_then(|r| r.success());
        match res {
            Ok(_) => Ok(ldap),
            Err(e) => {
                // The handle is dropped here, which also ends the driver.
                let _ = ldap.unbind().await;
                Err(format!("bind as {} failed: {}", self.endpoint.bind_dn, e))
            }
        }
    }

    async fn search(&self, ldap: &mut Ldap, filter: &str) -> ProbeResult {
        let res = ldap
            .with_timeout(self.timeout)
            .search(&self.endpoint.base, Scope::Subtree, filter, vec![NO_ATTRS])
            .await
            .and_then(|r| r.success());
        match res {
            Ok((entries, _)) if entries.is_empty() => ProbeResult::NoMatch,
            Ok((entries, _)) => ProbeResult::Match(entries.len()),
            Err(e) => ProbeResult::SearchFailed(e.to_string()),
        }
    }

    /// Bind and read the base entry, used to report whether the directory
    /// is reachable with the configured credentials.
    pub async fn test_connection(&self) -> Result<(), String> {
        let mut ldap = self.connect().await?;
        let res = ldap
            .with_timeout(self.timeout)
            .search(
                &self.endpoint.base,
                Scope::Base,
                "(objectClass=*)",
                vec![NO_ATTRS],
            )
            .await
            .and_then(|r| r.success());
        let _ = ldap.unbind().await;
        match res {
            Ok((entries, _)) if entries.is_empty() => Err(format!(
                "base DN '{}' not found or not accessible",
                self.endpoint.base
            )),
            Ok(_) => Ok(()),
            Err(e) => Err(format!("base search failed: {}", e)),
        }
    }
}

#[async_trait]
impl DirectoryProber for LdapProber {
    async fn probe(&self, identifier: &[u8]) -> ProbeResult {
        let filter = filter::equality(&self.attribute, identifier);

        let mut ldap = match self.connect().await {
            Ok(ldap) => ldap,
            Err(reason) => {
                error!("{}", reason);
                return ProbeResult::ConnectionFailed(reason);
            }
        };

        debug!("Searching {} for {}", self.endpoint.base, filter);
        let result = self.search(&mut ldap, &filter).await;

        if let Err(e) = ldap.unbind().await {
            debug!("Error during LDAP unbind: {}", e);
        }

        match &result {
            ProbeResult::SearchFailed(reason) => error!("Search for {} failed: {}", filter, reason),
            _ => debug!("Search for {} returned {}", filter, result),
        }
        result
    }
}
