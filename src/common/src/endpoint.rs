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
use std::fmt;
use zeroize::Zeroizing;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TlsMode {
    None,
    StartTls,
    Ldaps,
}

impl TlsMode {
    pub fn parse(val: &str) -> Option<TlsMode> {
        match val.trim().to_lowercase().as_str() {
            "none" | "plain" | "off" => Some(TlsMode::None),
            "starttls" => Some(TlsMode::StartTls),
            "ldaps" | "ssl" => Some(TlsMode::Ldaps),
            _ => None,
        }
    }
}

/// Connection parameters of the authoritative directory. Built once from
/// configuration and never mutated afterwards.
#[derive(Clone)]
pub struct DirectoryEndpoint {
    pub host: String,
    pub port: u16,
    pub base: String,
    pub bind_dn: String,
    pub bind_password: Zeroizing<String>,
    pub tls_mode: TlsMode,
    pub tls_verify: bool,
}

impl DirectoryEndpoint {
    pub fn url(&self) -> String {
        let scheme = match self.tls_mode {
            TlsMode::Ldaps => "ldaps",
            TlsMode::None | TlsMode::StartTls => "ldap",
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_empty()
    }
}

impl fmt::Debug for DirectoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base", &self.base)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("tls_mode", &self.tls_mode)
            .field("tls_verify", &self.tls_verify)
            .finish()
    }
}
