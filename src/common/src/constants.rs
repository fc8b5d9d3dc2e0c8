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
use crate::endpoint::TlsMode;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/samguard/samguard.conf";
pub const DEFAULT_LDAP_HOST: &str = "localhost";
pub const DEFAULT_LDAP_PORT: u16 = 389;
pub const DEFAULT_LDAPS_PORT: u16 = 636;
pub const DEFAULT_TLS_MODE: TlsMode = TlsMode::StartTls;
pub const DEFAULT_TLS_VERIFY: bool = true;
pub const DEFAULT_MACHINE_SECRET_PATH: &str = "/etc/machine.secret";
pub const DEFAULT_CONN_TIMEOUT: u64 = 10;
pub const DEFAULT_PROVISION_TIMEOUT: u64 = 120;
pub const DEFAULT_IDENTIFIER_ATTR: &str = "sAMAccountName";
pub const DEFAULT_SEARCH_ATTR: &str = "uid";
pub const DEFAULT_CREDENTIAL_ATTR: &str = "unicodePwd";
// bypass_samaccountname_ldap_check
pub const BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID: &str = "1.3.6.1.4.1.10176.1004.0.4.1";
pub const DEFAULT_PROVISION_TOOL: &str = "/usr/sbin/umc-command";
pub const DEFAULT_PROVISION_ACTION: &str = "selectiveudm/create_windows_computer";
pub const DEFAULT_DEBUG: bool = false;
