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
use configparser::ini::Ini;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::constants::{
    BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID, DEFAULT_CONFIG_PATH, DEFAULT_CONN_TIMEOUT,
    DEFAULT_CREDENTIAL_ATTR, DEFAULT_DEBUG, DEFAULT_IDENTIFIER_ATTR, DEFAULT_LDAPS_PORT,
    DEFAULT_LDAP_HOST, DEFAULT_LDAP_PORT, DEFAULT_MACHINE_SECRET_PATH, DEFAULT_PROVISION_ACTION,
    DEFAULT_PROVISION_TIMEOUT, DEFAULT_PROVISION_TOOL, DEFAULT_SEARCH_ATTR, DEFAULT_TLS_MODE,
    DEFAULT_TLS_VERIFY,
};
use crate::endpoint::{DirectoryEndpoint, TlsMode};
use crate::secret::read_secret;

#[derive(Clone)]
pub struct SamGuardConfig {
    config: Ini,
    filename: String,
}

fn match_bool(key: &str, val: Option<String>, default: bool) -> bool {
    match val {
        Some(val) => match val.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            "1" => true,
            "0" => false,
            _ => {
                error!("Unrecognized response for {} '{}'", key, val);
                default
            }
        },
        None => default,
    }
}

impl SamGuardConfig {
    pub fn new(config_path: Option<&str>) -> Result<SamGuardConfig, String> {
        let mut sconfig = Ini::new();
        let mut filename: String = DEFAULT_CONFIG_PATH.to_string();
        if let Some(config_path) = config_path {
            filename = config_path.to_string();
        }
        let cfg_path: PathBuf = PathBuf::from(filename.clone());
        if cfg_path.exists() {
            match sconfig.load(filename.clone()) {
                Ok(l) => l,
                Err(e) => {
                    return Err(format!(
                        "failed to read config from {} - cannot start up: {} Quitting.",
                        filename.clone(),
                        e
                    ))
                }
            };
        }
        Ok(SamGuardConfig {
            config: sconfig,
            filename,
        })
    }

    pub fn get(&self, section: &str, option: &str) -> Option<String> {
        self.config.get(section, option)
    }

    pub fn get_config_file(&self) -> String {
        self.filename.clone()
    }

    fn get_u64(&self, option: &str, default: u64) -> u64 {
        match self.config.get("global", option) {
            Some(val) => match val.parse::<u64>() {
                Ok(n) if n != 0 => n,
                _ => {
                    error!("Failed parsing {} from config: {}", option, val);
                    default
                }
            },
            None => default,
        }
    }

    pub fn get_ldap_host(&self) -> String {
        match self.config.get("global", "ldap_host") {
            Some(val) => val,
            None => DEFAULT_LDAP_HOST.to_string(),
        }
    }

    pub fn get_ldap_port(&self) -> u16 {
        let default = match self.get_tls_mode() {
            TlsMode::Ldaps => DEFAULT_LDAPS_PORT,
            TlsMode::None | TlsMode::StartTls => DEFAULT_LDAP_PORT,
        };
        match self.config.get("global", "ldap_port") {
            Some(val) => match val.parse::<u16>() {
                Ok(n) if n != 0 => n,
                _ => {
                    error!("Failed parsing ldap_port from config: {}", val);
                    default
                }
            },
            None => default,
        }
    }

    pub fn get_ldap_base(&self) -> String {
        self.config.get("global", "ldap_base").unwrap_or_default()
    }

    pub fn get_ldap_bind_dn(&self) -> String {
        self.config.get("global", "ldap_bind_dn").unwrap_or_default()
    }

    pub fn get_ldap_bind_secret_file(&self) -> String {
        match self.config.get("global", "ldap_bind_secret_file") {
            Some(val) => val,
            None => DEFAULT_MACHINE_SECRET_PATH.to_string(),
        }
    }

    pub fn get_tls_mode(&self) -> TlsMode {
        match self.config.get("global", "tls_mode") {
            Some(val) => match TlsMode::parse(&val) {
                Some(mode) => mode,
                None => {
                    error!("Invalid tls_mode '{}' in config, using default", val);
                    DEFAULT_TLS_MODE
                }
            },
            None => DEFAULT_TLS_MODE,
        }
    }

    pub fn get_tls_verify(&self) -> bool {
        match_bool(
            "tls_verify",
            self.config.get("global", "tls_verify"),
            DEFAULT_TLS_VERIFY,
        )
    }

    pub fn get_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("connection_timeout", DEFAULT_CONN_TIMEOUT))
    }

    pub fn get_identifier_attribute(&self) -> String {
        match self.config.get("global", "identifier_attribute") {
            Some(val) => val,
            None => DEFAULT_IDENTIFIER_ATTR.to_string(),
        }
    }

    pub fn get_search_attribute(&self) -> String {
        match self.config.get("global", "search_attribute") {
            Some(val) => val,
            None => DEFAULT_SEARCH_ATTR.to_string(),
        }
    }

    pub fn get_credential_attribute(&self) -> String {
        match self.config.get("global", "credential_attribute") {
            Some(val) => val,
            None => DEFAULT_CREDENTIAL_ATTR.to_string(),
        }
    }

    pub fn get_bypass_control_oid(&self) -> String {
        match self.config.get("global", "bypass_control_oid") {
            Some(val) => val,
            None => BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID.to_string(),
        }
    }

    pub fn get_provision_tool(&self) -> String {
        match self.config.get("global", "provision_tool") {
            Some(val) => val,
            None => DEFAULT_PROVISION_TOOL.to_string(),
        }
    }

    pub fn get_provision_action(&self) -> String {
        match self.config.get("global", "provision_action") {
            Some(val) => val,
            None => DEFAULT_PROVISION_ACTION.to_string(),
        }
    }

    /// The server the provisioning tool talks to, usually the master the
    /// uniqueness probe is also run against.
    pub fn get_provision_host(&self) -> String {
        match self.config.get("global", "provision_host") {
            Some(val) => val,
            None => self.get_ldap_host(),
        }
    }

    pub fn get_operator_identity(&self) -> String {
        match self.config.get("global", "operator_identity") {
            Some(val) => val,
            None => match hostname::get() {
                Ok(name) if !name.is_empty() => name.to_string_lossy().to_string(),
                Ok(_) => {
                    error!("The local hostname is empty, set operator_identity in the config");
                    String::new()
                }
                Err(e) => {
                    error!(
                        "Failed to read the local hostname ({}), set operator_identity in the config",
                        e
                    );
                    String::new()
                }
            },
        }
    }

    pub fn get_operator_secret_file(&self) -> String {
        match self.config.get("global", "operator_secret_file") {
            Some(val) => val,
            None => DEFAULT_MACHINE_SECRET_PATH.to_string(),
        }
    }

    pub fn get_provision_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("provision_timeout", DEFAULT_PROVISION_TIMEOUT))
    }

    pub fn get_debug(&self) -> bool {
        match_bool("debug", self.config.get("global", "debug"), DEFAULT_DEBUG)
    }

    /// Assemble the directory endpoint. The bind password is only read when
    /// a bind DN is configured; an anonymous bind needs no secret.
    pub fn get_directory_endpoint(&self) -> std::io::Result<DirectoryEndpoint> {
        let bind_dn = self.get_ldap_bind_dn();
        let bind_password = if bind_dn.is_empty() {
            Zeroizing::new(String::new())
        } else {
            read_secret(self.get_ldap_bind_secret_file())?
        };
        Ok(DirectoryEndpoint {
            host: self.get_ldap_host(),
            port: self.get_ldap_port(),
            base: self.get_ldap_base(),
            bind_dn,
            bind_password,
            tls_mode: self.get_tls_mode(),
            tls_verify: self.get_tls_verify(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_temp_config(contents: &str) -> String {
        let file_path = format!("/tmp/samguard_test_config_{}.ini", uuid::Uuid::new_v4());
        fs::write(&file_path, contents).expect("Failed to write temporary config file");
        file_path
    }

    #[test]
    fn test_get_ldap_host() {
        let config_data = r#"
        [global]
        ldap_host = master.example.com
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();

        assert_eq!(config.get_ldap_host(), "master.example.com");
        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_ldap_host(), DEFAULT_LDAP_HOST);
    }

    #[test]
    fn test_get_ldap_port() {
        let config_data = r#"
        [global]
        ldap_port = 7389
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert_eq!(config.get_ldap_port(), 7389);

        let config_invalid = r#"
        [global]
        ldap_port = seventy
        "#;
        let temp_file_invalid = create_temp_config(config_invalid);
        let config_invalid = SamGuardConfig::new(Some(&temp_file_invalid)).unwrap();
        assert_eq!(config_invalid.get_ldap_port(), DEFAULT_LDAP_PORT);

        // The default port follows the TLS mode
        let config_ldaps = r#"
        [global]
        tls_mode = ldaps
        "#;
        let temp_file_ldaps = create_temp_config(config_ldaps);
        let config_ldaps = SamGuardConfig::new(Some(&temp_file_ldaps)).unwrap();
        assert_eq!(config_ldaps.get_ldap_port(), DEFAULT_LDAPS_PORT);

        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_ldap_port(), DEFAULT_LDAP_PORT);
    }

    #[test]
    fn test_get_tls_mode() {
        let config_data = r#"
        [global]
        tls_mode = none
        tls_verify = false
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert_eq!(config.get_tls_mode(), TlsMode::None);
        assert_eq!(config.get_tls_verify(), false);

        let config_invalid = r#"
        [global]
        tls_mode = carrier-pigeon
        tls_verify = perhaps
        "#;
        let temp_file_invalid = create_temp_config(config_invalid);
        let config_invalid = SamGuardConfig::new(Some(&temp_file_invalid)).unwrap();
        assert_eq!(config_invalid.get_tls_mode(), DEFAULT_TLS_MODE);
        assert_eq!(config_invalid.get_tls_verify(), DEFAULT_TLS_VERIFY);

        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_tls_mode(), DEFAULT_TLS_MODE);
        assert_eq!(config_empty.get_tls_verify(), DEFAULT_TLS_VERIFY);
    }

    #[test]
    fn test_get_timeouts() {
        let config_data = r#"
        [global]
        connection_timeout = 3
        provision_timeout = 45
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert_eq!(config.get_connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.get_provision_timeout(), Duration::from_secs(45));

        let config_invalid = r#"
        [global]
        connection_timeout = -1
        "#;
        let temp_file_invalid = create_temp_config(config_invalid);
        let config_invalid = SamGuardConfig::new(Some(&temp_file_invalid)).unwrap();
        assert_eq!(
            config_invalid.get_connection_timeout(),
            Duration::from_secs(DEFAULT_CONN_TIMEOUT)
        );

        // A zero timeout would fail every probe and every provisioning call
        let config_zero = r#"
        [global]
        connection_timeout = 0
        provision_timeout = 0
        "#;
        let temp_file_zero = create_temp_config(config_zero);
        let config_zero = SamGuardConfig::new(Some(&temp_file_zero)).unwrap();
        assert_eq!(
            config_zero.get_connection_timeout(),
            Duration::from_secs(DEFAULT_CONN_TIMEOUT)
        );
        assert_eq!(
            config_zero.get_provision_timeout(),
            Duration::from_secs(DEFAULT_PROVISION_TIMEOUT)
        );

        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(
            config_empty.get_provision_timeout(),
            Duration::from_secs(DEFAULT_PROVISION_TIMEOUT)
        );
    }

    #[test]
    fn test_get_operator_identity_default() {
        let config_empty = SamGuardConfig::new(None).unwrap();
        match hostname::get() {
            Ok(name) if !name.is_empty() => {
                assert_eq!(
                    config_empty.get_operator_identity(),
                    name.to_string_lossy().to_string()
                );
            }
            _ => assert_eq!(config_empty.get_operator_identity(), ""),
        }
    }

    #[test]
    fn test_get_attributes() {
        let config_data = r#"
        [global]
        identifier_attribute = uid
        search_attribute = sAMAccountName
        credential_attribute = userPassword
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert_eq!(config.get_identifier_attribute(), "uid");
        assert_eq!(config.get_search_attribute(), "sAMAccountName");
        assert_eq!(config.get_credential_attribute(), "userPassword");

        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_identifier_attribute(), DEFAULT_IDENTIFIER_ATTR);
        assert_eq!(config_empty.get_search_attribute(), DEFAULT_SEARCH_ATTR);
        assert_eq!(config_empty.get_credential_attribute(), DEFAULT_CREDENTIAL_ATTR);
        assert_eq!(
            config_empty.get_bypass_control_oid(),
            BYPASS_SAMACCOUNTNAME_LDAP_CHECK_OID
        );
    }

    #[test]
    fn test_get_provisioning() {
        let config_data = r#"
        [global]
        ldap_host = master.example.com
        provision_tool = /opt/bin/provision
        provision_action = computers/create
        operator_identity = dc1
        operator_secret_file = /etc/dc1.secret
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert_eq!(config.get_provision_tool(), "/opt/bin/provision");
        assert_eq!(config.get_provision_action(), "computers/create");
        assert_eq!(config.get_operator_identity(), "dc1");
        assert_eq!(config.get_operator_secret_file(), "/etc/dc1.secret");
        // The provisioning host falls back to the directory host
        assert_eq!(config.get_provision_host(), "master.example.com");

        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_provision_tool(), DEFAULT_PROVISION_TOOL);
        assert_eq!(config_empty.get_provision_action(), DEFAULT_PROVISION_ACTION);
        assert_eq!(
            config_empty.get_operator_secret_file(),
            DEFAULT_MACHINE_SECRET_PATH
        );
    }

    #[test]
    fn test_get_debug() {
        let config_data = r#"
        [global]
        debug = 1
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();

        assert_eq!(config.get_debug(), true);
        let config_empty = SamGuardConfig::new(None).unwrap();
        assert_eq!(config_empty.get_debug(), false);
    }

    #[test]
    fn test_get_directory_endpoint() {
        let secret = create_temp_config("machinepass\n");
        let config_data = format!(
            r#"
        [global]
        ldap_host = master.example.com
        ldap_base = dc=example,dc=com
        ldap_bind_dn = cn=dc1,cn=dc,cn=computers,dc=example,dc=com
        ldap_bind_secret_file = {}
        "#,
            secret
        );

        let temp_file = create_temp_config(&config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        let endpoint = config.get_directory_endpoint().unwrap();
        assert_eq!(endpoint.host, "master.example.com");
        assert_eq!(endpoint.port, DEFAULT_LDAP_PORT);
        assert_eq!(endpoint.base, "dc=example,dc=com");
        assert_eq!(endpoint.bind_password.as_str(), "machinepass");
        assert!(!endpoint.is_anonymous());
    }

    #[test]
    fn test_get_directory_endpoint_anonymous() {
        // No bind DN means no secret is read, even if the file is missing
        let config_data = r#"
        [global]
        ldap_bind_secret_file = /nonexistent/samguard/machine.secret
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        let endpoint = config.get_directory_endpoint().unwrap();
        assert!(endpoint.is_anonymous());
        assert!(endpoint.bind_password.is_empty());
    }

    #[test]
    fn test_get_directory_endpoint_missing_secret() {
        let config_data = r#"
        [global]
        ldap_bind_dn = cn=admin,dc=example,dc=com
        ldap_bind_secret_file = /nonexistent/samguard/machine.secret
        "#;

        let temp_file = create_temp_config(config_data);
        let config = SamGuardConfig::new(Some(&temp_file)).unwrap();
        assert!(config.get_directory_endpoint().is_err());
    }
}
