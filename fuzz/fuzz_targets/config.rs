//! Fuzz the samguard config reader.
//!
//! Arbitrary bytes are written as samguard.conf and every getter is called.
//! No getter may panic, whatever the file holds.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::fs;
use tempfile::TempDir;

use samguard_common::config::SamGuardConfig;

fn exercise_config(cfg: &SamGuardConfig) {
    let _ = cfg.get_ldap_host();
    let _ = cfg.get_ldap_port();
    let _ = cfg.get_ldap_base();
    let _ = cfg.get_ldap_bind_dn();
    let _ = cfg.get_ldap_bind_secret_file();
    let _ = cfg.get_tls_mode();
    let _ = cfg.get_tls_verify();
    let _ = cfg.get_connection_timeout();
    let _ = cfg.get_identifier_attribute();
    let _ = cfg.get_search_attribute();
    let _ = cfg.get_credential_attribute();
    let _ = cfg.get_bypass_control_oid();
    let _ = cfg.get_provision_tool();
    let _ = cfg.get_provision_action();
    let _ = cfg.get_provision_host();
    let _ = cfg.get_operator_identity();
    let _ = cfg.get_operator_secret_file();
    let _ = cfg.get_provision_timeout();
    let _ = cfg.get_debug();
    let _ = cfg.get_config_file();
}

fuzz_target!(|data: &[u8]| {
    let tmp = match TempDir::new() {
        Ok(t) => t,
        Err(_) => return,
    };
    let cfg_path = tmp.path().join("samguard.conf");

    // Raw bytes, written lossily to reach the INI parser error paths
    let _ = fs::write(&cfg_path, String::from_utf8_lossy(data).as_bytes());
    if let Ok(cfg) = SamGuardConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
        exercise_config(&cfg);
    }

    // The same bytes as the value of every key in [global]
    let value = String::from_utf8_lossy(data).replace(['\n', '\r'], " ");
    let keys = [
        "ldap_host",
        "ldap_port",
        "tls_mode",
        "tls_verify",
        "connection_timeout",
        "provision_timeout",
        "debug",
    ];
    let body = keys
        .iter()
        .map(|k| format!("{} = {}", k, value))
        .collect::<Vec<_>>()
        .join("\n");
    let _ = fs::write(&cfg_path, format!("[global]\n{}\n", body));
    if let Ok(cfg) = SamGuardConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
        exercise_config(&cfg);
    }
});
