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
#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

use std::io::Read;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use samguard::classifier::classify;
use samguard::request::RequestDocument;
use samguard::{
    CommandProvisioner, DirectoryProber, Guard, GuardPolicy, LdapProber, WriteRequest,
};
use samguard_common::config::SamGuardConfig;
use samguard_common::constants::DEFAULT_CONFIG_PATH;
use serde_json::{json, to_string_pretty};

include!("./opt/tool.rs");

fn read_request(file: Option<&str>) -> anyhow::Result<WriteRequest> {
    let data = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request from {}", path))?,
        None => {
            let mut data = String::new();
            std::io::stdin()
                .read_to_string(&mut data)
                .context("Failed to read request from stdin")?;
            data
        }
    };
    let doc = RequestDocument::from_json(&data).map_err(|e| anyhow!(e))?;
    doc.into_request().map_err(|e| anyhow!(e))
}

fn build_prober(cfg: &SamGuardConfig) -> anyhow::Result<LdapProber> {
    let endpoint = cfg.get_directory_endpoint().with_context(|| {
        format!(
            "Failed to read the bind credential from {}",
            cfg.get_ldap_bind_secret_file()
        )
    })?;
    Ok(LdapProber::new(
        endpoint,
        &cfg.get_search_attribute(),
        cfg.get_connection_timeout(),
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opt = SamGuardParser::parse();

    let (debug, config) = match &opt.commands {
        SamGuardOpt::Evaluate {
            debug,
            config,
            file: _,
        } => (*debug, config.clone()),
        SamGuardOpt::Check {
            debug,
            config,
            name: _,
        } => (*debug, config.clone()),
        SamGuardOpt::Status { debug, config } => (*debug, config.clone()),
        SamGuardOpt::Version { debug } => (*debug, None),
    };
    let config_path = config.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Parsed before logging is set up so that `debug = true` applies too.
    let cfg = SamGuardConfig::new(Some(&config_path));
    let cfg_debug = cfg.as_ref().map(|c| c.get_debug()).unwrap_or(false);
    if debug || cfg_debug {
        std::env::set_var("RUST_LOG", "debug");
    }
    tracing_subscriber::fmt::init();

    macro_rules! load_config {
        () => {{
            match cfg {
                Ok(c) => c,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }};
    }

    match opt.commands {
        SamGuardOpt::Evaluate { file, .. } => {
            let cfg = load_config!();
            let req = match read_request(file.as_deref()) {
                Ok(req) => req,
                Err(e) => {
                    error!("{:#}", e);
                    return ExitCode::FAILURE;
                }
            };
            let prober = match build_prober(&cfg) {
                Ok(prober) => prober,
                Err(e) => {
                    error!("{:#}", e);
                    return ExitCode::FAILURE;
                }
            };
            let guard = Guard::new(
                prober,
                CommandProvisioner::from_config(&cfg),
                GuardPolicy::from_config(&cfg),
            );

            let decision = guard.intercept(&req).await;
            let out = json!({
                "result": decision,
                "ldap_result_code": decision.ldap_result_code(),
            });
            match to_string_pretty(&out) {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    error!("Failed to serialize the decision: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if decision.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        SamGuardOpt::Check { name, .. } => {
            let cfg = load_config!();
            let prober = match build_prober(&cfg) {
                Ok(prober) => prober,
                Err(e) => {
                    error!("{:#}", e);
                    return ExitCode::FAILURE;
                }
            };
            let result = prober.probe(name.as_bytes()).await;
            let decision = classify(&result);
            println!("{}: {}", cfg.get_search_attribute(), name);
            println!("result: {}", result);
            println!("decision: {}", decision);
            if decision.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        SamGuardOpt::Status { .. } => {
            trace!("Starting directory status check ...");
            let cfg = load_config!();
            let prober = match build_prober(&cfg) {
                Ok(prober) => prober,
                Err(e) => {
                    error!("{:#}", e);
                    return ExitCode::FAILURE;
                }
            };
            match prober.test_connection().await {
                Ok(()) => {
                    println!("online ({})", prober.endpoint().url());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{}", e);
                    println!("offline ({})", prober.endpoint().url());
                    ExitCode::FAILURE
                }
            }
        }
        SamGuardOpt::Version { .. } => {
            println!("samguard {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}
