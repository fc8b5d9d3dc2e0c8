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
use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[clap(about = "samAccountName Uniqueness Guard")]
pub enum SamGuardOpt {
    /// Evaluate a single add or modify request, given as a JSON document. The
    /// decision and its LDAP result code are printed, and the exit status is
    /// 0 when the write may proceed and 1 when it must be refused.
    Evaluate {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long, env = "SAMGUARD_CONFIG")]
        config: Option<String>,
        /// Read the request from this file instead of stdin.
        #[clap(short, long)]
        file: Option<String>,
    },
    /// Search the directory for a single identifier, exactly as the guard
    /// would for a modify carrying it.
    Check {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long, env = "SAMGUARD_CONFIG")]
        config: Option<String>,
        name: String,
    },
    /// Check that the directory is reachable with the configured credentials.
    Status {
        #[clap(short, long)]
        debug: bool,
        #[clap(short, long, env = "SAMGUARD_CONFIG")]
        config: Option<String>,
    },
    /// Show the version of this tool.
    Version {
        #[clap(short, long)]
        debug: bool,
    },
}

#[derive(Debug, clap::Parser)]
#[clap(about = "samAccountName Uniqueness Guard")]
pub struct SamGuardParser {
    #[clap(subcommand)]
    pub commands: SamGuardOpt,
}
