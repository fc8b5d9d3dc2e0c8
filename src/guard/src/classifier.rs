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
use crate::decision::{Decision, RejectKind};
use crate::prober::ProbeResult;
use crate::provision::ProvisioningOutcome;

pub fn classify(result: &ProbeResult) -> Decision {
    match result {
        ProbeResult::ConnectionFailed(_) | ProbeResult::SearchFailed(_) => {
            Decision::Reject(RejectKind::ServiceUnavailable)
        }
        ProbeResult::NoMatch | ProbeResult::Match(0) => Decision::Allow,
        ProbeResult::Match(_) => Decision::Reject(RejectKind::DuplicateIdentifier),
    }
}

/// The provisioning tool only reports success or failure. Any failure is
/// surfaced as a duplicate, since the exit status carries nothing more
/// specific.
pub fn classify_provisioning(outcome: &ProvisioningOutcome) -> Decision {
    match outcome {
        ProvisioningOutcome::Succeeded => Decision::Allow,
        ProvisioningOutcome::Failed(_) => Decision::Reject(RejectKind::DuplicateIdentifier),
        ProvisioningOutcome::SpawnFailed(_) | ProvisioningOutcome::TimedOut => {
            Decision::Reject(RejectKind::ServiceUnavailable)
        }
    }
}
