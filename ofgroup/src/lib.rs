/*
Copyright (c) 2022 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
 */

//! `ofgroup` is the group-table state manager of an OpenFlow switch agent.  It keeps the
//! authoritative set of packet-processing groups the switch exposes to its controller, applies
//! group add, modify, and delete commands against that set, and answers group statistics and
//! description requests.
//!
//! The message dispatcher hands each decoded request to the matching `handle_*` method on
//! [`GroupManager`], together with the id of the connection it arrived on.  A mutating command
//! succeeds silently or sends one error reply; a statistics request always sends one reply.
//! Wire encoding, connection management, and the packet-processing engine live behind the
//! [`cxn`] and [`fwd`] boundaries, so a manager is fully exercisable with in-process fakes.

pub mod cxn;
pub mod fwd;
mod table;
pub mod time;

pub use table::{GroupEntry, GroupTable};

use crate::cxn::{unhandled_message, CxnId, CxnManager};
use crate::fwd::Forwarding;
use crate::time::{duration_parts, MonotonicClock, TimeSource};

use itertools::Itertools;

use ofpmsg::{
    BucketList,
    GroupAdd,
    GroupDelete,
    GroupDescStatsEntry,
    GroupDescStatsReply,
    GroupDescStatsRequest,
    GroupFeaturesStatsRequest,
    GroupId,
    GroupModFailedCode,
    GroupModify,
    GroupStatsEntry,
    GroupStatsReply,
    GroupStatsRequest,
    GroupType,
    OfpError,
    Reply,
    Xid,
    GROUP_ALL,
    GROUP_MAX,
};

use std::time::Duration;

use thiserror::Error;

use tracing::{debug, warn};

/// The failures a group command can report.  The protocol's code space also holds a
/// permission-denied code, but no validation path produces it.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
enum GroupModError {
    #[error("group {0:#x} already exists")]
    Exists(GroupId),
    #[error("invalid group {0:#x}")]
    Invalid(GroupId),
    #[error("unknown group {0:#x}")]
    Unknown(GroupId),
}

impl GroupModError {
    fn code(&self) -> GroupModFailedCode {
        match self {
            GroupModError::Exists(_) => GroupModFailedCode::GroupExists,
            GroupModError::Invalid(_) => GroupModFailedCode::InvalidGroup,
            GroupModError::Unknown(_) => GroupModFailedCode::UnknownGroup,
        }
    }
}

/// The group table and its command handlers.
///
/// Commands run one at a time to completion; each handler takes `&mut self`, so two commands
/// can never interleave their view of the table.
pub struct GroupManager<F, C> {
    groups: GroupTable,
    forwarding: F,
    cxn: C,
    time: Box<dyn TimeSource>,
}

impl<F: Forwarding, C: CxnManager> GroupManager<F, C> {
    pub fn new(forwarding: F, cxn: C) -> GroupManager<F, C> {
        Self::with_time_source(forwarding, cxn, Box::new(MonotonicClock::new()))
    }

    /// Like [`GroupManager::new`] with a caller-supplied clock, so tests can control durations.
    pub fn with_time_source(
        forwarding: F,
        cxn: C,
        time: Box<dyn TimeSource>,
    ) -> GroupManager<F, C> {
        GroupManager { groups: GroupTable::new(), forwarding, cxn, time }
    }

    pub fn groups(&self) -> &GroupTable {
        &self.groups
    }

    pub fn forwarding(&self) -> &F {
        &self.forwarding
    }

    pub fn cxn(&self) -> &C {
        &self.cxn
    }

    /// Handles a group add command.  Success is silent; failure sends a group-mod-failed error
    /// reply.
    pub fn handle_group_add(&mut self, request: GroupAdd, cxn_id: CxnId) {
        let GroupAdd { xid, group_id, group_type, buckets } = request;
        if let Err(error) = self.add_group(group_id, group_type, buckets) {
            debug!("group add {group_id:#x} failed ({error})");
            self.send_group_mod_error(cxn_id, xid, error);
        }
    }

    fn add_group(
        &mut self,
        id: GroupId,
        kind: GroupType,
        buckets: BucketList,
    ) -> Result<(), GroupModError> {
        if self.groups.lookup(id).is_some() {
            return Err(GroupModError::Exists(id));
        } else if id > GROUP_MAX {
            return Err(GroupModError::Invalid(id));
        }

        self.forwarding
            .group_add(id, kind, &buckets)
            .map_err(|_| GroupModError::Invalid(id))?;

        let creation_time = self.time.current_time();
        self.groups.insert(GroupEntry { id, kind, buckets, creation_time });
        Ok(())
    }

    /// Handles a group modify command.  Success is silent; failure sends a group-mod-failed
    /// error reply.
    pub fn handle_group_modify(&mut self, request: GroupModify, cxn_id: CxnId) {
        let GroupModify { xid, group_id, group_type, buckets } = request;
        if let Err(error) = self.modify_group(group_id, group_type, buckets) {
            debug!("group modify {group_id:#x} failed ({error})");
            self.send_group_mod_error(cxn_id, xid, error);
        }
    }

    fn modify_group(
        &mut self,
        id: GroupId,
        kind: GroupType,
        buckets: BucketList,
    ) -> Result<(), GroupModError> {
        let entry = match self.groups.lookup_mut(id) {
            Some(entry) => entry,
            None => return Err(GroupModError::Unknown(id)),
        };

        // The forwarding plane can swap buckets in place, but not the group type, so a type
        // change is a delete followed by a recreate.
        let result = if entry.kind == kind {
            self.forwarding.group_modify(id, &buckets)
        } else {
            self.forwarding.group_delete(id);
            self.forwarding.group_add(id, kind, &buckets)
        };

        if let Err(error) = result {
            if entry.kind != kind {
                warn!(
                    "group {id:#x} was deleted from the forwarding plane but recreating it as \
                     {kind:?} failed ({error}); the table still holds the old group"
                );
            }
            return Err(GroupModError::Invalid(id));
        }

        entry.kind = kind;
        entry.buckets = buckets;
        Ok(())
    }

    /// Handles a group delete command.  Deleting `GROUP_ALL` empties the table; deleting an id
    /// that is not installed is a success.
    pub fn handle_group_delete(&mut self, request: GroupDelete, cxn_id: CxnId) {
        let GroupDelete { xid, group_id } = request;
        if let Err(error) = self.delete_group(group_id) {
            debug!("group delete {group_id:#x} failed ({error})");
            self.send_group_mod_error(cxn_id, xid, error);
        }
    }

    fn delete_group(&mut self, id: GroupId) -> Result<(), GroupModError> {
        if id == GROUP_ALL {
            debug!("deleting all {} groups", self.groups.len());
            for entry in self.groups.drain() {
                self.forwarding.group_delete(entry.id);
            }
        } else if let Some(entry) = self.groups.remove(id) {
            self.forwarding.group_delete(entry.id);
        } else if id > GROUP_MAX {
            return Err(GroupModError::Invalid(id));
        }
        Ok(())
    }

    /// Handles a group statistics request.  `GROUP_ALL` reports every group, an ordinary id
    /// reports that group if it is installed, and any other id reports nothing; all three send
    /// a reply.
    pub fn handle_group_stats_request(&mut self, request: GroupStatsRequest, cxn_id: CxnId) {
        let GroupStatsRequest { xid, group_id } = request;
        let now = self.time.current_time();
        let mut reply = GroupStatsReply::new(xid);

        if group_id == GROUP_ALL {
            for entry in self.groups.iter().sorted_by_key(|entry| entry.id) {
                let record = group_stats_record(&mut self.forwarding, entry, now);
                if reply.entries.push(record).is_err() {
                    debug!("group stats reply full after {} records, truncating", reply.entries.len());
                    break;
                }
            }
        } else if group_id <= GROUP_MAX {
            if let Some(entry) = self.groups.lookup(group_id) {
                let record = group_stats_record(&mut self.forwarding, entry, now);
                reply
                    .entries
                    .push(record)
                    .expect("a single group stats record fits in an empty reply");
            }
        }

        self.cxn.send_reply(cxn_id, Reply::GroupStats(reply));
    }

    /// Handles a group description statistics request, reporting the type, id, and serialized
    /// buckets of every group.  This request type has no id filter.
    pub fn handle_group_desc_stats_request(
        &mut self,
        request: GroupDescStatsRequest,
        cxn_id: CxnId,
    ) {
        let GroupDescStatsRequest { xid } = request;
        let mut reply = GroupDescStatsReply::new(xid);

        for entry in self.groups.iter().sorted_by_key(|entry| entry.id) {
            let buckets = entry
                .buckets
                .encode()
                .expect("stored bucket list failed to serialize");
            let record = GroupDescStatsEntry { group_type: entry.kind, group_id: entry.id, buckets };
            if reply.entries.push(record).is_err() {
                debug!("group desc stats reply full after {} records, truncating", reply.entries.len());
                break;
            }
        }

        self.cxn.send_reply(cxn_id, Reply::GroupDescStats(reply));
    }

    /// Group features are not implemented.
    pub fn handle_group_features_stats_request(
        &mut self,
        request: GroupFeaturesStatsRequest,
        cxn_id: CxnId,
    ) {
        unhandled_message(&mut self.cxn, cxn_id, request.xid, "group features stats request");
    }

    fn send_group_mod_error(&mut self, cxn_id: CxnId, xid: Xid, error: GroupModError) {
        self.cxn.send_error_reply(cxn_id, xid, OfpError::GroupModFailed(error.code()));
    }
}

/// Builds the statistics record for one group: the id and elapsed durations come from the table,
/// the live counters from the forwarding plane.
fn group_stats_record<F: Forwarding>(
    forwarding: &mut F,
    entry: &GroupEntry,
    now: Duration,
) -> GroupStatsEntry {
    let (duration_sec, duration_nsec) = duration_parts(now.saturating_sub(entry.creation_time));
    let mut record = GroupStatsEntry {
        group_id: entry.id,
        duration_sec,
        duration_nsec,
        ..Default::default()
    };
    forwarding.group_stats(entry.id, &mut record);
    record
}
