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

//! The forwarding-plane boundary.

use ofpmsg::{BucketList, GroupId, GroupStatsEntry, GroupType};

use thiserror::Error;

/// A rejection from the forwarding plane.  The handlers report it to the controller as
/// `InvalidGroup`; the message only reaches the log.
#[derive(Clone, Debug, Error)]
#[error("{0}")]
pub struct ForwardingError(pub String);

/// The packet-processing engine that realizes groups in hardware or software and keeps their
/// live counters.
///
/// Calls are synchronous, and implementations must not call back into the group table.
pub trait Forwarding {
    /// Materializes a group.  `buckets` is borrowed for the duration of the call; the table
    /// keeps its own copy.
    fn group_add(
        &mut self,
        id: GroupId,
        kind: GroupType,
        buckets: &BucketList,
    ) -> Result<(), ForwardingError>;

    /// Replaces the buckets of an existing group.
    fn group_modify(&mut self, id: GroupId, buckets: &BucketList) -> Result<(), ForwardingError>;

    /// Tears down a group.  Best effort; the table proceeds whether or not the forwarding plane
    /// still knew the group.
    fn group_delete(&mut self, id: GroupId);

    /// Fills the live counters of group `id` into `entry`.  The caller has already stamped the
    /// id and duration fields.
    fn group_stats(&mut self, id: GroupId, entry: &mut GroupStatsEntry);
}
