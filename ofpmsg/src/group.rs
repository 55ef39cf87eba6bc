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

//! Decoded group messages and the statistics replies they produce.

use crate::bucket::BucketList;

use thiserror::Error;

pub type GroupId = u32;
pub type Xid = u32;

/// Highest identifier a real group may have.  Identifiers above it are reserved.
pub const GROUP_MAX: GroupId = 0xffff_ff00;

/// Reserved identifier meaning every currently installed group, valid in delete and statistics
/// requests only.
pub const GROUP_ALL: GroupId = 0xffff_fffc;

/// Reserved wildcard used in flow match fields, never valid in a group command.
pub const GROUP_ANY: GroupId = 0xffff_ffff;

/// Group semantics tag.  The group table compares these for equality and passes them through; the
/// forwarding plane gives them meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupType {
    All,
    Select,
    Indirect,
    FastFailover,
}

impl GroupType {
    pub fn to_openflow(&self) -> u8 {
        match self {
            GroupType::All => 0,
            GroupType::Select => 1,
            GroupType::Indirect => 2,
            GroupType::FastFailover => 3,
        }
    }

    pub fn from_openflow(value: u8) -> Option<GroupType> {
        match value {
            0 => Some(GroupType::All),
            1 => Some(GroupType::Select),
            2 => Some(GroupType::Indirect),
            3 => Some(GroupType::FastFailover),
            _ => None,
        }
    }
}

/// Decoded group add command.
#[derive(Clone, Debug)]
pub struct GroupAdd {
    pub xid: Xid,
    pub group_id: GroupId,
    pub group_type: GroupType,
    pub buckets: BucketList,
}

/// Decoded group modify command.
#[derive(Clone, Debug)]
pub struct GroupModify {
    pub xid: Xid,
    pub group_id: GroupId,
    pub group_type: GroupType,
    pub buckets: BucketList,
}

/// Decoded group delete command.  The wire message also carries a type and buckets, but a delete
/// ignores them.
#[derive(Clone, Debug)]
pub struct GroupDelete {
    pub xid: Xid,
    pub group_id: GroupId,
}

/// Decoded group statistics request.
#[derive(Clone, Debug)]
pub struct GroupStatsRequest {
    pub xid: Xid,
    pub group_id: GroupId,
}

/// Decoded group description statistics request.  This request type has no group-id filter.
#[derive(Clone, Debug)]
pub struct GroupDescStatsRequest {
    pub xid: Xid,
}

/// Decoded group features statistics request.
#[derive(Clone, Debug)]
pub struct GroupFeaturesStatsRequest {
    pub xid: Xid,
}

/// Live counters for one bucket of a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketCounter {
    pub packet_count: u64,
    pub byte_count: u64,
}

const GROUP_STATS_ENTRY_LEN: usize = 40;
const BUCKET_COUNTER_LEN: usize = 16;
const GROUP_DESC_ENTRY_LEN: usize = 8;

/// One record in a group statistics reply, the decoded form of `ofp_group_stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupStatsEntry {
    pub group_id: GroupId,
    pub ref_count: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub bucket_stats: Vec<BucketCounter>,
}

/// One record in a group description statistics reply, the decoded form of `ofp_group_desc`.
/// `buckets` is the serialized wire image of the group's bucket list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDescStatsEntry {
    pub group_type: GroupType,
    pub group_id: GroupId,
    pub buckets: Vec<u8>,
}

/// A record type that knows the size of its wire image, so a reply can bound itself.
pub trait WireEntry {
    fn wire_len(&self) -> usize;
}

impl WireEntry for GroupStatsEntry {
    fn wire_len(&self) -> usize {
        GROUP_STATS_ENTRY_LEN + BUCKET_COUNTER_LEN * self.bucket_stats.len()
    }
}

impl WireEntry for GroupDescStatsEntry {
    fn wire_len(&self) -> usize {
        GROUP_DESC_ENTRY_LEN + self.buckets.len()
    }
}

/// Space for multipart-reply body in one maximum-size OpenFlow message, after the 16-byte
/// multipart reply header.  Replies are not segmented across messages; records past this bound
/// are dropped.
pub const MAX_REPLY_BODY: usize = 65535 - 16;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("statistics reply is full")]
pub struct ReplyFull;

/// Bounded record list for a statistics reply.  `push` refuses a record that would carry the
/// body past [`MAX_REPLY_BODY`] and leaves the list unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryList<T: WireEntry> {
    entries: Vec<T>,
    body_len: usize,
}

impl<T: WireEntry> EntryList<T> {
    pub fn new() -> EntryList<T> {
        EntryList { entries: Vec::new(), body_len: 0 }
    }

    pub fn push(&mut self, entry: T) -> Result<(), ReplyFull> {
        let len = entry.wire_len();
        if self.body_len + len > MAX_REPLY_BODY {
            return Err(ReplyFull);
        }
        self.body_len += len;
        self.entries.push(entry);
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total wire size of the records pushed so far.
    pub fn body_len(&self) -> usize {
        self.body_len
    }
}

impl<T: WireEntry> Default for EntryList<T> {
    fn default() -> EntryList<T> {
        EntryList::new()
    }
}

/// Group statistics reply, echoing the request's xid.
#[derive(Clone, Debug)]
pub struct GroupStatsReply {
    pub xid: Xid,
    pub entries: EntryList<GroupStatsEntry>,
}

impl GroupStatsReply {
    pub fn new(xid: Xid) -> GroupStatsReply {
        GroupStatsReply { xid, entries: EntryList::new() }
    }
}

/// Group description statistics reply, echoing the request's xid.
#[derive(Clone, Debug)]
pub struct GroupDescStatsReply {
    pub xid: Xid,
    pub entries: EntryList<GroupDescStatsEntry>,
}

impl GroupDescStatsReply {
    pub fn new(xid: Xid) -> GroupDescStatsReply {
        GroupDescStatsReply { xid, entries: EntryList::new() }
    }
}

/// A statistics reply ready for the session layer to encode and send.
#[derive(Clone, Debug)]
pub enum Reply {
    GroupStats(GroupStatsReply),
    GroupDescStats(GroupDescStatsReply),
}
