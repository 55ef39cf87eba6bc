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

//! The group table: every group the switch currently exposes, indexed by id.

use ofpmsg::{BucketList, GroupId, GroupType};

use std::collections::HashMap;
use std::time::Duration;

/// One installed group.
#[derive(Debug)]
pub struct GroupEntry {
    pub id: GroupId,

    pub kind: GroupType,

    /// The entry's own copy of the bucket list.  Nothing else holds a reference to it; a modify
    /// replaces it wholesale and a delete drops it with the entry.
    pub buckets: BucketList,

    /// Reading of the table's time source when the group was first added.  A modify does not
    /// touch it.
    pub creation_time: Duration,
}

const INITIAL_CAPACITY: usize = 1024;

/// The set of installed groups.
///
/// The table is the only long-lived owner of group entries, and every id it holds is an ordinary
/// id (`id <= GROUP_MAX`); the handlers reject reserved ids before inserting.
#[derive(Debug)]
pub struct GroupTable {
    groups: HashMap<GroupId, GroupEntry>,
}

impl GroupTable {
    pub fn new() -> GroupTable {
        GroupTable { groups: HashMap::with_capacity(INITIAL_CAPACITY) }
    }

    pub fn lookup(&self, id: GroupId) -> Option<&GroupEntry> {
        self.groups.get(&id)
    }

    pub fn lookup_mut(&mut self, id: GroupId) -> Option<&mut GroupEntry> {
        self.groups.get_mut(&id)
    }

    /// Inserts `entry`.  The caller has already checked that its id is vacant.
    pub fn insert(&mut self, entry: GroupEntry) {
        let displaced = self.groups.insert(entry.id, entry);
        debug_assert!(displaced.is_none());
    }

    /// Removes the entry for `id`, handing the caller ownership.
    pub fn remove(&mut self, id: GroupId) -> Option<GroupEntry> {
        self.groups.remove(&id)
    }

    /// Visits every entry, in no particular order.  The table must not be mutated during the
    /// traversal; callers that remove while traversing use [`GroupTable::drain`].
    pub fn iter(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups.values()
    }

    /// Empties the table, yielding ownership of every entry.  This is the wildcard-delete
    /// traversal: each entry is removed as it is visited.
    pub fn drain(&mut self) -> impl Iterator<Item = GroupEntry> + '_ {
        self.groups.drain().map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupTable {
    fn default() -> GroupTable {
        GroupTable::new()
    }
}
