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

use anyhow::Result;

use ofgroup::cxn::{CxnId, CxnManager};
use ofgroup::fwd::{Forwarding, ForwardingError};
use ofgroup::time::TimeSource;
use ofgroup::GroupManager;

use ofpmsg::{
    BadRequestCode,
    Bucket,
    BucketList,
    GroupAdd,
    GroupDelete,
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
    WireEntry,
    Xid,
    GROUP_ALL,
    GROUP_ANY,
    GROUP_MAX,
    MAX_REPLY_BODY,
};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing_test::traced_test;

#[derive(Clone, Debug, PartialEq, Eq)]
enum FwdCall {
    Add(GroupId, GroupType),
    Modify(GroupId),
    Delete(GroupId),
    Stats(GroupId),
}

/// Forwarding plane that records its calls and fails on demand.  Counters it reports are a
/// function of the group id, so tests can predict them.
#[derive(Default)]
struct FakeForwarding {
    calls: Vec<FwdCall>,
    fail_add: Cell<bool>,
    fail_modify: Cell<bool>,
}

impl Forwarding for FakeForwarding {
    fn group_add(
        &mut self,
        id: GroupId,
        kind: GroupType,
        _buckets: &BucketList,
    ) -> Result<(), ForwardingError> {
        self.calls.push(FwdCall::Add(id, kind));
        if self.fail_add.get() {
            Err(ForwardingError("out of group resources".into()))
        } else {
            Ok(())
        }
    }

    fn group_modify(&mut self, id: GroupId, _buckets: &BucketList) -> Result<(), ForwardingError> {
        self.calls.push(FwdCall::Modify(id));
        if self.fail_modify.get() {
            Err(ForwardingError("bucket rejected".into()))
        } else {
            Ok(())
        }
    }

    fn group_delete(&mut self, id: GroupId) {
        self.calls.push(FwdCall::Delete(id));
    }

    fn group_stats(&mut self, id: GroupId, entry: &mut GroupStatsEntry) {
        self.calls.push(FwdCall::Stats(id));
        entry.ref_count = 1;
        entry.packet_count = id as u64 * 10;
        entry.byte_count = id as u64 * 100;
    }
}

/// Connection layer that records everything sent through it.
#[derive(Default)]
struct FakeCxn {
    replies: Vec<(CxnId, Reply)>,
    errors: Vec<(CxnId, Xid, OfpError)>,
}

impl CxnManager for FakeCxn {
    fn send_reply(&mut self, cxn_id: CxnId, reply: Reply) {
        self.replies.push((cxn_id, reply));
    }

    fn send_error_reply(&mut self, cxn_id: CxnId, xid: Xid, error: OfpError) {
        self.errors.push((cxn_id, xid, error));
    }
}

/// Manually advanced clock shared between a test and its manager.
#[derive(Clone, Default)]
struct TestClock(Rc<Cell<Duration>>);

impl TestClock {
    fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl TimeSource for TestClock {
    fn current_time(&self) -> Duration {
        self.0.get()
    }
}

const CXN: CxnId = 7;

struct TestAgent {
    clock: TestClock,
    manager: GroupManager<FakeForwarding, FakeCxn>,
}

impl TestAgent {
    fn new() -> TestAgent {
        let clock = TestClock::default();
        let manager = GroupManager::with_time_source(
            FakeForwarding::default(),
            FakeCxn::default(),
            Box::new(clock.clone()),
        );
        TestAgent { clock, manager }
    }

    fn add(&mut self, id: GroupId, kind: GroupType, buckets: BucketList) {
        let request = GroupAdd { xid: 0, group_id: id, group_type: kind, buckets };
        self.manager.handle_group_add(request, CXN);
    }

    fn modify(&mut self, id: GroupId, kind: GroupType, buckets: BucketList) {
        let request = GroupModify { xid: 0, group_id: id, group_type: kind, buckets };
        self.manager.handle_group_modify(request, CXN);
    }

    fn delete(&mut self, id: GroupId) {
        self.manager.handle_group_delete(GroupDelete { xid: 0, group_id: id }, CXN);
    }

    fn stats(&mut self, id: GroupId) -> GroupStatsReply {
        self.manager.handle_group_stats_request(GroupStatsRequest { xid: 0, group_id: id }, CXN);
        match self.manager.cxn().replies.last() {
            Some((_, Reply::GroupStats(reply))) => reply.clone(),
            other => panic!("expected a group stats reply, got {other:?}"),
        }
    }

    fn desc_stats(&mut self) -> GroupDescStatsReply {
        self.manager.handle_group_desc_stats_request(GroupDescStatsRequest { xid: 0 }, CXN);
        match self.manager.cxn().replies.last() {
            Some((_, Reply::GroupDescStats(reply))) => reply.clone(),
            other => panic!("expected a group desc stats reply, got {other:?}"),
        }
    }

    fn calls(&self) -> &[FwdCall] {
        &self.manager.forwarding().calls
    }

    fn errors(&self) -> &[(CxnId, Xid, OfpError)] {
        &self.manager.cxn().errors
    }

    /// The group-mod-failed codes reported so far, in order.
    fn error_codes(&self) -> Vec<GroupModFailedCode> {
        self.errors()
            .iter()
            .map(|(_, _, error)| match error {
                OfpError::GroupModFailed(code) => *code,
                other => panic!("expected a group mod failed error, got {other:?}"),
            })
            .collect()
    }
}

fn buckets(weights: &[u16]) -> BucketList {
    weights
        .iter()
        .map(|&weight| Bucket {
            weight,
            watch_port: u32::MAX,
            watch_group: u32::MAX,
            actions: vec![0, 0, 0, 16, 0, 0, 0, weight as u8],
        })
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn add_installs_group() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1, 2]));

    assert_eq!(agent.calls(), [FwdCall::Add(1, GroupType::All)]);
    assert!(agent.errors().is_empty());
    assert!(agent.manager.cxn().replies.is_empty());

    let entry = agent.manager.groups().lookup(1).unwrap();
    assert_eq!(entry.kind, GroupType::All);
    assert_eq!(entry.buckets, buckets(&[1, 2]));
}

#[test]
fn duplicate_add_is_rejected() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.add(1, GroupType::Select, buckets(&[2]));

    assert_eq!(agent.error_codes(), [GroupModFailedCode::GroupExists]);

    // The first entry is untouched and the forwarding plane never saw the second add.
    let entry = agent.manager.groups().lookup(1).unwrap();
    assert_eq!(entry.kind, GroupType::All);
    assert_eq!(entry.buckets, buckets(&[1]));
    assert_eq!(agent.calls(), [FwdCall::Add(1, GroupType::All)]);
}

#[test]
fn add_beyond_group_max_is_rejected() {
    let mut agent = TestAgent::new();
    agent.add(GROUP_MAX + 1, GroupType::All, buckets(&[1]));

    assert_eq!(agent.error_codes(), [GroupModFailedCode::InvalidGroup]);
    assert!(agent.manager.groups().is_empty());
    assert!(agent.calls().is_empty());
}

#[test]
fn add_rejected_by_forwarding_plane() {
    let mut agent = TestAgent::new();
    agent.manager.forwarding().fail_add.set(true);
    agent.add(1, GroupType::All, buckets(&[1]));

    assert_eq!(agent.error_codes(), [GroupModFailedCode::InvalidGroup]);
    assert!(agent.manager.groups().is_empty());
}

#[test]
fn modify_of_unknown_group_is_rejected() {
    let mut agent = TestAgent::new();
    agent.modify(9, GroupType::All, buckets(&[1]));

    // An out-of-range id is also just an unknown group to modify.
    agent.modify(GROUP_MAX + 1, GroupType::All, buckets(&[1]));

    assert_eq!(
        agent.error_codes(),
        [GroupModFailedCode::UnknownGroup, GroupModFailedCode::UnknownGroup]
    );
    assert!(agent.calls().is_empty());
}

#[test]
fn modify_swaps_buckets_and_keeps_creation_time() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::Select, buckets(&[1]));
    let created = agent.manager.groups().lookup(1).unwrap().creation_time;

    agent.clock.advance(Duration::from_secs(30));
    agent.modify(1, GroupType::Select, buckets(&[2, 3]));

    assert!(agent.errors().is_empty());
    assert_eq!(
        agent.calls(),
        [FwdCall::Add(1, GroupType::Select), FwdCall::Modify(1)]
    );

    let entry = agent.manager.groups().lookup(1).unwrap();
    assert_eq!(entry.buckets, buckets(&[2, 3]));
    assert_eq!(entry.creation_time, created);
}

#[test]
fn modify_with_type_change_recreates_group() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.modify(1, GroupType::Select, buckets(&[2]));

    assert!(agent.errors().is_empty());
    assert_eq!(
        agent.calls(),
        [
            FwdCall::Add(1, GroupType::All),
            FwdCall::Delete(1),
            FwdCall::Add(1, GroupType::Select),
        ]
    );
    assert_eq!(agent.manager.groups().lookup(1).unwrap().kind, GroupType::Select);
}

/// A failed recreate leaves the table entry as it was.  The forwarding plane has already lost
/// the group at that point, which is logged rather than hidden.
#[traced_test]
#[test]
fn failed_type_change_keeps_table_entry() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    agent.manager.forwarding().fail_add.set(true);
    agent.modify(1, GroupType::Select, buckets(&[2]));

    assert_eq!(agent.error_codes(), [GroupModFailedCode::InvalidGroup]);
    let entry = agent.manager.groups().lookup(1).unwrap();
    assert_eq!(entry.kind, GroupType::All);
    assert_eq!(entry.buckets, buckets(&[1]));
    assert!(logs_contain("deleted from the forwarding plane"));
}

#[test]
fn modify_rejected_by_forwarding_plane() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    agent.manager.forwarding().fail_modify.set(true);
    agent.modify(1, GroupType::All, buckets(&[2]));

    assert_eq!(agent.error_codes(), [GroupModFailedCode::InvalidGroup]);
    assert_eq!(agent.manager.groups().lookup(1).unwrap().buckets, buckets(&[1]));
}

#[test]
fn delete_removes_group() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.delete(1);

    assert!(agent.errors().is_empty());
    assert!(agent.manager.groups().is_empty());
    assert_eq!(
        agent.calls(),
        [FwdCall::Add(1, GroupType::All), FwdCall::Delete(1)]
    );
}

#[test]
fn delete_of_missing_group_is_success() {
    let mut agent = TestAgent::new();
    agent.delete(9);

    assert!(agent.errors().is_empty());
    assert!(agent.calls().is_empty());
}

#[test]
fn delete_of_reserved_id_is_rejected() {
    let mut agent = TestAgent::new();
    agent.delete(GROUP_MAX + 1);
    agent.delete(GROUP_ANY);

    assert_eq!(
        agent.error_codes(),
        [GroupModFailedCode::InvalidGroup, GroupModFailedCode::InvalidGroup]
    );
}

#[test]
fn delete_all_empties_table() {
    let mut agent = TestAgent::new();
    for id in [3, 1, 2] {
        agent.add(id, GroupType::All, buckets(&[1]));
    }
    agent.delete(GROUP_ALL);

    assert!(agent.errors().is_empty());
    assert!(agent.manager.groups().is_empty());

    let mut deleted: Vec<GroupId> = agent
        .calls()
        .iter()
        .filter_map(|call| match call {
            FwdCall::Delete(id) => Some(*id),
            _ => None,
        })
        .collect();
    deleted.sort_unstable();
    assert_eq!(deleted, [1, 2, 3]);

    // Wildcard delete of an already empty table is also silent.
    agent.delete(GROUP_ALL);
    assert!(agent.errors().is_empty());
}

#[test]
fn table_holds_unique_ordinary_ids() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.add(2, GroupType::Select, buckets(&[1]));
    agent.add(GROUP_MAX, GroupType::All, buckets(&[1]));
    agent.add(GROUP_MAX + 1, GroupType::All, buckets(&[1]));
    agent.delete(2);
    agent.add(2, GroupType::Indirect, buckets(&[2]));

    let mut ids: Vec<GroupId> = agent.manager.groups().iter().map(|entry| entry.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, [1, 2, GROUP_MAX]);
    assert!(ids.iter().all(|&id| id <= GROUP_MAX));
}

#[test]
fn group_stats_for_one_group() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.clock.advance(Duration::new(5, 250_000_000));

    let request = GroupStatsRequest { xid: 0x1234, group_id: 1 };
    agent.manager.handle_group_stats_request(request, CXN);
    let reply = match agent.manager.cxn().replies.last() {
        Some((cxn_id, Reply::GroupStats(reply))) => {
            assert_eq!(*cxn_id, CXN);
            reply.clone()
        }
        other => panic!("expected a group stats reply, got {other:?}"),
    };

    assert_eq!(reply.xid, 0x1234);
    assert_eq!(
        reply.entries.as_slice(),
        [GroupStatsEntry {
            group_id: 1,
            ref_count: 1,
            packet_count: 10,
            byte_count: 100,
            duration_sec: 5,
            duration_nsec: 250_000_000,
            bucket_stats: vec![],
        }]
    );
}

#[test]
fn stats_for_missing_group_is_empty() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    let reply = agent.stats(9);
    assert!(reply.entries.is_empty());
    assert!(agent.errors().is_empty());
}

#[test]
fn stats_for_reserved_id_is_empty() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    let reply = agent.stats(GROUP_ANY);
    assert!(reply.entries.is_empty());
    assert!(agent.errors().is_empty());
    assert!(!agent.calls().iter().any(|call| matches!(call, FwdCall::Stats(_))));
}

#[test]
fn wildcard_stats_reports_every_group_in_id_order() {
    let mut agent = TestAgent::new();
    for id in [3, 1, 2] {
        agent.add(id, GroupType::All, buckets(&[1]));
    }

    let reply = agent.stats(GROUP_ALL);
    let ids: Vec<GroupId> = reply.entries.iter().map(|record| record.group_id).collect();
    assert_eq!(ids, [1, 2, 3]);
}

#[test]
fn wildcard_stats_on_empty_table_is_empty() {
    let mut agent = TestAgent::new();
    let reply = agent.stats(GROUP_ALL);

    assert!(reply.entries.is_empty());
    assert!(agent.errors().is_empty());
}

#[test]
fn wildcard_stats_truncates_at_reply_capacity() {
    let mut agent = TestAgent::new();
    let installed = 1700;
    for id in 1..=installed {
        agent.add(id, GroupType::All, buckets(&[1]));
    }

    let reply = agent.stats(GROUP_ALL);
    let record_len = reply.entries.as_slice()[0].wire_len();
    let capacity = MAX_REPLY_BODY / record_len;
    assert!(capacity < installed as usize);
    assert_eq!(reply.entries.len(), capacity);
    assert!(agent.errors().is_empty());
}

#[test]
fn desc_stats_round_trips_buckets() -> Result<()> {
    let mut agent = TestAgent::new();
    agent.add(2, GroupType::All, buckets(&[4]));
    agent.add(1, GroupType::Select, buckets(&[1, 2, 3]));

    let reply = agent.desc_stats();
    let records = reply.entries.as_slice();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].group_id, 1);
    assert_eq!(records[0].group_type, GroupType::Select);
    assert_eq!(BucketList::decode(&records[0].buckets)?, buckets(&[1, 2, 3]));

    assert_eq!(records[1].group_id, 2);
    assert_eq!(records[1].group_type, GroupType::All);
    assert_eq!(BucketList::decode(&records[1].buckets)?, buckets(&[4]));
    Ok(())
}

#[test]
fn features_stats_request_is_unhandled() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    let request = GroupFeaturesStatsRequest { xid: 0x77 };
    agent.manager.handle_group_features_stats_request(request, CXN);

    assert_eq!(
        agent.errors(),
        [(CXN, 0x77, OfpError::BadRequest(BadRequestCode::BadType))]
    );
    assert!(agent.manager.cxn().replies.is_empty());
    assert_eq!(agent.manager.groups().len(), 1);
}

#[test]
fn error_replies_echo_the_request_xid() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));

    let request = GroupAdd {
        xid: 0xabcd,
        group_id: 1,
        group_type: GroupType::All,
        buckets: buckets(&[1]),
    };
    agent.manager.handle_group_add(request, CXN);

    assert_eq!(
        agent.errors(),
        [(CXN, 0xabcd, OfpError::GroupModFailed(GroupModFailedCode::GroupExists))]
    );
}

/// Every rejection a handler can produce maps to one of the three real group-mod-failed codes.
/// The permission-denied code in the same space must never reach the wire.
#[test]
fn rejections_never_report_permission_denied() {
    let mut agent = TestAgent::new();
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.add(1, GroupType::All, buckets(&[1]));
    agent.add(GROUP_MAX + 1, GroupType::All, buckets(&[1]));
    agent.modify(9, GroupType::All, buckets(&[1]));
    agent.delete(GROUP_ANY);

    agent.manager.forwarding().fail_add.set(true);
    agent.manager.forwarding().fail_modify.set(true);
    agent.add(2, GroupType::All, buckets(&[1]));
    agent.modify(1, GroupType::All, buckets(&[2]));
    agent.modify(1, GroupType::Select, buckets(&[2]));

    assert_eq!(agent.errors().len(), 7);
    for code in agent.error_codes() {
        assert_ne!(code, GroupModFailedCode::Eperm);
        assert!(matches!(
            code,
            GroupModFailedCode::GroupExists
                | GroupModFailedCode::InvalidGroup
                | GroupModFailedCode::UnknownGroup
        ));
    }
}
