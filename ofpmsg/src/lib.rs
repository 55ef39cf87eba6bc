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

//! `ofpmsg` holds the decoded forms of the OpenFlow group messages.  The session layer decodes
//! wire messages into the request objects here before dispatching them to the group-table
//! handlers, and encodes the reply objects the handlers produce back onto the wire.  Only the
//! fields the handlers read or fill are represented.

pub mod bucket;
pub mod error;
pub mod group;

pub use bucket::{Bucket, BucketDecodeError, BucketEncodeError, BucketList};
pub use error::{BadRequestCode, ErrorType, GroupModFailedCode, OfpError};
pub use group::{
    BucketCounter,
    EntryList,
    GroupAdd,
    GroupDelete,
    GroupDescStatsEntry,
    GroupDescStatsReply,
    GroupDescStatsRequest,
    GroupFeaturesStatsRequest,
    GroupId,
    GroupModify,
    GroupStatsEntry,
    GroupStatsReply,
    GroupStatsRequest,
    GroupType,
    Reply,
    ReplyFull,
    WireEntry,
    Xid,
    GROUP_ALL,
    GROUP_ANY,
    GROUP_MAX,
    MAX_REPLY_BODY,
};
