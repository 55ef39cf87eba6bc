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

//! The connection-layer boundary.

use ofpmsg::{BadRequestCode, OfpError, Reply, Xid};

use tracing::debug;

/// Identifies the controller connection a request arrived on.
pub type CxnId = u32;

/// The session layer that owns controller connections.
///
/// It encodes reply objects onto the wire.  For an error reply it also quotes the original
/// request into the error body; the xid identifies that request.
pub trait CxnManager {
    fn send_reply(&mut self, cxn_id: CxnId, reply: Reply);

    fn send_error_reply(&mut self, cxn_id: CxnId, xid: Xid, error: OfpError);
}

/// Standard path for a message type the agent does not implement: log it and report
/// `BadRequest`/`BadType` to the controller.
pub fn unhandled_message<C: CxnManager>(cxn: &mut C, cxn_id: CxnId, xid: Xid, what: &str) {
    debug!("unhandled message: {what} (xid {xid})");
    cxn.send_error_reply(cxn_id, xid, OfpError::BadRequest(BadRequestCode::BadType));
}
