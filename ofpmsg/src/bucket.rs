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

//! Action buckets.
//!
//! A group carries an ordered list of action buckets.  The action payload of a bucket is opaque
//! to the group table, which stores and serializes it but never interprets it.  The wire image
//! of a bucket is `ofp_bucket`: a 16-byte header (length, weight, watch port, watch group, 4 pad
//! bytes) followed by the action payload, with the length field covering both.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Size of the fixed `ofp_bucket` header on the wire.
pub const BUCKET_HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum BucketEncodeError {
    #[error("bucket wire length {len} overflows the 16-bit length field")]
    Oversize { len: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BucketDecodeError {
    #[error("bucket list truncated ({remaining} bytes left, at least {expected} needed)")]
    Truncated { remaining: usize, expected: usize },
    #[error("bucket length field {len} is shorter than the bucket header")]
    BadLength { len: usize },
}

/// One alternative action set within a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Relative weight, used only by select groups.
    pub weight: u16,

    /// Port whose liveness gates this bucket, used only by fast-failover groups.
    pub watch_port: u32,

    /// Group whose liveness gates this bucket, used only by fast-failover groups.
    pub watch_group: u32,

    /// Encoded actions, opaque to the group table.
    pub actions: Vec<u8>,
}

impl Bucket {
    /// Size of this bucket's wire image in bytes.
    pub fn wire_len(&self) -> usize {
        BUCKET_HEADER_LEN + self.actions.len()
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), BucketEncodeError> {
        let len = self.wire_len();
        if len > u16::MAX as usize {
            return Err(BucketEncodeError::Oversize { len });
        }

        let mut header = [0; BUCKET_HEADER_LEN];
        BigEndian::write_u16(&mut header[0..2], len as u16);
        BigEndian::write_u16(&mut header[2..4], self.weight);
        BigEndian::write_u32(&mut header[4..8], self.watch_port);
        BigEndian::write_u32(&mut header[8..12], self.watch_group);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.actions);
        Ok(())
    }

    /// Decodes one bucket from the front of `buf`, returning it and its wire length.
    fn decode_one(buf: &[u8]) -> Result<(Bucket, usize), BucketDecodeError> {
        if buf.len() < BUCKET_HEADER_LEN {
            return Err(BucketDecodeError::Truncated {
                remaining: buf.len(),
                expected: BUCKET_HEADER_LEN,
            });
        }

        let len = BigEndian::read_u16(&buf[0..2]) as usize;
        if len < BUCKET_HEADER_LEN {
            return Err(BucketDecodeError::BadLength { len });
        }
        if len > buf.len() {
            return Err(BucketDecodeError::Truncated { remaining: buf.len(), expected: len });
        }

        let bucket = Bucket {
            weight: BigEndian::read_u16(&buf[2..4]),
            watch_port: BigEndian::read_u32(&buf[4..8]),
            watch_group: BigEndian::read_u32(&buf[8..12]),
            actions: buf[BUCKET_HEADER_LEN..len].to_vec(),
        };
        Ok((bucket, len))
    }
}

/// An owned, ordered list of buckets.
///
/// This is the payload a group exclusively owns.  `Clone` is the duplicate operation; handing a
/// list to the store is a move, so a stored list is never aliased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BucketList(Vec<Bucket>);

impl BucketList {
    pub fn new() -> BucketList {
        BucketList(Vec::new())
    }

    pub fn push(&mut self, bucket: Bucket) {
        self.0.push(bucket);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.0.iter()
    }

    /// Size of the whole list's wire image in bytes.
    pub fn wire_len(&self) -> usize {
        self.0.iter().map(Bucket::wire_len).sum()
    }

    /// Serializes the list.  A list decoded from the wire always re-encodes; encoding only fails
    /// for a programmatically built bucket whose actions overflow the length field.
    pub fn encode(&self) -> Result<Vec<u8>, BucketEncodeError> {
        let mut buf = Vec::with_capacity(self.wire_len());
        for bucket in &self.0 {
            bucket.encode_into(&mut buf)?;
        }
        Ok(buf)
    }

    /// Deserializes a list from `buf`, which must contain whole buckets and nothing else.
    pub fn decode(buf: &[u8]) -> Result<BucketList, BucketDecodeError> {
        let mut buckets = Vec::new();
        let mut rest = buf;
        while !rest.is_empty() {
            let (bucket, len) = Bucket::decode_one(rest)?;
            buckets.push(bucket);
            rest = &rest[len..];
        }
        Ok(BucketList(buckets))
    }
}

impl From<Vec<Bucket>> for BucketList {
    fn from(buckets: Vec<Bucket>) -> BucketList {
        BucketList(buckets)
    }
}

impl<'a> IntoIterator for &'a BucketList {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
