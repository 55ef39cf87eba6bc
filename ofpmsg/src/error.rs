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

//! The protocol error vocabulary.
//!
//! An OpenFlow error reply carries an error type and, within that type's space, an error code.
//! The enums here cover the two types the agent reports and their code spaces; `to_openflow`
//! gives the value each carries on the wire.

use thiserror::Error;

/// OpenFlow error type, the outer half of an error reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    BadRequest,
    GroupModFailed,
}

impl ErrorType {
    pub fn to_openflow(&self) -> u16 {
        match self {
            ErrorType::BadRequest => 1,
            ErrorType::GroupModFailed => 6,
        }
    }
}

/// Codes within the `BadRequest` error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadRequestCode {
    BadVersion,
    BadType,
    BadStat,
}

impl BadRequestCode {
    pub fn to_openflow(&self) -> u16 {
        match self {
            BadRequestCode::BadVersion => 0,
            BadRequestCode::BadType => 1,
            BadRequestCode::BadStat => 2,
        }
    }
}

/// Codes within the `GroupModFailed` error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupModFailedCode {
    GroupExists,
    InvalidGroup,
    WeightUnsupported,
    OutOfGroups,
    OutOfBuckets,
    ChainingUnsupported,
    WatchUnsupported,
    Loop,
    UnknownGroup,
    ChainedGroup,
    BadType,
    BadCommand,
    BadBucket,
    BadWatch,
    Eperm,
}

impl GroupModFailedCode {
    pub fn to_openflow(&self) -> u16 {
        match self {
            GroupModFailedCode::GroupExists => 0,
            GroupModFailedCode::InvalidGroup => 1,
            GroupModFailedCode::WeightUnsupported => 2,
            GroupModFailedCode::OutOfGroups => 3,
            GroupModFailedCode::OutOfBuckets => 4,
            GroupModFailedCode::ChainingUnsupported => 5,
            GroupModFailedCode::WatchUnsupported => 6,
            GroupModFailedCode::Loop => 7,
            GroupModFailedCode::UnknownGroup => 8,
            GroupModFailedCode::ChainedGroup => 9,
            GroupModFailedCode::BadType => 10,
            GroupModFailedCode::BadCommand => 11,
            GroupModFailedCode::BadBucket => 12,
            GroupModFailedCode::BadWatch => 13,
            GroupModFailedCode::Eperm => 14,
        }
    }
}

/// A fully resolved protocol error, pairing an error type with a code from that type's space.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OfpError {
    #[error("bad request ({0:?})")]
    BadRequest(BadRequestCode),
    #[error("group mod failed ({0:?})")]
    GroupModFailed(GroupModFailedCode),
}

impl OfpError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            OfpError::BadRequest(_) => ErrorType::BadRequest,
            OfpError::GroupModFailed(_) => ErrorType::GroupModFailed,
        }
    }

    /// The wire value of the code half of this error.
    pub fn error_code(&self) -> u16 {
        match self {
            OfpError::BadRequest(code) => code.to_openflow(),
            OfpError::GroupModFailed(code) => code.to_openflow(),
        }
    }
}
