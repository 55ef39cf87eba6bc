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

//! The time source behind group creation times and statistics durations.

use std::time::{Duration, Instant};

/// Supplies the current time as an offset from a fixed, arbitrary origin.  Only differences
/// between two readings are meaningful.
pub trait TimeSource {
    fn current_time(&self) -> Duration;
}

/// The process monotonic clock, anchored where the source is created.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> MonotonicClock {
        MonotonicClock::new()
    }
}

impl TimeSource for MonotonicClock {
    fn current_time(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Splits an elapsed duration into the (seconds, nanoseconds) pair the statistics wire format
/// carries.  Saturates at the 32-bit seconds bound.
pub fn duration_parts(elapsed: Duration) -> (u32, u32) {
    let sec = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
    (sec, elapsed.subsec_nanos())
}
