// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt::{Debug, Display};
use smmvar_raw::Status;

/// An UEFI-related error with optionally additional payload data.
///
/// The error kind is encoded in the `status` field (guaranteed to never be
/// [`Status::SUCCESS`]). Additional payload may be inside the `data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error<Data: Debug = ()> {
    status: Status,
    data: Data,
}

impl<Data: Debug> Error<Data> {
    /// Creates a new error.
    ///
    /// # Panics
    ///
    /// Panics if `status` is [`Status::SUCCESS`].
    pub fn new(status: Status, data: Data) -> Self {
        assert_ne!(status, Status::SUCCESS);
        Self { status, data }
    }

    /// The status of the error.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The payload of the error.
    #[must_use]
    pub const fn data(&self) -> &Data {
        &self.data
    }
}

impl From<Status> for Error<()> {
    fn from(status: Status) -> Self {
        Self::new(status, ())
    }
}

impl<Data: Debug> Display for Error<Data> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "UEFI Error {}: {:?}", self.status(), self.data())
    }
}
