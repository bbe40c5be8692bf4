// SPDX-License-Identifier: MIT OR Apache-2.0

//! Facilities for dealing with UEFI operation results.

use core::fmt::Debug;
use smmvar_raw::Status;

mod error;
pub use self::error::Error;

/// Return type of the store operations. The error side carries the UEFI
/// status plus optional additional data.
///
/// Operations that report a required buffer size on failure (`GetVariable`,
/// `GetNextVariableName`) use `ErrData = Option<usize>` so the size travels
/// with the [`Status::BUFFER_TOO_SMALL`] error; everything else uses the
/// default `()`.
pub type Result<Output = (), ErrData = ()> = core::result::Result<Output, Error<ErrData>>;

/// Extension trait which provides some convenience methods for [`Result`].
pub trait ResultExt<Output, ErrData: Debug> {
    /// Extract the UEFI status from this result.
    fn status(&self) -> Status;

    /// Transform the ErrData value to ().
    fn discard_errdata(self) -> Result<Output>;
}

impl<Output, ErrData: Debug> ResultExt<Output, ErrData> for Result<Output, ErrData> {
    fn status(&self) -> Status {
        match self {
            Ok(_) => Status::SUCCESS,
            Err(e) => e.status(),
        }
    }

    fn discard_errdata(self) -> Result<Output> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(e.status().into()),
        }
    }
}
