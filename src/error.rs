//! Our error types for the TC-48-20 controller.

use thiserror::Error;

use crate::parameter::Parameter;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for TC-48-20 communications.
///
/// `Serial`, `Timeout`, `Framing` and `Checksum` are reply-path problems.
/// `CommandRejected` is different: the controller itself is reporting that
/// the command *it* received failed its checksum, so the corruption happened
/// on the outbound path.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("serial communication error")]
    Serial(I),
    #[error("timed out waiting for a complete reply")]
    Timeout,
    #[error("malformed reply frame")]
    Framing,
    #[error("reply checksum mismatch")]
    Checksum,
    #[error("controller rejected the command checksum")]
    CommandRejected,
    #[error("parameter {0:?} has no read command")]
    NotReadable(Parameter),
    #[error("parameter {0:?} has no write command")]
    NotWritable(Parameter),
    #[error("scaled value does not fit the controller's 16-bit range")]
    InvalidRange,
    #[error("invalid controller: model code {found}, expected {}", crate::parameter::MODEL_CODE)]
    InvalidController { found: i16 },
}
