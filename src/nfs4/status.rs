//! NFSv4 status codes (RFC 5661 §13.1) and their mapping to POSIX errno.

/// Status reported by a single NFSv4 operation inside a COMPOUND reply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NfsStat {
    Ok,
    Perm,
    NoEnt,
    Io,
    NxIo,
    Access,
    Exist,
    XDev,
    NotDir,
    IsDir,
    Inval,
    FBig,
    NoSpc,
    RoFs,
    MLink,
    NameTooLong,
    NotEmpty,
    DQuot,
    Stale,
    BadHandle,
    BadCookie,
    NotSupp,
    TooSmall,
    ServerFault,
    BadType,
    Delay,
    Grace,
    FhExpired,
    StaleClientId,
    StaleStateId,
    BadStateId,
    BadSeqId,
    BadSession,
    BadSlot,
    SeqMisordered,
    /// Any status the planner does not have a dedicated variant for.
    Other(u32),
}

impl NfsStat {
    /// Maps a server status to the POSIX errno the public API reports.
    ///
    /// Table follows §4.5 of the specification; anything not named falls
    /// back to `EIO`.
    pub fn to_errno(self) -> i32 {
        use libc_errno::*;
        match self {
            NfsStat::Ok => 0,
            NfsStat::Perm => EPERM,
            NfsStat::NoEnt => ENOENT,
            NfsStat::Io => EIO,
            NfsStat::NxIo => ENXIO,
            NfsStat::Access => EACCES,
            NfsStat::Exist => EEXIST,
            NfsStat::XDev => EXDEV,
            NfsStat::NotDir => ENOTDIR,
            NfsStat::IsDir => EISDIR,
            NfsStat::Inval => EINVAL,
            NfsStat::FBig => EFBIG,
            NfsStat::NoSpc => ENOSPC,
            NfsStat::RoFs => EROFS,
            NfsStat::MLink => EMLINK,
            NfsStat::NameTooLong => ENAMETOOLONG,
            NfsStat::NotEmpty => ENOTEMPTY,
            NfsStat::DQuot => EDQUOT,
            NfsStat::Stale => ESTALE,
            NfsStat::BadHandle => ESTALE,
            NfsStat::BadCookie => ESTALE,
            NfsStat::NotSupp => ENOTSUP,
            NfsStat::TooSmall => EINVAL,
            NfsStat::FhExpired => ESTALE,
            NfsStat::StaleClientId | NfsStat::StaleStateId | NfsStat::BadStateId => ESTALE,
            NfsStat::BadSeqId | NfsStat::BadSession | NfsStat::BadSlot | NfsStat::SeqMisordered => {
                EIO
            }
            NfsStat::Delay | NfsStat::Grace => EAGAIN,
            NfsStat::ServerFault | NfsStat::BadType | NfsStat::Other(_) => EIO,
        }
    }

    /// Whether the executor should transparently retry the compound that
    /// produced this status (§4.4 retry policy).
    pub fn is_transient(self) -> bool {
        matches!(self, NfsStat::Delay | NfsStat::Grace)
    }
}

/// Minimal POSIX errno constants, kept local so this module does not need a
/// `libc` dependency just to name a dozen integers.
mod libc_errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENXIO: i32 = 6;
    pub const EACCES: i32 = 13;
    pub const EEXIST: i32 = 17;
    pub const EXDEV: i32 = 18;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const EINVAL: i32 = 22;
    pub const EFBIG: i32 = 27;
    pub const ENOSPC: i32 = 28;
    pub const EROFS: i32 = 30;
    pub const EMLINK: i32 = 31;
    pub const ENAMETOOLONG: i32 = 36;
    pub const ENOTEMPTY: i32 = 39;
    pub const ENOTSUP: i32 = 95;
    pub const EDQUOT: i32 = 122;
    pub const ESTALE: i32 = 116;
    pub const EAGAIN: i32 = 11;
}

pub(crate) const EBADF: i32 = 9;
pub(crate) const EINVAL: i32 = libc_errno::EINVAL;
pub(crate) const EIO: i32 = libc_errno::EIO;
pub(crate) const ETIMEDOUT: i32 = 110;
pub(crate) const E2BIG: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_maps_to_zero() {
        assert_eq!(NfsStat::Ok.to_errno(), 0);
    }

    #[test]
    fn table_matches_spec_examples() {
        assert_eq!(NfsStat::NoEnt.to_errno(), 2);
        assert_eq!(NfsStat::Access.to_errno(), 13);
        assert_eq!(NfsStat::Exist.to_errno(), 17);
        assert_eq!(NfsStat::NotDir.to_errno(), 20);
        assert_eq!(NfsStat::IsDir.to_errno(), 21);
        assert_eq!(NfsStat::FBig.to_errno(), 27);
        assert_eq!(NfsStat::NoSpc.to_errno(), 28);
        assert_eq!(NfsStat::RoFs.to_errno(), 30);
        assert_eq!(NfsStat::NameTooLong.to_errno(), 36);
        assert_eq!(NfsStat::NotEmpty.to_errno(), 39);
        assert_eq!(NfsStat::Stale.to_errno(), 116);
        assert_eq!(NfsStat::NotSupp.to_errno(), 95);
        assert_eq!(NfsStat::Other(12345).to_errno(), 5);
    }

    #[test]
    fn delay_and_grace_are_transient() {
        assert!(NfsStat::Delay.is_transient());
        assert!(NfsStat::Grace.is_transient());
        assert!(!NfsStat::Stale.is_transient());
    }
}
