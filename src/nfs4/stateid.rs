//! Open-owner state tracking (RFC 5661 §8.2): stateids, their sequence
//! numbers, and the per-descriptor state machine described in §4.4.

/// Sequence number paired with a [`StateId`]; bumped per NFSv4 rules on
/// every OPEN_CONFIRM/CLOSE/OPEN-upgrade.
pub type SeqId = u32;

/// Opaque token naming one open of one file (RFC 5661 §2.10.6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct StateId {
    pub seqid: SeqId,
    pub other: [u8; 12],
}

impl StateId {
    pub const ANONYMOUS: StateId = StateId { seqid: 0, other: [0; 12] };

    /// The "current stateid" sentinel (RFC 5661 §16.2.3.1.2): refers to
    /// whatever stateid the nearest preceding stateful op (OPEN, LOCK, …) in
    /// the same COMPOUND produced, without the client needing to know its
    /// real value before the round trip completes.
    pub const CURRENT: StateId = StateId { seqid: 1, other: [0xff; 12] };
}

/// Lifecycle of a library-issued descriptor (§4.4).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpenLifecycle {
    Unopened,
    Opening,
    Opened,
    Closing,
}

/// Everything the Descriptor Table keeps about one open file (§3 `OpenState`).
#[derive(Debug, Clone)]
pub struct OpenState {
    pub handle: super::FileHandle,
    pub stateid: StateId,
    pub seqid: SeqId,
    pub access: super::OpenAccess,
    pub offset: i64,
    pub lifecycle: OpenLifecycle,
}

impl OpenState {
    /// Built the moment OPEN's reply decodes, before the executor has
    /// confirmed the descriptor is usable — lifecycle starts at `Opening`
    /// and the caller transitions it to `Opened` once published (§4.4).
    pub fn new(handle: super::FileHandle, stateid: StateId, access: super::OpenAccess) -> Self {
        OpenState {
            handle,
            stateid,
            seqid: stateid.seqid,
            access,
            offset: 0,
            lifecycle: OpenLifecycle::Opening,
        }
    }

    /// Advances the seqid the way NFSv4 requires after OPEN_CONFIRM / CLOSE
    /// / any other seqid-mutating operation on this open-owner.
    pub fn bump_seqid(&mut self) {
        self.seqid = self.seqid.wrapping_add(1);
        self.stateid.seqid = self.seqid;
    }
}
