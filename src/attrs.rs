//! Attribute mask and value types shared by GETATTR/SETATTR/CREATE/READDIR
//! (§3 `AttrMask` / `Attrs`).
//!
//! Each field of [`Attrs`] is independently present rather than bundled
//! behind one mask-plus-struct pair — an `Option<T>` says it plainer.

use crate::nfs4::NfsTime;

/// Mask of which [`Attrs`] fields a GETATTR/READDIR request should fetch.
/// Plain bit flags over a `u32`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct AttrMask(u32);

impl AttrMask {
    pub const MODE: AttrMask = AttrMask(1 << 0);
    pub const SIZE: AttrMask = AttrMask(1 << 1);
    pub const UID: AttrMask = AttrMask(1 << 2);
    pub const GID: AttrMask = AttrMask(1 << 3);
    pub const RDEV: AttrMask = AttrMask(1 << 4);
    pub const NLINK: AttrMask = AttrMask(1 << 5);
    pub const ATIME: AttrMask = AttrMask(1 << 6);
    pub const MTIME: AttrMask = AttrMask(1 << 7);
    pub const CTIME: AttrMask = AttrMask(1 << 8);
    pub const ALL: AttrMask = AttrMask(0x1FF);
    pub const NONE: AttrMask = AttrMask(0);

    pub fn contains(self, other: AttrMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: AttrMask) -> AttrMask {
        AttrMask(self.0 | other.0)
    }
}

impl std::ops::BitOr for AttrMask {
    type Output = AttrMask;
    fn bitor(self, rhs: AttrMask) -> AttrMask {
        self.union(rhs)
    }
}

/// File attributes. `None` means "not requested" on the way out and "leave
/// unchanged" on the way in (SETATTR).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Attrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlink: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atime: Option<NfsTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<NfsTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctime: Option<NfsTime>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn set_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn set_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn set_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn set_atime(mut self, sec: i64, nsec: u32) -> Self {
        self.atime = Some(NfsTime { sec, nsec });
        self
    }

    pub fn set_mtime(mut self, sec: i64, nsec: u32) -> Self {
        self.mtime = Some(NfsTime { sec, nsec });
        self
    }

    /// The mask of fields actually present on this value.
    pub fn mask(&self) -> AttrMask {
        let mut mask = AttrMask::NONE;
        if self.mode.is_some() {
            mask = mask | AttrMask::MODE;
        }
        if self.size.is_some() {
            mask = mask | AttrMask::SIZE;
        }
        if self.uid.is_some() {
            mask = mask | AttrMask::UID;
        }
        if self.gid.is_some() {
            mask = mask | AttrMask::GID;
        }
        if self.rdev.is_some() {
            mask = mask | AttrMask::RDEV;
        }
        if self.nlink.is_some() {
            mask = mask | AttrMask::NLINK;
        }
        if self.atime.is_some() {
            mask = mask | AttrMask::ATIME;
        }
        if self.mtime.is_some() {
            mask = mask | AttrMask::MTIME;
        }
        if self.ctime.is_some() {
            mask = mask | AttrMask::CTIME;
        }
        mask
    }

    /// True if every field present in `mask` is equal between `self` and
    /// `other`. Used by the setattr/getattr round-trip test (§8 scenario 3)
    /// and deliberately an exact comparison — see DESIGN.md for why the
    /// original's `!written->mode & read->mode` expression is not replicated.
    pub fn matches_under_mask(&self, other: &Attrs, mask: AttrMask) -> bool {
        (!mask.contains(AttrMask::MODE) || self.mode == other.mode)
            && (!mask.contains(AttrMask::SIZE) || self.size == other.size)
            && (!mask.contains(AttrMask::UID) || self.uid == other.uid)
            && (!mask.contains(AttrMask::GID) || self.gid == other.gid)
            && (!mask.contains(AttrMask::RDEV) || self.rdev == other.rdev)
            && (!mask.contains(AttrMask::NLINK) || self.nlink == other.nlink)
            && (!mask.contains(AttrMask::ATIME) || self.atime == other.atime)
            && (!mask.contains(AttrMask::MTIME) || self.mtime == other.mtime)
            && (!mask.contains(AttrMask::CTIME) || self.ctime == other.ctime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_under_mask_ignores_unmasked_fields() {
        let a = Attrs::new().set_mode(0o444).set_uid(1);
        let b = Attrs::new().set_mode(0o444).set_uid(2);
        assert!(a.matches_under_mask(&b, AttrMask::MODE));
        assert!(!a.matches_under_mask(&b, AttrMask::MODE | AttrMask::UID));
    }

    #[test]
    fn mask_reflects_present_fields() {
        let a = Attrs::new().set_mode(1).set_uid(2);
        assert!(a.mask().contains(AttrMask::MODE));
        assert!(a.mask().contains(AttrMask::UID));
        assert!(!a.mask().contains(AttrMask::SIZE));
    }
}
