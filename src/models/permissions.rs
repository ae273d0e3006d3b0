// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User permission bit flags.
//!
//! Flags are independent and combine with `|`. Holding a permission set means
//! holding every bit in it, so `has_all(Owner | Comment)` is false for a plain
//! owner without the comment bit.
//!
//! `OWNER` is stored as an ordinary bit but acts as a rank above everything
//! else: it can never be granted or revoked through the modify-permissions
//! path, and owners are authorized by rank rather than by holding
//! `ASSIGN_PERMISSIONS`.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Capabilities a user holds on the site.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UserPermissions: u32 {
        /// Change permissions of themselves and others (excluding this permission).
        const ASSIGN_PERMISSIONS = 1 << 0;
        /// Modify post attributes, delete any comments, and accept/deny/withdraw posts.
        const AUDIT = 1 << 1;
        /// Comment on posts (default permission).
        const COMMENT = 1 << 2;
        /// Submit posts (to be audited).
        const UPLOAD = 1 << 3;
        /// Site owner, the top rank.
        const OWNER = 1 << 4;
    }
}

impl UserPermissions {
    /// Permission set given to every newly registered user.
    pub const DEFAULT: Self = Self::COMMENT;

    /// True when every bit of `required` is present.
    pub fn has_all(self, required: Self) -> bool {
        self.contains(required)
    }

    pub fn is_owner(self) -> bool {
        self.has_all(Self::OWNER)
    }

    pub fn can_assign(self) -> bool {
        self.has_all(Self::ASSIGN_PERMISSIONS)
    }
}

impl Default for UserPermissions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// Stored and sent as the raw integer, never as flag names.
impl Serialize for UserPermissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for UserPermissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits_retain)
    }
}
