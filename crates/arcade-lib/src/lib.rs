use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
};

use serde::{Deserialize, Serialize};

pub mod lobby;
pub mod net;

/// Upper bound on the number of seats a lobby can be opened with.
pub const MAX_CAPACITY: usize = 8;

/// Upper bound, in bytes, on a lobby's name and join code.
pub const MAX_TEXT_LEN: usize = 64;

// Setup Newtype pattern for IDs
macro_rules! decl_id {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Hash)]
        pub struct $name(pub u32);

        impl Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                <Self as Display>::fmt(self, f)
            }
        }
        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                // IDs are opaque, hex keeps them short in logs
                write!(f, "{:#X}", self.0)
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
        impl From<$name> for u32 {
            #[inline]
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl Borrow<u32> for $name {
            #[inline]
            fn borrow(&self) -> &u32 {
                &self.0
            }
        }
        impl PartialEq<u32> for $name {
            #[inline]
            fn eq(&self, other: &u32) -> bool {
                self.0 == *other
            }
        }
    };
}

decl_id!(ClientId);
decl_id!(LobbyId);
