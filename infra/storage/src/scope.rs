//! Capability scopes and their mapping onto coarse backend-native tiers.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// The set of operations a backend handle is authorized to perform.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Scope: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const DELETE = 1 << 2;
        const SIGN_URL = 1 << 3;

        const RW = Self::READ.bits() | Self::WRITE.bits();
        const RWD = Self::RW.bits() | Self::DELETE.bits();
    }
}

const NAMES: [(Scope, &str); 4] = [
    (Scope::READ, "read"),
    (Scope::WRITE, "write"),
    (Scope::DELETE, "delete"),
    (Scope::SIGN_URL, "sign_url"),
];

impl Scope {
    /// Returns `true` if every flag in `requested` is present in `self`.
    ///
    /// The empty scope is contained in everything, including itself.
    #[must_use]
    pub const fn has(self, requested: Self) -> bool {
        self.contains(requested)
    }

    /// Widens `self` to whatever the backend's native tier for it actually grants.
    ///
    /// The result always contains `self`.
    #[must_use]
    pub fn resolve(self, mapping: &dyn ScopeMapping) -> Self {
        mapping.grants(mapping.tier(self)) | self
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        s.split(',').map(str::trim).fold(Self::empty(), |acc, part| {
            acc | match part {
                "read" => Self::READ,
                "write" => Self::WRITE,
                "delete" => Self::DELETE,
                "sign_url" => Self::SIGN_URL,
                "rw" => Self::RW,
                "rwd" | "all" | "*" => Self::RWD,
                _ => Self::empty(),
            }
        })
    }
}

/// Backend-native permission tiers, totally ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeTier {
    ReadOnly,
    ReadWrite,
    FullControl,
}

impl fmt::Display for NativeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "read-only",
            Self::ReadWrite => "read-write",
            Self::FullControl => "full-control",
        })
    }
}

/// Translates between capability scopes and a backend's native tiers.
pub trait ScopeMapping: Send + Sync + fmt::Debug {
    /// Narrowest native tier covering `scope`.
    fn tier(&self, scope: Scope) -> NativeTier;

    /// Capabilities a native tier actually grants.
    fn grants(&self, tier: NativeTier) -> Scope;
}

/// Cloud-storage style tiers: read-only, read-write, full-control.
///
/// Signing only needs read access to the object.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudStorageTiers;

impl ScopeMapping for CloudStorageTiers {
    fn tier(&self, scope: Scope) -> NativeTier {
        if scope.contains(Scope::DELETE) {
            NativeTier::FullControl
        } else if scope.contains(Scope::WRITE) {
            NativeTier::ReadWrite
        } else {
            NativeTier::ReadOnly
        }
    }

    fn grants(&self, tier: NativeTier) -> Scope {
        match tier {
            NativeTier::ReadOnly => Scope::READ,
            NativeTier::ReadWrite => Scope::RW,
            NativeTier::FullControl => Scope::RWD,
        }
    }
}

/// A single indivisible grant, as exposed by S3-style credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTiers;

impl ScopeMapping for FlatTiers {
    fn tier(&self, _scope: Scope) -> NativeTier {
        NativeTier::FullControl
    }

    fn grants(&self, _tier: NativeTier) -> Scope {
        Scope::all()
    }
}
