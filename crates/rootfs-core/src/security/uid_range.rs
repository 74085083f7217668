//! User-namespace uid/gid shifting.

use std::fmt;
use std::str::FromStr;

use crate::ExtractionError;
use crate::Result;

/// A subordinate id window `[shift, shift + count)` that image owners are
/// mapped into.
///
/// A `count` of zero means the window is unbounded; the blank range
/// (`shift = 0, count = 0`) is the identity mapping used when user
/// namespaces are off.
///
/// The text form is `"shift:count"`.
///
/// # Examples
///
/// ```
/// use rootfs_core::UidRange;
///
/// let range: UidRange = "100000:65536".parse()?;
/// assert_eq!(range.shift(0, 0)?, (100_000, 100_000));
/// assert!(range.shift(65536, 0).is_err());
/// # Ok::<(), rootfs_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UidRange {
    shift: u32,
    count: u32,
}

impl UidRange {
    /// Creates a range starting at host id `shift` covering `count` ids.
    #[must_use]
    pub const fn new(shift: u32, count: u32) -> Self {
        Self { shift, count }
    }

    /// The identity range.
    #[must_use]
    pub const fn blank() -> Self {
        Self { shift: 0, count: 0 }
    }

    /// First host id of the window.
    #[must_use]
    pub const fn shift_offset(&self) -> u32 {
        self.shift
    }

    /// Size of the window, `0` when unbounded.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Returns `true` if shifting leaves every id unchanged.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.shift == 0 && self.count == 0
    }

    const fn violation(&self, uid: u32, gid: u32) -> ExtractionError {
        ExtractionError::UidRange {
            uid,
            gid,
            shift: self.shift,
            count: self.count,
        }
    }

    /// Maps an image `(uid, gid)` to host ids.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UidRange`] if either id is outside the
    /// window or the shifted id would overflow.
    pub fn shift(&self, uid: u32, gid: u32) -> Result<(u32, u32)> {
        if self.count > 0 && (uid >= self.count || gid >= self.count) {
            return Err(self.violation(uid, gid));
        }
        match (uid.checked_add(self.shift), gid.checked_add(self.shift)) {
            (Some(shifted_uid), Some(shifted_gid)) => Ok((shifted_uid, shifted_gid)),
            _ => Err(self.violation(uid, gid)),
        }
    }

    /// Maps host ids back to image ids.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UidRange`] if either id is below the shift
    /// or past the end of the window.
    pub fn unshift(&self, uid: u32, gid: u32) -> Result<(u32, u32)> {
        let (Some(image_uid), Some(image_gid)) =
            (uid.checked_sub(self.shift), gid.checked_sub(self.shift))
        else {
            return Err(self.violation(uid, gid));
        };
        if self.count > 0 && (image_uid >= self.count || image_gid >= self.count) {
            return Err(self.violation(uid, gid));
        }
        Ok((image_uid, image_gid))
    }
}

impl fmt::Display for UidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shift, self.count)
    }
}

impl FromStr for UidRange {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ExtractionError::InvalidUidRange(s.to_string());
        let (shift, count) = s.trim().split_once(':').ok_or_else(invalid)?;
        let shift = shift.parse::<u32>().map_err(|_| invalid())?;
        let count = count.parse::<u32>().map_err(|_| invalid())?;
        if count > 0 && shift.checked_add(count - 1).is_none() {
            return Err(invalid());
        }
        Ok(Self::new(shift, count))
    }
}
