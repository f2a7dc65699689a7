use crate::feature::Feature;
use crate::{Error, Result};
use std::fmt;

/// LAS version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// The major version.
    ///
    /// For now, always 1.
    pub major: u8,
    /// The minor version.
    pub minor: u8,
}

impl Version {
    /// Creates a new version.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Version;
    /// let version = Version::new(1, 2);
    /// ```
    pub fn new(major: u8, minor: u8) -> Version {
        Version { major, minor }
    }

    /// Does this version support the feature?
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::feature::LargeFiles;
    /// use lasstream::Version;
    /// assert!(!Version::new(1, 2).supports::<LargeFiles>());
    /// assert!(Version::new(1, 4).supports::<LargeFiles>());
    /// ```
    pub fn supports<F: Feature>(&self) -> bool {
        F::is_supported_by(*self)
    }

    /// Checks whether this version supports the feature, returning an error
    /// if not.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::feature::Evlrs;
    /// use lasstream::Version;
    /// assert!(Version::new(1, 2).verify_support_for::<Evlrs>().is_err());
    /// assert!(Version::new(1, 4).verify_support_for::<Evlrs>().is_ok());
    /// ```
    pub fn verify_support_for<F: Feature>(&self) -> Result<()> {
        if self.supports::<F>() {
            Ok(())
        } else {
            Err(Error::UnsupportedFeature {
                version: *self,
                feature: F::name(),
            })
        }
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::new(1, 2)
    }
}

impl From<(u8, u8)> for Version {
    fn from((major, minor): (u8, u8)) -> Version {
        Version { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Evlrs, ExtendedPoints, LargeFiles};

    #[test]
    fn supports() {
        assert!(!Version::new(1, 2).supports::<Evlrs>());
        assert!(Version::new(1, 4).supports::<Evlrs>());
        assert!(!Version::new(1, 3).supports::<LargeFiles>());
        assert!(Version::new(1, 4).supports::<ExtendedPoints>());
    }

    #[test]
    fn ordering() {
        assert!(Version::new(1, 2) < Version::new(1, 4));
    }
}
