//! Error types for the error-checked allocation API.

use std::str::FromStr;

/// Errors reported by [`crate::allocate`].
///
/// Raw policies never produce these: they signal failure by returning an
/// empty [`crate::Block`], and the generic API translates that sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AllocatorError {
  /// The caller asked for a negative number of bytes.
  #[error("invalid allocation size")]
  InvalidSize,

  /// The policy could not satisfy the request (pool exhausted, heap failure).
  #[error("allocation failed for an unknown reason")]
  Unknown,
}

impl AllocatorError {
  /// Tag name of the error: `invalid_size` or `unknown`.
  pub const fn name(&self) -> &'static str {
    match self {
      Self::InvalidSize => "invalid_size",
      Self::Unknown => "unknown",
    }
  }
}

impl FromStr for AllocatorError {
  type Err = UnknownTag;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "invalid_size" => Ok(Self::InvalidSize),
      "unknown" => Ok(Self::Unknown),
      other => Err(UnknownTag(other.to_owned())),
    }
  }
}

/// A string that does not name any [`AllocatorError`] tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no allocator error named `{0}`")]
pub struct UnknownTag(pub String);

/// The typed adapter could not obtain memory for the requested elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("memory allocation failed")]
pub struct AllocError;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_names_round_trip() {
    for error in [AllocatorError::InvalidSize, AllocatorError::Unknown] {
      assert_eq!(error.name().parse::<AllocatorError>(), Ok(error));
    }
  }

  #[test]
  fn test_unknown_tag() {
    let err = "out_of_memory".parse::<AllocatorError>().unwrap_err();
    assert_eq!(err.to_string(), "no allocator error named `out_of_memory`");
  }

  #[test]
  fn test_display() {
    assert_eq!(AllocatorError::InvalidSize.to_string(), "invalid allocation size");
    assert_eq!(AllocError.to_string(), "memory allocation failed");
  }
}
