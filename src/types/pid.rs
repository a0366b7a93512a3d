//! Persistent identifiers
//!
//! PIDs are signed 64-bit identifiers that stay stable across edits and
//! file round-trips. They are unique within one model and never reused.

use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// A persistent identifier for an entity
///
/// PID 0 is reserved as the invalid sentinel and is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistentId(i64);

impl PersistentId {
    /// The null/invalid PID (0)
    pub const NULL: PersistentId = PersistentId(0);

    /// Create a PID from a raw value
    #[inline]
    pub const fn new(value: i64) -> Self {
        PersistentId(value)
    }

    /// Get the raw i64 value
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Check if this is the null/invalid PID
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Check if this PID may refer to an entity
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Default for PersistentId {
    fn default() -> Self {
        PersistentId::NULL
    }
}

impl From<i64> for PersistentId {
    fn from(value: i64) -> Self {
        PersistentId(value)
    }
}

impl From<PersistentId> for i64 {
    fn from(pid: PersistentId) -> Self {
        pid.0
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Separator between the PIDs of a path string
pub const PID_PATH_SEPARATOR: char = '.';

/// A chain of PIDs from the outermost instance down to a leaf entity,
/// as exchanged with external callers (`"12.40.77"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PidPath(Vec<PersistentId>);

impl PidPath {
    /// Create a path from its PIDs
    pub fn new(pids: Vec<PersistentId>) -> Self {
        PidPath(pids)
    }

    /// PIDs from outermost to innermost
    pub fn pids(&self) -> &[PersistentId] {
        &self.0
    }

    /// Number of PIDs in the path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PidPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ModelError::InvalidInput("empty persistent id path".into()));
        }
        let mut pids = Vec::new();
        for segment in s.split(PID_PATH_SEPARATOR) {
            let value: i64 = segment.trim().parse().map_err(|_| {
                ModelError::InvalidInput(format!("invalid persistent id '{segment}' in '{s}'"))
            })?;
            let pid = PersistentId::new(value);
            if !pid.is_valid() {
                return Err(ModelError::InvalidInput(format!(
                    "persistent id {value} in '{s}' is not a valid id"
                )));
            }
            pids.push(pid);
        }
        Ok(PidPath(pids))
    }
}

impl fmt::Display for PidPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pid) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{PID_PATH_SEPARATOR}")?;
            }
            write!(f, "{pid}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pid() {
        let null = PersistentId::NULL;
        assert!(null.is_null());
        assert!(!null.is_valid());
        assert!(!PersistentId::new(-4).is_valid());
    }

    #[test]
    fn test_pid_ordering() {
        assert!(PersistentId::new(100) < PersistentId::new(200));
    }

    #[test]
    fn test_pid_path_parse_and_display() {
        let path: PidPath = "12.40.77".parse().unwrap();
        assert_eq!(
            path.pids(),
            &[
                PersistentId::new(12),
                PersistentId::new(40),
                PersistentId::new(77)
            ]
        );
        assert_eq!(path.to_string(), "12.40.77");
    }

    #[test]
    fn test_pid_path_rejects_garbage() {
        assert!("".parse::<PidPath>().is_err());
        assert!("12..4".parse::<PidPath>().is_err());
        assert!("12.x".parse::<PidPath>().is_err());
        assert!("0".parse::<PidPath>().is_err());
    }
}
