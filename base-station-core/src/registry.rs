//! Append-only table of the senders the base station has heard from.
//!
//! Records are stored in first-contact order and are never mutated nor removed. The table has a
//! fixed capacity; once reached, new senders are refused with [RegistryError::RegistryFull].

use std::fmt;

/// Maximum length of a sender name (storage is 20 bytes with a terminator).
pub const MAX_NAME_LEN: usize = 19;

/// Default number of distinct senders a registry can hold.
pub const SENDER_CAPACITY: usize = 20;

/// Stable reference to a record, its index in insertion order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SenderHandle(usize);

impl SenderHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identity of a sender as first received.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SenderRecord {
    name: heapless::Vec<u8, MAX_NAME_LEN>,
}

impl SenderRecord {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn name_len(&self) -> usize {
        self.name.len()
    }

    /// Compares `name` with this record the way `strncmp(stored, name, name.len())` does.
    ///
    /// Only `name.len()` bytes are inspected and a NUL shared by both sides ends the comparison,
    /// so a received name that is a prefix of the stored one matches it.
    fn matches(&self, name: &[u8]) -> bool {
        for (i, &received) in name.iter().enumerate() {
            // Past the stored bytes sits the terminator.
            let stored = self.name.get(i).copied().unwrap_or(0);
            if stored != received {
                return false;
            }
            if stored == 0 {
                return true;
            }
        }
        true
    }
}

impl fmt::Display for SenderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(self.name.len());
        write!(f, "{}", String::from_utf8_lossy(&self.name[..end]))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Sender registry is full ({capacity} senders).")]
    RegistryFull { capacity: usize },

    #[error("Sender name is too long ({len} bytes).")]
    NameTooLong { len: usize },

    #[error("Sender name is empty.")]
    EmptyName,

    #[error("No sender registered at index {index}.")]
    UnknownSender { index: usize },
}

/// Bounded, append-only sender table.
#[derive(Clone, Debug, Default)]
pub struct SenderRegistry<const N: usize = SENDER_CAPACITY> {
    senders: heapless::Vec<SenderRecord, N>,
}

impl<const N: usize> SenderRegistry<N> {
    pub fn new() -> Self {
        Self {
            senders: heapless::Vec::new(),
        }
    }

    /// Looks for the first record (in insertion order) matching `name`.
    pub fn find(&self, name: &[u8]) -> Option<SenderHandle> {
        self.senders
            .iter()
            .position(|record| record.matches(name))
            .map(SenderHandle)
    }

    /// Appends a new sender. Names longer than [MAX_NAME_LEN] are refused, never truncated.
    ///
    /// Like `strncpy`, copying stops at the first NUL and the rest of the record is zero-filled,
    /// the stored length staying the received one.
    pub fn insert(&mut self, name: &[u8]) -> Result<SenderHandle, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.senders.is_full() {
            return Err(RegistryError::RegistryFull { capacity: N });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(RegistryError::NameTooLong { len: name.len() });
        }
        let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
        let name: heapless::Vec<u8, MAX_NAME_LEN> = name[..end]
            .iter()
            .copied()
            .chain(std::iter::repeat(0).take(name.len() - end))
            .collect();
        self.senders
            .push(SenderRecord { name })
            .map_err(|_| RegistryError::RegistryFull { capacity: N })?;
        Ok(SenderHandle(self.senders.len() - 1))
    }

    pub fn get(&self, handle: SenderHandle) -> Option<&SenderRecord> {
        self.senders.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.senders.is_full()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = &SenderRecord> {
        self.senders.iter()
    }
}
