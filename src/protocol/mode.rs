use serde::{Deserialize, Serialize};

use crate::error::{Error, SftpResult};

/// Object type and permission bits of a listed entry, laid out like `st_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileMode(u32);

bitflags! {
    impl FileMode: u32 {
        const DIR = 0x4000;
        const REG = 0x8000;
        const LNK = 0xA000;
        const TYPE_MASK = 0xF000;
        const PERMISSIONS = 0o777;
    }
}

/// The three object kinds a listing can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl FileMode {
    /// Returns the object kind encoded in the type nibble, if it is one we know
    #[must_use]
    pub fn kind(self) -> Option<EntryKind> {
        match self.bits() & Self::TYPE_MASK.bits() {
            bits if bits == Self::DIR.bits() => Some(EntryKind::Directory),
            bits if bits == Self::REG.bits() => Some(EntryKind::File),
            bits if bits == Self::LNK.bits() => Some(EntryKind::Symlink),
            _ => None,
        }
    }

    /// Permission triples only, e.g. `0o755`
    #[must_use]
    pub fn permissions(self) -> u32 {
        self.bits() & Self::PERMISSIONS.bits()
    }
}

/// Parses the 10 character mode column of a long listing (`drwxr-xr-x`).
///
/// The first character selects the type: `d` is a directory, `l` a symlink and
/// anything else a regular file. In each of the three permission triples every
/// character other than `-` sets the bit for its position, so `rwx`, `rws` and
/// `xxx` all read as `7`.
pub fn parse_mode(field: &str) -> SftpResult<FileMode> {
    let chars: Vec<char> = field.chars().collect();
    if chars.len() != 10 {
        return Err(Error::parse(
            field,
            format!("mode field must be 10 characters, got {}", chars.len()),
        ));
    }

    let mut mode = match chars[0] {
        'd' => FileMode::DIR,
        'l' => FileMode::LNK,
        _ => FileMode::REG,
    }
    .bits();

    for (shift, triple) in [6, 3, 0].into_iter().zip(chars[1..].chunks(3)) {
        let value = triple
            .iter()
            .zip([4, 2, 1])
            .filter(|(c, _)| **c != '-')
            .map(|(_, bit)| bit)
            .sum::<u32>();
        mode |= value << shift;
    }

    Ok(FileMode::from_bits_retain(mode))
}
