use std::collections::VecDeque;

/// Iterator over the names in a remote directory, `.` and `..` excluded.
#[derive(Debug)]
pub struct ReadDir {
    pub(crate) entries: VecDeque<String>,
}

impl ReadDir {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        Self {
            entries: lines
                .into_iter()
                .map(|line| line.trim_end_matches(['\r', '\n']).to_owned())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

impl Iterator for ReadDir {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        match self.entries.pop_front() {
            None => None,
            Some(name) if name == "." || name == ".." => self.next(),
            Some(name) => Some(name),
        }
    }
}
