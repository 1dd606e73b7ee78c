mod command;
mod listing;
mod mode;
mod status;

pub use self::{
    command::{Command, ListMode},
    listing::{parse_date, parse_line, StatEntry},
    mode::{parse_mode, EntryKind, FileMode},
    status::StatusCode,
};
