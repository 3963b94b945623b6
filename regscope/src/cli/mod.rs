pub mod args;

pub use args::{parse_archive_spec, ArchiveSpec, Args, Command, DecodeArgs, ResolveArgs};
