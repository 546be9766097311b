// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Filesystem access used by resolution and loading

use std::io;
use std::path::{Path, PathBuf};

/// Kind of an existing filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// The filesystem operations the module system needs.
///
/// All operations follow symlinks. Implementations must be consistent with
/// each other: a path whose `stat` is `File` must be readable.
pub trait FileSystem: Send + Sync {
    /// Kind of the entry at `path`, or `None` if it does not exist
    fn stat(&self, path: &Path) -> Option<FileKind>;

    /// Read a file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Canonical absolute path with every symlink resolved
    fn realpath(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The host operating system's filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> Option<FileKind> {
        let meta = std::fs::metadata(path).ok()?;
        if meta.is_dir() {
            Some(FileKind::Directory)
        } else {
            Some(FileKind::File)
        }
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}
