// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! In-memory filesystem for embedding and tests

use crate::host::fs::{FileKind, FileSystem};
use crate::module_system::path::normalize;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, String>,
    dirs: HashSet<PathBuf>,
    links: HashMap<PathBuf, PathBuf>,
}

impl Tree {
    fn add_ancestors(&mut self, path: &Path) {
        for dir in path.ancestors().skip(1) {
            self.dirs.insert(dir.to_path_buf());
        }
    }
}

/// A filesystem held entirely in memory.
///
/// Directories are implied by the files and links added below them. Paths
/// are absolute; relative symlink targets resolve against the link's
/// directory.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    tree: RwLock<Tree>,
}

impl MemoryFileSystem {
    /// Create an empty filesystem containing only `/`
    pub fn new() -> Self {
        let fs = Self::default();
        fs.tree.write().dirs.insert(PathBuf::from("/"));
        fs
    }

    /// Add (or replace) a file
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) -> &Self {
        let path = normalize(path.as_ref());
        let mut tree = self.tree.write();
        tree.add_ancestors(&path);
        tree.files.insert(path, contents.into());
        self
    }

    /// Add an empty directory
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = normalize(path.as_ref());
        let mut tree = self.tree.write();
        tree.add_ancestors(&path);
        tree.dirs.insert(path);
        self
    }

    /// Add a symlink at `link` pointing to `target`
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) -> &Self {
        let link = normalize(link.as_ref());
        let mut tree = self.tree.write();
        tree.add_ancestors(&link);
        tree.links.insert(link, target.as_ref().to_path_buf());
        self
    }

    /// Remove a file, returning whether it existed
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path.as_ref());
        self.tree.write().files.remove(&path).is_some()
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let tree = self.tree.read();
        let mut pending = normalize(path);
        let mut hops = 0;

        'restart: loop {
            let names: Vec<_> = pending
                .components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(name) => Some(name.to_os_string()),
                    _ => None,
                })
                .collect();
            let mut current = PathBuf::from("/");

            for (i, name) in names.iter().enumerate() {
                let next = current.join(name);
                if let Some(target) = tree.links.get(&next) {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            format!("ELOOP: too many symbolic links, '{}'", path.display()),
                        ));
                    }
                    let mut resolved = if target.is_absolute() {
                        target.clone()
                    } else {
                        current.join(target)
                    };
                    for rest in &names[i + 1..] {
                        resolved.push(rest);
                    }
                    pending = normalize(&resolved);
                    continue 'restart;
                }
                current = next;
            }
            return Ok(current);
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("ENOENT: no such file or directory, '{}'", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    fn stat(&self, path: &Path) -> Option<FileKind> {
        let resolved = self.resolve(path).ok()?;
        let tree = self.tree.read();
        if tree.files.contains_key(&resolved) {
            Some(FileKind::File)
        } else if tree.dirs.contains(&resolved) {
            Some(FileKind::Directory)
        } else {
            None
        }
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let resolved = self.resolve(path)?;
        let tree = self.tree.read();
        match tree.files.get(&resolved) {
            Some(contents) => Ok(contents.clone()),
            None if tree.dirs.contains(&resolved) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("EISDIR: illegal operation on a directory, read '{}'", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn realpath(&self, path: &Path) -> io::Result<PathBuf> {
        let resolved = self.resolve(path)?;
        if self.stat(&resolved).is_some() {
            Ok(resolved)
        } else {
            Err(not_found(path))
        }
    }
}
