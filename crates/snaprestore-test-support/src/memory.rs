//! In-memory [`VolumeFs`] with link semantics, failure injection, and a call log.
//!
//! Paths are keyed by their components with both `/` and `\` treated as
//! separators, so Windows-style inputs such as `\\?\Volume{GUID}\` or
//! `C:\Mnt` behave the same on every host.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use snaprestore_fsops::{DirEntry, EntryKind, VolumeFs};

const MAX_LINK_HOPS: usize = 32;

/// Operation names recorded in the call log and targeted by failure rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    /// [`VolumeFs::probe`].
    Probe,
    /// [`VolumeFs::create_dir_link`].
    CreateDirLink,
    /// [`VolumeFs::remove_dir`].
    RemoveDir,
    /// [`VolumeFs::remove_file`].
    RemoveFile,
    /// [`VolumeFs::read_dir`].
    ReadDir,
    /// [`VolumeFs::create_dir`].
    CreateDir,
    /// [`VolumeFs::copy_file`]; matched against the source path.
    CopyFile,
    /// [`VolumeFs::available_space`].
    AvailableSpace,
}

/// A single recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsCall {
    /// Operation invoked.
    pub op: FsOp,
    /// Normalized key of the primary path argument.
    pub path: String,
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Link(String),
}

#[derive(Debug)]
struct FailureRule {
    op: FsOp,
    path: String,
    kind: io::ErrorKind,
    remaining: Option<u32>,
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<String, Node>,
    failures: Vec<FailureRule>,
    calls: Vec<FsCall>,
    available: u64,
}

/// In-memory filesystem fake.
#[derive(Debug)]
pub struct MemoryFs {
    state: Mutex<State>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a path into the fake's key form: components joined by `/`.
#[must_use]
pub fn key_of(path: &Path) -> String {
    key_of_str(&path.to_string_lossy())
}

fn key_of_str(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_key(key: &str) -> &str {
    key.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn name_of(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("'{key}' does not exist"))
}

impl State {
    fn resolve(&self, key: &str, follow_last: bool) -> io::Result<String> {
        let mut pending: VecDeque<String> = key
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect();
        let mut current: Vec<String> = Vec::new();
        let mut hops = 0;
        while let Some(part) = pending.pop_front() {
            current.push(part);
            let joined = current.join("/");
            let is_last = pending.is_empty();
            if let Some(Node::Link(target)) = self.nodes.get(&joined) {
                if is_last && !follow_last {
                    continue;
                }
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(io::Error::other(format!("too many links resolving '{key}'")));
                }
                let mut rewritten: VecDeque<String> = target
                    .split('/')
                    .filter(|part| !part.is_empty())
                    .map(str::to_owned)
                    .collect();
                rewritten.extend(pending.drain(..));
                pending = rewritten;
                current.clear();
            }
        }
        Ok(current.join("/"))
    }

    fn is_dir(&self, key: &str) -> bool {
        key.is_empty() || matches!(self.nodes.get(key), Some(Node::Dir))
    }

    fn require_parent_dir(&self, key: &str) -> io::Result<()> {
        let parent = self.resolve(parent_key(key), true)?;
        if self.is_dir(&parent) {
            Ok(())
        } else {
            Err(not_found(parent_key(key)))
        }
    }

    fn children(&self, dir: &str) -> impl Iterator<Item = (&String, &Node)> {
        let dir = dir.to_owned();
        self.nodes
            .iter()
            .filter(move |(key, _)| !key.is_empty() && parent_key(key) == dir)
    }

    fn has_children(&self, dir: &str) -> bool {
        self.children(dir).next().is_some()
    }

    fn classify(&self, key: &str, node: &Node) -> (EntryKind, u64) {
        match node {
            Node::Dir => (EntryKind::Directory, 0),
            Node::File(data) => (EntryKind::File, data.len() as u64),
            Node::Link(_) => match self
                .resolve(key, true)
                .ok()
                .and_then(|resolved| self.nodes.get(&resolved))
            {
                Some(Node::Dir) => (EntryKind::Directory, 0),
                Some(Node::File(data)) => (EntryKind::File, data.len() as u64),
                Some(Node::Link(_)) | None => (EntryKind::File, 0),
            },
        }
    }

    fn insert_ancestors(&mut self, key: &str) {
        let mut prefix = String::new();
        for part in parent_key(key).split('/').filter(|part| !part.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            self.nodes.entry(prefix.clone()).or_insert(Node::Dir);
        }
    }

    fn record(&mut self, op: FsOp, key: &str) -> io::Result<()> {
        self.calls.push(FsCall {
            op,
            path: key.to_owned(),
        });
        let Some(rule) = self
            .failures
            .iter_mut()
            .find(|rule| rule.op == op && rule.path == key && rule.remaining != Some(0))
        else {
            return Ok(());
        };
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }
        Err(io::Error::new(
            rule.kind,
            format!("injected {op:?} failure at '{key}'"),
        ))
    }
}

impl MemoryFs {
    /// Empty filesystem with unlimited free space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                nodes: BTreeMap::new(),
                failures: Vec::new(),
                calls: Vec::new(),
                available: u64::MAX,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let key = key_of(path.as_ref());
        let mut state = self.lock();
        state.insert_ancestors(&key);
        if !key.is_empty() {
            state.nodes.insert(key, Node::Dir);
        }
    }

    /// Create a file with `content`, creating missing ancestors.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let key = key_of(path.as_ref());
        let mut state = self.lock();
        state.insert_ancestors(&key);
        state.nodes.insert(key, Node::File(content.into()));
    }

    /// Create a link at `link` pointing at `target`, creating missing ancestors of `link`.
    pub fn add_link(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let key = key_of(link.as_ref());
        let mut state = self.lock();
        state.insert_ancestors(&key);
        state.nodes.insert(key, Node::Link(key_of(target.as_ref())));
    }

    /// Fail every call of `op` on `path` with `kind`.
    pub fn fail_always(&self, op: FsOp, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.push_rule(op, path.as_ref(), kind, None);
    }

    /// Fail the next `times` calls of `op` on `path` with `kind`.
    pub fn fail_times(
        &self,
        op: FsOp,
        path: impl AsRef<Path>,
        kind: io::ErrorKind,
        times: u32,
    ) {
        self.push_rule(op, path.as_ref(), kind, Some(times));
    }

    fn push_rule(&self, op: FsOp, path: &Path, kind: io::ErrorKind, remaining: Option<u32>) {
        self.lock().failures.push(FailureRule {
            op,
            path: key_of(path),
            kind,
            remaining,
        });
    }

    /// Set the value reported by [`VolumeFs::available_space`].
    pub fn set_available_space(&self, bytes: u64) {
        self.lock().available = bytes;
    }

    /// Calls made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<FsCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of `op` made so far.
    #[must_use]
    pub fn count(&self, op: FsOp) -> usize {
        self.lock().calls.iter().filter(|call| call.op == op).count()
    }

    /// Kind of the node at `path` without following a trailing link.
    #[must_use]
    pub fn kind(&self, path: impl AsRef<Path>) -> Option<EntryKind> {
        let state = self.lock();
        let resolved = state.resolve(&key_of(path.as_ref()), false).ok()?;
        if resolved.is_empty() {
            return Some(EntryKind::Directory);
        }
        state.nodes.get(&resolved).map(|node| match node {
            Node::Dir => EntryKind::Directory,
            Node::File(_) => EntryKind::File,
            Node::Link(_) => EntryKind::Link,
        })
    }

    /// Target key of the link at `path`, if `path` is a link.
    #[must_use]
    pub fn link_target(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.lock().nodes.get(&key_of(path.as_ref())) {
            Some(Node::Link(target)) => Some(target.clone()),
            _ => None,
        }
    }

    /// Content of the file at `path`, following links.
    #[must_use]
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let state = self.lock();
        let resolved = state.resolve(&key_of(path.as_ref()), true).ok()?;
        match state.nodes.get(&resolved) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Keys below `root` relative to it, sorted; directories end with `/`.
    ///
    /// Links below `root` are listed but not followed.
    #[must_use]
    pub fn tree(&self, root: impl AsRef<Path>) -> Vec<String> {
        let state = self.lock();
        let Ok(base) = state.resolve(&key_of(root.as_ref()), true) else {
            return Vec::new();
        };
        let prefix = if base.is_empty() {
            String::new()
        } else {
            format!("{base}/")
        };
        let mut keys: Vec<String> = state
            .nodes
            .iter()
            .filter_map(|(key, node)| {
                let relative = key.strip_prefix(&prefix)?;
                if relative.is_empty() {
                    return None;
                }
                Some(match node {
                    Node::Dir => format!("{relative}/"),
                    Node::File(_) | Node::Link(_) => relative.to_owned(),
                })
            })
            .collect();
        keys.sort();
        keys
    }
}

impl VolumeFs for MemoryFs {
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::Probe, &key)?;
        let resolved = state.resolve(&key, false)?;
        if resolved.is_empty() {
            return Ok(Some(EntryKind::Directory));
        }
        Ok(state.nodes.get(&resolved).map(|node| match node {
            Node::Dir => EntryKind::Directory,
            Node::File(_) => EntryKind::File,
            Node::Link(_) => EntryKind::Link,
        }))
    }

    fn create_dir_link(&self, link: &Path, target: &Path) -> io::Result<()> {
        let key = key_of(link);
        let mut state = self.lock();
        state.record(FsOp::CreateDirLink, &key)?;
        let resolved = state.resolve(&key, false)?;
        if state.nodes.contains_key(&resolved) || resolved.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{key}' already exists"),
            ));
        }
        state.require_parent_dir(&resolved)?;
        state.nodes.insert(resolved, Node::Link(key_of(target)));
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::RemoveDir, &key)?;
        let resolved = state.resolve(&key, false)?;
        match state.nodes.get(&resolved) {
            None => Err(not_found(&key)),
            Some(Node::File(_) | Node::Link(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("'{key}' is not a directory"),
            )),
            Some(Node::Dir) if state.has_children(&resolved) => Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("'{key}' is not empty"),
            )),
            Some(Node::Dir) => {
                state.nodes.remove(&resolved);
                Ok(())
            }
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::RemoveFile, &key)?;
        let resolved = state.resolve(&key, false)?;
        match state.nodes.get(&resolved) {
            None => Err(not_found(&key)),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("'{key}' is a directory"),
            )),
            Some(Node::File(_) | Node::Link(_)) => {
                state.nodes.remove(&resolved);
                Ok(())
            }
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::ReadDir, &key)?;
        let resolved = state.resolve(&key, true)?;
        if !state.is_dir(&resolved) {
            return Err(if state.nodes.contains_key(&resolved) {
                io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("'{key}' is not a directory"),
                )
            } else {
                not_found(&key)
            });
        }
        let mut entries: Vec<DirEntry> = [".", ".."]
            .into_iter()
            .map(|name| DirEntry {
                name: name.into(),
                kind: EntryKind::Directory,
                len: 0,
            })
            .collect();
        for (child, node) in state.children(&resolved) {
            let (kind, len) = state.classify(child, node);
            entries.push(DirEntry {
                name: name_of(child).into(),
                kind,
                len,
            });
        }
        Ok(entries)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::CreateDir, &key)?;
        let resolved = state.resolve(&key, false)?;
        if resolved.is_empty() || state.nodes.contains_key(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{key}' already exists"),
            ));
        }
        state.require_parent_dir(&resolved)?;
        state.nodes.insert(resolved, Node::Dir);
        Ok(())
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<u64> {
        let key = key_of(source);
        let destination_key = key_of(destination);
        let mut state = self.lock();
        state.record(FsOp::CopyFile, &key)?;
        let from = state.resolve(&key, true)?;
        let data = match state.nodes.get(&from) {
            Some(Node::File(data)) => data.clone(),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("'{key}' is not a file"),
                ));
            }
            None => return Err(not_found(&key)),
        };
        let to = state.resolve(&destination_key, true)?;
        if state.is_dir(&to) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("'{destination_key}' is a directory"),
            ));
        }
        state.require_parent_dir(&to)?;
        let len = data.len() as u64;
        state.nodes.insert(to, Node::File(data));
        Ok(len)
    }

    fn available_space(&self, path: &Path) -> io::Result<u64> {
        let key = key_of(path);
        let mut state = self.lock();
        state.record(FsOp::AvailableSpace, &key)?;
        Ok(state.available)
    }
}
