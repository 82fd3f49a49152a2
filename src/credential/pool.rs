//! File-backed credential pool.
//!
//! The pool file is the only shared mutable resource: a JSON mapping of
//! identity → credential, read under a shared advisory lock and rewritten
//! under an exclusive one. Snapshots are point-in-time; a reader sees either
//! the pre- or post-state of a concurrent writer, never a partial file.

use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Access, Credential, Scope};
use crate::error::PoolError;
use crate::utils::clock::{SharedClock, system_clock};

/// Durable ordered credential pool with per-scope current selections.
///
/// `current` is per-instance state; the file may be shared by other
/// processes, each with their own selections.
pub struct PoolStore {
    path: PathBuf,
    clock: SharedClock,
    current: HashMap<Scope, Credential>,
}

impl PoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, system_clock())
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: SharedClock) -> Self {
        Self {
            path: path.into(),
            clock,
            current: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace (`purge = true`) or merge the given credentials into the file.
    ///
    /// Merging never overwrites an existing entry: re-registering a known
    /// token must not clobber its persisted reset state.
    pub fn set_tokens(&self, credentials: &[Credential], purge: bool) -> Result<(), PoolError> {
        if purge {
            self.with_exclusive(|_| dedupe_last_wins(credentials))
        } else {
            self.with_exclusive(|existing| merged(existing, credentials, false))
        }
    }

    /// Point-in-time snapshot in insertion order, anonymous credential last.
    pub fn get_tokens(&self) -> Result<Vec<Credential>, PoolError> {
        self.read_snapshot()
    }

    /// Pick the credential to use for `scope`: the first allowed one in
    /// iteration order, else the one with the smallest positive wait. The
    /// choice is remembered as the scope's current credential.
    pub fn get_token(&mut self, scope: Scope) -> Result<Credential, PoolError> {
        let snapshot = self.read_snapshot()?;
        if snapshot.is_empty() {
            return Err(PoolError::Empty);
        }
        let now = self.clock.epoch();
        let chosen = match snapshot
            .iter()
            .find(|cred| cred.can_access(scope, now).is_allowed())
        {
            Some(allowed) => allowed.clone(),
            None => snapshot
                .iter()
                .min_by_key(|cred| cred.can_access(scope, now).wait())
                .cloned()
                .ok_or(PoolError::Empty)?,
        };
        debug!(identity = %chosen.short_identity(), %scope, "selected pool credential");
        self.current.insert(scope, chosen.clone());
        Ok(chosen)
    }

    /// The credential last selected for `scope` by this instance, if any.
    pub fn current(&self, scope: Scope) -> Option<&Credential> {
        self.current.get(&scope)
    }

    /// Stamp the scope's current credential with `reset`, persist it, and
    /// select again. Requires a prior [`get_token`](Self::get_token) and a
    /// reset strictly in the future.
    pub fn next_token(&mut self, scope: Scope, reset: i64) -> Result<Credential, PoolError> {
        let now = self.clock.epoch();
        if reset <= now {
            return Err(PoolError::BadReset { reset, now });
        }
        let Some(current) = self.current.get_mut(&scope) else {
            return Err(PoolError::NoCurrent { scope });
        };
        current.set_reset(scope, reset);
        let stamped = [current.clone()];
        self.with_exclusive(|existing| merged(existing, &stamped, true))?;
        self.get_token(scope)
    }

    fn read_snapshot(&self) -> Result<Vec<Credential>, PoolError> {
        let contents = match File::open(&self.path) {
            Ok(mut file) => {
                file.lock_shared()?;
                let mut buf = String::new();
                let read = file.read_to_string(&mut buf);
                file.unlock()?;
                read?;
                buf
            }
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let mut credentials = parse_pool(&self.path, &contents)?;
        push_back_anonymous(&mut credentials);
        Ok(credentials)
    }

    /// Read-modify-write under one exclusive lock.
    fn with_exclusive<F>(&self, mutate: F) -> Result<(), PoolError>
    where
        F: FnOnce(Vec<Credential>) -> Vec<Credential>,
    {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let outcome = Self::locked_rewrite(&mut file, &self.path, mutate);
        file.unlock()?;
        outcome
    }

    fn locked_rewrite<F>(file: &mut File, path: &Path, mutate: F) -> Result<(), PoolError>
    where
        F: FnOnce(Vec<Credential>) -> Vec<Credential>,
    {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut credentials = parse_pool(path, &contents)?;
        push_back_anonymous(&mut credentials);
        let next = mutate(credentials);
        let payload = render_pool(&next)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

fn parse_pool(path: &Path, contents: &str) -> Result<Vec<Credential>, PoolError> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    let corrupt = |reason: String| PoolError::Corrupt {
        path: path.display().to_string(),
        reason,
    };
    let top: Value =
        serde_json::from_str(contents).map_err(|err| corrupt(err.to_string()))?;
    let Value::Object(entries) = top else {
        return Err(corrupt(
            "expected a credential mapping at the top level".to_string(),
        ));
    };
    let mut credentials: Vec<Credential> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (key, entry) in entries {
        let credential: Credential = serde_json::from_value(entry)
            .map_err(|err| corrupt(format!("entry {key:?} is not a credential: {err}")))?;
        // The credential content is authoritative for identity, not the key.
        let identity = credential.identity();
        match positions.get(&identity) {
            Some(&at) => credentials[at] = credential,
            None => {
                positions.insert(identity, credentials.len());
                credentials.push(credential);
            }
        }
    }
    Ok(credentials)
}

fn render_pool(credentials: &[Credential]) -> Result<String, PoolError> {
    let mut entries = Map::with_capacity(credentials.len());
    for credential in credentials {
        entries.insert(credential.identity(), serde_json::to_value(credential)?);
    }
    Ok(serde_json::to_string_pretty(&Value::Object(entries))?)
}

/// Anonymous credentials iterate after all others.
fn push_back_anonymous(credentials: &mut Vec<Credential>) {
    if let Some(at) = credentials.iter().position(Credential::is_anonymous) {
        let anonymous = credentials.remove(at);
        credentials.push(anonymous);
    }
}

fn dedupe_last_wins(credentials: &[Credential]) -> Vec<Credential> {
    let mut out: Vec<Credential> = Vec::with_capacity(credentials.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for credential in credentials {
        let identity = credential.identity();
        match positions.get(&identity) {
            Some(&at) => out[at] = credential.clone(),
            None => {
                positions.insert(identity, out.len());
                out.push(credential.clone());
            }
        }
    }
    out
}

fn merged(
    existing: Vec<Credential>,
    incoming: &[Credential],
    overwrite: bool,
) -> Vec<Credential> {
    let mut out = existing;
    let mut positions: HashMap<String, usize> = out
        .iter()
        .enumerate()
        .map(|(at, cred)| (cred.identity(), at))
        .collect();
    for credential in incoming {
        let identity = credential.identity();
        match positions.get(&identity) {
            Some(&at) => {
                if overwrite {
                    out[at] = credential.clone();
                }
            }
            None => {
                positions.insert(identity, out.len());
                out.push(credential.clone());
            }
        }
    }
    out
}
