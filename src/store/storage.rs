// src/store/storage.rs
//
// Where tables live. The store only ever reads a whole file, replaces a whole
// file, or sets an unreadable file aside; anything that can do those three
// things can back it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

pub trait Storage {
    /// Whole-file text. `Ok(None)` means the file does not exist.
    fn read(&self, name: &str) -> io::Result<Option<String>>;

    /// Replace the file. Readers see either the old content or the new one.
    fn write(&self, name: &str, text: &str) -> io::Result<()>;

    /// Move an unreadable file out of the way; returns the new name.
    fn set_aside(&self, name: &str) -> io::Result<String>;

    /// Human-readable location, for logs and errors.
    fn locate(&self, name: &str) -> PathBuf;
}

fn aside_name(name: &str) -> String {
    format!("{name}.unreadable-{}", Utc::now().format("%Y%m%dT%H%M%S"))
}

/// Files under one directory. Writes go to a sibling temp file first and are
/// renamed over the target.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, name: &str, text: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(text.as_bytes())?;
            f.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    fn set_aside(&self, name: &str) -> io::Result<String> {
        let aside = aside_name(name);
        fs::rename(self.dir.join(name), self.dir.join(&aside))?;
        Ok(aside)
    }

    fn locate(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// In-memory files, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemStorage {
    files: RefCell<BTreeMap<String, String>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, text: &str) -> Self {
        self.files.borrow_mut().insert(s!(name), s!(text));
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl Storage for MemStorage {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.get(name))
    }

    fn write(&self, name: &str, text: &str) -> io::Result<()> {
        self.files.borrow_mut().insert(s!(name), s!(text));
        Ok(())
    }

    fn set_aside(&self, name: &str) -> io::Result<String> {
        let mut files = self.files.borrow_mut();
        let text = files
            .remove(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, s!(name)))?;
        let aside = aside_name(name);
        files.insert(aside.clone(), text);
        Ok(aside)
    }

    fn locate(&self, name: &str) -> PathBuf {
        PathBuf::from("mem:").join(name)
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn read(&self, name: &str) -> io::Result<Option<String>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, text: &str) -> io::Result<()> {
        (**self).write(name, text)
    }

    fn set_aside(&self, name: &str) -> io::Result<String> {
        (**self).set_aside(name)
    }

    fn locate(&self, name: &str) -> PathBuf {
        (**self).locate(name)
    }
}
