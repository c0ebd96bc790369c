//! Random avatar selection from a local directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::parameters::FilePart;

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Cannot read avatar directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Avatar directory {} contains no files", .path.display())]
    Empty { path: PathBuf },
    #[error("Cannot read avatar {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Media type label derived from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// A selected image, loaded into memory.
#[derive(Clone)]
pub struct Avatar {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub media_type: &'static str,
}

impl Avatar {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.content)
    }

    pub fn to_file_part(&self, name: &str) -> FilePart {
        FilePart::new(name, self.file_name(), self.media_type, self.content.clone())
    }
}

impl std::fmt::Debug for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Avatar")
            .field("path", &self.path)
            .field("media_type", &self.media_type)
            .field("len", &self.content.len())
            .finish()
    }
}

/// A directory of candidate avatars.
#[derive(Clone, Debug)]
pub struct AvatarSource {
    dir: PathBuf,
}

impl AvatarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        AvatarSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Regular files in the directory, sorted by path.
    pub fn candidates(&self) -> Result<Vec<PathBuf>, AvatarError> {
        let read_dir_err = |source: io::Error| AvatarError::ReadDir {
            path: self.dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            if entry.file_type().map_err(read_dir_err)?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn pick(&self) -> Result<Avatar, AvatarError> {
        self.pick_with(&mut rand::rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Avatar, AvatarError> {
        let candidates = self.candidates()?;
        let path = candidates.choose(rng).ok_or_else(|| AvatarError::Empty {
            path: self.dir.clone(),
        })?;
        let content = fs::read(path).map_err(|source| AvatarError::ReadFile {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(avatar = %path.display(), bytes = content.len(), "selected avatar");

        Ok(Avatar {
            media_type: media_type_for(path),
            path: path.clone(),
            content,
        })
    }
}
