//! Target name derivation
//!
//! Works out where an upload should land before it is turned into a storage
//! key. Paths are handled as plain strings since the result addresses an
//! object store, not the local filesystem. Both `/` and `\` count as
//! separators.

use super::UploadedFile;
use serde::{Deserialize, Serialize};

/// Naming options of the upload filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOptions {
    /// Target file or directory. Unset or `*` keeps the temp file path. A
    /// trailing separator marks a directory.
    #[serde(default)]
    pub target: Option<String>,
    /// Use the client-supplied file name
    #[serde(default)]
    pub use_upload_name: bool,
    /// Keep the extension of the client-supplied file name
    #[serde(default)]
    pub use_upload_extension: bool,
    /// Replace an existing object at the target
    #[serde(default)]
    pub overwrite: bool,
    /// Append a random suffix to the file name
    #[serde(default)]
    pub randomize: bool,
}

impl RenameOptions {
    /// Derive the target path for `upload`.
    ///
    /// The result always has a directory part, `./` when the target has
    /// none, so it still needs normalizing into a key.
    pub fn derive_target(&self, upload: &UploadedFile) -> String {
        let source = upload.tmp_name.to_string_lossy();
        let target = match self.target.as_deref() {
            None | Some("") | Some("*") => source.as_ref(),
            Some(target) => target,
        };

        let target_is_dir = is_dir(target);
        let target_dir = if target_is_dir {
            target.to_string()
        } else {
            format!("{}/", dirname(target))
        };

        let mut target_file = if self.use_upload_name {
            basename(&upload.name).to_string()
        } else if !target_is_dir {
            let file = basename(target);
            match extension(&upload.name) {
                Some(ext) if self.use_upload_extension && !self.randomize => {
                    format!("{}.{}", stem(file), ext)
                }
                _ => file.to_string(),
            }
        } else {
            basename(&source).to_string()
        };

        if self.randomize {
            target_file = self.randomize_name(&upload.name, &target_file);
        }

        format!("{}{}", target_dir, target_file)
    }

    /// `<stem>_<32 hex chars>[.<ext>]`
    fn randomize_name(&self, upload_name: &str, file: &str) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let ext = if self.use_upload_extension {
            extension(upload_name).or_else(|| extension(file))
        } else {
            extension(file)
        };

        match ext {
            Some(ext) => format!("{}_{}.{}", stem(file), suffix, ext),
            None => format!("{}_{}", stem(file), suffix),
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn is_dir(path: &str) -> bool {
    path.ends_with(is_separator)
}

/// Last path component
fn basename(path: &str) -> &str {
    let path = path.trim_end_matches(is_separator);
    match path.rfind(is_separator) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Everything before the last component, `.` when there is none
fn dirname(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(0) => "",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn split_extension(file: &str) -> (&str, Option<&str>) {
    match file.rfind('.') {
        Some(idx) if idx + 1 < file.len() => (&file[..idx], Some(&file[idx + 1..])),
        Some(idx) => (&file[..idx], None),
        None => (file, None),
    }
}

fn stem(file: &str) -> &str {
    split_extension(basename(file)).0
}

fn extension(path: &str) -> Option<&str> {
    split_extension(basename(path)).1
}
