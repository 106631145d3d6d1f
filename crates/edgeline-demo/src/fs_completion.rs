//! Filesystem-backed completion source for the demo shell. Not part of the
//! core's public contract — the core only ever sees the `CompletionSource`
//! trait it defines.

use edgeline_completion::{Candidate, CompletionKind, CompletionSource};
use std::path::Path;

const BUILTIN_COMMANDS: &[&str] = &["cd", "exit", "help", "history", "clear"];

pub struct FsCompletionSource;

impl FsCompletionSource {
    fn list_dir_matches(prefix: &str) -> Vec<Candidate> {
        let (dir_part, file_prefix) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };
        let search_dir = if dir_part.is_empty() { "." } else { dir_part };
        let entries = match std::fs::read_dir(search_dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(file_prefix) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let mut text = format!("{dir_part}{name}");
            if is_dir {
                text.push('/');
            }
            out.push(Candidate { text, is_dir });
        }
        out
    }

    fn list_env_vars(prefix: &str) -> Vec<Candidate> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| Candidate { text: k, is_dir: false })
            .collect()
    }

    fn list_commands(prefix: &str) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = BUILTIN_COMMANDS
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| Candidate { text: c.to_string(), is_dir: false })
            .collect();

        if let Some(path) = std::env::var_os("PATH") {
            for dir in std::env::split_paths(&path) {
                let entries = match std::fs::read_dir(&dir) {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with(prefix) && is_executable(&entry.path()) {
                        out.push(Candidate { text: name, is_dir: false });
                    }
                }
            }
        }
        out
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

impl CompletionSource for FsCompletionSource {
    fn complete(&self, kind: CompletionKind, prefix: &str) -> Vec<Candidate> {
        match kind {
            CompletionKind::File | CompletionKind::Path => Self::list_dir_matches(prefix),
            CompletionKind::Variable => Self::list_env_vars(prefix),
            CompletionKind::Command => Self::list_commands(prefix),
        }
    }
}
