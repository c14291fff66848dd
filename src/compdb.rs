//! Compile-argument resolution from a compilation database directory.
//!
//! Headers have no compile commands of their own; the lookup targets the
//! header's same-stem `.cpp` sibling and the raw argument vector is filtered
//! down to what the front end should see.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Flags never forwarded to the front end.
const SKIPPED: &[&str] = &["-c", "-Werror"];

#[derive(Debug, Error)]
pub enum CompDbError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed compilation database {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no compile command for {} in {}", file.display(), db.display())]
    MissingEntry { file: PathBuf, db: PathBuf },
}

/// One `compile_commands.json` entry. Generators emit either the split
/// `arguments` array or a single `command` string.
#[derive(Debug, Deserialize)]
struct CompileCommand {
    file: PathBuf,
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

impl CompileCommand {
    /// The entry's source file, resolved against its build directory.
    fn resolved_file(&self) -> PathBuf {
        match &self.directory {
            Some(dir) if self.file.is_relative() => dir.join(&self.file),
            _ => self.file.clone(),
        }
    }

    fn argument_vector(&self) -> Option<Vec<String>> {
        if let Some(arguments) = &self.arguments {
            return Some(arguments.clone());
        }
        self.command
            .as_ref()
            .map(|command| command.split_whitespace().map(str::to_owned).collect())
    }
}

pub struct CompilationDatabase {
    path: PathBuf,
    commands: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load `compile_commands.json` from `dir`.
    pub fn from_directory(dir: &Path) -> Result<Self, CompDbError> {
        let path = dir.join("compile_commands.json");
        let raw = fs::read_to_string(&path).map_err(|source| CompDbError::Read {
            path: path.clone(),
            source,
        })?;
        let commands: Vec<CompileCommand> =
            serde_json::from_str(&raw).map_err(|source| CompDbError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(
            "loaded {} compile commands from {}",
            commands.len(),
            path.display()
        );
        Ok(Self { path, commands })
    }

    /// Compile arguments for `header`, filtered per the front-end contract:
    /// the first command recorded for the `.cpp` sibling, minus the program
    /// name, `-c`/`-Werror`, the file paths themselves and `-Xclang` pairs,
    /// plus the forced C++ mode and prefix header.
    pub fn arguments_for(&self, header: &Path) -> Result<Vec<String>, CompDbError> {
        let sibling = header.with_extension("cpp");
        let raw = self
            .raw_arguments(&sibling)
            .ok_or_else(|| CompDbError::MissingEntry {
                file: sibling.clone(),
                db: self.path.clone(),
            })?;
        let filtered = filter_arguments(raw, header, &sibling);
        debug!(
            "resolved {} compile arguments for {}",
            filtered.len(),
            header.display()
        );
        Ok(filtered)
    }

    /// Raw argument vector of the first entry recorded for `file`.
    fn raw_arguments(&self, file: &Path) -> Option<Vec<String>> {
        let target = canonical_or_owned(file);
        self.commands
            .iter()
            .find(|command| canonical_or_owned(&command.resolved_file()) == target)
            .and_then(CompileCommand::argument_vector)
    }
}

fn canonical_or_owned(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn filter_arguments(raw: Vec<String>, header: &Path, sibling: &Path) -> Vec<String> {
    let header_arg = header.to_string_lossy();
    let sibling_arg = sibling.to_string_lossy();

    let mut filtered = Vec::new();
    let mut saw_xclang = false;
    for arg in raw.into_iter().skip(1) {
        if saw_xclang {
            // The operand belongs to the dropped -Xclang.
            saw_xclang = false;
            continue;
        }
        if arg == "-Xclang" {
            saw_xclang = true;
            continue;
        }
        if SKIPPED.contains(&arg.as_str()) {
            continue;
        }
        if arg == header_arg || arg == sibling_arg {
            continue;
        }
        filtered.push(arg);
    }

    filtered.extend(["-x", "c++", "-include", "StdAfx.h"].map(String::from));
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn write_db(dir: &Path, entries: serde_json::Value) {
        fs::write(dir.join("compile_commands.json"), entries.to_string()).unwrap();
    }

    #[test]
    fn filter_drops_and_appends_per_contract() {
        let header = Path::new("src/widget.h");
        let sibling = Path::new("src/widget.cpp");
        let raw = args(&[
            "clang++",
            "-c",
            "-Werror",
            "-Iinclude",
            "-Xclang",
            "-ast-dump",
            "src/widget.cpp",
            "src/widget.h",
            "-O2",
        ]);

        let filtered = filter_arguments(raw, header, sibling);
        assert_eq!(
            filtered,
            args(&["-Iinclude", "-O2", "-x", "c++", "-include", "StdAfx.h"])
        );
    }

    #[test]
    fn xclang_swallows_exactly_one_operand() {
        let raw = args(&["cc", "-Xclang", "-load", "-Xclang", "plugin.so", "-g"]);
        let filtered = filter_arguments(raw, Path::new("a.h"), Path::new("a.cpp"));
        assert_eq!(filtered, args(&["-g", "-x", "c++", "-include", "StdAfx.h"]));
    }

    #[test]
    fn arguments_for_resolves_the_cpp_sibling() {
        let tmp = TempDir::new().unwrap();
        let header = tmp.path().join("widget.h");
        let sibling = tmp.path().join("widget.cpp");
        fs::write(&header, "").unwrap();
        fs::write(&sibling, "").unwrap();
        write_db(
            tmp.path(),
            serde_json::json!([{
                "directory": tmp.path(),
                "file": &sibling,
                "arguments": ["clang++", "-c", "-DFOO", &sibling],
            }]),
        );

        let db = CompilationDatabase::from_directory(tmp.path()).unwrap();
        let filtered = db.arguments_for(&header).unwrap();
        assert_eq!(
            filtered,
            args(&["-DFOO", "-x", "c++", "-include", "StdAfx.h"])
        );
    }

    #[test]
    fn first_matching_entry_wins() {
        let tmp = TempDir::new().unwrap();
        let sibling = tmp.path().join("widget.cpp");
        fs::write(&sibling, "").unwrap();
        write_db(
            tmp.path(),
            serde_json::json!([
                {"file": &sibling, "arguments": ["cc", "-DFIRST"]},
                {"file": &sibling, "arguments": ["cc", "-DSECOND"]},
            ]),
        );

        let db = CompilationDatabase::from_directory(tmp.path()).unwrap();
        let filtered = db.arguments_for(&tmp.path().join("widget.h")).unwrap();
        assert_eq!(filtered[0], "-DFIRST");
    }

    #[test]
    fn command_string_entries_are_split() {
        let tmp = TempDir::new().unwrap();
        let sibling = tmp.path().join("widget.cpp");
        fs::write(&sibling, "").unwrap();
        write_db(
            tmp.path(),
            serde_json::json!([{
                "file": &sibling,
                "command": "clang++ -c -DBAR -O1",
            }]),
        );

        let db = CompilationDatabase::from_directory(tmp.path()).unwrap();
        let filtered = db.arguments_for(&tmp.path().join("widget.h")).unwrap();
        assert_eq!(
            filtered,
            args(&["-DBAR", "-O1", "-x", "c++", "-include", "StdAfx.h"])
        );
    }

    #[test]
    fn missing_entry_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        write_db(
            tmp.path(),
            serde_json::json!([{"file": "elsewhere.cpp", "arguments": ["cc"]}]),
        );

        let db = CompilationDatabase::from_directory(tmp.path()).unwrap();
        let result = db.arguments_for(&tmp.path().join("widget.h"));
        assert!(matches!(result, Err(CompDbError::MissingEntry { .. })));
    }

    #[test]
    fn relative_entries_resolve_against_their_directory() {
        let tmp = TempDir::new().unwrap();
        let sibling = tmp.path().join("widget.cpp");
        fs::write(&sibling, "").unwrap();
        write_db(
            tmp.path(),
            serde_json::json!([{
                "directory": tmp.path(),
                "file": "widget.cpp",
                "arguments": ["cc", "-DREL"],
            }]),
        );

        let db = CompilationDatabase::from_directory(tmp.path()).unwrap();
        let filtered = db.arguments_for(&tmp.path().join("widget.h")).unwrap();
        assert_eq!(filtered[0], "-DREL");
    }
}
