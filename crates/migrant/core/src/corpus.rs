// Migrant
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Corpus discovery
//!
//! Walks a project directory and registers matching files as file entities
//! keyed by their root-relative path.

use crate::config::CorpusOptions;
use crate::graph::{FileSource, KnowledgeGraph, normalize_path};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to walk corpus: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("corpus root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("path escapes corpus root: {}", .path.display())]
    OutsideRoot { path: PathBuf },
}

pub struct Corpus;

impl Corpus {
    /// Registers every matching file under `root`; returns the number of files added.
    ///
    /// Files already present in the graph keep their existing entity.
    pub fn scan(root: impl AsRef<Path>, graph: &KnowledgeGraph, options: &CorpusOptions) -> Result<usize, CorpusError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CorpusError::NotADirectory(root.to_path_buf()));
        }

        let walker = WalkDir::new(root)
            .follow_links(options.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || options.include_hidden || !is_hidden(entry));

        let before = graph.file_count();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !matches_extension(entry.path(), &options.extensions) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| CorpusError::OutsideRoot {
                    path: entry.path().to_path_buf(),
                })?;
            let key = normalize_path(&relative.to_string_lossy());
            debug!(path = %key, "registering corpus file");
            graph.add_file(&key, FileSource::Disk(entry.path().to_path_buf()));
        }

        let added = graph.file_count() - before;
        info!(root = %root.display(), added, "corpus scanned");
        Ok(added)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FileKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_registers_matching_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/com/acme/Foo.java", "package com.acme; public class Foo {}");
        write(dir.path(), "META-INF/ejb-jar.xml", "<ejb-jar/>");
        write(dir.path(), "README.md", "docs");

        let graph = KnowledgeGraph::new();
        let added = Corpus::scan(dir.path(), &graph, &CorpusOptions::default()).unwrap();

        assert_eq!(added, 2);
        let java = graph.file("src/com/acme/Foo.java").unwrap();
        assert_eq!(java.kind(), FileKind::JavaSource);
        assert!(java.read_content().unwrap().contains("class Foo"));
        assert!(graph.file("META-INF/ejb-jar.xml").is_some());
        assert!(graph.file("README.md").is_none());
    }

    #[test]
    fn test_hidden_entries_skipped_by_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".git/Hook.java", "class Hook {}");
        write(dir.path(), "Main.java", "class Main {}");

        let graph = KnowledgeGraph::new();
        assert_eq!(Corpus::scan(dir.path(), &graph, &CorpusOptions::default()).unwrap(), 1);

        let options = CorpusOptions {
            include_hidden: true,
            ..CorpusOptions::default()
        };
        let graph = KnowledgeGraph::new();
        assert_eq!(Corpus::scan(dir.path(), &graph, &options).unwrap(), 2);
        assert!(graph.file(".git/Hook.java").is_some());
    }

    #[test]
    fn test_rescan_keeps_existing_entities() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A.java", "class A {}");

        let graph = KnowledgeGraph::new();
        Corpus::scan(dir.path(), &graph, &CorpusOptions::default()).unwrap();
        let first = graph.file("A.java").unwrap();
        assert_eq!(Corpus::scan(dir.path(), &graph, &CorpusOptions::default()).unwrap(), 0);
        assert!(std::sync::Arc::ptr_eq(&first, &graph.file("A.java").unwrap()));
    }

    #[test]
    fn test_missing_root_rejected() {
        let dir = TempDir::new().unwrap();
        let result = Corpus::scan(dir.path().join("absent"), &KnowledgeGraph::new(), &CorpusOptions::default());
        assert!(matches!(result, Err(CorpusError::NotADirectory(_))));
    }
}
