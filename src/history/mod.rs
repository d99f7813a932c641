//! Revision history of ingest files.
//!
//! Ingests move around a repository over time. [`HistoryService`] answers
//! which paths were ever committed under a directory, which names a file had
//! before it was renamed, and when a path was last changed. [`HistoryQuery`]
//! combines these into the list of every filename an ingest has used.

mod query;

pub use query::HistoryQuery;

use crate::error::{RefactorError, Result};
use git2::{Commit, DiffFindOptions, DiffOptions, ErrorCode, Repository, Sort, Tree};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Memoized last-modified times, keyed by repository root and path.
///
/// Lives for one run; values never change once computed.
#[derive(Debug, Default)]
pub struct LastModifiedCache {
    entries: HashMap<(PathBuf, String), Option<i64>>,
}

impl LastModifiedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only history queries against one repository.
pub struct HistoryService {
    root: PathBuf,
    repo: Repository,
    rename_similarity: u16,
}

impl HistoryService {
    /// Opens the repository at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let repo = Repository::open(root).map_err(|_| RefactorError::RepoNotFound(root.to_path_buf()))?;
        Ok(Self {
            root: root.to_path_buf(),
            repo,
            rename_similarity: 80,
        })
    }

    /// Sets the similarity (percent) above which a delete and an add count as a rename.
    pub fn with_rename_similarity(mut self, percent: u16) -> Self {
        self.rename_similarity = percent;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every path changed at or under `path` by any commit reachable from HEAD.
    pub fn files_touching(&self, path: &str) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();

        for commit in self.commits()? {
            let tree = commit.tree()?;
            let parent = parent_tree(&commit)?;
            let mut options = DiffOptions::new();
            options.pathspec(path);
            let diff = self
                .repo
                .diff_tree_to_tree(parent.as_ref(), Some(&tree), Some(&mut options))?;

            for delta in diff.deltas() {
                if let Some(changed) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                    files.insert(changed.to_string_lossy().into_owned());
                }
            }
        }

        trace!(path, files = files.len(), "files touching");
        Ok(files)
    }

    /// Every name `file` has had, following renames back in time.
    pub fn past_filenames(&self, file: &str) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut current = file.to_string();

        for commit in self.commits()? {
            let tree = commit.tree()?;
            let parent = parent_tree(&commit)?;
            if entry_id(Some(&tree), &current) == entry_id(parent.as_ref(), &current) {
                continue;
            }
            names.insert(current.clone());

            if let Some(previous) = self.renamed_from(parent.as_ref(), &tree, &current)? {
                trace!(from = %previous, to = %current, commit = %commit.id(), "followed rename");
                names.insert(previous.clone());
                current = previous;
            }
        }

        Ok(names)
    }

    /// Commit time in seconds of the newest commit changing `file`, if any.
    pub fn last_modified(&self, file: &str, cache: &mut LastModifiedCache) -> Result<Option<i64>> {
        let key = (self.root.clone(), file.to_string());
        if let Some(&cached) = cache.entries.get(&key) {
            return Ok(cached);
        }

        let mut modified = None;
        for commit in self.commits()? {
            let tree = commit.tree()?;
            let parent = parent_tree(&commit)?;
            if entry_id(Some(&tree), file) != entry_id(parent.as_ref(), file) {
                modified = Some(commit.time().seconds());
                break;
            }
        }

        cache.entries.insert(key, modified);
        Ok(modified)
    }

    /// Non-merge commits reachable from HEAD, newest first.
    fn commits(&self) -> Result<Vec<Commit<'_>>> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TIME)?;
        match walk.push_head() {
            Ok(()) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let mut commits = Vec::new();
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.parent_count() <= 1 {
                commits.push(commit);
            }
        }
        Ok(commits)
    }

    /// The old path of `file` if `commit_tree` created it by renaming another file.
    fn renamed_from(&self, parent: Option<&Tree<'_>>, commit_tree: &Tree<'_>, file: &str) -> Result<Option<String>> {
        if parent.is_none() || entry_id(parent, file).is_some() {
            return Ok(None);
        }

        let mut diff = self.repo.diff_tree_to_tree(parent, Some(commit_tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true).rename_threshold(self.rename_similarity);
        diff.find_similar(Some(&mut find))?;

        Ok(diff
            .deltas()
            .filter(|d| d.status() == git2::Delta::Renamed)
            .find(|d| d.new_file().path() == Some(Path::new(file)))
            .and_then(|d| d.old_file().path().map(|p| p.to_string_lossy().into_owned())))
    }
}

fn parent_tree<'r>(commit: &Commit<'r>) -> Result<Option<Tree<'r>>> {
    if commit.parent_count() == 0 {
        return Ok(None);
    }
    Ok(Some(commit.parent(0)?.tree()?))
}

fn entry_id(tree: Option<&Tree<'_>>, path: &str) -> Option<git2::Oid> {
    tree?.get_path(Path::new(path)).ok().map(|entry| entry.id())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{Oid, Signature, Time};
    use tempfile::TempDir;

    /// Writes (`Some`) or deletes (`None`) files and commits at `time`.
    pub(crate) fn commit(repo: &Repository, changes: &[(&str, Option<&str>)], time: i64) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in changes {
            let full = workdir.join(path);
            match content {
                Some(content) => {
                    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
                    std::fs::write(&full, content).unwrap();
                    index.add_path(Path::new(path)).unwrap();
                }
                None => {
                    std::fs::remove_file(&full).unwrap();
                    index.remove_path(Path::new(path)).unwrap();
                }
            }
        }
        index.write().unwrap();

        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::new("Test", "test@example.com", &Time::new(time, 0)).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, "change", &tree, &parents)
            .unwrap()
    }

    pub(crate) const BODY: &str = "def transform_record(koza, record):\n    a = record['a']\n    b = record['b']\n    c = record['c']\n    koza.write(a, b, c)\n";

    #[test]
    fn test_files_touching_directory() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("ingest/a.py", Some("a")), ("other/b.py", Some("b"))], 100);
        commit(&repo, &[("ingest/c.py", Some("c"))], 200);
        commit(&repo, &[("ingest/c.py", None)], 300);

        let service = HistoryService::open(dir.path()).unwrap();
        let files = service.files_touching("ingest").unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), ["ingest/a.py", "ingest/c.py"]);
    }

    #[test]
    fn test_past_filenames_follow_renames() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("old/transform.py", Some(BODY))], 100);
        commit(&repo, &[("old/transform.py", None), ("new/transform.py", Some(BODY))], 200);
        commit(&repo, &[("unrelated.txt", Some("x"))], 300);

        let service = HistoryService::open(dir.path()).unwrap();
        let names = service.past_filenames("new/transform.py").unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), ["new/transform.py", "old/transform.py"]);
        assert_eq!(service.past_filenames("unrelated.txt").unwrap().len(), 1);
    }

    #[test]
    fn test_last_modified_is_memoized() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("a.py", Some("1"))], 100);
        commit(&repo, &[("a.py", Some("2"))], 250);
        commit(&repo, &[("b.py", Some("1"))], 300);

        let service = HistoryService::open(dir.path()).unwrap();
        let mut cache = LastModifiedCache::new();
        assert_eq!(service.last_modified("a.py", &mut cache).unwrap(), Some(250));
        assert_eq!(service.last_modified("missing.py", &mut cache).unwrap(), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(service.last_modified("a.py", &mut cache).unwrap(), Some(250));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_open_missing_repository() {
        let dir = TempDir::new().unwrap();
        let err = HistoryService::open(dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, RefactorError::RepoNotFound(_)));
    }

    #[test]
    fn test_empty_repository_has_no_history() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let service = HistoryService::open(dir.path()).unwrap();
        assert!(service.files_touching("").unwrap().is_empty());
    }
}
