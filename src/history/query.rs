use super::{HistoryService, LastModifiedCache};
use crate::config::HistoryConfig;
use crate::error::Result;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::info;

/// Every filename an ingest has used, across its source, test and
/// documentation paths.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub tag: String,
    /// Expand the set through rename history and order by last change.
    pub follow_renames: bool,
    /// Do not print the result.
    pub quiet: bool,
}

impl HistoryQuery {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            follow_renames: true,
            quiet: false,
        }
    }

    pub fn follow_renames(mut self, follow: bool) -> Self {
        self.follow_renames = follow;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Runs the query and returns the ordered filenames.
    ///
    /// With renames followed the result is ordered by last modification,
    /// oldest first, paths never modified first; otherwise lexicographically.
    pub fn run(
        &self,
        service: &HistoryService,
        config: &HistoryConfig,
        cache: &mut LastModifiedCache,
    ) -> Result<Vec<String>> {
        let mut known = BTreeSet::new();
        for path in config.paths_for(&self.tag) {
            known.extend(service.files_touching(&path)?);
        }

        if !self.follow_renames {
            info!(tag = %self.tag, files = known.len(), "history query");
            return Ok(known.into_iter().collect());
        }

        let mut history = BTreeSet::new();
        for file in &known {
            history.extend(service.past_filenames(file)?);
        }

        let mut dated = Vec::with_capacity(history.len());
        for file in history {
            let modified = service.last_modified(&file, cache)?;
            dated.push((modified, file));
        }
        dated.sort();

        info!(tag = %self.tag, known = known.len(), files = dated.len(), "history query");
        Ok(dated.into_iter().map(|(_, file)| file).collect())
    }

    /// Runs the query, printing one path per line to `out` unless quiet.
    pub fn execute(
        &self,
        service: &HistoryService,
        config: &HistoryConfig,
        out: &mut impl Write,
    ) -> Result<Vec<String>> {
        let mut cache = LastModifiedCache::new();
        let files = self.run(service, config, &mut cache)?;
        if !self.quiet {
            for file in &files {
                writeln!(out, "{}", file)?;
            }
        }
        Ok(files)
    }
}
