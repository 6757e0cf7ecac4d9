use crate::config::SessionConfig;
use crate::core::session::CorrespondenceSession;
use crate::domain::model::{Axis, SliceMatch};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub axis: Axis,
    pub source_slices: usize,
    pub target_slices: usize,
    pub mapping: BTreeMap<usize, usize>,
    pub manual: usize,
    pub outputs: Vec<PathBuf>,
}

/// Drives a whole session from a config file: match every slice, apply the
/// configured adjustments, export.
pub struct SessionRunner<S: Storage> {
    storage: S,
    config: SessionConfig,
}

impl<S: Storage> SessionRunner<S> {
    pub fn new(storage: S, config: SessionConfig) -> Self {
        Self { storage, config }
    }

    pub fn build_session(&self) -> Result<CorrespondenceSession> {
        let mut session = CorrespondenceSession::new(self.config.axis()?);
        session.load_source(self.config.source.resolve("source")?);
        session.load_target(self.config.target.resolve("target")?);
        Ok(session)
    }

    /// Matches every source slice without storing or writing anything.
    pub fn plan(&self) -> Result<Vec<SliceMatch>> {
        let session = self.build_session()?;
        (0..session.source_slice_count()?)
            .map(|index| session.match_slice(index))
            .collect()
    }

    pub fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting session '{}'", self.config.session_name());
        let mut session = self.build_session()?;

        session.auto_match_all()?;
        for adjustment in self.config.adjustments() {
            session.adjust(adjustment.source_index, adjustment.delta)?;
        }

        let mut outputs = Vec::new();
        for format in self.config.formats()? {
            let file_name = self.config.file_name(format);
            outputs.push(session.export(format, &self.storage, &file_name)?);
        }

        Ok(RunSummary {
            axis: session.axis(),
            source_slices: session.source_slice_count()?,
            target_slices: session.target_slice_count()?,
            mapping: session.map().resolved(),
            manual: session.map().manual_count(),
            outputs,
        })
    }
}
