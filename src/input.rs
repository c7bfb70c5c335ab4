use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use stationkey::Submission;

/// Load every geosubmit document named on the command line, or one from
/// stdin when none are given.
pub fn submissions(files: &[PathBuf]) -> Result<Vec<Submission>> {
    if files.is_empty() {
        let mut raw = Vec::new();
        io::stdin().read_to_end(&mut raw)?;
        let submission = Submission::from_slice(&raw).context("Failed to parse stdin")?;
        return Ok(vec![submission]);
    }

    files
        .iter()
        .map(|path| {
            let raw =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Submission::from_slice(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))
        })
        .collect()
}
