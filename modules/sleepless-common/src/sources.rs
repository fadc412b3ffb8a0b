//! Source list loading.
//!
//! The list is a flat comma-separated file, one source per row:
//! `name, region, latitude, longitude, population`.

use std::path::Path;

use tracing::info;

use crate::error::SleeplessError;
use crate::types::Source;

/// Read the source list at `path`, keeping rows whose population is strictly
/// above `min_population`.
pub fn load_sources(path: &Path, min_population: u64) -> Result<Vec<Source>, SleeplessError> {
    let content = std::fs::read_to_string(path)?;
    let sources = parse_sources(&content, min_population)?;
    info!(
        path = %path.display(),
        eligible = sources.len(),
        min_population,
        "Loaded source list"
    );
    Ok(sources)
}

/// Parse source rows from text. Blank lines are skipped; any other malformed
/// row fails the whole parse with its 1-based line number.
pub fn parse_sources(content: &str, min_population: u64) -> Result<Vec<Source>, SleeplessError> {
    let mut sources = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let source = parse_row(line).map_err(|message| SleeplessError::SourceList {
            line: idx + 1,
            message,
        })?;
        if source.population > min_population {
            sources.push(source);
        }
    }
    Ok(sources)
}

fn parse_row(line: &str) -> Result<Source, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    }
    let lat = fields[2]
        .parse::<f64>()
        .map_err(|e| format!("bad latitude {:?}: {e}", fields[2]))?;
    let lng = fields[3]
        .parse::<f64>()
        .map_err(|e| format!("bad longitude {:?}: {e}", fields[3]))?;
    let population = fields[4]
        .parse::<u64>()
        .map_err(|e| format!("bad population {:?}: {e}", fields[4]))?;

    Ok(Source {
        name: fields[0].to_string(),
        region: fields[1].to_string(),
        lat,
        lng,
        population,
    })
}
