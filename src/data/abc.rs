//! ABC edge lists
//!
//! One edge per line: `source<TAB>target<TAB>weight`. This is the format
//! the `mcl` executable reads with `--abc`, and the input format of the
//! command line tool.

use crate::error::{Error, Result};
use crate::graph::{GraphBuilder, LabeledGraph};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Read an ABC edge list into a labeled graph.
///
/// Lines without exactly three tab-separated fields and self loops are
/// skipped. A weight that does not parse, or is not positive and finite, is
/// a [`Error::Format`] error carrying the line number.
pub fn read_abc<R: BufRead>(reader: R) -> Result<LabeledGraph> {
    let mut builder = GraphBuilder::default();
    let mut skipped = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;

        let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if fields.len() != 3 {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        }

        let (source, target) = (fields[0], fields[1]);
        if source == target {
            continue;
        }

        let weight: f64 = fields[2].trim().parse().map_err(|_| Error::Format {
            line: number,
            message: format!("cannot parse weight '{}'", fields[2]),
        })?;

        builder
            .add_edge(source, target, weight)
            .map_err(|error| match error {
                Error::InvalidWeight { weight } => Error::Format {
                    line: number,
                    message: format!("weight {} is not positive and finite", weight),
                },
                other => other,
            })?;
    }

    if skipped > 0 {
        log::warn!("Skipped {} malformed lines", skipped);
    }

    Ok(builder.build())
}

/// Read an ABC file from disk
pub fn read_abc_file(path: &Path) -> Result<LabeledGraph> {
    log::info!("Reading graph from {}", path.display());
    let labeled = read_abc(BufReader::new(File::open(path)?))?;
    log::info!(
        "Loaded {} nodes and {} edges",
        labeled.graph.node_count(),
        labeled.graph.edge_count()
    );
    Ok(labeled)
}

/// Write a labeled graph as ABC, one line per undirected edge
pub fn write_abc<W: Write>(mut writer: W, labeled: &LabeledGraph) -> Result<()> {
    for (source, target, weight) in labeled.graph.all_edges() {
        writeln!(
            writer,
            "{}\t{}\t{}",
            labeled.label(source),
            labeled.label(target),
            weight
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write index-labeled edges as ABC
pub fn write_indexed_edges<W, I>(mut writer: W, edges: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    for (source, target, weight) in edges {
        writeln!(writer, "{}\t{}\t{}", source, target, weight)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse one cluster per line, members as tab-separated integer ids.
///
/// Blank lines are ignored.
pub fn parse_clusters<R: BufRead>(reader: R) -> Result<Vec<Vec<usize>>> {
    let mut clusters = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let members = line
            .split('\t')
            .map(|field| {
                field.trim().parse::<usize>().map_err(|_| Error::Format {
                    line: index + 1,
                    message: format!("cannot parse vertex id '{}'", field),
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        clusters.push(members);
    }

    Ok(clusters)
}
