//! Results persistence module
//!
//! Clusters are written in the tab-separated ILE layout
//! (`id<TAB>size<TAB>member, member, ...`, largest cluster first). Summaries
//! and sense inventories are written as pretty-printed JSON.

use crate::cluster::metrics::{central_nodes, density, summarize, weighted_density};
use crate::cluster::Clustering;
use crate::error::Result;
use crate::graph::{Graph, Node};
use crate::sense::Inventory;
use itertools::Itertools;
use serde_json::{json, to_string_pretty, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Number of central nodes listed per cluster in summaries
const CENTRAL_NODES: usize = 5;

/// Write clusters in ILE format, largest first, ids starting at 1
pub fn write_clusters<W, N, F>(mut writer: W, clustering: &Clustering<N>, label: F) -> Result<()>
where
    W: Write,
    N: Node,
    F: Fn(N) -> String,
{
    for (id, cluster) in clustering.sorted_by_size().into_iter().enumerate() {
        let members = cluster.iter().map(|&node| label(node)).join(", ");
        writeln!(writer, "{}\t{}\t{}", id + 1, cluster.len(), members)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one line per sense: `node#index<TAB>neighbor:weight, ...`
pub fn write_senses<W, N, F>(mut writer: W, inventory: &Inventory<N>, label: F) -> Result<()>
where
    W: Write,
    N: Node,
    F: Fn(N) -> String,
{
    for (node, senses) in inventory.iter() {
        for induced in senses {
            let context = induced
                .context
                .iter()
                .map(|(&neighbor, weight)| format!("{}:{}", label(neighbor), weight))
                .join(", ");
            writeln!(writer, "{}#{}\t{}", label(node), induced.sense.index, context)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// JSON summary of a graph and its clustering
pub fn summary_json<N, F>(graph: &Graph<N>, clustering: &Clustering<N>, label: F) -> Value
where
    N: Node,
    F: Fn(N) -> String,
{
    let summary = summarize(graph, clustering);

    let clusters: Vec<Value> = clustering
        .sorted_by_size()
        .into_iter()
        .enumerate()
        .map(|(id, cluster)| {
            json!({
                "id": id + 1,
                "size": cluster.len(),
                "density": density(graph, cluster),
                "weighted_density": weighted_density(graph, cluster),
                "central_nodes": central_nodes(graph, cluster, CENTRAL_NODES)
                    .into_iter()
                    .map(&label)
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "graph_stats": {
            "node_count": summary.node_count,
            "edge_count": summary.edge_count,
        },
        "cluster_stats": summary,
        "clusters": clusters,
    })
}

/// Save the JSON summary to `path`
pub fn save_summary<N, F>(path: &Path, graph: &Graph<N>, clustering: &Clustering<N>, label: F) -> Result<()>
where
    N: Node,
    F: Fn(N) -> String,
{
    log::info!("Saving summary to {}", path.display());

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(to_string_pretty(&summary_json(graph, clustering, label))?.as_bytes())?;
    file.flush()?;

    Ok(())
}

/// JSON object mapping each vertex to its senses and their contexts
pub fn inventory_json<N, F>(inventory: &Inventory<N>, label: F) -> Value
where
    N: Node,
    F: Fn(N) -> String,
{
    let mut root = serde_json::Map::new();

    for (node, senses) in inventory.iter() {
        let senses: Vec<Value> = senses
            .iter()
            .map(|induced| {
                let context: serde_json::Map<String, Value> = induced
                    .context
                    .iter()
                    .map(|(&neighbor, &weight)| (label(neighbor), json!(weight)))
                    .collect();
                json!({
                    "index": induced.sense.index,
                    "context": context,
                })
            })
            .collect();
        root.insert(label(node), Value::Array(senses));
    }

    Value::Object(root)
}

/// Save the sense inventory as JSON to `path`
pub fn save_inventory<N, F>(path: &Path, inventory: &Inventory<N>, label: F) -> Result<()>
where
    N: Node,
    F: Fn(N) -> String,
{
    log::info!("Saving sense inventory to {}", path.display());

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(to_string_pretty(&inventory_json(inventory, label))?.as_bytes())?;
    file.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sense::SenseInduction;
    use crate::cluster::Trivial;
    use std::collections::BTreeSet;

    fn graph() -> Graph<&'static str> {
        let mut graph = Graph::new();
        graph.add_edge("a", "b", 1.0);
        graph.add_edge("b", "c", 1.0);
        graph.add_edge("a", "c", 1.0);
        graph.add_edge("d", "e", 2.0);
        graph
    }

    #[test]
    fn ile_lines_sorted_by_size() {
        let clustering = Clustering::new(vec![
            BTreeSet::from(["d", "e"]),
            BTreeSet::from(["a", "b", "c"]),
        ]);

        let mut buffer = Vec::new();
        write_clusters(&mut buffer, &clustering, |node| node.to_string()).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "1\t3\ta, b, c\n2\t2\td, e\n"
        );
    }

    #[test]
    fn summary_has_stats_and_clusters() {
        let graph = graph();
        let clustering = Clustering::new(vec![
            BTreeSet::from(["a", "b", "c"]),
            BTreeSet::from(["d", "e"]),
        ]);

        let summary = summary_json(&graph, &clustering, |node| node.to_string());
        assert_eq!(summary["graph_stats"]["node_count"], 5);
        assert_eq!(summary["cluster_stats"]["cluster_count"], 2);
        assert_eq!(summary["clusters"][0]["size"], 3);
        assert_eq!(summary["clusters"][1]["central_nodes"][0], "d");
        assert_eq!(summary["clusters"][0]["weighted_density"], 1.0);
        assert_eq!(summary["clusters"][1]["weighted_density"], 2.0);
        assert_eq!(summary["cluster_stats"]["average_weighted_density"], 1.5);
    }

    #[test]
    fn inventory_as_json_and_lines() {
        let graph = graph();
        let inventory = SenseInduction::new(Trivial::Components).inventory(&graph).unwrap();

        let value = inventory_json(&inventory, |node| node.to_string());
        assert_eq!(value["a"][0]["index"], 1);
        assert_eq!(value["a"][0]["context"]["b"], 1.0);

        let mut buffer = Vec::new();
        write_senses(&mut buffer, &inventory, |node| node.to_string()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().any(|line| line == "d#1\te:2"));
    }
}
