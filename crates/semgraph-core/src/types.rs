use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source position of a graph node.
///
/// # Examples
///
/// ```
/// use semgraph_core::Location;
///
/// let loc = Location {
///     uri: "src/main/java/Cache.java".into(),
///     start_line: 12,
///     start_char: 4,
/// };
/// assert_eq!(loc.start_line, 12);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// File the construct lives in.
    #[serde(default)]
    pub uri: String,
    /// Zero-based start line.
    #[serde(default)]
    pub start_line: u32,
    /// Zero-based start column.
    #[serde(default, alias = "startCharacter")]
    pub start_char: u32,
}

/// An outgoing, typed edge declared by a node record.
///
/// # Examples
///
/// ```
/// use semgraph_core::EdgeRecord;
///
/// let edge = EdgeRecord { to: "com.example.Cache#get".into(), kind: "CALL".into() };
/// assert_eq!(edge.kind, "CALL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Target node id. The target need not be declared by any snapshot.
    pub to: String,
    /// Relationship label, e.g. `CALL`, `EXTEND`, `DECLARATION`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One node declared in a snapshot, with its outgoing edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Globally unique node id.
    pub id: String,
    /// Kind tag (`CLASS`, `METHOD`, ...).
    #[serde(default)]
    pub kind: String,
    /// Human-readable name, if the producer emitted one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Where the construct is defined.
    #[serde(default)]
    pub location: Location,
    /// Free-form string properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Outgoing edges.
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// A serialized record of one source file's contribution to the graph.
///
/// # Examples
///
/// ```
/// use semgraph_core::SnapshotFile;
///
/// let json = r#"{
///     "uri": "src/Cache.java",
///     "nodes": [
///         {"id": "Cache", "kind": "CLASS", "displayName": "Cache",
///          "edges": [{"to": "Store", "type": "EXTEND"}]}
///     ]
/// }"#;
/// let snapshot: SnapshotFile = serde_json::from_str(json).unwrap();
/// assert_eq!(snapshot.nodes[0].edges[0].to, "Store");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Uri of the source file this snapshot describes.
    #[serde(default)]
    pub uri: String,
    /// Nodes declared by the file.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use semgraph_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text suitable for pasting into a prompt.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display_roundtrips() {
        for fmt in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Markdown] {
            assert_eq!(fmt.to_string().parse::<OutputFormat>().unwrap(), fmt);
        }
    }

    #[test]
    fn node_record_defaults_missing_fields() {
        let node: NodeRecord = serde_json::from_str(r#"{"id": "pkg/Foo#"}"#).unwrap();
        assert_eq!(node.id, "pkg/Foo#");
        assert!(node.kind.is_empty());
        assert!(node.display_name.is_none());
        assert_eq!(node.location, Location::default());
        assert!(node.properties.is_empty());
        assert!(node.edges.is_empty());
    }

    #[test]
    fn location_accepts_start_character_alias() {
        let loc: Location =
            serde_json::from_str(r#"{"uri": "A.java", "startLine": 3, "startCharacter": 7}"#)
                .unwrap();
        assert_eq!(loc.start_line, 3);
        assert_eq!(loc.start_char, 7);
    }

    #[test]
    fn snapshot_parses_properties_and_edges() {
        let json = r#"{
            "uri": "src/Lru.java",
            "nodes": [{
                "id": "LruCache#",
                "kind": "CLASS",
                "displayName": "LruCache",
                "location": {"uri": "src/Lru.java", "startLine": 1, "startChar": 0},
                "properties": {"access": "public"},
                "edges": [{"to": "Cache#", "type": "EXTEND"}, {"to": "Map#"}]
            }]
        }"#;
        let snapshot: SnapshotFile = serde_json::from_str(json).unwrap();
        let node = &snapshot.nodes[0];
        assert_eq!(node.display_name.as_deref(), Some("LruCache"));
        assert_eq!(node.properties["access"], "public");
        assert_eq!(node.edges.len(), 2);
        assert_eq!(node.edges[1].kind, "");
    }
}
