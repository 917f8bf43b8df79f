//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueHint};

use crate::domain::{MindmapId, NodeId};

/// Radial layout engine for collaborative mindmaps
#[derive(Parser, Debug)]
#[command(name = "mindlayout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(long, global = true, env = "MINDLAYOUT_DB", value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Create, edit, delete, move and inspect nodes
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Recompute or preview layouts
    Layout {
        #[command(subcommand)]
        command: LayoutCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Add a node (omit --parent to create the root)
    Add {
        #[arg(short, long, value_parser = parse_mindmap_id)]
        mindmap: MindmapId,
        #[arg(short, long)]
        title: String,
        #[arg(short, long, value_parser = parse_node_id)]
        parent: Option<NodeId>,
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a node and its subtree
    Delete {
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
    },

    /// Re-parent a node
    Move {
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
        /// New parent node
        #[arg(short, long, value_parser = parse_node_id)]
        parent: NodeId,
    },

    /// Change title and/or content of a node
    #[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["title", "content"])))]
    Edit {
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },

    /// Change the position of a node among its siblings
    Reorder {
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
        /// New sibling order index (lower comes first)
        #[arg(short, long, allow_hyphen_values = true)]
        order: i64,
    },

    /// List nodes with positions
    List {
        #[arg(short, long, value_parser = parse_mindmap_id)]
        mindmap: MindmapId,
    },

    /// Show hierarchy as tree
    Tree {
        #[arg(short, long, value_parser = parse_mindmap_id)]
        mindmap: MindmapId,
    },
}

#[derive(Subcommand, Debug)]
pub enum LayoutCommands {
    /// Recompute and store all positions
    Recompute {
        #[arg(short, long, value_parser = parse_mindmap_id)]
        mindmap: MindmapId,
    },

    /// Print the computed positions without storing them
    Show {
        #[arg(short, long, value_parser = parse_mindmap_id)]
        mindmap: MindmapId,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}

fn parse_node_id(s: &str) -> Result<NodeId, String> {
    s.parse::<i64>()
        .map(NodeId)
        .map_err(|e| format!("invalid node id '{s}': {e}"))
}

fn parse_mindmap_id(s: &str) -> Result<MindmapId, String> {
    s.parse::<i64>()
        .map(MindmapId)
        .map_err(|e| format!("invalid mindmap id '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_node_add_args_when_parsing_then_ids_are_typed() {
        let cli = Cli::try_parse_from([
            "mindlayout", "-dd", "node", "add", "-m", "3", "-t", "Idea", "-p", "7",
        ])
        .unwrap();

        assert_eq!(cli.debug, 2);
        match cli.command {
            Some(Commands::Node {
                command:
                    NodeCommands::Add {
                        mindmap,
                        title,
                        parent,
                        content,
                    },
            }) => {
                assert_eq!(mindmap, MindmapId(3));
                assert_eq!(title, "Idea");
                assert_eq!(parent, Some(NodeId(7)));
                assert!(content.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_negative_order_when_parsing_reorder_then_accepted() {
        let cli = Cli::try_parse_from(["mindlayout", "node", "reorder", "4", "--order", "-1"])
            .unwrap();

        match cli.command {
            Some(Commands::Node {
                command: NodeCommands::Reorder { id, order },
            }) => {
                assert_eq!(id, NodeId(4));
                assert_eq!(order, -1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_edit_without_changes_when_parsing_then_rejected() {
        let result = Cli::try_parse_from(["mindlayout", "node", "edit", "4"]);
        assert!(result.is_err());
    }

    #[test]
    fn given_non_numeric_id_when_parsing_then_rejected() {
        let result = Cli::try_parse_from(["mindlayout", "node", "delete", "abc"]);
        assert!(result.is_err());
    }
}
