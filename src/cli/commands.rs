//! Command dispatch: maps parsed arguments onto the services.

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::CreateNode;
use crate::cli::args::{Cli, Commands, ConfigCommands, LayoutCommands, NodeCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{LoadedTree, MindmapId, Node, NodeChanges, NodeId};
use crate::infrastructure::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run `mindlayout --help`".into(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli)?;
    match command {
        Commands::Config { command } => config_command(command, &settings, cli),
        Commands::Init => init(settings),
        Commands::Node { command } => node_command(command, &ServiceContainer::new(settings)?),
        Commands::Layout { command } => {
            layout_command(command, &ServiceContainer::new(settings)?)
        }
        Commands::Completion { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        settings.database_path = db.clone();
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(settings))]
fn init(settings: Settings) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    output::success(&format!(
        "database ready: {}",
        container.settings.database_path.display()
    ));
    Ok(())
}

fn node_command(command: &NodeCommands, container: &ServiceContainer) -> CliResult<()> {
    match command {
        NodeCommands::Add {
            mindmap,
            title,
            parent,
            content,
        } => {
            let node = container.nodes.create_node(CreateNode {
                mindmap_id: *mindmap,
                parent_id: *parent,
                title: title.clone(),
                content: content.clone(),
            })?;
            output::action("Created", &format!("{} at {}", node, node.position()));
        }
        NodeCommands::Delete { id } => {
            let summary = container.nodes.delete_node(*id)?;
            output::action(
                "Deleted",
                &format!(
                    "{} node(s) from mindmap {}",
                    summary.removed, summary.mindmap_id
                ),
            );
        }
        NodeCommands::Move { id, parent } => {
            let node = container.nodes.move_node(*id, *parent)?;
            output::action(
                "Moved",
                &format!("{} under [{}], now at {}", node, parent, node.position()),
            );
        }
        NodeCommands::Edit { id, title, content } => {
            let node = container.nodes.update_node(
                *id,
                NodeChanges {
                    title: title.clone(),
                    content: content.clone(),
                    order_index: None,
                },
            )?;
            output::action("Updated", &node);
        }
        NodeCommands::Reorder { id, order } => {
            let node = container.nodes.update_node(
                *id,
                NodeChanges {
                    order_index: Some(*order),
                    ..NodeChanges::default()
                },
            )?;
            output::action(
                "Reordered",
                &format!("{} to order {}, now at {}", node, node.order_index, node.position()),
            );
        }
        NodeCommands::List { mindmap } => {
            let nodes = container.nodes.list_nodes(*mindmap)?;
            list_nodes(*mindmap, &nodes);
        }
        NodeCommands::Tree { mindmap } => match container.nodes.tree(*mindmap)? {
            LoadedTree::Empty => output::warning(&format!("mindmap {mindmap} has no nodes")),
            LoadedTree::Rooted(tree) => {
                output::info(&tree.to_termtree(|n| format!("{} {}", n, n.position())));
            }
        },
    }
    Ok(())
}

fn list_nodes(mindmap: MindmapId, nodes: &[Node]) {
    output::header(&format!("mindmap {mindmap}: {} node(s)", nodes.len()));
    for node in nodes {
        let parent = node
            .parent_id
            .map_or_else(|| "-".to_string(), |p: NodeId| p.to_string());
        output::detail(&format!(
            "{:>6} parent={:<6} order={:<4} {:>22}  {}",
            node.id,
            parent,
            node.order_index,
            node.position().to_string(),
            node.title
        ));
    }
}

fn layout_command(command: &LayoutCommands, container: &ServiceContainer) -> CliResult<()> {
    match command {
        LayoutCommands::Recompute { mindmap } => {
            let summary = container.layout.recompute_layout(*mindmap)?;
            output::success(&format!(
                "mindmap {}: positioned {} node(s)",
                summary.mindmap_id, summary.positioned
            ));
        }
        LayoutCommands::Show { mindmap } => {
            let positions = container.layout.preview_layout(*mindmap)?;
            output::header(&format!("mindmap {mindmap} (preview, not stored)"));
            for (id, position) in &positions {
                output::detail(&format!("{id:>6} {position}"));
            }
        }
    }
    Ok(())
}

fn config_command(command: &ConfigCommands, settings: &Settings, cli: &Cli) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map_or_else(|| "(unavailable)".to_string(), |p| p.display().to_string());
            output::action("global", &global);
            if let Some(file) = &cli.config {
                output::action("file", &file.display());
            }
            output::action("database", &settings.database_path.display());
        }
    }
    Ok(())
}
