//! `tome routes` command implementation.

use std::path::Path;

use clap::Args;
use tome_resolver::{CONTROLLER_FILE, ContentTree, TEMPLATE_FILE};

use super::{SiteArgs, build_resolver};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the routes command.
#[derive(Args)]
pub(crate) struct RoutesArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

impl RoutesArgs {
    /// Execute the routes command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or a tree cannot be indexed.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.site.load_config()?;
        let resolver = build_resolver(&config).await?;

        if let Some(root_page) = &resolver.config().root_page {
            output.info(&format!("/ -> {root_page}"));
        }
        if let Some(prefix) = &resolver.config().static_prefix {
            output.detail(&format!("{prefix}/* is left to the transport"));
        }

        print_tree(&output, "Pages", resolver.pages()).await;
        output.separator();
        print_tree(&output, "Items", resolver.items()).await;
        Ok(())
    }
}

async fn print_tree(output: &Output, title: &str, tree: &ContentTree) {
    output.highlight(&format!("{title} ({})", tree.root().display()));
    if tree.is_empty() {
        output.detail("  (empty)");
        return;
    }
    for (logical_path, dir) in tree.iter() {
        let markers = node_markers(dir).await;
        output.info(&format!("  {logical_path:<40} {markers}"));
    }
}

/// Short description of the node files present in `dir`.
async fn node_markers(dir: &Path) -> String {
    let mut markers = Vec::new();
    for (file, marker) in [(TEMPLATE_FILE, "template"), (CONTROLLER_FILE, "controller")] {
        if tokio::fs::try_exists(dir.join(file)).await.unwrap_or(false) {
            markers.push(marker);
        }
    }
    if markers.is_empty() {
        String::new()
    } else {
        format!("[{}]", markers.join(", "))
    }
}
