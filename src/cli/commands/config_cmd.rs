//! config command - Show the resolved configuration

use serde::Serialize;

use crate::cli::Context;
use crate::core::config::Config;
use crate::git::Repository;
use crate::ui::output;
use anyhow::Result;

#[derive(Serialize)]
struct Resolved<'a> {
    backend: &'a str,
    git_binary: String,
    detect_renames: bool,
    global_file: Option<String>,
    repo_file: Option<String>,
}

/// Print the configuration vcscope would use here.
///
/// Outside a repository only the global file and flags apply.
pub fn config(ctx: &Context) -> Result<()> {
    let global = ctx.global_config()?;
    let config = match Repository::open(&ctx.working_dir()?, &global) {
        Ok(repo) => ctx.apply_flags(Config::load(Some(repo.git_dir()))?),
        Err(err) => {
            output::debug(format!("no repository: {}", err), ctx.verbosity);
            global
        }
    };

    let resolved = Resolved {
        backend: config.backend().name(),
        git_binary: config.git_binary().display().to_string(),
        detect_renames: config.detect_renames(),
        global_file: config
            .global_config_loaded_from()
            .map(|p| p.display().to_string()),
        repo_file: config
            .repo_config_loaded_from()
            .map(|p| p.display().to_string()),
    };

    if ctx.json {
        output::json(&resolved)?;
        return Ok(());
    }

    output::result(format!("backend = {}", resolved.backend));
    output::result(format!("git_binary = {}", resolved.git_binary));
    output::result(format!("detect_renames = {}", resolved.detect_renames));
    for (label, file) in [("global", &resolved.global_file), ("repo", &resolved.repo_file)] {
        if let Some(file) = file {
            output::print(format!("# {} config: {}", label, file), ctx.verbosity);
        }
    }
    Ok(())
}
