//! `scripts` command - show which scripts are installed

use console::style;

use crate::host::ScriptCatalog;
use crate::settings::Settings;

pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let catalog = ScriptCatalog::new(&settings.scripts_dir, &settings.interpreter.extension);
    println!("Scripts directory: {}", catalog.dir().display());

    let mut missing = 0;
    for (script, path, present) in catalog.list() {
        let status = if present {
            style("present").green()
        } else {
            missing += 1;
            style("missing").red()
        };
        println!(
            "  {:<10} {:<8} {}  ({})",
            script.file_stem(),
            status,
            path.display(),
            script.description()
        );
    }

    if missing > 0 {
        anyhow::bail!("{} script(s) not found in {}", missing, catalog.dir().display());
    }
    Ok(())
}
