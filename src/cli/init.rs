use std::{fs, path::Path};

use houston_settings::Config;
use tracing::instrument;

use super::{Workspace, terminal::Colorize};

#[instrument]
pub fn run(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        anyhow::bail!(
            "Settings already initialized (found existing {} directory)",
            dir.display()
        );
    }

    fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", dir.display()))?;

    let config = Config::default();
    config
        .save(&Workspace::config_path(dir))
        .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

    // both stores treat an empty document as empty
    for file in [&config.store_file, &config.objects_file] {
        fs::write(dir.join(file), "{}\n")
            .map_err(|e| anyhow::anyhow!("Failed to create {file}: {e}"))?;
    }

    println!(
        "{}",
        format!("✅ Initialized site settings in {}", dir.display()).success()
    );
    println!("  Created: config.toml");
    println!("  Created: {}", config.store_file);
    println!("  Created: {}", config.objects_file);
    println!();
    println!("{}", "Next steps:".dim());
    println!("  site-settings set site.custom.customFieldCategories categories.json");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_config_and_empty_stores() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".settings");

        run(&dir).unwrap();

        let config = Config::load(&dir.join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(fs::read_to_string(dir.join("store.json")).unwrap(), "{}\n");
        assert!(dir.join("objects.json").exists());
    }

    #[test]
    fn refuses_to_reinitialize() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".settings");
        run(&dir).unwrap();

        let err = run(&dir).unwrap_err();
        assert!(err.to_string().starts_with("Settings already initialized"));
    }
}
