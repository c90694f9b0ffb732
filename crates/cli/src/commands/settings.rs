//! Settings commands: `show-config` plus `set-*`, `view-*` and `reset-*`
//! for each stored document

use anyhow::{Context, Result};
use monitor_lib::config::{
    document_map, ConfigDocument, NamespacesDocument, PolicyDocument, Settings, SettingsDocument,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::config::Paths;
use crate::output::{print_info, print_json, print_success, print_warning, OutputFormat};

const PASSWORD_KEY: &str = "sender_password";
const MASK: &str = "********";

#[derive(Serialize)]
struct EffectiveConfig<'a> {
    settings_dir: &'a Path,
    store_path: &'a Path,
    #[serde(flatten)]
    settings: &'a Settings,
}

/// Always JSON; the settings are nested documents, not rows
pub fn show(paths: &Paths) -> Result<()> {
    let settings = paths.load_settings()?;
    print_info(&format!(
        "Settings directory: {}",
        paths.settings_dir.display()
    ));
    print_json(&EffectiveConfig {
        settings_dir: &paths.settings_dir,
        store_path: &paths.store_path,
        settings: &settings,
    });
    Ok(())
}

fn label(document: SettingsDocument) -> &'static str {
    match document {
        SettingsDocument::Config => "Configuration",
        SettingsDocument::Policy => "Auto-scaling policy",
        SettingsDocument::Namespaces => "Namespaces",
    }
}

fn update<T: Serialize>(paths: &Paths, document: SettingsDocument, values: &T) -> Result<()> {
    let updates = document_map(values)?;
    if updates.is_empty() {
        print_warning("Nothing to update; pass at least one option");
        return Ok(());
    }

    Settings::update(&paths.settings_dir, document, updates).with_context(|| {
        format!(
            "Failed to update {}",
            document.path(&paths.settings_dir).display()
        )
    })?;
    print_success(&format!("{} updated successfully.", label(document)));
    Ok(())
}

pub fn set_config(paths: &Paths, values: ConfigDocument) -> Result<()> {
    update(paths, SettingsDocument::Config, &values)
}

pub fn set_policy(paths: &Paths, values: PolicyDocument) -> Result<()> {
    update(paths, SettingsDocument::Policy, &values)
}

pub fn set_namespaces(paths: &Paths, namespaces: Vec<String>) -> Result<()> {
    update(
        paths,
        SettingsDocument::Namespaces,
        &NamespacesDocument {
            namespaces: Some(namespaces),
        },
    )
}

/// Print a stored document as written; defaults are not filled in
pub fn view(paths: &Paths, document: SettingsDocument, format: OutputFormat) -> Result<()> {
    let map = masked(Settings::document(&paths.settings_dir, document)?);

    if let OutputFormat::Json = format {
        print_json(&map);
        return Ok(());
    }
    if map.is_empty() {
        print_warning(&format!("No {} found.", label(document).to_lowercase()));
        return Ok(());
    }

    match (document, map.get("namespaces")) {
        (SettingsDocument::Namespaces, Some(Value::Array(items))) => {
            println!("Monitoring the following namespaces:");
            for ns in items {
                println!("- {}", ns.as_str().unwrap_or_default());
            }
        }
        _ => {
            for (key, value) in &map {
                match value {
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
    }
    Ok(())
}

pub fn reset(paths: &Paths, document: SettingsDocument) -> Result<()> {
    if Settings::reset(&paths.settings_dir, document)? {
        print_success(&format!("{} reset successfully.", label(document)));
    } else {
        print_warning(&format!(
            "No {} file found to reset.",
            label(document).to_lowercase()
        ));
    }
    Ok(())
}

fn masked(mut map: Map<String, Value>) -> Map<String, Value> {
    if let Some(password) = map.get_mut(PASSWORD_KEY) {
        *password = Value::String(MASK.to_string());
    }
    map
}
