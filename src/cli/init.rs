use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path, SourceKind};
use crate::source::JsonSource;

pub fn run(data_dir: Option<String>, source: Option<SourceKind>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() {
        // First run: prompt for data dir
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(source) = source {
        settings.source = source;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    match settings.source {
        SourceKind::Sqlite => {
            let conn = get_connection(&resolved.join(DB_FILE))?;
            init_db(&conn)?;
        }
        SourceKind::Json => JsonSource::new(&resolved).ensure_collections()?,
    }

    println!(
        "Initialized runway at {} ({} store)",
        resolved.display(),
        settings.source
    );
    Ok(())
}
