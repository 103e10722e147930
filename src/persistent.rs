use anyhow::Result;
use std::path::PathBuf;

/// Most recent search queries to keep across sessions.
const MAX_RECENT_SEARCHES: usize = 20;

/// Persistent user state. If the data structure changes, add a new version
/// variant to stay compatible with data saved by older builds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum PersistentData {
    V1(PersistentDataV1),
}

impl Default for PersistentData {
    fn default() -> Self {
        PersistentData::V1(PersistentDataV1::default())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PersistentDataV1 {
    recent_searches: Vec<String>,
}

pub fn save_persistent_data(recent_searches: &[String]) -> Result<()> {
    let data = PersistentData::V1(PersistentDataV1 {
        recent_searches: recent_searches.to_vec(),
    });
    write_data(&data)
}

pub fn load_persistent_data() -> Result<Vec<String>> {
    let data = read_data()?;
    let PersistentData::V1(data) = data;
    Ok(data.recent_searches)
}

/// Push a query to the front of the recent list, dropping duplicates and
/// clamping the length.
pub fn remember_search(recent_searches: &mut Vec<String>, query: &str) {
    recent_searches.retain(|existing| existing != query);
    recent_searches.insert(0, query.to_string());
    recent_searches.truncate(MAX_RECENT_SEARCHES);
}

fn write_data(data: &PersistentData) -> Result<()> {
    let persistent_data_file = persistent_data_file_path();
    println!(
        "Writing persistent data to {}",
        persistent_data_file.display()
    );

    std::fs::create_dir_all(persistent_data_folder())?;

    // Write to a temporary file first, then rename over the real one, so a
    // crash mid-write can't leave a truncated file behind.
    let write_file_path = temporary_write_file_path();
    let mut file = std::fs::File::create(&write_file_path)?;
    serde_json::to_writer_pretty(&mut file, &data)?;
    file.sync_all()?;
    std::fs::rename(&write_file_path, persistent_data_file)?;

    Ok(())
}

fn read_data() -> Result<PersistentData> {
    let path = persistent_data_file_path();
    if !path.try_exists()? {
        return Ok(PersistentData::default());
    }
    println!("Reading persistent data from {}", path.display());
    let file = std::fs::File::open(&path)?;
    let data: PersistentData = serde_json::from_reader(file)?;
    Ok(data)
}

fn persistent_data_folder() -> PathBuf {
    directories::ProjectDirs::from("org", "tracelens", "tracelens")
        .unwrap()
        .data_dir()
        .to_path_buf()
}

fn persistent_data_file_path() -> PathBuf {
    persistent_data_folder().join("persistent_data.json")
}

fn temporary_write_file_path() -> PathBuf {
    let random_number: u64 = rand::random();
    persistent_data_folder().join(format!("temporary_persistent_data{}.json", random_number))
}
