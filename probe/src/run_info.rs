use chrono::{DateTime, Utc};
use common::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const RUN_INFO_FILE: &str = "test_info.json";
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versions {
    pub linux_version: String,
    pub client_version: String,
    pub script_version: String,
}

impl Versions {
    pub fn detect(client_version: &str) -> Self {
        Self {
            linux_version: linux_version(),
            client_version: client_version.to_string(),
            script_version: SCRIPT_VERSION.to_string(),
        }
    }
}

/// Summary of one invocation, written next to the CSV outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub run_duration_seconds: i64,
    pub numbers_of_datasets: usize,
    pub versions: Versions,
}

impl TestRun {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        numbers_of_datasets: usize,
        versions: Versions,
    ) -> Self {
        Self {
            start_time,
            end_time,
            run_duration_seconds: (end_time - start_time).num_seconds(),
            numbers_of_datasets,
            versions,
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(dir.join(RUN_INFO_FILE), json)?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let contents = std::fs::read(dir.join(RUN_INFO_FILE))?;
        serde_json::from_slice(&contents).map_err(Into::into)
    }
}

/// `NAME VERSION_ID (VERSION_CODENAME)` from os-release, or OS/arch elsewhere.
pub fn linux_version() -> String {
    std::fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|contents| parse_os_release(&contents))
        .unwrap_or_else(|| format!("{} {}", std::env::consts::OS, std::env::consts::ARCH))
}

fn parse_os_release(contents: &str) -> Option<String> {
    let field = |key: &str| {
        contents.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
        })
    };

    let name = field("NAME")?;
    let mut version = name;
    if let Some(id) = field("VERSION_ID") {
        version = format!("{} {}", version, id);
    }
    if let Some(codename) = field("VERSION_CODENAME").filter(|c| !c.is_empty()) {
        version = format!("{} ({})", version, codename);
    }
    Some(version)
}
