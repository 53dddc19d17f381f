pub mod client;

pub use client::EscriptoriumClient;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A page ("part") of an eScriptorium document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    pub pk: u64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub image: Option<PartImage>,
}

impl Part {
    /// File name without directories or extension, used to pair a part
    /// with its exported ALTO file.
    pub fn stem(&self) -> String {
        let name = self.filename.rsplit('/').next().unwrap_or(&self.filename);
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartImage {
    pub uri: String,
}

pub trait DocumentHost {
    fn list_parts(&self, document: u64) -> Result<Vec<Part>>;
    fn fetch_image(&self, part: &Part) -> Result<Vec<u8>>;
    fn upload_layout(
        &self,
        document: u64,
        transcription: &str,
        file_name: &str,
        alto: String,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(filename: &str) -> Part {
        Part {
            pk: 1,
            filename: filename.to_string(),
            image: None,
        }
    }

    #[test]
    fn stem_strips_directories_and_extension() {
        assert_eq!(part("documents/12/SM_NPQ_C01_006_1.jpg").stem(), "SM_NPQ_C01_006_1");
        assert_eq!(part("scan.v2.tif").stem(), "scan.v2");
        assert_eq!(part("noext").stem(), "noext");
        assert_eq!(part(".hidden").stem(), ".hidden");
    }
}
