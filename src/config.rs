use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Structural family of an underperformance workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// One header row, one repeating column group per week.
    FixedOffset,
    /// Stacked business-vertical sections, each with its own sub-header.
    SectionRelative,
}

impl LayoutKind {
    /// Sheet-name keywords marking summary sheets that carry no agent rows.
    pub fn skip_keywords(self) -> &'static [&'static str] {
        match self {
            LayoutKind::FixedOffset => &["개요", "요약"],
            LayoutKind::SectionRelative => &["개요", "요약", "기준"],
        }
    }

    pub fn skips_sheet(self, sheet_name: &str) -> bool {
        self.skip_keywords()
            .iter()
            .any(|keyword| sheet_name.contains(keyword))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterConfig {
    pub name: String,
    pub layout: LayoutKind,
    /// A workbook belongs to this center when its name contains any keyword.
    pub file_keywords: Vec<String>,
    /// Board export for this center, relative to the source root.
    pub posts_file: String,
}

impl CenterConfig {
    pub fn matches_file(&self, file_name: &str) -> bool {
        self.file_keywords
            .iter()
            .any(|keyword| file_name.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calendar year in which the reporting season starts (July).
    pub season_start_year: i32,
    pub centers: Vec<CenterConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            season_start_year: 2025,
            centers: vec![
                CenterConfig {
                    name: "용산".to_string(),
                    layout: LayoutKind::FixedOffset,
                    file_keywords: vec!["미흡".to_string(), "부진".to_string()],
                    posts_file: "posts/용산.csv".to_string(),
                },
                CenterConfig {
                    name: "광주".to_string(),
                    layout: LayoutKind::SectionRelative,
                    file_keywords: vec!["집중관리".to_string()],
                    posts_file: "posts/광주.csv".to_string(),
                },
            ],
        }
    }
}

impl Config {
    /// Read a JSON config file, or fall back to defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.centers.is_empty() {
            return Err(anyhow!("at least one center must be configured"));
        }
        if !(2000..=2100).contains(&self.season_start_year) {
            return Err(anyhow!(
                "season_start_year out of range: {}",
                self.season_start_year
            ));
        }

        let mut names = HashSet::new();
        for center in &self.centers {
            if center.name.trim().is_empty() {
                return Err(anyhow!("center name must not be empty"));
            }
            if !names.insert(center.name.as_str()) {
                return Err(anyhow!("duplicate center: {}", center.name));
            }
            if center.file_keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(anyhow!("center {} has no file keywords", center.name));
            }
        }
        Ok(())
    }

    pub fn center(&self, name: &str) -> Option<&CenterConfig> {
        self.centers.iter().find(|center| center.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.center("광주").map(|c| c.layout),
            Some(LayoutKind::SectionRelative)
        );
    }

    #[test]
    fn rejects_duplicate_centers() {
        let mut config = Config::default();
        let copy = config.centers[0].clone();
        config.centers.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_center_without_keywords() {
        let mut config = Config::default();
        config.centers[1].file_keywords = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_json_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "season_start_year": 2026 }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.season_start_year, 2026);
        assert_eq!(config.centers.len(), 2);
    }

    #[test]
    fn summary_sheets_are_skipped_per_layout() {
        assert!(LayoutKind::FixedOffset.skips_sheet("요약"));
        assert!(!LayoutKind::FixedOffset.skips_sheet("선정기준"));
        assert!(LayoutKind::SectionRelative.skips_sheet("선정기준"));
        assert!(!LayoutKind::SectionRelative.skips_sheet("10월 2주차"));
    }

    #[test]
    fn file_keywords_match_by_containment() {
        let config = Config::default();
        let center = config.center("용산").unwrap();
        assert!(center.matches_file("용산 부진상담사 10월 4주차"));
        assert!(!center.matches_file("집중관리 대상 현황_10월"));
    }
}
