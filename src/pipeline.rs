use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::actions::extract_report_items;
use crate::classify::{classify, RecordContext};
use crate::config::{CenterConfig, Config};
use crate::education::extract_education_records;
use crate::grid::{TabularSource, Workbook};
use crate::models::{EducationRecord, PostRecord, ReportItem, UnderperformanceRecord};
use crate::normalize::{nfc, parse_sheet_period};
use crate::posts::{to_record, PostSource};
use crate::reconcile::{file_period, reconcile, select_month_end, DedupContext, SourceFile};
use crate::signals::scan_sheet;

#[derive(Debug)]
pub enum FileOutcome {
    Extracted { records: Vec<UnderperformanceRecord> },
    Failed { cause: String },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub center: String,
    pub file_name: String,
    pub month: u32,
    pub week: u32,
    /// Records kept after dedup.
    pub kept: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CenterSelection {
    pub center: String,
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Default)]
pub struct UnderperformanceRun {
    pub records: Vec<UnderperformanceRecord>,
    pub files: Vec<FileReport>,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct PostRun {
    pub posts: Vec<PostRecord>,
    pub actions: Vec<ReportItem>,
    pub education: Vec<EducationRecord>,
    /// (center, cause) for each center whose export could not be read.
    pub failed_centers: Vec<(String, String)>,
}

/// Workbook candidates for a center under `<root>/<center name>`, in scan
/// order. Names without a month, or without any of the center's keywords,
/// are left out.
pub fn discover(root: &Path, center: &CenterConfig) -> Result<Vec<SourceFile>> {
    let center_dir = root.join(&center.name);
    if !center_dir.is_dir() {
        warn!(center = %center.name, dir = %center_dir.display(), "no workbook directory");
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(&center_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("scan {}", center_dir.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let file_name = nfc(&entry.file_name().to_string_lossy());
        if !center.matches_file(&file_name) {
            debug!(file = %file_name, "no center keyword");
            continue;
        }
        let Some((month, week)) = file_period(&file_name) else {
            debug!(file = %file_name, "no period in name");
            continue;
        };
        candidates.push(SourceFile {
            month,
            week,
            file_name,
            path: entry.into_path(),
        });
    }
    Ok(candidates)
}

pub fn select_files(config: &Config, root: &Path) -> Result<Vec<CenterSelection>> {
    config
        .centers
        .iter()
        .map(|center| {
            let files = select_month_end(discover(root, center)?);
            Ok(CenterSelection {
                center: center.name.clone(),
                files,
            })
        })
        .collect()
}

pub fn extract_workbook(
    workbook: &Workbook,
    center: &CenterConfig,
    month: u32,
    season_start_year: i32,
) -> Vec<UnderperformanceRecord> {
    let mut records = Vec::new();
    for sheet in &workbook.sheets {
        if center.layout.skips_sheet(&sheet.name) {
            debug!(sheet = %sheet.name, "summary sheet skipped");
            continue;
        }
        let Some(period) = parse_sheet_period(&sheet.name) else {
            debug!(sheet = %sheet.name, "sheet name has no period");
            continue;
        };
        if period.month != month {
            continue;
        }

        let scan = scan_sheet(sheet, center.layout, &period);
        for skipped in &scan.skipped {
            warn!(workbook = %workbook.name, skipped = %skipped, "layout not located");
        }

        let week = period.reporting_week(season_start_year);
        let ctx = RecordContext {
            center: &center.name,
            week: &week,
            source_file: &workbook.name,
        };
        records.extend(scan.tuples.into_iter().map(|tuple| classify(tuple, &ctx)));
    }
    records
}

/// Load, extract and release one workbook. Loader failures become
/// [`FileOutcome::Failed`].
pub fn process_workbook(
    source: &dyn TabularSource,
    file: &SourceFile,
    center: &CenterConfig,
    season_start_year: i32,
) -> FileOutcome {
    match source.load(&file.path) {
        Ok(workbook) => FileOutcome::Extracted {
            records: extract_workbook(&workbook, center, file.month, season_start_year),
        },
        Err(err) => FileOutcome::Failed {
            cause: err.to_string(),
        },
    }
}

pub fn run_underperforming(
    config: &Config,
    root: &Path,
    source: &dyn TabularSource,
) -> Result<UnderperformanceRun> {
    let mut run = UnderperformanceRun::default();
    let mut dedup = DedupContext::default();

    for selection in select_files(config, root)? {
        let Some(center) = config.center(&selection.center) else {
            continue;
        };
        info!(center = %center.name, files = selection.files.len(), "processing workbooks");

        for file in &selection.files {
            let mut report = FileReport {
                center: center.name.clone(),
                file_name: file.file_name.clone(),
                month: file.month,
                week: file.week,
                kept: 0,
                failure: None,
            };
            match process_workbook(source, file, center, config.season_start_year) {
                FileOutcome::Extracted { records } => {
                    let (kept, dropped) = reconcile(&mut dedup, records);
                    info!(file = %file.file_name, kept = kept.len(), dropped, "workbook extracted");
                    report.kept = kept.len();
                    run.duplicates += dropped;
                    run.records.extend(kept);
                }
                FileOutcome::Failed { cause } => {
                    warn!(file = %file.file_name, %cause, "workbook failed");
                    report.failure = Some(cause);
                }
            }
            run.files.push(report);
        }
    }

    info!(records = run.records.len(), duplicates = run.duplicates, "underperformance stage done");
    Ok(run)
}

pub fn run_posts(config: &Config, source: &dyn PostSource, parsed_at: NaiveDateTime) -> PostRun {
    let mut run = PostRun::default();
    for center in &config.centers {
        let posts = match source.posts(center) {
            Ok(posts) => posts,
            Err(err) => {
                warn!(center = %center.name, error = %err, "post export unavailable");
                run.failed_centers.push((center.name.clone(), err.to_string()));
                continue;
            }
        };

        let actions = extract_report_items(&posts);
        let education = extract_education_records(&posts);
        info!(
            center = %center.name,
            posts = posts.len(),
            actions = actions.len(),
            education = education.len(),
            "posts extracted"
        );

        run.posts.extend(posts.iter().map(|post| to_record(post, parsed_at)));
        run.actions.extend(actions);
        run.education.extend(education);
    }
    run
}
