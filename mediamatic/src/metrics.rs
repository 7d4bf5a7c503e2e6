//! Mock engagement metrics
//!
//! Numbers are uniformly random and carry no analytical meaning. Generation
//! takes an injectable RNG so tables can be reproduced in tests.

use chrono::{Duration, Local, NaiveDate};
use rand::Rng;
use serde::Serialize;
use std::io;
use thiserror::Error;

/// Errors from metrics export
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}

/// Reporting window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Period {
    #[default]
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
}

impl Period {
    /// Parse "last_30_days" or "Last 30 Days"; anything unrecognised is the 7 day window
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "last_30_days" => Period::Last30Days,
            "last_90_days" => Period::Last90Days,
            _ => Period::Last7Days,
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Period::Last7Days => 7,
            Period::Last30Days => 30,
            Period::Last90Days => 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PostType {
    Reel,
    StaticImage,
    Carousel,
}

impl PostType {
    pub const ALL: [PostType; 3] = [PostType::Reel, PostType::StaticImage, PostType::Carousel];

    pub fn label(&self) -> &'static str {
        match self {
            PostType::Reel => "Reel",
            PostType::StaticImage => "Static Image",
            PostType::Carousel => "Carousel",
        }
    }
}

/// A numeric column of the metrics table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    Likes,
    Comments,
    Shares,
    Views,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Likes, Metric::Comments, Metric::Shares, Metric::Views];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "likes" => Some(Metric::Likes),
            "comments" => Some(Metric::Comments),
            "shares" => Some(Metric::Shares),
            "views" => Some(Metric::Views),
            _ => None,
        }
    }

    /// Parse a comma separated list, rejecting unknown names
    pub fn parse_list(s: &str) -> Result<Vec<Self>, MetricsError> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| Metric::parse(part).ok_or_else(|| MetricsError::UnknownMetric(part.trim().to_string())))
            .collect()
    }

    pub fn header(&self) -> &'static str {
        match self {
            Metric::Likes => "Likes",
            Metric::Comments => "Comments",
            Metric::Shares => "Shares",
            Metric::Views => "Views",
        }
    }

    /// Half-open range the mock value is drawn from
    fn range(&self) -> std::ops::Range<u32> {
        match self {
            Metric::Likes => 500..5000,
            Metric::Comments => 50..500,
            Metric::Shares => 1000..50000,
            Metric::Views => 1000..10000,
        }
    }
}

/// One day of one post type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub date: NaiveDate,
    pub post_type: PostType,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub views: u32,
}

impl MetricRow {
    pub fn value(&self, metric: Metric) -> u32 {
        match metric {
            Metric::Likes => self.likes,
            Metric::Comments => self.comments,
            Metric::Shares => self.shares,
            Metric::Views => self.views,
        }
    }
}

/// Generate a table for `period` ending today
pub fn generate(period: Period) -> Vec<MetricRow> {
    generate_with(period, Local::now().date_naive(), &mut rand::thread_rng())
}

/// Generate a table for `period` ending on `end` (inclusive), oldest day first
pub fn generate_with<R: Rng>(period: Period, end: NaiveDate, rng: &mut R) -> Vec<MetricRow> {
    let days = i64::from(period.days());
    let mut rows = Vec::with_capacity(days as usize * PostType::ALL.len());

    for offset in (0..days).rev() {
        let date = end - Duration::days(offset);
        for post_type in PostType::ALL {
            rows.push(MetricRow {
                date,
                post_type,
                likes: rng.gen_range(Metric::Likes.range()),
                comments: rng.gen_range(Metric::Comments.range()),
                shares: rng.gen_range(Metric::Shares.range()),
                views: rng.gen_range(Metric::Views.range()),
            });
        }
    }

    rows
}

/// Column totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTotals {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
}

impl MetricTotals {
    fn add(&mut self, row: &MetricRow) {
        self.likes += u64::from(row.likes);
        self.comments += u64::from(row.comments);
        self.shares += u64::from(row.shares);
        self.views += u64::from(row.views);
    }
}

/// Totals over a whole table and per post type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub rows: usize,
    pub totals: MetricTotals,
    pub by_post_type: Vec<(PostType, MetricTotals)>,
}

pub fn summarize(rows: &[MetricRow]) -> MetricsSummary {
    let mut totals = MetricTotals::default();
    let mut by_post_type: Vec<(PostType, MetricTotals)> = PostType::ALL
        .iter()
        .map(|p| (*p, MetricTotals::default()))
        .collect();

    for row in rows {
        totals.add(row);
        if let Some((_, t)) = by_post_type.iter_mut().find(|(p, _)| *p == row.post_type) {
            t.add(row);
        }
    }

    MetricsSummary {
        rows: rows.len(),
        totals,
        by_post_type,
    }
}

/// Write the full table as CSV
pub fn write_csv<W: io::Write>(rows: &[MetricRow], writer: W) -> Result<(), MetricsError> {
    write_selected_csv(rows, &Metric::ALL, writer)
}

/// Write `Date`, `Post Type` and the selected metric columns, in the order given
pub fn write_selected_csv<W: io::Write>(
    rows: &[MetricRow],
    metrics: &[Metric],
    writer: W,
) -> Result<(), MetricsError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Date", "Post Type"];
    header.extend(metrics.iter().map(|m| m.header()));
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string(), row.post_type.label().to_string()];
        record.extend(metrics.iter().map(|m| row.value(*m).to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// CSV text for the selected metrics
pub fn to_csv_string(rows: &[MetricRow], metrics: &[Metric]) -> Result<String, MetricsError> {
    let mut buf = Vec::new();
    write_selected_csv(rows, metrics, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
