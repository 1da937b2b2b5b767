//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use depot_core::{
  ConsistencyWarning,
  asset::{ActivityEntry, Direction, FieldValue},
  store::StoredAsset,
};

use crate::client::{Located, Report, Summary};

fn when(ts: Option<DateTime<Utc>>) -> String {
  ts.map_or_else(|| "-".to_owned(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

fn state(direction: Option<Direction>) -> &'static str {
  match direction {
    Some(Direction::CheckIn) => "in",
    Some(Direction::CheckOut) => "out",
    None => "-",
  }
}

pub fn summary(summary: &Summary) -> String {
  let mut out = String::new();
  for store in &summary.stores {
    let marker = if store.loaded { "" } else { "  (loading)" };
    let _ = writeln!(out, "{:<12} {:>6}{marker}", store.store, store.count);
  }
  let _ = writeln!(out, "{:<12} {:>6}", "Total", summary.total_across_all_stores);
  out
}

pub fn activity(entries: &[ActivityEntry]) -> String {
  if entries.is_empty() {
    return "no activity\n".to_owned();
  }
  let mut out = String::new();
  for e in entries {
    let _ = writeln!(
      out,
      "{:<14} {:<11} {:<4} {}",
      e.tag,
      e.category,
      state(e.state()),
      when(e.last_activity())
    );
  }
  out
}

pub fn located(located: &Located) -> String {
  let record = &located.record;
  let mut out = String::new();
  let _ = writeln!(out, "{} is in {}", located.tag, located.category);
  let _ = writeln!(out, "  attribute: {}", record.attribute.as_deref().unwrap_or("-"));
  let _ = writeln!(out, "  location:  {}", record.location.as_deref().unwrap_or("-"));
  let _ = writeln!(out, "  checkIn:   {}", when(record.check_in));
  let _ = writeln!(out, "  checkOut:  {}", when(record.check_out));
  if let Some(warning) = &located.warning {
    let _ = writeln!(out, "warning: {warning}");
  }
  out
}

pub fn report(report: &Report) -> String {
  let mut line = match (report.kind.as_str(), report.from) {
    ("moved", Some(from)) => format!("{} moved {from} → {}", report.tag, report.category),
    (kind, _) => format!("{} {kind} in {}", report.tag, report.category),
  };
  if let Some(direction) = report.direction {
    let _ = write!(line, ", checked {} at {}", state(Some(direction)), when(report.at));
  }
  line.push('\n');
  line
}

pub fn stored(assets: &[StoredAsset]) -> String {
  let mut out = String::new();
  for asset in assets {
    let fields: Vec<String> = asset
      .document
      .iter()
      .map(|(name, value)| match value {
        FieldValue::String(s) => format!("{name}={s}"),
        FieldValue::Number(n) => format!("{name}={n}"),
        FieldValue::Timestamp(t) => format!("{name}={}", when(Some(*t))),
      })
      .collect();
    let _ = writeln!(out, "{:<14} {}", asset.tag, fields.join(" "));
  }
  out
}

pub fn duplicates(warnings: &[ConsistencyWarning]) -> String {
  if warnings.is_empty() {
    return "all stores consistent\n".to_owned();
  }
  warnings.iter().map(|w| format!("{w}\n")).collect()
}
