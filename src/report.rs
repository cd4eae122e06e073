//! Turns a solved assignment into the published timetable: one row per
//! occupied slot instance, groups merged per identical slot, sorted by
//! subject, day, teacher, week and time.

use std::collections::BTreeMap;
use std::io;

use itertools::Itertools;
use serde::Serialize;

use crate::catalog::SlotIndex;
use crate::data::{format_hm, Group, Minutes, Subject, Week, Weekday};
use crate::model::ColleModel;
use crate::solver::Valuation;

/// One line of the published timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Day")]
    pub day: String,
    #[serde(rename = "Teacher")]
    pub teacher: String,
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
    #[serde(rename = "Week")]
    pub week: Week,
    #[serde(rename = "Groups")]
    pub groups: String,
}

type SlotKey = (Subject, Weekday, String, Week, Minutes, Minutes);

pub fn extract(model: &ColleModel, index: &SlotIndex, valuation: &Valuation) -> Vec<ReportRow> {
    // the key ordering is exactly the published sort order
    let mut occupied: BTreeMap<SlotKey, Vec<Group>> = BTreeMap::new();
    for (week, group, slot) in model.occupied(valuation) {
        let s = index.slot(slot);
        occupied
            .entry((s.subject, s.weekday, s.teacher.clone(), week, s.start, s.end))
            .or_default()
            .push(group);
    }
    occupied
        .into_iter()
        .map(|((subject, day, teacher, week, start, end), mut groups)| {
            groups.sort_unstable();
            ReportRow {
                subject: subject.to_string(),
                day: day.to_string(),
                teacher,
                start: format_hm(start),
                end: format_hm(end),
                week,
                groups: groups.iter().join(", "),
            }
        })
        .collect()
}

pub fn write_csv<W: io::Write>(rows: &[ReportRow], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_the_group_list() {
        let rows = vec![ReportRow {
            subject: "Maths".to_string(),
            day: "Tuesday".to_string(),
            teacher: "Mme Goubet".to_string(),
            start: "16:00".to_string(),
            end: "17:00".to_string(),
            week: 3,
            groups: "1, 12".to_string(),
        }];
        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Subject,Day,Teacher,Start,End,Week,Groups\nMaths,Tuesday,Mme Goubet,16:00,17:00,3,\"1, 12\"\n"
        );
    }
}
