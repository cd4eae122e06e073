//! Teacher availability templates, their expansion into week-gated slots,
//! and the lookup index the model builder reads.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::trace;
use thiserror::Error;

use crate::data::{parse_hm, Minutes, Pairing, Slot, SlotId, Subject, Week, Weekday};

/// One weekly availability template, expanded to a `Slot` per applicable week.
#[derive(Debug, Clone)]
pub struct Availability {
    pub subject: Subject,
    pub teacher: String,
    pub weekday: Weekday,
    pub start: String,
    pub end: String,
    pub weeks: BTreeSet<Week>,
}

impl Availability {
    pub fn new(
        subject: Subject,
        teacher: &str,
        weekday: Weekday,
        start: &str,
        end: &str,
        weeks: BTreeSet<Week>,
    ) -> Availability {
        Availability {
            subject,
            teacher: teacher.to_string(),
            weekday,
            start: start.to_string(),
            end: end.to_string(),
            weeks,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unparseable time {time:?} for {teacher} on {weekday}")]
    BadTime {
        teacher: String,
        weekday: Weekday,
        time: String,
    },
    #[error("empty interval {start}-{end} for {teacher} on {weekday}")]
    EmptyInterval {
        teacher: String,
        weekday: Weekday,
        start: String,
        end: String,
    },
    #[error("{teacher}: week {week} is outside the planning horizon")]
    WeekOutOfHorizon { teacher: String, week: Week },
    #[error("duplicate offering for {teacher} on {weekday} at {start} in week {week}")]
    DuplicateOffering {
        teacher: String,
        weekday: Weekday,
        start: String,
        week: Week,
    },
    #[error("week {week} offers no {pairing} slot, every group needs one")]
    UncoverableWeek { week: Week, pairing: Pairing },
}

/// Expands templates into one slot per applicable week, rejecting
/// inconsistent input before any model is built.
pub fn expand(templates: &[Availability], horizon: &[Week]) -> Result<Vec<Slot>, CatalogError> {
    let mut slots: Vec<Slot> = Vec::new();
    let mut seen: HashSet<(String, Weekday, Minutes, Week)> = HashSet::new();
    for t in templates {
        let start = parse_hm(&t.start).ok_or_else(|| CatalogError::BadTime {
            teacher: t.teacher.clone(),
            weekday: t.weekday,
            time: t.start.clone(),
        })?;
        let end = parse_hm(&t.end).ok_or_else(|| CatalogError::BadTime {
            teacher: t.teacher.clone(),
            weekday: t.weekday,
            time: t.end.clone(),
        })?;
        if end <= start {
            return Err(CatalogError::EmptyInterval {
                teacher: t.teacher.clone(),
                weekday: t.weekday,
                start: t.start.clone(),
                end: t.end.clone(),
            });
        }
        if let Some(&week) = t.weeks.iter().find(|&&w| !horizon.contains(&w)) {
            return Err(CatalogError::WeekOutOfHorizon {
                teacher: t.teacher.clone(),
                week,
            });
        }
        for &week in horizon {
            if !t.weeks.contains(&week) {
                continue;
            }
            if !seen.insert((t.teacher.clone(), t.weekday, start, week)) {
                return Err(CatalogError::DuplicateOffering {
                    teacher: t.teacher.clone(),
                    weekday: t.weekday,
                    start: t.start.clone(),
                    week,
                });
            }
            slots.push(Slot {
                id: slots.len(),
                subject: t.subject,
                teacher: t.teacher.clone(),
                weekday: t.weekday,
                start,
                end,
                week,
            });
        }
    }
    // every week must be coverable for both weekly quotas
    for &week in horizon {
        for pairing in [Pairing::MathsEnglish, Pairing::PhysicsEngineering] {
            if !slots
                .iter()
                .any(|s| s.week == week && s.subject.pairing() == pairing)
            {
                return Err(CatalogError::UncoverableWeek { week, pairing });
            }
        }
    }
    trace!("expanded {} templates into {} slots", templates.len(), slots.len());
    Ok(slots)
}

/// Slot buckets keyed the four ways the model builder needs them.
/// Owns the slots; built in one pass; never mutated afterwards.
#[derive(Debug)]
pub struct SlotIndex {
    slots: Vec<Slot>,
    by_week: HashMap<Week, Vec<SlotId>>,
    by_week_subject: HashMap<(Week, Subject), Vec<SlotId>>,
    by_week_teacher: HashMap<(Week, String), Vec<SlotId>>,
    by_week_day: HashMap<(Week, Weekday), Vec<SlotId>>,
    teachers: Vec<String>,
}

impl SlotIndex {
    pub fn new(slots: Vec<Slot>) -> SlotIndex {
        let mut by_week: HashMap<Week, Vec<SlotId>> = HashMap::new();
        let mut by_week_subject: HashMap<(Week, Subject), Vec<SlotId>> = HashMap::new();
        let mut by_week_teacher: HashMap<(Week, String), Vec<SlotId>> = HashMap::new();
        let mut by_week_day: HashMap<(Week, Weekday), Vec<SlotId>> = HashMap::new();
        let mut teachers: BTreeSet<String> = BTreeSet::new();
        for s in &slots {
            by_week.entry(s.week).or_default().push(s.id);
            by_week_subject
                .entry((s.week, s.subject))
                .or_default()
                .push(s.id);
            by_week_teacher
                .entry((s.week, s.teacher.clone()))
                .or_default()
                .push(s.id);
            by_week_day
                .entry((s.week, s.weekday))
                .or_default()
                .push(s.id);
            teachers.insert(s.teacher.clone());
        }
        SlotIndex {
            slots,
            by_week,
            by_week_subject,
            by_week_teacher,
            by_week_day,
            teachers: teachers.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// All teacher names, sorted.
    pub fn teachers(&self) -> &[String] {
        &self.teachers
    }

    pub fn week(&self, week: Week) -> impl Iterator<Item = &Slot> + Clone + '_ {
        self.bucket(self.by_week.get(&week))
    }

    pub fn week_subject(
        &self,
        week: Week,
        subject: Subject,
    ) -> impl Iterator<Item = &Slot> + Clone + '_ {
        self.bucket(self.by_week_subject.get(&(week, subject)))
    }

    pub fn week_teacher(
        &self,
        week: Week,
        teacher: &str,
    ) -> impl Iterator<Item = &Slot> + Clone + '_ {
        self.bucket(self.by_week_teacher.get(&(week, teacher.to_string())))
    }

    pub fn week_day(
        &self,
        week: Week,
        weekday: Weekday,
    ) -> impl Iterator<Item = &Slot> + Clone + '_ {
        self.bucket(self.by_week_day.get(&(week, weekday)))
    }

    fn bucket<'a>(
        &'a self,
        ids: Option<&'a Vec<SlotId>>,
    ) -> impl Iterator<Item = &'a Slot> + Clone + 'a {
        ids.into_iter().flatten().map(move |&id| &self.slots[id])
    }
}

fn every() -> BTreeSet<Week> {
    (1..=22).collect()
}

fn of(weeks: &[Week]) -> BTreeSet<Week> {
    weeks.iter().copied().collect()
}

fn except(weeks: &[Week]) -> BTreeSet<Week> {
    (1..=22).filter(|w| !weeks.contains(w)).collect()
}

/// The term's availability roster: weekly templates plus the agreed
/// replacements and indisposition weeks.
pub fn standard_catalog() -> Vec<Availability> {
    use Subject::{English, Maths, Physics, SystemsEngineering};
    use Weekday::{Monday, Thursday, Tuesday, Wednesday};

    let mut templates = vec![
        // Maths
        Availability::new(Maths, "Mme Goubet", Tuesday, "16:00", "17:00", every()),
        Availability::new(Maths, "Mme Goubet", Tuesday, "17:00", "18:00", every()),
        Availability::new(Maths, "Mr Pruvost", Thursday, "17:00", "18:00", every()),
        Availability::new(Maths, "Mme Coquet", Tuesday, "16:45", "17:45", every()),
        Availability::new(Maths, "Mr Jourdan", Wednesday, "16:00", "17:00", every()),
        Availability::new(Maths, "Mr Jourdan", Wednesday, "17:00", "18:00", every()),
        Availability::new(Maths, "Mr Gammelin", Wednesday, "15:00", "16:00", every()),
        Availability::new(Maths, "Mme Séverin", Wednesday, "16:00", "17:00", every()),
        // Systems engineering; weeks 6 and 12 Mr Brodelle covers Mr Roux's
        // Wednesday evening slot
        Availability::new(SystemsEngineering, "Mr Roux", Wednesday, "18:00", "19:00", except(&[6, 12])),
        Availability::new(SystemsEngineering, "Mr Brodelle", Wednesday, "15:00", "16:00", every()),
        Availability::new(SystemsEngineering, "Mr Brodelle", Wednesday, "16:00", "17:00", every()),
        Availability::new(SystemsEngineering, "Mr Brodelle", Thursday, "17:00", "18:00", every()),
        Availability::new(SystemsEngineering, "Mr Brodelle", Wednesday, "18:00", "19:00", of(&[6, 12])),
        // English
        Availability::new(English, "Mr Devin", Tuesday, "16:00", "17:00", every()),
        Availability::new(English, "Mr Devin", Tuesday, "17:00", "18:00", every()),
        Availability::new(English, "Mr Devin", Wednesday, "14:00", "15:00", every()),
        Availability::new(English, "Mr Devin", Wednesday, "16:00", "17:00", every()),
        Availability::new(English, "Mme Lachot", Monday, "17:00", "18:00", every()),
        Availability::new(English, "Mme Lachot", Monday, "18:00", "19:00", every()),
        Availability::new(English, "Mr Tallu", Tuesday, "16:00", "17:00", every()),
        Availability::new(English, "Mr Capes", Thursday, "17:00", "18:00", every()),
        // Physics; Mr Berteloot is out week 12
        Availability::new(Physics, "Mr Pauchet", Monday, "18:00", "19:00", every()),
        Availability::new(Physics, "Mr Cousin", Tuesday, "16:00", "17:00", every()),
        Availability::new(Physics, "Mr Brunier", Tuesday, "16:00", "17:00", every()),
        Availability::new(Physics, "Mr Zénag", Tuesday, "17:00", "18:00", every()),
        Availability::new(Physics, "Mr Zénag", Tuesday, "18:00", "19:00", every()),
        Availability::new(Physics, "Mr Berteloot", Wednesday, "15:00", "16:00", except(&[12])),
        Availability::new(
            Physics,
            "Mr Berteloot",
            Wednesday,
            "18:00",
            "19:00",
            of(&[1, 10, 11, 17, 18, 19, 20, 21, 22]),
        ),
        Availability::new(
            Physics,
            "Mr Berteloot",
            Wednesday,
            "14:00",
            "15:00",
            of(&[2, 3, 4, 5, 6, 7, 8, 9, 13, 14, 15, 16]),
        ),
        Availability::new(Physics, "Mr Cointault", Wednesday, "15:00", "16:00", every()),
        Availability::new(Physics, "Mr Labasque", Wednesday, "16:00", "17:00", every()),
        Availability::new(Physics, "Mme Cointault", Wednesday, "16:00", "17:00", every()),
        Availability::new(Physics, "Mme Cointault", Wednesday, "17:00", "18:00", every()),
        Availability::new(Physics, "Mr Huart", Thursday, "17:00", "18:00", every()),
    ];
    // week 12: Mr Zénag covers Mr Berteloot's Wednesday slots
    for (start, end) in [("14:00", "15:00"), ("15:00", "16:00"), ("18:00", "19:00")] {
        templates.push(Availability::new(Physics, "Mr Zénag", Wednesday, start, end, of(&[12])));
    }
    templates
}
