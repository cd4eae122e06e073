use std::fmt;

// Type aliases for clarity
pub type Week = u32;
pub type Group = u32;
pub type SlotId = usize;
/// Minutes since midnight.
pub type Minutes = u16;

/// The four colle subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subject {
    Maths,
    English,
    Physics,
    SystemsEngineering,
}

impl Subject {
    /// Which of the two weekly quota pools this subject counts towards.
    pub fn pairing(self) -> Pairing {
        match self {
            Subject::Maths | Subject::English => Pairing::MathsEnglish,
            Subject::Physics | Subject::SystemsEngineering => Pairing::PhysicsEngineering,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Subject::Maths => "Maths",
            Subject::English => "English",
            Subject::Physics => "Physics",
            Subject::SystemsEngineering => "Systems Engineering",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every week a group sits exactly one colle from each pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pairing {
    MathsEnglish,
    PhysicsEngineering,
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pairing::MathsEnglish => "Maths/English",
            Pairing::PhysicsEngineering => "Physics/Systems Engineering",
        })
    }
}

/// Weekday with its fixed ranking for report sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses an "HH:MM" time of day.
pub fn parse_hm(text: &str) -> Option<Minutes> {
    let (h, m) = text.split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_hm(t: Minutes) -> String {
    format!("{:02}:{:02}", t / 60, t % 60)
}

/// A single offering that can host at most one group: one teacher, one
/// time interval, one week. The same weekly template yields one slot per
/// applicable week since availability is week-gated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    pub subject: Subject,
    pub teacher: String,
    pub weekday: Weekday,
    pub start: Minutes,
    pub end: Minutes,
    pub week: Week,
}

impl Slot {
    /// Half-open interval intersection, same day only.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.weekday == other.weekday && self.start < other.end && other.start < self.end
    }

    /// One slot ends exactly when the other starts, same day.
    pub fn back_to_back(&self, other: &Slot) -> bool {
        self.weekday == other.weekday && (self.end == other.start || other.end == self.start)
    }
}
