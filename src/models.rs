use crate::clock::Elapsed;
use crate::stats::JourneyStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Pazartesi")]
    Monday,
    #[serde(rename = "Salı")]
    Tuesday,
    #[serde(rename = "Çarşamba")]
    Wednesday,
    #[serde(rename = "Perşembe")]
    Thursday,
    #[serde(rename = "Cuma")]
    Friday,
    #[serde(rename = "Cumartesi")]
    Saturday,
    #[serde(rename = "Pazar")]
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

    /// Name used as the key in persisted blobs.
    pub fn key(self) -> &'static str {
        match self {
            Weekday::Monday => "Pazartesi",
            Weekday::Tuesday => "Salı",
            Weekday::Wednesday => "Çarşamba",
            Weekday::Thursday => "Perşembe",
            Weekday::Friday => "Cuma",
            Weekday::Saturday => "Cumartesi",
            Weekday::Sunday => "Pazar",
        }
    }

    fn english(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Accepts the persisted key or the English day name.
    pub fn from_key(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.key() == raw || day.english().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    pub emoji: String,
    pub label: String,
}

impl Mood {
    pub fn new(emoji: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            label: label.into(),
        }
    }
}

pub const MOOD_CYCLE: [(&str, &str); 4] = [
    ("😺", "Sakin"),
    ("😸", "Hafif"),
    ("😿", "Düşük"),
    ("😾", "Gergin"),
];

/// Next mood in the cycle; an empty slot or an unknown label starts over.
pub fn next_mood(current: Option<&Mood>) -> Mood {
    let next = current
        .and_then(|mood| MOOD_CYCLE.iter().position(|(_, label)| *label == mood.label))
        .map(|index| (index + 1) % MOOD_CYCLE.len())
        .unwrap_or(0);
    let (emoji, label) = MOOD_CYCLE[next];
    Mood::new(emoji, label)
}

pub type WeekMoods = BTreeMap<Weekday, Option<Mood>>;

pub fn default_moods() -> WeekMoods {
    Weekday::ALL.into_iter().map(|day| (day, None)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKey {
    Positive,
    Mood,
    Article,
    Reflection,
}

impl TaskKey {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKey::Positive => "positive",
            TaskKey::Mood => "mood",
            TaskKey::Article => "article",
            TaskKey::Reflection => "reflection",
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "positive" => Ok(TaskKey::Positive),
            "mood" => Ok(TaskKey::Mood),
            "article" => Ok(TaskKey::Article),
            "reflection" => Ok(TaskKey::Reflection),
            other => Err(format!("unknown task '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DailyTasks {
    pub positive: bool,
    pub mood: bool,
    pub article: bool,
    pub reflection: bool,
}

impl DailyTasks {
    pub fn get(&self, task: TaskKey) -> bool {
        match task {
            TaskKey::Positive => self.positive,
            TaskKey::Mood => self.mood,
            TaskKey::Article => self.article,
            TaskKey::Reflection => self.reflection,
        }
    }

    pub fn flag_mut(&mut self, task: TaskKey) -> &mut bool {
        match task {
            TaskKey::Positive => &mut self.positive,
            TaskKey::Mood => &mut self.mood,
            TaskKey::Article => &mut self.article,
            TaskKey::Reflection => &mut self.reflection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackerCounts {
    pub urges: u64,
    pub wins: u64,
    pub smoked: u64,
    pub breath: u64,
    pub notes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerLog {
    pub intensity: u8,
    pub emotion: String,
    pub situation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramState {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_days: BTreeSet<u32>,
    #[serde(default)]
    pub trigger_logs: Vec<TriggerLog>,
    #[serde(default = "default_moods", deserialize_with = "merge_moods")]
    pub moods: WeekMoods,
    #[serde(default)]
    pub daily_tasks: DailyTasks,
    #[serde(default)]
    pub tracker_counts: TrackerCounts,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl ProgramState {
    pub fn started_at(start_date: DateTime<Utc>) -> Self {
        Self {
            start_date: Some(start_date),
            completed_days: BTreeSet::new(),
            trigger_logs: Vec::new(),
            moods: default_moods(),
            daily_tasks: DailyTasks::default(),
            tracker_counts: TrackerCounts::default(),
            notes: Vec::new(),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(parse_timestamp))
}

fn merge_moods<'de, D>(deserializer: D) -> Result<WeekMoods, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Option::<BTreeMap<String, Option<Mood>>>::deserialize(deserializer)?;
    let mut moods = default_moods();
    for (key, mood) in stored.unwrap_or_default() {
        if let Some(day) = Weekday::from_key(&key) {
            moods.insert(day, mood);
        }
    }
    Ok(moods)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MembershipSource {
    Web,
    Revenuecat,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MembershipStatus {
    pub is_active: bool,
    #[serde(default)]
    pub source: MembershipSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    pub intensity: i64,
    pub emotion: String,
    pub situation: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySnapshot {
    pub state: ProgramState,
    pub current_day: u32,
    pub elapsed: Elapsed,
    pub stats: JourneyStats,
    pub longest_streak: u32,
    pub paywall_trigger_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub journey: JourneySnapshot,
    pub show_paywall: bool,
}
