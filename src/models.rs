use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Date format used on the wire and in the edit form.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Activity category of a plan.
///
/// The remote collection may contain values written by newer clients, so
/// unknown strings are carried through verbatim (`Other`) and rendered with a
/// fallback label/color instead of being rejected. Round-tripping an unknown
/// value must not rewrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Food,
    Movie,
    Travel,
    Other(String),
}

impl EventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "food" => EventKind::Food,
            "movie" => EventKind::Movie,
            "travel" => EventKind::Travel,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Food => "food",
            EventKind::Movie => "movie",
            EventKind::Travel => "travel",
            EventKind::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventKind::Food => "Ăn uống",
            EventKind::Movie => "Xem phim",
            EventKind::Travel => "Đi chơi",
            EventKind::Other(s) => s,
        }
    }

    /// Display color; unknown kinds get the neutral fallback.
    pub fn color(&self) -> &'static str {
        match self {
            EventKind::Food => "#f43f5e",
            EventKind::Movie => "#a855f7",
            EventKind::Travel => "#3b82f6",
            EventKind::Other(_) => "#94a3b8",
        }
    }
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::Food
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::parse(&s))
    }
}

/// Wire shape of one plan record as stored in the remote collection.
/// `date` stays an ISO `YYYY-MM-DD` string on the wire; `description` and
/// `images` may be absent in old records and decode to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub description: String,
    pub date: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// One decoded plan with its store-assigned id. The id is assigned once at
/// creation and never changes for the record's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEvent {
    pub id: String,
    pub title: String,
    pub kind: EventKind,
    pub description: String,
    pub date: NaiveDate,
    pub images: Vec<String>,
}

impl PlanEvent {
    pub fn from_stored(id: String, rec: StoredEvent) -> anyhow::Result<Self> {
        let date = parse_plan_date(&rec.date)
            .with_context(|| format!("record {} has invalid date {:?}", id, rec.date))?;
        Ok(Self {
            id,
            title: rec.title,
            kind: rec.kind,
            description: rec.description,
            date,
            images: rec.images,
        })
    }

    pub fn to_stored(&self) -> StoredEvent {
        StoredEvent {
            title: self.title.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            date: format_plan_date(self.date),
            images: self.images.clone(),
        }
    }
}

/// In-progress form state for creating or editing a plan. `date` is kept in
/// the editable string form and only validated on save.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub kind: EventKind,
    pub description: String,
    pub date: String,
    pub images: Vec<String>,
}

impl EventDraft {
    /// Fresh form defaulting to the given date (typically today).
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            kind: EventKind::default(),
            description: String::new(),
            date: format_plan_date(today),
            images: Vec::new(),
        }
    }

    /// Pre-populate the form from an existing plan for editing.
    pub fn from_event(ev: &PlanEvent) -> Self {
        Self {
            title: ev.title.clone(),
            kind: ev.kind.clone(),
            description: ev.description.clone(),
            date: format_plan_date(ev.date),
            images: ev.images.clone(),
        }
    }

    /// Validate the form into a storable record: non-empty title, parseable
    /// date. Image list is normalized to always be present.
    pub fn validate(&self) -> anyhow::Result<StoredEvent> {
        let title = self.title.trim();
        if title.is_empty() {
            anyhow::bail!("title must not be empty");
        }
        let date = parse_plan_date(&self.date)?;
        Ok(StoredEvent {
            title: title.to_string(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            date: format_plan_date(date),
            images: self.images.clone(),
        })
    }
}

pub fn parse_plan_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date {:?} (expected YYYY-MM-DD)", s))
}

pub fn format_plan_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}
