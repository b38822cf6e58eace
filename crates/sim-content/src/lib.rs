#![deny(warnings)]

//! Content tables: actions, events, items, skills, automations, jobs, mail
//! and location profiles.
//!
//! Tables are read from YAML, indexed by id and validated before the engine
//! sees them. Broken cross-references are reported as [`ContentError`]
//! immediately instead of being skipped at runtime.

pub mod defs;
mod validate;

pub use defs::{
    ActionDef, AutomationDef, EventTemplate, ItemDef, JobTemplate, Location, LocationProfile,
    LocationTrigger, MailTemplate, RateKey, RotableSeed, SkillDef, StartingKit,
};

use serde::Deserialize;
use sim_core::{EventCategory, TargetKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// The content pack compiled into the binary.
pub const BUILTIN_CONTENT: &str = include_str!("../../../assets/content/base.yaml");

#[derive(Debug, Error, PartialEq)]
pub enum ContentError {
    #[error("io error: {0}")]
    Io(String),
    #[error("content parse error: {0}")]
    Parse(String),
    #[error("duplicate {table} id: {id}")]
    DuplicateId { table: &'static str, id: String },
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("unknown event {id} (referenced by {context})")]
    UnknownEvent { context: String, id: String },
    #[error("unknown item {id} (referenced by {context})")]
    UnknownItem { context: String, id: String },
    #[error("unknown skill {id} (referenced by {context})")]
    UnknownSkill { context: String, id: String },
    #[error("unknown automation {id} (referenced by {context})")]
    UnknownAutomation { context: String, id: String },
    #[error("event {id} is {found:?}, expected {expected:?}")]
    CategoryMismatch {
        id: String,
        expected: EventCategory,
        found: EventCategory,
    },
    #[error("{context}: chance {value} is outside [0,1]")]
    InvalidChance { context: String, value: f64 },
    #[error("{context}: timed flag {flag} must be set through its timer")]
    TimedFlagInModifiers { context: String, flag: String },
    #[error("{context}: invalid value {value}")]
    InvalidValue { context: String, value: f64 },
    #[error("{context}: side effect needs a {kind:?} target the event cannot supply")]
    UntargetableSideEffect { context: String, kind: TargetKind },
}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        ContentError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ContentError {
    fn from(e: serde_yaml::Error) -> Self {
        ContentError::Parse(e.to_string())
    }
}

/// On-disk layout of one content file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentFile {
    items: Vec<ItemDef>,
    actions: Vec<ActionDef>,
    events: Vec<EventTemplate>,
    skills: Vec<SkillDef>,
    automations: Vec<AutomationDef>,
    jobs: Vec<JobTemplate>,
    mail: Vec<MailTemplate>,
    locations: BTreeMap<Location, LocationProfile>,
    starting: Option<StartingKit>,
}

/// Read-only, validated content. The engine only ever borrows it.
#[derive(Clone, Debug, Default)]
pub struct ContentTables {
    items: BTreeMap<String, ItemDef>,
    actions: BTreeMap<String, ActionDef>,
    events: BTreeMap<String, EventTemplate>,
    skills: BTreeMap<String, SkillDef>,
    automations: BTreeMap<String, AutomationDef>,
    jobs: Vec<JobTemplate>,
    mail: Vec<MailTemplate>,
    locations: BTreeMap<Location, LocationProfile>,
    starting: StartingKit,
}

fn index<T>(
    table: &'static str,
    target: &mut BTreeMap<String, T>,
    records: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<(), ContentError> {
    for record in records {
        let key = id(&record).to_string();
        if target.contains_key(&key) {
            return Err(ContentError::DuplicateId { table, id: key });
        }
        target.insert(key, record);
    }
    Ok(())
}

impl ContentTables {
    /// Parse and validate a single YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ContentError> {
        let mut tables = Self::default();
        tables.merge_yaml(text)?;
        tables.validate()?;
        Ok(tables)
    }

    /// The built-in pack.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_yaml_str(BUILTIN_CONTENT)
    }

    /// Load one YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let text = fs::read_to_string(path.as_ref())?;
        info!(path = %path.as_ref().display(), "loading content");
        Self::from_yaml_str(&text)
    }

    /// Load every `*.yaml` file in a directory, in file-name order. Ids must be
    /// unique across files.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ContentError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                paths.push(path);
            }
        }
        paths.sort();
        let mut tables = Self::default();
        for path in &paths {
            debug!(path = %path.display(), "merging content file");
            tables.merge_yaml(&fs::read_to_string(path)?)?;
        }
        tables.validate()?;
        info!(files = paths.len(), "content loaded");
        Ok(tables)
    }

    fn merge_yaml(&mut self, text: &str) -> Result<(), ContentError> {
        let file: ContentFile = serde_yaml::from_str(text)?;
        index("item", &mut self.items, file.items, |r| r.id.as_str())?;
        index("action", &mut self.actions, file.actions, |r| r.id.as_str())?;
        index("event", &mut self.events, file.events, |r| r.id.as_str())?;
        index("skill", &mut self.skills, file.skills, |r| r.id.as_str())?;
        index("automation", &mut self.automations, file.automations, |r| {
            r.id.as_str()
        })?;
        for job in file.jobs {
            if self.jobs.iter().any(|j| j.id == job.id) {
                return Err(ContentError::DuplicateId {
                    table: "job",
                    id: job.id,
                });
            }
            self.jobs.push(job);
        }
        for mail in file.mail {
            if self.mail.iter().any(|m| m.id == mail.id) {
                return Err(ContentError::DuplicateId {
                    table: "mail",
                    id: mail.id,
                });
            }
            self.mail.push(mail);
        }
        self.locations.extend(file.locations);
        if let Some(starting) = file.starting {
            self.starting = starting;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ContentError> {
        validate::validate(self)
    }

    pub fn action(&self, id: &str) -> Result<&ActionDef, ContentError> {
        self.actions
            .get(id)
            .ok_or_else(|| ContentError::UnknownAction(id.to_string()))
    }

    pub fn event(&self, id: &str) -> Result<&EventTemplate, ContentError> {
        self.events.get(id).ok_or_else(|| ContentError::UnknownEvent {
            context: "lookup".to_string(),
            id: id.to_string(),
        })
    }

    pub fn has_event(&self, id: &str) -> bool {
        self.events.contains_key(id)
    }

    /// Randomly selectable templates of a category, in id order.
    pub fn events_in(&self, category: EventCategory) -> impl Iterator<Item = &EventTemplate> {
        self.events
            .values()
            .filter(move |t| t.category == category && !t.chain_only)
    }

    pub fn skill(&self, id: &str) -> Result<&SkillDef, ContentError> {
        self.skills.get(id).ok_or_else(|| ContentError::UnknownSkill {
            context: "lookup".to_string(),
            id: id.to_string(),
        })
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillDef> {
        self.skills.values()
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn is_tool(&self, id: &str) -> bool {
        self.items.get(id).map(|i| i.tool).unwrap_or(false)
    }

    pub fn automation(&self, id: &str) -> Option<&AutomationDef> {
        self.automations.get(id)
    }

    pub fn jobs(&self) -> &[JobTemplate] {
        &self.jobs
    }

    pub fn mail_templates(&self) -> &[MailTemplate] {
        &self.mail
    }

    pub fn location(&self, location: Location) -> Option<&LocationProfile> {
        self.locations.get(&location)
    }

    pub fn starting(&self) -> &StartingKit {
        &self.starting
    }

    /// Product of `rate` multipliers over every unlocked skill.
    pub fn multiplier(&self, proficiency: &BTreeSet<String>, rate: RateKey) -> f64 {
        proficiency
            .iter()
            .filter_map(|id| self.skills.get(id))
            .filter_map(|s| s.multipliers.get(&rate))
            .product()
    }
}
