//! Language selection and localized text lookup.
//!
//! The current language lives in a [`LanguageContext`] that is handed to every
//! component needing it, instead of a process-wide singleton.

pub mod catalog;

pub use catalog::{LocalizedText, TextCatalog};

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::events::{Event, EventBus, Subscription};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "pt-br")]
    PtBr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::EnUs, Language::PtBr];

    pub fn code(self) -> &'static str {
        match self {
            Language::EnUs => "en-us",
            Language::PtBr => "pt-br",
        }
    }

    /// The next language in [`Language::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Configuration(format!("unknown language '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LanguageEvent {
    Updated { language: Language },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LanguageEventKind {
    Updated,
}

impl Event for LanguageEvent {
    type Kind = LanguageEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            LanguageEvent::Updated { .. } => LanguageEventKind::Updated,
        }
    }
}

/// Shared handle to the selected language. Clones observe the same state.
#[derive(Clone, Default)]
pub struct LanguageContext {
    current: Rc<Cell<Language>>,
    events: EventBus<LanguageEvent>,
}

impl LanguageContext {
    pub fn new(initial: Language) -> Self {
        Self { current: Rc::new(Cell::new(initial)), events: EventBus::new() }
    }

    pub fn current(&self) -> Language {
        self.current.get()
    }

    /// Switch language. Emits [`LanguageEvent::Updated`] only on an actual
    /// change; returns whether it changed.
    pub fn update_language(&self, language: Language) -> bool {
        if language == self.current.get() {
            return false;
        }
        self.current.set(language);
        log::info!("language: switched to {language}");
        self.events.emit(LanguageEvent::Updated { language });
        true
    }

    pub fn on_updated(&self, callback: impl Fn(Language) + 'static) -> Subscription<LanguageEvent> {
        self.events.subscribe(LanguageEventKind::Updated, move |e| match e {
            LanguageEvent::Updated { language } => callback(*language),
        })
    }

    pub fn events(&self) -> &EventBus<LanguageEvent> {
        &self.events
    }
}
