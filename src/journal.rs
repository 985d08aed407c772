use crate::access::{AccessPolicy, Actor};
use crate::cause::{CauseRenderer, EntityDirectory, RenderContext};
use crate::config::NoteFormat;
use crate::entity::EntityId;
use crate::i18n::Translator;
use crate::persistence::JournalEntry;
use chrono::{DateTime, Utc};

/// A journal entry rendered for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalNote {
    pub entity_id: EntityId,
    pub recorded_at: DateTime<Utc>,
    pub note: String,
}

/// Receives rendered notes, e.g. an audit log or a notification queue.
pub trait AuditSink {
    fn record(&mut self, entity_id: EntityId, note: &str);
}

impl AuditSink for Vec<(EntityId, String)> {
    fn record(&mut self, entity_id: EntityId, note: &str) {
        self.push((entity_id, note.to_string()));
    }
}

pub fn publish(notes: &[JournalNote], sink: &mut dyn AuditSink) {
    for note in notes {
        sink.record(note.entity_id, &note.note);
    }
}

/// Renders stored causes at read time, so the text follows the viewer's
/// locale and permissions rather than those of the run that wrote them.
pub struct Journal<'a> {
    translator: &'a dyn Translator,
    access: &'a dyn AccessPolicy,
    directory: &'a dyn EntityDirectory,
    link_base: &'a str,
}

impl<'a> Journal<'a> {
    pub fn new(
        translator: &'a dyn Translator,
        access: &'a dyn AccessPolicy,
        directory: &'a dyn EntityDirectory,
        link_base: &'a str,
    ) -> Self {
        Self {
            translator,
            access,
            directory,
            link_base,
        }
    }

    pub fn render(
        &self,
        entries: &[JournalEntry],
        viewer: &Actor,
        locale: &str,
        format: NoteFormat,
    ) -> Vec<JournalNote> {
        let renderer = CauseRenderer::new(RenderContext {
            viewer,
            locale,
            format,
            translator: self.translator,
            access: self.access,
            directory: self.directory,
            link_base: self.link_base,
        });
        // Notes on entities the viewer cannot see are withheld entirely.
        entries
            .iter()
            .filter(|entry| {
                self.directory
                    .find_entity(entry.entity_id)
                    .is_none_or(|entity| self.access.can_view(viewer, &entity))
            })
            .map(|entry| JournalNote {
                entity_id: entry.entity_id,
                recorded_at: entry.recorded_at,
                note: renderer.render(&entry.cause),
            })
            .collect()
    }
}
