//! Merges the model's headcount into the fixed roster.
//!
//! The model only reports how many people it saw, never who. The first `n`
//! entries in roster order are marked present and the rest absent.

use thiserror::Error;

use crate::models::Student;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no student with id '{0}' on the roster")]
pub struct UnknownStudent(pub String);

#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<Student>,
    /// Count last applied from the model, clamped to the roster size.
    ai_count: Option<usize>,
}

impl Roster {
    pub fn new(entries: Vec<Student>) -> Self {
        let mut roster = Self {
            entries,
            ai_count: None,
        };
        roster.reset();
        roster
    }

    /// Builds a roster from names, numbering ids from "1".
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Student::new((index + 1).to_string(), name))
            .collect();
        Self::new(entries)
    }

    pub fn entries(&self) -> &[Student] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply_count(&mut self, count: u32) {
        let count = (count as usize).min(self.entries.len());
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.is_present = index < count;
        }
        self.ai_count = Some(count);
    }

    /// Flips one entry and returns its new presence.
    pub fn toggle(&mut self, id: &str) -> Result<bool, UnknownStudent> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| UnknownStudent(id.to_string()))?;
        entry.is_present = !entry.is_present;
        Ok(entry.is_present)
    }

    /// Re-applies the last model count. Returns false when nothing was applied yet.
    pub fn reset_to_ai(&mut self) -> bool {
        match self.ai_count {
            Some(count) => {
                self.apply_count(count as u32);
                true
            }
            None => false,
        }
    }

    pub fn ai_count(&self) -> Option<usize> {
        self.ai_count
    }

    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_present).count()
    }

    pub fn absent_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_present)
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn is_overridden(&self) -> bool {
        self.ai_count
            .map(|count| self.present_count() != count)
            .unwrap_or(false)
    }

    /// Everyone absent and the model count forgotten.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.is_present = false;
        }
        self.ai_count = None;
    }
}
