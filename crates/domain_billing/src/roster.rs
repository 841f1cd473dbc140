//! Students and subjects
//!
//! A student is enrolled in an ordered list of subjects; each subject carries
//! the fee charged for one complete billing period. Enrollment references
//! subjects by identifier only, so a deleted subject leaves a dangling id that
//! billing code treats as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Document, Money, StudentId, SubjectId};

/// A tutoring student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Unique identifier
    pub id: StudentId,
    /// Display name
    pub name: String,
    /// Contact phone, free-form as entered
    pub phone: String,
    /// School name
    #[serde(default)]
    pub school: String,
    /// Enrolled subjects, in enrollment order
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Creates a new student
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        school: impl Into<String>,
        subjects: Vec<SubjectId>,
    ) -> Self {
        Self {
            id: StudentId::new_v7(),
            name: name.into(),
            phone: phone.into(),
            school: school.into(),
            subjects,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the student is enrolled in the subject
    pub fn is_enrolled(&self, subject_id: SubjectId) -> bool {
        self.subjects.contains(&subject_id)
    }

    /// Returns the phone number reduced to its digits
    pub fn phone_digits(&self) -> String {
        self.phone.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// Partial update for a student
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub subjects: Option<Vec<SubjectId>>,
}

impl Document for Student {
    type Id = StudentId;
    type Patch = StudentPatch;

    const COLLECTION: &'static str = "students";

    fn id(&self) -> StudentId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn apply_patch(&mut self, patch: StudentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(school) = patch.school {
            self.school = school;
        }
        if let Some(subjects) = patch.subjects {
            self.subjects = subjects;
        }
    }
}

/// A subject taught, with its fee per complete billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Unique identifier
    pub id: SubjectId,
    /// Display name
    pub name: String,
    /// Fee for one complete period of four classes
    pub fee: Money,
    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Creates a new subject
    pub fn new(name: impl Into<String>, fee: Money) -> Self {
        Self {
            id: SubjectId::new_v7(),
            name: name.into(),
            fee,
            created_at: Utc::now(),
        }
    }
}

/// Partial update for a subject
#[derive(Debug, Clone, Default)]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub fee: Option<Money>,
}

impl Document for Subject {
    type Id = SubjectId;
    type Patch = SubjectPatch;

    const COLLECTION: &'static str = "subjects";

    fn id(&self) -> SubjectId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn apply_patch(&mut self, patch: SubjectPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(fee) = patch.fee {
            self.fee = fee;
        }
    }
}

/// Looks up a subject by id, treating a dangling reference as absent
pub fn find_subject(subjects: &[Subject], id: SubjectId) -> Option<&Subject> {
    subjects.iter().find(|s| s.id == id)
}
