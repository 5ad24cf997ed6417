//! Long answer grading bookkeeping
//!
//! The organiser submits one grade per player for a long answer round. Grades
//! are kept as-is until the round's answers are shown, then folded into a
//! histogram of three buckets that is appended to a per-round history.

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

use crate::constants::scoring::MAX_GRADE;

/// A grade awarded to one player's long answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    /// Username of the graded player
    pub username: String,
    /// Grade out of 100
    pub grade: u8,
}

/// Histogram bucket of a grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum GradeCategory {
    /// Grade of zero
    #[serde(rename = "0")]
    Zero,
    /// Anything strictly between zero and full marks
    #[serde(rename = "50")]
    Half,
    /// Full marks
    #[serde(rename = "100")]
    Full,
}

impl GradeCategory {
    /// Buckets a grade out of 100
    pub fn of(grade: u8) -> Self {
        match grade {
            0 => Self::Zero,
            g if g >= MAX_GRADE => Self::Full,
            _ => Self::Half,
        }
    }
}

/// Count of grades per bucket for one round
pub type GradeCounts = EnumMap<GradeCategory, usize>;

/// Accumulates organiser grades and their per-round histograms
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GradeManager {
    grades: Option<Vec<Grade>>,
    grade_counts: GradeCounts,
    grade_counts_list: Vec<GradeCounts>,
}

impl GradeManager {
    /// Stores the organiser's grades for this round, replacing earlier ones
    pub fn grade(&mut self, grades: Vec<Grade>) {
        self.grades = Some(grades);
    }

    /// Folds this round's grades into the histogram and records it
    ///
    /// Rounds without grades still record a histogram, all zero when nothing
    /// was graded. Returns the full history.
    pub fn push_grades(&mut self) -> &[GradeCounts] {
        for grade in self.grades.iter().flatten() {
            self.grade_counts[GradeCategory::of(grade.grade)] += 1;
        }
        self.grade_counts_list.push(self.grade_counts);
        &self.grade_counts_list
    }

    /// Forgets this round's grades and zeroes the histogram, keeping history
    pub fn start_round(&mut self) {
        self.grades = None;
        self.grade_counts = GradeCounts::default();
    }

    /// Whether the organiser submitted grades this round
    pub fn is_graded(&self) -> bool {
        self.grades.is_some()
    }

    /// The grade a player received this round, zero if ungraded
    pub fn grade_for(&self, username: &str) -> u8 {
        self.grades
            .iter()
            .flatten()
            .find(|grade| grade.username == username)
            .map_or(0, |grade| grade.grade)
    }

    /// This round's histogram
    pub fn grade_counts(&self) -> &GradeCounts {
        &self.grade_counts
    }

    /// One histogram per completed round
    pub fn history(&self) -> &[GradeCounts] {
        &self.grade_counts_list
    }
}
