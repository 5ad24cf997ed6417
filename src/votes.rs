//! Live per-choice vote tally for the current question

use serde::{Deserialize, Serialize};

use crate::quiz::Question;

/// A single choice toggle sent by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Index of the toggled choice
    pub index: usize,
    /// Whether the choice is now selected
    pub is_selected: bool,
}

/// Live count of players currently selecting one choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    /// Choice text
    pub name: String,
    /// Players currently selecting this choice
    pub votes: i64,
    /// Whether this choice is correct
    pub is_correct: bool,
}

/// Vote tally indexed like the question's choices
///
/// Counts move in both directions while players change their minds. Nothing
/// clamps them; the player bookkeeping only sends a deselect after a select.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct VoteList {
    votes: Vec<Vote>,
}

impl VoteList {
    /// Builds an all-zero tally for `question`, empty for long answers
    pub fn new(question: &Question) -> Self {
        Self {
            votes: question
                .choices()
                .iter()
                .map(|choice| Vote {
                    name: choice.text.clone(),
                    votes: 0,
                    is_correct: choice.is_correct,
                })
                .collect(),
        }
    }

    /// Applies one selection toggle. Unknown indices are ignored.
    pub fn toggle(&mut self, selection: Selection) {
        let Some(vote) = self.votes.get_mut(selection.index) else {
            return;
        };
        if selection.is_selected {
            vote.votes += 1;
        } else {
            vote.votes -= 1;
        }
    }

    /// The live tally in choice order
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::tests::{laq, mcq};

    fn select(index: usize, is_selected: bool) -> Selection {
        Selection { index, is_selected }
    }

    #[test]
    fn test_new_mirrors_choices() {
        let list = VoteList::new(&mcq("Q", 10, &[true, false]));

        assert_eq!(list.votes().len(), 2);
        assert_eq!(list.votes()[0].name, "Choice 0");
        assert!(list.votes()[0].is_correct);
        assert!(list.votes().iter().all(|vote| vote.votes == 0));
    }

    #[test]
    fn test_long_answer_has_no_votes() {
        let mut list = VoteList::new(&laq("Q", 10));
        list.toggle(select(0, true));
        assert!(list.votes().is_empty());
    }

    #[test]
    fn test_select_then_deselect_restores_count() {
        let mut list = VoteList::new(&mcq("Q", 10, &[true, false, false]));
        list.toggle(select(1, true));
        list.toggle(select(1, true));
        assert_eq!(list.votes()[1].votes, 2);

        list.toggle(select(1, true));
        list.toggle(select(1, false));
        assert_eq!(list.votes()[1].votes, 2);
        assert_eq!(list.votes()[0].votes, 0);
    }

    #[test]
    fn test_out_of_range_toggle_ignored() {
        let mut list = VoteList::new(&mcq("Q", 10, &[true]));
        list.toggle(select(3, true));
        assert_eq!(list.votes()[0].votes, 0);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut list = VoteList::new(&mcq("Q", 10, &[true]));
        list.toggle(select(0, true));
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"[{"name":"Choice 0","votes":1,"is_correct":true}]"#);
    }
}
