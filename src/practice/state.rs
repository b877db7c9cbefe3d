// src/practice/state.rs

//! Answer store, navigation cursor and review/submit state machine of one
//! practice attempt. Everything here is a plain value: transitions take the
//! paper by reference and mutate the state, no UI or clock involved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::practice::{
    error::PracticeError,
    paper::{AnswerKey, PracticePaper},
};

/// Position of the displayed question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub session: usize,
    pub question: usize,
}

impl Cursor {
    pub fn new(session: usize, question: usize) -> Self {
        Self { session, question }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Answering,
    /// `finish` found questions marked for review and walks through them.
    Reviewing,
    /// Terminal: the attempt is read-only.
    Submitted,
}

/// Palette colour of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Unattempted,
    Answered,
    AnsweredMarked,
    UnattemptedMarked,
}

/// One cell of the question palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteCell {
    pub cursor: Cursor,
    pub key: AnswerKey,
    pub status: QuestionStatus,
    pub current: bool,
}

/// What a navigation or finish action led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(Cursor),
    /// Already on the last question; nothing changed.
    AtEnd,
    /// Terminal submit happened.
    Submitted,
}

/// Client-side result shown after a practice attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeResult {
    pub total_questions: usize,
    pub attempted: usize,
    pub unattempted: usize,
    pub marked_for_review: usize,
    pub correct: usize,
    pub wrong: usize,
    pub score_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentState {
    answers: BTreeMap<AnswerKey, usize>,
    review: BTreeMap<AnswerKey, bool>,
    cursor: Cursor,
    mode: Mode,
}

impl AssessmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a state from persisted maps, dropping keys the paper no longer has.
    pub fn restore(
        paper: &PracticePaper,
        answers: BTreeMap<AnswerKey, usize>,
        review: BTreeMap<AnswerKey, bool>,
    ) -> Self {
        let answers = answers
            .into_iter()
            .filter(|(k, option)| paper.lookup(k).is_some_and(|q| *option < q.option_count()))
            .collect();
        let review = review
            .into_iter()
            .filter(|(k, _)| paper.lookup(k).is_some())
            .collect();

        Self {
            answers,
            review,
            ..Self::default()
        }
    }

    pub fn answers(&self) -> &BTreeMap<AnswerKey, usize> {
        &self.answers
    }

    pub fn review(&self) -> &BTreeMap<AnswerKey, bool> {
        &self.review
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn answer(&self, key: &AnswerKey) -> Option<usize> {
        self.answers.get(key).copied()
    }

    pub fn is_marked(&self, key: &AnswerKey) -> bool {
        self.review.get(key).copied().unwrap_or(false)
    }

    fn ensure_open(&self) -> Result<(), PracticeError> {
        if self.mode == Mode::Submitted {
            return Err(PracticeError::Locked);
        }
        Ok(())
    }

    /// Records `option` as the answer of `key`, replacing any previous choice.
    pub fn select(
        &mut self,
        paper: &PracticePaper,
        key: &AnswerKey,
        option: usize,
    ) -> Result<(), PracticeError> {
        self.ensure_open()?;
        let question = paper
            .lookup(key)
            .ok_or_else(|| PracticeError::UnknownQuestion(key.to_string()))?;
        if option >= question.option_count() {
            return Err(PracticeError::OutOfRange(format!(
                "option {option} of question {key}"
            )));
        }
        self.answers.insert(key.clone(), option);
        Ok(())
    }

    /// Removes the answer of `key`; the question is unattempted again.
    pub fn clear(&mut self, key: &AnswerKey) -> Result<(), PracticeError> {
        self.ensure_open()?;
        self.answers.remove(key);
        Ok(())
    }

    /// Flips the review mark of `key`. Returns the new value.
    pub fn toggle_mark(&mut self, paper: &PracticePaper, key: &AnswerKey) -> Result<bool, PracticeError> {
        self.ensure_open()?;
        if paper.lookup(key).is_none() {
            return Err(PracticeError::UnknownQuestion(key.to_string()));
        }
        let marked = !self.is_marked(key);
        self.review.insert(key.clone(), marked);
        Ok(marked)
    }

    /// Moves the cursor; indices outside the paper are rejected and the cursor stays.
    pub fn go_to(
        &mut self,
        paper: &PracticePaper,
        session: usize,
        question: usize,
    ) -> Result<Cursor, PracticeError> {
        self.ensure_open()?;
        if session >= paper.sessions.len() {
            return Err(PracticeError::OutOfRange(format!("session {session}")));
        }
        if question >= paper.question_count(session) {
            return Err(PracticeError::OutOfRange(format!(
                "question {question} of session {session}"
            )));
        }
        self.cursor = Cursor::new(session, question);
        Ok(self.cursor)
    }

    /// Switches to another session, starting at its first question.
    pub fn switch_session(&mut self, paper: &PracticePaper, session: usize) -> Result<Cursor, PracticeError> {
        self.go_to(paper, session, 0)
    }

    /// Advances to the next question, rolling into the next session at a
    /// session boundary. While reviewing, jumps to the next marked question.
    pub fn next(&mut self, paper: &PracticePaper) -> Result<Step, PracticeError> {
        self.ensure_open()?;
        if self.mode == Mode::Reviewing {
            return Ok(self.next_marked(paper));
        }

        let Cursor { session, question } = self.cursor;
        if question + 1 < paper.question_count(session) {
            self.cursor = Cursor::new(session, question + 1);
        } else if session + 1 < paper.sessions.len() {
            self.cursor = Cursor::new(session + 1, 0);
        } else {
            return Ok(Step::AtEnd);
        }
        Ok(Step::Moved(self.cursor))
    }

    /// Steps back one question, rolling into the previous session's last question.
    pub fn previous(&mut self, paper: &PracticePaper) -> Result<Step, PracticeError> {
        self.ensure_open()?;
        let Cursor { session, question } = self.cursor;
        if question > 0 {
            self.cursor = Cursor::new(session, question - 1);
        } else if session > 0 {
            let last = paper.question_count(session - 1).saturating_sub(1);
            self.cursor = Cursor::new(session - 1, last);
        } else {
            return Ok(Step::AtEnd);
        }
        Ok(Step::Moved(self.cursor))
    }

    /// Positions of questions marked for review, in session then question order.
    pub fn marked_positions(&self, paper: &PracticePaper) -> Vec<Cursor> {
        paper
            .positions()
            .into_iter()
            .filter(|(_, _, key, _)| self.is_marked(key))
            .map(|(s, q, _, _)| Cursor::new(s, q))
            .collect()
    }

    /// Diverts to the first marked question if any remain, otherwise submits.
    pub fn finish(&mut self, paper: &PracticePaper) -> Result<Step, PracticeError> {
        self.ensure_open()?;
        Ok(self.review_or_submit(paper))
    }

    /// Explicit submit from review mode: same gate as `finish`.
    pub fn review_submit(&mut self, paper: &PracticePaper) -> Result<Step, PracticeError> {
        self.ensure_open()?;
        Ok(self.review_or_submit(paper))
    }

    /// Time ran out: submit regardless of marked questions.
    pub fn expire(&mut self) -> Step {
        self.mode = Mode::Submitted;
        Step::Submitted
    }

    fn review_or_submit(&mut self, paper: &PracticePaper) -> Step {
        match self.marked_positions(paper).first() {
            Some(&first) => {
                self.mode = Mode::Reviewing;
                self.cursor = first;
                Step::Moved(first)
            }
            None => {
                self.mode = Mode::Submitted;
                Step::Submitted
            }
        }
    }

    fn next_marked(&mut self, paper: &PracticePaper) -> Step {
        let after = self
            .marked_positions(paper)
            .into_iter()
            .find(|c| *c > self.cursor);
        match after {
            Some(cursor) => {
                self.cursor = cursor;
                Step::Moved(cursor)
            }
            // Past the last marked question: re-check the whole set.
            None => self.review_or_submit(paper),
        }
    }

    pub fn status(&self, key: &AnswerKey) -> QuestionStatus {
        match (self.answers.contains_key(key), self.is_marked(key)) {
            (true, true) => QuestionStatus::AnsweredMarked,
            (true, false) => QuestionStatus::Answered,
            (false, true) => QuestionStatus::UnattemptedMarked,
            (false, false) => QuestionStatus::Unattempted,
        }
    }

    /// Palette cells of one session with the current question highlighted.
    pub fn palette(&self, paper: &PracticePaper, session: usize) -> Vec<PaletteCell> {
        paper
            .positions()
            .into_iter()
            .filter(|(s, _, _, _)| *s == session)
            .map(|(s, q, key, _)| PaletteCell {
                cursor: Cursor::new(s, q),
                status: self.status(&key),
                current: self.cursor == Cursor::new(s, q),
                key,
            })
            .collect()
    }

    /// Scores the attempt locally against the answer indexes the paper carries.
    pub fn result(&self, paper: &PracticePaper) -> PracticeResult {
        let positions = paper.positions();
        let total_questions = positions.len();

        let mut attempted = 0;
        let mut marked_for_review = 0;
        let mut correct = 0;
        let mut wrong = 0;

        for (_, _, key, question) in &positions {
            if self.is_marked(key) {
                marked_for_review += 1;
            }
            let Some(chosen) = self.answer(key) else {
                continue;
            };
            attempted += 1;
            match question.answer {
                Some(expected) if expected == chosen => correct += 1,
                Some(_) => wrong += 1,
                None => {}
            }
        }

        let score_percentage = if total_questions == 0 {
            0.0
        } else {
            correct as f64 / total_questions as f64 * 100.0
        };

        PracticeResult {
            total_questions,
            attempted,
            unattempted: total_questions - attempted,
            marked_for_review,
            correct,
            wrong,
            score_percentage,
        }
    }
}
