//! Scoring of module quizzes and the final exam.

use feq_derive::api_model;

/// Fraction of correct answers needed to pass.
pub const PASS_THRESHOLD: f64 = 0.8;

/// Anything with a single correct option.
pub trait Question {
    fn correct_option(&self) -> u32;
}

impl Question for u32 {
    fn correct_option(&self) -> u32 {
        *self
    }
}

#[api_model]
#[derive(Clone, Copy, PartialEq)]
pub struct Grade {
    pub correct: u32,
    pub total: u32,
    /// Between 0 and 1
    pub score: f64,
    pub passed: bool,
}

/// Grades `answers` positionally against `questions`.
///
/// Missing answers are wrong, extra answers are ignored. An empty question set scores 0
/// and does not pass.
#[must_use]
pub fn grade<Q: Question>(questions: &[Q], answers: &[Option<u32>]) -> Grade {
    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let correct = questions
        .iter()
        .zip(answers.iter().map(Some).chain(std::iter::repeat(None)))
        .filter(|(question, answer)| {
            answer.copied().flatten().is_some_and(|chosen| chosen == question.correct_option())
        })
        .count();
    let correct = u32::try_from(correct).unwrap_or(u32::MAX);

    if total == 0 {
        return Grade { correct: 0, total: 0, score: 0.0, passed: false };
    }
    let score = f64::from(correct) / f64::from(total);
    Grade { correct, total, score, passed: score >= PASS_THRESHOLD }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eighty_percent_passes() {
        let key = [0, 1, 2, 3, 0];
        let g = grade(&key, &[Some(0), Some(1), Some(2), Some(3), Some(1)]);
        assert_eq!((g.correct, g.total), (4, 5));
        assert!(g.passed);

        let g = grade(&key, &[Some(0), Some(1), Some(2)]);
        assert_eq!(g.correct, 3);
        assert!(!g.passed);
    }

    #[test]
    fn empty_exams_fail() {
        let g = grade::<u32>(&[], &[Some(1)]);
        assert_eq!(g, Grade { correct: 0, total: 0, score: 0.0, passed: false });
    }

    #[test]
    fn skipped_answers_are_wrong() {
        let g = grade(&[1, 1], &[None, Some(1)]);
        assert_eq!(g.correct, 1);
    }
}
