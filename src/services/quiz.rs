//! 测验模块
//! 把单词释义变成带随机干扰项的选择题，并记录答题得分与错题

use rand::seq::SliceRandom;

use crate::models::{QuizQuestion, QuizResult, WordDefinition, WrongAnswer};

/// 越界提交时错题记录里的占位答案
const NOT_SELECTED: &str = "未作答";

/// 每道题最多的干扰项数
const MAX_DISTRACTORS: usize = 3;

/// 为每个在故事里找到释义的单词生成一道选择题
///
/// 匹配按 trim + 忽略大小写进行，取第一条命中的释义；故事里没定义的单词
/// 直接跳过，不出题。干扰项从其余释义的翻译里抽取（与正确翻译相同的剔除，
/// 不同单词撞了翻译则照常保留），打乱后取前 min(3, 池大小) 个，再和正确
/// 翻译混洗。池子为空时出只有一个选项的题，而不是丢弃。
pub fn build_quiz(
    original_words: &[String],
    definitions: &[WordDefinition],
) -> Vec<QuizQuestion> {
    original_words
        .iter()
        .filter_map(|word| {
            let needle = word.trim().to_lowercase();
            let def = definitions.iter().find(|d| d.word == needle)?;
            Some(build_question(def, definitions))
        })
        .collect()
}

fn build_question(def: &WordDefinition, all: &[WordDefinition]) -> QuizQuestion {
    let correct = def.translation.clone();

    let mut pool: Vec<&str> = all
        .iter()
        .map(|d| d.translation.as_str())
        .filter(|t| *t != correct)
        .collect();
    pool.shuffle(&mut rand::rng());

    let mut options: Vec<String> = pool
        .into_iter()
        .take(MAX_DISTRACTORS)
        .map(str::to_string)
        .collect();
    options.push(correct.clone());
    options.shuffle(&mut rand::rng());

    let correct_index = options
        .iter()
        .position(|o| *o == correct)
        .unwrap_or_default();

    QuizQuestion {
        word: def.word.clone(),
        part_of_speech: def.part_of_speech.clone(),
        question: format!(
            "What is the meaning of the word '{}' [{}]?",
            def.word, def.part_of_speech
        ),
        options,
        correct_index,
        correct_translation: correct,
        context_meaning: def.context_meaning.clone(),
    }
}

/// 提交一次答案后的反馈
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub score: usize,
    /// 这是不是最后一题
    pub finished: bool,
}

/// 一轮测验会话：当前题号、得分和错题列表
///
/// 只能顺序向前答题，没有回退。
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    score: usize,
    wrong_answers: Vec<WrongAnswer>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            current: 0,
            score: 0,
            wrong_answers: Vec::new(),
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// 当前待答的题目，答完全部后返回 None
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn wrong_answers(&self) -> &[WrongAnswer] {
        &self.wrong_answers
    }

    /// 提交当前题的答案并推进到下一题
    ///
    /// 答错时用所选选项的文本生成错题记录，下标越界记为占位答案。
    /// 测验已结束时再提交不改变任何状态。
    pub fn submit_answer(&mut self, selected_index: usize) -> AnswerOutcome {
        let Some(question) = self.questions.get(self.current) else {
            return AnswerOutcome {
                correct: false,
                score: self.score,
                finished: true,
            };
        };

        let correct = selected_index == question.correct_index;
        if correct {
            self.score += 1;
        } else {
            let user_answer = question
                .options
                .get(selected_index)
                .cloned()
                .unwrap_or_else(|| NOT_SELECTED.to_string());
            self.wrong_answers.push(WrongAnswer {
                word: question.word.clone(),
                part_of_speech: question.part_of_speech.clone(),
                correct_translation: question.correct_translation.clone(),
                user_answer,
                context_meaning: question.context_meaning.clone(),
            });
        }

        self.current += 1;
        AnswerOutcome {
            correct,
            score: self.score,
            finished: self.current >= self.questions.len(),
        }
    }

    pub fn result(&self) -> QuizResult {
        let total = self.questions.len();
        let percentage = if total == 0 {
            0.0
        } else {
            self.score as f64 * 100.0 / total as f64
        };
        QuizResult {
            total_questions: total,
            correct_answers: self.score,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(word: &str, pos: &str, translation: &str, context: &str) -> WordDefinition {
        WordDefinition {
            word: word.to_string(),
            part_of_speech: pos.to_string(),
            translation: translation.to_string(),
            context_meaning: Some(context.to_string()),
        }
    }

    fn sample_definitions() -> Vec<WordDefinition> {
        vec![
            def("abandon", "v.", "放弃", "give up"),
            def("fragile", "adj.", "脆弱的", "easily broken"),
            def("compel", "v.", "强迫", "force"),
            def("obscure", "adj.", "模糊的", "unclear"),
            def("deceive", "v.", "欺骗", "mislead"),
        ]
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_question_invariants() {
        let defs = sample_definitions();
        let quiz = build_quiz(&words(&["abandon", "fragile", "compel"]), &defs);

        assert_eq!(quiz.len(), 3);
        for q in &quiz {
            assert_eq!(q.options[q.correct_index], q.correct_translation);
            // 池子里有 4 个别家翻译，干扰项封顶 3 个
            assert_eq!(q.options.len(), 4);
            assert_eq!(
                q.options
                    .iter()
                    .filter(|o| **o == q.correct_translation)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_option_count_follows_pool_size() {
        let defs = vec![
            def("abandon", "v.", "放弃", "give up"),
            def("fragile", "adj.", "脆弱的", "easily broken"),
            def("compel", "v.", "强迫", "force"),
        ];
        let quiz = build_quiz(&words(&["abandon"]), &defs);

        // min(4, 池大小 + 1) = 3
        assert_eq!(quiz[0].options.len(), 3);
    }

    #[test]
    fn test_two_definitions_give_each_other_one_distractor() {
        let defs = vec![
            def("abandon", "v.", "放弃", "give up"),
            def("fragile", "adj.", "脆弱的", "easily broken"),
        ];
        let quiz = build_quiz(&words(&["abandon", "fragile"]), &defs);

        assert_eq!(quiz.len(), 2);
        // 两个单词翻译互不相同，各自的池大小为 1
        for q in &quiz {
            assert_eq!(q.options.len(), 2);
            assert_eq!(q.options[q.correct_index], q.correct_translation);
        }
    }

    #[test]
    fn test_two_words_with_no_distractor_pool() {
        // 两个词共享同一个翻译时池子缩到零，保留单选项题
        let defs = vec![
            def("begin", "v.", "开始", "start"),
            def("commence", "v.", "开始", "start formally"),
        ];
        let quiz = build_quiz(&words(&["begin", "commence"]), &defs);

        assert_eq!(quiz.len(), 2);
        for q in &quiz {
            assert_eq!(q.options, vec!["开始".to_string()]);
            assert_eq!(q.correct_index, 0);
        }
    }

    #[test]
    fn test_unmatched_words_are_skipped() {
        let defs = sample_definitions();
        let quiz = build_quiz(&words(&["abandon", "nonexistent"]), &defs);

        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].word, "abandon");
    }

    #[test]
    fn test_match_is_case_insensitive_and_trimmed() {
        let defs = sample_definitions();
        let quiz = build_quiz(&words(&[" Abandon "]), &defs);

        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].word, "abandon");
    }

    #[test]
    fn test_question_text_names_word_and_pos() {
        let defs = sample_definitions();
        let quiz = build_quiz(&words(&["fragile"]), &defs);

        assert_eq!(
            quiz[0].question,
            "What is the meaning of the word 'fragile' [adj.]?"
        );
    }

    #[test]
    fn test_session_scores_and_records_wrong_answers() {
        let defs = sample_definitions();
        let quiz = build_quiz(&words(&["abandon", "fragile"]), &defs);
        let mut session = QuizSession::new(quiz);

        let first = session.current_question().unwrap().clone();
        let outcome = session.submit_answer(first.correct_index);
        assert!(outcome.correct);
        assert_eq!(outcome.score, 1);
        assert!(!outcome.finished);

        let second = session.current_question().unwrap().clone();
        let wrong_index = (second.correct_index + 1) % second.options.len();
        let outcome = session.submit_answer(wrong_index);
        assert!(!outcome.correct);
        assert_eq!(outcome.score, 1);
        assert!(outcome.finished);

        let wrong = session.wrong_answers();
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].word, second.word);
        assert_eq!(wrong[0].correct_translation, second.correct_translation);
        assert_eq!(wrong[0].user_answer, second.options[wrong_index]);

        let result = session.result();
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.correct_answers, 1);
        assert!((result.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_bounds_answer_uses_sentinel() {
        let defs = vec![def("abandon", "v.", "放弃", "give up")];
        let quiz = build_quiz(&words(&["abandon"]), &defs);
        let mut session = QuizSession::new(quiz);

        let outcome = session.submit_answer(99);
        assert!(!outcome.correct);
        assert!(outcome.finished);
        assert_eq!(session.wrong_answers()[0].user_answer, NOT_SELECTED);
    }

    #[test]
    fn test_submission_after_finish_is_inert() {
        let defs = vec![def("abandon", "v.", "放弃", "give up")];
        let mut session = QuizSession::new(build_quiz(&words(&["abandon"]), &defs));
        session.submit_answer(0);

        let outcome = session.submit_answer(0);
        assert!(outcome.finished);
        assert_eq!(outcome.score, 1);
        assert!(session.wrong_answers().is_empty());
    }
}
