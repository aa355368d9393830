#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use zeroize::Zeroizing;

use orchestrator_siphon::error::{Result, SiphonError};
use orchestrator_siphon::operator::OperatorConsole;

/// Console that answers from a fixed script and records what it was shown.
///
/// `select` answers are 1-based menu numbers, matching what an operator
/// would type at the terminal.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
    pub menus: Vec<(String, Vec<String>)>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn next_answer(&mut self) -> Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| SiphonError::Operator("script exhausted".to_string()))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }
}

#[async_trait]
impl OperatorConsole for ScriptedConsole {
    async fn notify(&mut self, message: &str) -> Result<()> {
        self.transcript.push(message.to_string());
        Ok(())
    }

    async fn select(&mut self, title: &str, options: &[String]) -> Result<usize> {
        self.menus.push((title.to_string(), options.to_vec()));
        let answer = self.next_answer()?;
        let choice: usize = answer
            .parse()
            .map_err(|_| SiphonError::Operator(format!("scripted answer '{answer}' is not a number")))?;
        if choice == 0 || choice > options.len() {
            return Err(SiphonError::Operator(format!(
                "scripted choice {choice} out of range for '{title}'"
            )));
        }
        Ok(choice - 1)
    }

    async fn prompt(&mut self, message: &str) -> Result<String> {
        self.transcript.push(message.to_string());
        self.next_answer()
    }

    async fn prompt_secret(&mut self, message: &str) -> Result<Zeroizing<String>> {
        self.transcript.push(message.to_string());
        Ok(Zeroizing::new(self.next_answer()?))
    }

    async fn confirm(&mut self, message: &str) -> Result<bool> {
        self.transcript.push(message.to_string());
        Ok(self.next_answer()? == "1")
    }
}
